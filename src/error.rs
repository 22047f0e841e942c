use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal analysis failures. Recoverable data problems (missing bus mappings,
/// duplicate names, zero impedances) are logged and worked around instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Shunt topology that the admittance model cannot represent.
    #[error("unsupported shunt topology for '{name}': {model}")]
    UnsupportedShunt { name: String, model: &'static str },

    /// Element nameplate data that cannot yield a physical model.
    #[error("invalid element '{name}': {reason}")]
    InvalidElement { name: String, reason: String },

    /// `Y_LL` was singular during Kron reduction: the network is
    /// disconnected or under-specified.
    #[error("singular network: cannot eliminate non-generator buses")]
    SingularNetwork,

    /// The outage reference generator does not exist in the model.
    #[error("generator '{0}' not found")]
    GeneratorNotFound(String),

    /// A generator bus has no load-flow result to reconstruct its voltage from.
    #[error("no load-flow result for bus '{0}'")]
    MissingLoadFlow(String),

    /// All synchronizing power coefficients vanished; ratios are undefined.
    #[error("degenerate synchronizing coupling for outage of '{0}'")]
    DegenerateCoupling(String),
}
