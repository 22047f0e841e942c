mod dense;
mod elements;
mod error;
mod kron;
mod network;
mod outage;
mod redist;
mod ybus;

pub mod debug;
pub mod math;

pub use dense::*;
pub use elements::*;
pub use error::*;
pub use kron::*;
pub use network::*;
pub use outage::*;
pub use redist::*;
pub use ybus::*;
