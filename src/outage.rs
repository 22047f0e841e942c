use crate::dense::Mat;
use crate::error::Result;
use crate::kron::{kron_reduce, ReducedNetwork};
use crate::network::Network;
use crate::redist::{redistribution_ratios, Injection, Redistribution};
use crate::ybus::make_ybus;
use num_complex::Complex64;
use std::collections::HashMap;

/// All products of one generator outage analysis run.
pub struct OutageStudy {
    /// Full bus admittance matrix, labeled by `Network::bus_names`.
    pub y_bus: Mat<Complex64>,

    /// Generator-only equivalent with its name ordering.
    pub reduced: ReducedNetwork,

    pub redistribution: Redistribution,
}

/// Runs the whole pipeline for one outage: Y-bus assembly, Kron reduction
/// and redistribution ratios. The outage generator name is validated up
/// front, before any matrix work.
pub fn run_outage(
    network: &Network,
    injections: &HashMap<String, Injection>,
    gen_out: &str,
) -> Result<OutageStudy> {
    network.generator_bus(gen_out)?;

    let y_bus = make_ybus(network)?;
    let reduced = kron_reduce(&y_bus, network)?;
    let redistribution = redistribution_ratios(&reduced, network, injections, gen_out)?;

    Ok(OutageStudy {
        y_bus,
        reduced,
        redistribution,
    })
}
