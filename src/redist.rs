use crate::cmplx;
use crate::error::{Error, Result};
use crate::kron::ReducedNetwork;
use crate::network::Network;
use log::{info, warn};
use std::collections::HashMap;

/// Generator power injection normalized to the machine rating (p.u.).
#[derive(Clone, Copy, Debug, Default)]
pub struct Injection {
    pub p: f64,
    pub q: f64,
}

/// Redistribution of a tripped generator's active power among the
/// remaining generators, keyed like the reduced matrix.
pub struct Redistribution {
    pub gen_bus_names: Vec<String>,

    /// Fraction of the lost power absorbed by each generator; zero at the
    /// outage reference, summing to one over the survivors.
    pub ratios: Vec<f64>,
}

impl Redistribution {
    pub fn percentages(&self) -> Vec<f64> {
        self.ratios.iter().map(|r| r * 100.0).collect()
    }
}

/// Computes synchronizing-power-coefficient redistribution ratios for the
/// outage of `gen_out`.
///
/// Internal EMFs are reconstructed from the load-flow voltages and the
/// machine injections (`E = V + Z * conj(S) / conj(V)`); the coefficient
/// of generator i against the reference is
/// `|E_ref| |E_i| (B[i,ref] cos(th_i - th_ref) - G[i,ref] sin(th_i - th_ref))`.
/// NaN coefficients from degenerate inputs are zeroed; the self entry is
/// zeroed; the column is normalized by its sum.
pub fn redistribution_ratios(
    reduced: &ReducedNetwork,
    network: &Network,
    injections: &HashMap<String, Injection>,
    gen_out: &str,
) -> Result<Redistribution> {
    let dist_bus = network.generator_bus(gen_out)?;
    let ref_idx = reduced
        .gen_bus_names
        .iter()
        .position(|name| name == dist_bus)
        .ok_or_else(|| Error::GeneratorNotFound(gen_out.to_string()))?;
    info!(
        "synchronizing power coefficients for outage of '{}' at bus '{}' (index {})",
        gen_out, dist_bus, ref_idx
    );

    let p = reduced.gen_bus_names.len();
    let mut e_abs = vec![0.0; p];
    let mut e_angle = vec![0.0; p];

    for (i, bus_name) in reduced.gen_bus_names.iter().enumerate() {
        let gen = network
            .generators
            .iter()
            .find(|g| &g.bus_to == bus_name)
            .ok_or_else(|| Error::GeneratorNotFound(bus_name.clone()))?;
        let lf = network
            .voltage(bus_name)
            .ok_or_else(|| Error::MissingLoadFlow(bus_name.clone()))?;

        let v = lf.phasor();
        let z = cmplx!(1.0) / gen.admittance(network.base_mva());
        let s = match injections.get(&gen.name) {
            Some(inj) => cmplx!(inj.p, inj.q),
            None => {
                warn!("no injection supplied for generator '{}': assuming zero", gen.name);
                cmplx!()
            }
        };

        let e = v + z * s.conj() / v.conj();
        e_abs[i] = e.norm();
        e_angle[i] = e.arg();
    }

    // coefficient column against the reference generator
    let mut k = vec![0.0; p];
    for i in 0..p {
        let y = reduced.y.get(i, ref_idx);
        let d_angle = e_angle[i] - e_angle[ref_idx];
        let k_i = e_abs[ref_idx] * e_abs[i] * (y.im * d_angle.cos() - y.re * d_angle.sin());
        k[i] = if k_i.is_nan() { 0.0 } else { k_i };
    }
    k[ref_idx] = 0.0;

    let sum: f64 = k.iter().sum();
    if sum == 0.0 {
        return Err(Error::DegenerateCoupling(gen_out.to_string()));
    }

    Ok(Redistribution {
        gen_bus_names: reduced.gen_bus_names.clone(),
        ratios: k.iter().map(|k_i| k_i / sum).collect(),
    })
}
