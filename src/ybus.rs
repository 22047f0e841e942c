use crate::dense::Mat;
use crate::error::Result;
use crate::network::Network;
use log::{debug, warn};
use num_complex::Complex64;

/// Builds the dense bus admittance matrix in system per-unit.
///
/// Every element contributes through the stamping rule for its arity:
/// diagonal-only for single-terminal elements, the symmetric branch stamp
/// for simple two-terminal elements, the four-entry asymmetric stamp for
/// two-winding transformers and a 3x3 block for three-winding transformers.
/// Elements whose terminal bus is not in the topology index are skipped
/// with a warning. The result satisfies `I = Y * V`.
pub fn make_ybus(network: &Network) -> Result<Mat<Complex64>> {
    let nb = network.bus_count();
    let base_mva = network.base_mva();
    let mut y_bus = Mat::zeros(nb, nb);

    for line in &network.lines {
        let Some((f, t)) = branch_terminals(network, &line.name, &line.bus_from, &line.bus_to)
        else {
            continue;
        };
        let parallel = line.parallel as f64;
        let y = line.admittance(base_mva) * parallel;
        let y_shunt = line.shunt_admittance(base_mva) * parallel;

        y_bus.add(f, t, -y);
        y_bus.add(t, f, -y);
        y_bus.add(f, f, y + y_shunt / 2.0);
        y_bus.add(t, t, y + y_shunt / 2.0);
    }

    for switch in &network.switches {
        if !switch.closed {
            debug!("switch '{}' is open: excluded from the model", switch.name);
            continue;
        }
        let Some((f, t)) =
            branch_terminals(network, &switch.name, &switch.bus_from, &switch.bus_to)
        else {
            continue;
        };
        let y = switch.admittance(base_mva);
        y_bus.add(f, t, -y);
        y_bus.add(t, f, -y);
        y_bus.add(f, f, y);
        y_bus.add(t, t, y);
    }

    for ci in &network.common_impedances {
        let Some((f, t)) = branch_terminals(network, &ci.name, &ci.bus_from, &ci.bus_to) else {
            continue;
        };
        let y = ci.admittance(base_mva);
        y_bus.add(f, t, -y);
        y_bus.add(t, f, -y);
        y_bus.add(f, f, y);
        y_bus.add(t, t, y);
    }

    for trafo in &network.transformers_2w {
        let Some((f, t)) =
            branch_terminals(network, &trafo.name, &trafo.bus_from, &trafo.bus_to)
        else {
            continue;
        };
        let s = trafo.stamp(base_mva)?;
        let parallel = trafo.parallel as f64;

        y_bus.add(f, f, s.y_aa * parallel);
        y_bus.add(t, t, s.y_bb * parallel);
        y_bus.add(f, t, s.y_ab * parallel);
        y_bus.add(t, f, s.y_ba * parallel);
    }

    for trafo in &network.transformers_3w {
        let hv = network.index_of(&trafo.bus_hv);
        let mv = network.index_of(&trafo.bus_mv);
        let lv = network.index_of(&trafo.bus_lv);
        let (Some(hv), Some(mv), Some(lv)) = (hv, mv, lv) else {
            warn!(
                "three-winding transformer '{}' references an unmapped bus: skipped",
                trafo.name
            );
            continue;
        };
        let y_delta = trafo.delta_admittance();
        let terminals = [hv, mv, lv];
        for (i, &bi) in terminals.iter().enumerate() {
            for (j, &bj) in terminals.iter().enumerate() {
                y_bus.add(bi, bj, y_delta.get(i, j));
            }
        }
    }

    for gen in &network.generators {
        let Some(i) = shunt_terminal(network, &gen.name, &gen.bus_to) else {
            continue;
        };
        y_bus.add(i, i, gen.admittance(base_mva));
    }

    for load in &network.loads {
        let Some(i) = shunt_terminal(network, &load.name, &load.bus_to) else {
            continue;
        };
        y_bus.add(i, i, load.admittance(base_mva));
    }

    for grid in &network.external_grids {
        let Some(i) = shunt_terminal(network, &grid.name, &grid.bus_to) else {
            continue;
        };
        y_bus.add(i, i, grid.admittance(base_mva));
    }

    for source in &network.voltage_sources {
        let Some(i) = shunt_terminal(network, &source.name, &source.bus_to) else {
            continue;
        };
        y_bus.add(i, i, source.admittance(base_mva));
    }

    for shunt in &network.shunts {
        let Some(i) = shunt_terminal(network, &shunt.name, &shunt.bus_to) else {
            continue;
        };
        y_bus.add(i, i, shunt.admittance(base_mva)?);
    }

    Ok(y_bus)
}

fn branch_terminals(
    network: &Network,
    name: &str,
    bus_from: &str,
    bus_to: &str,
) -> Option<(usize, usize)> {
    match (network.index_of(bus_from), network.index_of(bus_to)) {
        (Some(f), Some(t)) => Some((f, t)),
        _ => {
            warn!(
                "element '{}' references an unmapped bus ('{}' or '{}'): skipped",
                name, bus_from, bus_to
            );
            None
        }
    }
}

fn shunt_terminal(network: &Network, name: &str, bus_to: &str) -> Option<usize> {
    match network.index_of(bus_to) {
        Some(i) => Some(i),
        None => {
            warn!(
                "element '{}' references unmapped bus '{}': skipped",
                name, bus_to
            );
            None
        }
    }
}
