use crate::dense::Mat;
use crate::error::Result;
use crate::network::Network;
use log::{debug, warn};
use num_complex::Complex64;

/// One generator retained by the reduction.
#[derive(Clone, Debug)]
pub struct GenEntry {
    /// Original bus index of the generator terminal.
    pub bus: usize,
    /// Name of the terminal bus.
    pub bus_name: String,
    /// Generator series admittance in system per-unit.
    pub y: Complex64,
}

/// Stable partition of the bus indices: non-generator buses first,
/// generator buses last in generator traversal order.
pub struct Partition {
    /// Row/column order applied to the full Y-bus; `order[new] = old`.
    pub order: Vec<usize>,
    /// Inverse permutation back to original bus identity; `inverse[old] = new`.
    pub inverse: Vec<usize>,
    /// Retained generators in traversal order.
    pub gens: Vec<GenEntry>,
}

impl Partition {
    /// Number of buses to be eliminated.
    pub fn eliminated(&self) -> usize {
        self.order.len() - self.gens.len()
    }
}

/// Generator-only equivalent network: a p x p matrix whose rows/columns are
/// keyed by `gen_bus_names` (generator traversal order, not bus index order).
pub struct ReducedNetwork {
    pub y: Mat<Complex64>,
    pub gen_bus_names: Vec<String>,
}

/// Partitions the bus set for Kron reduction. A generator whose terminal
/// bus is unmapped is dropped with a warning; a second generator on an
/// already-claimed bus is dropped too (first occurrence wins).
pub fn partition_buses(network: &Network) -> Partition {
    let nb = network.bus_count();
    let mut is_gen = vec![false; nb];
    let mut gens = Vec::with_capacity(network.generators.len());

    for gen in &network.generators {
        let Some(i) = network.index_of(&gen.bus_to) else {
            warn!(
                "generator '{}' references unmapped bus '{}': skipped",
                gen.name, gen.bus_to
            );
            continue;
        };
        if is_gen[i] {
            warn!(
                "bus '{}' already hosts a generator: '{}' ignored",
                gen.bus_to, gen.name
            );
            continue;
        }
        is_gen[i] = true;
        gens.push(GenEntry {
            bus: i,
            bus_name: network.buses[i].name.clone(),
            y: gen.admittance(network.base_mva()),
        });
    }

    let mut order: Vec<usize> = (0..nb).filter(|&i| !is_gen[i]).collect();
    order.extend(gens.iter().map(|g| g.bus));

    let mut inverse = vec![0; nb];
    for (new, &old) in order.iter().enumerate() {
        inverse[old] = new;
    }

    Partition {
        order,
        inverse,
        gens,
    }
}

/// Eliminates every non-generator bus from the full Y-bus, leaving the
/// equivalent seen from p synthetic generator-internal nodes.
///
/// The matrix is extended with one row/column per generator (its own
/// admittance on the diagonal, a negative link to its terminal bus) and the
/// Schur complement eliminates all original buses. When there are no
/// non-generator buses the matrix is already generator-only and is returned
/// reordered, without elimination.
pub fn kron_reduce(y_bus: &Mat<Complex64>, network: &Network) -> Result<ReducedNetwork> {
    let part = partition_buses(network);
    let p = part.gens.len();
    let nb = part.order.len();
    let names: Vec<String> = part.gens.iter().map(|g| g.bus_name.clone()).collect();

    let y_sorted = y_bus.select(&part.order);
    if part.eliminated() == 0 {
        debug!("no non-generator buses: reduction is a reordering");
        return Ok(ReducedNetwork {
            y: y_sorted,
            gen_bus_names: names,
        });
    }

    // extended matrix: p synthetic internal nodes in front of the
    // reordered original buses
    let mut y_ext = Mat::zeros(p + nb, p + nb);
    for (i, gen) in part.gens.iter().enumerate() {
        let terminal = p + part.inverse[gen.bus];
        y_ext.set(i, i, gen.y);
        y_ext.set(i, terminal, -gen.y);
        y_ext.set(terminal, i, -gen.y);
    }
    for r in 0..nb {
        for c in 0..nb {
            y_ext.set(p + r, p + c, y_sorted.get(r, c));
        }
    }

    Ok(ReducedNetwork {
        y: schur_reduce(&y_ext, p)?,
        gen_bus_names: names,
    })
}

/// Schur complement `Y_RR - Y_RL * Y_LL^-1 * Y_LR` retaining the first `p`
/// rows/columns. Singular `Y_LL` means a disconnected or under-specified
/// network and is fatal.
pub fn schur_reduce(y: &Mat<Complex64>, p: usize) -> Result<Mat<Complex64>> {
    let n = y.rows();
    let y_rr = y.block(0..p, 0..p);
    let y_rl = y.block(0..p, p..n);
    let y_lr = y.block(p..n, 0..p);
    let y_ll = y.block(p..n, p..n);

    let y_ll_inv = y_ll.inverse()?;
    Ok(y_rr.sub(&y_rl.mat_mat(&y_ll_inv).mat_mat(&y_lr)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::elements::{Line, Load, SynchronousGenerator};
    use crate::network::{Bus, NetworkBuilder};
    use crate::ybus::make_ybus;
    use anyhow::Result;

    fn assert_close(a: Complex64, b: Complex64) {
        assert!((a - b).norm() < 1e-9, "{} != {}", a, b);
    }

    // -5j on a 100 MVA base
    fn gen(name: &str, bus: &str) -> SynchronousGenerator {
        SynchronousGenerator {
            name: name.to_string(),
            bus_to: bus.to_string(),
            s_rat: 200.0,
            u_rat: 15.0,
            r_a: 0.0,
            x_as: 0.1,
            x_d1: 0.3,
        }
    }

    // -10j on a 100 MVA base
    fn line(name: &str, from: &str, to: &str) -> Line {
        Line {
            name: name.to_string(),
            bus_from: from.to_string(),
            bus_to: to.to_string(),
            resistance: 0.0,
            reactance: 10.0,
            susceptance_effective: 0.0,
            susceptance_ground: 0.0,
            rated_voltage: 100.0,
            parallel: 1,
        }
    }

    // 0.5 p.u. at V = 1
    fn load(name: &str, bus: &str) -> Load {
        Load {
            name: name.to_string(),
            bus_to: bus.to_string(),
            p: 50.0,
            q: 0.0,
            voltage: 1.0,
        }
    }

    fn series(a: Complex64, b: Complex64) -> Complex64 {
        a * b / (a + b)
    }

    #[test]
    fn test_single_generator_single_bus_is_trivial() -> Result<()> {
        let net = NetworkBuilder::default()
            .base_mva(100.0)
            .buses(vec![Bus::new("a")])
            .generators(vec![gen("G1", "a")])
            .build()?;
        let y_bus = make_ybus(&net)?;
        let red = kron_reduce(&y_bus, &net)?;

        assert_eq!(red.gen_bus_names, vec!["a".to_string()]);
        assert_eq!(red.y.shape(), (1, 1));
        assert_close(red.y.get(0, 0), net.generators[0].admittance(100.0));
        Ok(())
    }

    #[test]
    fn test_elimination_yields_series_equivalent() -> Result<()> {
        // internal node - y_g - gen bus - y_line - load bus - y_load - ground
        let net = NetworkBuilder::default()
            .base_mva(100.0)
            .buses(vec![Bus::new("g"), Bus::new("m")])
            .generators(vec![gen("G1", "g")])
            .lines(vec![line("l1", "g", "m")])
            .loads(vec![load("ld", "m")])
            .build()?;
        let y_bus = make_ybus(&net)?;
        let red = kron_reduce(&y_bus, &net)?;

        let y_g = net.generators[0].admittance(100.0);
        let y_l = net.lines[0].admittance(100.0);
        let y_ld = net.loads[0].admittance(100.0);
        let expected = series(y_g, series(y_l, y_ld));

        assert_eq!(red.y.shape(), (1, 1));
        assert_close(red.y.get(0, 0), expected);
        Ok(())
    }

    #[test]
    fn test_generator_traversal_order_is_preserved() -> Result<()> {
        let net = NetworkBuilder::default()
            .base_mva(100.0)
            .buses(vec![Bus::new("a"), Bus::new("b"), Bus::new("c")])
            .generators(vec![gen("G-c", "c"), gen("G-a", "a")])
            .lines(vec![line("l1", "a", "b"), line("l2", "b", "c")])
            .loads(vec![load("ld", "b")])
            .build()?;

        let part = partition_buses(&net);
        // non-generator bus first, then generators in traversal order
        assert_eq!(part.order, vec![1, 2, 0]);
        assert_eq!(part.eliminated(), 1);
        for (new, &old) in part.order.iter().enumerate() {
            assert_eq!(part.inverse[old], new);
        }

        let red = kron_reduce(&make_ybus(&net)?, &net)?;
        assert_eq!(red.gen_bus_names, vec!["c".to_string(), "a".to_string()]);
        Ok(())
    }

    #[test]
    fn test_duplicate_generator_bus_first_wins() -> Result<()> {
        let net = NetworkBuilder::default()
            .base_mva(100.0)
            .buses(vec![Bus::new("a")])
            .generators(vec![gen("G1", "a"), gen("G2", "a")])
            .build()?;
        let part = partition_buses(&net);
        assert_eq!(part.gens.len(), 1);
        assert_eq!(part.gens[0].bus_name, "a");
        Ok(())
    }

    #[test]
    fn test_floating_bus_is_singular() -> Result<()> {
        let net = NetworkBuilder::default()
            .base_mva(100.0)
            .buses(vec![Bus::new("g"), Bus::new("floating")])
            .generators(vec![gen("G1", "g")])
            .build()?;
        let y_bus = make_ybus(&net)?;
        assert!(matches!(
            kron_reduce(&y_bus, &net),
            Err(Error::SingularNetwork)
        ));
        Ok(())
    }
}
