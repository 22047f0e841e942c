use crate::cmplx;
use crate::dense::Mat;
use crate::error::{Error, Result};
use crate::math::{floor_zero, floor_zero_complex, J};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Transmission line or cable between two buses.
///
/// Nameplate impedances are in physical units; `admittance` converts to the
/// system per-unit base. A `parallel` count greater than one is applied at
/// stamping time as if all circuits were identical.
#[derive(Clone, Debug)]
pub struct Line {
    pub name: String,
    pub bus_from: String,
    pub bus_to: String,

    /// Series resistance (Ohm).
    pub resistance: f64,

    /// Series reactance (Ohm).
    pub reactance: f64,

    /// Effective shunt susceptance (uS).
    pub susceptance_effective: f64,

    /// Shunt susceptance to ground (uS).
    pub susceptance_ground: f64,

    /// Rated voltage (kV).
    pub rated_voltage: f64,

    /// Number of identical parallel circuits.
    pub parallel: usize,
}

impl Line {
    fn impedance(&self, base_mva: f64) -> Complex64 {
        let z_base = self.rated_voltage * self.rated_voltage / base_mva;
        Complex64::new(self.resistance / z_base, self.reactance / z_base)
    }

    /// Series admittance in system per-unit.
    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        cmplx!(1.0) / floor_zero_complex(self.impedance(base_mva))
    }

    /// Total shunt admittance in system per-unit; half is stamped on each
    /// terminal diagonal.
    pub fn shunt_admittance(&self, base_mva: f64) -> Complex64 {
        let y_base = base_mva / (self.rated_voltage * self.rated_voltage);
        let b_eff = self.susceptance_effective * 1e-6 / y_base;
        let b_gnd = self.susceptance_ground * 1e-6 / y_base;
        J * (b_eff + b_gnd)
    }
}

/// Closed circuit breaker or disconnector, modelled as a near-short through
/// its on-resistance. Open switches must not enter the model at all.
#[derive(Clone, Debug)]
pub struct Switch {
    pub name: String,
    pub bus_from: String,
    pub bus_to: String,

    /// Contact resistance when closed (Ohm).
    pub on_resistance: f64,

    /// Voltage level of the connected busbars (kV).
    pub voltage_level: f64,

    pub closed: bool,
}

impl Switch {
    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let y_units = 1.0 / floor_zero(self.on_resistance);
        let y_base = base_mva / (self.voltage_level * self.voltage_level);
        cmplx!(y_units / y_base)
    }
}

/// Generic two-port impedance, a simplified two-winding transformer model.
///
/// `tap_ratio` and `phase_shift` are carried but not applied to the
/// admittance; the model is only valid for ratio 1 and shift 0.
#[derive(Clone, Debug)]
pub struct CommonImpedance {
    pub name: String,
    pub bus_from: String,
    pub bus_to: String,

    /// Resistance (p.u. on `s_rat`/`u_nominal_hv`).
    pub r: f64,

    /// Reactance (p.u. on `s_rat`/`u_nominal_hv`).
    pub x: f64,

    /// Nominal voltage, HV side (kV).
    pub u_nominal_hv: f64,

    /// Nominal voltage, LV side (kV).
    pub u_nominal_lv: f64,

    /// Rated power (MVA).
    pub s_rat: f64,

    pub tap_ratio: f64,

    /// Phase shift angle (rad).
    pub phase_shift: f64,
}

impl CommonImpedance {
    fn impedance(&self) -> Complex64 {
        let r = floor_zero(self.r);
        let x = floor_zero(self.x);
        // own-base p.u. to physical units
        Complex64::new(r, x) * self.s_rat / (self.u_nominal_hv * self.u_nominal_hv)
    }

    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let y_units = cmplx!(1.0) / self.impedance();
        let y_base = base_mva / (self.u_nominal_hv * self.u_nominal_hv);
        y_units / y_base
    }
}

/// The four entries of the asymmetric two-winding transformer pi-stamp.
#[derive(Clone, Copy, Debug)]
pub struct TrafoStamp {
    pub y_aa: Complex64,
    pub y_bb: Complex64,
    pub y_ab: Complex64,
    pub y_ba: Complex64,
}

/// Two-winding transformer with off-nominal tap ratio.
///
/// `phase_shift`, `tap_position` and `voltage_per_tap` are carried but not
/// applied to the tap ratio; only the rated/nominal voltage mismatch enters
/// the stamp.
#[derive(Clone, Debug)]
pub struct TwoWindingTransformer {
    pub name: String,

    /// HV-side bus.
    pub bus_from: String,

    /// LV-side bus.
    pub bus_to: String,

    /// Rated power (MVA).
    pub s_rat: f64,

    /// Short-circuit voltage (%).
    pub u_k: f64,

    /// Resistive part of the short-circuit voltage (%).
    pub u_k_r: f64,

    /// Nominal voltage, HV side (kV).
    pub u_nominal_hv: f64,

    /// Nominal voltage, LV side (kV).
    pub u_nominal_lv: f64,

    /// Rated voltage, HV side (kV).
    pub u_rated_hv: f64,

    /// Rated voltage, LV side (kV).
    pub u_rated_lv: f64,

    /// Phase shift angle (rad).
    pub phase_shift: f64,

    pub tap_position: f64,

    /// Tap step size (% of voltage per tap).
    pub voltage_per_tap: f64,

    /// Number of identical parallel transformers.
    pub parallel: usize,
}

impl TwoWindingTransformer {
    fn impedance(&self, base_mva: f64) -> Result<Complex64> {
        let z_pu = self.u_k / 100.0;
        let mut r_pu = self.u_k_r / 100.0;

        if z_pu * z_pu < r_pu * r_pu {
            return Err(Error::InvalidElement {
                name: self.name.clone(),
                reason: format!("u_k ({}) smaller than u_k_r ({})", self.u_k, self.u_k_r),
            });
        }
        let mut x_pu = (z_pu * z_pu - r_pu * r_pu).sqrt();

        // rescale from the transformer's own rating to the system base
        if self.s_rat != base_mva {
            let scaling = base_mva / self.s_rat;
            r_pu *= scaling;
            x_pu *= scaling;
        }
        Ok(Complex64::new(r_pu, x_pu))
    }

    pub fn admittance(&self, base_mva: f64) -> Result<Complex64> {
        Ok(cmplx!(1.0) / floor_zero_complex(self.impedance(base_mva)?))
    }

    /// Off-nominal tap ratio magnitude: rated voltage ratio over nominal
    /// voltage ratio. Phase shift is not included.
    pub fn tap_ratio(&self) -> f64 {
        let a_tr = self.u_rated_hv / self.u_rated_lv;
        let a_sys = self.u_nominal_hv / self.u_nominal_lv;
        a_tr / a_sys
    }

    /// Entries for the asymmetric stamp, before the parallel scaling.
    pub fn stamp(&self, base_mva: f64) -> Result<TrafoStamp> {
        let y = self.admittance(base_mva)?;
        let a = cmplx!(self.tap_ratio());
        Ok(TrafoStamp {
            y_aa: y / (a * a.conj()),
            y_bb: y,
            y_ab: -y / a.conj(),
            y_ba: -y / a,
        })
    }
}

/// Three-winding transformer reduced to a delta network between its
/// HV/MV/LV terminals. Phase shift and tap effects of the physical star
/// model are omitted.
#[derive(Clone, Debug)]
pub struct ThreeWindingTransformer {
    pub name: String,
    pub bus_hv: String,
    pub bus_mv: String,
    pub bus_lv: String,

    /// Short-circuit voltage, HV-MV pair (%).
    pub u_k_percent_ab: f64,

    /// Short-circuit voltage, MV-LV pair (%).
    pub u_k_percent_bc: f64,

    /// Short-circuit voltage, LV-HV pair (%).
    pub u_k_percent_ca: f64,

    /// Rated power, HV-MV pair (MVA).
    pub s_nom_ab: f64,

    /// Rated power, MV-LV pair (MVA).
    pub s_nom_bc: f64,

    /// Rated power, LV-HV pair (MVA).
    pub s_nom_ca: f64,
}

impl ThreeWindingTransformer {
    // pairwise impedances in p.u. on a 1 MVA common base
    fn z_ab(&self) -> f64 {
        (self.u_k_percent_ab / 100.0) * (1.0 / self.s_nom_ab)
    }
    fn z_bc(&self) -> f64 {
        (self.u_k_percent_bc / 100.0) * (1.0 / self.s_nom_bc)
    }
    fn z_ca(&self) -> f64 {
        (self.u_k_percent_ca / 100.0) * (1.0 / self.s_nom_ca)
    }

    /// 3x3 delta admittance matrix over the (HV, MV, LV) terminals:
    /// off-diagonals are the negative pairwise admittances, diagonals the
    /// sum of the two adjacent ones.
    pub fn delta_admittance(&self) -> Mat<Complex64> {
        let y_ab = cmplx!(1.0 / floor_zero(self.z_ab()));
        let y_bc = cmplx!(1.0 / floor_zero(self.z_bc()));
        let y_ca = cmplx!(1.0 / floor_zero(self.z_ca()));

        let mut y = Mat::zeros(3, 3);
        y.set(0, 1, -y_ab);
        y.set(1, 0, -y_ab);
        y.set(1, 2, -y_bc);
        y.set(2, 1, -y_bc);
        y.set(0, 2, -y_ca);
        y.set(2, 0, -y_ca);

        y.set(0, 0, y_ab + y_ca);
        y.set(1, 1, y_ab + y_bc);
        y.set(2, 2, y_bc + y_ca);
        y
    }
}

/// Synchronous machine in the classical model: a constant internal EMF
/// behind `r_a + j(x_as + x_d1)` on the machine base.
#[derive(Clone, Debug)]
pub struct SynchronousGenerator {
    pub name: String,

    /// Terminal bus.
    pub bus_to: String,

    /// Rated power (MVA).
    pub s_rat: f64,

    /// Rated voltage (kV).
    pub u_rat: f64,

    /// Armature resistance (p.u. on machine base).
    pub r_a: f64,

    /// Armature leakage reactance (p.u. on machine base).
    pub x_as: f64,

    /// Transient reactance (p.u. on machine base).
    pub x_d1: f64,
}

impl SynchronousGenerator {
    fn impedance(&self) -> Complex64 {
        let z_machine = Complex64::new(self.r_a, self.x_as + self.x_d1);
        // machine p.u. to physical units
        floor_zero_complex(z_machine * (self.u_rat * self.u_rat / self.s_rat))
    }

    /// Series admittance in system per-unit. Diagonal-only contribution.
    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let y_units = cmplx!(1.0) / self.impedance();
        let y_base = base_mva / (self.u_rat * self.u_rat);
        y_units / y_base
    }
}

/// Static load converted to a constant admittance at its solved voltage.
/// `p` and `q` must already include the load's own scaling factor.
#[derive(Clone, Debug)]
pub struct Load {
    pub name: String,
    pub bus_to: String,

    /// Active power (MW).
    pub p: f64,

    /// Reactive power (MVAr).
    pub q: f64,

    /// Solved voltage magnitude at the bus (p.u.).
    pub voltage: f64,
}

impl Load {
    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let s = Complex64::new(self.p / base_mva, -self.q / base_mva);
        s / floor_zero(self.voltage * self.voltage)
    }
}

/// External grid as a short-circuit equivalent.
#[derive(Clone, Debug)]
pub struct ExternalGrid {
    pub name: String,
    pub bus_to: String,

    /// Rated voltage (kV).
    pub u_rat: f64,

    /// Short-circuit power (MVA).
    pub s_sc: f64,

    /// Voltage correction factor.
    pub c_factor: f64,

    /// R/X ratio of the short-circuit impedance.
    pub r_x: f64,
}

impl ExternalGrid {
    fn impedance(&self) -> Complex64 {
        let z_sc = self.u_rat * self.u_rat / self.s_sc;
        let r = z_sc * (self.r_x / (1.0 + self.r_x)) * self.c_factor;
        let x = z_sc * (1.0 / (1.0 + self.r_x * self.r_x).sqrt()) * self.c_factor;
        Complex64::new(r, x)
    }

    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let y_units = cmplx!(1.0) / floor_zero_complex(self.impedance());
        let y_base = base_mva / (self.u_rat * self.u_rat);
        y_units / y_base
    }
}

/// Ideal AC voltage source behind a fixed series impedance.
#[derive(Clone, Debug)]
pub struct VoltageSource {
    pub name: String,
    pub bus_to: String,

    /// Rated voltage (kV).
    pub u_rat: f64,

    /// Series resistance (Ohm).
    pub r: f64,

    /// Series reactance (Ohm).
    pub x: f64,
}

impl VoltageSource {
    pub fn admittance(&self, base_mva: f64) -> Complex64 {
        let z = Complex64::new(floor_zero(self.r), floor_zero(self.x));
        let y_units = cmplx!(1.0) / z;
        let y_base = base_mva / (self.u_rat * self.u_rat);
        y_units / y_base
    }
}

/// Shunt circuit layout. The variants are mutually exclusive; `RlcRp` is
/// not representable by the admittance model and must be rejected.
#[derive(Clone, Debug)]
pub enum ShuntModel {
    /// Series R-L branch with a parallel capacitive susceptance.
    Rlc {
        /// Capacitive susceptance (uS).
        b_cap: f64,
        /// Reactance (Ohm).
        x: f64,
        /// Resistance (Ohm).
        r: f64,
    },
    /// Series R-L branch only.
    Rl {
        /// Reactance (Ohm).
        x: f64,
        /// Resistance (Ohm).
        r: f64,
    },
    /// Capacitor bank with a parasitic parallel conductance.
    C {
        /// Capacitive susceptance (uS).
        b_cap: f64,
        /// Parasitic conductance (uS).
        g_parallel: f64,
    },
    /// R-L-C with a parallel resistance; unsupported.
    RlcRp,
    /// Resonant filter: series R, L, C1 branch in parallel with Rp, in
    /// series with C2.
    Rlc1C2Rp {
        /// Resonant frequency (Hz).
        f_res: f64,
        /// Branch capacitance (uF).
        c1: f64,
        /// Series capacitance (uF).
        c2: f64,
        /// Reactance (Ohm).
        x: f64,
        /// Resistance (Ohm).
        r: f64,
        /// Parallel resistance (Ohm).
        r_parallel: f64,
    },
}

/// Switchable shunt element at a single bus.
#[derive(Clone, Debug)]
pub struct Shunt {
    pub name: String,
    pub bus_to: String,

    /// Rated voltage (kV).
    pub u_rat: f64,

    pub model: ShuntModel,
}

impl Shunt {
    pub fn admittance(&self, base_mva: f64) -> Result<Complex64> {
        let y_units = match &self.model {
            ShuntModel::Rlc { b_cap, x, r } => {
                let g = r / floor_zero(r * r + x * x);
                Complex64::new(g, b_cap * 1e-6)
            }
            ShuntModel::Rl { x, r } => {
                let g = r / floor_zero(r * r + x * x);
                cmplx!(g)
            }
            ShuntModel::C { b_cap, g_parallel } => {
                Complex64::new(g_parallel * 1e-6, b_cap * 1e-6)
            }
            ShuntModel::RlcRp => {
                return Err(Error::UnsupportedShunt {
                    name: self.name.clone(),
                    model: "R-L-C-Rp",
                });
            }
            ShuntModel::Rlc1C2Rp {
                f_res,
                c1,
                c2,
                x,
                r,
                r_parallel,
            } => {
                let omega = 2.0 * PI * f_res;
                let b1 = floor_zero(omega * c1 * 1e-6);
                let b2 = omega * c2 * 1e-6;

                let z_branch = Complex64::new(*r, x - 1.0 / b1);
                let y_branch = cmplx!(1.0) / floor_zero_complex(z_branch);
                let y_p = cmplx!(1.0 / floor_zero(*r_parallel));
                let y_c2 = J * b2;

                // branch and Rp in parallel, then in series with C2
                (y_branch + y_p) * y_c2 / (y_branch + y_p + y_c2)
            }
        };
        let y_base = base_mva / (self.u_rat * self.u_rat);
        Ok(y_units / y_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use crate::math::Z_FLOOR;

    fn assert_close(a: Complex64, b: Complex64) {
        assert!((a - b).norm() < 1e-9, "{} != {}", a, b);
    }

    fn test_line(r: f64, x: f64) -> Line {
        Line {
            name: "line".to_string(),
            bus_from: "a".to_string(),
            bus_to: "b".to_string(),
            resistance: r,
            reactance: x,
            susceptance_effective: 0.0,
            susceptance_ground: 0.0,
            rated_voltage: 100.0,
            parallel: 1,
        }
    }

    #[test]
    fn test_line_per_unit_admittance() {
        // x_pu = 10 / (100^2 / 100) = 0.1 => Y = 1/(j 0.1) = -10j
        let line = test_line(0.0, 10.0);
        assert_close(line.admittance(100.0), cmplx!(0.0, -10.0));
    }

    #[test]
    fn test_line_zero_impedance_clamped() {
        let line = test_line(0.0, 0.0);
        let y = line.admittance(100.0);
        assert!(y.re.is_finite() && y.im.is_finite());
        // Z_pu floored at Z_FLOOR
        assert!(y.norm() <= 1.0 / Z_FLOOR + 1.0);
    }

    #[test]
    fn test_line_shunt_admittance() {
        let mut line = test_line(0.0, 10.0);
        line.susceptance_effective = 50.0; // uS
        line.susceptance_ground = 10.0; // uS
        // (60e-6) / (100 / 100^2) = 6e-3
        assert_close(line.shunt_admittance(100.0), cmplx!(0.0, 6e-3));
    }

    fn test_trafo() -> TwoWindingTransformer {
        TwoWindingTransformer {
            name: "t1".to_string(),
            bus_from: "hv".to_string(),
            bus_to: "lv".to_string(),
            s_rat: 100.0,
            u_k: 10.0,
            u_k_r: 0.0,
            u_nominal_hv: 220.0,
            u_nominal_lv: 110.0,
            u_rated_hv: 220.0,
            u_rated_lv: 110.0,
            phase_shift: 0.0,
            tap_position: 0.0,
            voltage_per_tap: 0.0,
            parallel: 1,
        }
    }

    #[test]
    fn test_trafo_unit_ratio_collapses_to_branch_stamp() -> anyhow::Result<()> {
        let t = test_trafo();
        assert_eq!(t.tap_ratio(), 1.0);
        let y = t.admittance(100.0)?;
        let s = t.stamp(100.0)?;
        assert_close(s.y_aa, y);
        assert_close(s.y_bb, y);
        assert_close(s.y_ab, -y);
        assert_close(s.y_ba, -y);
        Ok(())
    }

    #[test]
    fn test_trafo_off_nominal_ratio() -> anyhow::Result<()> {
        let mut t = test_trafo();
        t.u_rated_hv = 231.0; // a = (231/110) / (220/110) = 1.05
        let a = t.tap_ratio();
        assert!((a - 1.05).abs() < 1e-12);
        let y = t.admittance(100.0)?;
        let s = t.stamp(100.0)?;
        assert_close(s.y_aa, y / (a * a));
        assert_close(s.y_bb, y);
        assert_close(s.y_ab, -y / a);
        assert_close(s.y_ba, -y / a);
        Ok(())
    }

    #[test]
    fn test_trafo_rescales_to_system_base() -> anyhow::Result<()> {
        let mut t = test_trafo();
        t.s_rat = 50.0;
        // x_pu = 0.1 * 100/50 = 0.2 => Y = -5j
        assert_close(t.admittance(100.0)?, cmplx!(0.0, -5.0));
        Ok(())
    }

    #[test]
    fn test_trafo_invalid_short_circuit_voltage() {
        let mut t = test_trafo();
        t.u_k = 1.0;
        t.u_k_r = 2.0;
        assert!(matches!(
            t.admittance(100.0),
            Err(Error::InvalidElement { .. })
        ));
    }

    #[test]
    fn test_generator_admittance() {
        let g = SynchronousGenerator {
            name: "g1".to_string(),
            bus_to: "a".to_string(),
            s_rat: 200.0,
            u_rat: 15.0,
            r_a: 0.0,
            x_as: 0.1,
            x_d1: 0.3,
        };
        // Z = j0.4 * 15^2/200 = j0.45 Ohm; Y_units = -j/0.45
        // Y_pu = Y_units * 15^2/100 = -j * 2.25/0.45 = -5j
        assert_close(g.admittance(100.0), cmplx!(0.0, -5.0));
    }

    #[test]
    fn test_load_constant_admittance() {
        let load = Load {
            name: "l1".to_string(),
            bus_to: "a".to_string(),
            p: 50.0,
            q: 10.0,
            voltage: 1.0,
        };
        assert_close(load.admittance(100.0), cmplx!(0.5, -0.1));
    }

    #[test]
    fn test_external_grid_r_x_split() {
        let grid = ExternalGrid {
            name: "x1".to_string(),
            bus_to: "a".to_string(),
            u_rat: 110.0,
            s_sc: 1000.0,
            c_factor: 1.0,
            r_x: 0.1,
        };
        let z_sc = 110.0 * 110.0 / 1000.0;
        let r = z_sc * (0.1 / 1.1);
        let x = z_sc / (1.0f64 + 0.01).sqrt();
        let y_units = cmplx!(1.0) / Complex64::new(r, x);
        let expected = y_units * (110.0 * 110.0) / 100.0;
        assert_close(grid.admittance(100.0), expected);
    }

    #[test]
    fn test_three_winding_delta_rows_sum_to_zero() {
        let t = ThreeWindingTransformer {
            name: "t3".to_string(),
            bus_hv: "a".to_string(),
            bus_mv: "b".to_string(),
            bus_lv: "c".to_string(),
            u_k_percent_ab: 12.0,
            u_k_percent_bc: 8.0,
            u_k_percent_ca: 10.0,
            s_nom_ab: 300.0,
            s_nom_bc: 150.0,
            s_nom_ca: 300.0,
        };
        let y = t.delta_admittance();
        for i in 0..3 {
            let sum: Complex64 = (0..3).map(|j| y.get(i, j)).sum();
            assert_close(sum, cmplx!());
            for j in 0..3 {
                assert_close(y.get(i, j), y.get(j, i));
            }
        }
    }

    #[test]
    fn test_shunt_unsupported_topology() {
        let shunt = Shunt {
            name: "s1".to_string(),
            bus_to: "a".to_string(),
            u_rat: 20.0,
            model: ShuntModel::RlcRp,
        };
        assert!(matches!(
            shunt.admittance(100.0),
            Err(Error::UnsupportedShunt { .. })
        ));
    }

    #[test]
    fn test_shunt_rlc_admittance() -> anyhow::Result<()> {
        let shunt = Shunt {
            name: "s1".to_string(),
            bus_to: "a".to_string(),
            u_rat: 20.0,
            model: ShuntModel::Rlc {
                b_cap: 500.0,
                x: 10.0,
                r: 1.0,
            },
        };
        let g = 1.0 / 101.0;
        let expected = Complex64::new(g, 500.0 * 1e-6) / (100.0 / 400.0);
        assert_close(shunt.admittance(100.0)?, expected);
        Ok(())
    }

    #[test]
    fn test_shunt_filter_branch() -> anyhow::Result<()> {
        let shunt = Shunt {
            name: "filter".to_string(),
            bus_to: "a".to_string(),
            u_rat: 20.0,
            model: ShuntModel::Rlc1C2Rp {
                f_res: 250.0,
                c1: 50.0,
                c2: 30.0,
                x: 2.0,
                r: 0.5,
                r_parallel: 1000.0,
            },
        };
        let omega = 2.0 * PI * 250.0;
        let b1 = omega * 50.0 * 1e-6;
        let b2 = omega * 30.0 * 1e-6;
        let y_branch = cmplx!(1.0) / Complex64::new(0.5, 2.0 - 1.0 / b1);
        let y_p = cmplx!(1e-3);
        let y_c2 = J * b2;
        let y_units = (y_branch + y_p) * y_c2 / (y_branch + y_p + y_c2);
        let expected = y_units / (100.0 / 400.0);
        assert_close(shunt.admittance(100.0)?, expected);
        Ok(())
    }
}
