use num_complex::Complex64;

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

/// Floor applied to impedances that compute to exactly zero, so that
/// inversion never produces `inf`/`NaN` in the admittance matrix.
pub const Z_FLOOR: f64 = 1e-12;

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Replaces an exactly zero value with the `Z_FLOOR` clamp.
pub fn floor_zero(v: f64) -> f64 {
    if v == 0.0 {
        Z_FLOOR
    } else {
        v
    }
}

/// Replaces an exactly zero complex impedance with a real `Z_FLOOR`.
pub fn floor_zero_complex(z: Complex64) -> Complex64 {
    if z.re == 0.0 && z.im == 0.0 {
        Complex64::new(Z_FLOOR, 0.0)
    } else {
        z
    }
}
