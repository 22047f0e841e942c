use crate::dense::Mat;
use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};
use std::f64::consts::PI;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(6);

pub fn format_complex(z: &Complex64) -> String {
    format!(
        "{}{}j{}",
        dtoa(z.re, FLOAT_CONFIG),
        if z.im.signum() < 0.0 { "-" } else { "+" },
        dtoa(z.im.abs(), FLOAT_CONFIG)
    )
}

pub fn format_polar(z: &Complex64) -> String {
    format!(
        "{}\u{2220}{}\u{00B0}",
        dtoa(z.norm(), FLOAT_CONFIG),
        dtoa(z.arg() * 180.0 / PI, FLOAT_CONFIG)
    )
}

/// Renders a bus-name-labeled admittance matrix as a text table.
pub fn format_labeled_matrix(labels: &[String], m: &Mat<Complex64>) -> String {
    assert_eq!(labels.len(), m.rows());
    assert_eq!(labels.len(), m.cols());

    let cells: Vec<Vec<String>> = (0..m.rows())
        .map(|i| (0..m.cols()).map(|j| format_complex(&m.get(i, j))).collect())
        .collect();
    let lw = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    let cw = cells
        .iter()
        .flatten()
        .map(|s| s.len())
        .chain(labels.iter().map(|l| l.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("{:lw$}", ""));
    for label in labels {
        out.push_str(&format!(" {:>cw$}", label));
    }
    out.push('\n');
    for (i, label) in labels.iter().enumerate() {
        out.push_str(&format!("{:lw$}", label));
        for cell in &cells[i] {
            out.push_str(&format!(" {:>cw$}", cell));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;

    #[test]
    fn test_format_complex() {
        assert_eq!(format_complex(&cmplx!(1.5, -2.0)), "1.5-j2");
        assert_eq!(format_complex(&cmplx!(0.0, 10.0)), "0+j10");
    }

    #[test]
    fn test_format_polar() {
        assert_eq!(format_polar(&cmplx!(0.0, 10.0)), "10\u{2220}90\u{00B0}");
        assert_eq!(format_polar(&cmplx!(-1.0, 0.0)), "1\u{2220}180\u{00B0}");
    }

    #[test]
    fn test_format_labeled_matrix() {
        let labels = vec!["Bus A".to_string(), "B".to_string()];
        let m = Mat::from_values(
            2,
            2,
            vec![cmplx!(0.0, -10.0), cmplx!(0.0, 10.0), cmplx!(0.0, 10.0), cmplx!(0.0, -10.0)],
        );
        let table = format_labeled_matrix(&labels, &m);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Bus A"));
        assert!(lines[1].starts_with("Bus A"));
        assert!(lines[1].contains("0-j10"));
        assert!(lines[2].starts_with("B"));
    }
}
