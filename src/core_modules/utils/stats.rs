pub mod stats {
    /// Rounds to a fixed number of decimal places.
    pub fn round_to(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }

    /// `(min, max, mean)` of a non-empty slice.
    pub fn summarize(values: &[f64]) -> Option<(f64, f64, f64)> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some((min, max, mean))
    }
}

#[cfg(test)]
mod tests {
    use super::stats::*;

    #[test]
    fn rounding() {
        assert_eq!(round_to(70.04, 1), 70.0);
        assert_eq!(round_to(70.05001, 1), 70.1);
        assert_eq!(round_to(2.345678, 2), 2.35);
        assert_eq!(round_to(84.6, 0), 85.0);
    }

    #[test]
    fn summary() {
        assert_eq!(summarize(&[3.0, 1.0, 2.0]), Some((1.0, 3.0, 2.0)));
        assert_eq!(summarize(&[]), None);
    }
}
