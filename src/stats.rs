//! Summary statistics
//!
//! Mean and sample standard deviation are accumulated with Welford's online
//! algorithm, which stays numerically stable for long sequences.

/// Running mean/variance accumulator
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Arithmetic mean, or None when empty
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample standard deviation (N - 1 denominator), or None for fewer than 2 values
    pub fn sample_std_dev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        Some((self.m2 / (self.count - 1) as f64).sqrt())
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(values: &[f64]) -> RunningStats {
        values.iter().copied().collect()
    }

    #[test]
    fn test_mean() {
        assert_eq!(stats(&[]).mean(), None);
        assert!((stats(&[1.0, 2.0, 3.0, 4.0]).mean().unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(stats(&[3.0]).sample_std_dev(), None);

        // Deviations from mean 5: 9+1+1+1+0+0+4+16 = 32, / 7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0_f64 / 7.0).sqrt();
        assert!((stats(&values).sample_std_dev().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_values_have_zero_spread() {
        assert_eq!(stats(&[4.0, 4.0, 4.0]).sample_std_dev(), Some(0.0));
    }

    #[test]
    fn test_large_offset_stability() {
        // Naive sum-of-squares loses these digits entirely
        let values: Vec<f64> = (0..1000).map(|i| 1.0e9 + (i % 2) as f64).collect();
        let sd = stats(&values).sample_std_dev().unwrap();
        let expected = (250.0_f64 / 999.0).sqrt();
        assert!((sd - expected).abs() < 1e-6, "sd = {sd}");
    }
}
