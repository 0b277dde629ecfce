//! Simplified two-proportion z-statistic for the stop rule.
//!
//! The confidence approximation (`min(0.99, |z| / 3)`) is deliberately
//! coarse; a sequential or Bayesian test would be the rigorous upgrade.

/// Approximate confidence that proportion `p1` (over `n1` samples) truly
/// beats `p2` (over `n2` samples). Returns 0 when the difference or the
/// sample sizes don't support a read.
pub fn two_proportion_confidence(p1: f64, n1: u64, p2: f64, n2: u64) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 0.0;
    }
    let diff = p1 - p2;
    if diff <= 0.0 {
        return 0.0;
    }

    let se = ((p1 * (1.0 - p1)) / n1 as f64 + (p2 * (1.0 - p2)) / n2 as f64).sqrt();
    if se <= 0.0 {
        // Degenerate proportions (all 0s or all 1s on both arms): with a
        // real difference and no variance, treat as conclusive.
        return 0.99;
    }

    let z = diff / se;
    (z.abs() / 3.0).min(0.99)
}
