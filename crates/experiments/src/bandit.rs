//! UCB1 multi-armed bandit.

use serde::Serialize;
use uuid::Uuid;

/// Per-arm counters. `mean_reward` is derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ArmStats {
    pub count: u64,
    pub total_reward: f64,
}

impl ArmStats {
    pub fn mean_reward(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_reward / self.count as f64
        }
    }
}

/// UCB1 selection over a fixed arm set:
///
/// ```text
/// selected = argmax_v  mean_reward(v) + c * sqrt(ln(total) / count(v))
/// ```
///
/// Arms with `count = 0` are treated as +∞ and selected first, in
/// insertion order.
#[derive(Debug, Clone)]
pub struct Ucb1 {
    arms: Vec<(Uuid, ArmStats)>,
    total_count: u64,
    exploration_factor: f64,
}

impl Ucb1 {
    pub fn new(variant_ids: impl IntoIterator<Item = Uuid>, exploration_factor: f64) -> Self {
        Self {
            arms: variant_ids
                .into_iter()
                .map(|id| (id, ArmStats::default()))
                .collect(),
            total_count: 0,
            exploration_factor,
        }
    }

    /// Pick the arm with the highest upper confidence bound.
    pub fn select(&self) -> Option<Uuid> {
        if self.arms.is_empty() {
            return None;
        }

        // Unexplored arms first.
        if let Some((id, _)) = self.arms.iter().find(|(_, stats)| stats.count == 0) {
            return Some(*id);
        }

        let ln_total = (self.total_count as f64).ln();
        self.arms
            .iter()
            .map(|(id, stats)| {
                let bonus = self.exploration_factor * (ln_total / stats.count as f64).sqrt();
                (*id, stats.mean_reward() + bonus)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Record a reward for an arm. Unknown arms are ignored.
    pub fn update(&mut self, variant_id: Uuid, reward: f64) {
        if let Some((_, stats)) = self.arms.iter_mut().find(|(id, _)| *id == variant_id) {
            stats.count += 1;
            stats.total_reward += reward;
            self.total_count += 1;
        }
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn stats(&self, variant_id: Uuid) -> Option<ArmStats> {
        self.arms
            .iter()
            .find(|(id, _)| *id == variant_id)
            .map(|(_, stats)| *stats)
    }

    /// Snapshot of all arms in insertion order.
    pub fn snapshot(&self) -> Vec<(Uuid, ArmStats)> {
        self.arms.clone()
    }

    /// Arm with the best observed mean, among arms with samples.
    pub fn best_arm(&self) -> Option<(Uuid, ArmStats)> {
        self.arms
            .iter()
            .filter(|(_, stats)| stats.count > 0)
            .max_by(|a, b| a.1.mean_reward().total_cmp(&b.1.mean_reward()))
            .copied()
    }

    /// Runner-up by mean reward, among arms with samples.
    pub fn runner_up(&self) -> Option<(Uuid, ArmStats)> {
        let best = self.best_arm()?;
        self.arms
            .iter()
            .filter(|(id, stats)| *id != best.0 && stats.count > 0)
            .max_by(|a, b| a.1.mean_reward().total_cmp(&b.1.mean_reward()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_arms_are_selected_first_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut bandit = Ucb1::new([a, b], 2.0);

        assert_eq!(bandit.select(), Some(a));
        bandit.update(a, 1.0);
        assert_eq!(bandit.select(), Some(b));
        bandit.update(b, 0.0);

        // Both explored once; invariants hold.
        assert_eq!(bandit.total_count(), 2);
        assert_eq!(bandit.stats(a).unwrap().mean_reward(), 1.0);
        assert_eq!(bandit.stats(b).unwrap().mean_reward(), 0.0);
    }

    #[test]
    fn rewarded_arm_wins_the_next_selection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut bandit = Ucb1::new([a, b], 2.0);
        bandit.update(a, 1.0);
        bandit.update(b, 0.0);
        assert_eq!(bandit.select(), Some(a));
    }

    #[test]
    fn exploration_bonus_revisits_the_undersampled_arm() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut bandit = Ucb1::new([a, b], 2.0);
        // a is slightly better but heavily sampled; b barely sampled.
        for _ in 0..50 {
            bandit.update(a, 0.6);
        }
        bandit.update(b, 0.5);
        // The confidence bonus on b dominates the small mean gap.
        assert_eq!(bandit.select(), Some(b));
    }

    #[test]
    fn total_count_equals_sum_of_counts() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut bandit = Ucb1::new([a, b], 2.0);
        for i in 0..10 {
            bandit.update(if i % 2 == 0 { a } else { b }, 0.5);
        }
        let sum: u64 = bandit.snapshot().iter().map(|(_, s)| s.count).sum();
        assert_eq!(bandit.total_count(), sum);
    }

    #[test]
    fn unknown_arm_updates_are_ignored() {
        let a = Uuid::new_v4();
        let mut bandit = Ucb1::new([a], 2.0);
        bandit.update(Uuid::new_v4(), 1.0);
        assert_eq!(bandit.total_count(), 0);
    }
}
