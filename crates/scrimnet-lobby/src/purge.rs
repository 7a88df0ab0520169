//! Random elimination of excess joiners ("the purge").
//!
//! Eliminations are drawn uniformly from the non-immune pool, one per
//! step, so observers see them sequentially. The RNG is injected, which
//! makes outcomes reproducible under a seed.

use std::time::Duration;

use rand::Rng;

use scrimnet_protocol::{PlayerId, PurgeSnapshot};

/// Elimination progress. Exists only during the `purging` phase.
#[derive(Debug, Clone)]
pub struct PurgeState {
    original_count: usize,
    target_count: usize,
    /// Non-immune members still eligible for elimination.
    pool: Vec<PlayerId>,
    eliminated: Vec<PlayerId>,
    immune: Vec<PlayerId>,
    countdown_seconds: Option<u64>,
}

impl PurgeState {
    /// `members` is the full roster; `immune` the subset holding a spent
    /// immunity token this round.
    pub fn new(
        members: Vec<PlayerId>,
        immune: Vec<PlayerId>,
        target_count: usize,
        countdown: Duration,
    ) -> Self {
        let original_count = members.len();
        let pool = members
            .into_iter()
            .filter(|m| !immune.contains(m))
            .collect();
        Self {
            original_count,
            target_count,
            pool,
            eliminated: Vec::new(),
            immune,
            countdown_seconds: Some(countdown.as_secs()),
        }
    }

    /// How many eliminations this purge owes in total.
    pub fn required(&self) -> usize {
        self.original_count.saturating_sub(self.target_count)
    }

    /// Marks the countdown as over; eliminations may begin.
    pub fn countdown_elapsed(&mut self) {
        self.countdown_seconds = None;
    }

    /// Eliminates one player uniformly at random from the pool, or `None`
    /// if the quota is met or the pool ran dry.
    ///
    /// An immune pool smaller than the quota means the purge completes
    /// short; the lobby proceeds over capacity rather than eliminating
    /// protected players.
    pub fn eliminate_one<R: Rng>(&mut self, rng: &mut R) -> Option<PlayerId> {
        if self.eliminated.len() >= self.required() || self.pool.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.pool.len());
        let victim = self.pool.swap_remove(idx);
        self.eliminated.push(victim.clone());
        Some(victim)
    }

    /// `true` once the quota is met or no eligible players remain.
    pub fn is_complete(&self) -> bool {
        self.eliminated.len() >= self.required() || self.pool.is_empty()
    }

    /// `true` if the purge ended with fewer eliminations than required.
    pub fn fell_short(&self) -> bool {
        self.is_complete() && self.eliminated.len() < self.required()
    }

    /// Players eliminated so far, in order.
    pub fn eliminated(&self) -> &[PlayerId] {
        &self.eliminated
    }

    /// Wire-shaped view for the lobby snapshot.
    pub fn snapshot(&self) -> PurgeSnapshot {
        PurgeSnapshot {
            original_count: self.original_count,
            target_count: self.target_count,
            eliminated: self.eliminated.clone(),
            immune: self.immune.clone(),
            countdown_seconds: self.countdown_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    fn members(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| PlayerId(format!("p{i}"))).collect()
    }

    #[test]
    fn test_purge_eliminates_exactly_the_excess() {
        let mut purge = PurgeState::new(members(10), vec![], 8, Duration::from_secs(5));
        let mut rng = StdRng::seed_from_u64(42);

        assert_eq!(purge.required(), 2);
        let first = purge.eliminate_one(&mut rng).unwrap();
        let second = purge.eliminate_one(&mut rng).unwrap();
        assert_ne!(first, second);
        assert!(purge.is_complete());
        assert_eq!(purge.eliminate_one(&mut rng), None);
        assert_eq!(purge.eliminated().len(), 2);
    }

    #[test]
    fn test_immune_player_is_never_eliminated() {
        let immune = vec![pid("p0"), pid("p1")];
        let mut purge = PurgeState::new(members(10), immune.clone(), 8, Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);

        while purge.eliminate_one(&mut rng).is_some() {}
        for protected in &immune {
            assert!(!purge.eliminated().contains(protected));
        }
    }

    #[test]
    fn test_purge_completes_short_when_pool_exhausted() {
        // 6 members, 5 immune, but 3 must go: only the one eligible
        // player can be eliminated.
        let immune: Vec<_> = members(5);
        let mut purge = PurgeState::new(members(6), immune, 3, Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(purge.eliminate_one(&mut rng), Some(pid("p5")));
        assert_eq!(purge.eliminate_one(&mut rng), None);
        assert!(purge.is_complete());
        assert!(purge.fell_short());
    }

    #[test]
    fn test_purge_is_seed_deterministic() {
        let run = |seed| {
            let mut purge = PurgeState::new(members(10), vec![], 8, Duration::ZERO);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut out = Vec::new();
            while let Some(p) = purge.eliminate_one(&mut rng) {
                out.push(p);
            }
            out
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_snapshot_reflects_countdown_then_progress() {
        let mut purge = PurgeState::new(members(9), vec![pid("p0")], 8, Duration::from_secs(5));
        assert_eq!(purge.snapshot().countdown_seconds, Some(5));

        purge.countdown_elapsed();
        let mut rng = StdRng::seed_from_u64(3);
        purge.eliminate_one(&mut rng).unwrap();

        let snap = purge.snapshot();
        assert_eq!(snap.countdown_seconds, None);
        assert_eq!(snap.original_count, 9);
        assert_eq!(snap.target_count, 8);
        assert_eq!(snap.eliminated.len(), 1);
        assert_eq!(snap.immune, vec![pid("p0")]);
    }
}
