//! Snake-draft turn tracking.
//!
//! The pick order follows the snake-2 pattern `1,2,2,1,1,2,2,1,…`, which
//! cancels the first-pick advantage pairwise: after every two rounds both
//! teams have picked the same number of times. Final roster sizes come out
//! equal, or within one for an odd pool.

use scrimnet_protocol::TeamId;

/// Turn state for the `drafting` phase. Exists only while the draft runs.
#[derive(Debug, Clone)]
pub struct DraftState {
    order: Vec<TeamId>,
    picked: usize,
}

impl DraftState {
    /// Builds the full pick order for `pool_size` unassigned players.
    pub fn new(pool_size: usize) -> Self {
        Self {
            order: (0..pool_size).map(snake_team).collect(),
            picked: 0,
        }
    }

    /// The team whose captain picks next, or `None` when done.
    pub fn current_turn(&self) -> Option<TeamId> {
        self.order.get(self.picked).copied()
    }

    /// Picks remaining.
    pub fn picks_left(&self) -> usize {
        self.order.len() - self.picked
    }

    /// Advances past the current pick.
    pub fn record_pick(&mut self) {
        if self.picked < self.order.len() {
            self.picked += 1;
        }
    }

    /// `true` once every pooled player has been picked.
    pub fn is_complete(&self) -> bool {
        self.picked >= self.order.len()
    }
}

/// Team on turn for pick index `i` under the snake-2 pattern.
fn snake_team(i: usize) -> TeamId {
    if ((i + 1) / 2) % 2 == 0 {
        TeamId::Team1
    } else {
        TeamId::Team2
    }
}
