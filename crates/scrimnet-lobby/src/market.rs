//! Auction state for the `market` draft mode.
//!
//! Every pooled player is auctioned exactly once, in rating-descending
//! order (ties broken by id, so the order is deterministic). One player is
//! up at a time; the deadline timer lives in the lobby actor, this module
//! only validates bids and resolves windows.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use scrimnet_protocol::{AuctionSale, AuctionSnapshot, Bids, Budgets, PlayerId, TeamId};

use crate::LobbyError;

/// Auction progress. Exists only during the `market` phase.
#[derive(Debug, Clone)]
pub struct AuctionState {
    queue: VecDeque<PlayerId>,
    current: Option<PlayerId>,
    budgets: [u32; 2],
    bids: [Option<u32>; 2],
    /// Maximum roster size per team, captain included.
    capacity: usize,
    window: Duration,
    /// Close time of the open window; `None` between windows.
    window_close: Option<Instant>,
    sold: Vec<AuctionSale>,
}

impl AuctionState {
    /// Orders the pool and opens the book. Call [`begin_next`] to put the
    /// first player up.
    ///
    /// [`begin_next`]: Self::begin_next
    pub fn new(
        mut pool: Vec<(PlayerId, i32)>,
        budget: u32,
        capacity: usize,
        window: Duration,
    ) -> Self {
        pool.sort_by(|(a_id, a_elo), (b_id, b_elo)| {
            b_elo.cmp(a_elo).then_with(|| a_id.cmp(b_id))
        });
        Self {
            queue: pool.into_iter().map(|(id, _)| id).collect(),
            current: None,
            budgets: [budget, budget],
            bids: [None, None],
            capacity,
            window,
            window_close: None,
            sold: Vec::new(),
        }
    }

    /// Puts the next pooled player up for auction, clears the bids, and
    /// stamps the window's close time.
    pub fn begin_next(&mut self) -> Option<PlayerId> {
        self.bids = [None, None];
        self.current = self.queue.pop_front();
        self.window_close = self.current.as_ref().map(|_| Instant::now() + self.window);
        self.current.clone()
    }

    /// The player currently up, if any.
    pub fn current(&self) -> Option<&PlayerId> {
        self.current.as_ref()
    }

    /// `true` once every pooled player has been resolved.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    /// Remaining budget for one team.
    pub fn budget(&self, team: TeamId) -> u32 {
        self.budgets[team.index()]
    }

    /// Validates and records a bid from `team`, whose roster currently has
    /// `roster_len` players. A bid must beat the current leading bid and
    /// fit within the team's remaining budget.
    pub fn place_bid(
        &mut self,
        team: TeamId,
        amount: u32,
        roster_len: usize,
    ) -> Result<(), LobbyError> {
        if self.current.is_none() {
            return Err(LobbyError::NoActiveAuction);
        }
        if roster_len >= self.capacity {
            return Err(LobbyError::TeamFull(team));
        }

        let leading = self.bids[0].max(self.bids[1]);
        let minimum = leading.map_or(1, |b| b + 1);
        if amount < minimum {
            return Err(LobbyError::BidTooLow { minimum });
        }

        let budget = self.budgets[team.index()];
        if amount > budget {
            return Err(LobbyError::InsufficientBudget { budget });
        }

        self.bids[team.index()] = Some(amount);
        Ok(())
    }

    /// Closes the current window and assigns the player.
    ///
    /// Highest bid wins, ties go to team1, and the winner's budget is
    /// debited. With no bids the player goes free to the team with more
    /// open slots, then more budget, then team1.
    pub fn resolve(
        &mut self,
        team1_len: usize,
        team2_len: usize,
    ) -> Result<AuctionSale, LobbyError> {
        let player = self.current.take().ok_or(LobbyError::NoActiveAuction)?;
        self.window_close = None;

        let (team, amount) = match (self.bids[0], self.bids[1]) {
            (Some(b1), Some(b2)) if b2 > b1 => (TeamId::Team2, b2),
            (Some(b1), _) => (TeamId::Team1, b1),
            (None, Some(b2)) => (TeamId::Team2, b2),
            (None, None) => (self.fallback_team(team1_len, team2_len), 0),
        };

        self.budgets[team.index()] -= amount;
        let sale = AuctionSale {
            odiscord_id: player,
            team,
            amount,
        };
        self.sold.push(sale.clone());
        self.bids = [None, None];
        Ok(sale)
    }

    fn fallback_team(&self, team1_len: usize, team2_len: usize) -> TeamId {
        let open1 = self.capacity.saturating_sub(team1_len);
        let open2 = self.capacity.saturating_sub(team2_len);
        if open1 == 0 {
            return TeamId::Team2;
        }
        if open2 == 0 || open1 > open2 {
            return TeamId::Team1;
        }
        if open2 > open1 {
            return TeamId::Team2;
        }
        if self.budgets[1] > self.budgets[0] {
            TeamId::Team2
        } else {
            TeamId::Team1
        }
    }

    /// Window length in seconds, for `auctionStart` events.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// When the open window closes; the actor arms its timer from this.
    pub fn deadline(&self) -> Option<Instant> {
        self.window_close
    }

    /// Wire-shaped view for the lobby snapshot.
    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            current: self.current.clone(),
            // Rounded up so a freshly opened window reports its full
            // length.
            seconds_left: self.window_close.map(|close| {
                let left = close.saturating_duration_since(Instant::now());
                left.as_millis().div_ceil(1000) as u64
            }),
            budgets: Budgets {
                team1: self.budgets[0],
                team2: self.budgets[1],
            },
            bids: Bids {
                team1: self.bids[0],
                team2: self.bids[1],
            },
            sold: self.sold.clone(),
        }
    }
}
