//! Team-average ELO arithmetic.
//!
//! Deltas are computed once per match from the two teams' average ratings
//! and applied uniformly to every member, so recomputing from the same
//! pre-match ratings always yields the same result.

use serde::{Deserialize, Serialize};

/// Rating assigned to players the profile store has never seen.
pub const DEFAULT_ELO: i32 = 500;

/// Tunables for the logistic expectation curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EloSettings {
    /// Maximum rating movement per match.
    pub k: f64,
    /// Rating gap at which the stronger side is expected to win ~91%.
    pub spread: f64,
}

impl Default for EloSettings {
    fn default() -> Self {
        Self {
            k: 32.0,
            spread: 400.0,
        }
    }
}

/// Arithmetic mean of a team's ratings. Empty teams rate at the default.
pub fn team_average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return DEFAULT_ELO as f64;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

/// Probability that a side rated `own` beats a side rated `opp`.
pub fn expected_score(own: f64, opp: f64, spread: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opp - own) / spread))
}

/// Signed rating change for team1 given its actual score
/// (1.0 win, 0.5 draw, 0.0 loss). Team2's change is the exact negation,
/// which is what keeps the system zero-sum.
pub fn team1_delta(settings: &EloSettings, team1_avg: f64, team2_avg: f64, score: f64) -> i32 {
    let expected = expected_score(team1_avg, team2_avg, settings.spread);
    (settings.k * (score - expected)).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_score_even_match_is_half() {
        let e = expected_score(500.0, 500.0, 400.0);
        assert!((e - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_expected_score_favors_higher_rating() {
        let strong = expected_score(700.0, 500.0, 400.0);
        let weak = expected_score(500.0, 700.0, 400.0);
        assert!(strong > 0.5);
        assert!(weak < 0.5);
        assert!((strong + weak - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_team_average_of_empty_is_default() {
        assert_eq!(team_average(&[]), DEFAULT_ELO as f64);
    }

    #[test]
    fn test_team1_delta_even_win_is_half_k() {
        let settings = EloSettings::default();
        assert_eq!(team1_delta(&settings, 500.0, 500.0, 1.0), 16);
        assert_eq!(team1_delta(&settings, 500.0, 500.0, 0.0), -16);
    }

    #[test]
    fn test_team1_delta_even_draw_is_zero() {
        let settings = EloSettings::default();
        assert_eq!(team1_delta(&settings, 500.0, 500.0, 0.5), 0);
    }

    #[test]
    fn test_team1_delta_underdog_draw_gains() {
        // A weaker team1 drawing a stronger team2 should gain a little.
        let settings = EloSettings::default();
        let d = team1_delta(&settings, 400.0, 600.0, 0.5);
        assert!(d > 0, "underdog draw should gain, got {d}");
        assert!(d < 16, "draw movement should stay near zero, got {d}");
    }

    #[test]
    fn test_team1_delta_is_deterministic() {
        let settings = EloSettings::default();
        let a = team1_delta(&settings, 523.0, 481.0, 1.0);
        let b = team1_delta(&settings, 523.0, 481.0, 1.0);
        assert_eq!(a, b);
    }
}
