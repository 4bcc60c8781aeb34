//! Deadline countdown and action eligibility.
//!
//! Everything here is a pure function of the loaded snapshot and `now`, so
//! the scheduler and the tests drive it the same way.
//!
//! ```text
//! Active ──(now ≥ deadline)──► ExpiredGoalMet     (collected ≥ goal)
//!        └───────────────────► ExpiredGoalMissed  (collected < goal)
//! ```

use alloy_primitives::U256;
use serde::Serialize;

/// Read-only projection of the contract's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CampaignState {
    pub goal: U256,
    pub collected: U256,
    /// Unix seconds.
    pub deadline: u64,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    ExpiredGoalMet,
    ExpiredGoalMissed,
}

/// Which actions the page offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub donate: bool,
    pub withdraw: bool,
    pub refund: bool,
}

impl Phase {
    pub fn affordances(self) -> Affordances {
        match self {
            Phase::Active => Affordances {
                donate: true,
                withdraw: false,
                refund: false,
            },
            Phase::ExpiredGoalMet => Affordances {
                donate: false,
                withdraw: true,
                refund: false,
            },
            Phase::ExpiredGoalMissed => Affordances {
                donate: false,
                withdraw: false,
                refund: true,
            },
        }
    }
}

pub fn evaluate(state: &CampaignState, now: u64) -> Phase {
    if now < state.deadline {
        Phase::Active
    } else if state.collected >= state.goal {
        Phase::ExpiredGoalMet
    } else {
        Phase::ExpiredGoalMissed
    }
}

/// `"{m}m {s}s"` while running, `"Time's up"` afterwards.
pub fn time_left_label(deadline: u64, now: u64) -> String {
    match deadline.checked_sub(now).filter(|left| *left > 0) {
        Some(left) => format!("{}m {}s", left / 60, left % 60),
        None => "Time's up".to_string(),
    }
}

/// Percentage of the goal collected, capped at 100.
pub fn progress_percent(collected: U256, goal: U256) -> u8 {
    if goal.is_zero() {
        return 0;
    }
    let percent = collected.saturating_mul(U256::from(100u8)) / goal;
    percent.min(U256::from(100u8)).to::<u8>()
}

/// Badge shown next to the campaign title, from the contract's own flag.
pub fn status_label(completed: bool) -> &'static str {
    if completed {
        "FINISHED"
    } else {
        "ACTIVE"
    }
}

/// Everything the countdown part of the page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub phase: Phase,
    pub time_left: String,
    pub affordances: Affordances,
}

impl Countdown {
    pub fn compute(state: &CampaignState, now: u64) -> Self {
        let phase = evaluate(state, now);
        Self {
            phase,
            time_left: time_left_label(state.deadline, now),
            affordances: phase.affordances(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::utils::parse_ether;

    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn state(goal: u64, collected: u64, deadline: u64) -> CampaignState {
        CampaignState {
            goal: U256::from(goal),
            collected: U256::from(collected),
            deadline,
            completed: false,
        }
    }

    #[test]
    fn goal_met_after_deadline_enables_withdraw_only() {
        let countdown = Countdown::compute(&state(10, 10, NOW - 1), NOW);
        assert_eq!(countdown.phase, Phase::ExpiredGoalMet);
        assert_eq!(
            countdown.affordances,
            Affordances {
                donate: false,
                withdraw: true,
                refund: false
            }
        );
    }

    #[test]
    fn goal_missed_after_deadline_enables_refund_only() {
        let countdown = Countdown::compute(&state(10, 4, NOW - 1), NOW);
        assert_eq!(countdown.phase, Phase::ExpiredGoalMissed);
        assert_eq!(
            countdown.affordances,
            Affordances {
                donate: false,
                withdraw: false,
                refund: true
            }
        );
    }

    #[test]
    fn before_deadline_only_donations_are_open() {
        let countdown = Countdown::compute(&state(10, 4, NOW + 90), NOW);
        assert_eq!(countdown.phase, Phase::Active);
        assert_eq!(
            countdown.affordances,
            Affordances {
                donate: true,
                withdraw: false,
                refund: false
            }
        );
    }

    #[test]
    fn active_regardless_of_amounts() {
        for (goal, collected) in [(0, 0), (10, 0), (10, 10), (10, 500), (u64::MAX, 1)] {
            assert_eq!(
                evaluate(&state(goal, collected, NOW + 1), NOW),
                Phase::Active
            );
        }
    }

    #[test]
    fn deadline_itself_counts_as_expired() {
        assert_eq!(evaluate(&state(10, 10, NOW), NOW), Phase::ExpiredGoalMet);
        assert_eq!(evaluate(&state(10, 9, NOW), NOW), Phase::ExpiredGoalMissed);
    }

    #[test]
    fn expired_phase_follows_amount_comparison() {
        for collected in 0..=20u64 {
            let expected = if collected >= 10 {
                Phase::ExpiredGoalMet
            } else {
                Phase::ExpiredGoalMissed
            };
            assert_eq!(evaluate(&state(10, collected, NOW - 60), NOW), expected);
        }
    }

    #[test]
    fn comparison_is_exact_beyond_float_precision() {
        // Both exceed 2^53; an f64 comparison would call them equal.
        let goal = parse_ether("9007199.254740993").unwrap();
        let collected = goal - U256::from(1u8);
        let state = CampaignState {
            goal,
            collected,
            deadline: NOW - 1,
            completed: false,
        };
        assert_eq!(evaluate(&state, NOW), Phase::ExpiredGoalMissed);
    }

    #[test]
    fn time_left_formats_minutes_and_seconds() {
        assert_eq!(time_left_label(NOW + 125, NOW), "2m 5s");
        assert_eq!(time_left_label(NOW + 59, NOW), "0m 59s");
        assert_eq!(time_left_label(NOW, NOW), "Time's up");
        assert_eq!(time_left_label(NOW - 10, NOW), "Time's up");
    }

    #[test]
    fn countdown_is_idempotent() {
        let s = state(10, 4, NOW + 3600);
        assert_eq!(Countdown::compute(&s, NOW), Countdown::compute(&s, NOW));
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        assert_eq!(progress_percent(U256::from(4u8), U256::from(10u8)), 40);
        assert_eq!(progress_percent(U256::from(25u8), U256::from(10u8)), 100);
        assert_eq!(progress_percent(U256::MAX, U256::from(1u8)), 100);
        assert_eq!(progress_percent(U256::from(5u8), U256::ZERO), 0);
    }

    #[test]
    fn status_badge_tracks_completed_flag() {
        assert_eq!(status_label(false), "ACTIVE");
        assert_eq!(status_label(true), "FINISHED");
    }
}
