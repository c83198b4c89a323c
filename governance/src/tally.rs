//! Tally arithmetic and the execution gate
//!
//! Ratios are fixed-point values out of [`RATIO_BASE`]. Comparisons are done
//! by cross-multiplication in 256-bit precision so no division rounds a
//! threshold in the voters' favor.

use serde::{Deserialize, Serialize};

use concord_core::VoteOption;

/// Denominator of every ratio (100% = 1_000_000)
pub const RATIO_BASE: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u128,
    pub no: u128,
    pub abstain: u128,
}

impl Tally {
    pub fn add(&mut self, option: VoteOption, power: u128) {
        match option {
            VoteOption::Yes => self.yes = self.yes.saturating_add(power),
            VoteOption::No => self.no = self.no.saturating_add(power),
            VoteOption::Abstain => self.abstain = self.abstain.saturating_add(power),
            VoteOption::None => {}
        }
    }

    /// Take back a contribution made with [`Tally::add`]
    pub fn retract(&mut self, option: VoteOption, power: u128) {
        match option {
            VoteOption::Yes => self.yes = self.yes.saturating_sub(power),
            VoteOption::No => self.no = self.no.saturating_sub(power),
            VoteOption::Abstain => self.abstain = self.abstain.saturating_sub(power),
            VoteOption::None => {}
        }
    }

    pub fn casted(&self) -> u128 {
        self.yes.saturating_add(self.no).saturating_add(self.abstain)
    }
}

/// Full 256-bit product as `(high, low)` halves
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// `a * b > c * d` without overflow
fn product_gt(a: u128, b: u128, c: u128, d: u128) -> bool {
    widening_mul(a, b) > widening_mul(c, d)
}

/// `ceil(value * ratio / RATIO_BASE)`
pub fn apply_ratio_ceiled(value: u128, ratio: u32) -> u128 {
    let base = RATIO_BASE as u128;
    let ratio = ratio as u128;
    let (quotient, remainder) = (value / base, value % base);
    let partial = remainder * ratio;

    let mut result = quotient
        .saturating_mul(ratio)
        .saturating_add(partial / base);
    if partial % base != 0 {
        result = result.saturating_add(1);
    }
    result
}

/// `yes / (yes + no) > support_threshold`
pub fn is_support_threshold_reached(tally: &Tally, support_threshold: u32) -> bool {
    let t = support_threshold as u128;
    product_gt(RATIO_BASE as u128 - t, tally.yes, t, tally.no)
}

/// Support is reached even if every voter who has not voted yet votes no:
/// `yes / (total - abstain) > support_threshold`
pub fn is_support_threshold_reached_early(
    tally: &Tally,
    support_threshold: u32,
    total_voting_power: u128,
) -> bool {
    let t = support_threshold as u128;
    let worst_case_no = total_voting_power
        .saturating_sub(tally.yes)
        .saturating_sub(tally.abstain);
    product_gt(RATIO_BASE as u128 - t, tally.yes, t, worst_case_no)
}

pub fn is_min_participation_reached(tally: &Tally, min_voting_power: u128) -> bool {
    tally.casted() >= min_voting_power
}

/// Where a proposal's voting window stands relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    NotStarted,
    Open,
    Ended,
}

impl Window {
    pub fn at(start_date: u64, end_date: u64, now: u64) -> Self {
        if now < start_date {
            Window::NotStarted
        } else if now < end_date {
            Window::Open
        } else {
            Window::Ended
        }
    }
}

/// Inputs of the execution gate for one proposal
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub tally: &'a Tally,
    pub early_execution: bool,
    pub support_threshold: u32,
    pub min_voting_power: u128,
    pub total_voting_power: u128,
    pub window: Window,
    pub executed: bool,
}

/// Whether a proposal may be executed right now.
///
/// While voting is open only early execution with worst-case support
/// qualifies. Once it has ended, plain support decides. Participation is
/// required either way.
pub fn can_execute(input: GateInput<'_>) -> bool {
    if input.executed {
        return false;
    }
    let support = match input.window {
        Window::NotStarted => return false,
        Window::Open => {
            input.early_execution
                && is_support_threshold_reached_early(
                    input.tally,
                    input.support_threshold,
                    input.total_voting_power,
                )
        }
        Window::Ended => is_support_threshold_reached(input.tally, input.support_threshold),
    };
    support && is_min_participation_reached(input.tally, input.min_voting_power)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF: u32 = 500_000;

    fn tally(yes: u128, no: u128, abstain: u128) -> Tally {
        Tally { yes, no, abstain }
    }

    fn gate(tally: &Tally, window: Window) -> GateInput<'_> {
        GateInput {
            tally,
            early_execution: true,
            support_threshold: HALF,
            min_voting_power: apply_ratio_ceiled(10, 200_000),
            total_voting_power: 10,
            window,
            executed: false,
        }
    }

    #[test]
    fn test_widening_mul() {
        assert_eq!(widening_mul(3, 4), (0, 12));
        assert_eq!(widening_mul(u128::MAX, 2), (1, u128::MAX - 1));
        assert_eq!(widening_mul(u128::MAX, u128::MAX), (u128::MAX - 1, 1));
    }

    #[test]
    fn test_apply_ratio_ceiled() {
        assert_eq!(apply_ratio_ceiled(10, 200_000), 2);
        assert_eq!(apply_ratio_ceiled(10, 210_000), 3);
        assert_eq!(apply_ratio_ceiled(10, 0), 0);
        assert_eq!(apply_ratio_ceiled(10, RATIO_BASE), 10);
        assert_eq!(apply_ratio_ceiled(3, 333_334), 2);
        // No overflow near the top of the range
        assert_eq!(apply_ratio_ceiled(u128::MAX, RATIO_BASE), u128::MAX);
    }

    #[test]
    fn test_support_is_strict() {
        assert!(!is_support_threshold_reached(&tally(5, 5, 0), HALF));
        assert!(is_support_threshold_reached(&tally(6, 5, 0), HALF));
        assert!(!is_support_threshold_reached(&tally(0, 0, 4), HALF));
        // Zero threshold still needs one yes vote
        assert!(!is_support_threshold_reached(&tally(0, 0, 0), 0));
        assert!(is_support_threshold_reached(&tally(1, 9, 0), 0));
    }

    #[test]
    fn test_support_with_huge_power() {
        let big = u128::MAX / 2;
        assert!(is_support_threshold_reached(&tally(big, big - 1, 0), HALF));
        assert!(!is_support_threshold_reached(&tally(big - 1, big, 0), HALF));
    }

    #[test]
    fn test_worst_case_support() {
        // 6 of 10 voted yes: even 4 late no votes cannot flip it
        assert!(is_support_threshold_reached_early(&tally(6, 0, 0), HALF, 10));
        assert!(!is_support_threshold_reached_early(&tally(5, 0, 0), HALF, 10));
        // 3 yes, 2 no, 2 abstain: 3 of 8 non-abstaining
        assert!(!is_support_threshold_reached_early(&tally(3, 2, 2), HALF, 10));
    }

    #[test]
    fn test_participation_is_inclusive() {
        assert!(is_min_participation_reached(&tally(1, 0, 1), 2));
        assert!(!is_min_participation_reached(&tally(1, 0, 0), 2));
    }

    #[test]
    fn test_gate_early_execution() {
        let six_yes = tally(6, 0, 0);
        assert!(can_execute(gate(&six_yes, Window::Open)));

        let mut standard = gate(&six_yes, Window::Open);
        standard.early_execution = false;
        assert!(!can_execute(standard));
        assert!(!can_execute(gate(&six_yes, Window::NotStarted)));

        let mut executed = gate(&six_yes, Window::Ended);
        executed.executed = true;
        assert!(!can_execute(executed));
    }

    #[test]
    fn test_gate_after_end() {
        let mixed = tally(3, 2, 2);
        assert!(!can_execute(gate(&mixed, Window::Open)));
        assert!(can_execute(gate(&mixed, Window::Ended)));
    }

    #[test]
    fn test_gate_requires_participation() {
        let one_yes = tally(1, 0, 0);
        assert!(!can_execute(gate(&one_yes, Window::Ended)));
    }

    #[test]
    fn test_window() {
        assert_eq!(Window::at(10, 20, 9), Window::NotStarted);
        assert_eq!(Window::at(10, 20, 10), Window::Open);
        assert_eq!(Window::at(10, 20, 19), Window::Open);
        assert_eq!(Window::at(10, 20, 20), Window::Ended);
    }
}
