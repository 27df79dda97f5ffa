use crate::format::format_value;
use crate::reminder::Reminder;
use crate::types::{
    Contribution, InputMode, Snapshot, Status, ThresholdField, Thresholds, SEED_LABEL,
};
use crate::undo::{UndoHistory, UndoRecord, Undone};

/// Counter state machine for one (device, process-type) pair.
///
/// Owns the contribution ledger, the threshold set, the undo history and
/// the reminder flag. The total is always summed from the ledger; the
/// derived flags are recomputed after every mutation.
#[derive(Debug, Clone)]
pub struct Engine {
    contributions: Vec<Contribution>,
    thresholds: Thresholds,
    history: UndoHistory,
    reminded: bool,
    input_mode: InputMode,
    has_fraction: bool,
    over_upper: bool,
    needs_change: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(InputMode::default())
    }
}

impl Engine {
    pub fn new(input_mode: InputMode) -> Self {
        Self::from_parts(Vec::new(), Thresholds::default(), input_mode, false)
    }

    /// Build an engine around existing state, with an empty undo history.
    pub fn from_parts(
        contributions: Vec<Contribution>,
        thresholds: Thresholds,
        input_mode: InputMode,
        reminded: bool,
    ) -> Self {
        let mut engine = Self {
            contributions,
            thresholds,
            history: UndoHistory::default(),
            reminded,
            input_mode,
            has_fraction: false,
            over_upper: false,
            needs_change: false,
        };
        engine.refresh();
        engine
    }

    // ── Ledger ──

    /// Append a contribution and return the new total.
    ///
    /// No range checking happens here; collaborators validate first.
    pub fn add_contribution(&mut self, batch_label: impl Into<String>, value: f64) -> f64 {
        let contribution = Contribution::new(batch_label, value);
        self.history.push(UndoRecord::AddContribution {
            contribution: contribution.clone(),
            prior_total: self.total(),
        });
        self.contributions.push(contribution);
        self.refresh();
        tracing::debug!(value, total = self.total(), "contribution added");
        self.total()
    }

    /// Empty the ledger. Returns the prior total, or `None` when the total
    /// is already zero (nothing is mutated or recorded in that case).
    pub fn reset(&mut self) -> Option<f64> {
        let prior_total = self.total();
        if prior_total == 0.0 {
            return None;
        }
        let prior = std::mem::take(&mut self.contributions);
        self.history.push(UndoRecord::ResetLedger { prior });
        self.reminded = false;
        self.refresh();
        tracing::debug!(prior_total, "ledger reset");
        Some(prior_total)
    }

    /// Replace the ledger with a single `sample` contribution of `value`.
    ///
    /// A non-empty ledger is first recorded as a reset, so two undos bring
    /// the previous sequence back. Returns the prior total.
    pub fn seed(&mut self, value: f64) -> f64 {
        let prior_total = self.total();
        if !self.contributions.is_empty() {
            let prior = std::mem::take(&mut self.contributions);
            self.history.push(UndoRecord::ResetLedger { prior });
        }
        self.add_contribution(SEED_LABEL, value);
        self.reminded = false;
        prior_total
    }

    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.value).sum()
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// True when any contribution in the ledger carries a fraction.
    pub fn has_fraction(&self) -> bool {
        self.has_fraction
    }

    // ── Thresholds ──

    pub fn set_target(&mut self, value: f64) -> f64 {
        self.set_threshold(ThresholdField::Target, value)
    }

    pub fn set_lower_limit(&mut self, value: f64) -> f64 {
        self.set_threshold(ThresholdField::LowerLimit, value)
    }

    pub fn set_upper_limit(&mut self, value: f64) -> f64 {
        self.set_threshold(ThresholdField::UpperLimit, value)
    }

    /// Unconditionally replace one threshold and return its prior value.
    pub fn set_threshold(&mut self, field: ThresholdField, value: f64) -> f64 {
        let prior = self.thresholds.replace(field, value);
        self.history.push(UndoRecord::threshold(field, prior, value));
        self.refresh();
        tracing::debug!(%field, prior, value, "threshold changed");
        prior
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    // ── Undo ──

    /// Pop and revert the most recent mutation. `None` when there is
    /// nothing to undo, or when the history no longer matches the ledger
    /// (the history is then dropped and nothing is changed).
    pub fn undo(&mut self) -> Option<Undone> {
        let record = self.history.pop()?;
        let kind = record.kind();
        let value = match record {
            UndoRecord::AddContribution { contribution, .. } => {
                if self.contributions.last() != Some(&contribution) {
                    tracing::warn!(
                        batch_label = %contribution.batch_label,
                        value = contribution.value,
                        "undo history does not match the ledger, discarding it"
                    );
                    self.history.clear();
                    return None;
                }
                self.contributions.pop();
                contribution.value
            }
            UndoRecord::ResetLedger { prior } => {
                self.contributions = prior;
                self.reminded = false;
                0.0
            }
            UndoRecord::SetTarget { prior, .. } => {
                self.thresholds.replace(ThresholdField::Target, prior)
            }
            UndoRecord::SetLowerLimit { prior, .. } => {
                self.thresholds.replace(ThresholdField::LowerLimit, prior)
            }
            UndoRecord::SetUpperLimit { prior, .. } => {
                self.thresholds.replace(ThresholdField::UpperLimit, prior)
            }
        };
        self.refresh();
        tracing::debug!(%kind, value, total = self.total(), "undone");
        Some(Undone { kind, value })
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Attach a previously saved history, e.g. after loading from a record.
    pub fn restore_history(&mut self, history: UndoHistory) {
        self.history = history;
        self.history.trim();
    }

    // ── Derived status ──

    fn refresh(&mut self) {
        let total = self.total();
        self.has_fraction = self.contributions.iter().any(Contribution::is_fractional);
        self.over_upper = total > self.thresholds.upper_limit;
        self.needs_change = self.thresholds.lower_limit <= total && total < self.thresholds.target;
    }

    pub fn is_over_upper(&self) -> bool {
        self.over_upper
    }

    pub fn needs_change(&self) -> bool {
        self.needs_change
    }

    /// Over-upper wins over the reminder band.
    pub fn status(&self) -> Status {
        if self.over_upper {
            Status::OverUpper
        } else if self.needs_change {
            Status::NeedsChange
        } else {
            Status::Normal
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        self.over_upper || self.needs_change
    }

    /// Whether adding `value` would push the total above the upper limit.
    pub fn would_exceed_upper(&self, value: f64) -> bool {
        self.total() + value > self.thresholds.upper_limit
    }

    // ── Reminder ──

    /// Evaluate the reminder state machine.
    ///
    /// Over-upper always yields [`Reminder::Forced`]. Inside the
    /// `[lower_limit, target)` band the first call latches the flag and
    /// yields [`Reminder::Reached`], later calls yield
    /// [`Reminder::Pending`]. Below the lower limit the flag is re-armed
    /// silently.
    pub fn check_reminder(&mut self) -> Option<Reminder> {
        let total = self.total();
        let Thresholds {
            target,
            lower_limit,
            upper_limit,
        } = self.thresholds;

        if self.over_upper {
            return Some(Reminder::Forced { total, upper_limit });
        }
        if lower_limit <= total && total < target {
            if self.reminded {
                return Some(Reminder::Pending { total, target });
            }
            self.reminded = true;
            return Some(Reminder::Reached { total, target });
        }
        if total < lower_limit {
            self.reminded = false;
        }
        None
    }

    pub fn is_reminded(&self) -> bool {
        self.reminded
    }

    // ── Mode / display ──

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// Switch the input mode. Not undoable. Returns the prior mode.
    pub fn set_input_mode(&mut self, mode: InputMode) -> InputMode {
        std::mem::replace(&mut self.input_mode, mode)
    }

    /// Format a value the way this engine's totals are displayed.
    pub fn format(&self, value: f64) -> String {
        format_value(value, self.has_fraction)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total: self.total(),
            target: self.thresholds.target,
            lower_limit: self.thresholds.lower_limit,
            upper_limit: self.thresholds.upper_limit,
            input_mode: self.input_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderLevel;
    use crate::undo::UndoKind;

    fn banded() -> Engine {
        let mut e = Engine::default();
        e.set_lower_limit(100.0);
        e.set_target(200.0);
        e.set_upper_limit(300.0);
        e
    }

    #[test]
    fn additions_then_undos_restore_prior_state() {
        let mut e = banded();
        e.add_contribution("A", 50.0);
        let before = (
            e.total(),
            e.status(),
            e.is_over_upper(),
            e.needs_change(),
            e.has_fraction(),
            e.contributions().to_vec(),
        );

        let values = [3.0, 7.5, 120.0, 0.25, 400.0];
        let mut expected = 50.0;
        for (i, v) in values.iter().enumerate() {
            expected += v;
            let total = e.add_contribution(format!("B{i}"), *v);
            assert_eq!(total, expected);
        }
        assert_eq!(e.status(), Status::OverUpper);
        assert!(e.has_fraction());

        for k in 1..=values.len() {
            e.undo().unwrap();
            let expected: f64 = 50.0 + values[..values.len() - k].iter().sum::<f64>();
            assert_eq!(e.total(), expected);
        }
        let after = (
            e.total(),
            e.status(),
            e.is_over_upper(),
            e.needs_change(),
            e.has_fraction(),
            e.contributions().to_vec(),
        );
        assert_eq!(after, before);
        assert_eq!(e.status(), Status::Normal);
    }

    #[test]
    fn reset_on_zero_is_a_noop() {
        let mut e = Engine::default();
        assert_eq!(e.reset(), None);
        assert!(!e.can_undo());

        e.set_target(10.0);
        let depth = e.undo_depth();
        assert_eq!(e.reset(), None);
        assert_eq!(e.undo_depth(), depth);
    }

    #[test]
    fn reset_then_undo_restores_sequence() {
        let mut e = Engine::default();
        e.add_contribution("A", 4.0);
        e.add_contribution("A", 6.0);
        assert_eq!(e.reset(), Some(10.0));
        assert_eq!(e.total(), 0.0);

        let undone = e.undo().unwrap();
        assert_eq!(undone, Undone { kind: UndoKind::ResetLedger, value: 0.0 });
        assert_eq!(
            e.contributions(),
            &[Contribution::new("A", 4.0), Contribution::new("A", 6.0)]
        );
        assert_eq!(e.total(), 10.0);
    }

    #[test]
    fn undo_pops_in_reverse_order() {
        let mut e = Engine::default();
        e.add_contribution("A", 5.0);
        e.add_contribution("B", 8.0);
        assert_eq!(e.undo().map(|u| u.value), Some(8.0));
        assert_eq!(e.undo().map(|u| u.value), Some(5.0));
        assert!(e.contributions().is_empty());
        assert_eq!(e.undo(), None);
    }

    #[test]
    fn undo_removes_last_entry_even_with_duplicate_labels() {
        let mut e = Engine::default();
        e.add_contribution("X", 1.0);
        e.add_contribution("X", 2.0);
        e.undo();
        assert_eq!(e.contributions(), &[Contribution::new("X", 1.0)]);
    }

    #[test]
    fn threshold_undo_restores_prior_and_reports_undone_value() {
        let mut e = Engine::default();
        let prior = e.thresholds().target;
        assert_eq!(e.set_target(500.0), prior);
        let undone = e.undo().unwrap();
        assert_eq!(undone.kind, UndoKind::SetTarget);
        assert_eq!(undone.value, 500.0);
        assert_eq!(e.thresholds().target, prior);
    }

    #[test]
    fn threshold_undo_is_visible_to_reminder() {
        let mut e = banded();
        e.add_contribution("A", 150.0);
        e.set_target(120.0);
        assert_eq!(e.check_reminder(), None);
        e.undo();
        assert!(matches!(e.check_reminder(), Some(Reminder::Reached { .. })));
    }

    #[test]
    fn threshold_setters_accept_inverted_ranges() {
        let mut e = Engine::default();
        e.set_lower_limit(900.0);
        e.set_upper_limit(10.0);
        assert_eq!(e.thresholds().lower_limit, 900.0);
        assert_eq!(e.thresholds().upper_limit, 10.0);
    }

    #[test]
    fn status_follows_total() {
        let mut e = banded();
        e.add_contribution("A", 50.0);
        assert_eq!(e.status(), Status::Normal);
        assert!(!e.is_out_of_range());
        e.add_contribution("B", 60.0);
        assert_eq!(e.status(), Status::NeedsChange);
        assert!(e.is_out_of_range());
        e.add_contribution("C", 100.0);
        assert_eq!(e.status(), Status::Normal);
        e.add_contribution("D", 100.0);
        assert_eq!(e.status(), Status::OverUpper);
        assert!(e.is_over_upper());
    }

    #[test]
    fn reminder_is_one_shot_within_band() {
        let mut e = banded();
        e.add_contribution("A", 60.0);
        assert_eq!(e.check_reminder(), None);

        e.add_contribution("B", 50.0);
        let r = e.check_reminder().unwrap();
        assert_eq!(r, Reminder::Reached { total: 110.0, target: 200.0 });
        assert_eq!(r.level(), ReminderLevel::Notice);
        assert!(e.is_reminded());

        e.add_contribution("C", 40.0);
        assert_eq!(
            e.check_reminder(),
            Some(Reminder::Pending { total: 150.0, target: 200.0 })
        );
    }

    #[test]
    fn forced_reminder_ignores_flag() {
        let mut e = banded();
        e.add_contribution("A", 150.0);
        e.check_reminder();
        assert!(e.is_reminded());
        e.add_contribution("B", 200.0);
        let r = e.check_reminder().unwrap();
        assert_eq!(r.level(), ReminderLevel::Forced);
        assert_eq!(r, Reminder::Forced { total: 350.0, upper_limit: 300.0 });
        assert_eq!(e.check_reminder().map(|r| r.level()), Some(ReminderLevel::Forced));
    }

    #[test]
    fn dropping_below_lower_rearms_reminder() {
        let mut e = banded();
        e.add_contribution("A", 60.0);
        e.add_contribution("B", 60.0);
        assert!(matches!(e.check_reminder(), Some(Reminder::Reached { .. })));

        e.undo();
        assert_eq!(e.check_reminder(), None);
        assert!(!e.is_reminded());

        e.add_contribution("B", 60.0);
        assert!(matches!(e.check_reminder(), Some(Reminder::Reached { .. })));
    }

    #[test]
    fn reset_rearms_reminder() {
        let mut e = banded();
        e.add_contribution("A", 150.0);
        e.check_reminder();
        e.reset();
        assert!(!e.is_reminded());
        e.undo();
        assert!(!e.is_reminded());
        assert!(matches!(e.check_reminder(), Some(Reminder::Reached { .. })));
    }

    #[test]
    fn add_undo_leaves_reminder_flag_latched() {
        let mut e = banded();
        e.add_contribution("A", 150.0);
        e.check_reminder();
        e.add_contribution("B", 10.0);
        e.undo();
        assert!(e.is_reminded());
    }

    #[test]
    fn seed_replaces_ledger_and_is_undoable() {
        let mut e = banded();
        e.add_contribution("A", 5.0);
        e.add_contribution("B", 7.0);
        e.add_contribution("C", 110.0);
        e.check_reminder();

        assert_eq!(e.seed(42.0), 122.0);
        assert_eq!(e.contributions(), &[Contribution::new(SEED_LABEL, 42.0)]);
        assert!(!e.is_reminded());

        e.undo();
        assert!(e.contributions().is_empty());
        e.undo();
        assert_eq!(e.total(), 122.0);
        assert_eq!(e.contributions().len(), 3);
    }

    #[test]
    fn seed_on_empty_ledger_pushes_single_record() {
        let mut e = Engine::default();
        e.seed(9.0);
        assert_eq!(e.undo_depth(), 1);
        e.undo();
        assert_eq!(e.total(), 0.0);
        assert!(!e.can_undo());
    }

    #[test]
    fn restored_history_keeps_undoing() {
        let mut e = Engine::default();
        e.add_contribution("A", 4.0);
        e.add_contribution("B", 6.0);
        let history = e.history().clone();

        let mut reloaded = Engine::from_parts(
            e.contributions().to_vec(),
            *e.thresholds(),
            e.input_mode(),
            e.is_reminded(),
        );
        assert!(!reloaded.can_undo());
        reloaded.restore_history(history);
        assert_eq!(reloaded.undo().map(|u| u.value), Some(6.0));
        assert_eq!(reloaded.total(), 4.0);
    }

    #[test]
    fn mismatched_history_is_discarded_on_undo() {
        let mut e = Engine::default();
        e.add_contribution("A", 4.0);
        e.add_contribution("B", 6.0);
        let history = e.history().clone();

        // Ledger saved without B, history saved with it.
        let mut reloaded = Engine::from_parts(
            vec![Contribution::new("A", 4.0)],
            *e.thresholds(),
            e.input_mode(),
            false,
        );
        reloaded.restore_history(history);
        assert_eq!(reloaded.undo(), None);
        assert_eq!(reloaded.total(), 4.0);
        assert!(!reloaded.can_undo());

        let mut empty = Engine::default();
        let mut h = UndoHistory::default();
        h.push(UndoRecord::AddContribution {
            contribution: Contribution::new("A", 4.0),
            prior_total: 0.0,
        });
        empty.restore_history(h);
        assert_eq!(empty.undo(), None);
        assert!(!empty.can_undo());
    }

    #[test]
    fn history_depth_is_bounded() {
        let mut e = Engine::default();
        for i in 0..crate::undo::MAX_UNDO_DEPTH + 10 {
            e.add_contribution(format!("B{i}"), 1.0);
        }
        assert_eq!(e.undo_depth(), crate::undo::MAX_UNDO_DEPTH);
        while e.undo().is_some() {}
        assert_eq!(e.total(), 10.0);
        assert_eq!(e.contributions().len(), 10);
    }

    #[test]
    fn fraction_tracking_follows_ledger() {
        let mut e = Engine::new(InputMode::Decimal);
        e.add_contribution("A", 2.0);
        assert!(!e.has_fraction());
        assert_eq!(e.format(e.total()), "2");
        e.add_contribution("B", 0.5);
        assert!(e.has_fraction());
        assert_eq!(e.format(3.0), "3.00");
        e.undo();
        assert!(!e.has_fraction());
    }

    #[test]
    fn input_mode_switch_is_not_undoable() {
        let mut e = Engine::default();
        assert_eq!(e.set_input_mode(InputMode::Decimal), InputMode::Integer);
        assert_eq!(e.input_mode(), InputMode::Decimal);
        assert!(!e.can_undo());
    }

    #[test]
    fn would_exceed_upper_checks_pending_addition() {
        let mut e = banded();
        e.add_contribution("A", 290.0);
        assert!(!e.would_exceed_upper(10.0));
        assert!(e.would_exceed_upper(10.5));
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let mut e = banded();
        e.add_contribution("A", 12.0);
        let s = e.snapshot();
        assert_eq!(s.total, 12.0);
        assert_eq!(s.target, 200.0);
        assert_eq!(s.lower_limit, 100.0);
        assert_eq!(s.upper_limit, 300.0);
        assert_eq!(s.input_mode, InputMode::Integer);
    }
}
