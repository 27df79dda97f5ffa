use crate::types::{Contribution, ThresholdField};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Inverse-operation descriptor pushed by every undoable mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoRecord {
    /// A contribution was appended. `prior_total` is kept for diagnostics only.
    AddContribution {
        contribution: Contribution,
        prior_total: f64,
    },
    /// The ledger was emptied; `prior` is the full sequence before clearing.
    ResetLedger { prior: Vec<Contribution> },
    SetTarget { prior: f64, new: f64 },
    SetLowerLimit { prior: f64, new: f64 },
    SetUpperLimit { prior: f64, new: f64 },
}

impl UndoRecord {
    pub(crate) fn threshold(field: ThresholdField, prior: f64, new: f64) -> Self {
        match field {
            ThresholdField::Target => UndoRecord::SetTarget { prior, new },
            ThresholdField::LowerLimit => UndoRecord::SetLowerLimit { prior, new },
            ThresholdField::UpperLimit => UndoRecord::SetUpperLimit { prior, new },
        }
    }

    pub fn kind(&self) -> UndoKind {
        match self {
            UndoRecord::AddContribution { .. } => UndoKind::AddContribution,
            UndoRecord::ResetLedger { .. } => UndoKind::ResetLedger,
            UndoRecord::SetTarget { .. } => UndoKind::SetTarget,
            UndoRecord::SetLowerLimit { .. } => UndoKind::SetLowerLimit,
            UndoRecord::SetUpperLimit { .. } => UndoKind::SetUpperLimit,
        }
    }
}

/// Tag of an undo record, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoKind {
    AddContribution,
    ResetLedger,
    SetTarget,
    SetLowerLimit,
    SetUpperLimit,
}

impl std::fmt::Display for UndoKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UndoKind::AddContribution => "add",
            UndoKind::ResetLedger => "reset",
            UndoKind::SetTarget => "set target",
            UndoKind::SetLowerLimit => "set lower limit",
            UndoKind::SetUpperLimit => "set upper limit",
        };
        f.write_str(s)
    }
}

/// Result of a successful `Engine::undo`.
///
/// `value` is the removed contribution's value for an add, `0` for a
/// reset, and for a threshold change the value in effect before the undo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Undone {
    pub kind: UndoKind,
    pub value: f64,
}

/// Oldest records are dropped once the history grows past this depth.
pub const MAX_UNDO_DEPTH: usize = 200;

/// Single global LIFO stack of undo records, bounded by
/// [`MAX_UNDO_DEPTH`]. No redo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoHistory {
    records: VecDeque<UndoRecord>,
}

impl UndoHistory {
    pub fn push(&mut self, record: UndoRecord) {
        self.records.push_back(record);
        self.trim();
    }

    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop_back()
    }

    pub fn peek(&self) -> Option<&UndoRecord> {
        self.records.back()
    }

    /// Re-apply the depth bound, e.g. after deserializing.
    pub(crate) fn trim(&mut self) {
        while self.records.len() > MAX_UNDO_DEPTH {
            self.records.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_lifo() {
        let mut h = UndoHistory::default();
        assert!(h.pop().is_none());
        h.push(UndoRecord::SetTarget { prior: 1.0, new: 2.0 });
        h.push(UndoRecord::ResetLedger { prior: vec![] });
        assert_eq!(h.len(), 2);
        assert_eq!(h.peek().map(UndoRecord::kind), Some(UndoKind::ResetLedger));
        assert_eq!(h.pop().map(|r| r.kind()), Some(UndoKind::ResetLedger));
        assert_eq!(h.pop().map(|r| r.kind()), Some(UndoKind::SetTarget));
        assert!(h.is_empty());
    }

    #[test]
    fn history_serializes_as_tagged_list() {
        let mut h = UndoHistory::default();
        h.push(UndoRecord::AddContribution {
            contribution: Contribution::new("A", 2.0),
            prior_total: 0.0,
        });
        h.push(UndoRecord::SetLowerLimit { prior: 0.0, new: 10.0 });
        let json = serde_json::to_value(&h).unwrap();
        assert_eq!(json[0]["type"], "add_contribution");
        assert_eq!(json[1]["type"], "set_lower_limit");
        let back: UndoHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn history_drops_oldest_past_max_depth() {
        let mut h = UndoHistory::default();
        for i in 0..MAX_UNDO_DEPTH + 5 {
            h.push(UndoRecord::SetTarget {
                prior: i as f64,
                new: i as f64 + 1.0,
            });
        }
        assert_eq!(h.len(), MAX_UNDO_DEPTH);
        let mut last = None;
        while let Some(r) = h.pop() {
            last = Some(r);
        }
        assert_eq!(last, Some(UndoRecord::SetTarget { prior: 5.0, new: 6.0 }));
    }

    #[test]
    fn threshold_constructor_maps_fields() {
        let r = UndoRecord::threshold(ThresholdField::UpperLimit, 5.0, 6.0);
        assert_eq!(r, UndoRecord::SetUpperLimit { prior: 5.0, new: 6.0 });
        assert_eq!(r.kind(), UndoKind::SetUpperLimit);
    }
}
