use crate::format::format_number;
use serde::Serialize;

/// Severity of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderLevel {
    /// Total is above the upper limit; always fires.
    Forced,
    /// Total sits in the `[lower_limit, target)` band.
    Notice,
}

/// Outcome of `Engine::check_reminder`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reminder {
    Forced { total: f64, upper_limit: f64 },
    /// First notice since the band was entered; the flag was latched.
    Reached { total: f64, target: f64 },
    /// The band is still occupied and the notice was already given.
    Pending { total: f64, target: f64 },
}

impl Reminder {
    pub fn level(&self) -> ReminderLevel {
        match self {
            Reminder::Forced { .. } => ReminderLevel::Forced,
            Reminder::Reached { .. } | Reminder::Pending { .. } => ReminderLevel::Notice,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Reminder::Forced { total, upper_limit } => format!(
                "upper limit exceeded ({}/{}), change now",
                format_number(*total),
                format_number(*upper_limit)
            ),
            Reminder::Reached { total, target } => format!(
                "change threshold reached ({}/{}), schedule a change",
                format_number(*total),
                format_number(*target)
            ),
            Reminder::Pending { total, target } => format!(
                "change still pending ({}/{})",
                format_number(*total),
                format_number(*target)
            ),
        }
    }
}

impl std::fmt::Display for Reminder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}
