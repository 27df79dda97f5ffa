pub mod engine;
pub mod format;
pub mod input;
pub mod record;
pub mod reminder;
pub mod types;
pub mod undo;

pub use engine::Engine;
pub use input::{InputError, RangeConfig};
pub use record::EngineRecord;
pub use reminder::{Reminder, ReminderLevel};
pub use types::*;
pub use undo::{UndoHistory, UndoKind, UndoRecord, Undone};
