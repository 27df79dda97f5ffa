pub mod activity;
pub mod key;
pub mod lock;
pub mod paths;
pub mod range;
pub mod store;

pub use activity::{append_activity, list_activity, Action, ActivityEntry};
pub use key::{validate_name, KeyError, ProcessKey};
pub use lock::{LockMode, WorkspaceLock};
pub use paths::TallyPaths;
pub use store::{write_atomic, EngineStore};
