pub mod autosave;
pub mod sqlite;
pub mod store;

pub use autosave::{Autosave, AUTOSAVE_INTERVAL};
pub use sqlite::SqliteSessionStore;
pub use store::{KeyValueStore, MemorySessionStore, SessionStore, ROSTER_KEY, RULE_TABLE_KEY};
