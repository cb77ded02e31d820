pub mod engine;
pub mod memory;
pub mod persistence;
pub mod table;

pub use engine::StorageEngine;
pub use memory::{InMemoryStorage, StatementStats, Tables};
pub use persistence::{SnapshotManager, StoreSnapshot};
pub use table::{DefinitionTable, ValueTable};
