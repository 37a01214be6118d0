//! redb table definitions shared by storage modules.

use redb::TableDefinition;

/// Every key lives in one table; values are bincode-encoded [`super::time_util::StoredEntry`]s.
pub const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");
