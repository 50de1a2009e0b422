//! redb table definitions for the Stateboard store.

use redb::TableDefinition;

/// Raw entity values keyed by `{entity_type}:{id}`.
pub const ENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");
