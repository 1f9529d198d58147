use xxhash_rust::xxh3::xxh3_64;

use crate::schema::descriptor::EntityDescriptor;
use crate::schema::mapping::column_type_for;

/// The declared schema of one entity type at a point in time: ordered
/// column/type pairs derived solely from the non-ignored field descriptors,
/// identity column first.
///
/// Two snapshots are equal iff their canonical serializations are
/// byte-identical; what gets persisted is the fingerprint of that
/// serialization, not the snapshot itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    table: String,
    columns: Vec<(String, String)>,
}

impl SchemaSnapshot {
    pub fn of(descriptor: &EntityDescriptor) -> Self {
        // The identity descriptor is always fields[0], so iterating the
        // persisted set yields the identity column first.
        let columns = descriptor
            .persisted()
            .map(|f| (f.column.clone(), column_type_for(f)))
            .collect();
        Self {
            table: descriptor.table.clone(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Canonical serialization: one `column:type` line per entry, in stable
    /// field order.
    pub fn canonical(&self) -> String {
        let lines: Vec<String> = self
            .columns
            .iter()
            .map(|(column, ty)| format!("{}:{}", column, ty))
            .collect();
        lines.join("\n")
    }

    /// Content hash of the canonical serialization, as fixed-width hex.
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", xxh3_64(self.canonical().as_bytes()))
    }
}
