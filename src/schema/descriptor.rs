use crate::core::{OrmError, Result};

/// Fixed prefix stripped from declared field names to form column names.
pub const STORAGE_PREFIX: &str = "db_";

/// Column name of the store-assigned identity field.
pub const IDENTITY_COLUMN: &str = "id";

/// Declared semantic type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Float,
    Text,
    Boolean,
    DateTime,
    /// Reference to another entity type, persisted as the referenced
    /// identity value. Carries the referenced type name.
    Reference(&'static str),
    /// Collections and arbitrary structured objects, stored as serialized
    /// text. Also the fallback for untyped fields.
    Serialized,
}

/// Metadata for one persisted field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as declared on the entity, storage prefix included.
    pub declared_name: String,
    /// Column name: the declared name with the storage prefix stripped.
    pub column: String,
    pub semantic: SemanticType,
    /// Explicit column-type override; used verbatim when present.
    pub column_type: Option<String>,
    /// Ignored fields stay ordinary in-memory fields but never reach the
    /// schema, any statement, or the allowed-condition set.
    pub ignored: bool,
}

impl FieldDescriptor {
    pub fn new(declared_name: impl Into<String>, semantic: SemanticType) -> Self {
        let declared_name = declared_name.into();
        let column = declared_name
            .strip_prefix(STORAGE_PREFIX)
            .unwrap_or(&declared_name)
            .to_string();
        Self {
            declared_name,
            column,
            semantic,
            column_type: None,
            ignored: false,
        }
    }

    /// Set an explicit column type, used verbatim instead of the inferred one
    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Mark the field as ignored
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.column == IDENTITY_COLUMN
    }
}

/// Resolved metadata for one entity type: the ordered field descriptor list
/// plus the derived table name.
///
/// Built once per type by registration code and cached (typically behind
/// `lazy_static`); immutable thereafter. The identity descriptor is inserted
/// automatically, so an entity with zero declared fields still maps to a
/// table with the identity column.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Possibly namespaced type name, as registered.
    pub type_name: String,
    /// Canonical table name: lower-cased, namespace-stripped type name.
    pub table: String,
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let table = table_name_for(&type_name);
        let identity = FieldDescriptor::new(
            format!("{}{}", STORAGE_PREFIX, IDENTITY_COLUMN),
            SemanticType::Integer,
        );
        Self {
            type_name,
            table,
            fields: vec![identity],
        }
    }

    /// Append a declared field, preserving declaration order
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        assert!(
            !field.is_identity(),
            "the identity field is declared automatically"
        );
        self.fields.push(field);
        self
    }

    /// All descriptors in declaration order, identity first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The identity descriptor.
    pub fn identity(&self) -> &FieldDescriptor {
        &self.fields[0]
    }

    /// Non-ignored descriptors, identity first: the schema/projection set.
    pub fn persisted(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.ignored)
    }

    /// Non-ignored, non-identity descriptors: the mutable column set used
    /// in INSERT column lists and UPDATE SET clauses.
    pub fn mutable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.persisted().filter(|f| !f.is_identity())
    }

    /// Looks up a column in the allowed (non-ignored) set.
    pub fn find_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.persisted().find(|f| f.column == column)
    }

    /// Looks up a column in the allowed set, or fails with a validation
    /// error naming the table.
    pub fn require_column(&self, column: &str) -> Result<&FieldDescriptor> {
        self.find_column(column)
            .ok_or_else(|| OrmError::UnknownColumn(column.to_string(), self.table.clone()))
    }
}

/// Derives the canonical table name: the final `::` segment of the type
/// name, lower-cased.
fn table_name_for(type_name: &str) -> String {
    let bare = type_name.rsplit("::").next().unwrap_or(type_name);
    bare.to_ascii_lowercase()
}
