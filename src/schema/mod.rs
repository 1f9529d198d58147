pub mod descriptor;
pub mod mapping;
pub mod snapshot;
pub mod sync;

pub use descriptor::{
    EntityDescriptor, FieldDescriptor, IDENTITY_COLUMN, STORAGE_PREFIX, SemanticType,
};
pub use snapshot::SchemaSnapshot;
pub use sync::{DdlAttempt, METADATA_TABLE, SyncAction, SyncReport};
