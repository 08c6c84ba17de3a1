pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use repository::{Entity, Repository};
pub use store::{Document, DocumentStore, StoreError};

/// Fields that must be unique within their collection: one account per email
/// and one profile per user.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[
    (models::user::User::COLLECTION, "email"),
    (models::profile::Profile::COLLECTION, "user"),
];

/// Name of the unique index guarding `field` in `collection`.
pub fn unique_constraint_name(collection: &str, field: &str) -> String {
    format!("documents_{}_{}_key", collection, field)
}
