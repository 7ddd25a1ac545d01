/// Repository layer
///
/// One generic CRUD contract shared by every entity, with per-entity
/// implementations adding their extra lookups. All SQL lives here; the API
/// layer never touches the pool directly.

pub mod items;
pub mod tokens;
pub mod users;

pub use items::ItemRepository;
pub use tokens::TokenRepository;
pub use users::UserRepository;

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;

/// Generic CRUD operations over a persisted entity
///
/// `Create` and `Update` are the validated input models for the entity.
/// Update semantics are partial: only fields present in the update model are
/// applied, absent fields are left untouched. Every mutating operation is
/// atomic with respect to the store; `remove` returns the pre-deletion
/// snapshot and cascades to dependent rows per the schema's foreign keys.
#[async_trait]
pub trait Repository {
    type Entity: Send;
    type Create: Send;
    type Update: Send;

    /// Single-row lookup by primary key
    async fn get(&self, id: i64) -> ApiResult<Option<Self::Entity>>;

    /// Offset/limit pagination; callers must not assume an ordering
    async fn list(&self, skip: i64, limit: i64) -> ApiResult<Vec<Self::Entity>>;

    /// Persist a new row; returns it including generated id and timestamps
    async fn create(&self, input: Self::Create) -> ApiResult<Self::Entity>;

    /// Apply the fields present in `input` to `existing` and persist
    async fn update(&self, existing: Self::Entity, input: Self::Update)
        -> ApiResult<Self::Entity>;

    /// Load then delete; returns the pre-deletion snapshot if the row existed
    async fn remove(&self, id: i64) -> ApiResult<Option<Self::Entity>>;
}

/// Translate store constraint breaches into client-visible conflicts
///
/// Uniqueness and foreign-key violations surface as `Conflict`; anything
/// else propagates unmodified as a database error.
pub(crate) fn constraint_error(err: sqlx::Error, entity: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return ApiError::Conflict(format!("{} violates a uniqueness constraint", entity));
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return ApiError::Conflict(format!("{} references a missing row", entity));
            }
            _ => {}
        }
    }

    ApiError::Database(err)
}
