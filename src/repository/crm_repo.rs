// ==========================================
// CRM ETL - store repository trait
// ==========================================
// The narrow interface the pipeline needs from the persistent store:
// existence checks by primary key, bulk inserts, and name->id lookup per
// dimension table. No business rules live here.
// ==========================================

use crate::domain::types::{DimensionKind, EntityKind};
use crate::domain::{ActivityRow, CompanyRow, ContactRow, OpportunityRow};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

// ==========================================
// CrmRepository trait
// ==========================================
// Implementor: SqliteCrmRepository (rusqlite)
#[async_trait]
pub trait CrmRepository: Send + Sync {
    // ===== dimensions =====

    /// Load the full name -> id mapping of one dimension table.
    ///
    /// Used to pre-seed the dimension resolver cache at pipeline start.
    async fn dimension_names(&self, kind: DimensionKind) -> RepositoryResult<HashMap<String, i64>>;

    /// Insert a dimension row and return its surrogate id.
    ///
    /// The caller (dimension resolver) guarantees the name is normalized
    /// and not yet present; a racing duplicate surfaces as
    /// `UniqueConstraintViolation`.
    async fn insert_dimension(&self, kind: DimensionKind, name: &str) -> RepositoryResult<i64>;

    // ===== entity existence =====

    /// Load all primary keys already persisted for one entity table.
    async fn existing_ids(&self, entity: EntityKind) -> RepositoryResult<HashSet<String>>;

    /// Load all contact emails already persisted (uniqueness pre-check).
    async fn contact_emails(&self) -> RepositoryResult<HashSet<String>>;

    // ===== bulk writes (transactional; whole flush rolls back on error) =====

    async fn batch_insert_companies(&self, rows: &[CompanyRow]) -> RepositoryResult<usize>;

    async fn batch_insert_contacts(&self, rows: &[ContactRow]) -> RepositoryResult<usize>;

    async fn batch_insert_opportunities(&self, rows: &[OpportunityRow]) -> RepositoryResult<usize>;

    async fn batch_insert_activities(&self, rows: &[ActivityRow]) -> RepositoryResult<usize>;

    // ===== schema marker =====

    /// Current schema_version marker, None when the store is uninitialized.
    async fn schema_version(&self) -> RepositoryResult<Option<i64>>;
}
