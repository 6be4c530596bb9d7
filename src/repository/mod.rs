// ==========================================
// CRM ETL - repository layer
// ==========================================
// Data access only; no business rules. The etl layer is the sole caller.
// ==========================================

pub mod crm_repo;
pub mod crm_repo_impl;
pub mod error;

pub use crm_repo::CrmRepository;
pub use crm_repo_impl::SqliteCrmRepository;
pub use error::{RepositoryError, RepositoryResult};
