// ==========================================
// CRM ETL - core library
// ==========================================
// Batch ingestion of CRM flat files (companies, contacts, opportunities,
// activities) into a normalized SQLite store: validate, resolve dimensions,
// load incrementally, report every rejection.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - validated rows and shared types
pub mod domain;

// Repository layer - store access
pub mod repository;

// ETL layer - validation-and-load engine
pub mod etl;

// Runtime configuration
pub mod config;

// Database infrastructure (connection init / PRAGMA / schema marker)
pub mod db;

// Logging
pub mod logging;

// ==========================================
// Re-exports
// ==========================================

pub use config::EtlConfig;

pub use domain::{
    ActivityRow, CompanyRow, ContactRow, DimensionKind, DimensionRow, EntityCounts, EntityKind,
    OpportunityRow, RejectedRecord, RunSummary,
};

pub use etl::{
    DimensionResolver, ErrorReporter, EtlError, EtlResult, IncrementalLoader, Pipeline,
    ValidationFailure,
};

pub use repository::{CrmRepository, RepositoryError, SqliteCrmRepository};

// ==========================================
// Constants
// ==========================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "crm-etl";
