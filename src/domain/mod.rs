// ==========================================
// CRM ETL - domain layer
// ==========================================
// Validated row shapes plus the enums and report types shared across the
// pipeline. Raw (pre-validation) records live in the etl layer.
// ==========================================

pub mod activity;
pub mod company;
pub mod contact;
pub mod dimension;
pub mod opportunity;
pub mod report;
pub mod types;

pub use activity::ActivityRow;
pub use company::CompanyRow;
pub use contact::ContactRow;
pub use dimension::DimensionRow;
pub use opportunity::OpportunityRow;
pub use report::{EntityCounts, RejectedRecord, RunSummary};
pub use types::{DimensionKind, EntityKind, TextCase};
