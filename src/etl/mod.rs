// ==========================================
// CRM ETL - validation-and-load engine
// ==========================================
// The core: field validators, dimension resolution, per-entity transform,
// incremental load, error reporting, and the orchestrator driving them in
// referential order.
// ==========================================

pub mod country;
pub mod dimension_resolver;
pub mod error;
pub mod error_reporter;
pub mod field_validator;
pub mod loader;
pub mod pipeline;
pub mod source_reader;
pub mod transformer;

pub use dimension_resolver::DimensionResolver;
pub use error::{EtlError, EtlResult, RecordOutcome, ValidationFailure};
pub use error_reporter::ErrorReporter;
pub use loader::{IncrementalLoader, LoadDecision};
pub use pipeline::Pipeline;
pub use source_reader::{CsvSource, JsonSource, RawRecord, RecordSource};
pub use transformer::{
    ActivityTransformer, CompanyTransformer, ContactTransformer, OpportunityTransformer,
};
