// ==========================================
// CRM ETL - dimension row
// ==========================================
// One shape for all five dimension tables (industries, products, stages,
// contact_statuses, forecast_categories).
// ==========================================

use serde::{Deserialize, Serialize};

/// A lookup-dimension row.
///
/// `name` is unique under case-insensitive comparison; the pipeline always
/// stores it uppercased, so the plain UNIQUE constraint in the schema is
/// enough. `id` is assigned by the store on first insertion and stable
/// thereafter; dimension rows are never deleted or renamed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}
