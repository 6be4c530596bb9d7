// ==========================================
// CRM ETL - company row
// ==========================================
// Validated shape written to the companies table. Produced only by the
// company transformer; the loader treats it as opaque.
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRow {
    // ===== primary key =====
    pub id: String, // external caller-supplied key

    // ===== FKs =====
    pub industry_id: i64, // industries.id (resolved, created on demand)

    // ===== fields =====
    pub name: String,                // UPPER
    pub domain: String,              // lowercase, unique, validated format
    pub size: String,                // "N" | "low-high" | "N+"
    pub country: String,             // ISO2
    pub created_date: DateTime<Utc>, // past or present
    pub is_customer: bool,
    pub annual_revenue: f64, // > 0
}
