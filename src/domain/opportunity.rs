// ==========================================
// CRM ETL - opportunity row
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRow {
    // ===== primary key =====
    pub id: String,

    // ===== FKs =====
    pub contact_id: String,        // contacts.id (must already be loaded)
    pub company_id: String,        // companies.id (must already be loaded)
    pub stage_id: i64,             // stages.id
    pub forecast_category_id: i64, // forecast_categories.id
    pub product_id: i64,           // products.id

    // ===== fields =====
    pub name: String,                // Title Case
    pub amount: f64,                 // >= 0
    pub probability: i32,            // 0..=100
    pub created_date: DateTime<Utc>, // past or present
    pub close_date: DateTime<Utc>,   // may be in the future
    pub is_closed: bool,
}
