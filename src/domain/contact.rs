// ==========================================
// CRM ETL - contact row
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRow {
    // ===== primary key =====
    pub id: String,

    // ===== FKs =====
    pub status_id: i64,     // contact_statuses.id (resolved, created on demand)
    pub company_id: String, // companies.id (must already be loaded)

    // ===== fields =====
    pub email: String,         // lowercase, unique, validated format
    pub first_name: String,    // Title Case
    pub last_name: String,     // Title Case
    pub title: String,         // stripped, case preserved
    pub phone: Option<String>, // international format when present

    pub created_date: DateTime<Utc>,  // past or present
    pub last_modified: DateTime<Utc>, // >= created_date, <= now
}
