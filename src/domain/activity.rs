// ==========================================
// CRM ETL - activity row
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRow {
    // ===== primary key =====
    pub id: String,

    // ===== FKs =====
    pub contact_id: String,             // contacts.id (must already be loaded)
    pub opportunity_id: Option<String>, // opportunities.id, nullable; validated when present

    // ===== fields =====
    pub activity_type: String,      // UPPER ("type" in the source feed)
    pub subject: String,            // lowercase
    pub timestamp: DateTime<Utc>,   // past or present
    pub duration_minutes: i32,      // >= 0
    pub outcome: String,            // UPPER
    pub notes: Option<String>,      // free text, optional
}
