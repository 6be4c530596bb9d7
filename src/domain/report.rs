// ==========================================
// CRM ETL - run reporting types
// ==========================================
// RejectedRecord rows go to the error sink; RunSummary is emitted once per
// run to the log sink. Neither is ever read back by the pipeline.
// ==========================================

use crate::domain::types::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RejectedRecord - one rejected source record
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub entity: EntityKind,
    /// The record's external id when present, otherwise "row <n>" from the
    /// source file so the operator can still find it.
    pub record_id: String,
    /// Every reason collected for the record, in column declaration order.
    pub reasons: Vec<String>,
    /// Snapshot for triage: the raw source fields (validation rejects) or
    /// the already-validated row (persist demotions).
    pub raw: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

// ==========================================
// EntityCounts - per-entity run counters
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub processed: usize,
    pub loaded: usize,
    pub skipped: usize,
    pub rejected: usize,
}

// ==========================================
// RunSummary - whole-run outcome
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub companies: EntityCounts,
    pub contacts: EntityCounts,
    pub opportunities: EntityCounts,
    pub activities: EntityCounts,
}

impl RunSummary {
    pub fn counts(&self, entity: EntityKind) -> EntityCounts {
        match entity {
            EntityKind::Company => self.companies,
            EntityKind::Contact => self.contacts,
            EntityKind::Opportunity => self.opportunities,
            EntityKind::Activity => self.activities,
        }
    }

    /// Total rejected across all entities; used by the binary to decide
    /// between "completed" and "completed with caveats".
    pub fn total_rejected(&self) -> usize {
        self.companies.rejected
            + self.contacts.rejected
            + self.opportunities.rejected
            + self.activities.rejected
    }
}
