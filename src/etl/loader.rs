// ==========================================
// CRM ETL - incremental loader
// ==========================================
// Owns every write to the store. Per entity id the only productive
// transition is Unseen -> Loaded; an id already persisted (or staged earlier
// in this run) is a skip, never an update. Validated rows are buffered and
// flushed as one transactional bulk insert; a constraint-failed flush is
// demoted to the error report ("persist failed") and the run continues, any
// other store failure is fatal.
// ==========================================

use crate::domain::types::EntityKind;
use crate::domain::{ActivityRow, CompanyRow, ContactRow, OpportunityRow};
use crate::etl::error::{EtlResult, ValidationFailure};
use crate::etl::error_reporter::ErrorReporter;
use crate::repository::CrmRepository;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Outcome of staging one validated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDecision {
    Staged,
    Skipped,
}

// ==========================================
// per-entity buffer + counters
// ==========================================
struct EntityBuffer<T> {
    /// ids persisted before this run plus ids staged during it
    seen: HashSet<String>,
    rows: Vec<T>,
    loaded: usize,
    skipped: usize,
    demoted: usize,
}

impl<T> Default for EntityBuffer<T> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            rows: Vec::new(),
            loaded: 0,
            skipped: 0,
            demoted: 0,
        }
    }
}

impl<T> EntityBuffer<T> {
    fn stage(&mut self, id: String, row: T) -> LoadDecision {
        if !self.seen.insert(id) {
            self.skipped += 1;
            return LoadDecision::Skipped;
        }
        self.rows.push(row);
        LoadDecision::Staged
    }
}

// ==========================================
// IncrementalLoader
// ==========================================
pub struct IncrementalLoader<R: CrmRepository> {
    repo: R,
    batch_size: usize,
    companies: EntityBuffer<CompanyRow>,
    contacts: EntityBuffer<ContactRow>,
    opportunities: EntityBuffer<OpportunityRow>,
    activities: EntityBuffer<ActivityRow>,
    /// persisted + staged contact emails (uniqueness pre-check)
    contact_emails: HashSet<String>,
}

impl<R: CrmRepository> IncrementalLoader<R> {
    pub fn new(repo: R, batch_size: usize) -> Self {
        Self {
            repo,
            batch_size: batch_size.max(1),
            companies: EntityBuffer::default(),
            contacts: EntityBuffer::default(),
            opportunities: EntityBuffer::default(),
            activities: EntityBuffer::default(),
            contact_emails: HashSet::new(),
        }
    }

    /// Load the persisted id set per entity (and contact emails) before any
    /// record is processed.
    pub async fn initialize(&mut self) -> EtlResult<()> {
        self.companies.seen = self.repo.existing_ids(EntityKind::Company).await?;
        self.contacts.seen = self.repo.existing_ids(EntityKind::Contact).await?;
        self.opportunities.seen = self.repo.existing_ids(EntityKind::Opportunity).await?;
        self.activities.seen = self.repo.existing_ids(EntityKind::Activity).await?;
        self.contact_emails = self.repo.contact_emails().await?;
        debug!(
            companies = self.companies.seen.len(),
            contacts = self.contacts.seen.len(),
            opportunities = self.opportunities.seen.len(),
            activities = self.activities.seen.len(),
            "loader seen-sets initialized"
        );
        Ok(())
    }

    // ===== known-id views for transformer FK checks =====

    pub fn known_company_ids(&self) -> &HashSet<String> {
        &self.companies.seen
    }

    pub fn known_contact_ids(&self) -> &HashSet<String> {
        &self.contacts.seen
    }

    pub fn known_opportunity_ids(&self) -> &HashSet<String> {
        &self.opportunities.seen
    }

    pub fn known_contact_emails(&self) -> &HashSet<String> {
        &self.contact_emails
    }

    // ===== staging =====

    /// Pre-transform skip decision: an id already persisted (or already
    /// staged this run) is "already loaded" and is not re-validated, so a
    /// rerun produces zero new rejections for previously-accepted records.
    pub fn check_skip(&mut self, entity: EntityKind, id: &str) -> bool {
        let seen = match entity {
            EntityKind::Company => &self.companies.seen,
            EntityKind::Contact => &self.contacts.seen,
            EntityKind::Opportunity => &self.opportunities.seen,
            EntityKind::Activity => &self.activities.seen,
        };
        if !seen.contains(id) {
            return false;
        }
        match entity {
            EntityKind::Company => self.companies.skipped += 1,
            EntityKind::Contact => self.contacts.skipped += 1,
            EntityKind::Opportunity => self.opportunities.skipped += 1,
            EntityKind::Activity => self.activities.skipped += 1,
        }
        true
    }

    pub async fn stage_company(
        &mut self,
        row: CompanyRow,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<LoadDecision> {
        let decision = self.companies.stage(row.id.clone(), row);
        if decision == LoadDecision::Staged && self.companies.rows.len() >= self.batch_size {
            self.flush_companies(reporter).await?;
        }
        Ok(decision)
    }

    pub async fn stage_contact(
        &mut self,
        row: ContactRow,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<LoadDecision> {
        let email = row.email.clone();
        let decision = self.contacts.stage(row.id.clone(), row);
        if decision == LoadDecision::Staged {
            self.contact_emails.insert(email);
            if self.contacts.rows.len() >= self.batch_size {
                self.flush_contacts(reporter).await?;
            }
        }
        Ok(decision)
    }

    pub async fn stage_opportunity(
        &mut self,
        row: OpportunityRow,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<LoadDecision> {
        let decision = self.opportunities.stage(row.id.clone(), row);
        if decision == LoadDecision::Staged && self.opportunities.rows.len() >= self.batch_size {
            self.flush_opportunities(reporter).await?;
        }
        Ok(decision)
    }

    pub async fn stage_activity(
        &mut self,
        row: ActivityRow,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<LoadDecision> {
        let decision = self.activities.stage(row.id.clone(), row);
        if decision == LoadDecision::Staged && self.activities.rows.len() >= self.batch_size {
            self.flush_activities(reporter).await?;
        }
        Ok(decision)
    }

    // ===== flushing =====

    /// Flush whatever is buffered for one entity (end-of-source call).
    pub async fn finish_entity(
        &mut self,
        entity: EntityKind,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<()> {
        match entity {
            EntityKind::Company => self.flush_companies(reporter).await,
            EntityKind::Contact => self.flush_contacts(reporter).await,
            EntityKind::Opportunity => self.flush_opportunities(reporter).await,
            EntityKind::Activity => self.flush_activities(reporter).await,
        }
    }

    async fn flush_companies(&mut self, reporter: &mut ErrorReporter) -> EtlResult<()> {
        let rows = std::mem::take(&mut self.companies.rows);
        if rows.is_empty() {
            return Ok(());
        }
        let outcome = self.repo.batch_insert_companies(&rows).await;
        Self::settle_flush(&mut self.companies, EntityKind::Company, rows, outcome, reporter, |r| {
            r.id.clone()
        })
    }

    async fn flush_contacts(&mut self, reporter: &mut ErrorReporter) -> EtlResult<()> {
        let rows = std::mem::take(&mut self.contacts.rows);
        if rows.is_empty() {
            return Ok(());
        }
        let outcome = self.repo.batch_insert_contacts(&rows).await;
        Self::settle_flush(&mut self.contacts, EntityKind::Contact, rows, outcome, reporter, |r| {
            r.id.clone()
        })
    }

    async fn flush_opportunities(&mut self, reporter: &mut ErrorReporter) -> EtlResult<()> {
        let rows = std::mem::take(&mut self.opportunities.rows);
        if rows.is_empty() {
            return Ok(());
        }
        let outcome = self.repo.batch_insert_opportunities(&rows).await;
        Self::settle_flush(
            &mut self.opportunities,
            EntityKind::Opportunity,
            rows,
            outcome,
            reporter,
            |r| r.id.clone(),
        )
    }

    async fn flush_activities(&mut self, reporter: &mut ErrorReporter) -> EtlResult<()> {
        let rows = std::mem::take(&mut self.activities.rows);
        if rows.is_empty() {
            return Ok(());
        }
        let outcome = self.repo.batch_insert_activities(&rows).await;
        Self::settle_flush(
            &mut self.activities,
            EntityKind::Activity,
            rows,
            outcome,
            reporter,
            |r| r.id.clone(),
        )
    }

    /// Shared flush bookkeeping: count on success, demote the whole flush on
    /// a constraint violation, abort on anything else.
    fn settle_flush<T: Serialize>(
        buffer: &mut EntityBuffer<T>,
        entity: EntityKind,
        rows: Vec<T>,
        outcome: crate::repository::RepositoryResult<usize>,
        reporter: &mut ErrorReporter,
        row_id: impl Fn(&T) -> String,
    ) -> EtlResult<()> {
        match outcome {
            Ok(count) => {
                buffer.loaded += count;
                debug!(entity = %entity, count, "flush committed");
                Ok(())
            }
            Err(e) if e.is_constraint_violation() => {
                warn!(entity = %entity, count = rows.len(), error = %e, "flush demoted to error report");
                let reason = ValidationFailure::PersistFailed(e.to_string());
                for row in &rows {
                    let raw = serde_json::to_value(row).unwrap_or(serde_json::Value::Null);
                    reporter.record(entity, row_id(row), std::slice::from_ref(&reason), raw);
                }
                buffer.demoted += rows.len();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ===== counters for the run summary =====

    pub fn loaded(&self, entity: EntityKind) -> usize {
        match entity {
            EntityKind::Company => self.companies.loaded,
            EntityKind::Contact => self.contacts.loaded,
            EntityKind::Opportunity => self.opportunities.loaded,
            EntityKind::Activity => self.activities.loaded,
        }
    }

    pub fn skipped(&self, entity: EntityKind) -> usize {
        match entity {
            EntityKind::Company => self.companies.skipped,
            EntityKind::Contact => self.contacts.skipped,
            EntityKind::Opportunity => self.opportunities.skipped,
            EntityKind::Activity => self.activities.skipped,
        }
    }

    pub fn demoted(&self, entity: EntityKind) -> usize {
        match entity {
            EntityKind::Company => self.companies.demoted,
            EntityKind::Contact => self.contacts.demoted,
            EntityKind::Opportunity => self.opportunities.demoted,
            EntityKind::Activity => self.activities.demoted,
        }
    }
}
