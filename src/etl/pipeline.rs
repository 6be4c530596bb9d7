// ==========================================
// CRM ETL - pipeline orchestrator
// ==========================================
// Drives read -> transform -> load -> report per entity, in referential
// order: companies, contacts, opportunities, activities. Dimensions are
// resolved lazily by whichever entity references them. Field- and
// record-level failures are recovered locally and reported; only a store
// failure aborts, and accumulated error records are flushed first.
// ==========================================

use crate::config::EtlConfig;
use crate::db::CURRENT_SCHEMA_VERSION;
use crate::domain::report::{EntityCounts, RunSummary};
use crate::domain::types::EntityKind;
use crate::etl::dimension_resolver::DimensionResolver;
use crate::etl::error::{EtlError, EtlResult};
use crate::etl::error_reporter::ErrorReporter;
use crate::etl::loader::IncrementalLoader;
use crate::etl::source_reader::{CsvSource, JsonSource, RawRecord, RecordSource};
use crate::etl::transformer::{
    ActivityTransformer, CompanyTransformer, ContactTransformer, OpportunityTransformer,
};
use crate::repository::CrmRepository;
use chrono::Utc;
use std::path::Path;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub struct Pipeline<R: CrmRepository + Clone> {
    repo: R,
    config: EtlConfig,
}

impl<R: CrmRepository + Clone> Pipeline<R> {
    pub fn new(repo: R, config: EtlConfig) -> Self {
        Self { repo, config }
    }

    /// Run the whole pipeline once and return the per-entity summary.
    #[instrument(skip(self), fields(run_id))]
    pub async fn run(&self) -> EtlResult<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(data_dir = %self.config.data_dir, "pipeline run started");

        match self.repo.schema_version().await? {
            Some(version) if version == CURRENT_SCHEMA_VERSION => {}
            Some(version) => {
                warn!(
                    found = version,
                    expected = CURRENT_SCHEMA_VERSION,
                    "schema_version mismatch; proceeding against possibly stale schema"
                );
            }
            None => {
                return Err(EtlError::InternalError(
                    "store schema is not initialized (schema_version missing)".to_string(),
                ))
            }
        }

        let mut resolver = DimensionResolver::new(self.repo.clone());
        resolver.preload().await?;

        let mut loader = IncrementalLoader::new(self.repo.clone(), self.config.insert_batch_size);
        loader.initialize().await?;

        let mut reporter = ErrorReporter::new(&self.config.errors_dir);

        let processed = self
            .process_entities(&mut resolver, &mut loader, &mut reporter)
            .await;

        // error records reach the sink even when the run is aborting
        let processed = match processed {
            Ok(processed) => processed,
            Err(e) => {
                warn!(error = %e, "fatal store failure; flushing error report before abort");
                reporter.flush();
                return Err(e);
            }
        };

        let counts_of = |entity: EntityKind, processed: usize| EntityCounts {
            processed,
            loaded: loader.loaded(entity),
            skipped: loader.skipped(entity),
            rejected: reporter.rejected_count(entity),
        };
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            companies: counts_of(EntityKind::Company, processed[0]),
            contacts: counts_of(EntityKind::Contact, processed[1]),
            opportunities: counts_of(EntityKind::Opportunity, processed[2]),
            activities: counts_of(EntityKind::Activity, processed[3]),
        };
        reporter.flush();

        for entity in EntityKind::ALL {
            let counts = summary.counts(entity);
            info!(
                entity = %entity,
                processed = counts.processed,
                loaded = counts.loaded,
                skipped = counts.skipped,
                rejected = counts.rejected,
                "entity load finished"
            );
        }
        info!(
            run_id = %summary.run_id,
            rejected = summary.total_rejected(),
            "pipeline run completed"
        );

        Ok(summary)
    }

    /// Process all four entities in referential order; returns per-entity
    /// processed counts.
    async fn process_entities(
        &self,
        resolver: &mut DimensionResolver<R>,
        loader: &mut IncrementalLoader<R>,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<[usize; 4]> {
        let companies = self.process_companies(resolver, loader, reporter).await?;
        let contacts = self.process_contacts(resolver, loader, reporter).await?;
        let opportunities = self.process_opportunities(resolver, loader, reporter).await?;
        let activities = self.process_activities(loader, reporter).await?;
        Ok([companies, contacts, opportunities, activities])
    }

    fn source_path(&self, file_name: &str) -> std::path::PathBuf {
        Path::new(&self.config.data_dir).join(file_name)
    }

    /// Skip-before-validate: an id the loader already knows is "already
    /// loaded" and is neither re-validated nor re-inserted. Records without
    /// an id fall through to the transformer, which rejects them.
    fn already_loaded(
        loader: &mut IncrementalLoader<R>,
        entity: EntityKind,
        record: &RawRecord,
    ) -> bool {
        match record.get("id") {
            Some(id) => loader.check_skip(entity, id.trim()),
            None => false,
        }
    }

    fn report_rejection(
        reporter: &mut ErrorReporter,
        entity: EntityKind,
        record: &RawRecord,
        failures: &[crate::etl::error::ValidationFailure],
    ) {
        warn!(
            entity = %entity,
            record = %record.identifier(),
            reasons = failures.len(),
            "record rejected"
        );
        let raw = serde_json::to_value(&record.fields).unwrap_or(serde_json::Value::Null);
        reporter.record(entity, record.identifier(), failures, raw);
    }

    async fn process_companies(
        &self,
        resolver: &mut DimensionResolver<R>,
        loader: &mut IncrementalLoader<R>,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<usize> {
        let mut source = CsvSource::open(self.source_path("companies.csv"), self.config.read_chunk_size)?;
        let now = Utc::now();
        let mut processed = 0;

        while let Some(chunk) = source.next_chunk()? {
            for record in &chunk {
                processed += 1;
                if Self::already_loaded(loader, EntityKind::Company, record) {
                    continue;
                }
                match CompanyTransformer::transform(record, resolver, now).await? {
                    Ok(row) => {
                        loader.stage_company(row, reporter).await?;
                    }
                    Err(failures) => {
                        Self::report_rejection(reporter, EntityKind::Company, record, &failures);
                    }
                }
            }
        }
        loader.finish_entity(EntityKind::Company, reporter).await?;
        Ok(processed)
    }

    async fn process_contacts(
        &self,
        resolver: &mut DimensionResolver<R>,
        loader: &mut IncrementalLoader<R>,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<usize> {
        let mut source = JsonSource::open(self.source_path("contacts.json"), self.config.read_chunk_size)?;
        let now = Utc::now();
        let mut processed = 0;

        while let Some(chunk) = source.next_chunk()? {
            for record in &chunk {
                processed += 1;
                if Self::already_loaded(loader, EntityKind::Contact, record) {
                    continue;
                }
                let outcome = ContactTransformer::transform(
                    record,
                    resolver,
                    loader.known_company_ids(),
                    loader.known_contact_emails(),
                    now,
                )
                .await?;
                match outcome {
                    Ok(row) => {
                        loader.stage_contact(row, reporter).await?;
                    }
                    Err(failures) => {
                        Self::report_rejection(reporter, EntityKind::Contact, record, &failures);
                    }
                }
            }
        }
        loader.finish_entity(EntityKind::Contact, reporter).await?;
        Ok(processed)
    }

    async fn process_opportunities(
        &self,
        resolver: &mut DimensionResolver<R>,
        loader: &mut IncrementalLoader<R>,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<usize> {
        let mut source =
            CsvSource::open(self.source_path("opportunities.csv"), self.config.read_chunk_size)?;
        let now = Utc::now();
        let mut processed = 0;

        while let Some(chunk) = source.next_chunk()? {
            for record in &chunk {
                processed += 1;
                if Self::already_loaded(loader, EntityKind::Opportunity, record) {
                    continue;
                }
                let outcome = OpportunityTransformer::transform(
                    record,
                    resolver,
                    loader.known_contact_ids(),
                    loader.known_company_ids(),
                    now,
                )
                .await?;
                match outcome {
                    Ok(row) => {
                        loader.stage_opportunity(row, reporter).await?;
                    }
                    Err(failures) => {
                        Self::report_rejection(reporter, EntityKind::Opportunity, record, &failures);
                    }
                }
            }
        }
        loader.finish_entity(EntityKind::Opportunity, reporter).await?;
        Ok(processed)
    }

    async fn process_activities(
        &self,
        loader: &mut IncrementalLoader<R>,
        reporter: &mut ErrorReporter,
    ) -> EtlResult<usize> {
        let mut source =
            JsonSource::open(self.source_path("activities.json"), self.config.read_chunk_size)?;
        let now = Utc::now();
        let mut processed = 0;

        while let Some(chunk) = source.next_chunk()? {
            for record in &chunk {
                processed += 1;
                if Self::already_loaded(loader, EntityKind::Activity, record) {
                    continue;
                }
                let outcome = ActivityTransformer::transform(
                    record,
                    loader.known_contact_ids(),
                    loader.known_opportunity_ids(),
                    now,
                )
                .await?;
                match outcome {
                    Ok(row) => {
                        loader.stage_activity(row, reporter).await?;
                    }
                    Err(failures) => {
                        Self::report_rejection(reporter, EntityKind::Activity, record, &failures);
                    }
                }
            }
        }
        loader.finish_entity(EntityKind::Activity, reporter).await?;
        Ok(processed)
    }
}
