// ==========================================
// CRM ETL - error reporter
// ==========================================
// In-memory accumulation of rejected records, flushed to the error sink at
// end of run: one NDJSON file per entity type, append-only across runs.
// Reporting never fails the pipeline; a sink write error is logged and
// swallowed so it cannot mask the data errors it was reporting.
// ==========================================

use crate::domain::report::RejectedRecord;
use crate::domain::types::EntityKind;
use crate::etl::error::ValidationFailure;
use chrono::Utc;
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct ErrorReporter {
    errors_dir: PathBuf,
    records: Vec<RejectedRecord>,
}

impl ErrorReporter {
    pub fn new<P: AsRef<Path>>(errors_dir: P) -> Self {
        Self {
            errors_dir: errors_dir.as_ref().to_path_buf(),
            records: Vec::new(),
        }
    }

    /// Accumulate one rejected record. In-memory append only; cannot fail.
    pub fn record(
        &mut self,
        entity: EntityKind,
        record_id: String,
        reasons: &[ValidationFailure],
        raw: serde_json::Value,
    ) {
        self.records.push(RejectedRecord {
            entity,
            record_id,
            reasons: reasons.iter().map(ToString::to_string).collect(),
            raw,
            occurred_at: Utc::now(),
        });
    }

    /// Number of accumulated records (per-entity count drives the summary).
    pub fn rejected_count(&self, entity: EntityKind) -> usize {
        self.records.iter().filter(|r| r.entity == entity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write everything accumulated to the sink, one file per entity type,
    /// appending. Failures are logged and swallowed.
    pub fn flush(&mut self) {
        if self.records.is_empty() {
            return;
        }

        if let Err(e) = create_dir_all(&self.errors_dir) {
            warn!(dir = %self.errors_dir.display(), error = %e, "error sink unavailable; {} rejection records dropped", self.records.len());
            self.records.clear();
            return;
        }

        for entity in EntityKind::ALL {
            let lines: Vec<String> = self
                .records
                .iter()
                .filter(|r| r.entity == entity)
                .filter_map(|r| serde_json::to_string(r).ok())
                .collect();
            if lines.is_empty() {
                continue;
            }

            let path = self.errors_dir.join(format!("{entity}-errors.ndjson"));
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut file| {
                    for line in &lines {
                        writeln!(file, "{line}")?;
                    }
                    Ok(())
                });

            if let Err(e) = result {
                warn!(file = %path.display(), error = %e, "error sink write failed; records dropped");
            }
        }

        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    fn sample_failure() -> ValidationFailure {
        ValidationFailure::invalid("domain", "not a domain", "not a valid domain")
    }

    #[test]
    fn test_record_and_count() {
        let dir = tempdir().unwrap();
        let mut reporter = ErrorReporter::new(dir.path());
        assert!(reporter.is_empty());

        reporter.record(
            EntityKind::Company,
            "C1".to_string(),
            &[sample_failure()],
            serde_json::json!({"id": "C1"}),
        );
        reporter.record(
            EntityKind::Contact,
            "CONT1".to_string(),
            &[sample_failure()],
            serde_json::Value::Null,
        );

        assert_eq!(reporter.rejected_count(EntityKind::Company), 1);
        assert_eq!(reporter.rejected_count(EntityKind::Contact), 1);
        assert_eq!(reporter.rejected_count(EntityKind::Activity), 0);
    }

    #[test]
    fn test_flush_appends_across_runs() {
        let dir = tempdir().unwrap();

        for run in 0..2 {
            let mut reporter = ErrorReporter::new(dir.path());
            reporter.record(
                EntityKind::Company,
                format!("C{run}"),
                &[sample_failure()],
                serde_json::Value::Null,
            );
            reporter.flush();
            assert!(reporter.is_empty());
        }

        let content = read_to_string(dir.path().join("companies-errors.ndjson")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2, "second run appended, not overwrote");
        assert!(lines[0].contains("C0"));
        assert!(lines[1].contains("C1"));

        // each line is standalone JSON with the expected shape
        let parsed: RejectedRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.record_id, "C0");
        assert_eq!(parsed.reasons.len(), 1);
    }

    #[test]
    fn test_flush_with_unwritable_sink_is_swallowed() {
        // a file path used as a directory cannot be created
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let mut reporter = ErrorReporter::new(blocker.join("nested"));
        reporter.record(
            EntityKind::Company,
            "C1".to_string(),
            &[sample_failure()],
            serde_json::Value::Null,
        );
        reporter.flush(); // must not panic or error
        assert!(reporter.is_empty());
    }
}
