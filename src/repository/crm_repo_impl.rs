// ==========================================
// CRM ETL - SQLite repository implementation
// ==========================================
// rusqlite behind Arc<Mutex<Connection>>; every bulk insert runs in one
// transaction so a failed flush leaves the store untouched.
// ==========================================

use crate::db::{open_in_memory_connection, open_sqlite_connection, read_schema_version};
use crate::domain::types::{DimensionKind, EntityKind};
use crate::domain::{ActivityRow, CompanyRow, ContactRow, OpportunityRow};
use crate::repository::crm_repo::CrmRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Relational schema applied by `ensure_schema` (idempotent).
const SCHEMA_SQL: &str = include_str!("schema.sql");

// ==========================================
// SqliteCrmRepository
// ==========================================
#[derive(Clone)]
pub struct SqliteCrmRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCrmRepository {
    /// Open the store at `db_path` with the unified connection settings.
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn new_in_memory() -> RepositoryResult<Self> {
        let conn = open_in_memory_connection()
            .map_err(|e| RepositoryError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Apply the embedded schema (CREATE TABLE IF NOT EXISTS throughout).
    ///
    /// Versioned migration of a live store is an external concern; this only
    /// bootstraps an empty database and stamps the schema_version marker.
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl CrmRepository for SqliteCrmRepository {
    async fn dimension_names(&self, kind: DimensionKind) -> RepositoryResult<HashMap<String, i64>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT name, id FROM {}", kind.table()))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (name, id) = row?;
            map.insert(name, id);
        }
        Ok(map)
    }

    async fn insert_dimension(&self, kind: DimensionKind, name: &str) -> RepositoryResult<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            &format!("INSERT INTO {} (name) VALUES (?1)", kind.table()),
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn existing_ids(&self, entity: EntityKind) -> RepositoryResult<HashSet<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT id FROM {}", entity.table()))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }

    async fn contact_emails(&self) -> RepositoryResult<HashSet<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT email FROM contacts")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut emails = HashSet::new();
        for row in rows {
            emails.insert(row?);
        }
        Ok(emails)
    }

    async fn batch_insert_companies(&self, rows: &[CompanyRow]) -> RepositoryResult<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO companies (
                    id, industry_id, name, domain, size, country,
                    created_date, is_customer, annual_revenue
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.industry_id,
                    row.name,
                    row.domain,
                    row.size,
                    row.country,
                    row.created_date,
                    row.is_customer,
                    row.annual_revenue,
                ])?;
            }
            rows.len()
        };
        tx.commit()?;
        Ok(count)
    }

    async fn batch_insert_contacts(&self, rows: &[ContactRow]) -> RepositoryResult<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO contacts (
                    id, status_id, company_id, email, first_name, last_name,
                    title, phone, created_date, last_modified
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.status_id,
                    row.company_id,
                    row.email,
                    row.first_name,
                    row.last_name,
                    row.title,
                    row.phone,
                    row.created_date,
                    row.last_modified,
                ])?;
            }
            rows.len()
        };
        tx.commit()?;
        Ok(count)
    }

    async fn batch_insert_opportunities(&self, rows: &[OpportunityRow]) -> RepositoryResult<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO opportunities (
                    id, name, contact_id, company_id, stage_id,
                    forecast_category_id, product_id, amount, probability,
                    created_date, close_date, is_closed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.name,
                    row.contact_id,
                    row.company_id,
                    row.stage_id,
                    row.forecast_category_id,
                    row.product_id,
                    row.amount,
                    row.probability,
                    row.created_date,
                    row.close_date,
                    row.is_closed,
                ])?;
            }
            rows.len()
        };
        tx.commit()?;
        Ok(count)
    }

    async fn batch_insert_activities(&self, rows: &[ActivityRow]) -> RepositoryResult<usize> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO activities (
                    id, contact_id, opportunity_id, type, subject,
                    timestamp, duration_minutes, outcome, notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.contact_id,
                    row.opportunity_id,
                    row.activity_type,
                    row.subject,
                    row.timestamp,
                    row.duration_minutes,
                    row.outcome,
                    row.notes,
                ])?;
            }
            rows.len()
        };
        tx.commit()?;
        Ok(count)
    }

    async fn schema_version(&self) -> RepositoryResult<Option<i64>> {
        let conn = self.lock_conn()?;
        Ok(read_schema_version(&conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_repo() -> SqliteCrmRepository {
        let repo = SqliteCrmRepository::new_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn sample_company(id: &str, domain: &str, industry_id: i64) -> CompanyRow {
        CompanyRow {
            id: id.to_string(),
            industry_id,
            name: "ACME".to_string(),
            domain: domain.to_string(),
            size: "1000-5000".to_string(),
            country: "US".to_string(),
            created_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            is_customer: true,
            annual_revenue: 500_000.0,
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_stamps_version() {
        let repo = test_repo();
        assert_eq!(repo.schema_version().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_dimension_roundtrip() {
        let repo = test_repo();
        let id = repo
            .insert_dimension(DimensionKind::Industry, "SOFTWARE")
            .await
            .unwrap();
        let names = repo.dimension_names(DimensionKind::Industry).await.unwrap();
        assert_eq!(names.get("SOFTWARE"), Some(&id));
    }

    #[tokio::test]
    async fn test_duplicate_dimension_is_constraint_violation() {
        let repo = test_repo();
        repo.insert_dimension(DimensionKind::Stage, "PROSPECTING")
            .await
            .unwrap();
        let err = repo
            .insert_dimension(DimensionKind::Stage, "PROSPECTING")
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation(), "got: {err}");
    }

    #[tokio::test]
    async fn test_batch_insert_companies_and_existing_ids() {
        let repo = test_repo();
        let industry_id = repo
            .insert_dimension(DimensionKind::Industry, "SOFTWARE")
            .await
            .unwrap();

        let rows = vec![
            sample_company("C1", "acme.com", industry_id),
            sample_company("C2", "globex.com", industry_id),
        ];
        assert_eq!(repo.batch_insert_companies(&rows).await.unwrap(), 2);

        let ids = repo.existing_ids(EntityKind::Company).await.unwrap();
        assert!(ids.contains("C1") && ids.contains("C2"));
    }

    #[tokio::test]
    async fn test_duplicate_company_rolls_back_whole_flush() {
        let repo = test_repo();
        let industry_id = repo
            .insert_dimension(DimensionKind::Industry, "SOFTWARE")
            .await
            .unwrap();
        repo.batch_insert_companies(&[sample_company("C1", "acme.com", industry_id)])
            .await
            .unwrap();

        // C9 alone would be fine; the duplicate C1 poisons the whole flush.
        let rows = vec![
            sample_company("C9", "initech.com", industry_id),
            sample_company("C1", "elsewhere.com", industry_id),
        ];
        let err = repo.batch_insert_companies(&rows).await.unwrap_err();
        assert!(err.is_constraint_violation());

        let ids = repo.existing_ids(EntityKind::Company).await.unwrap();
        assert!(!ids.contains("C9"), "rolled-back row must not persist");
    }
}
