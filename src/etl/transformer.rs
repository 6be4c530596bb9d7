// ==========================================
// CRM ETL - entity transformers
// ==========================================
// One transformer per entity. Each applies the field validators to every
// column, resolves dimension FKs through the resolver, and checks entity FKs
// against the loader's known-id sets. ALL failures for a record are
// collected, in a fixed column order (id, name columns, FK columns, then the
// remaining columns), so error reports are deterministic. A record with any
// failure is rejected whole; partial rows never reach the loader.
//
// Dimension rows are still created for otherwise-rejected records: a
// dimension is an enum-domain fact, not a property of one record.
// ==========================================

use crate::domain::types::{DimensionKind, TextCase};
use crate::domain::{ActivityRow, CompanyRow, ContactRow, OpportunityRow};
use crate::etl::dimension_resolver::DimensionResolver;
use crate::etl::error::{EtlResult, RecordOutcome, ValidationFailure};
use crate::etl::field_validator as validate;
use crate::etl::source_reader::RawRecord;
use crate::repository::CrmRepository;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

// ==========================================
// shared helpers
// ==========================================

/// Record a failure and yield None, or pass the validated value through.
fn check<T>(failures: &mut Vec<ValidationFailure>, result: Result<T, ValidationFailure>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(failure) => {
            failures.push(failure);
            None
        }
    }
}

/// Required raw field: absent or blank is a MissingField failure.
fn required<'a>(record: &'a RawRecord, field: &str) -> Result<&'a str, ValidationFailure> {
    record.get(field).ok_or_else(|| ValidationFailure::missing(field))
}

/// Resolve a required dimension column; blank is the caller's failure, a
/// present value always resolves (created on demand).
async fn resolve_dimension<R: CrmRepository>(
    failures: &mut Vec<ValidationFailure>,
    resolver: &mut DimensionResolver<R>,
    kind: DimensionKind,
    record: &RawRecord,
    field: &str,
) -> EtlResult<Option<i64>> {
    match record.get(field) {
        Some(raw) => Ok(Some(resolver.resolve(kind, raw).await?)),
        None => {
            failures.push(ValidationFailure::missing(field));
            Ok(None)
        }
    }
}

/// Required entity FK: must reference an id the loader already knows.
/// Entity rows are never auto-created.
fn entity_reference(
    record: &RawRecord,
    field: &str,
    target: &str,
    known_ids: &HashSet<String>,
) -> Result<String, ValidationFailure> {
    let value = required(record, field)?.trim().to_string();
    if known_ids.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationFailure::unresolved(field, &value, target))
    }
}

/// Parse an ISO 8601 column and reject future values.
fn past_datetime(
    record: &RawRecord,
    field: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationFailure> {
    let raw = required(record, field)?;
    let value = validate::datetime(field, raw)?;
    validate::require_not_future(field, value, now)?;
    Ok(value)
}

// ==========================================
// CompanyTransformer
// ==========================================
pub struct CompanyTransformer;

impl CompanyTransformer {
    pub async fn transform<R: CrmRepository>(
        record: &RawRecord,
        resolver: &mut DimensionResolver<R>,
        now: DateTime<Utc>,
    ) -> EtlResult<RecordOutcome<CompanyRow>> {
        let mut failures = Vec::new();

        let id = check(&mut failures, required(record, "id").map(|v| v.trim().to_string()));
        let name = check(
            &mut failures,
            required(record, "name").and_then(|raw| validate::required_text("name", raw, TextCase::Upper)),
        );
        let industry_id = resolve_dimension(
            &mut failures,
            resolver,
            DimensionKind::Industry,
            record,
            "industry",
        )
        .await?;
        let domain = check(
            &mut failures,
            required(record, "domain").and_then(|raw| validate::domain("domain", raw)),
        );
        let size = check(
            &mut failures,
            required(record, "size").and_then(|raw| validate::company_size("size", raw)),
        );
        let country = check(
            &mut failures,
            required(record, "country").and_then(|raw| validate::country("country", raw)),
        );
        let created_date = check(&mut failures, past_datetime(record, "created_date", now));
        let is_customer = check(
            &mut failures,
            required(record, "is_customer").and_then(|raw| validate::boolean("is_customer", raw)),
        );
        let annual_revenue = check(
            &mut failures,
            required(record, "annual_revenue")
                .and_then(|raw| validate::positive_f64("annual_revenue", raw)),
        );

        // with zero failures every binding is Some, so the row assembles
        let row = (|| {
            Some(CompanyRow {
                id: id?,
                industry_id: industry_id?,
                name: name?,
                domain: domain?,
                size: size?,
                country: country?,
                created_date: created_date?,
                is_customer: is_customer?,
                annual_revenue: annual_revenue?,
            })
        })();

        match row {
            Some(row) if failures.is_empty() => Ok(Ok(row)),
            _ => Ok(Err(failures)),
        }
    }
}

// ==========================================
// ContactTransformer
// ==========================================
pub struct ContactTransformer;

impl ContactTransformer {
    pub async fn transform<R: CrmRepository>(
        record: &RawRecord,
        resolver: &mut DimensionResolver<R>,
        known_companies: &HashSet<String>,
        known_emails: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> EtlResult<RecordOutcome<ContactRow>> {
        let mut failures = Vec::new();

        let id = check(&mut failures, required(record, "id").map(|v| v.trim().to_string()));
        let first_name = check(
            &mut failures,
            required(record, "first_name")
                .and_then(|raw| validate::required_text("first_name", raw, TextCase::Title)),
        );
        let last_name = check(
            &mut failures,
            required(record, "last_name")
                .and_then(|raw| validate::required_text("last_name", raw, TextCase::Title)),
        );
        let status_id = resolve_dimension(
            &mut failures,
            resolver,
            DimensionKind::ContactStatus,
            record,
            "status",
        )
        .await?;
        let company_id = check(
            &mut failures,
            entity_reference(record, "company_id", "company", known_companies),
        );
        let email = check(
            &mut failures,
            required(record, "email")
                .and_then(|raw| validate::email("email", raw))
                .and_then(|normalized| {
                    if known_emails.contains(&normalized) {
                        Err(ValidationFailure::invalid(
                            "email",
                            &normalized,
                            "a contact already exists with this email",
                        ))
                    } else {
                        Ok(normalized)
                    }
                }),
        );
        let title = check(
            &mut failures,
            required(record, "title").and_then(|raw| validate::required_text("title", raw, TextCase::Preserve)),
        );
        let phone = check(&mut failures, validate::phone("phone", record.get("phone")));
        let created_date = check(&mut failures, past_datetime(record, "created_date", now));
        let last_modified = check(
            &mut failures,
            required(record, "last_modified").and_then(|raw| {
                let value = validate::datetime("last_modified", raw)?;
                validate::require_not_future("last_modified", value, now)?;
                Ok(value)
            }),
        );

        // cross-date rule needs both ends parsed
        if let (Some(created), Some(modified)) = (created_date, last_modified) {
            if let Err(failure) =
                validate::require_not_before("last_modified", modified, created, "created_date")
            {
                failures.push(failure);
            }
        }

        let row = (|| {
            Some(ContactRow {
                id: id?,
                status_id: status_id?,
                company_id: company_id?,
                email: email?,
                first_name: first_name?,
                last_name: last_name?,
                title: title?,
                phone: phone?,
                created_date: created_date?,
                last_modified: last_modified?,
            })
        })();

        match row {
            Some(row) if failures.is_empty() => Ok(Ok(row)),
            _ => Ok(Err(failures)),
        }
    }
}

// ==========================================
// OpportunityTransformer
// ==========================================
pub struct OpportunityTransformer;

impl OpportunityTransformer {
    pub async fn transform<R: CrmRepository>(
        record: &RawRecord,
        resolver: &mut DimensionResolver<R>,
        known_contacts: &HashSet<String>,
        known_companies: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> EtlResult<RecordOutcome<OpportunityRow>> {
        let mut failures = Vec::new();

        let id = check(&mut failures, required(record, "id").map(|v| v.trim().to_string()));
        let name = check(
            &mut failures,
            required(record, "name").and_then(|raw| validate::required_text("name", raw, TextCase::Title)),
        );
        let contact_id = check(
            &mut failures,
            entity_reference(record, "contact_id", "contact", known_contacts),
        );
        let company_id = check(
            &mut failures,
            entity_reference(record, "company_id", "company", known_companies),
        );
        let stage_id =
            resolve_dimension(&mut failures, resolver, DimensionKind::Stage, record, "stage").await?;
        let forecast_category_id = resolve_dimension(
            &mut failures,
            resolver,
            DimensionKind::ForecastCategory,
            record,
            "forecast_category",
        )
        .await?;
        let product_id = resolve_dimension(
            &mut failures,
            resolver,
            DimensionKind::Product,
            record,
            "product",
        )
        .await?;
        let amount = check(
            &mut failures,
            required(record, "amount").and_then(|raw| validate::non_negative_f64("amount", raw)),
        );
        let probability = check(
            &mut failures,
            required(record, "probability").and_then(|raw| validate::probability("probability", raw)),
        );
        let created_date = check(&mut failures, past_datetime(record, "created_date", now));
        // close_date may legitimately be in the future
        let close_date = check(
            &mut failures,
            required(record, "close_date").and_then(|raw| validate::datetime("close_date", raw)),
        );
        let is_closed = check(
            &mut failures,
            required(record, "is_closed").and_then(|raw| validate::boolean("is_closed", raw)),
        );

        let row = (|| {
            Some(OpportunityRow {
                id: id?,
                name: name?,
                contact_id: contact_id?,
                company_id: company_id?,
                stage_id: stage_id?,
                forecast_category_id: forecast_category_id?,
                product_id: product_id?,
                amount: amount?,
                probability: probability?,
                created_date: created_date?,
                close_date: close_date?,
                is_closed: is_closed?,
            })
        })();

        match row {
            Some(row) if failures.is_empty() => Ok(Ok(row)),
            _ => Ok(Err(failures)),
        }
    }
}

// ==========================================
// ActivityTransformer
// ==========================================
pub struct ActivityTransformer;

impl ActivityTransformer {
    pub async fn transform(
        record: &RawRecord,
        known_contacts: &HashSet<String>,
        known_opportunities: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> EtlResult<RecordOutcome<ActivityRow>> {
        let mut failures = Vec::new();

        let id = check(&mut failures, required(record, "id").map(|v| v.trim().to_string()));
        let activity_type = check(
            &mut failures,
            required(record, "type").and_then(|raw| validate::required_text("type", raw, TextCase::Upper)),
        );
        let subject = check(
            &mut failures,
            required(record, "subject")
                .and_then(|raw| validate::required_text("subject", raw, TextCase::Lower)),
        );
        let contact_id = check(
            &mut failures,
            entity_reference(record, "contact_id", "contact", known_contacts),
        );
        // nullable entity FK: absent is fine, present must resolve
        let opportunity_id = match record.get("opportunity_id") {
            None => Some(None),
            Some(raw) => {
                let value = raw.trim().to_string();
                if known_opportunities.contains(&value) {
                    Some(Some(value))
                } else {
                    failures.push(ValidationFailure::unresolved(
                        "opportunity_id",
                        &value,
                        "opportunity",
                    ));
                    None
                }
            }
        };
        let timestamp = check(&mut failures, past_datetime(record, "timestamp", now));
        let duration_minutes = check(
            &mut failures,
            required(record, "duration_minutes")
                .and_then(|raw| validate::non_negative_i32("duration_minutes", raw)),
        );
        let outcome = check(
            &mut failures,
            required(record, "outcome")
                .and_then(|raw| validate::required_text("outcome", raw, TextCase::Upper)),
        );
        let notes = validate::optional_text(record.get("notes"), TextCase::Preserve);

        let row = (|| {
            Some(ActivityRow {
                id: id?,
                contact_id: contact_id?,
                opportunity_id: opportunity_id?,
                activity_type: activity_type?,
                subject: subject?,
                timestamp: timestamp?,
                duration_minutes: duration_minutes?,
                outcome: outcome?,
                notes: notes.clone(),
            })
        })();

        match row {
            Some(row) if failures.is_empty() => Ok(Ok(row)),
            _ => Ok(Err(failures)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteCrmRepository;
    use std::collections::HashMap;

    fn record_from(pairs: &[(&str, &str)]) -> RawRecord {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            fields.insert(key.to_string(), value.to_string());
        }
        RawRecord { row_number: 1, fields }
    }

    fn test_resolver() -> DimensionResolver<SqliteCrmRepository> {
        let repo = SqliteCrmRepository::new_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        DimensionResolver::new(repo)
    }

    fn company_record() -> RawRecord {
        record_from(&[
            ("id", "C1"),
            ("name", "Acme Corp"),
            ("industry", "software"),
            ("domain", "Acme.COM"),
            ("size", "1000-5000"),
            ("country", "United States"),
            ("created_date", "2024-01-01T00:00:00Z"),
            ("is_customer", "true"),
            ("annual_revenue", "500000"),
        ])
    }

    #[tokio::test]
    async fn test_company_scenario_normalizes_everything() {
        let mut resolver = test_resolver();
        let row = CompanyTransformer::transform(&company_record(), &mut resolver, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.id, "C1");
        assert_eq!(row.name, "ACME CORP");
        assert_eq!(row.domain, "acme.com");
        assert_eq!(row.country, "US");
        assert_eq!(row.size, "1000-5000");
        assert!(row.is_customer);
        // the dimension row was created for "SOFTWARE"
        assert_eq!(resolver.cached_len(DimensionKind::Industry), 1);
        let again = resolver.resolve(DimensionKind::Industry, "SOFTWARE").await.unwrap();
        assert_eq!(row.industry_id, again);
    }

    #[tokio::test]
    async fn test_company_collects_all_failures_in_order() {
        let mut resolver = test_resolver();
        let mut record = company_record();
        record.fields.remove("name");
        record.fields.insert("domain".to_string(), "not a domain".to_string());
        record.fields.insert("size".to_string(), "5000-1000".to_string());

        let failures = CompanyTransformer::transform(&record, &mut resolver, Utc::now())
            .await
            .unwrap()
            .unwrap_err();

        let fields: Vec<String> = failures
            .iter()
            .map(|f| match f {
                ValidationFailure::MissingField { field } => field.clone(),
                ValidationFailure::InvalidValue { field, .. } => field.clone(),
                ValidationFailure::UnresolvedReference { field, .. } => field.clone(),
                ValidationFailure::PersistFailed(_) => "persist".to_string(),
            })
            .collect();
        assert_eq!(fields, vec!["name", "domain", "size"]);
        // the industry dimension still got created for the rejected record
        assert_eq!(resolver.cached_len(DimensionKind::Industry), 1);
    }

    #[tokio::test]
    async fn test_company_rejects_future_created_date() {
        let mut resolver = test_resolver();
        let mut record = company_record();
        record
            .fields
            .insert("created_date".to_string(), "2999-01-01T00:00:00Z".to_string());

        let failures = CompanyTransformer::transform(&record, &mut resolver, Utc::now())
            .await
            .unwrap()
            .unwrap_err();
        assert!(failures.iter().any(|f| f.to_string().contains("created_date")));
    }

    fn contact_record() -> RawRecord {
        record_from(&[
            ("id", "CONT1"),
            ("first_name", "jane"),
            ("last_name", "DOE"),
            ("status", "Lead"),
            ("company_id", "C1"),
            ("email", "Jane.Doe@Acme.COM"),
            ("title", "CEO"),
            ("phone", "+1-555-123-4567"),
            ("created_date", "2024-06-15T08:45:00"),
            ("last_modified", "2025-01-15T14:20:00"),
        ])
    }

    #[tokio::test]
    async fn test_contact_valid_record() {
        let mut resolver = test_resolver();
        let companies: HashSet<String> = ["C1".to_string()].into();
        let emails = HashSet::new();

        let row = ContactTransformer::transform(
            &contact_record(),
            &mut resolver,
            &companies,
            &emails,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(row.first_name, "Jane");
        assert_eq!(row.last_name, "Doe");
        assert_eq!(row.email, "jane.doe@acme.com");
        assert_eq!(row.phone.as_deref(), Some("+1-555-123-4567"));
    }

    #[tokio::test]
    async fn test_contact_unknown_company_rejected() {
        let mut resolver = test_resolver();
        let companies = HashSet::new();
        let emails = HashSet::new();

        let failures = ContactTransformer::transform(
            &contact_record(),
            &mut resolver,
            &companies,
            &emails,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(failures.iter().any(|f| matches!(
            f,
            ValidationFailure::UnresolvedReference { field, .. } if field == "company_id"
        )));
    }

    #[tokio::test]
    async fn test_contact_duplicate_email_rejected() {
        let mut resolver = test_resolver();
        let companies: HashSet<String> = ["C1".to_string()].into();
        let emails: HashSet<String> = ["jane.doe@acme.com".to_string()].into();

        let failures = ContactTransformer::transform(
            &contact_record(),
            &mut resolver,
            &companies,
            &emails,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(failures
            .iter()
            .any(|f| f.to_string().contains("a contact already exists with this email")));
    }

    #[tokio::test]
    async fn test_contact_last_modified_before_created_rejected() {
        let mut resolver = test_resolver();
        let companies: HashSet<String> = ["C1".to_string()].into();
        let mut record = contact_record();
        record
            .fields
            .insert("last_modified".to_string(), "2023-01-01T00:00:00".to_string());

        let failures = ContactTransformer::transform(
            &record,
            &mut resolver,
            &companies,
            &HashSet::new(),
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(failures
            .iter()
            .any(|f| f.to_string().contains("cannot be before created_date")));
    }

    #[tokio::test]
    async fn test_contact_missing_phone_is_fine() {
        let mut resolver = test_resolver();
        let companies: HashSet<String> = ["C1".to_string()].into();
        let mut record = contact_record();
        record.fields.remove("phone");

        let row = ContactTransformer::transform(
            &record,
            &mut resolver,
            &companies,
            &HashSet::new(),
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(row.phone, None);
    }

    fn opportunity_record() -> RawRecord {
        record_from(&[
            ("id", "OP1"),
            ("name", "acme - basic deal"),
            ("contact_id", "CONT1"),
            ("company_id", "C1"),
            ("stage", "Prospecting"),
            ("forecast_category", "Pipeline"),
            ("product", "Basic"),
            ("amount", "25000"),
            ("probability", "20"),
            ("created_date", "2024-06-15T08:45:00"),
            ("close_date", "2999-09-15T08:45:00"),
            ("is_closed", "false"),
        ])
    }

    #[tokio::test]
    async fn test_opportunity_valid_with_future_close_date() {
        let mut resolver = test_resolver();
        let contacts: HashSet<String> = ["CONT1".to_string()].into();
        let companies: HashSet<String> = ["C1".to_string()].into();

        let row = OpportunityTransformer::transform(
            &opportunity_record(),
            &mut resolver,
            &contacts,
            &companies,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(row.name, "Acme - Basic Deal");
        assert_eq!(row.probability, 20);
        // three dimension kinds touched
        assert_eq!(resolver.cached_len(DimensionKind::Stage), 1);
        assert_eq!(resolver.cached_len(DimensionKind::ForecastCategory), 1);
        assert_eq!(resolver.cached_len(DimensionKind::Product), 1);
    }

    #[tokio::test]
    async fn test_opportunity_probability_out_of_range() {
        let mut resolver = test_resolver();
        let contacts: HashSet<String> = ["CONT1".to_string()].into();
        let companies: HashSet<String> = ["C1".to_string()].into();
        let mut record = opportunity_record();
        record.fields.insert("probability".to_string(), "-20".to_string());

        let failures = OpportunityTransformer::transform(
            &record,
            &mut resolver,
            &contacts,
            &companies,
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("probability"));
    }

    fn activity_record() -> RawRecord {
        record_from(&[
            ("id", "ACT1"),
            ("type", "Call"),
            ("subject", "Call With Jane"),
            ("contact_id", "CONT1"),
            ("opportunity_id", "OP1"),
            ("timestamp", "2024-06-15T08:45:00"),
            ("duration_minutes", "30"),
            ("outcome", "Completed"),
            ("notes", "Discussed scope"),
        ])
    }

    #[tokio::test]
    async fn test_activity_valid_record_casing() {
        let contacts: HashSet<String> = ["CONT1".to_string()].into();
        let opportunities: HashSet<String> = ["OP1".to_string()].into();

        let row = ActivityTransformer::transform(&activity_record(), &contacts, &opportunities, Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.activity_type, "CALL");
        assert_eq!(row.subject, "call with jane");
        assert_eq!(row.outcome, "COMPLETED");
        assert_eq!(row.opportunity_id.as_deref(), Some("OP1"));
    }

    #[tokio::test]
    async fn test_activity_null_opportunity_accepted() {
        let contacts: HashSet<String> = ["CONT1".to_string()].into();
        let mut record = activity_record();
        record.fields.remove("opportunity_id");
        record.fields.remove("notes");

        let row = ActivityTransformer::transform(&record, &contacts, &HashSet::new(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.opportunity_id, None);
        assert_eq!(row.notes, None);
    }

    #[tokio::test]
    async fn test_activity_unknown_opportunity_rejected() {
        let contacts: HashSet<String> = ["CONT1".to_string()].into();

        let failures =
            ActivityTransformer::transform(&activity_record(), &contacts, &HashSet::new(), Utc::now())
                .await
                .unwrap()
                .unwrap_err();
        assert!(failures.iter().any(|f| matches!(
            f,
            ValidationFailure::UnresolvedReference { field, .. } if field == "opportunity_id"
        )));
    }
}
