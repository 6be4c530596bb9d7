// ==========================================
// CRM ETL - batch entry point
// ==========================================
// Usage:
//   crm-etl [data_dir] [errors_dir] [db_path]
//
// Positional arguments override the CRM_ETL_* environment configuration.
// Exit code is non-zero only on a fatal store failure; validation errors are
// reported to the error sink and the run still counts as completed.
// ==========================================

use crm_etl::config::EtlConfig;
use crm_etl::etl::Pipeline;
use crm_etl::repository::SqliteCrmRepository;
use crm_etl::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut config = EtlConfig::from_env();
    let mut args = std::env::args().skip(1);
    if let Some(data_dir) = args.next() {
        config.data_dir = data_dir;
    }
    if let Some(errors_dir) = args.next() {
        config.errors_dir = errors_dir;
    }
    if let Some(db_path) = args.next() {
        config.db_path = db_path;
    }

    tracing::info!(version = crm_etl::VERSION, "{}", crm_etl::APP_NAME);
    tracing::info!(
        db = %config.db_path,
        data = %config.data_dir,
        errors = %config.errors_dir,
        "starting pipeline"
    );

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let repo = SqliteCrmRepository::new(&config.db_path)?;
    repo.ensure_schema()?;

    let pipeline = Pipeline::new(repo, config.clone());
    let summary = pipeline.run().await?;

    if summary.total_rejected() > 0 {
        tracing::info!(
            rejected = summary.total_rejected(),
            errors_dir = %config.errors_dir,
            "pipeline completed with validation errors; see the error sink"
        );
    } else {
        tracing::info!("pipeline completed cleanly");
    }

    Ok(())
}
