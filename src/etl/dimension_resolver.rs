// ==========================================
// CRM ETL - dimension resolver
// ==========================================
// name -> surrogate id per dimension kind, create-on-miss. One instance is
// constructed per run with injected store access and handed to transformers
// by &mut: exclusive access makes check-create-populate single-writer, so a
// distinct normalized name creates at most one row per run.
// ==========================================

use crate::domain::types::DimensionKind;
use crate::etl::error::EtlResult;
use crate::repository::CrmRepository;
use std::collections::HashMap;
use tracing::debug;

pub struct DimensionResolver<R: CrmRepository> {
    repo: R,
    cache: HashMap<DimensionKind, HashMap<String, i64>>,
}

impl<R: CrmRepository> DimensionResolver<R> {
    /// Create a resolver with empty caches; call `preload` before the run.
    pub fn new(repo: R) -> Self {
        let mut cache = HashMap::new();
        for kind in DimensionKind::ALL {
            cache.insert(kind, HashMap::new());
        }
        Self { repo, cache }
    }

    /// Seed every per-kind cache from the store. Keys are normalized the
    /// same way `resolve` normalizes, so hand-seeded rows in any casing
    /// still hit the cache instead of colliding on insert.
    pub async fn preload(&mut self) -> EtlResult<()> {
        for kind in DimensionKind::ALL {
            let names = self.repo.dimension_names(kind).await?;
            debug!(dimension = %kind, known = names.len(), "dimension cache seeded");
            let normalized = names
                .into_iter()
                .map(|(name, id)| (name.trim().to_uppercase(), id))
                .collect();
            self.cache.insert(kind, normalized);
        }
        Ok(())
    }

    /// Resolve a raw name to its surrogate id, creating the dimension row on
    /// first sight. The caller has already rejected blank names; normalization
    /// here is strip + uppercase, so any casing/whitespace variant of the same
    /// name maps to the same id.
    pub async fn resolve(&mut self, kind: DimensionKind, raw_name: &str) -> EtlResult<i64> {
        let normalized = raw_name.trim().to_uppercase();

        if let Some(id) = self.cache.get(&kind).and_then(|names| names.get(&normalized)) {
            return Ok(*id);
        }

        let id = self.repo.insert_dimension(kind, &normalized).await?;
        debug!(dimension = %kind, name = %normalized, id, "dimension row created");
        self.cache.entry(kind).or_default().insert(normalized, id);
        Ok(id)
    }

    /// Number of cached names for a kind (test/diagnostic hook).
    pub fn cached_len(&self, kind: DimensionKind) -> usize {
        self.cache.get(&kind).map(HashMap::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteCrmRepository;

    fn test_resolver() -> DimensionResolver<SqliteCrmRepository> {
        let repo = SqliteCrmRepository::new_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        DimensionResolver::new(repo)
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_across_variants() {
        let mut resolver = test_resolver();
        resolver.preload().await.unwrap();

        let first = resolver.resolve(DimensionKind::Industry, "software").await.unwrap();
        let second = resolver.resolve(DimensionKind::Industry, "  SOFTWARE ").await.unwrap();
        let third = resolver.resolve(DimensionKind::Industry, "Software").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(resolver.cached_len(DimensionKind::Industry), 1);
    }

    #[tokio::test]
    async fn test_kinds_do_not_share_namespaces() {
        let mut resolver = test_resolver();
        resolver.preload().await.unwrap();

        let industry = resolver.resolve(DimensionKind::Industry, "ENTERPRISE").await.unwrap();
        let product = resolver.resolve(DimensionKind::Product, "ENTERPRISE").await.unwrap();

        // same name, distinct tables, independent surrogate keys
        assert_eq!(resolver.cached_len(DimensionKind::Industry), 1);
        assert_eq!(resolver.cached_len(DimensionKind::Product), 1);
        let _ = (industry, product);
    }

    #[tokio::test]
    async fn test_preload_sees_prior_runs() {
        let repo = SqliteCrmRepository::new_in_memory().unwrap();
        repo.ensure_schema().unwrap();

        let first_run_id = {
            let mut resolver = DimensionResolver::new(repo.clone());
            resolver.preload().await.unwrap();
            resolver.resolve(DimensionKind::Stage, "Prospecting").await.unwrap()
        };

        // a fresh resolver over the same store resolves to the same id
        let mut resolver = DimensionResolver::new(repo);
        resolver.preload().await.unwrap();
        let second_run_id = resolver.resolve(DimensionKind::Stage, "PROSPECTING").await.unwrap();
        assert_eq!(first_run_id, second_run_id);
    }
}
