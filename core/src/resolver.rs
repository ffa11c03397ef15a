use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::models::{MealRecord, ProductId};
use crate::nutrition::map_to_product_payload;
use crate::service::PlanStore;

/// How a meal's product id was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already resolved earlier in this run.
    Cached(ProductId),
    /// Found in the catalog by name and brand.
    Found(ProductId),
    /// Not in the catalog; a new product was created.
    Created(ProductId),
    /// Dry run: the product would have been created.
    Planned(ProductId),
}

impl Resolution {
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::Cached(id) | Self::Found(id) | Self::Created(id) | Self::Planned(id) => id,
        }
    }

    #[must_use]
    pub fn into_product_id(self) -> ProductId {
        match self {
            Self::Cached(id) | Self::Found(id) | Self::Created(id) | Self::Planned(id) => id,
        }
    }
}

/// Search-or-create for catalog products, keyed by (name, brand).
///
/// The brand is fixed for the resolver's lifetime, so the memo is keyed by
/// name alone. Products are never updated or deleted.
pub struct ProductResolver<'a> {
    store: &'a dyn PlanStore,
    brand: String,
    dry_run: bool,
    memo: HashMap<String, ProductId>,
}

impl<'a> ProductResolver<'a> {
    pub fn new(store: &'a dyn PlanStore, brand: impl Into<String>) -> Self {
        Self {
            store,
            brand: brand.into(),
            dry_run: false,
            memo: HashMap::new(),
        }
    }

    /// Resolve without creating anything; misses get a placeholder id.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Look the product up in the catalog. Search failures count as a miss.
    ///
    /// Only an exact, case-sensitive match on both name and brand is accepted.
    pub fn find_product(&self, name: &str, date: NaiveDate) -> Option<ProductId> {
        let hits = match self.store.search_products(date, name) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Product search for '{name}' failed, treating as not found: {e}");
                return None;
            }
        };
        let hit = hits
            .into_iter()
            .find(|p| p.name == name && p.brand == self.brand)?;
        info!("Product '{name}' found with ID {}", hit.food_id);
        Some(hit.food_id)
    }

    pub fn resolve(
        &mut self,
        record: &MealRecord,
        date: NaiveDate,
    ) -> Result<Resolution, SyncError> {
        let name = record.display_name.as_str();
        if let Some(id) = self.memo.get(name) {
            return Ok(Resolution::Cached(id.clone()));
        }

        let resolution = if let Some(id) = self.find_product(name, date) {
            Resolution::Found(id)
        } else if self.dry_run {
            info!("Dry run: would create product '{name}'");
            Resolution::Planned(ProductId::new(format!("dry-run:{name}")))
        } else {
            let payload = map_to_product_payload(record, &self.brand);
            let id = self.store.create_product(&payload).map_err(|source| {
                error!("Failed to create product '{name}': {source}");
                SyncError::ProductResolutionFailed {
                    name: name.to_string(),
                    source,
                }
            })?;
            info!("Created product '{name}' with ID {id}");
            Resolution::Created(id)
        };

        self.memo
            .insert(name.to_string(), resolution.product_id().clone());
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{FakeStore, date, meal};

    #[test]
    fn test_creates_when_missing() {
        let store = FakeStore::default();
        let mut resolver = ProductResolver::new(&store, "Viking");

        let r = resolver
            .resolve(&meal("Śniadanie", "Owsianka", Some(250.0)), date("2024-05-01"))
            .unwrap();
        assert_eq!(r, Resolution::Created(ProductId::new("P1")));

        let created = store.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "Owsianka");
        assert_eq!(created[0].brand, "Viking");
    }

    #[test]
    fn test_reuses_exact_match() {
        let store = FakeStore::default().with_product("P7", "Owsianka", "Viking");
        let mut resolver = ProductResolver::new(&store, "Viking");

        let r = resolver
            .resolve(&meal("Śniadanie", "Owsianka", None), date("2024-05-01"))
            .unwrap();
        assert_eq!(r, Resolution::Found(ProductId::new("P7")));
        assert!(store.created.borrow().is_empty());
    }

    #[test]
    fn test_ignores_other_brand_and_case_variants() {
        let store = FakeStore::default()
            .with_product("P1", "Owsianka", "Fit Box")
            .with_product("P2", "owsianka", "Viking")
            .with_product("P3", "Owsianka z jabłkiem", "Viking");
        let mut resolver = ProductResolver::new(&store, "Viking");

        let r = resolver
            .resolve(&meal("Śniadanie", "Owsianka", None), date("2024-05-01"))
            .unwrap();
        assert!(matches!(r, Resolution::Created(_)));
        assert_eq!(store.created.borrow().len(), 1);
    }

    #[test]
    fn test_search_failure_falls_through_to_create() {
        let store = FakeStore::default().with_product("P1", "Owsianka", "Viking");
        store.fail_search.set(true);
        let mut resolver = ProductResolver::new(&store, "Viking");

        let r = resolver
            .resolve(&meal("Śniadanie", "Owsianka", None), date("2024-05-01"))
            .unwrap();
        assert!(matches!(r, Resolution::Created(_)));
    }

    #[test]
    fn test_create_failure_is_reported() {
        let store = FakeStore::default();
        store.fail_create_for.borrow_mut().push("Owsianka".to_string());
        let mut resolver = ProductResolver::new(&store, "Viking");

        let err = resolver
            .resolve(&meal("Śniadanie", "Owsianka", None), date("2024-05-01"))
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::ProductResolutionFailed { ref name, .. } if name == "Owsianka"
        ));
    }

    #[test]
    fn test_memo_skips_second_search() {
        let store = FakeStore::default();
        let mut resolver = ProductResolver::new(&store, "Viking");
        let record = meal("Obiad", "Pierogi", Some(380.0));

        let first = resolver.resolve(&record, date("2024-05-01")).unwrap();
        let second = resolver.resolve(&record, date("2024-05-02")).unwrap();
        assert_eq!(first.product_id(), second.product_id());
        assert!(matches!(second, Resolution::Cached(_)));
        assert_eq!(store.searches.get(), 1);
        assert_eq!(store.created.borrow().len(), 1);
    }

    #[test]
    fn test_dry_run_never_creates() {
        let store = FakeStore::default();
        let mut resolver = ProductResolver::new(&store, "Viking").dry_run(true);

        let r = resolver
            .resolve(&meal("Obiad", "Pierogi", None), date("2024-05-01"))
            .unwrap();
        assert_eq!(r, Resolution::Planned(ProductId::new("dry-run:Pierogi")));
        assert!(store.created.borrow().is_empty());
    }
}
