use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::collector::collect_meals;
use crate::error::SyncError;
use crate::merge::{MergeContext, MergeSkip, merge_plan};
use crate::models::{DayPlanDelta, Order};
use crate::resolver::ProductResolver;
use crate::service::{MealSource, PlanStore};
use crate::slots::SlotMapping;

/// Immutable settings for one synchronization run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub order_id: String,
    /// Brand stamped on created products; also identifies owned plan items.
    pub brand: String,
    pub slots: SlotMapping,
    /// Resolve and merge against live data, but create and submit nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DateOutcome {
    /// The delta was submitted.
    Updated,
    /// Nothing to change; no request was made.
    UpToDate,
    /// Dry run; the delta was computed but not submitted.
    Planned,
    Failed(String),
}

/// What happened to one date.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub date: NaiveDate,
    pub outcome: DateOutcome,
    pub products_created: usize,
    pub products_reused: usize,
    pub items_added: usize,
    pub items_deleted: usize,
    pub meals_skipped: usize,
    pub meals_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DayPlanDelta>,
}

impl SyncReport {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            outcome: DateOutcome::UpToDate,
            products_created: 0,
            products_reused: 0,
            items_added: 0,
            items_deleted: 0,
            meals_skipped: 0,
            meals_failed: 0,
            delta: None,
        }
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        matches!(self.outcome, DateOutcome::Failed(_))
    }
}

/// Pull-transform-push for each requested date, one date at a time.
pub struct Synchronizer<'a> {
    source: &'a dyn MealSource,
    store: &'a dyn PlanStore,
    settings: &'a SyncSettings,
    resolver: ProductResolver<'a>,
    clock: fn() -> NaiveDateTime,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        source: &'a dyn MealSource,
        store: &'a dyn PlanStore,
        settings: &'a SyncSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
            resolver: ProductResolver::new(store, settings.brand.clone())
                .dry_run(settings.dry_run),
            clock: || Local::now().naive_local(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Synchronize every date. Only an unreadable order aborts the run; each
    /// date's own failures end up in its report.
    pub fn run(&mut self, dates: &[NaiveDate]) -> Result<Vec<SyncReport>, SyncError> {
        let order = self
            .source
            .get_order(&self.settings.order_id)
            .map_err(|source| SyncError::OrderUnavailable {
                order_id: self.settings.order_id.clone(),
                source,
            })?;

        let mut reports = Vec::with_capacity(dates.len());
        for &date in dates {
            info!("Processing {date}");
            let report = self.sync_date(&order, date);
            match &report.outcome {
                DateOutcome::Updated => info!("Diet plan updated for {date}"),
                DateOutcome::UpToDate => info!("Diet plan for {date} already up to date"),
                DateOutcome::Planned => info!("Dry run: diet plan for {date} not submitted"),
                DateOutcome::Failed(reason) => error!("Failed to update diet plan for {date}: {reason}"),
            }
            reports.push(report);
        }
        Ok(reports)
    }

    /// One reconciliation pass for `date`.
    pub fn sync_date(&mut self, order: &Order, date: NaiveDate) -> SyncReport {
        let mut report = SyncReport::new(date);

        let deliveries: Vec<_> = order.deliveries_on(date).collect();
        if deliveries.is_empty() {
            info!("No meals found for {date}");
        }
        let batch = collect_meals(self.source, &mut self.resolver, date, deliveries);
        report.products_created = batch.products_created;
        report.products_reused = batch.products_reused;
        report.meals_failed = batch.failures;
        if batch.failures > 0 {
            warn!(
                "{} meal(s) for {date} could not be collected; keeping existing items",
                batch.failures
            );
        }

        let existing = match self.store.get_day_plan(date) {
            Ok(plan) => plan.unwrap_or_default(),
            Err(source) => {
                let e = SyncError::PlanUnavailable { date, source };
                report.outcome = DateOutcome::Failed(e.to_string());
                return report;
            }
        };

        let outcome = merge_plan(
            date,
            &batch.meals,
            &existing,
            MergeContext {
                slots: &self.settings.slots,
                brand: &self.settings.brand,
                now: (self.clock)(),
                prune_obsolete: batch.failures == 0,
            },
        );
        report.items_added = outcome.added;
        report.items_deleted = outcome.deleted;
        report.meals_skipped = outcome
            .skipped
            .iter()
            .filter(|s| matches!(s, MergeSkip::UnmappedSlotName { .. }))
            .count();

        let delta = outcome.delta;
        if delta.is_empty() {
            report.outcome = DateOutcome::UpToDate;
            return report;
        }
        if self.settings.dry_run {
            report.outcome = DateOutcome::Planned;
            report.delta = Some(delta);
            return report;
        }

        report.outcome = match self.store.submit_day_plan(&delta) {
            Ok(()) => DateOutcome::Updated,
            Err(source) => {
                DateOutcome::Failed(SyncError::MergeSubmissionFailed { date, source }.to_string())
            }
        };
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeltaItem, ProductId};
    use crate::service::testing::{FakeSource, FakeStore, date, meal, plan_item};

    fn settings() -> SyncSettings {
        SyncSettings {
            order_id: "order-1".to_string(),
            brand: "Viking".to_string(),
            slots: SlotMapping::default(),
            dry_run: false,
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        date("2024-05-01").and_hms_opt(6, 0, 0).unwrap()
    }

    fn run(
        source: &FakeSource,
        store: &FakeStore,
        settings: &SyncSettings,
        dates: &[&str],
    ) -> Vec<SyncReport> {
        let dates: Vec<NaiveDate> = dates.iter().map(|d| date(d)).collect();
        Synchronizer::new(source, store, settings)
            .with_clock(fixed_clock)
            .run(&dates)
            .unwrap()
    }

    fn owsianka_source() -> FakeSource {
        FakeSource::default().with_delivery(
            "d1",
            "2024-05-01",
            vec![meal("Śniadanie", "Owsianka", Some(250.0))],
        )
    }

    #[test]
    fn test_first_run_creates_and_adds() {
        let source = owsianka_source();
        let store = FakeStore::default();
        let reports = run(&source, &store, &settings(), &["2024-05-01"]);

        assert_eq!(reports[0].outcome, DateOutcome::Updated);
        assert_eq!(reports[0].products_created, 1);
        assert_eq!(reports[0].items_added, 1);

        let submitted = store.submitted.borrow();
        assert_eq!(submitted.len(), 1);
        let value = serde_json::to_value(&submitted[0]).unwrap();
        let item = &value["2024-05-01"]["dietPlan"]["breakfast"]["items"][0];
        assert_eq!(item["productId"], serde_json::json!("P1"));
        assert_eq!(item["measureQuantity"], serde_json::json!(250));
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let source = owsianka_source();
        let store = FakeStore::default();
        run(&source, &store, &settings(), &["2024-05-01"]);

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert_eq!(reports[0].outcome, DateOutcome::UpToDate);
        assert_eq!(reports[0].products_created, 0);
        assert_eq!(reports[0].products_reused, 1);
        assert_eq!(store.created.borrow().len(), 1);
        assert_eq!(store.submitted.borrow().len(), 1);
        assert_eq!(store.live_items("2024-05-01", "breakfast").len(), 1);
    }

    #[test]
    fn test_rerun_with_existing_product_and_plan() {
        let source = owsianka_source();
        let store = FakeStore::default()
            .with_product("P1", "Owsianka", "Viking")
            .with_plan_item("2024-05-01", "breakfast", plan_item("P1", "Owsianka", "Viking"));

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert_eq!(reports[0].outcome, DateOutcome::UpToDate);
        assert_eq!(reports[0].items_added, 0);
        assert!(store.created.borrow().is_empty());
        assert!(store.submitted.borrow().is_empty());
    }

    #[test]
    fn test_obsolete_dinner_is_soft_deleted() {
        let source = owsianka_source();
        let store = FakeStore::default()
            .with_product("P1", "Owsianka", "Viking")
            .with_plan_item("2024-05-01", "dinner", plan_item("P9", "Pierogi", "Viking"));

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert_eq!(reports[0].items_deleted, 1);

        let submitted = store.submitted.borrow();
        let dinner = submitted[0].items("dinner");
        assert_eq!(dinner.len(), 1);
        match &dinner[0] {
            DeltaItem::Removed(item) => {
                assert_eq!(item.product_id, Some(ProductId::new("P9")));
                assert_eq!(item.deleted_at.as_deref(), Some("2024-05-01 06:00:00"));
            }
            DeltaItem::Added(_) => panic!("expected a deletion marker"),
        }
        assert!(store.live_items("2024-05-01", "dinner").is_empty());
    }

    #[test]
    fn test_foreign_items_survive() {
        let source = owsianka_source();
        let store = FakeStore::default()
            .with_plan_item("2024-05-01", "dinner", plan_item("X1", "Zupa", "Knorr"));

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert_eq!(reports[0].items_deleted, 0);
        assert!(store.submitted.borrow()[0].items("dinner").is_empty());
        assert_eq!(store.live_items("2024-05-01", "dinner").len(), 1);
    }

    #[test]
    fn test_unmapped_slot_is_warning_only() {
        let source = FakeSource::default().with_delivery(
            "d1",
            "2024-05-01",
            vec![
                meal("Przekąska nocna", "Baton", Some(60.0)),
                meal("Obiad", "Pierogi", Some(380.0)),
            ],
        );
        let store = FakeStore::default();
        let reports = run(&source, &store, &settings(), &["2024-05-01"]);

        assert_eq!(reports[0].outcome, DateOutcome::Updated);
        assert_eq!(reports[0].meals_skipped, 1);
        assert_eq!(reports[0].items_added, 1);
        assert_eq!(store.live_items("2024-05-01", "dinner").len(), 1);
    }

    #[test]
    fn test_product_created_once_across_dates() {
        let source = FakeSource::default()
            .with_delivery("d1", "2024-05-01", vec![meal("Obiad", "Pierogi", Some(380.0))])
            .with_delivery("d2", "2024-05-02", vec![meal("Obiad", "Pierogi", Some(380.0))])
            .with_delivery("d3", "2024-05-03", vec![meal("Obiad", "Pierogi", Some(380.0))]);
        let store = FakeStore::default();
        let reports = run(
            &source,
            &store,
            &settings(),
            &["2024-05-01", "2024-05-02", "2024-05-03"],
        );

        assert!(reports.iter().all(|r| r.outcome == DateOutcome::Updated));
        assert_eq!(store.created.borrow().len(), 1);
        for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
            assert_eq!(store.live_items(day, "dinner").len(), 1);
        }
    }

    #[test]
    fn test_submission_failure_does_not_stop_other_dates() {
        let source = FakeSource::default()
            .with_delivery("d1", "2024-05-01", vec![meal("Obiad", "Pierogi", None)])
            .with_delivery("d2", "2024-05-02", vec![meal("Obiad", "Gulasz", None)]);
        let store = FakeStore::default();
        store.fail_submit.set(true);

        let reports = run(&source, &store, &settings(), &["2024-05-01", "2024-05-02"]);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(SyncReport::failed));
        assert_eq!(store.created.borrow().len(), 2);
    }

    #[test]
    fn test_unreadable_plan_fails_only_that_date() {
        let source = owsianka_source();
        let store = FakeStore::default();
        store.fail_plan_read.set(true);

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert!(reports[0].failed());
        assert!(store.submitted.borrow().is_empty());
    }

    #[test]
    fn test_unreadable_delivery_keeps_existing_items() {
        let mut source = FakeSource::default()
            .with_delivery("d1", "2024-05-01", vec![meal("Obiad", "Pierogi", Some(380.0))])
            .with_delivery("d2", "2024-05-01", vec![meal("Kolacja", "Sałatka", Some(300.0))]);
        source.broken_deliveries.push("d1".to_string());
        let store = FakeStore::default()
            .with_plan_item("2024-05-01", "dinner", plan_item("P40", "Pierogi", "Viking"));

        let reports = run(&source, &store, &settings(), &["2024-05-01"]);
        assert_eq!(reports[0].outcome, DateOutcome::Updated);
        assert_eq!(reports[0].meals_failed, 1);
        assert_eq!(reports[0].items_deleted, 0);
        assert_eq!(reports[0].items_added, 1);
        assert_eq!(store.live_items("2024-05-01", "dinner").len(), 1);
        assert_eq!(store.live_items("2024-05-01", "supper").len(), 1);
    }

    #[test]
    fn test_unreadable_order_aborts() {
        let source = FakeSource {
            order_unavailable: true,
            ..FakeSource::default()
        };
        let store = FakeStore::default();
        let settings = settings();
        let err = Synchronizer::new(&source, &store, &settings)
            .run(&[date("2024-05-01")])
            .unwrap_err();
        assert!(matches!(err, SyncError::OrderUnavailable { .. }));
    }

    #[test]
    fn test_date_without_deliveries_clears_owned_items() {
        let source = owsianka_source();
        let store = FakeStore::default()
            .with_plan_item("2024-05-02", "breakfast", plan_item("P1", "Owsianka", "Viking"));

        let reports = run(&source, &store, &settings(), &["2024-05-02"]);
        assert_eq!(reports[0].items_deleted, 1);
        assert!(store.live_items("2024-05-02", "breakfast").is_empty());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let source = owsianka_source();
        let store = FakeStore::default();
        let settings = SyncSettings {
            dry_run: true,
            ..settings()
        };

        let reports = run(&source, &store, &settings, &["2024-05-01"]);
        assert_eq!(reports[0].outcome, DateOutcome::Planned);
        assert!(reports[0].delta.is_some());
        assert!(store.created.borrow().is_empty());
        assert!(store.submitted.borrow().is_empty());
    }
}
