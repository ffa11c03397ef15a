use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collector::ResolvedMeal;
use crate::models::{
    DayPlan, DayPlanDelta, DeltaItem, NewPlanItem, PLAN_TIMESTAMP_FORMAT, ProductId, SOURCE_TAG,
};
use crate::slots::SlotMapping;

/// Why a resolved meal did not produce a new plan item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSkip {
    UnmappedSlotName { slot: String },
    AlreadyPresent { slot: String, product_id: ProductId },
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub delta: DayPlanDelta,
    pub added: usize,
    pub deleted: usize,
    pub skipped: Vec<MergeSkip>,
}

/// Fixed inputs of a merge pass.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub slots: &'a SlotMapping,
    /// Plan items carrying this brand were written by this tool.
    pub brand: &'a str,
    pub now: NaiveDateTime,
    /// Delete owned items whose product is no longer delivered. Off when the
    /// resolved meals are known to be incomplete.
    pub prune_obsolete: bool,
}

/// Diff the resolved meals for `date` against the remote plan.
///
/// Only items owned by this tool are considered. Owned items whose product
/// is no longer delivered (when `prune_obsolete` is set), and owned
/// duplicates within a slot, come back in the delta with a deletion
/// timestamp. Resolved meals are appended unless
/// their slot already holds a live item for the same product. Slots without
/// changes are left out of the delta.
#[must_use]
pub fn merge_plan(
    date: NaiveDate,
    resolved: &BTreeMap<String, ResolvedMeal>,
    existing: &DayPlan,
    ctx: MergeContext<'_>,
) -> MergeOutcome {
    let stamp = ctx.now.format(PLAN_TIMESTAMP_FORMAT).to_string();
    let wanted: HashSet<&ProductId> = resolved.values().map(|m| &m.product_id).collect();

    let mut delta = DayPlanDelta::new(date);
    let mut deleted = 0;
    let mut live: HashMap<&str, HashSet<ProductId>> = HashMap::new();

    for (slot, plan_slot) in &existing.diet_plan {
        let kept = live.entry(slot.as_str()).or_default();
        for item in &plan_slot.items {
            if item.is_deleted() || item.brand.as_deref() != Some(ctx.brand) {
                continue;
            }
            let Some(product_id) = &item.product_id else {
                continue;
            };

            let obsolete = ctx.prune_obsolete && !wanted.contains(product_id);
            if !obsolete && kept.insert(product_id.clone()) {
                continue;
            }

            let mut removed = item.clone();
            removed.deleted_at = Some(stamp.clone());
            if obsolete {
                info!("Marking '{}' as deleted", item.label());
            } else {
                info!("Marking duplicate '{}' in {slot} as deleted", item.label());
            }
            delta.push(slot, DeltaItem::Removed(removed));
            deleted += 1;
        }
    }

    let mut added = 0;
    let mut skipped = Vec::new();

    for (source_slot, meal) in resolved {
        let Some(slot) = ctx.slots.plan_slot(source_slot) else {
            warn!("Skipping '{source_slot}' - not supported meal by mapping configuration");
            skipped.push(MergeSkip::UnmappedSlotName {
                slot: source_slot.clone(),
            });
            continue;
        };

        let kept = live.entry(slot).or_default();
        if !kept.insert(meal.product_id.clone()) {
            info!("Skipping '{source_slot}' - already exists in diet plan");
            skipped.push(MergeSkip::AlreadyPresent {
                slot: slot.to_string(),
                product_id: meal.product_id.clone(),
            });
            continue;
        }

        delta.push(
            slot,
            DeltaItem::Added(NewPlanItem {
                plan_day_diet_item_id: Uuid::new_v4().to_string(),
                food_type: "PRODUCT",
                measure_id: 1,
                measure_quantity: meal.weight_g,
                product_id: meal.product_id.clone(),
                source: SOURCE_TAG,
                updated_at: stamp.clone(),
            }),
        );
        info!(
            "Added '{}' with product ID {} to {slot}",
            meal.display_name, meal.product_id
        );
        added += 1;
    }

    MergeOutcome {
        delta,
        added,
        deleted,
        skipped,
    }
}
