use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::{Delivery, MealRecord, ProductId};
use crate::resolver::{ProductResolver, Resolution};
use crate::service::MealSource;

/// Portion size used when the provider reports no weight for a meal.
pub const DEFAULT_PORTION_G: u32 = 100;

/// A delivered meal with its catalog product and reference weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMeal {
    pub product_id: ProductId,
    pub weight_g: u32,
    pub display_name: String,
}

/// Everything collected for one date, keyed by provider slot name.
#[derive(Debug, Clone, Default)]
pub struct MealBatch {
    pub meals: BTreeMap<String, ResolvedMeal>,
    pub products_created: usize,
    pub products_reused: usize,
    /// Meals or whole deliveries that could not be read or resolved.
    pub failures: usize,
}

/// Gather every delivered meal for `date` across `deliveries`.
///
/// A delivery that cannot be read, or a meal whose product cannot be
/// resolved, is logged and left out; the rest of the batch continues. When
/// two deliveries fill the same slot the later one wins.
pub fn collect_meals<'d>(
    source: &dyn MealSource,
    resolver: &mut ProductResolver<'_>,
    date: NaiveDate,
    deliveries: impl IntoIterator<Item = &'d Delivery>,
) -> MealBatch {
    let mut batch = MealBatch::default();

    for delivery in deliveries {
        let records = match source.get_delivery_meals(&delivery.delivery_id) {
            Ok(records) => records,
            Err(e) => {
                error!(
                    "Failed to retrieve delivery details for {}: {e}",
                    delivery.delivery_id
                );
                batch.failures += 1;
                continue;
            }
        };

        for record in &records {
            collect_one(resolver, date, record, &mut batch);
        }
    }

    batch
}

fn collect_one(
    resolver: &mut ProductResolver<'_>,
    date: NaiveDate,
    record: &MealRecord,
    batch: &mut MealBatch,
) {
    if !record.delivered() {
        info!("Skipping '{}' - there is no delivery", record.slot_name);
        return;
    }
    if record.display_name.is_empty() {
        info!("Skipping '{}' - no menu name", record.slot_name);
        return;
    }

    let resolution = match resolver.resolve(record, date) {
        Ok(r) => r,
        Err(e) => {
            warn!("Dropping '{}' from {date}: {e}", record.display_name);
            batch.failures += 1;
            return;
        }
    };
    match resolution {
        Resolution::Created(_) | Resolution::Planned(_) => batch.products_created += 1,
        Resolution::Found(_) | Resolution::Cached(_) => batch.products_reused += 1,
    }

    let meal = ResolvedMeal {
        product_id: resolution.into_product_id(),
        weight_g: portion_grams(record.nutrition.weight),
        display_name: record.display_name.clone(),
    };
    if let Some(previous) = batch.meals.insert(record.slot_name.clone(), meal) {
        warn!(
            "Slot '{}' on {date} filled by more than one delivery; '{}' replaces '{}'",
            record.slot_name, record.display_name, previous.display_name
        );
    }
}

#[allow(clippy::cast_sign_loss)]
fn portion_grams(weight: Option<f64>) -> u32 {
    match weight {
        Some(w) if w.is_finite() && w > 0.0 => w.round() as u32,
        _ => DEFAULT_PORTION_G,
    }
}
