use crate::models::{
    Measure, MealRecord, NutrientValue, PACKAGE_MEASURE_KEY, ProductPayload, UNKNOWN_NUTRIENT,
};

/// Build the product-creation request for a delivered meal.
///
/// Nutrients the provider left out become [`NutrientValue::Unknown`]. The
/// package weight is carried as the single "whole package" measure in grams.
#[must_use]
pub fn map_to_product_payload(record: &MealRecord, brand: &str) -> ProductPayload {
    let n = &record.nutrition;
    ProductPayload {
        name: record.display_name.clone(),
        brand: brand.to_string(),
        energy: n.calories.into(),
        carbohydrate: n.carbohydrate.into(),
        sugars: n.sugar.into(),
        fat: n.fat.into(),
        protein: n.protein.into(),
        saturated_fat: n.saturated_fatty_acids.into(),
        fiber: n.dietary_fiber.into(),
        salt: n.salt.into(),
        measures: vec![Measure {
            measure_key: PACKAGE_MEASURE_KEY.to_string(),
            measure_unit: "g".to_string(),
            weight: format_weight(n.weight),
        }],
    }
}

fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(w) if w.fract() == 0.0 => format!("{w:.0}"),
        Some(w) => w.to_string(),
        None => UNKNOWN_NUTRIENT.to_string(),
    }
}
