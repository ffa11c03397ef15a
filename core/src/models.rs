use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wire value written for any nutrient the provider did not report.
pub const UNKNOWN_NUTRIENT: &str = "N/A";

/// Measure key the target service uses for "one whole package".
pub const PACKAGE_MEASURE_KEY: &str = "PACKAGE";

/// Source tag stamped on every plan item this tool writes.
pub const SOURCE_TAG: &str = "API";

/// Timestamp layout the diet-plan API expects for `updatedAt`/`deletedAt`.
pub const PLAN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// --- Source side (meal provider) ---

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSummary {
    #[serde(rename = "orderId", deserialize_with = "string_or_number")]
    pub order_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "null_as_default")]
    pub deliveries: Vec<Delivery>,
}

impl Order {
    pub fn deliveries_on(&self, date: NaiveDate) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(move |d| d.date == date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delivery {
    #[serde(rename = "deliveryId", deserialize_with = "string_or_number")]
    pub delivery_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryDetails {
    #[serde(
        rename = "deliveryMenuMeal",
        default,
        deserialize_with = "null_as_default"
    )]
    pub meals: Vec<MealRecord>,
}

/// One meal slot of a single delivery, as the provider reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealRecord {
    /// Delivery time-slot label, e.g. "Obiad".
    #[serde(rename = "mealName", default, deserialize_with = "null_as_default")]
    pub slot_name: String,
    /// Menu name of the dish; becomes the product name in the catalog.
    #[serde(rename = "menuMealName", default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nutrition: Nutrition,
    /// Null when the slot was part of the menu but not fulfilled.
    #[serde(rename = "deliveryMealId", default)]
    pub delivery_meal_id: Option<Value>,
}

impl MealRecord {
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.delivery_meal_id.as_ref().is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub sugar: Option<f64>,
    pub saturated_fatty_acids: Option<f64>,
    pub dietary_fiber: Option<f64>,
    pub salt: Option<f64>,
    pub weight: Option<f64>,
}

// --- Target side (diet-tracking service) ---

/// Opaque catalog identifier. The service hands these out as either JSON
/// strings or numbers depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(Self)
    }
}

/// A search result from the product catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductHit {
    #[serde(rename = "foodId")]
    pub food_id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProduct {
    pub id: ProductId,
}

/// A nutrient amount in a product-creation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NutrientValue {
    Known(f64),
    Unknown,
}

impl From<Option<f64>> for NutrientValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

impl Serialize for NutrientValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => serializer.serialize_f64(*v),
            Self::Unknown => serializer.serialize_str(UNKNOWN_NUTRIENT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub measure_key: String,
    pub measure_unit: String,
    pub weight: String,
}

/// Body of a product-creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub name: String,
    pub brand: String,
    pub energy: NutrientValue,
    pub carbohydrate: NutrientValue,
    pub sugars: NutrientValue,
    pub fat: NutrientValue,
    pub protein: NutrientValue,
    pub saturated_fat: NutrientValue,
    pub fiber: NutrientValue,
    pub salt: NutrientValue,
    pub measures: Vec<Measure>,
}

/// A plan entry as read back from the service.
///
/// Fields this crate does not interpret are kept in `extra` so a soft-deleted
/// item is written back with everything the service sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_day_diet_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PlanItem {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// A plan entry written by this tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlanItem {
    pub plan_day_diet_item_id: String,
    pub food_type: &'static str,
    pub measure_id: u32,
    pub measure_quantity: u32,
    pub product_id: ProductId,
    pub source: &'static str,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanSlot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<PlanItem>,
}

/// The remote diet plan for one day, keyed by plan slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DayPlan {
    #[serde(rename = "dietPlan", default, deserialize_with = "null_as_default")]
    pub diet_plan: BTreeMap<String, PlanSlot>,
}

/// An entry in a submitted plan: either a fresh item or an existing one
/// carrying a deletion marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeltaItem {
    Added(NewPlanItem),
    Removed(PlanItem),
}

/// The write request for one day. Only slots with changes are present.
#[derive(Debug, Clone, PartialEq)]
pub struct DayPlanDelta {
    pub date: NaiveDate,
    pub slots: BTreeMap<String, Vec<DeltaItem>>,
}

impl DayPlanDelta {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            slots: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, slot: &str, item: DeltaItem) {
        self.slots.entry(slot.to_string()).or_default().push(item);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }

    pub fn items(&self, slot: &str) -> &[DeltaItem] {
        self.slots.get(slot).map_or(&[][..], Vec::as_slice)
    }
}

impl Serialize for DayPlanDelta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct SlotBody<'a> {
            items: &'a [DeltaItem],
        }

        #[derive(Serialize)]
        struct DayBody<'a> {
            #[serde(rename = "dietPlan")]
            diet_plan: BTreeMap<&'a str, SlotBody<'a>>,
        }

        let body = DayBody {
            diet_plan: self
                .slots
                .iter()
                .map(|(slot, items)| (slot.as_str(), SlotBody { items }))
                .collect(),
        };
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.date.format("%Y-%m-%d").to_string(), &body)?;
        map.end()
    }
}

// --- serde helpers ---

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
