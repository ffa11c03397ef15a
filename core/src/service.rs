use chrono::NaiveDate;

use crate::error::RemoteError;
use crate::models::{DayPlan, DayPlanDelta, MealRecord, Order, ProductHit, ProductId, ProductPayload};

/// Read-only view of the meal provider's order API.
///
/// The CLI implements this with reqwest; tests use in-memory fakes. Calls are
/// blocking and attempted once, so a retry policy can wrap an implementation
/// without touching the reconciliation code.
pub trait MealSource {
    fn list_order_ids(&self) -> Result<Vec<String>, RemoteError>;
    fn get_order(&self, order_id: &str) -> Result<Order, RemoteError>;
    fn get_delivery_meals(&self, delivery_id: &str) -> Result<Vec<MealRecord>, RemoteError>;
}

/// Read/write view of the diet-tracking service, scoped to one user.
pub trait PlanStore {
    fn search_products(&self, date: NaiveDate, phrase: &str)
    -> Result<Vec<ProductHit>, RemoteError>;
    fn create_product(&self, payload: &ProductPayload) -> Result<ProductId, RemoteError>;
    /// `Ok(None)` when the service has no plan for the date.
    fn get_day_plan(&self, date: NaiveDate) -> Result<Option<DayPlan>, RemoteError>;
    fn submit_day_plan(&self, delta: &DayPlanDelta) -> Result<(), RemoteError>;
}
