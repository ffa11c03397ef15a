use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use mealsync_core::error::RemoteError;
use mealsync_core::models::{
    CreatedProduct, DayPlan, DayPlanDelta, ProductHit, ProductId, ProductPayload,
};
use mealsync_core::service::PlanStore;

use crate::config::FitatuSettings;
use crate::http;

/// Client for the diet-tracking service, scoped to one user.
#[derive(Debug)]
pub struct FitatuClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    search_limit: u32,
    rt: tokio::runtime::Handle,
}

/// Decode search results one by one, dropping entries without a usable id.
fn product_hits(raw: Vec<Value>) -> Vec<ProductHit> {
    raw.into_iter()
        .filter_map(|hit| match serde_json::from_value::<ProductHit>(hit) {
            Ok(hit) => Some(hit),
            Err(e) => {
                debug!("Ignoring malformed search hit: {e}");
                None
            }
        })
        .collect()
}

impl FitatuClient {
    pub fn new(
        settings: &FitatuSettings,
        timeout: Duration,
        rt: tokio::runtime::Handle,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("api-key"),
            header_value(&settings.api_key, "fitatu.api_key", false)?,
        );
        headers.insert(
            HeaderName::from_static("api-secret"),
            header_value(&settings.api_secret, "fitatu.api_secret", true)?,
        );
        headers.insert(
            AUTHORIZATION,
            header_value(&settings.authorization, "fitatu.authorization", true)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client: http::build_client(headers, timeout)?,
            base_url: settings.base_url.clone(),
            user_id: settings.user_id.clone(),
            search_limit: settings.search_limit,
            rt,
        })
    }

    pub async fn search_products_async(
        &self,
        date: NaiveDate,
        phrase: &str,
    ) -> Result<Vec<ProductHit>, RemoteError> {
        let url = format!("{}/search/food/user/{}", self.base_url, self.user_id);
        let date = date.format("%Y-%m-%d").to_string();
        let limit = self.search_limit.to_string();
        let request = self.client.get(&url).query(&[
            ("date", date.as_str()),
            ("phrase", phrase),
            ("page", "1"),
            ("limit", limit.as_str()),
        ]);
        let body = http::send(request, &url).await?;
        let hits: Option<Vec<Value>> = http::decode(&url, body)?;
        Ok(product_hits(hits.unwrap_or_default()))
    }

    pub async fn create_product_async(
        &self,
        payload: &ProductPayload,
    ) -> Result<ProductId, RemoteError> {
        let url = format!("{}/products", self.base_url);
        let body = http::send(self.client.post(&url).json(payload), &url).await?;
        let created: CreatedProduct = http::decode(&url, body)?;
        Ok(created.id)
    }

    pub async fn get_day_plan_async(&self, date: NaiveDate) -> Result<Option<DayPlan>, RemoteError> {
        let url = format!(
            "{}/diet-and-activity-plan/{}/day/{}",
            self.base_url,
            self.user_id,
            date.format("%Y-%m-%d")
        );
        match http::send(self.client.get(&url), &url).await {
            Ok(Value::Null) => Ok(None),
            Ok(body) => http::decode(&url, body).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn submit_day_plan_async(&self, delta: &DayPlanDelta) -> Result<(), RemoteError> {
        let url = format!("{}/diet-plan/{}/days", self.base_url, self.user_id);
        let body = http::send(self.client.post(&url).json(delta), &url).await?;
        debug!("Diet plan response: {body}");
        Ok(())
    }
}

fn header_value(value: &str, key: &str, sensitive: bool) -> Result<HeaderValue> {
    let mut header =
        HeaderValue::from_str(value).with_context(|| format!("Invalid characters in {key}"))?;
    header.set_sensitive(sensitive);
    Ok(header)
}

impl PlanStore for FitatuClient {
    fn search_products(
        &self,
        date: NaiveDate,
        phrase: &str,
    ) -> Result<Vec<ProductHit>, RemoteError> {
        self.rt.block_on(self.search_products_async(date, phrase))
    }

    fn create_product(&self, payload: &ProductPayload) -> Result<ProductId, RemoteError> {
        self.rt.block_on(self.create_product_async(payload))
    }

    fn get_day_plan(&self, date: NaiveDate) -> Result<Option<DayPlan>, RemoteError> {
        self.rt.block_on(self.get_day_plan_async(date))
    }

    fn submit_day_plan(&self, delta: &DayPlanDelta) -> Result<(), RemoteError> {
        self.rt.block_on(self.submit_day_plan_async(delta))
    }
}
