use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use mealsync_core::error::RemoteError;
use mealsync_core::models::{DeliveryDetails, MealRecord, Order, OrderSummary};
use mealsync_core::service::MealSource;

use crate::config::VikingSettings;
use crate::http;

/// Client for the meal provider's customer panel API.
#[derive(Debug)]
pub struct VikingClient {
    client: reqwest::Client,
    base_url: String,
    rt: tokio::runtime::Handle,
}

impl VikingClient {
    pub fn new(
        settings: &VikingSettings,
        timeout: Duration,
        rt: tokio::runtime::Handle,
    ) -> Result<Self> {
        let mut cookie =
            HeaderValue::from_str(&settings.cookie).context("Invalid characters in viking.cookie")?;
        cookie.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        Ok(Self {
            client: http::build_client(headers, timeout)?,
            base_url: settings.base_url.clone(),
            rt,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = format!("{}{path}", self.base_url);
        let body = http::send(self.client.get(&url), &url).await?;
        http::decode(&url, body)
    }

    pub async fn list_order_ids_async(&self) -> Result<Vec<String>, RemoteError> {
        let orders: Option<Vec<OrderSummary>> =
            self.get_json("/company/customer/order/all").await?;
        Ok(orders
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.order_id)
            .collect())
    }

    pub async fn get_order_async(&self, order_id: &str) -> Result<Order, RemoteError> {
        let order: Option<Order> = self
            .get_json(&format!("/company/customer/order/{order_id}"))
            .await?;
        Ok(order.unwrap_or_default())
    }

    pub async fn get_delivery_meals_async(
        &self,
        delivery_id: &str,
    ) -> Result<Vec<MealRecord>, RemoteError> {
        let details: Option<DeliveryDetails> = self
            .get_json(&format!("/company/general/menus/delivery/{delivery_id}/new"))
            .await?;
        Ok(details.unwrap_or_default().meals)
    }
}

impl MealSource for VikingClient {
    fn list_order_ids(&self) -> Result<Vec<String>, RemoteError> {
        self.rt.block_on(self.list_order_ids_async())
    }

    fn get_order(&self, order_id: &str) -> Result<Order, RemoteError> {
        self.rt.block_on(self.get_order_async(order_id))
    }

    fn get_delivery_meals(&self, delivery_id: &str) -> Result<Vec<MealRecord>, RemoteError> {
        self.rt.block_on(self.get_delivery_meals_async(delivery_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VIKING_URL;

    fn settings() -> VikingSettings {
        VikingSettings {
            cookie: std::env::var("MEALSYNC_VIKING_COOKIE").unwrap_or_else(|_| "x".to_string()),
            order_id: std::env::var("MEALSYNC_VIKING_ORDER_ID").unwrap_or_default(),
            base_url: DEFAULT_VIKING_URL.to_string(),
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_rejects_cookie_with_newline() {
        let rt = runtime();
        let mut s = settings();
        s.cookie = "a\nb".to_string();
        assert!(VikingClient::new(&s, Duration::from_secs(5), rt.handle().clone()).is_err());
    }

    // --- Integration tests (hit the real provider API, need a session cookie) ---

    #[test]
    #[ignore = "hits the meal provider API"]
    fn test_list_orders() {
        let rt = runtime();
        let client = VikingClient::new(&settings(), Duration::from_secs(30), rt.handle().clone())
            .unwrap();
        let ids = client.list_order_ids().unwrap();
        assert!(!ids.is_empty());
    }

    #[test]
    #[ignore = "hits the meal provider API"]
    fn test_order_has_deliveries() {
        let rt = runtime();
        let s = settings();
        let client = VikingClient::new(&s, Duration::from_secs(30), rt.handle().clone()).unwrap();
        let order = client.get_order(&s.order_id).unwrap();
        let first = order.deliveries.first().expect("order should have deliveries");
        let meals = client.get_delivery_meals(&first.delivery_id).unwrap();
        assert!(meals.iter().all(|m| !m.slot_name.is_empty()));
    }
}
