use std::process;

use anyhow::Result;

use mealsync_core::service::MealSource;

use super::helpers::json_error;
use crate::config::Config;
use crate::viking::VikingClient;

pub(crate) fn cmd_orders(config: &Config, rt: &tokio::runtime::Handle, json: bool) -> Result<()> {
    config.require_viking()?;
    let client = VikingClient::new(&config.viking, config.timeout, rt.clone())?;

    let ids = match client.list_order_ids() {
        Ok(ids) => ids,
        Err(e) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("Failed to list orders: {e}");
            }
            process::exit(2);
        }
    };

    if json {
        println!("{}", serde_json::json!({ "orders": ids }));
    } else if ids.is_empty() {
        println!("No orders found.");
    } else {
        for id in &ids {
            let marker = if *id == config.viking.order_id { "*" } else { " " };
            println!("{marker} {id}");
        }
    }
    Ok(())
}
