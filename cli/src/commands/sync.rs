use std::process;

use anyhow::Result;
use tracing::{error, info};

use mealsync_core::sync::{SyncReport, Synchronizer};

use super::helpers::report_line;
use crate::config::Config;
use crate::dates::DateSelection;
use crate::fitatu::FitatuClient;
use crate::viking::VikingClient;

pub(crate) fn cmd_sync(
    config: &Config,
    rt: &tokio::runtime::Handle,
    selection: DateSelection,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    config.require_sync()?;

    // Command-line dates replace the file's selection wholesale.
    let selection = if selection.is_set() {
        selection
    } else {
        config.dates.clone()
    };
    let dates = selection.expand();
    match &selection {
        DateSelection::Unset => {
            error!("No valid dates provided. Skipping...");
            return Ok(());
        }
        DateSelection::Dates(_) => info!("Selected dates: {dates:?}"),
        DateSelection::Range { start, end } => info!("Selected date range: {start} to {end}"),
    }

    let source = VikingClient::new(&config.viking, config.timeout, rt.clone())?;
    let store = FitatuClient::new(&config.fitatu, config.timeout, rt.clone())?;
    let settings = config.sync_settings(dry_run);

    let reports = Synchronizer::new(&source, &store, &settings).run(&dates)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report_line(report));
            if let Some(delta) = &report.delta {
                println!("{}", serde_json::to_string_pretty(delta)?);
            }
        }
    }

    if reports.iter().any(SyncReport::failed) {
        process::exit(2);
    }
    Ok(())
}
