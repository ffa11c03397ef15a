use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::Deserialize;

use mealsync_core::slots::SlotMapping;
use mealsync_core::sync::SyncSettings;

use crate::dates::DateSelection;

pub const DEFAULT_VIKING_URL: &str = "https://panel.kuchniavikinga.pl/api";
pub const DEFAULT_FITATU_URL: &str = "https://pl-pl.fitatu.com/api";
pub const DEFAULT_FITATU_API_KEY: &str = "FITATU-MOBILE-APP";
pub const DEFAULT_BRAND: &str = "Viking";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_LIMIT: u32 = 10;

const ENV_VIKING_COOKIE: &str = "MEALSYNC_VIKING_COOKIE";
const ENV_FITATU_SECRET: &str = "MEALSYNC_FITATU_SECRET";
const ENV_FITATU_AUTHORIZATION: &str = "MEALSYNC_FITATU_AUTHORIZATION";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    brand: Option<String>,
    timeout_secs: Option<u64>,
    dates: Option<Vec<NaiveDate>>,
    date_range: Option<(NaiveDate, NaiveDate)>,
    meal_mapping: Option<BTreeMap<String, String>>,
    viking: VikingSection,
    fitatu: FitatuSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct VikingSection {
    cookie: Option<String>,
    order_id: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FitatuSection {
    api_key: Option<String>,
    api_secret: Option<String>,
    authorization: Option<String>,
    user_id: Option<String>,
    base_url: Option<String>,
    search_limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct VikingSettings {
    pub cookie: String,
    pub order_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct FitatuSettings {
    pub api_key: String,
    pub api_secret: String,
    pub authorization: String,
    pub user_id: String,
    pub base_url: String,
    pub search_limit: u32,
}

/// Everything the tool needs, read once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub brand: String,
    pub timeout: Duration,
    pub dates: DateSelection,
    pub meal_mapping: SlotMapping,
    pub viking: VikingSettings,
    pub fitatu: FitatuSettings,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "mealsync").context("Could not determine home directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(path, &text, |key| std::env::var(key).ok())
    }

    /// Build a config from TOML text. `env` supplies secret overrides.
    pub fn parse(path: PathBuf, text: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file: FileConfig = toml::from_str(text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        let dates = DateSelection::from_parts(file.dates, file.date_range)?;
        let meal_mapping = file
            .meal_mapping
            .map_or_else(SlotMapping::default, SlotMapping::from_pairs);
        if meal_mapping.is_empty() {
            bail!("`meal_mapping` must not be empty");
        }

        let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("`timeout_secs` must be greater than 0");
        }

        let viking = VikingSettings {
            cookie: env(ENV_VIKING_COOKIE)
                .or(file.viking.cookie)
                .unwrap_or_default(),
            order_id: file.viking.order_id.unwrap_or_default(),
            base_url: trim_url(file.viking.base_url.as_deref().unwrap_or(DEFAULT_VIKING_URL)),
        };
        let fitatu = FitatuSettings {
            api_key: file
                .fitatu
                .api_key
                .unwrap_or_else(|| DEFAULT_FITATU_API_KEY.to_string()),
            api_secret: env(ENV_FITATU_SECRET)
                .or(file.fitatu.api_secret)
                .unwrap_or_default(),
            authorization: env(ENV_FITATU_AUTHORIZATION)
                .or(file.fitatu.authorization)
                .unwrap_or_default(),
            user_id: file.fitatu.user_id.unwrap_or_default(),
            base_url: trim_url(file.fitatu.base_url.as_deref().unwrap_or(DEFAULT_FITATU_URL)),
            search_limit: file.fitatu.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(1),
        };

        Ok(Config {
            path,
            brand: file.brand.unwrap_or_else(|| DEFAULT_BRAND.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            dates,
            meal_mapping,
            viking,
            fitatu,
        })
    }

    /// Credentials needed to read from the meal provider.
    pub fn require_viking(&self) -> Result<()> {
        require("viking.cookie", &self.viking.cookie)
    }

    /// Everything needed for a full sync run.
    pub fn require_sync(&self) -> Result<()> {
        self.require_viking()?;
        require("viking.order_id", &self.viking.order_id)?;
        require("fitatu.api_secret", &self.fitatu.api_secret)?;
        require("fitatu.authorization", &self.fitatu.authorization)?;
        require("fitatu.user_id", &self.fitatu.user_id)
    }

    #[must_use]
    pub fn sync_settings(&self, dry_run: bool) -> SyncSettings {
        SyncSettings {
            order_id: self.viking.order_id.clone(),
            brand: self.brand.clone(),
            slots: self.meal_mapping.clone(),
            dry_run,
        }
    }
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("Missing required config value `{key}`");
    }
    Ok(())
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
