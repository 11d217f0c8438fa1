use std::fs;

use anyhow::{anyhow, Context};
use crm_integration::CrmConfig;
use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "crm-proxy.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub crm_base_url: Option<String>,
    pub crm_api_key: Option<String>,
    pub page_limit: u32,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            crm_base_url: None,
            crm_api_key: None,
            page_limit: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Keys accepted in `crm-proxy.toml`.
#[derive(Debug, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    crm_base_url: Option<String>,
    page_limit: Option<u32>,
}

impl Settings {
    pub fn crm_config(&self) -> anyhow::Result<CrmConfig> {
        let base_url = self
            .crm_base_url
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("TWENTY_API_BASE_URL is not configured"))?;
        let api_key = self
            .crm_api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("TWENTY_API_KEY is not configured"))?;
        CrmConfig::new(base_url, api_key.trim()).context("invalid CRM configuration")
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(CONFIG_FILE).ok();
    load_settings_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Layers the optional config file and then the environment over the defaults.
pub fn load_settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.server_bind = v;
                }
                if let Some(v) = file_cfg.crm_base_url {
                    settings.crm_base_url = Some(v);
                }
                if let Some(v) = file_cfg.page_limit {
                    settings.page_limit = v;
                }
            }
            Err(err) => warn!(file = CONFIG_FILE, %err, "ignoring unreadable config file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("TWENTY_API_BASE_URL") {
        settings.crm_base_url = Some(v);
    }
    if let Some(v) = env("APP__CRM_BASE_URL") {
        settings.crm_base_url = Some(v);
    }

    if let Some(v) = env("TWENTY_API_KEY") {
        settings.crm_api_key = Some(v);
    }
    if let Some(v) = env("APP__CRM_API_KEY") {
        settings.crm_api_key = Some(v);
    }

    if let Some(v) = env("APP__PAGE_LIMIT") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_limit = parsed;
        }
    }
    if let Some(v) = env("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }

    settings.page_limit = settings.page_limit.clamp(1, 100);
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
