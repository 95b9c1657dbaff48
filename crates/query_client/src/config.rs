use std::fs;

use serde::Deserialize;

use shared::domain::PagingMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Page size bound handed to the driver per fetch.
    pub max_item_count: u32,
    pub default_query_text: String,
    pub populate_query_metrics: bool,
    pub paging_mode: PagingMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_item_count: 1000,
            default_query_text: "select * from c".into(),
            populate_query_metrics: false,
            paging_mode: PagingMode::Infinite,
        }
    }
}

/// Layers `query_client.toml` and then environment overrides on top of the
/// defaults.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("query_client.toml") {
        if let Ok(file_cfg) = toml::from_str::<Settings>(&raw) {
            settings = file_cfg;
        }
    }

    if let Ok(v) = std::env::var("QUERY_MAX_ITEM_COUNT") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.max_item_count = parsed;
        }
    }

    if let Ok(v) = std::env::var("QUERY_DEFAULT_TEXT") {
        settings.default_query_text = v;
    }

    if let Ok(v) = std::env::var("QUERY_POPULATE_METRICS") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.populate_query_metrics = parsed;
        }
    }

    if let Ok(v) = std::env::var("QUERY_PAGING_MODE") {
        match v.as_str() {
            "infinite" => settings.paging_mode = PagingMode::Infinite,
            "oneShot" | "one-shot" => settings.paging_mode = PagingMode::OneShot,
            _ => {}
        }
    }

    settings
}
