use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagwall_core::WallConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    pub wall: Option<Wall>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Storage {
    /// SQLite file; `~` is expanded. Defaults to the data dir.
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Wall {
    /// Site origin for relative details links, e.g. "https://example.org"
    pub origin: Option<String>,
    pub target_visible: Option<usize>,
    pub max_fill_pages: Option<u32>,
    pub max_merged_items: Option<usize>,
    pub fetch_concurrency: Option<usize>,
    /// Metadata cache TTL in days (default: 7)
    pub cache_ttl_days: Option<u32>,
    pub cache_max_entries: Option<usize>,
}

impl Settings {
    pub fn wall_config(&self) -> WallConfig {
        let mut cfg = WallConfig::default();
        let Some(w) = &self.wall else {
            return cfg;
        };
        if let Some(o) = &w.origin {
            cfg.origin = o.trim().to_string();
        }
        if let Some(v) = w.target_visible {
            cfg.target_visible = v;
        }
        if let Some(v) = w.max_fill_pages {
            cfg.max_fill_pages = v;
        }
        if let Some(v) = w.max_merged_items {
            cfg.max_merged_items = v;
        }
        if let Some(v) = w.fetch_concurrency {
            cfg.fetch_concurrency = v.max(1);
        }
        if let Some(d) = w.cache_ttl_days {
            cfg.cache_ttl_secs = i64::from(d) * 24 * 60 * 60;
        }
        cfg.cache_max_entries = w.cache_max_entries;
        cfg
    }

    pub fn db_path(&self) -> PathBuf {
        match &self.storage.db_path {
            Some(p) if !p.trim().is_empty() => PathBuf::from(shellexpand::tilde(p).to_string()),
            _ => data_dir().join("tagwall.db"),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("tagwall")
    } else {
        PathBuf::from("./.config/tagwall")
    }
}

pub fn data_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.data_dir().join("tagwall")
    } else {
        config_dir().join("data")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

/// Missing or unparsable settings fall back to defaults.
pub fn load_settings(path: &Path) -> Settings {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    match toml::from_str(&s) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable settings");
            Settings::default()
        }
    }
}
