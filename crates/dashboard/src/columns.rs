use crate::error::DashboardError;
use core_types::{ColumnSetting, StockField};
use std::fs;
use std::path::{Path, PathBuf};

/// All base columns, visible, in table order.
pub fn default_columns() -> Vec<ColumnSetting> {
    StockField::ALL
        .iter()
        .map(|field| ColumnSetting {
            key: field.key().to_string(),
            label: field.default_label().to_string(),
            visible: true,
        })
        .collect()
}

/// The base fields to render, in settings order. Keys that no longer name a
/// field are skipped.
pub fn visible_fields(settings: &[ColumnSetting]) -> Vec<StockField> {
    settings
        .iter()
        .filter(|s| s.visible)
        .filter_map(|s| s.key.parse().ok())
        .collect()
}

/// Column visibility persisted as a JSON array of `{key, label, visible}`.
#[derive(Debug, Clone)]
pub struct ColumnSettingsStore {
    path: PathBuf,
}

impl ColumnSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved settings, or the defaults when nothing usable is on disk.
    pub fn load(&self) -> Vec<ColumnSetting> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return default_columns(),
        };
        match serde_json::from_str::<Vec<ColumnSetting>>(&text) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load column configuration; using defaults."
                );
                default_columns()
            }
        }
    }

    pub fn save(&self, settings: &[ColumnSetting]) -> Result<(), DashboardError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    /// Flips one column and saves immediately.
    pub fn toggle(&self, key: &str) -> Result<Vec<ColumnSetting>, DashboardError> {
        let mut settings = self.load();
        let setting = settings
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| DashboardError::UnknownColumn(key.to_string()))?;
        setting.visible = !setting.visible;
        self.save(&settings)?;
        Ok(settings)
    }

    /// Makes every column visible again and saves immediately.
    pub fn reset(&self) -> Result<Vec<ColumnSetting>, DashboardError> {
        let mut settings = self.load();
        for setting in &mut settings {
            setting.visible = true;
        }
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn visible_keys(&self) -> Vec<String> {
        self.load()
            .into_iter()
            .filter(|s| s.visible)
            .map(|s| s.key)
            .collect()
    }
}
