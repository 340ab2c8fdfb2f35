//! Persisted per-module settings.
//!
//! ```toml
//! [modules.sensor]
//! file_dir = ["accel", "gyro"]
//! driver_path = "driver"
//!
//! [drivers.liteos.sensor]
//! bmi160 = "framework/model/sensor/driver/chipset/accel/accel_bmi160_driver.c"
//! ```
//!
//! Edited in place with `toml_edit` so hand-written comments and ordering
//! survive the read-modify-write. Entries are only ever added.

use crate::edit::{atomic_write, EditError};
use crate::naming::Kernel;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml_edit::{value, Array, DocumentMut, Item, Table};

pub const DEFAULT_DRIVER_PATH: &str = "driver";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings {} is not valid TOML: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("settings {}: '{key}' has an unexpected type", .path.display())]
    Shape { path: PathBuf, key: String },

    #[error(transparent)]
    Write(#[from] EditError),
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    doc: DocumentMut,
    dirty: bool,
}

impl SettingsStore {
    /// Open the store; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        let doc = text
            .parse::<DocumentMut>()
            .map_err(|err| SettingsError::Parse {
                path: path.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            path,
            doc,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn module(&self, module: &str) -> Option<&Item> {
        self.doc.get("modules").and_then(|m| m.get(module))
    }

    /// Device subdirectories already scaffolded for `module`.
    pub fn device_dirs(&self, module: &str) -> Vec<String> {
        self.module(module)
            .and_then(|m| m.get("file_dir"))
            .and_then(Item::as_array)
            .map(|dirs| dirs.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Add `device` to the module's list. Returns whether anything changed.
    pub fn record_device_dir(&mut self, module: &str, device: &str) -> Result<bool, SettingsError> {
        if device.is_empty() || self.device_dirs(module).iter().any(|d| d == device) {
            return Ok(false);
        }
        let path = self.path.clone();
        let table = self.table_mut(&["modules", module])?;
        let dirs = table
            .entry("file_dir")
            .or_insert(value(Array::new()))
            .as_array_mut()
            .ok_or_else(|| SettingsError::Shape {
                path,
                key: format!("modules.{module}.file_dir"),
            })?;
        dirs.push(device);
        self.dirty = true;
        Ok(true)
    }

    /// Root-relative subdirectory under the module holding driver sources.
    pub fn driver_path(&self, module: &str) -> String {
        self.module(module)
            .and_then(|m| m.get("driver_path"))
            .and_then(Item::as_str)
            .unwrap_or(DEFAULT_DRIVER_PATH)
            .to_string()
    }

    pub fn record_driver(
        &mut self,
        kernel: Kernel,
        module: &str,
        driver: &str,
        source: &str,
    ) -> Result<(), SettingsError> {
        let current = self.drivers(kernel, module);
        if current.iter().any(|(d, s)| d == driver && s == source) {
            return Ok(());
        }
        let table = self.table_mut(&["drivers", kernel.as_str(), module])?;
        table[driver] = value(source);
        self.dirty = true;
        Ok(())
    }

    /// Recorded `(driver, source)` pairs for one kernel and module.
    pub fn drivers(&self, kernel: Kernel, module: &str) -> Vec<(String, String)> {
        self.doc
            .get("drivers")
            .and_then(|d| d.get(kernel.as_str()))
            .and_then(|k| k.get(module))
            .and_then(Item::as_table)
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(k, v)| Some((k.to_string(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn save(&mut self) -> Result<(), SettingsError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        atomic_write(&self.path, self.doc.to_string().as_bytes())?;
        self.dirty = false;
        Ok(())
    }

    fn table_mut(&mut self, keys: &[&str]) -> Result<&mut Table, SettingsError> {
        let path = &self.path;
        let mut table = self.doc.as_table_mut();
        for (depth, key) in keys.iter().enumerate() {
            let item = table.entry(key).or_insert_with(|| {
                let mut t = Table::new();
                t.set_implicit(true);
                Item::Table(t)
            });
            table = item.as_table_mut().ok_or_else(|| SettingsError::Shape {
                path: path.clone(),
                key: keys[..=depth].join("."),
            })?;
        }
        Ok(table)
    }
}
