//! Enable-line propagation into `.config`, defconfig and `.patch` files.
//!
//! Two lines may be propagated: an optional device enable line shared by
//! every driver of a device family (`LOSCFG_DRIVERS_HDF_SENSOR_ACCEL=y`)
//! and the driver's own enable line. Prior lines that set the device
//! symbol differently are dropped first.

use super::{commit, load_target, PatchOutcome};
use crate::error::ToolError;
use crate::naming::{DriverIdentity, Kernel};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableLines {
    pub device_enable: Option<String>,
    pub driver_enable: String,
}

impl EnableLines {
    pub fn for_driver(identity: &DriverIdentity, device_enable: Option<String>) -> Self {
        Self {
            device_enable: device_enable
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty()),
            driver_enable: format!("{}=y", identity.config_symbol()),
        }
    }

    fn wanted(&self) -> impl Iterator<Item = &str> {
        self.device_enable
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.driver_enable.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Append at end of file
    Append,
    /// Insert after the last line containing the anchor text; append when
    /// the anchor never appears
    After(String),
}

/// Config symbol set by a `.config` line, ignoring a diff `+` and the
/// `# SYMBOL is not set` form.
fn config_symbol(line: &str) -> Option<&str> {
    let line = line.trim();
    let line = line.strip_prefix('+').unwrap_or(line);
    let line = line.strip_prefix("# ").unwrap_or(line);
    let symbol = match line.split_once('=') {
        Some((symbol, _)) => symbol,
        None => line.strip_suffix(" is not set")?,
    };
    let symbol = symbol.trim();
    (!symbol.is_empty()).then_some(symbol)
}

fn body(line: &str) -> &str {
    let line = line.trim();
    line.strip_prefix('+').unwrap_or(line)
}

/// Propagate `enable` into one config or patch file.
pub fn propagate(
    path: &Path,
    enable: &EnableLines,
    placement: &Placement,
) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "config file")?;
    let original = file.contents();
    let prefix = if path.extension().is_some_and(|ext| ext == "patch") {
        "+"
    } else {
        ""
    };

    if let Some(device) = enable.device_enable.as_deref() {
        if let Some(symbol) = config_symbol(device) {
            file.retain(|line| config_symbol(line) != Some(symbol) || body(line) == device);
        }
    }

    let mut cursor = match placement {
        Placement::Append => None,
        Placement::After(anchor) => file
            .lines()
            .iter()
            .rposition(|line| line.contains(anchor.as_str()))
            .map(|i| i + 1),
    };

    for wanted in enable.wanted() {
        if file.lines().iter().any(|line| body(line) == wanted) {
            continue;
        }
        let line = format!("{prefix}{wanted}\n");
        match cursor {
            Some(at) => {
                if at >= file.len() {
                    file.ensure_trailing_newline();
                }
                file.insert(at, line);
                cursor = Some(at + 1);
            }
            None => file.append(line),
        }
    }

    let outcome = commit(&file, &original)?;
    debug!("{outcome}");
    Ok(outcome)
}

/// LiteOS board configs: every `*.config` file below the board directory.
pub fn liteos_dot_configs(board_dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(board_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".config"))
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Linux defconfigs and patches: files below `dirs` whose name is one of
/// the board's configured file names.
pub fn linux_dot_configs(dirs: &[PathBuf], names: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = dirs
        .iter()
        .flat_map(|dir| WalkDir::new(dir).into_iter().filter_map(Result::ok))
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            names.iter().any(|n| *n == name)
        })
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found.dedup();
    found
}

/// Device enable line from the first `*.toml` in a module template
/// directory, table `[<kernel>]`, keyed by device with a `default` fallback.
pub fn device_enable_line(
    module_template_dir: &Path,
    kernel: Kernel,
    device: &str,
) -> Result<Option<String>, ToolError> {
    let entries =
        fs::read_dir(module_template_dir).map_err(|e| ToolError::io(module_template_dir, e))?;
    let mut tomls: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    tomls.sort();
    let Some(path) = tomls.into_iter().next() else {
        return Ok(None);
    };

    let text = fs::read_to_string(&path).map_err(|e| ToolError::io(&path, e))?;
    let table: toml::Table = toml::from_str(&text).map_err(|e| {
        ToolError::InvalidArgument(format!("{}: {}", path.display(), e.message()))
    })?;
    let Some(section) = table.get(kernel.as_str()).and_then(toml::Value::as_table) else {
        return Ok(None);
    };
    let line = section
        .get(device)
        .or_else(|| section.get("default"))
        .and_then(toml::Value::as_str)
        .map(str::to_string);
    Ok(line)
}
