//! The HDF source tree as the scaffolder sees it. Every path the tool reads
//! or writes is derived here from the root, the tool config and the driver
//! identity; nothing here touches file contents.

use crate::config::ToolConfig;
use crate::error::ToolError;
use crate::naming::DriverIdentity;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_GN: &str = "BUILD.gn";
pub const MAKEFILE: &str = "Makefile";
pub const KCONFIG: &str = "Kconfig";
pub const DEVICE_INFO_HCS: &str = "device_info.hcs";

/// Paths of the driver source and header to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFiles {
    pub dir: PathBuf,
    pub source: PathBuf,
    pub header: PathBuf,
    /// Header file name as written in `#include`
    pub include_name: String,
}

/// Source and header templates of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTemplates {
    pub dir: PathBuf,
    pub source: Option<PathBuf>,
    pub header: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    root: &'a Path,
    config: &'a ToolConfig,
}

impl<'a> Layout<'a> {
    pub fn new(root: &'a Path, config: &'a ToolConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    pub fn config(&self) -> &ToolConfig {
        self.config
    }

    pub fn template_root(&self) -> PathBuf {
        self.root.join(&self.config.layout.templates)
    }

    /// `<adapter>/<kernel>/model/<module>`, home of the module build files.
    pub fn adapter_model_dir(&self, identity: &DriverIdentity) -> PathBuf {
        self.root
            .join(&self.config.layout.adapter)
            .join(identity.kernel.as_str())
            .join("model")
            .join(&identity.module)
    }

    pub fn build_gn(&self, identity: &DriverIdentity) -> PathBuf {
        self.adapter_model_dir(identity).join(BUILD_GN)
    }

    pub fn makefile(&self, identity: &DriverIdentity) -> PathBuf {
        self.adapter_model_dir(identity).join(MAKEFILE)
    }

    pub fn kconfig(&self, identity: &DriverIdentity) -> PathBuf {
        self.adapter_model_dir(identity).join(KCONFIG)
    }

    /// `<vendor>/<vendor name>/<board>`
    pub fn board_dir(&self, identity: &DriverIdentity) -> PathBuf {
        self.root
            .join(&self.config.layout.vendor)
            .join(&identity.vendor)
            .join(&identity.board)
    }

    /// The board's `device_info.hcs`: under the configured `parent_path`, or
    /// `<board dir>/hdf_config` for boards the config does not list.
    pub fn device_info_hcs(&self, identity: &DriverIdentity) -> PathBuf {
        match self.config.board(&identity.board) {
            Some(board) => self.root.join(&board.parent_path).join(DEVICE_INFO_HCS),
            None => {
                debug!("board {} not configured, using default hcs location", identity.board);
                self.board_dir(identity).join("hdf_config").join(DEVICE_INFO_HCS)
            }
        }
    }

    /// `<kernel>/<flavor>/config` and `<kernel>/<flavor>/patches`
    pub fn kernel_config_dirs(&self, identity: &DriverIdentity) -> Vec<PathBuf> {
        let base = self
            .root
            .join(&self.config.layout.kernel)
            .join(identity.kernel.as_str());
        vec![base.join("config"), base.join("patches")]
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(&self.config.settings_file)
    }

    /// Where the driver's source and header go.
    ///
    /// `<model_root>/<module>/<driver_path>/[chipset/]<device or driver>/`
    /// holding `<device>_<driver>_driver.{c,h}`, or `<driver>_driver.{c,h}`
    /// when no device is given.
    pub fn driver_files(&self, identity: &DriverIdentity, driver_path: &str) -> DriverFiles {
        let mut dir = self
            .root
            .join(&self.config.layout.model_root)
            .join(&identity.module)
            .join(driver_path);
        if self.config.is_chipset_module(&identity.module) {
            dir.push("chipset");
        }
        let stem = if identity.has_device() {
            dir.push(&identity.device);
            format!("{}_{}_driver", identity.device, identity.driver)
        } else {
            dir.push(&identity.driver);
            format!("{}_driver", identity.driver)
        };
        DriverFiles {
            source: dir.join(format!("{stem}.c")),
            header: dir.join(format!("{stem}.h")),
            include_name: format!("{stem}.h"),
            dir,
        }
    }

    /// First template directory (by name) whose name contains `module`.
    pub fn module_templates(&self, module: &str) -> Result<ModuleTemplates, ToolError> {
        let root = self.template_root();
        let dirs = sorted_entries(&root, |p| p.is_dir())?;
        let Some(dir) = dirs
            .iter()
            .find(|dir| file_name(dir).contains(module))
            .cloned()
        else {
            let names: Vec<String> = dirs.iter().map(|d| file_name(d)).collect();
            return Err(ToolError::UnknownModule {
                module: module.to_string(),
                suggestion: closest(module, &names),
            });
        };

        let files = sorted_entries(&dir, |p| p.is_file())?;
        let pick = |needle: &str| files.iter().find(|f| file_name(f).contains(needle)).cloned();
        Ok(ModuleTemplates {
            source: pick("source"),
            header: pick("head"),
            dir,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, ToolError> {
    let entries = fs::read_dir(dir).map_err(|e| ToolError::io(dir, e))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| keep(path))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Closest candidate by normalized edit distance, if reasonably close.
fn closest(name: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::normalized_levenshtein(name, c), c))
        .filter(|(score, _)| *score >= 0.5)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.clone())
}
