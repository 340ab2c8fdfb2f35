use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

/// Tool configuration, usually `<root>/hdf_scaffold.toml`.
///
/// Every key is optional; an empty file yields the stock HDF tree layout.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Root-relative prefix of the framework tree. On Linux, headers are
    /// relativized against macros under it, sources against the others.
    pub framework_prefix: String,
    /// Modules whose driver directories nest under `chipset/`
    pub chipset_modules: Vec<String>,
    /// Root-relative path of the persisted settings store
    pub settings_file: String,
    pub layout: LayoutConfig,
    /// Module name to Kconfig `depends on` namespace
    pub kconfig_namespace: BTreeMap<String, String>,
    pub boards: BTreeMap<String, BoardConfig>,
    pub linux: LinuxConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            framework_prefix: "drivers/hdf/framework".to_string(),
            chipset_modules: vec!["sensor".to_string()],
            settings_file: "hdf_scaffold_settings.toml".to_string(),
            layout: LayoutConfig::default(),
            kconfig_namespace: BTreeMap::from([("display".to_string(), "DISP".to_string())]),
            boards: BTreeMap::new(),
            linux: LinuxConfig::default(),
        }
    }
}

/// Root-relative directories of the HDF source tree.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub templates: String,
    pub adapter: String,
    pub model_root: String,
    pub vendor: String,
    pub kernel: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            templates: "tools/hdf_dev_eco_tool/resources/templates/lite".to_string(),
            adapter: "adapter/khdf".to_string(),
            model_root: "framework/model".to_string(),
            vendor: "vendor".to_string(),
            kernel: "kernel".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Root-relative directory holding the board's `device_info.hcs`
    pub parent_path: String,
    /// File names of the board's Linux defconfigs and kernel patches
    pub dot_config_files: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LinuxConfig {
    /// Enable lines are inserted after the last line containing this text
    pub config_anchor: String,
}

impl Default for LinuxConfig {
    fn default() -> Self {
        Self {
            config_anchor: "CONFIG_DRIVERS_HDF_INPUT=y".to_string(),
        }
    }
}

impl ToolConfig {
    pub fn board(&self, name: &str) -> Option<&BoardConfig> {
        self.boards.get(name)
    }

    pub fn kconfig_namespace(&self, module: &str) -> Option<&str> {
        self.kconfig_namespace.get(module).map(String::as_str)
    }

    pub fn is_chipset_module(&self, module: &str) -> bool {
        self.chipset_modules.iter().any(|m| m == module)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.framework_prefix.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField {
                field: "framework_prefix".to_string(),
            });
        }
        check_relative(&mut issues, "settings_file", &self.settings_file);

        for (field, value) in [
            ("layout.templates", &self.layout.templates),
            ("layout.adapter", &self.layout.adapter),
            ("layout.model_root", &self.layout.model_root),
            ("layout.vendor", &self.layout.vendor),
            ("layout.kernel", &self.layout.kernel),
        ] {
            check_relative(&mut issues, field, value);
        }

        for (module, namespace) in &self.kconfig_namespace {
            if namespace.is_empty()
                || !namespace
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                issues.push(ValidationIssue::InvalidValue {
                    field: format!("kconfig_namespace.{module}"),
                    message: format!("'{namespace}' is not a Kconfig identifier"),
                });
            }
        }

        for (name, board) in &self.boards {
            check_relative(&mut issues, &format!("boards.{name}.parent_path"), &board.parent_path);
            if board.dot_config_files.iter().any(|f| f.contains('/')) {
                issues.push(ValidationIssue::InvalidValue {
                    field: format!("boards.{name}.dot_config_files"),
                    message: "entries are file names, not paths".to_string(),
                });
            }
        }

        if self.linux.config_anchor.trim().is_empty() {
            issues.push(ValidationIssue::EmptyField {
                field: "linux.config_anchor".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Paths in the config must stay inside the root.
fn check_relative(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::EmptyField {
            field: field.to_string(),
        });
        return;
    }
    let escapes = Path::new(value)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        issues.push(ValidationIssue::InvalidValue {
            field: field.to_string(),
            message: format!("'{value}' must be a relative path inside the root"),
        });
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Dotted keys that failed, in the order they were checked.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(ValidationIssue::field)
    }

    /// Issues reported against one dotted key.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.field() == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyField { field: String },
    InvalidValue { field: String, message: String },
}

impl ValidationIssue {
    pub fn field(&self) -> &str {
        match self {
            ValidationIssue::EmptyField { field } | ValidationIssue::InvalidValue { field, .. } => {
                field
            }
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyField { field } => write!(f, "'{field}' must not be empty"),
            ValidationIssue::InvalidValue { field, message } => write!(f, "'{field}': {message}"),
        }
    }
}
