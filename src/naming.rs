//! Driver identity and the placeholder vocabulary derived from it.

use crate::error::ToolError;
use crate::template::Vars;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target kernel variant. Each flavor has its own build-file formats and
/// directory conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    Liteos,
    Linux,
}

impl Kernel {
    pub fn as_str(self) -> &'static str {
        match self {
            Kernel::Liteos => "liteos",
            Kernel::Linux => "linux",
        }
    }

    /// Prefix of kernel-config symbols in build files and `.config` lines.
    pub fn config_prefix(self) -> &'static str {
        match self {
            Kernel::Liteos => "LOSCFG_",
            Kernel::Linux => "CONFIG_",
        }
    }

    /// Linux is the default flavor: only it separates framework-internal
    /// macros from vendor-adapter macros when relativizing paths.
    pub fn separates_framework_tree(self) -> bool {
        matches!(self, Kernel::Linux)
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits an identifier into words and re-joins them in the various cases
/// used by templates. Word boundaries are `_`, `-`, whitespace and
/// lower-to-upper transitions (`fooBar`).
#[derive(Debug, Clone)]
pub struct WordsConverter {
    words: Vec<String>,
}

impl WordsConverter {
    pub fn new(name: &str) -> Self {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut prev_lower = false;

        for ch in name.chars() {
            if ch == '_' || ch == '-' || ch.is_whitespace() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                prev_lower = false;
                continue;
            }
            if ch.is_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.extend(ch.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }

        Self { words }
    }

    pub fn lower_case(&self) -> String {
        self.words.join("_")
    }

    pub fn upper_case(&self) -> String {
        self.words.join("_").to_uppercase()
    }

    pub fn upper_camel_case(&self) -> String {
        self.words.iter().map(|w| capitalize(w)).collect()
    }

    pub fn lower_camel_case(&self) -> String {
        let mut words = self.words.iter();
        let mut out = words.next().cloned().unwrap_or_default();
        for word in words {
            out.push_str(&capitalize(word));
        }
        out
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The driver being added: module family, driver, kernel flavor and
/// placement on a vendor board. The driver name doubles as the
/// idempotence key for every patched file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverIdentity {
    pub module: String,
    pub driver: String,
    pub kernel: Kernel,
    pub vendor: String,
    pub board: String,
    /// Optional device (chip) directory; empty when the driver has none.
    pub device: String,
}

impl DriverIdentity {
    pub fn new(
        module: impl Into<String>,
        driver: impl Into<String>,
        kernel: Kernel,
        vendor: impl Into<String>,
        board: impl Into<String>,
        device: impl Into<String>,
    ) -> Result<Self, ToolError> {
        let mut identity = Self {
            module: module.into().trim().to_string(),
            driver: driver.into().trim().to_string(),
            kernel,
            vendor: vendor.into().trim().to_string(),
            board: board.into().trim().to_string(),
            device: device.into().trim().to_string(),
        };
        identity.validate()?;
        identity.module = canonical_name("module", &identity.module)?;
        identity.driver = canonical_name("driver", &identity.driver)?;
        if identity.has_device() {
            identity.device = canonical_name("device", &identity.device)?;
        }
        Ok(identity)
    }

    fn validate(&self) -> Result<(), ToolError> {
        for (field, value) in [
            ("module", &self.module),
            ("driver", &self.driver),
            ("vendor", &self.vendor),
            ("board", &self.board),
        ] {
            if value.is_empty() {
                return Err(ToolError::InvalidArgument(format!("{field} name is empty")));
            }
        }
        for (field, value) in [
            ("module", &self.module),
            ("driver", &self.driver),
            ("device", &self.device),
        ] {
            if !is_identifier(value) && !value.is_empty() {
                return Err(ToolError::InvalidArgument(format!(
                    "{field} name '{value}' must contain only letters, digits and '_'"
                )));
            }
        }
        Ok(())
    }

    pub fn has_device(&self) -> bool {
        !self.device.is_empty()
    }

    /// `<MODULE>_<DRIVER>`, the tail of every config symbol for this driver.
    pub fn symbol_suffix(&self) -> String {
        format!(
            "{}_{}",
            self.module.to_uppercase(),
            self.driver.to_uppercase()
        )
    }

    /// e.g. `LOSCFG_DRIVERS_HDF_SENSOR_BMI160`
    pub fn config_symbol(&self) -> String {
        format!(
            "{}DRIVERS_HDF_{}",
            self.kernel.config_prefix(),
            self.symbol_suffix()
        )
    }

    /// Placeholder values shared by every template: case variants of the
    /// driver and device names plus the module/driver upper and lower forms.
    pub fn template_vars(&self) -> Vars {
        let driver = WordsConverter::new(&self.driver);
        let device = WordsConverter::new(&self.device);
        let mut vars = Vars::new();
        vars.set("driver_lower_case", driver.lower_case());
        vars.set("driver_upper_camel_case", driver.upper_camel_case());
        vars.set("driver_lower_camel_case", driver.lower_camel_case());
        vars.set("driver_upper_case", driver.upper_case());
        vars.set("device_lower_case", device.lower_case());
        vars.set("device_upper_camel_case", device.upper_camel_case());
        vars.set("device_lower_camel_case", device.lower_camel_case());
        vars.set("device_upper_case", device.upper_case());
        vars.set("model_name_upper", self.module.to_uppercase());
        vars.set("model_name_lower", self.module.to_lowercase());
        vars.set("driver_name_upper", self.driver.to_uppercase());
        vars.set("driver_name_lower", self.driver.to_lowercase());
        vars.set("model_name", self.module.clone());
        vars.set("driver_name", self.driver.clone());
        vars
    }
}

/// Lower snake case form of a module, driver or device name.
///
/// Every fragment the patchers write spells the driver in lower or upper
/// case only, so the name used as the idempotence key must be the lower
/// form: `Bmi160` becomes `bmi160`, `touchPanel` becomes `touch_panel`.
pub fn canonical_name(field: &str, value: &str) -> Result<String, ToolError> {
    let name = WordsConverter::new(value).lower_case();
    if name.is_empty() {
        return Err(ToolError::InvalidArgument(format!(
            "{field} name '{value}' has no letters or digits"
        )));
    }
    Ok(name)
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
