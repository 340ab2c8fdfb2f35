//! Text templates with `${name}` placeholders.
//!
//! Only the braced form is a placeholder. A `$` that is not followed by
//! `{identifier}` is copied through untouched, so build-file syntax such as
//! `$(LOCAL_SRCS)` or `$FRAMEWORKS_SENSOR_ROOT` needs no escaping.
//!
//! Two strictness modes exist:
//!
//! - [`Strictness::BestEffort`] leaves unresolved placeholders in the output
//!   verbatim. Used for newly created driver sources and headers.
//! - [`Strictness::Strict`] fails with [`TemplateError::MissingKey`]. Used
//!   for build-file fragments, where a half-rendered line would break the
//!   build.

use crate::edit::atomic_write;
use crate::error::ToolError;
use log::{debug, warn};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("no value supplied for placeholder '${{{name}}}'")]
    MissingKey { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    BestEffort,
    Strict,
}

/// Substitution mapping, placeholder name to replacement text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(BTreeMap<String, String>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Copy every entry of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: &Vars) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a template from disk. A missing file is not an error: it yields
    /// `None` and the caller renders nothing.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::new(text))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.text) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn render(&self, vars: &Vars, strictness: Strictness) -> Result<String, TemplateError> {
        match strictness {
            Strictness::BestEffort => Ok(self.safe_substitute(vars)),
            Strictness::Strict => self.substitute(vars),
        }
    }

    /// Strict substitution: every placeholder must have a value.
    pub fn substitute(&self, vars: &Vars) -> Result<String, TemplateError> {
        if let Some(name) = self
            .placeholders()
            .into_iter()
            .find(|name| vars.get(name).is_none())
        {
            return Err(TemplateError::MissingKey {
                name: name.to_string(),
            });
        }
        Ok(self.safe_substitute(vars))
    }

    /// Best-effort substitution: unknown placeholders stay as written.
    pub fn safe_substitute(&self, vars: &Vars) -> String {
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Result of materializing a template into a new file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RenderOutcome reports whether the file was written"]
pub enum RenderOutcome {
    Created(PathBuf),
    /// Destination already existed and was left untouched
    Existing(PathBuf),
    /// Template file missing; nothing was written
    TemplateMissing(PathBuf),
}

/// Render `template_path` best-effort into `dest`, creating parent
/// directories. An existing destination is never overwritten.
pub fn render_new_file(
    template_path: &Path,
    dest: &Path,
    vars: &Vars,
) -> Result<RenderOutcome, ToolError> {
    if dest.exists() {
        debug!("{} already exists, leaving it untouched", dest.display());
        return Ok(RenderOutcome::Existing(dest.to_path_buf()));
    }

    let Some(template) =
        Template::load(template_path).map_err(|e| ToolError::io(template_path, e))?
    else {
        warn!("template {} not found, skipping", template_path.display());
        return Ok(RenderOutcome::TemplateMissing(template_path.to_path_buf()));
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
    }

    let contents = template.safe_substitute(vars);
    atomic_write(dest, contents.as_bytes())?;
    Ok(RenderOutcome::Created(dest.to_path_buf()))
}
