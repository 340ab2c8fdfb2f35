//! Express an absolute driver path relative to a root macro already defined
//! in the target build file.

use crate::locate::{Anchor, MacroTable};
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    /// The file name is part of the relative suffix
    Source,
    /// Only the containing directory is part of the relative suffix
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relativized {
    pub macro_name: String,
    pub relative: String,
}

/// Picks the macro whose value contains the path's parent directory.
///
/// The parent fragment is the root-relative directory up to the device
/// component. When no macro contains it, trailing components are dropped
/// until one does, but never past the module component that follows
/// `model`. Among admitted macros containing the fragment the one scanned
/// last wins.
pub struct Relativizer<'a> {
    macros: &'a MacroTable,
    root: &'a Path,
    device: &'a str,
    framework_prefix: Option<&'a str>,
}

impl<'a> Relativizer<'a> {
    pub fn new(macros: &'a MacroTable, root: &'a Path, device: &'a str) -> Self {
        Self {
            macros,
            root,
            device,
            framework_prefix: None,
        }
    }

    /// Split the macro table by tree: headers may only anchor on macros
    /// under `prefix`, sources only on the others.
    #[must_use]
    pub fn separate_framework(mut self, prefix: &'a str) -> Self {
        self.framework_prefix = Some(prefix);
        self
    }

    pub fn resolve(&self, path: &Path, role: PathRole) -> Option<Relativized> {
        let components = relative_components(path, self.root);
        let (file_name, dirs) = components.split_last()?;
        let parent_len = match self.device {
            "" => dirs.len(),
            device => dirs.iter().position(|c| c == device).unwrap_or(dirs.len()),
        };

        let shortest = dirs[..parent_len]
            .iter()
            .rposition(|c| c == "model")
            .map_or(parent_len, |model| (model + 2).min(parent_len))
            .max(1);

        for len in (shortest..=parent_len).rev() {
            let fragment = dirs[..len].join("/");
            let Some(name) = self.last_match(&fragment, role) else {
                continue;
            };
            let mut rest: Vec<&str> = dirs[len..].iter().map(String::as_str).collect();
            if role == PathRole::Source {
                rest.push(file_name);
            }
            return Some(Relativized {
                macro_name: name.to_string(),
                relative: rest.join("/"),
            });
        }
        None
    }

    fn last_match(&self, fragment: &str, role: PathRole) -> Option<&'a str> {
        self.macros
            .iter()
            .filter(|(_, value)| self.admits(value, role))
            .filter(|(_, value)| value.contains(fragment))
            .last()
            .map(|(name, _)| name)
    }

    fn admits(&self, value: &str, role: PathRole) -> bool {
        let Some(prefix) = self.framework_prefix else {
            return true;
        };
        let in_framework = unquote(value).starts_with(prefix);
        match role {
            PathRole::Header => in_framework,
            PathRole::Source => !in_framework,
        }
    }
}

/// Relativize against the root macro the locator captured, by cutting the
/// path after the segment that follows `model` in the macro's value.
///
/// `FRAMEWORKS_SENSOR_ROOT = "//drivers/hdf_core/framework/model/sensor"`
/// turns `.../model/sensor/driver/accel/x.c` into `driver/accel/x.c`.
pub fn anchor_on(anchor: &Anchor, path: &Path, role: PathRole) -> Option<Relativized> {
    let value = anchor.root_value.as_deref()?;
    let tail = unquote(value).rsplit("model").next()?.trim_matches('/');
    if tail.is_empty() {
        return None;
    }
    let needle = format!("/{tail}/");
    let full = to_slash(path);
    let (_, after) = full.rsplit_once(&needle)?;
    let relative = match role {
        PathRole::Source => after.to_string(),
        PathRole::Header => after
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default(),
    };
    Some(Relativized {
        macro_name: anchor.root_macro.clone(),
        relative,
    })
}

/// Swap a trailing `.c` for `.o`, as make object rules expect.
pub fn object_name(relative: &str) -> String {
    match relative.strip_suffix(".c") {
        Some(stem) => format!("{stem}.o"),
        None => relative.to_string(),
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_start_matches('/')
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn relative_components(path: &Path, root: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
