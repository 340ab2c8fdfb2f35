//! Marker-based insertion points and the macro table of a target file.
//!
//! Every scan is a single top-to-bottom pass over the line sequence.
//! Nothing here understands the build-file grammar; markers are substrings
//! and line prefixes.

use regex::Regex;
use std::sync::LazyLock;

static MACRO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z _0-9]+=").expect("macro pattern is valid"));

/// Which lines count as comments for the scan and the existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `#` in column 0 (GN, make, Kconfig, `.config`)
    Hash,
    /// `#` in column 0 or a line whose text starts with `//` (HCS)
    HashOrSlash,
}

impl CommentStyle {
    pub fn is_comment(self, line: &str) -> bool {
        if line.starts_with('#') {
            return true;
        }
        match self {
            CommentStyle::Hash => false,
            CommentStyle::HashOrSlash => line.trim_start().starts_with("//"),
        }
    }
}

/// True when any non-comment line contains `driver` as a substring.
///
/// This is the idempotence guard shared by every patcher. It is coarse on
/// purpose: a driver whose name is a substring of another identifier in the
/// file reads as already present.
pub fn driver_exists(lines: &[String], driver: &str, comments: CommentStyle) -> bool {
    lines
        .iter()
        .filter(|line| !comments.is_comment(line))
        .any(|line| line.contains(driver))
}

/// Root-path macros (`NAME = value`) defined in a file, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    entries: Vec<(String, String)>,
}

impl MacroTable {
    /// Scan every line matching `^[A-Z _0-9]+=`. `NAME =` with nothing after
    /// the `=` takes its value from the next line. Redefinitions overwrite
    /// the value but keep the original position.
    pub fn scan(lines: &[String]) -> Self {
        let mut table = Self::default();
        for (index, line) in lines.iter().enumerate() {
            if !MACRO_LINE.is_match(line) {
                continue;
            }
            let Some((name, value)) = line.trim().split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = match value.trim() {
                "" => lines.get(index + 1).map(|l| l.trim()).unwrap_or(""),
                v => v,
            };
            table.insert(name, value);
        }
        table
    }

    fn insert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A structural anchor in a target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// A line containing `open` starts tracking; the next unindented line
    /// that is exactly `}` closes the section. The last close wins.
    Section { open: &'static str },
    /// A line whose trimmed text starts with `prefix`. Insertion happens one
    /// line above it. `first_only` stops at the first hit, otherwise the
    /// last hit wins.
    Terminal {
        prefix: &'static str,
        first_only: bool,
    },
}

impl Marker {
    /// Driver block of a LiteOS `BUILD.gn`.
    pub const BUILD_GN: Marker = Marker::Section {
        open: "hdf_driver",
    };

    /// Trailing include of a LiteOS module `Makefile`.
    pub const LITEOS_MAKEFILE: Marker = Marker::Terminal {
        prefix: "include $(HDF_DRIVER)",
        first_only: false,
    };

    /// Compiler-flags block of a Linux module `Makefile`.
    pub const LINUX_MAKEFILE: Marker = Marker::Terminal {
        prefix: "ccflags-y",
        first_only: true,
    };
}

/// Where a fragment goes, plus the expected root macro seen on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Zero-based line index the fragment is inserted at
    pub insert_at: usize,
    /// Line index of the closing/terminal marker, if one was seen
    pub marker_line: Option<usize>,
    pub root_macro: String,
    pub root_value: Option<String>,
}

impl Anchor {
    /// No marker was found and the fragment would land at the top of the
    /// file. Callers should surface this.
    pub fn is_degenerate(&self) -> bool {
        self.marker_line.is_none()
    }
}

/// Scan `lines` once for `marker`, capturing the value of `root_macro`
/// whenever a line starts with it.
pub fn locate(lines: &[String], marker: Marker, root_macro: &str) -> Anchor {
    let mut tracking = false;
    let mut marker_line = None;
    let mut root_value = None;

    for (index, line) in lines.iter().enumerate() {
        if CommentStyle::Hash.is_comment(line) {
            continue;
        }
        match marker {
            Marker::Section { open } => {
                if line.contains(open) {
                    tracking = true;
                    continue;
                }
                if tracking && line.trim_end() == "}" {
                    marker_line = Some(index);
                    tracking = false;
                    continue;
                }
            }
            Marker::Terminal { prefix, first_only } => {
                if line.trim().starts_with(prefix) {
                    marker_line = Some(index);
                    if first_only {
                        break;
                    }
                    continue;
                }
            }
        }
        if line.trim().starts_with(root_macro) {
            root_value = line.rsplit('=').next().map(|v| v.trim().to_string());
        }
    }

    let insert_at = match (marker, marker_line) {
        (_, None) => 0,
        (Marker::Section { .. }, Some(close)) => close,
        (Marker::Terminal { .. }, Some(terminal)) => terminal.saturating_sub(1),
    };

    Anchor {
        insert_at,
        marker_line,
        root_macro: root_macro.to_string(),
        root_value,
    }
}

/// Root macro a LiteOS `BUILD.gn` uses for module sources.
pub fn build_gn_root_macro(module: &str) -> String {
    format!("FRAMEWORKS_{}_ROOT", module.to_uppercase())
}

/// Root macro a LiteOS `Makefile` uses; `sensor` shares the framework name.
pub fn liteos_makefile_root_macro(module: &str) -> String {
    if module == "sensor" {
        build_gn_root_macro(module)
    } else {
        linux_makefile_root_macro(module)
    }
}

pub fn linux_makefile_root_macro(module: &str) -> String {
    format!("{}_ROOT_DIR", module.to_uppercase())
}
