//! File patchers, one per target file kind.
//!
//! Every patcher follows the same shape: load the target, bail out with
//! [`PatchOutcome::AlreadyPresent`] when the driver name already appears,
//! locate the insertion point, render the fragment strictly and write the
//! whole file back.

pub mod dotconfig;
pub mod gn;
pub mod hcs;
pub mod kconfig;
pub mod makefile;

use crate::edit::TextFile;
use crate::error::ToolError;
use crate::locate::{locate, Anchor, MacroTable, Marker};
use crate::naming::DriverIdentity;
use crate::relativize::{anchor_on, PathRole, Relativized, Relativizer};
use crate::template::{Template, Vars};
use log::warn;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of applying one patcher to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
#[must_use = "PatchOutcome reports whether the file changed"]
pub enum PatchOutcome {
    /// Fragment inserted and the file rewritten
    Applied { file: PathBuf },
    /// Driver name already present (or nothing to change); file untouched
    AlreadyPresent { file: PathBuf },
    /// Patcher had nothing to work from, e.g. a missing optional template
    Skipped { file: PathBuf, reason: String },
}

impl PatchOutcome {
    pub fn file(&self) -> &Path {
        match self {
            PatchOutcome::Applied { file }
            | PatchOutcome::AlreadyPresent { file }
            | PatchOutcome::Skipped { file, .. } => file,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Applied { file } => write!(f, "Patched {}", file.display()),
            PatchOutcome::AlreadyPresent { file } => {
                write!(f, "Already configured {}", file.display())
            }
            PatchOutcome::Skipped { file, reason } => {
                write!(f, "Skipped {}: {}", file.display(), reason)
            }
        }
    }
}

/// Everything a build-file patcher needs to know about the driver.
#[derive(Debug, Clone, Copy)]
pub struct PatchContext<'a> {
    pub identity: &'a DriverIdentity,
    pub root: &'a Path,
    /// Generated driver sources, absolute
    pub sources: &'a [PathBuf],
    /// Generated driver header, absolute
    pub header: &'a Path,
    pub framework_prefix: &'a str,
}

impl<'a> PatchContext<'a> {
    /// Relativize `path` against the macros defined in `file`, falling back
    /// to the root macro the locator captured.
    pub(crate) fn relativize(
        &self,
        file: &TextFile,
        anchor: &Anchor,
        path: &Path,
        role: PathRole,
    ) -> Result<Relativized, ToolError> {
        let macros = MacroTable::scan(file.lines());
        let mut relativizer = Relativizer::new(&macros, self.root, &self.identity.device);
        if self.identity.kernel.separates_framework_tree() {
            relativizer = relativizer.separate_framework(self.framework_prefix);
        }
        relativizer
            .resolve(path, role)
            .or_else(|| anchor_on(anchor, path, role))
            .ok_or_else(|| ToolError::NoRootMacro {
                file: file.path().to_path_buf(),
                path: path.to_path_buf(),
            })
    }
}

/// Load a required target file.
pub(crate) fn load_target(path: &Path, what: &'static str) -> Result<TextFile, ToolError> {
    if !path.is_file() {
        return Err(ToolError::missing(what, path));
    }
    Ok(TextFile::load(path)?)
}

/// Locate `marker` in `file`, warning when it never appears and the
/// fragment would land at the top of the file.
pub(crate) fn locate_in(file: &TextFile, marker: Marker, root_macro: &str) -> Anchor {
    let anchor = locate(file.lines(), marker, root_macro);
    if anchor.is_degenerate() {
        warn!(
            "no {:?} marker in {}, inserting at the top of the file",
            marker,
            file.path().display()
        );
    }
    anchor
}

/// Strict rendering; a missing key is reported against the patched file.
pub(crate) fn render_strict(text: &str, vars: &Vars, target: &Path) -> Result<String, ToolError> {
    Template::new(text)
        .substitute(vars)
        .map_err(|source| ToolError::Template {
            path: target.to_path_buf(),
            source,
        })
}

/// Write `file` back unless it still equals `original`.
pub(crate) fn commit(file: &TextFile, original: &str) -> Result<PatchOutcome, ToolError> {
    let path = file.path().to_path_buf();
    if file.contents() == original {
        return Ok(PatchOutcome::AlreadyPresent { file: path });
    }
    file.save()?;
    Ok(PatchOutcome::Applied { file: path })
}
