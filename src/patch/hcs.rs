//! Hierarchical device configuration (`device_info.hcs`).
//!
//! A module owns one brace-delimited block, e.g.
//!
//! ```text
//!         sensor :: host {
//!             hostName = "sensor_host";
//!             ...
//!         }
//! ```
//!
//! New driver sub-blocks go immediately before the line that closes it.

use super::{commit, load_target, render_strict, PatchOutcome};
use crate::edit::TextFile;
use crate::error::ToolError;
use crate::locate::{driver_exists, CommentStyle};
use crate::naming::DriverIdentity;
use crate::template::Template;
use log::{debug, warn};
use regex::Regex;
use std::ops::RangeInclusive;
use std::path::Path;

pub const DEVICE_INFO_TEMPLATE: &str = "exists_model_hcs_info.template";

/// Indentation applied to every template line, three levels deep inside
/// `root { device_info { <module> :: host {`.
const SUB_BLOCK_INDENT: &str = "\t\t\t";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockScan {
    Seeking,
    Inside { start: usize, depth: usize },
}

/// Line range of the first complete block opened by `module`, from the
/// opening line to the line where the brace depth returns to zero.
pub fn find_module_block(lines: &[String], module: &str) -> Option<RangeInclusive<usize>> {
    let mut state = BlockScan::Seeking;
    for (index, line) in lines.iter().enumerate() {
        if CommentStyle::HashOrSlash.is_comment(line) {
            continue;
        }
        if state == BlockScan::Seeking {
            if !opens_block(lines, index, module) {
                continue;
            }
            state = BlockScan::Inside {
                start: index,
                depth: 0,
            };
        }
        let BlockScan::Inside { start, depth } = state else {
            continue;
        };
        let opened = line.matches('{').count();
        let closed = line.matches('}').count();
        let depth = (depth + opened).saturating_sub(closed);
        if depth == 0 && (opened > 0 || closed > 0) {
            return Some(start..=index);
        }
        state = BlockScan::Inside { start, depth };
    }
    None
}

/// `module` followed by a non-identifier character, with the block's `{`
/// on the same line or leading the next non-blank line. Attribute lines
/// such as `sensor = 1;` never open a block.
fn opens_block(lines: &[String], index: usize, module: &str) -> bool {
    let Some(rest) = lines[index].trim_start().strip_prefix(module) else {
        return false;
    };
    let boundary = rest
        .chars()
        .next()
        .is_some_and(|c| !(c.is_ascii_alphanumeric() || c == '_'));
    if !boundary {
        return false;
    }
    if rest.contains('{') {
        return true;
    }
    lines[index + 1..]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .is_some_and(|l| l.starts_with('{'))
}

/// Insert the rendered device sub-block into the module's host block.
pub fn patch_device_info(
    path: &Path,
    identity: &DriverIdentity,
    template_root: &Path,
) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "HCS file")?;
    if driver_exists(file.lines(), &identity.driver, CommentStyle::HashOrSlash) {
        debug!("{} already names {}", path.display(), identity.driver);
        return Ok(PatchOutcome::AlreadyPresent {
            file: path.to_path_buf(),
        });
    }

    let template_path = template_root.join(DEVICE_INFO_TEMPLATE);
    let Some(template) =
        Template::load(&template_path).map_err(|e| ToolError::io(&template_path, e))?
    else {
        warn!("{} not found, HCS left untouched", template_path.display());
        return Ok(PatchOutcome::Skipped {
            file: path.to_path_buf(),
            reason: format!("template {} not found", template_path.display()),
        });
    };

    let block = find_module_block(file.lines(), &identity.module)
        .ok_or_else(|| ToolError::missing("HCS module block", path))?;

    let indented: String = template
        .text()
        .split_inclusive('\n')
        .map(|line| format!("{SUB_BLOCK_INDENT}{line}"))
        .collect();
    let fragment = render_strict(&indented, &identity.template_vars(), path)?;

    let original = file.contents();
    file.insert(*block.end(), fragment);
    file.ensure_trailing_newline();
    commit(&file, &original)
}

/// Point an include-style line at `line`: the first line matching `pattern`
/// is replaced in place, so re-pointing an include never duplicates it.
pub fn patch_include(path: &Path, line: &str, pattern: &Regex) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "HCS file")?;
    let original = file.contents();
    upsert_line(&mut file, line, pattern);
    debug!("upserted {} in {}", line.trim_end(), path.display());
    commit(&file, &original)
}

/// Replace the first line matching `pattern` with `line`, or insert `line`
/// after the last `#include` when nothing matches.
fn upsert_line(file: &mut TextFile, line: &str, pattern: &Regex) {
    let line = if line.ends_with('\n') {
        line.to_string()
    } else {
        format!("{line}\n")
    };
    if let Some(index) = file.lines().iter().position(|l| pattern.is_match(l)) {
        file.replace_line(index, line);
        return;
    }
    let after_include = file
        .lines()
        .iter()
        .rposition(|l| l.trim_start().starts_with("#include"))
        .map_or(0, |i| i + 1);
    file.insert(after_include, line);
}
