//! Module `Makefile` fragments.
//!
//! LiteOS wraps the sources in an `ifeq ($(LOSCFG_...), y)` guard ahead of
//! the trailing `include $(HDF_DRIVER)`. Linux emits an `obj-$(CONFIG_...)`
//! object rule plus an include flag ahead of the compiler-flags block.

use super::{commit, load_target, locate_in, render_strict, PatchContext, PatchOutcome};
use crate::edit::TextFile;
use crate::error::ToolError;
use crate::locate::{
    driver_exists, linux_makefile_root_macro, liteos_makefile_root_macro, Anchor, CommentStyle,
    Marker,
};
use crate::relativize::{object_name, PathRole};
use crate::template::Vars;
use log::debug;
use std::path::Path;

const LITEOS_OPEN: &str = "\nifeq ($(LOSCFG_DRIVERS_HDF_${model_name_upper}_${driver_name_upper}), y)\n";
const LITEOS_SRCS: &str = "LOCAL_SRCS += ";
const LITEOS_SOURCE: &str = "$(${file_parent_path})/${source_path}";
const LITEOS_INCLUDE: &str = "LOCAL_INCLUDE += $(${file_parent_path})/${head_path}\n";
const LITEOS_CLOSE: &str = "endif\n";

const LINUX_RULE: &str = "\nobj-$(CONFIG_DRIVERS_HDF_${model_name_upper}_${driver_name_upper}) += \\\n";
const LINUX_OBJECT: &str = "              $(${file_parent_path})/${source_path}";
const LINUX_INCLUDE: &str = "ccflags-y += -I$(srctree)/$(${file_parent_path})/${head_path}\n";

pub fn patch_liteos_makefile(
    path: &Path,
    ctx: &PatchContext<'_>,
) -> Result<PatchOutcome, ToolError> {
    let root_macro = liteos_makefile_root_macro(&ctx.identity.module);
    patch_with(path, ctx, Marker::LITEOS_MAKEFILE, &root_macro, render_liteos)
}

pub fn patch_linux_makefile(
    path: &Path,
    ctx: &PatchContext<'_>,
) -> Result<PatchOutcome, ToolError> {
    let root_macro = linux_makefile_root_macro(&ctx.identity.module);
    patch_with(path, ctx, Marker::LINUX_MAKEFILE, &root_macro, render_linux)
}

type Render = fn(&TextFile, &Anchor, &PatchContext<'_>) -> Result<String, ToolError>;

fn patch_with(
    path: &Path,
    ctx: &PatchContext<'_>,
    marker: Marker,
    root_macro: &str,
    render: Render,
) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "Makefile")?;
    if driver_exists(file.lines(), &ctx.identity.driver, CommentStyle::Hash) {
        debug!("{} already names {}", path.display(), ctx.identity.driver);
        return Ok(PatchOutcome::AlreadyPresent {
            file: path.to_path_buf(),
        });
    }
    let original = file.contents();
    let anchor = locate_in(&file, marker, root_macro);
    let fragment = render(&file, &anchor, ctx)?;
    file.insert(anchor.insert_at, fragment);
    commit(&file, &original)
}

/// Render each source through `item`, relativized, optionally as an object.
fn source_items(
    file: &TextFile,
    anchor: &Anchor,
    ctx: &PatchContext<'_>,
    item: &str,
    as_object: bool,
) -> Result<Vec<String>, ToolError> {
    ctx.sources
        .iter()
        .map(|source| {
            let rel = ctx.relativize(file, anchor, source, PathRole::Source)?;
            let relative = if as_object {
                object_name(&rel.relative)
            } else {
                rel.relative
            };
            let vars = Vars::new()
                .with("file_parent_path", rel.macro_name)
                .with("source_path", relative);
            render_strict(item, &vars, file.path())
        })
        .collect()
}

fn include_line(
    file: &TextFile,
    anchor: &Anchor,
    ctx: &PatchContext<'_>,
    text: &str,
) -> Result<String, ToolError> {
    let head = ctx.relativize(file, anchor, ctx.header, PathRole::Header)?;
    let vars = Vars::new()
        .with("file_parent_path", head.macro_name)
        .with("head_path", head.relative);
    render_strict(text, &vars, file.path())
}

/// Join items as a make continuation list: every line but the last ends in
/// ` \`, continuation lines are indented by `indent` spaces.
fn continuation(items: &[String], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(&pad);
        }
        out.push_str(item);
        out.push_str(if i + 1 == items.len() { "\n" } else { " \\\n" });
    }
    out
}

fn render_liteos(
    file: &TextFile,
    anchor: &Anchor,
    ctx: &PatchContext<'_>,
) -> Result<String, ToolError> {
    let mut out = render_strict(LITEOS_OPEN, &ctx.identity.template_vars(), file.path())?;
    let items = source_items(file, anchor, ctx, LITEOS_SOURCE, false)?;
    out.push_str(LITEOS_SRCS);
    out.push_str(&continuation(&items, LITEOS_SRCS.len()));
    out.push_str(&include_line(file, anchor, ctx, LITEOS_INCLUDE)?);
    out.push_str(LITEOS_CLOSE);
    Ok(out)
}

fn render_linux(
    file: &TextFile,
    anchor: &Anchor,
    ctx: &PatchContext<'_>,
) -> Result<String, ToolError> {
    let mut out = render_strict(LINUX_RULE, &ctx.identity.template_vars(), file.path())?;
    let items = source_items(file, anchor, ctx, LINUX_OBJECT, true)?;
    out.push_str(&continuation(&items, 0));
    out.push_str(&include_line(file, anchor, ctx, LINUX_INCLUDE)?);
    Ok(out)
}
