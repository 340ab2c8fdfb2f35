//! LiteOS `BUILD.gn`: a conditional block inside the `hdf_driver` section.

use super::{commit, load_target, locate_in, render_strict, PatchContext, PatchOutcome};
use crate::edit::TextFile;
use crate::error::ToolError;
use crate::locate::{build_gn_root_macro, driver_exists, Anchor, CommentStyle, Marker};
use crate::relativize::PathRole;
use crate::template::Vars;
use log::debug;
use std::path::Path;

const OPEN: &str = "\n  if (defined(LOSCFG_DRIVERS_HDF_${model_name_upper}_${driver_name_upper})) {\n";
const SINGLE_SOURCE: &str = "    sources += [ \"$${file_parent_path}/${source_path}\" ]\n";
const MULTI_OPEN: &str = "    sources += [ \n";
const MULTI_ITEM: &str = "      \"$${file_parent_path}/${source_path}\",\n";
const MULTI_CLOSE: &str = "    ]\n";
const INCLUDE: &str = "    include_dirs += [ \"$${file_parent_path}/${head_path}\" ]\n";
const CLOSE: &str = "  }\n";

pub fn patch_build_gn(path: &Path, ctx: &PatchContext<'_>) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "BUILD.gn")?;
    if driver_exists(file.lines(), &ctx.identity.driver, CommentStyle::Hash) {
        debug!("{} already names {}", path.display(), ctx.identity.driver);
        return Ok(PatchOutcome::AlreadyPresent {
            file: path.to_path_buf(),
        });
    }
    let original = file.contents();
    let anchor = locate_in(&file, Marker::BUILD_GN, &build_gn_root_macro(&ctx.identity.module));
    let fragment = render_fragment(&file, &anchor, ctx)?;
    file.insert(anchor.insert_at, fragment);
    commit(&file, &original)
}

fn render_fragment(
    file: &TextFile,
    anchor: &Anchor,
    ctx: &PatchContext<'_>,
) -> Result<String, ToolError> {
    let target = file.path();
    let mut out = render_strict(OPEN, &ctx.identity.template_vars(), target)?;

    let source_line = |source: &Path, text: &str| -> Result<String, ToolError> {
        let rel = ctx.relativize(file, anchor, source, PathRole::Source)?;
        let vars = Vars::new()
            .with("file_parent_path", rel.macro_name)
            .with("source_path", rel.relative);
        render_strict(text, &vars, target)
    };

    match ctx.sources {
        [single] => out.push_str(&source_line(single.as_path(), SINGLE_SOURCE)?),
        many => {
            out.push_str(MULTI_OPEN);
            for source in many {
                out.push_str(&source_line(source.as_path(), MULTI_ITEM)?);
            }
            out.push_str(MULTI_CLOSE);
        }
    }

    let head = ctx.relativize(file, anchor, ctx.header, PathRole::Header)?;
    let vars = Vars::new()
        .with("file_parent_path", head.macro_name)
        .with("head_path", head.relative);
    out.push_str(&render_strict(INCLUDE, &vars, target)?);
    out.push_str(CLOSE);
    Ok(out)
}
