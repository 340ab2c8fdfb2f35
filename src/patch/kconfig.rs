use super::{commit, load_target, render_strict, PatchOutcome};
use crate::error::ToolError;
use crate::locate::{driver_exists, CommentStyle};
use crate::naming::DriverIdentity;
use crate::template::Template;
use log::{debug, warn};
use std::path::Path;

pub const KCONFIG_TEMPLATE: &str = "driver_add_kconfig_config.template";

/// Append the driver's `config DRIVERS_HDF_<M>_<D>` entry to a module
/// `Kconfig`.
///
/// `namespace` overrides the module name in the `depends on` line, for
/// modules whose Kconfig symbols live under a different prefix than their
/// build flags (display uses `DISP`).
pub fn patch_kconfig(
    path: &Path,
    identity: &DriverIdentity,
    template_root: &Path,
    namespace: Option<&str>,
) -> Result<PatchOutcome, ToolError> {
    let mut file = load_target(path, "Kconfig")?;
    if driver_exists(file.lines(), &identity.driver, CommentStyle::Hash) {
        debug!("{} already names {}", path.display(), identity.driver);
        return Ok(PatchOutcome::AlreadyPresent {
            file: path.to_path_buf(),
        });
    }

    let template_path = template_root.join(KCONFIG_TEMPLATE);
    let Some(template) =
        Template::load(&template_path).map_err(|e| ToolError::io(&template_path, e))?
    else {
        warn!("{} not found, Kconfig left untouched", template_path.display());
        return Ok(PatchOutcome::Skipped {
            file: path.to_path_buf(),
            reason: format!("template {} not found", template_path.display()),
        });
    };

    let mut entry = render_strict(template.text(), &identity.template_vars(), path)?;
    if let Some(namespace) = namespace {
        let module_dep = format!("depends on DRIVERS_HDF_{}", identity.module.to_uppercase());
        let renamed = format!("depends on DRIVERS_HDF_{}", namespace.to_uppercase());
        entry = entry.replace(&module_dep, &renamed);
    }

    let original = file.contents();
    file.append(entry);
    commit(&file, &original)
}
