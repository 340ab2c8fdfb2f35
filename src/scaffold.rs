//! Driver Scaffolder: generate the driver source and header, then patch the
//! kernel flavor's build files in a fixed order.
//!
//! Steps run in sequence and stop at the first error. Earlier steps are
//! not undone, but everything that changed is recorded in the journal, which
//! is saved even when a later step fails.

use crate::config::ToolConfig;
use crate::error::ToolError;
use crate::journal::Journal;
use crate::layout::{DriverFiles, Layout, ModuleTemplates};
use crate::locate::{driver_exists, CommentStyle};
use crate::naming::{DriverIdentity, Kernel};
use crate::patch::dotconfig::{self, EnableLines, Placement};
use crate::patch::{gn, hcs, kconfig, makefile, PatchContext, PatchOutcome};
use crate::safety::RootGuard;
use crate::settings::SettingsStore;
use crate::template::{render_new_file, RenderOutcome};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    DriverSource,
    DriverHeader,
    BuildGn,
    Makefile,
    Kconfig,
    DeviceInfo,
    DotConfig,
    Settings,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::DriverSource => "driver source",
            FileKind::DriverHeader => "driver header",
            FileKind::BuildGn => "BUILD.gn",
            FileKind::Makefile => "Makefile",
            FileKind::Kconfig => "Kconfig",
            FileKind::DeviceInfo => "device_info.hcs",
            FileKind::DotConfig => "config",
            FileKind::Settings => "settings",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub kind: FileKind,
    #[serde(flatten)]
    pub outcome: PatchOutcome,
    /// Content read just before this run changed the file; `None` when the
    /// run created it or left it alone
    #[serde(skip)]
    pub previous: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddReport {
    pub identity: DriverIdentity,
    pub entries: Vec<ReportEntry>,
    /// Journal written by this run, if anything changed
    pub journal: Option<PathBuf>,
}

impl AddReport {
    pub fn applied(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_applied())
    }
}

/// One target file as seen by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub kind: FileKind,
    pub path: PathBuf,
    pub exists: bool,
    /// Driver name (config symbol, for `.config` files) appears on a
    /// non-comment line
    pub configured: bool,
}

pub struct DriverScaffolder<'a> {
    identity: &'a DriverIdentity,
    layout: Layout<'a>,
    guard: RootGuard,
}

impl<'a> DriverScaffolder<'a> {
    /// Fails fast when the template root is missing.
    pub fn new(
        identity: &'a DriverIdentity,
        root: &'a Path,
        config: &'a ToolConfig,
    ) -> Result<Self, ToolError> {
        let layout = Layout::new(root, config);
        let template_root = layout.template_root();
        if !template_root.is_dir() {
            return Err(ToolError::missing("template root", template_root));
        }
        let guard = RootGuard::new(root, &template_root)?;
        Ok(Self {
            identity,
            layout,
            guard,
        })
    }

    pub fn layout(&self) -> &Layout<'a> {
        &self.layout
    }

    pub fn journal_path(&self) -> PathBuf {
        Journal::path_for(
            self.layout.root(),
            self.identity.kernel,
            &self.identity.module,
            &self.identity.driver,
        )
    }

    pub fn run(&self) -> Result<AddReport, ToolError> {
        let journal_path = self.journal_path();
        let mut journal = Journal::load_or_new(&journal_path, self.identity)?;
        let mut entries = Vec::new();

        let result = self.run_steps(&mut journal, &mut entries);

        let saved = if journal.is_empty() {
            None
        } else {
            self.guard.validate_new(&journal_path)?;
            journal.save(&journal_path)?;
            Some(journal_path)
        };
        result?;

        info!(
            "{} {} driver {} done, {} file(s) changed",
            self.identity.kernel,
            self.identity.module,
            self.identity.driver,
            entries.iter().filter(|e| e.outcome.is_applied()).count()
        );
        Ok(AddReport {
            identity: self.identity.clone(),
            entries,
            journal: saved,
        })
    }

    fn run_steps(
        &self,
        journal: &mut Journal,
        entries: &mut Vec<ReportEntry>,
    ) -> Result<(), ToolError> {
        let id = self.identity;
        let config = self.layout.config();
        let templates = self.layout.module_templates(&id.module)?;

        let mut settings = SettingsStore::open(self.layout.settings_path())?;
        let files = self.layout.driver_files(id, &settings.driver_path(&id.module));
        self.generate_driver_files(&templates, &files, journal, entries)?;

        let settings_before = Journal::read_before(settings.path())?;
        settings.record_device_dir(&id.module, &id.device)?;
        settings.record_driver(id.kernel, &id.module, &id.driver, &self.root_relative(&files.source))?;
        if settings.is_dirty() {
            self.guard.validate_new(settings.path())?;
            settings.save()?;
            journal.record(settings.path(), settings_before.clone())?;
            entries.push(ReportEntry {
                kind: FileKind::Settings,
                outcome: PatchOutcome::Applied {
                    file: settings.path().to_path_buf(),
                },
                previous: settings_before,
            });
        }

        let sources = [files.source.clone()];
        let ctx = PatchContext {
            identity: id,
            root: self.layout.root(),
            sources: &sources,
            header: &files.header,
            framework_prefix: &config.framework_prefix,
        };
        let template_root = self.layout.template_root();
        let namespace = config.kconfig_namespace(&id.module);

        if id.kernel == Kernel::Liteos {
            self.apply(FileKind::BuildGn, &self.layout.build_gn(id), journal, entries, |p| {
                gn::patch_build_gn(p, &ctx)
            })?;
            self.apply(FileKind::Makefile, &self.layout.makefile(id), journal, entries, |p| {
                makefile::patch_liteos_makefile(p, &ctx)
            })?;
        } else {
            self.apply(FileKind::Makefile, &self.layout.makefile(id), journal, entries, |p| {
                makefile::patch_linux_makefile(p, &ctx)
            })?;
        }
        self.apply(FileKind::Kconfig, &self.layout.kconfig(id), journal, entries, |p| {
            kconfig::patch_kconfig(p, id, &template_root, namespace)
        })?;
        self.apply(FileKind::DeviceInfo, &self.layout.device_info_hcs(id), journal, entries, |p| {
            hcs::patch_device_info(p, id, &template_root)
        })?;

        let device_enable = dotconfig::device_enable_line(&templates.dir, id.kernel, &id.device)?;
        let enable = EnableLines::for_driver(id, device_enable);
        let (targets, placement) = self.dot_config_targets();
        if targets.is_empty() {
            warn!("no config files found for board {}", id.board);
        }
        for target in &targets {
            self.apply(FileKind::DotConfig, target, journal, entries, |p| {
                dotconfig::propagate(p, &enable, &placement)
            })?;
        }
        Ok(())
    }

    fn generate_driver_files(
        &self,
        templates: &ModuleTemplates,
        files: &DriverFiles,
        journal: &mut Journal,
        entries: &mut Vec<ReportEntry>,
    ) -> Result<(), ToolError> {
        let vars = self
            .identity
            .template_vars()
            .with("include_file", files.include_name.clone());

        for (kind, template, dest) in [
            (FileKind::DriverSource, &templates.source, &files.source),
            (FileKind::DriverHeader, &templates.header, &files.header),
        ] {
            self.guard.validate_new(dest)?;
            let outcome = match template {
                None => PatchOutcome::Skipped {
                    file: dest.clone(),
                    reason: format!("no {kind} template in {}", templates.dir.display()),
                },
                Some(template) => match render_new_file(template, dest, &vars)? {
                    RenderOutcome::Created(file) => {
                        journal.record(&file, None)?;
                        PatchOutcome::Applied { file }
                    }
                    RenderOutcome::Existing(file) => PatchOutcome::AlreadyPresent { file },
                    RenderOutcome::TemplateMissing(missing) => PatchOutcome::Skipped {
                        file: dest.clone(),
                        reason: format!("template {} not found", missing.display()),
                    },
                },
            };
            entries.push(ReportEntry {
                kind,
                outcome,
                previous: None,
            });
        }
        Ok(())
    }

    /// Run one patcher under the root guard, journaling the prior content.
    fn apply(
        &self,
        kind: FileKind,
        path: &Path,
        journal: &mut Journal,
        entries: &mut Vec<ReportEntry>,
        patch: impl FnOnce(&Path) -> Result<PatchOutcome, ToolError>,
    ) -> Result<(), ToolError> {
        if path.exists() {
            self.guard.validate_path(path)?;
        }
        let before = Journal::read_before(path)?;
        let outcome = patch(path)?;
        let previous = if outcome.is_applied() {
            journal.record(path, before.clone())?;
            before
        } else {
            None
        };
        info!("{outcome}");
        entries.push(ReportEntry {
            kind,
            outcome,
            previous,
        });
        Ok(())
    }

    fn dot_config_targets(&self) -> (Vec<PathBuf>, Placement) {
        let id = self.identity;
        match id.kernel {
            Kernel::Liteos => (
                dotconfig::liteos_dot_configs(&self.layout.board_dir(id)),
                Placement::Append,
            ),
            Kernel::Linux => {
                let config = self.layout.config();
                let names = config
                    .board(&id.board)
                    .map(|b| b.dot_config_files.clone())
                    .unwrap_or_default();
                (
                    dotconfig::linux_dot_configs(&self.layout.kernel_config_dirs(id), &names),
                    Placement::After(config.linux.config_anchor.clone()),
                )
            }
        }
    }

    fn root_relative(&self, path: &Path) -> String {
        path.strip_prefix(self.layout.root())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Every file `run` would touch, and whether it already names the driver.
    pub fn status(&self) -> Result<Vec<StatusEntry>, ToolError> {
        let id = self.identity;
        let settings = SettingsStore::open(self.layout.settings_path())?;
        let files = self.layout.driver_files(id, &settings.driver_path(&id.module));

        let mut targets = vec![
            (FileKind::DriverSource, files.source, CommentStyle::Hash),
            (FileKind::DriverHeader, files.header, CommentStyle::Hash),
        ];
        if id.kernel == Kernel::Liteos {
            targets.push((FileKind::BuildGn, self.layout.build_gn(id), CommentStyle::Hash));
        }
        targets.push((FileKind::Makefile, self.layout.makefile(id), CommentStyle::Hash));
        targets.push((FileKind::Kconfig, self.layout.kconfig(id), CommentStyle::Hash));
        targets.push((
            FileKind::DeviceInfo,
            self.layout.device_info_hcs(id),
            CommentStyle::HashOrSlash,
        ));
        let (dot_configs, _) = self.dot_config_targets();
        targets.extend(
            dot_configs
                .into_iter()
                .map(|p| (FileKind::DotConfig, p, CommentStyle::Hash)),
        );

        targets
            .into_iter()
            .map(|(kind, path, comments)| {
                let (exists, configured) = match kind {
                    FileKind::DriverSource | FileKind::DriverHeader => {
                        let exists = path.is_file();
                        (exists, exists)
                    }
                    FileKind::DotConfig => inspect(&path, &id.config_symbol(), comments)?,
                    _ => inspect(&path, &id.driver, comments)?,
                };
                Ok(StatusEntry {
                    kind,
                    path,
                    exists,
                    configured,
                })
            })
            .collect()
    }
}

fn inspect(path: &Path, needle: &str, comments: CommentStyle) -> Result<(bool, bool), ToolError> {
    match Journal::read_before(path)? {
        None => Ok((false, false)),
        Some(text) => {
            let lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
            Ok((true, driver_exists(&lines, needle, comments)))
        }
    }
}
