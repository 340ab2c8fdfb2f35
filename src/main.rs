use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use hdf_scaffold::config::{self, ConfigOrigin};
use hdf_scaffold::naming::canonical_name;
use hdf_scaffold::{
    AddReport, DriverIdentity, DriverScaffolder, Journal, Kernel, Layout, PatchOutcome,
    RevertResult, RootGuard, ToolConfig, ToolError,
};
use log::debug;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hdf-scaffold")]
#[command(about = "Add drivers to an HDF source tree", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TreeArgs {
    /// HDF root (defaults to $HDF_ROOT, then the current directory)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Tool config file (defaults to <root>/hdf_scaffold.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct DriverArgs {
    /// Module family, e.g. sensor, audio, display
    #[arg(short, long)]
    module: String,

    #[arg(short, long)]
    driver: String,

    #[arg(short, long, value_enum)]
    kernel: Kernel,

    #[arg(long)]
    vendor: String,

    #[arg(short, long)]
    board: String,

    /// Device (chip) directory, e.g. accel
    #[arg(long, default_value = "")]
    device: String,
}

impl DriverArgs {
    fn identity(&self) -> Result<DriverIdentity, ToolError> {
        DriverIdentity::new(
            &self.module,
            &self.driver,
            self.kernel,
            &self.vendor,
            &self.board,
            &self.device,
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a driver and register it in the build files
    Add {
        #[command(flatten)]
        driver: DriverArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Show unified diff of changes
        #[arg(long)]
        diff: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which target files already know the driver
    Status {
        #[command(flatten)]
        driver: DriverArgs,

        #[command(flatten)]
        tree: TreeArgs,

        #[arg(long)]
        json: bool,
    },

    /// Undo an earlier add using its journal
    Revert {
        /// Journal file to replay
        #[arg(long, conflicts_with_all = ["module", "driver", "kernel"])]
        journal: Option<PathBuf>,

        #[arg(short, long, requires_all = ["driver", "kernel"])]
        module: Option<String>,

        #[arg(short, long)]
        driver: Option<String>,

        #[arg(short, long, value_enum)]
        kernel: Option<Kernel>,

        #[command(flatten)]
        tree: TreeArgs,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Add {
            driver,
            tree,
            diff,
            json,
        } => cmd_add(&driver, &tree, diff, json),

        Commands::Status { driver, tree, json } => cmd_status(&driver, &tree, json),

        Commands::Revert {
            journal,
            module,
            driver,
            kernel,
            tree,
            json,
        } => cmd_revert(journal, module, driver, kernel, &tree, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            let code = err
                .downcast_ref::<ToolError>()
                .map(|e| e.code().as_u8())
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

/// Resolve the HDF root.
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. HDF_ROOT environment variable
/// 3. Current directory
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match cli_root {
        Some(path) => path,
        None => match env::var_os("HDF_ROOT") {
            Some(path) => PathBuf::from(path),
            None => env::current_dir().context("cannot read the current directory")?,
        },
    };
    if !root.is_dir() {
        return Err(ToolError::TargetNotExist {
            what: "HDF root",
            path: root,
        }
        .into());
    }
    debug!("HDF root: {}", root.display());
    Ok(root.canonicalize()?)
}

fn load_tree(tree: &TreeArgs) -> Result<(PathBuf, ToolConfig, ConfigOrigin)> {
    let root = resolve_root(tree.root.clone())?;
    let (config, origin) =
        config::resolve(&root, tree.config.as_deref()).map_err(ToolError::from)?;
    Ok((root, config, origin))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_add(args: &DriverArgs, tree: &TreeArgs, show_diff: bool, json: bool) -> Result<()> {
    let identity = args.identity()?;
    let (root, config, origin) = load_tree(tree)?;

    let report = DriverScaffolder::new(&identity, &root, &config)?.run()?;

    if json {
        return print_json(&report);
    }

    println!("Root: {}", root.display());
    println!("Config: {}", origin);
    println!(
        "Driver: {} {} ({})",
        identity.module, identity.driver, identity.kernel
    );
    println!();

    let (mut applied, mut present, mut skipped) = (0, 0, 0);
    for entry in &report.entries {
        match &entry.outcome {
            PatchOutcome::Applied { file } => {
                println!("{} {}: {}", "✓".green(), entry.kind, file.display());
                applied += 1;
            }
            PatchOutcome::AlreadyPresent { file } => {
                println!(
                    "{} {}: already configured {}",
                    "⊙".yellow(),
                    entry.kind,
                    file.display()
                );
                present += 1;
            }
            PatchOutcome::Skipped { file, reason } => {
                println!(
                    "{} {}: skipped {} ({})",
                    "⊘".cyan(),
                    entry.kind,
                    file.display(),
                    reason.dimmed()
                );
                skipped += 1;
            }
        }
    }

    if show_diff {
        show_report_diff(&report)?;
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", applied).green());
    println!("  {} already configured", format!("{}", present).yellow());
    println!("  {} skipped", format!("{}", skipped).cyan());
    if let Some(journal) = &report.journal {
        println!("  journal: {}", journal.display().to_string().dimmed());
    }

    Ok(())
}

/// Diff each file this run changed against its content just before the
/// change, so a rerun shows only its own edits.
fn show_report_diff(report: &AddReport) -> Result<()> {
    for entry in report.applied() {
        let file = entry.outcome.file();
        let before = entry.previous.as_deref().unwrap_or("");
        let after = fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        if before != after {
            display_diff(file, before, &after);
        }
    }
    Ok(())
}

fn cmd_status(args: &DriverArgs, tree: &TreeArgs, json: bool) -> Result<()> {
    let identity = args.identity()?;
    let (root, config, origin) = load_tree(tree)?;
    let entries = DriverScaffolder::new(&identity, &root, &config)?.status()?;

    if json {
        return print_json(&entries);
    }

    println!("{}", "Driver Status Report".bold());
    println!("Root: {}", root.display());
    println!("Config: {}", origin);
    println!();

    for entry in &entries {
        let (mark, label) = match (entry.exists, entry.configured) {
            (true, true) => ("✓".green(), "configured".green()),
            (true, false) => ("⊙".yellow(), "not configured".yellow()),
            (false, _) => ("✗".red(), "missing".red()),
        };
        println!(
            "{} {} {} ({})",
            mark,
            entry.kind,
            entry.path.display(),
            label
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct RevertLine<'a> {
    path: &'a Path,
    result: RevertResult,
}

fn cmd_revert(
    journal: Option<PathBuf>,
    module: Option<String>,
    driver: Option<String>,
    kernel: Option<Kernel>,
    tree: &TreeArgs,
    json: bool,
) -> Result<()> {
    let (root, config, _) = load_tree(tree)?;
    let guard = RootGuard::new(&root, &Layout::new(&root, &config).template_root())
        .map_err(ToolError::from)?;

    let journal_path = match (journal, module, driver, kernel) {
        (Some(path), ..) => path,
        (None, Some(module), Some(driver), Some(kernel)) => {
            let module = canonical_name("module", &module)?;
            let driver = canonical_name("driver", &driver)?;
            Journal::path_for(&root, kernel, &module, &driver)
        }
        _ => {
            return Err(ToolError::InvalidArgument(
                "revert needs --journal or --module, --driver and --kernel".to_string(),
            )
            .into())
        }
    };
    if !journal_path.is_file() {
        return Err(ToolError::TargetNotExist {
            what: "journal",
            path: journal_path,
        }
        .into());
    }

    let journal = Journal::load(&journal_path).map_err(ToolError::from)?;
    let results = journal.revert(&guard).map_err(ToolError::from)?;

    let kept = results.iter().filter(|(_, r)| r.is_pending()).count();
    if kept == 0 {
        fs::remove_file(&journal_path)
            .with_context(|| format!("failed to remove {}", journal_path.display()))?;
    }

    if json {
        let lines: Vec<RevertLine<'_>> = results
            .iter()
            .map(|(path, result)| RevertLine {
                path,
                result: *result,
            })
            .collect();
        return print_json(&lines);
    }

    for (path, result) in &results {
        match result {
            RevertResult::Restored => println!("{} restored {}", "✓".green(), path.display()),
            RevertResult::Removed => println!("{} removed {}", "✓".green(), path.display()),
            RevertResult::Modified => println!(
                "{} kept {} (changed since the add)",
                "⊙".yellow(),
                path.display()
            ),
            RevertResult::Missing => {
                println!("{} {} no longer exists", "⊘".cyan(), path.display())
            }
            RevertResult::Refused => println!(
                "{} refused {} (outside the HDF root or protected)",
                "✗".red(),
                path.display()
            ),
        }
    }
    if kept > 0 {
        println!(
            "{}",
            format!("journal kept: {}", journal_path.display()).dimmed()
        );
    }

    Ok(())
}
