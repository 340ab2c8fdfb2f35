//! HDF Scaffold: driver scaffolding for the HDF driver framework
//!
//! Adding a driver to an HDF source tree means generating its source and
//! header from module templates, then registering it in a handful of build
//! files that each have their own format: `BUILD.gn`, a kernel Makefile,
//! `Kconfig`, the board's `device_info.hcs` and the board `.config` files.
//!
//! # Architecture
//!
//! Every build-file edit is a line insertion at a position found by a
//! marker scan ([`locate`]), with a fragment rendered from a fixed template
//! ([`template`]) whose paths are rewritten against the macros the target
//! file defines ([`relativize`]). The per-file rules live in [`patch`];
//! [`scaffold::DriverScaffolder`] runs them in the order the kernel flavor
//! requires.
//!
//! # Safety
//!
//! - Every patcher is idempotent: a file that already names the driver is
//!   left untouched
//! - Atomic file writes (tempfile + fsync + rename)
//! - Writes are confined to the HDF root and kept out of the template tree
//! - Each run is journaled so it can be reverted
//!
//! # Example
//!
//! ```no_run
//! use hdf_scaffold::{DriverIdentity, DriverScaffolder, Kernel, ToolConfig};
//! use std::path::Path;
//!
//! let identity = DriverIdentity::new(
//!     "sensor", "bmi160", Kernel::Liteos, "hisilicon", "hispark_taurus", "accel",
//! )?;
//! let config = ToolConfig::default();
//! let report = DriverScaffolder::new(&identity, Path::new("/src/hdf"), &config)?.run()?;
//! for entry in &report.entries {
//!     println!("{}", entry.outcome);
//! }
//! # Ok::<(), hdf_scaffold::ToolError>(())
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod journal;
pub mod layout;
pub mod locate;
pub mod naming;
pub mod patch;
pub mod relativize;
pub mod safety;
pub mod scaffold;
pub mod settings;
pub mod template;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, ConfigOrigin, ToolConfig};
pub use edit::{EditError, TextFile};
pub use error::{ErrorCode, ToolError};
pub use journal::{Journal, JournalError, RevertResult};
pub use layout::Layout;
pub use locate::{locate, Anchor, MacroTable, Marker};
pub use naming::{DriverIdentity, Kernel, WordsConverter};
pub use patch::{PatchContext, PatchOutcome};
pub use relativize::{PathRole, Relativized, Relativizer};
pub use safety::{RootGuard, SafetyError};
pub use scaffold::{AddReport, DriverScaffolder, FileKind, StatusEntry};
pub use settings::{SettingsError, SettingsStore};
pub use template::{Template, TemplateError, Vars};
