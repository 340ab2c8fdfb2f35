use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Keeps every write inside the HDF root and out of trees the tool must not
/// modify: the template directory it reads from and the build output.
#[derive(Debug, Clone)]
pub struct RootGuard {
    /// Canonical HDF root
    root: PathBuf,
    /// Canonical paths to protected directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside the HDF root: {} (root: {})", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Path is in protected directory: {} (protected: {})", .path.display(), .forbidden.display())]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl RootGuard {
    /// Guard `root`, protecting `template_root` and `<root>/out`.
    pub fn new(root: impl AsRef<Path>, template_root: &Path) -> Result<Self, SafetyError> {
        let root = root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();
        if let Ok(templates) = template_root.canonicalize() {
            forbidden_paths.push(templates);
        }
        if let Ok(out) = root.join("out").canonicalize() {
            forbidden_paths.push(out);
        }

        Ok(Self {
            root,
            forbidden_paths,
        })
    }

    /// Check an existing file. Returns its canonical path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = self.absolute(path.as_ref()).canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Check a file that may not exist yet: the deepest existing ancestor is
    /// canonicalized and the remaining components appended. `..` is refused
    /// outright since it cannot be resolved below a missing directory.
    pub fn validate_new(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        if absolute.components().any(|c| c == Component::ParentDir) {
            return Err(SafetyError::OutsideRoot {
                path: absolute,
                root: self.root.clone(),
            });
        }

        let mut existing = absolute.as_path();
        let mut missing = Vec::new();
        while !existing.exists() {
            let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                break;
            };
            missing.push(name.to_os_string());
            existing = parent;
        }

        let mut resolved = existing.canonicalize()?;
        resolved.extend(missing.iter().rev());
        self.check_canonical(&resolved)?;
        Ok(resolved)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: canonical.to_path_buf(),
                root: self.root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
