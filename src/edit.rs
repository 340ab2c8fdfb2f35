use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A target file held in memory as an ordered sequence of lines.
///
/// Each line keeps its own `\n` terminator (the last one may lack it), so
/// concatenating the lines reproduces the file byte for byte. Fragments are
/// spliced in as single entries and may themselves span several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    path: PathBuf,
    lines: Vec<String>,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not valid UTF-8")]
    Utf8(PathBuf),

    #[error("Path has no parent directory: {0}")]
    NoParent(PathBuf),
}

impl EditError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        EditError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl TextFile {
    /// Read the whole file into memory.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EditError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| EditError::io(&path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| EditError::Utf8(path.clone()))?;
        Ok(Self::from_text(path, &text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Insert `fragment` so that it starts at `index`, pushing the existing
    /// line at `index` (and everything after it) down. Indices past the end
    /// append.
    pub fn insert(&mut self, index: usize, fragment: impl Into<String>) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, fragment.into());
    }

    /// Append `fragment` at end of file, first terminating an unterminated
    /// last line.
    pub fn append(&mut self, fragment: impl Into<String>) {
        self.ensure_trailing_newline();
        self.lines.push(fragment.into());
    }

    pub fn replace_line(&mut self, index: usize, line: impl Into<String>) {
        if let Some(slot) = self.lines.get_mut(index) {
            *slot = line.into();
        }
    }

    /// Keep only the lines for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.lines.retain(|line| keep(line));
    }

    pub fn ensure_trailing_newline(&mut self) {
        if let Some(last) = self.lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
    }

    pub fn contents(&self) -> String {
        self.lines.concat()
    }

    /// Overwrite the file on disk with the current line sequence.
    pub fn save(&self) -> Result<(), EditError> {
        atomic_write(&self.path, self.contents().as_bytes())
    }
}

/// Atomic file write: tempfile + fsync + rename, then bump mtime so
/// incremental builds notice the change.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => return Err(EditError::NoParent(path.to_path_buf())),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| EditError::io(path, e))?;
    temp.write_all(content).map_err(|e| EditError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| EditError::io(path, e))?;
    temp.persist(path).map_err(|e| EditError::io(path, e.error))?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now).map_err(|e| EditError::io(path, e))?;

    Ok(())
}
