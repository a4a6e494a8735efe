//! Content-addressed source buffer management and include resolution.

pub mod loader;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Identifier for a loaded source buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

impl BufferId {
    pub const UNKNOWN: Self = BufferId(u32::MAX);
}

/// Byte position inside a loaded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub buffer: BufferId,
    pub offset: usize,
}

impl SourceLocation {
    #[must_use]
    pub fn new(buffer: BufferId, offset: usize) -> Self {
        Self { buffer, offset }
    }
}

/// An immutable loaded source file.
#[derive(Debug)]
pub struct SourceBuffer {
    pub id: BufferId,
    pub path: PathBuf,
    pub text: String,
    pub library: Option<String>,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    fn new(id: BufferId, path: PathBuf, text: String, library: Option<String>) -> Self {
        let line_starts = compute_line_starts(&text);
        Self {
            id,
            path,
            text,
            library,
            line_starts,
        }
    }

    /// 1-based line and column for a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let index = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(index).copied().unwrap_or(0);
        (index + 1, offset - line_start + 1)
    }

    /// Text of a 1-based line, without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.saturating_sub(1))?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len());
        self.text.get(start..end).map(|text| text.trim_end_matches(['\n', '\r']))
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

#[derive(Default)]
struct Inner {
    buffers: Vec<Arc<SourceBuffer>>,
    by_hash: HashMap<[u8; 32], BufferId>,
    user_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
}

/// Owns every loaded buffer and the include search configuration.
///
/// Buffers are immutable once assigned and addressed by a blake3 hash of
/// path plus contents, so loading the same file twice hands back the same
/// buffer. All methods take `&self`; the manager is safe to share with parse
/// workers that pull in include files concurrently.
#[derive(Default)]
pub struct SourceManager {
    inner: RwLock<Inner>,
}

impl SourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register text under a path, returning the buffer id. Identical
    /// path/content pairs share one buffer.
    pub fn assign_text(
        &self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        library: Option<String>,
    ) -> BufferId {
        let path = path.into();
        let text = text.into();
        let hash = content_hash(&path, &text);

        let mut inner = self.write();
        if let Some(&id) = inner.by_hash.get(&hash) {
            return id;
        }
        let id = BufferId(u32::try_from(inner.buffers.len()).unwrap_or(u32::MAX));
        inner
            .buffers
            .push(Arc::new(SourceBuffer::new(id, path, text, library)));
        inner.by_hash.insert(hash, id);
        id
    }

    /// Load a file from disk into a buffer.
    pub fn read_file(&self, path: &Path, library: Option<String>) -> io::Result<BufferId> {
        let text = fs::read_to_string(path)?;
        Ok(self.assign_text(path.to_path_buf(), text, library))
    }

    #[must_use]
    pub fn get(&self, id: BufferId) -> Option<Arc<SourceBuffer>> {
        self.read().buffers.get(id.0 as usize).cloned()
    }

    #[must_use]
    pub fn path(&self, id: BufferId) -> Option<PathBuf> {
        self.get(id).map(|buffer| buffer.path.clone())
    }

    /// Add a user include search directory. Returns false when the directory
    /// does not exist.
    pub fn add_user_directory(&self, path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        self.write().user_dirs.push(path.to_path_buf());
        true
    }

    /// Add a system include search directory. Returns false when the
    /// directory does not exist.
    pub fn add_system_directory(&self, path: &Path) -> bool {
        if !path.is_dir() {
            return false;
        }
        self.write().system_dirs.push(path.to_path_buf());
        true
    }

    /// Resolve an include file name against the includer's directory, then
    /// user directories, then system directories. Angle-bracket includes skip
    /// the includer's directory.
    #[must_use]
    pub fn resolve_include(
        &self,
        name: &str,
        includer: Option<&Path>,
        is_system: bool,
    ) -> Option<PathBuf> {
        if Path::new(name).is_absolute() {
            let path = PathBuf::from(name);
            return path.is_file().then_some(path);
        }

        if !is_system {
            if let Some(dir) = includer.and_then(Path::parent) {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        let inner = self.read();
        for dir in inner.user_dirs.iter().chain(inner.system_dirs.iter()) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn content_hash(path: &Path, text: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    *hasher.finalize().as_bytes()
}
