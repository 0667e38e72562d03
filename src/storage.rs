//! Storage abstraction used by the renderer and the materializer.
//! `OsStorage` works against the real filesystem; `MemoryStorage` keeps a
//! whole tree in memory so the pipeline can be exercised without touching disk.

use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

/// Trait for the storage backends caster reads templates from and writes trees to.
pub trait Storage: Send + Sync {
    /// Reads the full contents of a file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `content` to `path`, creating missing parent directories.
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Creates `path` and every missing ancestor.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Returns whether anything exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Returns whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;

    /// Lists the files directly inside `dir` whose name matches `pattern`,
    /// sorted by name.
    fn list_files(&self, dir: &Path, pattern: &Regex) -> io::Result<Vec<PathBuf>>;
}

/// Storage backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsStorage;

impl OsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for OsStorage {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        debug!("Writing file: {}", path.display());
        fs::write(path, content)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        debug!("Creating directory: {}", path.display());
        fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        path.try_exists()
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self, dir: &Path, pattern: &Regex) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(|name| pattern.is_match(name)) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Directory,
    File(Vec<u8>),
}

/// In-memory storage. Paths are normalized lexically, so `a/./b` and
/// `a/c/../b` address the same entry.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file, creating its parent directories.
    ///
    /// # Panics
    /// If an ancestor of `path` is already seeded as a file.
    pub fn with_file<P: AsRef<Path>, C: AsRef<[u8]>>(self, path: P, content: C) -> Self {
        if let Err(e) = self.write_file(path.as_ref(), content.as_ref()) {
            panic!("cannot seed '{}': {e}", path.as_ref().display());
        }
        self
    }

    /// Returns a copy of a file's content, or `None` if there is no file at `path`.
    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        match self.lock().get(&normalize(path)) {
            Some(Node::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
    for ancestor in path.ancestors().filter(|a| !a.as_os_str().is_empty()) {
        match nodes.get(ancestor) {
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("'{}' is a file", ancestor.display()),
                ))
            }
            Some(Node::Directory) => {}
            None => {
                nodes.insert(ancestor.to_path_buf(), Node::Directory);
            }
        }
    }
    Ok(())
}

impl Storage for MemoryStorage {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.lock().get(&normalize(path)) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Directory) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is a directory", path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("'{}' not found", path.display()),
            )),
        }
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        if let Some(Node::Directory) = nodes.get(&path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is a directory", path.display()),
            ));
        }
        if let Some(parent) = path.parent() {
            insert_dirs(&mut nodes, parent)?;
        }
        nodes.insert(path, Node::File(content.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        insert_dirs(&mut self.lock(), &normalize(path))
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.lock().contains_key(&normalize(path)))
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(matches!(self.lock().get(&normalize(path)), Some(Node::Directory)))
    }

    fn list_files(&self, dir: &Path, pattern: &Regex) -> io::Result<Vec<PathBuf>> {
        let dir = normalize(dir);
        let nodes = self.lock();
        match nodes.get(&dir) {
            Some(Node::Directory) => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory '{}' not found", dir.display()),
                ))
            }
        }
        Ok(nodes
            .iter()
            .filter(|(path, node)| {
                matches!(node, Node::File(_))
                    && path.parent() == Some(dir.as_path())
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| pattern.is_match(name))
            })
            .map(|(path, _)| path.clone())
            .collect())
    }
}
