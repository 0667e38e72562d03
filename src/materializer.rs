//! Writes a parsed caster document to the target directory.
//!
//! The walk is depth-first and follows document order, with the files of a
//! level written before its folders. Nothing is rolled back on failure: files
//! written before the first error stay where they are.

use crate::document::{Caster, File, FileSource, Folder};
use crate::error::{Error, Result};
use crate::storage::Storage;
use log::debug;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Materializes caster documents through a [`Storage`].
pub struct Materializer<'a> {
    storage: &'a dyn Storage,
    /// Directory of the caster file; `ref` paths are resolved against it
    source_dir: &'a Path,
    target_root: &'a Path,
}

impl<'a> Materializer<'a> {
    pub fn new(storage: &'a dyn Storage, source_dir: &'a Path, target_root: &'a Path) -> Self {
        Self { storage, source_dir, target_root }
    }

    /// Writes `document` below the target root.
    ///
    /// # Errors
    /// * `Error::StorageError` for the first read, write or mkdir that fails
    pub fn materialize(&self, document: &Caster) -> Result<()> {
        debug!("Materializing into {}", self.target_root.display());
        let root = Path::new("");
        self.write_files(&document.files, root)?;

        // The root must exist even when the document has no top-level files.
        let exists = self
            .storage
            .exists(self.target_root)
            .map_err(|e| Error::storage(self.target_root, e))?;
        if !exists {
            self.storage
                .create_dir_all(self.target_root)
                .map_err(|e| Error::storage(self.target_root, e))?;
        }

        self.write_folders(&document.folders, root)
    }

    fn write_folders(&self, folders: &[Folder], relative: &Path) -> Result<()> {
        for folder in folders {
            let relative = relative.join(relative_part(&folder.name));
            let target_path = self.target_root.join(&relative);
            debug!("Creating folder: {}", target_path.display());
            self.storage
                .create_dir_all(&target_path)
                .map_err(|e| Error::storage(&target_path, e))?;

            self.write_files(&folder.files, &relative)?;
            self.write_folders(&folder.folders, &relative)?;
        }
        Ok(())
    }

    fn write_files(&self, files: &[File], relative: &Path) -> Result<()> {
        for file in files {
            let target_path = self.target_root.join(relative.join(relative_part(&file.name)));
            let content = self.content_of(file)?;
            debug!("Writing file: {}", target_path.display());
            self.storage
                .write_file(&target_path, &content)
                .map_err(|e| Error::storage(&target_path, e))?;
        }
        Ok(())
    }

    /// Inline content as is, or the verbatim bytes of the referenced file.
    fn content_of<'f>(&self, file: &'f File) -> Result<Cow<'f, [u8]>> {
        match &file.source {
            FileSource::Inline(content) => Ok(Cow::Borrowed(content.as_bytes())),
            FileSource::Reference(reference) => {
                let path: PathBuf = self.source_dir.join(relative_part(reference));
                debug!("Copying {} into {}", path.display(), file.name);
                let bytes = self.storage.read_file(&path).map_err(|e| Error::storage(&path, e))?;
                Ok(Cow::Owned(bytes))
            }
        }
    }
}

/// Drops root and prefix components so `path` always joins below its base.
fn relative_part<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref()
        .components()
        .filter(|component| !matches!(component, Component::RootDir | Component::Prefix(_)))
        .collect()
}
