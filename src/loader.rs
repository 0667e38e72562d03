//! Locates the caster file a request points at.
use crate::constants::CASTER_FILE_PATTERN;
use crate::error::{Error, Result};
use crate::storage::Storage;
use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Represents what the template argument of a request points at.
#[derive(Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// A caster file given directly
    File(PathBuf),
    /// A directory expected to hold exactly one caster file
    Directory(PathBuf),
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::File(path) => write!(f, "caster file: '{}'", path.display()),
            TemplateSource::Directory(path) => {
                write!(f, "template directory: '{}'", path.display())
            }
        }
    }
}

impl TemplateSource {
    /// Classifies `template` by looking it up in `storage`.
    ///
    /// # Errors
    /// * `Error::SourceNotFoundError` if nothing exists at `template`
    pub fn from_path<P: AsRef<Path>>(storage: &dyn Storage, template: P) -> Result<Self> {
        let template = template.as_ref();
        let storage_err = |e| Error::storage(template, e);
        if !storage.exists(template).map_err(storage_err)? {
            return Err(Error::SourceNotFoundError { path: template.to_path_buf() });
        }
        if storage.is_dir(template).map_err(storage_err)? {
            Ok(Self::Directory(template.to_path_buf()))
        } else {
            Ok(Self::File(template.to_path_buf()))
        }
    }

    /// Returns the path of the caster file.
    ///
    /// # Errors
    /// * `Error::SourceMissingCasterFileError` if a directory has no caster file
    /// * `Error::SourceAmbiguousError` if a directory has more than one
    pub fn caster_file(&self, storage: &dyn Storage) -> Result<PathBuf> {
        let directory = match self {
            TemplateSource::File(path) => return Ok(path.clone()),
            TemplateSource::Directory(directory) => directory,
        };

        let pattern = Regex::new(CASTER_FILE_PATTERN)
            .map_err(|e| Error::ConfigError(format!("invalid caster file pattern: {e}")))?;
        let mut candidates = storage
            .list_files(directory, &pattern)
            .map_err(|e| Error::storage(directory, e))?;

        match candidates.len() {
            0 => Err(Error::SourceMissingCasterFileError { directory: directory.clone() }),
            1 => Ok(candidates.remove(0)),
            _ => Err(Error::SourceAmbiguousError {
                directory: directory.clone(),
                candidates: candidates
                    .iter()
                    .filter_map(|c| c.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect(),
            }),
        }
    }
}

/// Returns the caster file for the provided template path.
pub fn locate<P: AsRef<Path>>(storage: &dyn Storage, template: P) -> Result<PathBuf> {
    let source = TemplateSource::from_path(storage, template)?;
    debug!("Using template from the {source}");
    let caster_file = source.caster_file(storage)?;
    debug!("Using caster file '{}'", caster_file.display());
    Ok(caster_file)
}
