//! Core orchestration: resolve variables, render the caster file, parse it and
//! write the resulting tree.

use crate::constants::{DEFAULT_CASTER_FILE, DEFAULT_DOCUMENT};
use crate::document::{self, Caster};
use crate::env::Env;
use crate::error::{Error, Result};
use crate::loader::locate;
use crate::materializer::Materializer;
use crate::renderer::{MiniJinjaRenderer, TemplateRenderer};
use crate::storage::Storage;
use crate::variables::{resolve, Variable};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Renders and parses a caster document without writing anything.
#[derive(Debug, Clone)]
pub struct InterpolateRequest {
    /// Caster file, or a directory holding exactly one
    pub template: PathBuf,
    pub variables: Vec<Variable>,
}

/// Renders a caster document and materializes it into `target`.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    /// Caster file, or a directory holding exactly one
    pub template: PathBuf,
    pub target: PathBuf,
    pub variables: Vec<Variable>,
}

/// Result of interpolating a caster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    /// Path of the caster file that was rendered
    pub source_file: PathBuf,
    pub document: Caster,
}

impl Interpolated {
    /// Directory `ref` and `templatefile` paths are relative to.
    pub fn source_dir(&self) -> &Path {
        self.source_file.parent().unwrap_or_else(|| Path::new(""))
    }

    /// The parsed document as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.document).map_err(Error::YamlEncodeError)
    }
}

/// Runs caster requests against a storage and an environment.
pub struct Pipeline {
    storage: Arc<dyn Storage>,
    env: Box<dyn Env>,
    renderer: MiniJinjaRenderer,
}

impl Pipeline {
    pub fn new(storage: Arc<dyn Storage>, env: Box<dyn Env>) -> Self {
        let renderer = MiniJinjaRenderer::new(storage.clone());
        Self { storage, env, renderer }
    }

    /// Locates, renders and parses the caster file of `request`.
    ///
    /// # Errors
    /// * Configuration errors when the caster file or a variable file cannot be found or read
    /// * `Error::TemplateError` when rendering fails
    /// * `Error::UnsupportedFormatError` or a decode error when parsing fails
    pub fn interpolate(&self, request: &InterpolateRequest) -> Result<Interpolated> {
        let source_file = locate(&*self.storage, &request.template)?;
        let content = self
            .storage
            .read_file(&source_file)
            .map_err(|e| Error::storage(&source_file, e))?;
        let content = String::from_utf8(content).map_err(|e| {
            Error::ConfigError(format!("'{}' is not valid UTF-8: {e}", source_file.display()))
        })?;

        let data = resolve(&request.variables, &*self.storage, &*self.env)?;

        let source_dir = source_file.parent().unwrap_or_else(|| Path::new(""));
        let rendered = self.renderer.render(&content, source_dir, &data)?;

        let extension =
            source_file.extension().map(|ext| ext.to_string_lossy().into_owned()).unwrap_or_default();
        let document = document::parse(&rendered, &extension)?;

        Ok(Interpolated { source_file, document })
    }

    /// Interpolates `request` and writes the document below its target.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the target is empty
    /// * Any error from [`Pipeline::interpolate`]
    /// * `Error::StorageError` when materialization fails; earlier writes are kept
    pub fn apply(&self, request: &ApplyRequest) -> Result<()> {
        if request.target.as_os_str().is_empty() {
            return Err(Error::ConfigError("target must be specified".to_string()));
        }

        let interpolated = self.interpolate(&InterpolateRequest {
            template: request.template.clone(),
            variables: request.variables.clone(),
        })?;

        debug!(
            "Applying '{}' to '{}'",
            interpolated.source_file.display(),
            request.target.display()
        );
        Materializer::new(&*self.storage, interpolated.source_dir(), &request.target)
            .materialize(&interpolated.document)
    }

    /// Writes the starter caster document. A directory gets a `.caster.yml`,
    /// any other path is used as the file name.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written caster file
    ///
    /// # Errors
    /// * `Error::ConfigError` if the caster file already exists
    pub fn initialize<P: AsRef<Path>>(&self, template: P) -> Result<PathBuf> {
        let template = template.as_ref();
        let is_dir = self.storage.is_dir(template).map_err(|e| Error::storage(template, e))?;
        let path = if is_dir { template.join(DEFAULT_CASTER_FILE) } else { template.to_path_buf() };

        if self.storage.exists(&path).map_err(|e| Error::storage(&path, e))? {
            return Err(Error::ConfigError(format!("'{}' already exists", path.display())));
        }

        debug!("Writing starter document to {}", path.display());
        self.storage
            .write_file(&path, DEFAULT_DOCUMENT.as_bytes())
            .map_err(|e| Error::storage(&path, e))?;
        Ok(path)
    }
}
