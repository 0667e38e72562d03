//! caster materializes directory trees from templated YAML or JSON documents.
//! Variables are resolved from literals, files and the environment, the
//! document is rendered with MiniJinja, parsed, and written to the target.

/// Command-line interface module for the caster application
pub mod cli;

/// Common constants
pub mod constants;

/// Caster document model and YAML/JSON decoding
pub mod document;

/// Environment access for `CASTER_VAR_` variables
pub mod env;

/// Error types and handling for the caster application
pub mod error;

/// Filters and functions available to templates
pub mod functions;

/// Caster file lookup for file and directory templates
pub mod loader;

/// Writes parsed documents to storage
pub mod materializer;

/// Request orchestration: interpolate, apply and initialize
pub mod pipeline;

/// Template rendering, including `templatefile` composition
pub mod renderer;

/// Storage abstraction with filesystem and in-memory backends
pub mod storage;

/// Variable declarations and precedence
pub mod variables;
