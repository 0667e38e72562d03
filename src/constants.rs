//! Common constants used throughout caster.

/// Prefix of environment entries that become template variables.
pub const ENV_VAR_PREFIX: &str = "CASTER_VAR_";

/// Pattern matching caster files inside a template directory.
pub const CASTER_FILE_PATTERN: &str = r"[.]caster[.](yml|yaml|json)$";

/// File name written by `caster init` when given a directory.
pub const DEFAULT_CASTER_FILE: &str = ".caster.yml";

/// Starter document written by `caster init`.
pub const DEFAULT_DOCUMENT: &str = "files:\n- name: hello.txt\n  content: \"hello world\"\n";

/// Name under which the rendered caster file is registered in the template environment.
pub const ROOT_TEMPLATE_NAME: &str = "caster";

/// How deep `templatefile` calls may nest before rendering is aborted.
pub const MAX_TEMPLATEFILE_DEPTH: usize = 32;
