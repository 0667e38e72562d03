//! Variable declarations and their resolution into the mapping templates are
//! rendered against.
//!
//! Declarations are split into two layers. Environment declarations form the
//! lowest layer. Literal and file declarations form the override layer, where
//! later declarations replace earlier ones. Any override value beats an
//! environment value of the same name, whatever their relative order.

use crate::constants::ENV_VAR_PREFIX;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::storage::Storage;
use indexmap::IndexMap;
use log::debug;
use std::path::{Path, PathBuf};

/// Resolved variables, in first-declared order.
pub type Variables = IndexMap<String, serde_json::Value>;

/// A single variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// `--var key=value`
    Literal { key: String, value: String },
    /// `--var-file path`; every top-level key of the document becomes a variable.
    File(PathBuf),
    /// An environment entry; the variable name drops the `CASTER_VAR_` prefix.
    Env(String),
}

impl Variable {
    /// Parses a `key=value` assignment. The value may contain `=`.
    pub fn from_assignment(assignment: &str) -> Result<Self> {
        match assignment.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Variable::Literal {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(Error::ConfigError(format!(
                "unable to parse var '{assignment}', expected format \"key=value\""
            ))),
        }
    }
}

/// Returns an environment declaration for every entry starting with `CASTER_VAR_`.
pub fn environment_declarations(env: &dyn Env) -> Vec<Variable> {
    let mut names: Vec<String> =
        env.names().into_iter().filter(|name| name.starts_with(ENV_VAR_PREFIX)).collect();
    names.sort();
    names.into_iter().map(Variable::Env).collect()
}

/// Merges `declarations` into one mapping.
///
/// # Errors
/// * `Error::VariableFileReadError` if a variable file cannot be read
/// * `Error::VariableFileDecodeError` if a variable file is not a key/value document
pub fn resolve(
    declarations: &[Variable],
    storage: &dyn Storage,
    env: &dyn Env,
) -> Result<Variables> {
    let mut env_layer = Variables::new();
    let mut override_layer = Variables::new();

    for declaration in declarations {
        match declaration {
            Variable::Literal { key, value } => {
                override_layer.insert(key.clone(), serde_json::Value::String(value.clone()));
            }
            Variable::File(path) => {
                for (key, value) in read_variable_file(path, storage)? {
                    override_layer.insert(key, value);
                }
            }
            Variable::Env(name) => {
                let key = name.strip_prefix(ENV_VAR_PREFIX).unwrap_or(name);
                let value = env.get(name).unwrap_or_default();
                env_layer.insert(key.to_string(), serde_json::Value::String(value));
            }
        }
    }

    let mut data = env_layer;
    data.extend(override_layer);
    debug!("Resolved variables: {:?}", data.keys().collect::<Vec<_>>());
    Ok(data)
}

fn read_variable_file(path: &Path, storage: &dyn Storage) -> Result<Variables> {
    debug!("Loading variables from {}", path.display());
    let content = storage
        .read_file(path)
        .map_err(|source| Error::VariableFileReadError { path: path.to_path_buf(), source })?;

    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Variables::new());
    }

    // JSON is a subset of YAML, so one decoder covers both formats.
    let values: Option<Variables> = serde_yaml::from_slice(&content)
        .map_err(|source| Error::VariableFileDecodeError { path: path.to_path_buf(), source })?;
    Ok(values.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn literal(key: &str, value: &str) -> Variable {
        Variable::Literal { key: key.to_string(), value: value.to_string() }
    }

    #[test]
    fn test_literal_override_beats_earlier_env() {
        let env = MemoryEnv::new().with_var("CASTER_VAR_key", "first");
        let declarations = vec![literal("key", "second"), Variable::Env("CASTER_VAR_key".into())];

        let data = resolve(&declarations, &MemoryStorage::new(), &env).unwrap();
        assert_eq!(data["key"], json!("second"));
    }

    #[test]
    fn test_literal_override_beats_later_env() {
        let env = MemoryEnv::new().with_var("CASTER_VAR_key", "first");
        let declarations = vec![Variable::Env("CASTER_VAR_key".into()), literal("key", "second")];

        let data = resolve(&declarations, &MemoryStorage::new(), &env).unwrap();
        assert_eq!(data["key"], json!("second"));
    }

    #[test]
    fn test_env_value_used_without_override() {
        let env = MemoryEnv::new().with_var("CASTER_VAR_name", "from-env");
        let declarations = vec![Variable::Env("CASTER_VAR_name".into())];

        let data = resolve(&declarations, &MemoryStorage::new(), &env).unwrap();
        assert_eq!(data["name"], json!("from-env"));
    }

    #[test]
    fn test_unset_env_is_empty_string() {
        let declarations = vec![Variable::Env("CASTER_VAR_missing".into())];

        let data = resolve(&declarations, &MemoryStorage::new(), &MemoryEnv::new()).unwrap();
        assert_eq!(data["missing"], json!(""));
    }

    #[test]
    fn test_override_order_is_tie_break() {
        let storage = MemoryStorage::new().with_file("vars.yml", "key: from-file\nother: 1\n");

        let var_after_file = vec![Variable::File("vars.yml".into()), literal("key", "from-var")];
        let data = resolve(&var_after_file, &storage, &MemoryEnv::new()).unwrap();
        assert_eq!(data["key"], json!("from-var"));
        assert_eq!(data["other"], json!(1));

        let file_after_var = vec![literal("key", "from-var"), Variable::File("vars.yml".into())];
        let data = resolve(&file_after_var, &storage, &MemoryEnv::new()).unwrap();
        assert_eq!(data["key"], json!("from-file"));
    }

    #[test]
    fn test_file_values_keep_structure() {
        let storage = MemoryStorage::new()
            .with_file("vars.json", r#"{"items": ["a", "b"], "nested": {"x": true}}"#);
        let declarations = vec![Variable::File("vars.json".into())];

        let data = resolve(&declarations, &storage, &MemoryEnv::new()).unwrap();
        assert_eq!(data["items"], json!(["a", "b"]));
        assert_eq!(data["nested"], json!({"x": true}));
    }

    #[test]
    fn test_empty_variable_file() {
        let storage = MemoryStorage::new().with_file("vars.yml", "\n");
        let declarations = vec![Variable::File("vars.yml".into())];

        let data = resolve(&declarations, &storage, &MemoryEnv::new()).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_missing_variable_file() {
        let declarations = vec![Variable::File("missing.yml".into())];

        let result = resolve(&declarations, &MemoryStorage::new(), &MemoryEnv::new());
        assert!(matches!(result, Err(Error::VariableFileReadError { .. })));
    }

    #[test]
    fn test_variable_file_not_a_mapping() {
        let storage = MemoryStorage::new().with_file("vars.yml", "- a\n- b\n");
        let declarations = vec![Variable::File("vars.yml".into())];

        let result = resolve(&declarations, &storage, &MemoryEnv::new());
        assert!(matches!(result, Err(Error::VariableFileDecodeError { .. })));
    }

    #[test]
    fn test_from_assignment() {
        assert_eq!(Variable::from_assignment("key=a=b").unwrap(), literal("key", "a=b"));
        assert_eq!(Variable::from_assignment("key=").unwrap(), literal("key", ""));
        assert!(Variable::from_assignment("key").is_err());
        assert!(Variable::from_assignment("=value").is_err());
    }

    #[test]
    fn test_environment_declarations_filter_prefix() {
        let env: MemoryEnv =
            [("PATH", "/bin"), ("CASTER_VAR_b", "2"), ("CASTER_VAR_a", "1")].into_iter().collect();

        assert_eq!(
            environment_declarations(&env),
            vec![Variable::Env("CASTER_VAR_a".into()), Variable::Env("CASTER_VAR_b".into())]
        );
    }
}
