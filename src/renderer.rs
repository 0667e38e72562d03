//! Template renderer for caster documents.
//! Renders document text with MiniJinja, including the `templatefile`
//! function that composes other files into the output.
use crate::constants::{MAX_TEMPLATEFILE_DEPTH, ROOT_TEMPLATE_NAME};
use crate::error::Result;
use crate::functions;
use crate::storage::Storage;
use crate::variables::Variables;
use log::debug;
use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders document text with the given variables.
    ///
    /// # Arguments
    /// * `template` - Document text to render
    /// * `source_dir` - Directory `templatefile` paths are resolved against
    /// * `data` - Resolved variables
    ///
    /// # Returns
    /// * `Result<String>` - Rendered document text
    fn render(&self, template: &str, source_dir: &Path, data: &Variables) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// Environment holding the function library, cloned for every render
    env: Environment<'static>,
    storage: Arc<dyn Storage>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer whose `templatefile` reads through `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { env: base_environment(), storage }
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a caster document using MiniJinja.
    ///
    /// The whole mapping is also available as the global `vars`, so a
    /// document can hand everything to a composed file with
    /// `templatefile("part.txt", vars)`.
    ///
    /// # Errors
    /// * `Error::TemplateError` if the document or any composed file fails to
    ///   parse or render; errors from composed files are kept as the source
    fn render(&self, template: &str, source_dir: &Path, data: &Variables) -> Result<String> {
        let context = Value::from_serialize(data);
        let env = composing_environment(
            self.env.clone(),
            self.storage.clone(),
            source_dir.to_path_buf(),
            0,
            context.clone(),
        );
        Ok(env.render_named_str(ROOT_TEMPLATE_NAME, template, context)?)
    }
}

/// Environment with the caster function library but no `templatefile`.
fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    // Untouched documents must render byte for byte, whatever the file extension.
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    functions::register(&mut env);
    env
}

fn composing_environment(
    mut env: Environment<'static>,
    storage: Arc<dyn Storage>,
    dir: PathBuf,
    depth: usize,
    vars: Value,
) -> Environment<'static> {
    env.add_global("vars", vars);
    env.add_function("templatefile", move |path: String, data: Value| {
        compose(&storage, &dir, depth, &path, data)
    });
    env
}

/// Renders the file at `dir/path` against `data` alone.
fn compose(
    storage: &Arc<dyn Storage>,
    dir: &Path,
    depth: usize,
    path: &str,
    data: Value,
) -> std::result::Result<String, Error> {
    if depth >= MAX_TEMPLATEFILE_DEPTH {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("templatefile nesting exceeds {MAX_TEMPLATEFILE_DEPTH} levels at '{path}'"),
        ));
    }

    let resolved = dir.join(path);
    debug!("Composing {}", resolved.display());

    let bytes = storage.read_file(&resolved).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("templatefile cannot read '{}'", resolved.display()),
        )
        .with_source(e)
    })?;
    let content = String::from_utf8(bytes).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("templatefile '{}' is not valid UTF-8", resolved.display()),
        )
        .with_source(e)
    })?;

    let nested_dir = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
    let env =
        composing_environment(base_environment(), storage.clone(), nested_dir, depth + 1, data.clone());
    let name = resolved.display().to_string();
    env.render_named_str(&name, &content, data).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("templatefile '{path}' failed"))
            .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error as CasterError;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn renderer(storage: MemoryStorage) -> MiniJinjaRenderer {
        MiniJinjaRenderer::new(Arc::new(storage))
    }

    fn vars(pairs: &[(&str, serde_json::Value)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let text = "files:\n- name: a.txt\n  content: \"a\"\n\n";
        let rendered =
            renderer(MemoryStorage::new()).render(text, Path::new("tpl"), &Variables::new()).unwrap();
        assert_eq!(rendered, text);
    }

    #[test]
    fn test_variable_substitution() {
        let rendered = renderer(MemoryStorage::new())
            .render("{{ key }}", Path::new("tpl"), &vars(&[("key", json!("second"))]))
            .unwrap();
        assert_eq!(rendered, "second");
    }

    #[test]
    fn test_names_render_before_parsing() {
        let rendered = renderer(MemoryStorage::new())
            .render("{{\"hello\"}}{{\"world\"}}.yml", Path::new("tpl"), &Variables::new())
            .unwrap();
        assert_eq!(rendered, "helloworld.yml");
    }

    #[test]
    fn test_loops_and_conditionals() {
        let data = vars(&[("items", json!(["a", "b"])), ("enabled", json!(true))]);
        let rendered = renderer(MemoryStorage::new())
            .render(
                "{% for i in items %}{{ i }};{% endfor %}{% if enabled %}on{% endif %}",
                Path::new("tpl"),
                &data,
            )
            .unwrap();
        assert_eq!(rendered, "a;b;on");
    }

    #[test]
    fn test_templatefile_with_all_vars() {
        let storage = MemoryStorage::new().with_file("tpl/test.txt", "{{ key }}");
        let rendered = renderer(storage)
            .render(
                "{{ templatefile(\"./test.txt\", vars) }}",
                Path::new("tpl"),
                &vars(&[("key", json!("value"))]),
            )
            .unwrap();
        assert_eq!(rendered, "value");
    }

    #[test]
    fn test_templatefile_sees_only_passed_data() {
        let storage = MemoryStorage::new().with_file("tpl/item.txt", "{{ name }}-{{ outer }}");
        let rendered = renderer(storage)
            .render(
                "{% for item in items %}{{ templatefile(\"item.txt\", item) }} {% endfor %}",
                Path::new("tpl"),
                &vars(&[
                    ("items", json!([{"name": "a"}, {"name": "b"}])),
                    ("outer", json!("hidden")),
                ]),
            )
            .unwrap();
        assert_eq!(rendered, "a- b- ");
    }

    #[test]
    fn test_templatefile_yaml_part_is_not_escaped() {
        let storage = MemoryStorage::new().with_file("tpl/part.yml", "name: {{ name }}");
        let rendered = renderer(storage)
            .render(
                "{{ templatefile('part.yml', vars) }}",
                Path::new("tpl"),
                &vars(&[("name", json!("api"))]),
            )
            .unwrap();
        assert_eq!(rendered, "name: api");
    }

    #[test]
    fn test_templatefile_html_part_is_not_escaped() {
        let storage = MemoryStorage::new()
            .with_file("tpl/part.html", "<p>{{ name }}</p>")
            .with_file("tpl/data.json", "{\"name\": {{ name }}}");
        let rendered = renderer(storage)
            .render(
                "{{ templatefile('part.html', vars) }} {{ templatefile('data.json', vars) }}",
                Path::new("tpl"),
                &vars(&[("name", json!("a & b"))]),
            )
            .unwrap();
        assert_eq!(rendered, "<p>a & b</p> {\"name\": a & b}");
    }

    #[test]
    fn test_nested_templatefile_resolves_from_its_directory() {
        let storage = MemoryStorage::new()
            .with_file("tpl/parts/outer.txt", "[{{ templatefile('inner.txt', vars) }}]")
            .with_file("tpl/parts/inner.txt", "{{ key }}");
        let rendered = renderer(storage)
            .render(
                "{{ templatefile('parts/outer.txt', vars) }}",
                Path::new("tpl"),
                &vars(&[("key", json!("deep"))]),
            )
            .unwrap();
        assert_eq!(rendered, "[deep]");
    }

    #[test]
    fn test_templatefile_missing_file_fails() {
        let result = renderer(MemoryStorage::new()).render(
            "{{ templatefile('missing.txt', vars) }}",
            Path::new("tpl"),
            &Variables::new(),
        );
        match result {
            Err(CasterError::TemplateError { name, line, source }) => {
                assert_eq!(name, ROOT_TEMPLATE_NAME);
                assert_eq!(line, Some(1));
                assert!(source.to_string().contains("missing.txt"));
            }
            other => panic!("Expected TemplateError, got {other:?}"),
        }
    }

    #[test]
    fn test_templatefile_nested_error_is_preserved() {
        let storage = MemoryStorage::new().with_file("tpl/bad.txt", "ok\n{% if %}");
        let err = renderer(storage)
            .render("{{ templatefile('bad.txt', vars) }}", Path::new("tpl"), &Variables::new())
            .unwrap_err();

        let mut messages = Vec::new();
        let mut source: Option<&dyn std::error::Error> = Some(&err);
        while let Some(e) = source {
            messages.push(e.to_string());
            source = e.source();
        }
        assert!(messages.iter().any(|m| m.contains("syntax error")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("bad.txt")), "{messages:?}");
    }

    #[test]
    fn test_self_referencing_templatefile_is_bounded() {
        let storage =
            MemoryStorage::new().with_file("tpl/loop.txt", "{{ templatefile('loop.txt', vars) }}");
        let err = renderer(storage)
            .render("{{ templatefile('loop.txt', vars) }}", Path::new("tpl"), &Variables::new())
            .unwrap_err();

        let mut found = false;
        let mut source: Option<&dyn std::error::Error> = Some(&err);
        while let Some(e) = source {
            found |= e.to_string().contains("nesting exceeds");
            source = e.source();
        }
        assert!(found);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = renderer(MemoryStorage::new())
            .render("a\nb\n{{ oops", Path::new("tpl"), &Variables::new())
            .unwrap_err();
        match err {
            CasterError::TemplateError { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("Expected TemplateError, got {other:?}"),
        }
    }
}
