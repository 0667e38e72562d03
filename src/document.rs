//! The caster document model and its YAML/JSON decoding.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Root of a caster document: the files and folders to create under the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caster {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<Folder>,
}

/// A folder and everything below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<Folder>,
}

/// Where a file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Literal content; empty for an empty file.
    Inline(String),
    /// Path relative to the caster file's directory, copied without rendering.
    Reference(PathBuf),
}

/// A file to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFile", into = "RawFile")]
pub struct File {
    pub name: String,
    pub source: FileSource,
}

impl File {
    pub fn inline<N: Into<String>, C: Into<String>>(name: N, content: C) -> Self {
        Self { name: name.into(), source: FileSource::Inline(content.into()) }
    }

    pub fn reference<N: Into<String>, P: Into<PathBuf>>(name: N, path: P) -> Self {
        Self { name: name.into(), source: FileSource::Reference(path.into()) }
    }
}

/// The on-disk shape of a file entry.
#[derive(Serialize, Deserialize)]
struct RawFile {
    #[serde(deserialize_with = "scalar_string")]
    name: String,
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "String::is_empty")]
    content: String,
    #[serde(
        default,
        rename = "ref",
        deserialize_with = "scalar_string",
        skip_serializing_if = "String::is_empty"
    )]
    reference: String,
}

impl TryFrom<RawFile> for File {
    type Error = String;

    fn try_from(raw: RawFile) -> std::result::Result<Self, Self::Error> {
        if raw.name.is_empty() {
            return Err("file name must not be empty".to_string());
        }
        // Inline content wins; `ref` is only consulted when there is none.
        let source = if raw.content.is_empty() && !raw.reference.is_empty() {
            FileSource::Reference(PathBuf::from(raw.reference))
        } else {
            FileSource::Inline(raw.content)
        };
        Ok(File { name: raw.name, source })
    }
}

impl From<File> for RawFile {
    fn from(file: File) -> Self {
        let (content, reference) = match file.source {
            FileSource::Inline(content) => (content, String::new()),
            FileSource::Reference(path) => (String::new(), path.to_string_lossy().into_owned()),
        };
        RawFile { name: file.name, content, reference }
    }
}

/// Accepts any scalar where a string is expected, so `content: 8080` or
/// `content: true` decode the way they read. Null becomes the empty string.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Bool(bool),
        Int(i64),
        UInt(u64),
        Float(f64),
        Null(()),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::UInt(u) => u.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Null(()) => String::new(),
    })
}

/// Decodes rendered document text. `extension` is the caster file's
/// extension, with or without the leading dot.
///
/// # Errors
/// * `Error::UnsupportedFormatError` if the extension is not yml, yaml or json
/// * `Error::YamlDecodeError` / `Error::JsonDecodeError` if the text is not a caster document
pub fn parse(rendered: &str, extension: &str) -> Result<Caster> {
    match extension.trim_start_matches('.') {
        "yml" | "yaml" => {
            if rendered.trim().is_empty() {
                return Ok(Caster::default());
            }
            serde_yaml::from_str(rendered).map_err(Error::YamlDecodeError)
        }
        "json" => serde_json::from_str(rendered).map_err(Error::JsonDecodeError),
        other => Err(Error::UnsupportedFormatError { extension: other.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"files:
- name: test.yml
  content: "test: test"
folders:
- name: sub
  files:
  - name: test.yml
    ref: template.txt
"#;

    #[test]
    fn test_parse_yaml() {
        let caster = parse(YAML, "yml").unwrap();
        assert_eq!(
            caster,
            Caster {
                files: vec![File::inline("test.yml", "test: test")],
                folders: vec![Folder {
                    name: "sub".to_string(),
                    files: vec![File::reference("test.yml", "template.txt")],
                    folders: vec![],
                }],
            }
        );
    }

    #[test]
    fn test_parse_json_matches_yaml() {
        let json = r#"{
            "files": [{"name": "test.yml", "content": "test: test"}],
            "folders": [{"name": "sub", "files": [{"name": "test.yml", "ref": "template.txt"}]}]
        }"#;
        assert_eq!(parse(json, ".json").unwrap(), parse(YAML, ".yaml").unwrap());
    }

    #[test]
    fn test_content_wins_over_ref() {
        let caster = parse("files:\n- name: a\n  content: x\n  ref: b\n", "yml").unwrap();
        assert_eq!(caster.files[0].source, FileSource::Inline("x".to_string()));
    }

    #[test]
    fn test_empty_file_entry() {
        let caster = parse("files:\n- name: empty.txt\n", "yml").unwrap();
        assert_eq!(caster.files[0], File::inline("empty.txt", ""));
    }

    #[test]
    fn test_scalar_content() {
        let caster = parse("files:\n- name: port\n  content: 8080\n- name: 1\n", "yml").unwrap();
        assert_eq!(caster.files[0], File::inline("port", "8080"));
        assert_eq!(caster.files[1].name, "1");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse("", "yml").unwrap(), Caster::default());
        assert_eq!(parse("{}", "json").unwrap(), Caster::default());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let caster = parse("files:\n- name: a\n- name: a\n", "yml").unwrap();
        assert_eq!(caster.files.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = parse("files: []", "toml");
        assert!(matches!(result, Err(Error::UnsupportedFormatError { extension }) if extension == "toml"));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(parse("files: 3", "yml"), Err(Error::YamlDecodeError(_))));
        assert!(matches!(parse("{\"files\": 3}", "json"), Err(Error::JsonDecodeError(_))));
        assert!(matches!(parse("files:\n- content: x\n", "yml"), Err(Error::YamlDecodeError(_))));
        assert!(matches!(parse("files:\n- name: \"\"\n", "yml"), Err(Error::YamlDecodeError(_))));
    }

    #[test]
    fn test_serialize_round_trip() {
        let caster = parse(YAML, "yml").unwrap();
        let yaml = serde_yaml::to_string(&caster).unwrap();
        assert!(yaml.contains("ref: template.txt"));
        assert!(!yaml.contains("content: ''"));
        assert_eq!(parse(&yaml, "yml").unwrap(), caster);
    }
}
