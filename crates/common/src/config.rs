//! Global configuration loading
//!
//! The global layer can come from three YAML shapes:
//! - a Foliant project file with a `preprocessors` list containing a
//!   `swaggerdoc` entry,
//! - a mapping with a top-level `swaggerdoc` key,
//! - a bare mapping of option names.

use crate::{RawOptions, Result, SwaggerdocError};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Preprocessor name looked up in project files
pub const PREPROCESSOR_NAME: &str = "swaggerdoc";

/// Files looked up in the project root when no config is given, in order
pub const CONFIG_CANDIDATES: [&str; 3] = ["swaggerdoc.yml", "swaggerdoc.yaml", "foliant.yml"];

/// First config candidate present in `project_root`
pub fn discover_config(project_root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
}

/// Read the global options from a YAML file
pub fn load_global_options(path: &Path) -> Result<RawOptions> {
    let content = fs::read_to_string(path).map_err(|e| {
        SwaggerdocError::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    parse_global_options(&content)
}

/// Parse global options from YAML text
pub fn parse_global_options(content: &str) -> Result<RawOptions> {
    let value: Value = serde_yaml::from_str(content)?;

    let mapping = match value {
        Value::Null => return Ok(RawOptions::new()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(SwaggerdocError::Config(format!(
                "Config must be a mapping, got {other:?}"
            )))
        }
    };

    if let Some(preprocessors) = mapping.get("preprocessors") {
        return from_preprocessor_list(preprocessors);
    }

    match mapping.get(PREPROCESSOR_NAME) {
        Some(section) => section_options(section),
        None => RawOptions::from_mapping(mapping),
    }
}

fn from_preprocessor_list(list: &Value) -> Result<RawOptions> {
    let Value::Sequence(entries) = list else {
        return Err(SwaggerdocError::Config(
            "`preprocessors` must be a list".to_string(),
        ));
    };

    for entry in entries {
        match entry {
            Value::String(name) if name == PREPROCESSOR_NAME => return Ok(RawOptions::new()),
            Value::Mapping(mapping) => {
                if let Some(section) = mapping.get(PREPROCESSOR_NAME) {
                    return section_options(section);
                }
            }
            _ => {}
        }
    }

    Ok(RawOptions::new())
}

fn section_options(section: &Value) -> Result<RawOptions> {
    match section {
        Value::Null => Ok(RawOptions::new()),
        Value::Mapping(mapping) => RawOptions::from_mapping(mapping.clone()),
        other => Err(SwaggerdocError::Config(format!(
            "`{PREPROCESSOR_NAME}` options must be a mapping, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_mapping() {
        let options = parse_global_options("json_path: petstore_spec.json\nmode: jinja\n").unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(
            options.get("json_path").and_then(|v| v.as_str()),
            Some("petstore_spec.json")
        );
    }

    #[test]
    fn test_foliant_project_file() {
        let content = r#"
title: API docs
chapters:
  - index.md
preprocessors:
  - includes
  - swaggerdoc:
      spec_url:
        - https://example.com/swagger.json
      mode: widdershins
      environment:
        language_tabs:
          - shell
"#;
        let options = parse_global_options(content).unwrap();
        assert_eq!(options.len(), 3);
        assert!(options.is_set("spec_url"));
        assert!(options.get("environment").unwrap().is_mapping());
    }

    #[test]
    fn test_bare_preprocessor_name() {
        let options = parse_global_options("preprocessors:\n  - swaggerdoc\n").unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_named_section() {
        let options = parse_global_options("swaggerdoc:\n  spec_path: api.yaml\n").unwrap();
        assert!(options.is_set("spec_path"));
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_global_options("").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_scalar() {
        assert!(parse_global_options("just a string").is_err());
    }

    #[test]
    fn test_discover_config_prefers_dedicated_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(discover_config(dir.path()), None);

        fs::write(dir.path().join("foliant.yml"), "title: docs\n").unwrap();
        assert_eq!(discover_config(dir.path()), Some(dir.path().join("foliant.yml")));

        fs::write(dir.path().join("swaggerdoc.yml"), "mode: jinja\n").unwrap();
        assert_eq!(discover_config(dir.path()), Some(dir.path().join("swaggerdoc.yml")));
    }

    #[test]
    fn test_foliant_path_tags_resolve_like_plain_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("api.yaml"), "swagger: '2.0'\n").unwrap();
        let content = r#"
preprocessors:
  - swaggerdoc:
      spec_path: !path api.yaml
      spec_url:
        - !project_path mirror.json
"#;

        let options = parse_global_options(content).unwrap();
        let resolution = crate::ConfigBuilder::new(RawOptions::defaults())
            .layer(crate::Layer::Global, options, dir.path())
            .build()
            .unwrap();

        assert_eq!(resolution.config.spec_path, Some(dir.path().join("api.yaml")));
        assert_eq!(resolution.config.spec_urls, vec!["mirror.json"]);
        assert!(resolution.warnings.is_empty());
    }
}
