//! Spec document loading

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use swaggerdoc_common::{Result, SwaggerdocError};
use tracing::{debug, warn};

/// Serialization format of a spec file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// Detect the format from the file extension, falling back to the content
    ///
    /// Downloaded specs are staged without an extension, so content sniffing
    /// is the common path for remote sources.
    pub fn detect(path: &Path, content: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => SpecFormat::Json,
            Some("yaml") | Some("yml") => SpecFormat::Yaml,
            _ => Self::sniff(content),
        }
    }

    /// Guess the format from the first significant character
    pub fn sniff(content: &str) -> Self {
        match content.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('{') | Some('[') => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecFormat::Json => write!(f, "JSON"),
            SpecFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// Parsed Swagger/OpenAPI document
///
/// The content is kept as an untyped, order-preserving mapping: templates
/// decide what to read from it, and no schema validation happens here.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    data: Map<String, Value>,
    format: SpecFormat,
}

/// Title and version from the `info` object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpecInfo {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub version: String,
}

impl SpecDocument {
    /// Load a spec from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SwaggerdocError::Parse(format!(
                "Failed to read spec file {}: {}",
                path.display(),
                e
            ))
        })?;

        let format = SpecFormat::detect(path, &content);
        debug!(path = %path.display(), %format, "loading spec");

        Self::parse(&content, format).map_err(|e| match e {
            SwaggerdocError::Parse(msg) => {
                SwaggerdocError::Parse(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse spec text in the given format
    ///
    /// Text that isn't valid JSON is retried as YAML, which accepts JSON as
    /// well, so a YAML spec saved with a `.json` name still loads. The JSON
    /// error is reported when both fail.
    pub fn parse(content: &str, format: SpecFormat) -> Result<Self> {
        let (value, format) = match format {
            SpecFormat::Json => match serde_json::from_str(content) {
                Ok(value) => (value, SpecFormat::Json),
                Err(json_error) => match parse_yaml(content) {
                    Ok(value) => {
                        warn!("Spec is not valid JSON, loaded it as YAML");
                        (value, SpecFormat::Yaml)
                    }
                    Err(_) => {
                        return Err(SwaggerdocError::Parse(format!(
                            "Failed to parse spec JSON: {}",
                            json_error
                        )))
                    }
                },
            },
            SpecFormat::Yaml => (parse_yaml(content)?, SpecFormat::Yaml),
        };

        match value {
            Value::Object(data) => Ok(Self { data, format }),
            other => Err(SwaggerdocError::Parse(format!(
                "Spec must be a mapping at the top level, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::parse(json, SpecFormat::Json)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, SpecFormat::Yaml)
    }

    pub fn format(&self) -> SpecFormat {
        self.format
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    /// Overlay this document on `secondary`
    ///
    /// Shallow: only top-level keys are considered and this document's value
    /// wins on every collision. Keys keep the secondary's order, primary-only
    /// keys follow.
    pub fn merged_over(self, secondary: SpecDocument) -> SpecDocument {
        let mut data = secondary.data;
        for (key, value) in self.data {
            data.insert(key, value);
        }

        SpecDocument {
            data,
            format: self.format,
        }
    }

    /// `info.title` and `info.version`, if present
    pub fn info(&self) -> Option<SpecInfo> {
        self.data
            .get("info")
            .and_then(|info| SpecInfo::deserialize(info).ok())
    }

    /// Swagger 2 (`swagger`) or OpenAPI 3 (`openapi`) version string
    pub fn spec_version(&self) -> Option<&str> {
        self.data
            .get("openapi")
            .or_else(|| self.data.get("swagger"))
            .and_then(Value::as_str)
    }

    pub fn path_count(&self) -> usize {
        self.data
            .get("paths")
            .and_then(Value::as_object)
            .map_or(0, Map::len)
    }
}

/// Load the primary spec and merge the optional additional spec under it
///
/// A missing additional file is reported and otherwise ignored.
pub fn load_spec(primary: &Path, additional: Option<&Path>) -> Result<SpecDocument> {
    let document = SpecDocument::from_file(primary)?;

    let Some(additional) = additional else {
        return Ok(document);
    };

    if !additional.exists() {
        warn!(
            path = %additional.display(),
            "Additional swagger spec file is missing. Skipping"
        );
        return Ok(document);
    }

    let secondary = SpecDocument::from_file(additional)?;
    debug!(path = %additional.display(), "merging additional spec");
    Ok(document.merged_over(secondary))
}

fn parse_yaml(content: &str) -> Result<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| SwaggerdocError::Parse(format!("Failed to parse spec YAML: {}", e)))?;
    yaml_to_json(yaml)
}

/// Convert YAML into JSON values, stringifying scalar mapping keys
///
/// YAML specs commonly use bare response codes (`200:`) as keys, which JSON
/// can only express as strings.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| {
                        SwaggerdocError::Parse(format!("Number {} cannot be represented in JSON", n))
                    })?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        other => Err(SwaggerdocError::Parse(format!(
            "Unsupported mapping key {:?}",
            other
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
