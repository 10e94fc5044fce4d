//! Option resolution
//!
//! Options reach the pipeline from three places: built-in defaults, the
//! project's global configuration and the attributes of a single tag. The
//! [`ConfigBuilder`] layers them (defaults < global < tag, highest wins per
//! key) and interprets the merged map into an [`EffectiveConfig`].
//!
//! ```rust
//! use swaggerdoc_common::{ConfigBuilder, Layer, Mode, RawOptions};
//!
//! let mut global = RawOptions::new();
//! global.insert("spec_url", "https://example.com/a.json, https://example.com/b.json");
//! let mut tag = RawOptions::new();
//! tag.insert("mode", "widdershins");
//!
//! let resolution = ConfigBuilder::new(RawOptions::defaults())
//!     .layer(Layer::Tag, tag, "docs")
//!     .layer(Layer::Global, global, ".")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(resolution.config.mode, Mode::Widdershins);
//! assert_eq!(resolution.config.spec_urls.len(), 2);
//! ```

use crate::{Mode, Result, SwaggerdocError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single option value, as written in YAML config or a tag attribute
pub type OptionValue = serde_yaml::Value;

/// Option names understood by the pipeline
pub mod keys {
    pub const SPEC_URL: &str = "spec_url";
    /// Deprecated alias of [`SPEC_URL`]
    pub const JSON_URL: &str = "json_url";
    pub const SPEC_PATH: &str = "spec_path";
    /// Deprecated alias of [`SPEC_PATH`]
    pub const JSON_PATH: &str = "json_path";
    pub const ADDITIONAL_JSON_PATH: &str = "additional_json_path";
    pub const MODE: &str = "mode";
    pub const TEMPLATE: &str = "template";
    pub const ENVIRONMENT: &str = "environment";

    /// Options holding local paths, resolved against the layer's base directory
    pub const PATH_OPTIONS: [&str; 3] = [SPEC_PATH, JSON_PATH, ADDITIONAL_JSON_PATH];

    /// At least one of these must be set
    pub const SOURCE_OPTIONS: [&str; 4] = [SPEC_URL, JSON_URL, SPEC_PATH, JSON_PATH];
}

/// Name of the bundled template
pub const DEFAULT_TEMPLATE: &str = "swagger.j2";

/// Unresolved options of one layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions(BTreeMap<String, OptionValue>);

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults
    pub fn defaults() -> Self {
        let mut options = Self::new();
        options.insert(keys::SPEC_URL, OptionValue::Sequence(Vec::new()));
        options.insert(keys::JSON_URL, OptionValue::Sequence(Vec::new()));
        options.insert(keys::SPEC_PATH, "");
        options.insert(keys::JSON_PATH, "");
        options.insert(keys::ADDITIONAL_JSON_PATH, "");
        options.insert(keys::MODE, Mode::Jinja.as_str());
        options.insert(keys::TEMPLATE, DEFAULT_TEMPLATE);
        options
    }

    /// Build options from a YAML mapping, rejecting non-string keys
    pub fn from_mapping(mapping: serde_yaml::Mapping) -> Result<Self> {
        let mut options = Self::new();
        for (key, value) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| SwaggerdocError::Config(format!("Option name {key:?} is not a string")))?
                .to_string();
            options.0.insert(key, value);
        }
        Ok(options)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Whether the option is present with a non-empty value
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !is_empty(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Source of an option layer, in increasing priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Defaults,
    Global,
    Tag,
}

/// Value of the `environment` option
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// Passed to the converter as is
    Path(String),
    /// Written to a scratch YAML file first
    Inline(OptionValue),
}

/// Fully resolved configuration for one tag
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    /// Remote candidates, tried in order
    pub spec_urls: Vec<String>,

    /// Local fallback, known to exist at resolution time
    pub spec_path: Option<PathBuf>,

    /// Secondary spec merged under the primary one
    pub additional_json_path: Option<PathBuf>,

    pub mode: Mode,

    /// Template path, absolute or relative to the project root
    pub template: String,

    pub environment: Option<Environment>,
}

impl EffectiveConfig {
    pub fn uses_default_template(&self) -> bool {
        self.template == DEFAULT_TEMPLATE
    }
}

/// Outcome of [`ConfigBuilder::build`]
#[derive(Debug)]
pub struct Resolution {
    pub config: EffectiveConfig,

    /// Non-fatal problems (missing files), left for the caller to report
    pub warnings: Vec<SwaggerdocError>,
}

/// Immutable builder layering option sources
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    layers: Vec<(Layer, RawOptions, PathBuf)>,
}

impl ConfigBuilder {
    pub fn new(defaults: RawOptions) -> Self {
        Self {
            layers: vec![(Layer::Defaults, defaults, PathBuf::new())],
        }
    }

    /// Add a layer; relative path options in it resolve against `base_dir`
    ///
    /// Layers are applied by [`Layer`] priority, not insertion order.
    pub fn layer(mut self, layer: Layer, options: RawOptions, base_dir: impl Into<PathBuf>) -> Self {
        self.layers.push((layer, options, base_dir.into()));
        self
    }

    /// Merge the layers and interpret the result
    pub fn build(&self) -> Result<Resolution> {
        let merged = self.merge();

        let is_set = |key: &str| merged.get(key).is_some_and(|(v, _)| !is_empty(v));
        if !keys::SOURCE_OPTIONS.iter().any(|&key| is_set(key)) {
            return Err(SwaggerdocError::MissingRequiredOption {
                candidates: keys::SOURCE_OPTIONS.iter().map(|k| k.to_string()).collect(),
            });
        }

        let mode = match merged.get(keys::MODE).map(|(v, _)| v) {
            Some(value) if !is_empty(value) => match scalar_to_string(value) {
                Some(s) => s.parse()?,
                None => {
                    return Err(SwaggerdocError::InvalidMode {
                        value: format!("{value:?}"),
                        allowed: Mode::ALL.iter().map(|m| m.to_string()).collect(),
                    })
                }
            },
            _ => Mode::Jinja,
        };

        let spec_urls = match [keys::SPEC_URL, keys::JSON_URL]
            .into_iter()
            .find(|&key| is_set(key))
        {
            Some(key) => parse_url_list(key, &merged[key].0)?,
            None => Vec::new(),
        };

        let mut warnings = Vec::new();
        let mut paths = BTreeMap::new();
        for key in keys::PATH_OPTIONS {
            let Some((value, base)) = merged.get(key).filter(|(v, _)| !is_empty(v)) else {
                continue;
            };
            let raw = scalar_to_string(value).ok_or_else(|| {
                SwaggerdocError::Config(format!("Option `{key}` must be a path, got {value:?}"))
            })?;
            let path = resolve_path(base, &raw);
            if path.exists() {
                paths.insert(key, path);
            } else {
                warnings.push(SwaggerdocError::MissingFile {
                    option: key.to_string(),
                    path,
                });
            }
        }

        let template = match merged.get(keys::TEMPLATE).map(|(v, _)| v) {
            Some(value) if !is_empty(value) => scalar_to_string(value).ok_or_else(|| {
                SwaggerdocError::Config(format!("Option `template` must be a path, got {value:?}"))
            })?,
            _ => DEFAULT_TEMPLATE.to_string(),
        };

        let environment = match merged.get(keys::ENVIRONMENT).map(|(v, _)| v) {
            Some(value) if !is_empty(value) => Some(parse_environment(value)?),
            _ => None,
        };

        let config = EffectiveConfig {
            spec_urls,
            spec_path: paths
                .remove(keys::SPEC_PATH)
                .or_else(|| paths.remove(keys::JSON_PATH)),
            additional_json_path: paths.remove(keys::ADDITIONAL_JSON_PATH),
            mode,
            template,
            environment,
        };

        Ok(Resolution { config, warnings })
    }

    /// Last writer wins per key, remembering the base directory of the winner
    fn merge(&self) -> BTreeMap<String, (OptionValue, PathBuf)> {
        let mut layers: Vec<_> = self.layers.iter().collect();
        layers.sort_by_key(|(layer, _, _)| *layer);

        let mut merged = BTreeMap::new();
        for (_, options, base) in layers {
            for (key, value) in options.iter() {
                merged.insert(key.clone(), (untagged(value).clone(), base.clone()));
            }
        }
        merged
    }
}

/// Strip YAML tags such as Foliant's `!path`, keeping the tagged value
fn untagged(mut value: &OptionValue) -> &OptionValue {
    while let OptionValue::Tagged(tagged) = value {
        value = &tagged.value;
    }
    value
}

fn is_empty(value: &OptionValue) -> bool {
    match untagged(value) {
        OptionValue::Null => true,
        OptionValue::String(s) => s.trim().is_empty(),
        OptionValue::Sequence(seq) => seq.is_empty(),
        OptionValue::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

fn scalar_to_string(value: &OptionValue) -> Option<String> {
    match value {
        OptionValue::String(s) => Some(s.trim().to_string()),
        OptionValue::Number(n) => Some(n.to_string()),
        OptionValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_url_list(key: &str, value: &OptionValue) -> Result<Vec<String>> {
    match value {
        OptionValue::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()),
        OptionValue::Sequence(seq) => seq
            .iter()
            .map(|item| {
                untagged(item).as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                    SwaggerdocError::Config(format!("Option `{key}` must list URLs, got {item:?}"))
                })
            })
            .collect(),
        other => Err(SwaggerdocError::Config(format!(
            "Option `{key}` must be a URL or a list of URLs, got {other:?}"
        ))),
    }
}

fn parse_environment(value: &OptionValue) -> Result<Environment> {
    match value {
        OptionValue::String(s) => Ok(Environment::Path(s.trim().to_string())),
        OptionValue::Mapping(_) | OptionValue::Sequence(_) => Ok(Environment::Inline(value.clone())),
        other => Err(SwaggerdocError::Config(format!(
            "Option `environment` must be a path or a mapping, got {other:?}"
        ))),
    }
}

fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
