//! Tag scanning
//!
//! Recognized forms:
//!
//! ```text
//! <swaggerdoc spec_path="api.yaml" mode='widdershins'></swaggerdoc>
//! <swaggerdoc spec_url="[https://a/spec.json, https://b/spec.json]"/>
//! ```
//!
//! Tag bodies are ignored.

use regex::Regex;
use std::ops::Range;
use swaggerdoc_common::{OptionValue, RawOptions, Result, SwaggerdocError};

pub const TAG_NAME: &str = "swaggerdoc";

const TAG_PATTERN: &str =
    r"(?s)<swaggerdoc(?:\s+(?P<options>[^<>]*?))?\s*(?:/>|>(?P<body>.*?)</swaggerdoc\s*>)";

const OPTION_PATTERN: &str =
    r#"(?P<key>[A-Za-z_][\w-]*)\s*=\s*(?:"(?P<double>[^"]*)"|'(?P<single>[^']*)')"#;

/// One tag occurrence in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'t> {
    /// Byte range of the whole tag
    pub range: Range<usize>,
    pub text: &'t str,
    /// Raw option text, empty for a bare tag
    pub options: &'t str,
}

pub struct TagScanner {
    tag: Regex,
    option: Regex,
}

impl TagScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tag: compile(TAG_PATTERN)?,
            option: compile(OPTION_PATTERN)?,
        })
    }

    /// All tags, left to right, non-overlapping
    pub fn find<'t>(&self, text: &'t str) -> Vec<Tag<'t>> {
        self.tag
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Tag {
                    range: whole.range(),
                    text: whole.as_str(),
                    options: caps.name("options").map_or("", |m| m.as_str()),
                })
            })
            .collect()
    }

    /// Parse `key="value"` pairs; a repeated key keeps its last value
    pub fn parse_options(&self, source: &str) -> Result<RawOptions> {
        let mut options = RawOptions::new();
        let mut consumed = 0;

        for caps in self.option.captures_iter(source) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.name("key")) else {
                continue;
            };
            check_gap(source, consumed, whole.start())?;
            consumed = whole.end();

            let raw = caps
                .name("double")
                .or_else(|| caps.name("single"))
                .map_or("", |m| m.as_str());
            options.insert(key.as_str(), option_value(raw));
        }
        check_gap(source, consumed, source.len())?;

        Ok(options)
    }
}

/// Interpret an option value as YAML, keeping the raw text when it isn't
pub fn option_value(raw: &str) -> OptionValue {
    if raw.trim().is_empty() {
        return OptionValue::String(raw.to_string());
    }
    serde_yaml::from_str(raw).unwrap_or_else(|_| OptionValue::String(raw.to_string()))
}

fn check_gap(source: &str, from: usize, to: usize) -> Result<()> {
    let gap = source[from..to].trim();
    if gap.is_empty() {
        Ok(())
    } else {
        Err(SwaggerdocError::Parse(format!(
            "Malformed {TAG_NAME} tag option near `{gap}`"
        )))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SwaggerdocError::Parse(format!("Invalid tag pattern: {}", e)))
}
