//! Template engine setup

use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::{HashMap, HashSet};
use swaggerdoc_common::{Result, SwaggerdocError};
use tera::{Context, Tera, Value};
use tracing::debug;

/// Bundled default template, written to the project on first use
pub const DEFAULT_TEMPLATE_SOURCE: &str = include_str!("../templates/swagger.j2");

/// Context variable holding the spec
pub const SPEC_VARIABLE: &str = "swagger_data";

/// JSON serialization helper, registered as a function and a filter
pub const DUMPS: &str = "dumps";

/// Target of an `include`, `extends` or `import` block
const REFERENCE_PATTERN: &str = r#"\{%-?\s*(?:include|extends|import)\s+["']([^"']+)["']"#;

/// Create an engine with the swaggerdoc helpers registered
///
/// Autoescaping is disabled: the output is Markdown, not HTML.
pub fn template_engine() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.register_function(DUMPS, dumps_function);
    tera.register_filter(DUMPS, dumps_filter);
    tera
}

/// Render one template source against the spec data
pub fn render_template(name: &str, source: &str, swagger_data: &Value) -> Result<String> {
    render_template_tree(name, source, swagger_data, |_| None)
}

/// Render a template together with the templates it pulls in
///
/// `load` maps a referenced name to its source. Names it can't resolve are
/// left for tera to report, unless the block says `ignore missing`.
pub fn render_template_tree<F>(
    name: &str,
    source: &str,
    swagger_data: &Value,
    mut load: F,
) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let reference = Regex::new(REFERENCE_PATTERN).map_err(|e| SwaggerdocError::TemplateRender {
        template: name.to_string(),
        message: e.to_string(),
    })?;

    let mut seen = HashSet::from([name.to_string()]);
    let mut sources = vec![(name.to_string(), source.to_string())];
    let mut next = 0;
    while next < sources.len() {
        let referenced: Vec<String> = reference
            .captures_iter(&sources[next].1)
            .map(|captures| captures[1].to_string())
            .collect();
        next += 1;

        for dependency in referenced {
            if !seen.insert(dependency.clone()) {
                continue;
            }
            match load(&dependency) {
                Some(source) => {
                    debug!(template = %dependency, "Loaded referenced template");
                    sources.push((dependency, source));
                }
                None => debug!(template = %dependency, "Referenced template not found"),
            }
        }
    }

    let mut tera = template_engine();
    tera.add_raw_templates(sources)
        .map_err(|e| template_error(name, &e))?;

    let mut context = Context::new();
    context.insert(SPEC_VARIABLE, swagger_data);

    tera.render(name, &context)
        .map_err(|e| template_error(name, &e))
}

fn template_error(name: &str, error: &tera::Error) -> SwaggerdocError {
    SwaggerdocError::TemplateRender {
        template: name.to_string(),
        message: error_chain(error),
    }
}

/// Join an error and all of its sources
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// `dumps(value=..., indent=...)`
fn dumps_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let value = args
        .get("value")
        .ok_or_else(|| tera::Error::msg("dumps expects a `value` argument"))?;

    dumps(value, indent_arg(args)?).map(Value::String)
}

/// `value | dumps(indent=...)`
fn dumps_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    dumps(value, indent_arg(args)?).map(Value::String)
}

fn indent_arg(args: &HashMap<String, Value>) -> tera::Result<Option<usize>> {
    match args.get("indent") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| tera::Error::msg("dumps `indent` must be a non-negative integer")),
    }
}

fn dumps(value: &Value, indent: Option<usize>) -> tera::Result<String> {
    let Some(indent) = indent else {
        return serde_json::to_string(value).map_err(tera::Error::json);
    };

    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut serializer).map_err(tera::Error::json)?;

    String::from_utf8(buf).map_err(|e| tera::Error::msg(e.to_string()))
}
