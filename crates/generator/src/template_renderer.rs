//! Template rendering mode

use crate::templates::{self, DEFAULT_TEMPLATE_SOURCE};
use crate::{RenderRequest, Renderer};
use std::fs;
use std::path::{Path, PathBuf};
use swaggerdoc_common::{Result, SwaggerdocError};
use swaggerdoc_parser::{load_spec, SpecDocument};
use tracing::{debug, info, warn};

/// Renders a spec through a tera template
///
/// Templates are looked up by absolute path or relative to the project
/// root. A failing template never fails the tag: the error is logged and
/// the tag contributes an empty string.
pub struct TemplateRenderer {
    project_root: PathBuf,
}

impl TemplateRenderer {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Where a template option points
    pub fn template_path(&self, template: &str) -> PathBuf {
        let path = Path::new(template);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Render a loaded document with the given template
    pub fn render_document(
        &self,
        document: SpecDocument,
        template: &str,
        use_bundled_default: bool,
    ) -> Result<String> {
        let path = self.template_path(template);

        if use_bundled_default && !path.exists() {
            materialize_default(&path)?;
        }

        let source = fs::read_to_string(&path).map_err(|e| SwaggerdocError::TemplateRender {
            template: path.display().to_string(),
            message: format!("Failed to read template: {}", e),
        })?;

        templates::render_template_tree(template, &source, &document.into_value(), |name| {
            fs::read_to_string(self.template_path(name)).ok()
        })
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, request: &RenderRequest) -> Result<String> {
        debug!("Using jinja mode");
        let config = &request.config;
        let document = load_spec(&request.spec, config.additional_json_path.as_deref())?;

        match self.render_document(document, &config.template, config.uses_default_template()) {
            Ok(markdown) => Ok(markdown),
            Err(e) => {
                warn!(template = %config.template, error = %e, "Failed to render doc template");
                Ok(String::new())
            }
        }
    }
}

fn materialize_default(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| default_template_error(path, e))?;
    }
    fs::write(path, DEFAULT_TEMPLATE_SOURCE).map_err(|e| default_template_error(path, e))?;

    info!(path = %path.display(), "Copied default template");
    Ok(())
}

fn default_template_error(path: &Path, error: std::io::Error) -> SwaggerdocError {
    SwaggerdocError::TemplateRender {
        template: path.display().to_string(),
        message: format!("Failed to write default template: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swaggerdoc_common::options::DEFAULT_TEMPLATE;
    use swaggerdoc_common::{ConfigBuilder, Layer, RawOptions, ScratchWorkspace};
    use tempfile::TempDir;

    const SPEC: &str = r#"{"swagger": "2.0", "info": {"title": "Petstore", "version": "1.0.0"}, "paths": {}}"#;

    fn request(project: &Path, extra: &[(&str, &str)]) -> RenderRequest {
        let spec = project.join("spec.json");
        fs::write(&spec, SPEC).unwrap();

        let mut tag = RawOptions::new();
        tag.insert("spec_path", "spec.json");
        for (key, value) in extra {
            tag.insert(key, *value);
        }
        let config = ConfigBuilder::new(RawOptions::defaults())
            .layer(Layer::Tag, tag, project)
            .build()
            .unwrap()
            .config;

        let mut workspace = ScratchWorkspace::create(project).unwrap();
        RenderRequest {
            spec,
            config,
            invocation: workspace.begin_invocation(),
        }
    }

    #[test]
    fn test_default_template_is_materialized() {
        let project = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer.render(&request(project.path(), &[])).unwrap();

        let written = project.path().join(DEFAULT_TEMPLATE);
        assert_eq!(fs::read_to_string(written).unwrap(), DEFAULT_TEMPLATE_SOURCE);
        assert!(markdown.starts_with("# Petstore"), "{markdown}");
    }

    #[test]
    fn test_existing_default_template_is_kept() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(DEFAULT_TEMPLATE), "custom {{ swagger_data.swagger }}").unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer.render(&request(project.path(), &[])).unwrap();

        assert_eq!(markdown, "custom 2.0");
    }

    #[test]
    fn test_custom_template_with_dumps() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("api.md.j2"),
            "{{ swagger_data.info.title }}: {{ dumps(value=swagger_data.info) }}",
        )
        .unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer
            .render(&request(project.path(), &[("template", "api.md.j2")]))
            .unwrap();

        assert_eq!(markdown, r#"Petstore: {"title":"Petstore","version":"1.0.0"}"#);
    }

    #[test]
    fn test_included_template_is_loaded_from_project_root() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("main.j2"), r#"{% include "header.j2" %} body"#).unwrap();
        fs::write(project.path().join("header.j2"), "H {{ swagger_data.info.title }}").unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer
            .render(&request(project.path(), &[("template", "main.j2")]))
            .unwrap();

        assert_eq!(markdown, "H Petstore body");
    }

    #[test]
    fn test_missing_custom_template_yields_empty_output() {
        let project = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer
            .render(&request(project.path(), &[("template", "nope.j2")]))
            .unwrap();

        assert_eq!(markdown, "");
        assert!(!project.path().join("nope.j2").exists());
    }

    #[test]
    fn test_runtime_error_yields_empty_output() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("bad.j2"), "{{ swagger_data.missing.field }}").unwrap();
        let renderer = TemplateRenderer::new(project.path());

        let markdown = renderer
            .render(&request(project.path(), &[("template", "bad.j2")]))
            .unwrap();

        assert_eq!(markdown, "");
    }

    #[test]
    fn test_unparseable_spec_is_fatal() {
        let project = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(project.path());
        let req = request(project.path(), &[]);
        fs::write(&req.spec, "{not json").unwrap();

        let err = renderer.render(&req).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_absolute_template_path() {
        let project = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(project.path());
        let elsewhere = TempDir::new().unwrap();
        let template = elsewhere.path().join("t.j2");

        assert_eq!(renderer.template_path(template.to_str().unwrap()), template);
        assert_eq!(renderer.template_path("t.j2"), project.path().join("t.j2"));
    }
}
