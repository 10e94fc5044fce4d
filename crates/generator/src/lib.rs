//! Markdown rendering for swaggerdoc
//!
//! A spec that has already been acquired is turned into Markdown by one of
//! two renderers, picked by the `mode` option:
//! - [`TemplateRenderer`]: a tera template fed with the spec data
//! - [`WiddershinsConverter`]: the external `widdershins` converter

mod template_renderer;
mod templates;
mod widdershins;

pub use template_renderer::TemplateRenderer;
pub use templates::{
    render_template, render_template_tree, template_engine, DEFAULT_TEMPLATE_SOURCE, SPEC_VARIABLE,
};
pub use widdershins::{WiddershinsConverter, DEFAULT_CONVERTER};

#[cfg(test)]
use mockall::automock;
use std::path::PathBuf;
use swaggerdoc_common::{EffectiveConfig, Invocation, Mode, Result};
use tracing::debug;

/// Everything a renderer needs for one tag
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Acquired spec, staged download or local file
    pub spec: PathBuf,
    pub config: EffectiveConfig,
    pub invocation: Invocation,
}

/// Turns an acquired spec into Markdown
#[cfg_attr(test, automock)]
pub trait Renderer {
    /// Render the request.
    ///
    /// Recoverable problems are logged and yield an empty string; an `Err`
    /// aborts the tag.
    fn render(&self, request: &RenderRequest) -> Result<String>;
}

/// Routes a request to the renderer of its mode
pub struct RenderDispatcher {
    template: Box<dyn Renderer>,
    converter: Box<dyn Renderer>,
}

impl RenderDispatcher {
    /// Built-in renderers, templates resolved against `project_root`
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_renderers(
            Box::new(TemplateRenderer::new(project_root)),
            Box::new(WiddershinsConverter::new()),
        )
    }

    pub fn with_renderers(template: Box<dyn Renderer>, converter: Box<dyn Renderer>) -> Self {
        Self {
            template,
            converter,
        }
    }

    /// Swap the external converter, keeping the template renderer
    pub fn set_converter(&mut self, converter: Box<dyn Renderer>) {
        self.converter = converter;
    }

    pub fn renderer(&self, mode: Mode) -> &dyn Renderer {
        match mode {
            Mode::Jinja => self.template.as_ref(),
            Mode::Widdershins => self.converter.as_ref(),
        }
    }

    pub fn render(&self, request: &RenderRequest) -> Result<String> {
        debug!(
            mode = %request.config.mode,
            spec = %request.spec.display(),
            invocation = request.invocation.index,
            "dispatching render"
        );
        self.renderer(request.config.mode).render(request)
    }
}
