//! Markdown preprocessing for swaggerdoc
//!
//! Every `<swaggerdoc>` tag in a document is replaced with documentation
//! rendered from the spec it points to. Each tag goes through the same
//! pipeline:
//!
//! 1. reserve scratch file names for the invocation
//! 2. resolve options (defaults, global config, tag)
//! 3. acquire the spec from URL candidates or a local fallback
//! 4. render it in the selected mode
//!
//! Documents are scanned once; rendered text is never rescanned for tags.

mod tag;

pub use tag::{option_value, Tag, TagScanner, TAG_NAME};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use swaggerdoc_common::workspace::SCRATCH_DIR_NAME;
use swaggerdoc_common::{
    ConfigBuilder, Invocation, Layer, RawOptions, Result, ScratchWorkspace, SwaggerdocError,
};
use swaggerdoc_generator::{RenderDispatcher, RenderRequest, Renderer, WiddershinsConverter};
use swaggerdoc_parser::{HttpFetcher, SpecAcquirer};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// What happens to a tag whose pipeline fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error and replace the tag with nothing
    #[default]
    Skip,
    /// Log the error and leave the tag text untouched
    KeepTag,
    /// Stop processing and return the error
    Abort,
}

impl FailurePolicy {
    pub const ALL: [FailurePolicy; 3] = [
        FailurePolicy::Skip,
        FailurePolicy::KeepTag,
        FailurePolicy::Abort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Skip => "skip",
            FailurePolicy::KeepTag => "keep",
            FailurePolicy::Abort => "abort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = SwaggerdocError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                SwaggerdocError::Config(format!(
                    "Invalid failure policy `{}`, expected one of: skip, keep, abort",
                    s
                ))
            })
    }
}

/// Counters of one [`Preprocessor::apply`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub tags_rendered: usize,
    pub tags_failed: usize,
    /// URL candidates that failed before another source was used
    pub sources_skipped: usize,
}

/// Configures a [`Preprocessor`]
pub struct PreprocessorBuilder {
    project_root: PathBuf,
    global: RawOptions,
    policy: FailurePolicy,
    converter: Option<String>,
    timeout: Option<Duration>,
    renderers: Option<(Box<dyn Renderer>, Box<dyn Renderer>)>,
}

impl PreprocessorBuilder {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            global: RawOptions::new(),
            policy: FailurePolicy::default(),
            converter: None,
            timeout: None,
            renderers: None,
        }
    }

    /// Global options; relative paths in them resolve against the project root
    pub fn global_options(mut self, options: RawOptions) -> Self {
        self.global = options;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Command line used instead of `widdershins`
    pub fn converter(mut self, command: impl Into<String>) -> Self {
        self.converter = Some(command.into());
        self
    }

    /// Per-request timeout for spec downloads
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace both renderers; takes precedence over [`Self::converter`]
    pub fn renderers(mut self, template: Box<dyn Renderer>, converter: Box<dyn Renderer>) -> Self {
        self.renderers = Some((template, converter));
        self
    }

    /// Build the preprocessor, resetting the scratch workspace
    pub fn build(self) -> Result<Preprocessor> {
        let dispatcher = match self.renderers {
            Some((template, converter)) => RenderDispatcher::with_renderers(template, converter),
            None => {
                let mut dispatcher = RenderDispatcher::new(&self.project_root);
                if let Some(command) = &self.converter {
                    dispatcher.set_converter(Box::new(WiddershinsConverter::with_command(command)?));
                }
                dispatcher
            }
        };

        let fetcher = match self.timeout {
            Some(timeout) => HttpFetcher::with_timeout(timeout),
            None => HttpFetcher::new(),
        };

        let workspace = ScratchWorkspace::create(&self.project_root)?;
        debug!(
            project = %self.project_root.display(),
            scratch = %workspace.root().display(),
            policy = %self.policy,
            "Preprocessor inited"
        );

        Ok(Preprocessor {
            project_root: self.project_root,
            global: self.global,
            policy: self.policy,
            scanner: TagScanner::new()?,
            workspace,
            acquirer: SpecAcquirer::with_fetcher(fetcher),
            dispatcher,
        })
    }
}

/// Replaces `<swaggerdoc>` tags with rendered documentation
///
/// Owns the scratch workspace of its project root, so one instance per
/// root at a time.
pub struct Preprocessor {
    project_root: PathBuf,
    global: RawOptions,
    policy: FailurePolicy,
    scanner: TagScanner,
    workspace: ScratchWorkspace,
    acquirer: SpecAcquirer<HttpFetcher>,
    dispatcher: RenderDispatcher,
}

impl Preprocessor {
    /// Preprocessor with default settings and the given global options
    pub fn new(project_root: impl Into<PathBuf>, global: RawOptions) -> Result<Self> {
        PreprocessorBuilder::new(project_root)
            .global_options(global)
            .build()
    }

    pub fn builder(project_root: impl Into<PathBuf>) -> PreprocessorBuilder {
        PreprocessorBuilder::new(project_root)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn workspace(&self) -> &ScratchWorkspace {
        &self.workspace
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Substitute every tag of one document
    ///
    /// Relative paths in tag options resolve against the directory of
    /// `doc_path`.
    pub fn process_document(&mut self, text: &str, doc_path: &Path) -> Result<String> {
        let mut report = ApplyReport::default();
        self.substitute(text, doc_path, &mut report)
    }

    /// Process every Markdown file under `src_dir`, writing back changed ones
    pub fn apply(&mut self, src_dir: &Path) -> Result<ApplyReport> {
        if !src_dir.is_dir() {
            return Err(SwaggerdocError::Config(format!(
                "Source directory {} does not exist",
                src_dir.display()
            )));
        }

        let documents: Vec<PathBuf> = WalkDir::new(src_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != SCRATCH_DIR_NAME)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("md"))
            .map(|e| e.into_path())
            .collect();

        let mut report = ApplyReport::default();
        for path in documents {
            report.files_scanned += 1;
            let content = fs::read_to_string(&path)?;
            let processed = self.substitute(&content, &path, &mut report)?;

            if processed != content {
                fs::write(&path, processed)?;
                report.files_changed += 1;
                debug!(path = %path.display(), "document updated");
            }
        }

        info!(
            files = report.files_scanned,
            changed = report.files_changed,
            rendered = report.tags_rendered,
            failed = report.tags_failed,
            skipped_sources = report.sources_skipped,
            "Preprocessor applied"
        );
        Ok(report)
    }

    fn substitute(&mut self, text: &str, doc_path: &Path, report: &mut ApplyReport) -> Result<String> {
        let tags = self.scanner.find(text);
        if tags.is_empty() {
            return Ok(text.to_string());
        }

        let base_dir = doc_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.project_root.clone());

        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for tag in tags {
            output.push_str(&text[last..tag.range.start]);
            last = tag.range.end;

            let invocation = self.workspace.begin_invocation();
            debug!(
                document = %doc_path.display(),
                invocation = invocation.index,
                "Processing swaggerdoc tag"
            );

            match self.render_tag(tag.options, &base_dir, invocation, report) {
                Ok(markdown) => {
                    report.tags_rendered += 1;
                    output.push_str(&markdown);
                }
                Err(e) => {
                    report.tags_failed += 1;
                    match self.policy {
                        FailurePolicy::Abort => return Err(e),
                        FailurePolicy::Skip => {
                            error!(document = %doc_path.display(), error = %e, "swaggerdoc tag skipped");
                        }
                        FailurePolicy::KeepTag => {
                            error!(document = %doc_path.display(), error = %e, "swaggerdoc tag left in place");
                            output.push_str(tag.text);
                        }
                    }
                }
            }
        }

        output.push_str(&text[last..]);
        Ok(output)
    }

    fn render_tag(
        &self,
        options: &str,
        base_dir: &Path,
        invocation: Invocation,
        report: &mut ApplyReport,
    ) -> Result<String> {
        let tag_options = self.scanner.parse_options(options)?;

        let resolution = ConfigBuilder::new(RawOptions::defaults())
            .layer(Layer::Global, self.global.clone(), &self.project_root)
            .layer(Layer::Tag, tag_options, base_dir)
            .build()?;
        for warning in &resolution.warnings {
            warn!("{}", warning);
        }
        let config = resolution.config;

        let acquired = self.acquirer.acquire(
            &config.spec_urls,
            config.spec_path.as_deref(),
            &invocation,
        )?;
        report.sources_skipped += acquired.skipped.len();

        self.dispatcher.render(&RenderRequest {
            spec: acquired.location,
            config,
            invocation,
        })
    }
}
