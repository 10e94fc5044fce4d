//! swaggerdoc CLI
//!
//! Command-line interface for rendering Swagger/OpenAPI specs into Markdown.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swaggerdoc_common::config::{discover_config, load_global_options};
use swaggerdoc_common::options::keys;
use swaggerdoc_common::{ConfigBuilder, Layer, Mode, OptionValue, RawOptions, ScratchWorkspace};
use swaggerdoc_generator::{RenderDispatcher, RenderRequest, WiddershinsConverter};
use swaggerdoc_parser::{HttpFetcher, SpecAcquirer, SpecDocument, SpecSource};
use swaggerdoc_preprocessor::{FailurePolicy, Preprocessor};

#[derive(Parser)]
#[command(name = "swaggerdoc")]
#[command(version, about = "Render Swagger/OpenAPI specs into Markdown documentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace swaggerdoc tags in every Markdown file of a source directory
    #[command(after_help = "EXAMPLES:\n  \
        # Use swaggerdoc.yml or foliant.yml from the current directory\n  \
        swaggerdoc apply\n\n  \
        # Explicit project layout and config\n  \
        swaggerdoc apply --project ./docs --src ./docs/src --config ./docs/foliant.yml\n\n  \
        # Stop at the first failing tag\n  \
        swaggerdoc apply --on-error abort\n\n  \
        # Give slow spec servers a minute\n  \
        swaggerdoc apply --timeout 60")]
    Apply {
        /// Project root; holds the scratch directory and default template
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Directory with Markdown sources (defaults to the project root)
        #[arg(short, long)]
        src: Option<PathBuf>,

        /// Global options file (discovered in the project root if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Converter command line used in widdershins mode
        #[arg(long)]
        converter: Option<String>,

        /// What to do with a tag that fails
        #[arg(long, value_enum, default_value_t = OnError::Skip)]
        on_error: OnError,

        /// Per-request timeout for spec downloads, in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// Render one spec without a document
    #[command(after_help = "EXAMPLES:\n  \
        # Local spec through the bundled template\n  \
        swaggerdoc render --spec-path petstore.yaml\n\n  \
        # Try two URLs, then a local copy, and write a file\n  \
        swaggerdoc render \\\n    \
        --spec-url https://a.example.com/swagger.json \\\n    \
        --spec-url https://b.example.com/swagger.json \\\n    \
        --spec-path swagger.json \\\n    \
        --output api.md\n\n  \
        # Use widdershins\n  \
        swaggerdoc render --spec-path petstore.yaml --mode widdershins")]
    Render {
        /// Spec URL candidate, tried in the order given
        #[arg(long = "spec-url")]
        spec_urls: Vec<String>,

        /// Local spec used when no URL works
        #[arg(long)]
        spec_path: Option<PathBuf>,

        /// Spec merged under the primary one
        #[arg(long)]
        additional: Option<PathBuf>,

        /// Rendering mode
        #[arg(short, long, value_enum)]
        mode: Option<CliMode>,

        /// Template file, relative to the project root
        #[arg(short, long)]
        template: Option<String>,

        /// Environment file passed to widdershins
        #[arg(long)]
        environment: Option<String>,

        /// Converter command line used in widdershins mode
        #[arg(long)]
        converter: Option<String>,

        /// Project root; holds the scratch directory and default template
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Global options file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-request timeout for spec downloads, in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// Load a spec and show what it contains
    Check {
        /// Path to the spec file
        #[arg(short, long)]
        spec: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Bundled or custom template
    Jinja,
    /// External widdershins converter
    Widdershins,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Jinja => Mode::Jinja,
            CliMode::Widdershins => Mode::Widdershins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnError {
    /// Drop the failing tag from the output
    Skip,
    /// Leave the failing tag in the document
    Keep,
    /// Stop with an error
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(policy: OnError) -> Self {
        match policy {
            OnError::Skip => FailurePolicy::Skip,
            OnError::Keep => FailurePolicy::KeepTag,
            OnError::Abort => FailurePolicy::Abort,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            project,
            src,
            config,
            converter,
            on_error,
            timeout,
        } => {
            apply_command(ApplyArgs {
                project: &project,
                src: src.as_deref(),
                config: config.as_deref(),
                converter: converter.as_deref(),
                policy: on_error.into(),
                timeout: timeout.map(Duration::from_secs),
            })?;
        }
        Commands::Render {
            spec_urls,
            spec_path,
            additional,
            mode,
            template,
            environment,
            converter,
            project,
            config,
            output,
            timeout,
        } => {
            let mut options = RawOptions::new();
            if !spec_urls.is_empty() {
                options.insert(
                    keys::SPEC_URL,
                    OptionValue::Sequence(spec_urls.into_iter().map(OptionValue::from).collect()),
                );
            }
            if let Some(path) = spec_path {
                options.insert(keys::SPEC_PATH, path.display().to_string());
            }
            if let Some(path) = additional {
                options.insert(keys::ADDITIONAL_JSON_PATH, path.display().to_string());
            }
            if let Some(mode) = mode {
                options.insert(keys::MODE, Mode::from(mode).as_str());
            }
            if let Some(template) = template {
                options.insert(keys::TEMPLATE, template);
            }
            if let Some(environment) = environment {
                options.insert(keys::ENVIRONMENT, environment);
            }

            render_command(RenderArgs {
                options,
                project: &project,
                config: config.as_deref(),
                converter: converter.as_deref(),
                output: output.as_deref(),
                timeout: timeout.map(Duration::from_secs),
            })?;
        }
        Commands::Check { spec } => {
            check_command(&spec, cli.verbose)?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit config file, or the first one discovered in the project root
fn global_options(project: &Path, config: Option<&Path>) -> Result<RawOptions> {
    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(project),
    };

    match path {
        Some(path) => {
            eprintln!("{} Using config: {}", "→".cyan(), path.display());
            load_global_options(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(RawOptions::new()),
    }
}

struct ApplyArgs<'a> {
    project: &'a Path,
    src: Option<&'a Path>,
    config: Option<&'a Path>,
    converter: Option<&'a str>,
    policy: FailurePolicy,
    timeout: Option<Duration>,
}

fn apply_command(args: ApplyArgs<'_>) -> Result<()> {
    let project = args.project;
    let policy = args.policy;
    let src_dir = args.src.unwrap_or(project);
    eprintln!("{} Processing Markdown in {}", "→".cyan(), src_dir.display());

    let mut builder = Preprocessor::builder(project)
        .global_options(global_options(project, args.config)?)
        .policy(policy);
    if let Some(command) = args.converter {
        builder = builder.converter(command);
    }
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(timeout);
    }
    let mut preprocessor = builder.build().context("Failed to set up preprocessor")?;

    let report = preprocessor
        .apply(src_dir)
        .context("Failed to process documents")?;

    eprintln!(
        "\n{} {} of {} files updated, {} tags rendered",
        "✓".green().bold(),
        report.files_changed.to_string().yellow(),
        report.files_scanned,
        report.tags_rendered.to_string().yellow()
    );
    if report.sources_skipped > 0 {
        eprintln!(
            "{} {} spec URLs could not be retrieved",
            "!".yellow().bold(),
            report.sources_skipped.to_string().yellow()
        );
    }
    if report.tags_failed > 0 {
        eprintln!(
            "{} {} tags failed (policy: {})",
            "!".red().bold(),
            report.tags_failed.to_string().red(),
            policy
        );
    }

    Ok(())
}

struct RenderArgs<'a> {
    options: RawOptions,
    project: &'a Path,
    config: Option<&'a Path>,
    converter: Option<&'a str>,
    output: Option<&'a Path>,
    timeout: Option<Duration>,
}

fn render_command(args: RenderArgs<'_>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    let resolution = ConfigBuilder::new(RawOptions::defaults())
        .layer(Layer::Global, global_options(args.project, args.config)?, args.project)
        .layer(Layer::Tag, args.options, cwd)
        .build()
        .context("Invalid options")?;
    for warning in &resolution.warnings {
        eprintln!("{} {}", "!".yellow().bold(), warning);
    }
    let config = resolution.config;

    let mut workspace =
        ScratchWorkspace::create(args.project).context("Failed to create scratch workspace")?;
    let invocation = workspace.begin_invocation();

    let fetcher = match args.timeout {
        Some(timeout) => HttpFetcher::with_timeout(timeout),
        None => HttpFetcher::new(),
    };
    let acquired = SpecAcquirer::with_fetcher(fetcher)
        .acquire(&config.spec_urls, config.spec_path.as_deref(), &invocation)
        .context("Failed to acquire spec")?;
    match &acquired.source {
        SpecSource::Url(url) => eprintln!("{} Downloaded spec from {}", "→".cyan(), url),
        SpecSource::LocalPath => eprintln!(
            "{} Using local spec {}",
            "→".cyan(),
            acquired.location.display()
        ),
    }

    let mut dispatcher = RenderDispatcher::new(args.project);
    if let Some(command) = args.converter {
        dispatcher.set_converter(Box::new(WiddershinsConverter::with_command(command)?));
    }
    eprintln!("{} Rendering in {} mode", "→".cyan(), config.mode.to_string().yellow());

    let markdown = dispatcher
        .render(&RenderRequest {
            spec: acquired.location,
            config,
            invocation,
        })
        .context("Failed to render spec")?;

    if markdown.is_empty() {
        eprintln!("{} Rendered output is empty", "!".yellow().bold());
    }

    match args.output {
        Some(path) => {
            fs::write(path, &markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote {}", "✓".green().bold(), path.display());
        }
        None => print!("{}", markdown),
    }

    Ok(())
}

fn check_command(spec: &Path, verbose: bool) -> Result<()> {
    if !spec.is_file() {
        bail!("Spec file not found: {}", spec.display());
    }
    println!("{} Loading spec: {}", "→".cyan(), spec.display());

    let document = SpecDocument::from_file(spec).context("Failed to load spec")?;

    println!("\n{}", "✓ Spec loaded".green().bold());
    println!("  Format: {}", document.format().to_string().yellow());
    if let Some(version) = document.spec_version() {
        println!("  Spec version: {}", version.yellow());
    }
    match document.info() {
        Some(info) => {
            println!("  Title: {}", info.title.yellow());
            println!("  API version: {}", info.version);
        }
        None => println!("  {}", "No info section".red()),
    }
    println!("  Paths: {}", document.path_count());

    if verbose {
        println!("\n{}", "Top-level keys:".bold());
        for key in document.data().keys() {
            println!("  • {}", key.cyan());
        }
    }

    Ok(())
}
