//! External converter mode
//!
//! Shells out to `widdershins` (or a configured replacement) which writes
//! the Markdown to a file in the scratch workspace. Both output streams are
//! kept in a log file next to it.

use crate::{RenderRequest, Renderer};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use swaggerdoc_common::{Environment, Invocation, Result, SwaggerdocError};
use tracing::{debug, info, warn};

/// Converter invoked when none is configured
pub const DEFAULT_CONVERTER: &str = "widdershins";

/// Number of stderr lines repeated in the warning
const STDERR_PREVIEW_LINES: usize = 3;

pub struct WiddershinsConverter {
    /// Program followed by any fixed leading arguments
    command: Vec<String>,
}

impl WiddershinsConverter {
    pub fn new() -> Self {
        Self {
            command: vec![DEFAULT_CONVERTER.to_string()],
        }
    }

    /// Use a custom command line, split with shell quoting rules
    ///
    /// ```rust
    /// use swaggerdoc_generator::WiddershinsConverter;
    ///
    /// let converter = WiddershinsConverter::with_command("npx widdershins --code").unwrap();
    /// assert_eq!(converter.program(), "npx");
    /// ```
    pub fn with_command(command: &str) -> Result<Self> {
        let command = shell_words::split(command).map_err(|e| {
            SwaggerdocError::Config(format!("Invalid converter command `{}`: {}", command, e))
        })?;

        if command.is_empty() {
            return Err(SwaggerdocError::Config(
                "Converter command must not be empty".to_string(),
            ));
        }

        Ok(Self { command })
    }

    pub fn program(&self) -> &str {
        &self.command[0]
    }

    /// Arguments after the program, in invocation order
    pub fn arguments(&self, request: &RenderRequest) -> Result<Vec<String>> {
        let mut args: Vec<String> = self.command[1..].to_vec();

        if let Some(environment) = &request.config.environment {
            args.push("--environment".to_string());
            args.push(environment_argument(environment, &request.invocation)?);
        }

        args.push(request.spec.display().to_string());
        args.push("-o".to_string());
        args.push(request.invocation.converter_output_path().display().to_string());

        Ok(args)
    }
}

impl Default for WiddershinsConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for WiddershinsConverter {
    fn render(&self, request: &RenderRequest) -> Result<String> {
        debug!("Using widdershins mode");
        let args = self.arguments(request)?;
        let log_path = request.invocation.converter_log_path();
        let output_path = request.invocation.converter_output_path();

        let mut words = vec![self.program().to_string()];
        words.extend(args.iter().cloned());
        info!(command = %shell_words::join(&words), "Constructed command");

        let output = match Command::new(self.program()).args(&args).output() {
            Ok(output) => output,
            Err(e) => {
                fs::write(
                    &log_path,
                    format!("Failed to start `{}`: {}\n", self.program(), e),
                )?;
                return Err(self.execution_error(format!("could not be started: {}", e), log_path));
            }
        };

        write_log(&log_path, &output)?;
        info!(path = %log_path.display(), "Build log saved");

        if !output.status.success() {
            return Err(self.execution_error(output.status.to_string(), log_path));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            let fragment: Vec<&str> = stderr.lines().take(STDERR_PREVIEW_LINES).collect();
            warn!(
                "Widdershins builder returned error or warning:\n{}\n...\nFull build log at {}",
                fragment.join("\n"),
                absolute(&log_path).display()
            );
        }

        Ok(fs::read_to_string(&output_path)?)
    }
}

impl WiddershinsConverter {
    fn execution_error(&self, status: String, log_path: PathBuf) -> SwaggerdocError {
        SwaggerdocError::ConverterExecution {
            program: self.program().to_string(),
            status,
            log_path: absolute(&log_path),
        }
    }
}

/// Path handed to `--environment`, writing inline settings to the workspace
fn environment_argument(environment: &Environment, invocation: &Invocation) -> Result<String> {
    match environment {
        Environment::Path(path) => Ok(path.clone()),
        Environment::Inline(value) => {
            let path = invocation.environment_path();
            fs::write(&path, serde_yaml::to_string(value)?)?;
            debug!(path = %path.display(), "wrote inline environment");
            Ok(path.display().to_string())
        }
    }
}

/// Stdout, a blank line, then stderr
fn write_log(path: &Path, output: &Output) -> Result<()> {
    let mut log = Vec::with_capacity(output.stdout.len() + output.stderr.len() + 2);
    log.extend_from_slice(&output.stdout);
    log.extend_from_slice(b"\n\n");
    log.extend_from_slice(&output.stderr);
    fs::write(path, log)?;
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
