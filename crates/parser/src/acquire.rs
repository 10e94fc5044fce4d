//! Spec acquisition
//!
//! Remote candidates are tried in order and the first one that downloads
//! wins; after that a local fallback path is used in place. Individual
//! failures are only warnings, the whole acquisition fails only when every
//! source is exhausted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swaggerdoc_common::{Invocation, Result, SwaggerdocError};
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

#[cfg(test)]
use mockall::automock;

/// Global timeout for a single spec download (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum spec size accepted from a remote source (20 MB)
pub const MAX_SPEC_SIZE: u64 = 20 * 1024 * 1024;

/// Retrieves a spec from a URL into a local file
#[cfg_attr(test, automock)]
pub trait SpecFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Production fetcher: HTTP(S) through a blocking agent, `file://` from disk
pub struct HttpFetcher {
    agent: Agent,
    max_size: u64,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            max_size: MAX_SPEC_SIZE,
        }
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.agent
            .get(url)
            .header("User-Agent", "swaggerdoc")
            .call()
            .map_err(|e| fetch_error(url, e))?
            .into_body()
            .with_config()
            .limit(self.max_size)
            .read_to_vec()
            .map_err(|e| fetch_error(url, e))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| fetch_error(url, e))?;

        let bytes = match parsed.scheme() {
            "http" | "https" => self.download(url)?,
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| fetch_error(url, "not a local file path"))?;
                fs::read(&path).map_err(|e| fetch_error(url, e))?
            }
            other => return Err(fetch_error(url, format!("unsupported URL scheme `{other}`"))),
        };

        fs::write(dest, bytes)?;
        Ok(())
    }
}

fn fetch_error(url: &str, error: impl ToString) -> SwaggerdocError {
    SwaggerdocError::Fetch {
        url: url.to_string(),
        message: error.to_string(),
    }
}

/// Where an acquired spec came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(String),
    LocalPath,
}

/// A located spec plus the sources skipped on the way
#[derive(Debug)]
pub struct Acquired {
    pub location: PathBuf,
    pub source: SpecSource,
    pub skipped: Vec<SwaggerdocError>,
}

/// Resolves URL candidates and a local fallback to one spec file
pub struct SpecAcquirer<F: SpecFetcher = HttpFetcher> {
    fetcher: F,
}

impl SpecAcquirer<HttpFetcher> {
    pub fn new() -> Self {
        Self::with_fetcher(HttpFetcher::new())
    }
}

impl Default for SpecAcquirer<HttpFetcher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: SpecFetcher> SpecAcquirer<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Find the first reachable spec
    ///
    /// Downloads land in the invocation's staging file; a local fallback is
    /// returned as its canonical path without copying.
    pub fn acquire(
        &self,
        urls: &[String],
        fallback: Option<&Path>,
        invocation: &Invocation,
    ) -> Result<Acquired> {
        debug!(?urls, ?fallback, "gathering specs");
        let mut skipped = Vec::new();

        for url in urls {
            let dest = invocation.spec_download_path();
            match self.fetcher.fetch(url, &dest) {
                Ok(()) => {
                    debug!(%url, path = %dest.display(), "using spec from url");
                    return Ok(Acquired {
                        location: dest,
                        source: SpecSource::Url(url.clone()),
                        skipped,
                    });
                }
                Err(e) => {
                    warn!(%url, error = %e, "Cannot retrieve swagger spec file from url. Skipping.");
                    skipped.push(e);
                }
            }
        }

        if let Some(path) = fallback {
            if path.exists() {
                let location = path.canonicalize()?;
                debug!(path = %location.display(), "using local spec");
                return Ok(Acquired {
                    location,
                    source: SpecSource::LocalPath,
                    skipped,
                });
            }

            warn!(path = %path.display(), "Can't find spec file. Skipping.");
        }

        debug!(skipped = skipped.len(), "no spec source left");

        Err(SwaggerdocError::AcquisitionFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use swaggerdoc_common::ScratchWorkspace;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> ScratchWorkspace {
        ScratchWorkspace::create(dir.path()).unwrap()
    }

    #[test]
    fn test_second_url_used_when_first_fails() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let invocation = ws.begin_invocation();

        let mut seq = Sequence::new();
        let mut fetcher = MockSpecFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq("http://unreachable.invalid/spec.json"), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, _| {
                Err(SwaggerdocError::Fetch {
                    url: url.to_string(),
                    message: "dns error".to_string(),
                })
            });
        fetcher
            .expect_fetch()
            .with(eq("http://example.com/spec.json"), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, dest| {
                fs::write(dest, "{}")?;
                Ok(())
            });

        let acquirer = SpecAcquirer::with_fetcher(fetcher);
        let urls = vec![
            "http://unreachable.invalid/spec.json".to_string(),
            "http://example.com/spec.json".to_string(),
        ];
        let acquired = acquirer.acquire(&urls, None, &invocation).unwrap();

        assert_eq!(acquired.location, invocation.spec_download_path());
        assert_eq!(
            acquired.source,
            SpecSource::Url("http://example.com/spec.json".to_string())
        );
        assert_eq!(acquired.skipped.len(), 1);
        assert!(acquired.skipped[0]
            .to_string()
            .contains("http://unreachable.invalid/spec.json"));
    }

    #[test]
    fn test_falls_back_to_local_path() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let invocation = ws.begin_invocation();
        let local = dir.path().join("spec.yaml");
        fs::write(&local, "swagger: '2.0'").unwrap();

        let mut fetcher = MockSpecFetcher::new();
        fetcher.expect_fetch().times(2).returning(|url, _| {
            Err(SwaggerdocError::Fetch {
                url: url.to_string(),
                message: "404".to_string(),
            })
        });

        let acquirer = SpecAcquirer::with_fetcher(fetcher);
        let urls = vec!["http://a/spec".to_string(), "http://b/spec".to_string()];
        let acquired = acquirer.acquire(&urls, Some(local.as_path()), &invocation).unwrap();

        assert_eq!(acquired.location, local.canonicalize().unwrap());
        assert_eq!(acquired.source, SpecSource::LocalPath);
        assert_eq!(acquired.skipped.len(), 2);
    }

    #[test]
    fn test_everything_fails() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let invocation = ws.begin_invocation();

        let mut fetcher = MockSpecFetcher::new();
        fetcher.expect_fetch().times(1).returning(|url, _| {
            Err(SwaggerdocError::Fetch {
                url: url.to_string(),
                message: "timeout".to_string(),
            })
        });

        let acquirer = SpecAcquirer::with_fetcher(fetcher);
        let missing = dir.path().join("missing.json");
        let result = acquirer.acquire(&["http://a/spec".to_string()], Some(missing.as_path()), &invocation);

        assert!(matches!(result, Err(SwaggerdocError::AcquisitionFailure)));
    }

    #[test]
    fn test_no_sources() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let invocation = ws.begin_invocation();

        let acquirer = SpecAcquirer::with_fetcher(MockSpecFetcher::new());
        let result = acquirer.acquire(&[], None, &invocation);

        assert!(matches!(result, Err(SwaggerdocError::AcquisitionFailure)));
    }

    #[test]
    fn test_http_fetcher_reads_file_urls() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.json");
        fs::write(&source, r#"{"swagger": "2.0"}"#).unwrap();
        let url = Url::from_file_path(&source).unwrap();
        let dest = dir.path().join("staged");

        HttpFetcher::new().fetch(url.as_str(), &dest).unwrap();

        assert_eq!(fs::read_to_string(dest).unwrap(), r#"{"swagger": "2.0"}"#);
    }

    #[test]
    fn test_http_fetcher_rejects_unknown_scheme() {
        let dir = TempDir::new().unwrap();
        let result = HttpFetcher::new().fetch("ftp://example.com/spec.json", &dir.path().join("x"));

        match result {
            Err(SwaggerdocError::Fetch { url, message }) => {
                assert_eq!(url, "ftp://example.com/spec.json");
                assert!(message.contains("ftp"), "{message}");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[test]
    fn test_http_fetcher_missing_file_url() {
        let dir = TempDir::new().unwrap();
        let url = Url::from_file_path(dir.path().join("nope.json")).unwrap();
        let result = HttpFetcher::new().fetch(url.as_str(), &dir.path().join("x"));
        assert!(matches!(result, Err(SwaggerdocError::Fetch { .. })));
    }
}
