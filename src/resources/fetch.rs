//! Byte sources for the manifest and every asset it lists.
//!
//! The pipeline only ever performs a plain GET: "give me the bytes at this
//! URL". [`AssetFetcher`] abstracts that so the same pipeline runs against
//! the filesystem, an HTTP server, or an in-memory table in tests.
//!
//! - [`FileFetcher`] – paths (and `file://` URLs) below a base directory
//! - [`HttpFetcher`] – `http://` GET via `ureq` (feature `http`)
//! - [`UrlFetcher`] – dispatches on the URL scheme
//! - [`MemoryFetcher`] – fixed URL → bytes table

use std::path::PathBuf;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::FetchError;

/// Blocking byte source. Called from loader threads.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Resolve `url` relative to the location of the manifest it came from.
///
/// Absolute URLs (with a scheme) and rooted paths are returned unchanged.
/// Relative ones are joined to the manifest's directory, the way a browser
/// resolves `src` attributes against the document.
pub fn resolve_url(manifest_url: &str, url: &str) -> String {
    if url.contains("://") || url.starts_with('/') {
        return url.to_string();
    }
    match manifest_url.rfind('/') {
        Some(slash) => format!("{}{}", &manifest_url[..=slash], url),
        None => url.to_string(),
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Reads from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base_path: PathBuf,
}

impl FileFetcher {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        self.base_path.join(path)
    }
}

impl AssetFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.contains("://") && !url.starts_with("file://") {
            return Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
            });
        }
        let path = self.resolve(url);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound {
                    url: url.to_string(),
                }
            } else {
                FetchError::Io {
                    url: url.to_string(),
                    source,
                }
            }
        })
    }
}

/// Plain HTTP GET.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

#[cfg(feature = "http")]
impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = ureq::get(url).call().map_err(|e| match e {
            ureq::Error::StatusCode(404) => FetchError::NotFound {
                url: url.to_string(),
            },
            other => FetchError::Http {
                url: url.to_string(),
                message: other.to_string(),
            },
        })?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| FetchError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// Picks a transport from the URL scheme: `http(s)://` goes over the
/// network, everything else is treated as a file path.
#[derive(Debug, Clone)]
pub struct UrlFetcher {
    files: FileFetcher,
    #[cfg(feature = "http")]
    http: HttpFetcher,
}

impl UrlFetcher {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            files: FileFetcher::new(base_path),
            #[cfg(feature = "http")]
            http: HttpFetcher,
        }
    }
}

impl AssetFetcher for UrlFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_http(url) {
            #[cfg(feature = "http")]
            return self.http.fetch(url);
            #[cfg(not(feature = "http"))]
            return Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
            });
        }
        self.files.fetch(url)
    }
}

/// Serves bytes from a table. URLs marked as failing report an I/O error
/// even if they have content.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    entries: FxHashMap<String, Vec<u8>>,
    failing: FxHashSet<String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(url.into(), bytes.into());
    }

    /// Make every fetch of `url` fail.
    pub fn fail(&mut self, url: impl Into<String>) {
        self.failing.insert(url.into());
    }
}

impl AssetFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if self.failing.contains(url) {
            return Err(FetchError::Io {
                url: url.to_string(),
                source: std::io::Error::other("injected failure"),
            });
        }
        self.entries
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}
