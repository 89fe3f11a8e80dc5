use std::path::{Path, PathBuf};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use rustc_hash::FxHashMap;

use crate::errors::{Error, Result};

/// Asset reader trait.
/// Resolves manifest-relative URIs to bytes, asynchronously.
pub trait AssetReader: Send + Sync {
    fn read_bytes(&self, uri: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// Local file reader rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    /// Accepts either the root directory or a file inside it.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.root_path.join(uri);
        log::debug!("Reading {}", path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::fetch(path.display().to_string(), e))
    }
}

/// HTTP reader, relative URIs are joined onto the base URL.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str).map_err(|e| Error::fetch(url_str, e))?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };
        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let url = self.root_url.join(uri).map_err(|e| Error::fetch(uri, e))?;
        log::debug!("Fetching {url}");
        let response = ehttp::fetch_async(ehttp::Request::get(url.as_str()))
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))?;
        if !response.ok {
            return Err(Error::fetch(
                url.as_str(),
                format!("HTTP {} {}", response.status, response.status_text),
            ));
        }
        Ok(response.bytes)
    }
}

/// In-memory reader, keyed by URI. Useful for embedded assets and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetReader {
    files: FxHashMap<String, Arc<[u8]>>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(uri.into(), bytes.into());
    }

    #[must_use]
    pub fn with_file(mut self, uri: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl AssetReader for MemoryAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.files
            .get(uri)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| Error::fetch(uri, "no such entry"))
    }
}

/// Resolves a URI found inside a manifest against the manifest's own URI.
///
/// Percent escapes are decoded. Absolute paths and URLs pass through.
pub fn resolve_relative(manifest_uri: &str, uri: &str) -> Result<String> {
    let decoded = percent_decode_str(uri)
        .decode_utf8()
        .map_err(|e| Error::malformed(format!("URI '{uri}' is not valid UTF-8: {e}")))?;
    if decoded.starts_with('/') || decoded.contains("://") {
        return Ok(decoded.into_owned());
    }
    Ok(match manifest_uri.rfind(['/', '\\']) {
        Some(end) => format!("{}/{decoded}", &manifest_uri[..end]),
        None => decoded.into_owned(),
    })
}

/// Asset reader variants.
/// Enum dispatch, since `AssetReader` is not object safe.
#[derive(Debug, Clone)]
pub enum AssetReaderVariant {
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
    Memory(Arc<MemoryAssetReader>),
}

fn is_http(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

impl AssetReaderVariant {
    /// Picks a reader from a path or URL.
    pub fn from_source(source: &str) -> Result<Self> {
        if is_http(source) {
            #[cfg(feature = "http")]
            {
                Ok(Self::Http(Arc::new(HttpAssetReader::new(source)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(Error::FeatureNotEnabled(
                    "HTTP loading requires the `http` feature".to_string(),
                ))
            }
        } else {
            Ok(Self::File(Arc::new(FileAssetReader::new(source))))
        }
    }

    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        match self {
            Self::File(r) => r.read_bytes(uri).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read_bytes(uri).await,
            Self::Memory(r) => r.read_bytes(uri).await,
        }
    }

    /// Full location of `uri` as this reader sees it.
    #[must_use]
    pub fn resolved_uri(&self, uri: &str) -> String {
        match self {
            Self::File(r) => {
                let path = r.root_path.join(uri);
                std::path::absolute(&path)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            }
            #[cfg(feature = "http")]
            Self::Http(r) => r
                .root_url
                .join(uri)
                .map_or_else(|_| uri.to_string(), String::from),
            Self::Memory(_) => uri.to_string(),
        }
    }

    /// File name part of a path or URL.
    #[must_use]
    pub fn source_filename(source: &str) -> &str {
        if is_http(source) {
            let path = source.split(['?', '#']).next().unwrap_or(source);
            path.rsplit('/').next().unwrap_or(path)
        } else {
            Path::new(source)
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or(source)
        }
    }
}

impl From<MemoryAssetReader> for AssetReaderVariant {
    fn from(reader: MemoryAssetReader) -> Self {
        Self::Memory(Arc::new(reader))
    }
}

impl From<FileAssetReader> for AssetReaderVariant {
    fn from(reader: FileAssetReader) -> Self {
        Self::File(Arc::new(reader))
    }
}
