//! Guest module retrieval

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::LoadError;

/// Fetch the raw bytes of a guest module.
///
/// Plain paths and `file://` URLs are read from disk. `http://` and
/// `https://` need the `fetch` feature; any other scheme is rejected.
pub fn fetch_module(url: &str) -> Result<Vec<u8>, LoadError> {
    if let Some(path) = url.strip_prefix("file://") {
        return read_file(url, Path::new(path));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return fetch_http(url);
    }
    if url.contains("://") {
        return Err(LoadError::UnsupportedScheme(url.to_string()));
    }
    read_file(url, Path::new(url))
}

fn read_file(url: &str, path: &Path) -> Result<Vec<u8>, LoadError> {
    debug!(path = %path.display(), "reading guest module");
    let bytes = fs::read(path).map_err(|source| LoadError::Fetch {
        url: url.to_string(),
        source: source.into(),
    })?;
    info!(url, size = bytes.len(), "guest module read");
    Ok(bytes)
}

#[cfg(feature = "fetch")]
fn fetch_http(url: &str) -> Result<Vec<u8>, LoadError> {
    let download = || -> reqwest::Result<Vec<u8>> {
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    };
    let bytes = download().map_err(|source| LoadError::Fetch {
        url: url.to_string(),
        source: source.into(),
    })?;
    info!(url, size = bytes.len(), "guest module downloaded");
    Ok(bytes)
}

#[cfg(not(feature = "fetch"))]
fn fetch_http(url: &str) -> Result<Vec<u8>, LoadError> {
    Err(LoadError::UnsupportedScheme(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_plain_path_and_file_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\0asm\x01\0\0\0").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        assert_eq!(fetch_module(&path).unwrap(), b"\0asm\x01\0\0\0");
        assert_eq!(
            fetch_module(&format!("file://{path}")).unwrap(),
            b"\0asm\x01\0\0\0"
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.wasm");
        let err = fetch_module(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn test_unknown_scheme() {
        let err = fetch_module("ftp://example.com/main.wasm").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedScheme(url) if url.starts_with("ftp")));
    }
}
