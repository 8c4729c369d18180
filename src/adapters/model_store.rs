//! Model store: Locates, downloads and verifies the model bundle.
//!
//! The bundle is cached at a local path. When the file is absent and a URL is
//! configured, it is streamed to `<path>.part`, hashed on the way, and renamed
//! into place only after the digest checks out.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::pipeline::ModelBundle;
use crate::ports::ModelError;

/// Download chunk size.
const CHUNK_SIZE: usize = 32 * 1024;

/// Where the bundle lives and how to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    pub local_path: PathBuf,
    pub remote_url: Option<String>,
    /// Expected lowercase hex SHA-256 of the bundle file.
    pub sha256: Option<String>,
}

fn hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn verify_digest(expected: Option<&str>, actual: &str) -> Result<(), ModelError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let expected = expected.trim().to_ascii_lowercase();
    if !constant_time_eq_str(&expected, actual) {
        return Err(ModelError::Checksum {
            expected,
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Copy the body to `tmp` in fixed-size chunks, hashing as it goes.
fn stream_to_file(
    body: &mut impl Read,
    tmp: &Path,
    sha256: Option<&str>,
) -> Result<usize, ModelError> {
    let mut out = File::create(tmp)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0usize;

    loop {
        let n = body
            .read(&mut buf)
            .map_err(|e| ModelError::Download(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])?;
        total += n;
    }
    out.sync_all()?;

    verify_digest(sha256, &hex(&hasher.finalize()))?;
    Ok(total)
}

/// Stream `url` into `path`, verifying the digest before the final rename.
///
/// # Errors
/// Returns `ModelError::Download` on HTTP failure, `ModelError::Checksum` on
/// digest mismatch, or `ModelError::Io` on filesystem failure. A failed
/// download leaves no file at `path`.
pub fn download(url: &str, path: &Path, sha256: Option<&str>) -> Result<(), ModelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // No overall timeout: bundles can be large.
    let http = reqwest::blocking::Client::builder()
        .timeout(None::<std::time::Duration>)
        .build()
        .map_err(|e| ModelError::Download(e.to_string()))?;
    let mut resp = http
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| ModelError::Download(e.to_string()))?;

    let tmp = part_path(path);
    let total = match stream_to_file(&mut resp, &tmp, sha256) {
        Ok(total) => total,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    fs::rename(&tmp, path)?;

    tracing::info!("Downloaded model bundle ({} bytes) to {:?}", total, path);
    Ok(())
}

/// Ensure the bundle is present locally, then parse and validate it.
///
/// # Errors
/// Returns `ModelError::Missing` when there is neither a local file nor a
/// URL, and any download, checksum, IO or format error otherwise.
pub fn load_bundle(source: &ModelSource) -> Result<ModelBundle, ModelError> {
    let path = &source.local_path;
    if !path.exists() {
        let url = source
            .remote_url
            .as_deref()
            .ok_or_else(|| ModelError::Missing(path.clone()))?;
        tracing::info!("Model bundle not found at {:?}; downloading", path);
        download(url, path, source.sha256.as_deref())?;
    }

    let bytes = fs::read(path)?;
    verify_digest(source.sha256.as_deref(), &hex(&Sha256::digest(&bytes)))?;

    let bundle = ModelBundle::from_slice(&bytes)?;
    tracing::info!(
        "Loaded model bundle from {:?} (n_features={})",
        path,
        bundle.feature_columns.len()
    );
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    const BUNDLE: &str = r#"{
        "format_version": 1,
        "feature_columns": ["precip_3d", "TWI"],
        "pipeline": {
            "estimator": {"kind": "logistic_regression", "classes": [0, 1], "coef": [0.1, 0.2], "intercept": 0.0}
        }
    }"#;

    fn sha256_hex(bytes: &[u8]) -> String {
        hex(&Sha256::digest(bytes))
    }

    #[test]
    fn test_loads_existing_file_without_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        fs::write(&path, BUNDLE).expect("write");

        let bundle = load_bundle(&ModelSource {
            local_path: path,
            remote_url: None,
            sha256: None,
        })
        .expect("load");
        assert_eq!(bundle.feature_columns, vec!["precip_3d", "TWI"]);
    }

    #[test]
    fn test_missing_file_without_url_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let err = load_bundle(&ModelSource {
            local_path: path.clone(),
            remote_url: None,
            sha256: None,
        })
        .expect_err("must fail");
        assert!(matches!(err, ModelError::Missing(p) if p == path));
    }

    #[test]
    fn test_downloads_and_verifies_digest() {
        let server = serve_once(200, BUNDLE);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("model.json");

        let bundle = load_bundle(&ModelSource {
            local_path: path.clone(),
            remote_url: Some(format!("{}/flood_model_v1.json", server.url)),
            sha256: Some(sha256_hex(BUNDLE.as_bytes()).to_uppercase()),
        })
        .expect("download");

        assert_eq!(bundle.feature_columns.len(), 2);
        assert!(path.exists());
        assert!(!part_path(&path).exists());
        assert_eq!(server.request().path_and_query(), "/flood_model_v1.json");
    }

    #[test]
    fn test_digest_mismatch_leaves_no_file() {
        let server = serve_once(200, BUNDLE);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.json");

        let err = load_bundle(&ModelSource {
            local_path: path.clone(),
            remote_url: Some(server.url.clone()),
            sha256: Some("00".repeat(32)),
        })
        .expect_err("must fail");

        assert!(matches!(err, ModelError::Checksum { .. }));
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn test_http_error_is_download_error() {
        let server = serve_once(404, r#"{"error": "not found"}"#);
        let dir = tempfile::tempdir().expect("tempdir");
        let err = download(&server.url, &dir.path().join("m.json"), None).expect_err("must fail");
        assert!(matches!(err, ModelError::Download(_)));
    }

    #[test]
    fn test_existing_file_is_verified_when_digest_configured() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        fs::write(&path, BUNDLE).expect("write");

        let err = load_bundle(&ModelSource {
            local_path: path,
            remote_url: None,
            sha256: Some("ab".repeat(32)),
        })
        .expect_err("must fail");
        assert!(matches!(err, ModelError::Checksum { .. }));
    }
}
