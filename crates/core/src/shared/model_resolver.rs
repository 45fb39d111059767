use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model not found: {0} (pass a file path or an http(s) URL)")]
    NotFound(String),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolves a model given on the command line to a local file.
///
/// `spec` may be a local path, an http(s) URL, or `None` for the default
/// file name. Lookup order for names: user cache, then `bundled_dir`.
/// URLs are downloaded into the cache once and reused afterwards.
pub fn resolve(
    spec: Option<&str>,
    default_name: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    resolve_in(&cache_dir, spec, default_name, bundled_dir, progress)
}

fn resolve_in(
    cache_dir: &Path,
    spec: Option<&str>,
    default_name: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match spec {
        Some(url) if is_url(url) => {
            let cached_path = cache_dir.join(file_name_for_url(url, default_name));
            if cached_path.exists() {
                return Ok(cached_path);
            }
            fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
            log::info!("Downloading model from {url}");
            download(url, &cached_path, progress)?;
            Ok(cached_path)
        }
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_file() {
                Ok(path)
            } else {
                Err(ModelResolveError::NotFound(path.display().to_string()))
            }
        }
        None => {
            let cached_path = cache_dir.join(default_name);
            if cached_path.exists() {
                return Ok(cached_path);
            }
            bundled_dir
                .map(|dir| dir.join(default_name))
                .filter(|p| p.exists())
                .ok_or_else(|| ModelResolveError::NotFound(default_name.to_string()))
        }
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceLens/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceLens/models/` or `~/.cache/FaceLens/models/`
/// - Windows: `%LOCALAPPDATA%/FaceLens/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("FaceLens").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("FaceLens").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn is_url(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://")
}

fn file_name_for_url(url: &str, fallback: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let path = after_scheme.split_once('/').map_or("", |(_, path)| path);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_err)?;

    // Write beside the destination and rename, so a failed download never
    // leaves a truncated model in the cache.
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        if let Err(e) = file.write_all(chunk) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_is_returned() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("seg.onnx");
        fs::write(&model, b"model").unwrap();

        let resolved = resolve_in(
            &tmp.path().join("cache"),
            Some(model.to_str().unwrap()),
            "default.onnx",
            None,
            None,
        )
        .unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_missing_explicit_path_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(
            tmp.path(),
            Some("/nonexistent/seg.onnx"),
            "default.onnx",
            None,
            None,
        );
        assert!(matches!(result, Err(ModelResolveError::NotFound(_))));
    }

    #[test]
    fn test_default_name_prefers_cache_over_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("face.onnx"), b"cached").unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let resolved = resolve_in(&cache, None, "face.onnx", Some(&bundled), None).unwrap();
        assert_eq!(resolved, cache.join("face.onnx"));
    }

    #[test]
    fn test_default_name_falls_back_to_bundled() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("face.onnx"), b"bundled").unwrap();

        let resolved =
            resolve_in(&tmp.path().join("cache"), None, "face.onnx", Some(&bundled), None)
                .unwrap();
        assert_eq!(resolved, bundled.join("face.onnx"));
    }

    #[test]
    fn test_default_name_missing_everywhere() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(tmp.path(), None, "face.onnx", None, None);
        assert!(matches!(result, Err(ModelResolveError::NotFound(name)) if name == "face.onnx"));
    }

    #[test]
    fn test_cached_url_skips_download() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("selfie.onnx"), b"cached").unwrap();

        let resolved = resolve_in(
            tmp.path(),
            Some("https://models.invalid/v1/selfie.onnx?raw=1"),
            "default.onnx",
            None,
            None,
        )
        .unwrap();
        assert_eq!(resolved, tmp.path().join("selfie.onnx"));
    }

    #[rstest]
    #[case::plain("https://host/a/b/model.onnx", "model.onnx")]
    #[case::query("https://host/model.onnx?download=1", "model.onnx")]
    #[case::trailing_slash("https://host/models/", "fallback.onnx")]
    #[case::bare_host("https://host", "fallback.onnx")]
    fn test_file_name_for_url(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(file_name_for_url(url, "fallback.onnx"), expected);
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("FaceLens"));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_invalid_url_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
