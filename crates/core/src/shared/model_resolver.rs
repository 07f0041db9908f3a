use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

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
    #[error("download of {url} was interrupted: {source}")]
    Stream {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Bytes moved per read while streaming a download to disk.
const DOWNLOAD_CHUNK: usize = 1024 * 1024;

/// Without a Content-Length, progress is logged every this many bytes.
const UNSIZED_PROGRESS_STEP: u64 = 100 * 1024 * 1024;

/// Where to look for a weights file before downloading it.
#[derive(Debug, Clone, Default)]
pub struct ModelLocations {
    /// Overrides the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Read-only directory with pre-packaged weights.
    pub bundled_dir: Option<PathBuf>,
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. Cache directory (`locations.cache_dir` or the platform default)
/// 2. Bundled directory, if any
/// 3. Download from URL into the cache directory
pub fn resolve(
    name: &str,
    url: &str,
    locations: &ModelLocations,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = match &locations.cache_dir {
        Some(dir) => dir.clone(),
        None => model_cache_dir()?,
    };
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Model {name} found in cache at {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(dir) = &locations.bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            log::debug!("Model {name} found in bundle at {}", bundled_path.display());
            return Ok(bundled_path);
        }
    }

    log::info!("Downloading model {name} from {url}");
    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Voxscribe/models/`
/// - Linux: `$XDG_CACHE_HOME/Voxscribe/models/` or `~/.cache/Voxscribe/models/`
/// - Windows: `%LOCALAPPDATA%/Voxscribe/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url).map_err(|e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;
    if !response.status().is_success() {
        return Err(ModelResolveError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    let total = response.content_length().unwrap_or(0);

    // Written to a sibling file and renamed, so an interrupted download never
    // leaves a truncated model at `dest`.
    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).map_err(|e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    })?;

    let copied = copy_with_progress(&mut response, &mut file, total, url, &temp_path);
    let flushed = copied.and_then(|bytes| {
        file.flush().map_err(|e| ModelResolveError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        Ok(bytes)
    });
    drop(file);
    let bytes = match flushed {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;
    log::info!("Downloaded {} ({bytes} bytes)", dest.display());

    Ok(())
}

/// Streams `reader` into `writer` one chunk at a time, logging progress at
/// every tenth of `total` (or every [`UNSIZED_PROGRESS_STEP`] bytes when the
/// size is unknown). Returns the number of bytes copied.
fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    url: &str,
    dest: &Path,
) -> Result<u64, ModelResolveError> {
    let mut buffer = vec![0u8; DOWNLOAD_CHUNK];
    let mut copied: u64 = 0;
    let mut reported: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ModelResolveError::Stream {
                    url: url.to_string(),
                    source: e,
                })
            }
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| ModelResolveError::Write {
                path: dest.to_path_buf(),
                source: e,
            })?;
        copied += read as u64;

        if total > 0 {
            let tenths = copied * 10 / total;
            if tenths > reported {
                reported = tenths;
                log::info!("Downloading {url}: {}%", (tenths * 10).min(100));
            }
        } else if copied / UNSIZED_PROGRESS_STEP > reported {
            reported = copied / UNSIZED_PROGRESS_STEP;
            log::info!("Downloading {url}: {} MiB", copied / (1024 * 1024));
        }
    }
    Ok(copied)
}
