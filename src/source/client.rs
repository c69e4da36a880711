// src/source/client.rs

//! HTTP fetcher for source mirrors
//!
//! Thin wrapper around a blocking reqwest client. One attempt per URL;
//! retry policy lives a level up, where the mirror list is walked.
//! Downloads stream to a temp file and are renamed into place only
//! when complete, so an interrupted transfer never poisons the cache.

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{AcquireError, Fetcher};

/// Connect timeout for mirror requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads (64 KB)
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Blocking HTTP fetcher used outside of tests
pub struct HttpFetcher {
    client: Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, AcquireError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AcquireError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            show_progress: true,
        })
    }

    /// Disable the progress bar (CI logs, tests)
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquireError> {
        info!("Downloading {}", url);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| AcquireError::Io {
                context: format!("creating {}", parent.display()),
                source: e,
            })?;
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AcquireError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AcquireError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let total_size = response.content_length().unwrap_or(0);
        let progress = if self.show_progress && total_size > 0 {
            let pb = ProgressBar::new(total_size);
            pb.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb.set_message(
                dest.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            Some(pb)
        } else {
            None
        };

        // Stream into a temp file, rename when complete.
        let temp_path = dest.with_extension("part");
        let mut file = File::create(&temp_path).map_err(|e| AcquireError::Io {
            context: format!("creating {}", temp_path.display()),
            source: e,
        })?;

        let mut buffer = [0u8; STREAM_BUFFER_SIZE];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buffer).map_err(|e| AcquireError::Download {
                url: url.to_string(),
                reason: format!("read failed after {downloaded} bytes: {e}"),
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).map_err(|e| AcquireError::Io {
                context: format!("writing {}", temp_path.display()),
                source: e,
            })?;
            downloaded += n as u64;
            if let Some(pb) = &progress {
                pb.set_position(downloaded);
            }
        }

        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        fs::rename(&temp_path, dest).map_err(|e| AcquireError::Io {
            context: format!("moving {} into place", temp_path.display()),
            source: e,
        })?;

        debug!("Downloaded {} bytes to {}", downloaded, dest.display());
        Ok(())
    }
}
