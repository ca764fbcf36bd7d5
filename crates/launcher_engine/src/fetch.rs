use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use launcher_logging::launch_debug;
use tempfile::NamedTempFile;

use crate::persist::{commit, ensure_dir};
use crate::{Artifact, EngineEvent, FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Longest silence between two body chunks.
    pub read_timeout: Duration,
    /// Whole-transfer limit; archives are large so there is none by default.
    pub request_timeout: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            request_timeout: None,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes a status line into the terminal output stream.
pub(crate) fn status_line(sink: &dyn ProgressSink, line: impl AsRef<str>) {
    sink.emit(EngineEvent::Output(
        format!("{}\r\n", line.as_ref()).into_bytes(),
    ));
}

#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Streams `url` into `destination`, returning the number of bytes written.
    /// The file only appears once the whole body has arrived.
    async fn download(
        &self,
        artifact: Artifact,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDownloader {
    settings: FetchSettings,
}

impl ReqwestDownloader {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.read_timeout);
        if let Some(timeout) = self.settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn download(
        &self,
        artifact: Artifact,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<u64, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{url}: {err}")))?;
        let parent = destination
            .parent()
            .ok_or_else(|| FetchError::new(FailureKind::Io, "destination has no parent"))?;
        ensure_dir(parent).map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;

        let client = self.build_client()?;
        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("Failed to download the file - Status: {status}"),
            ));
        }

        sink.emit(EngineEvent::DownloadStarted {
            artifact,
            uri: url.to_string(),
            destination: destination.to_path_buf(),
        });

        let total = response.content_length().filter(|len| *len > 0);
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_error)?;
        let mut written: u64 = 0;
        let mut reported: Option<u64> = None;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            tmp.write_all(&chunk).map_err(io_error)?;
            written += chunk.len() as u64;

            if let Some(total) = total {
                let percent = (written as f64 / total as f64 * 100.0).min(100.0);
                // One notice per whole percent keeps the terminal readable.
                let whole = percent.floor() as u64;
                if reported != Some(whole) {
                    reported = Some(whole);
                    report_progress(sink, artifact, percent);
                }
            }
        }
        if total.is_none() || reported != Some(100) {
            report_progress(sink, artifact, 100.0);
        }

        tmp.flush().map_err(io_error)?;
        tmp.as_file_mut().sync_all().map_err(io_error)?;
        commit(tmp, destination).map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;
        launch_debug!("{} downloaded: {} bytes -> {}", artifact, written, destination.display());
        Ok(written)
    }
}

fn report_progress(sink: &dyn ProgressSink, artifact: Artifact, percent: f64) {
    sink.emit(EngineEvent::DownloadProgress { artifact, percent });
    status_line(sink, format!("Download progress: {percent:.2}%"));
}

fn io_error(err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
