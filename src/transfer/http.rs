//! HTTP implementation of [`Transfer`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{Client, RequestBuilder, StatusCode};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use super::{CONNECT_TIMEOUT_SECS, FetchOptions, RequestHeaders, Transfer, TransferError};

/// Streams files over HTTP(S) with ranged resume.
///
/// No total request timeout is set: renditions can take hours to download and
/// liveness is enforced by the stall watchdog instead.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    /// Creates a transfer client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, TransferError> {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a transfer client with a custom connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Client`] if the TLS backend cannot be initialized.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .gzip(true)
            .build()
            .map_err(|source| TransferError::Client { source })?;
        Ok(Self { client })
    }

    fn request(&self, url: &str, headers: &RequestHeaders) -> Result<RequestBuilder, TransferError> {
        Url::parse(url).map_err(|_| TransferError::invalid_url(url))?;
        let mut request = self.client.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        Ok(request)
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        offset: u64,
    ) -> Result<reqwest::Response, TransferError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::timeout(url)
            } else {
                TransferError::network(url, e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(TransferError::range_not_satisfiable(url, offset));
        }
        if !status.is_success() {
            return Err(TransferError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    #[instrument(skip(self, headers))]
    async fn probe_size(
        &self,
        url: &str,
        headers: &RequestHeaders,
    ) -> Result<Option<u64>, TransferError> {
        // Some CDNs reject HEAD on signed links, so the body is opened and dropped.
        let request = self.request(url, headers)?;
        let response = self.send(url, request, 0).await?;
        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        debug!(?length, "probed remote size");
        Ok(length)
    }

    #[instrument(skip(self, options), fields(resume_from = options.resume_from))]
    async fn fetch(
        &self,
        url: &str,
        target: &Path,
        options: &FetchOptions,
    ) -> Result<(), TransferError> {
        let mut request = self.request(url, &options.headers)?;
        if options.resume_from > 0 {
            request = request.header(RANGE, format!("bytes={}-", options.resume_from));
        }
        let response = self.send(url, request, options.resume_from).await?;

        let resumed = options.resume_from > 0 && response.status() == StatusCode::PARTIAL_CONTENT;
        let file = if resumed {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(target)
                .await
                .map_err(|e| TransferError::io(target, e))?
        } else {
            if options.resume_from > 0 {
                debug!("server ignored range request, restarting from zero");
            }
            File::create(target)
                .await
                .map_err(|e| TransferError::io(target, e))?
        };
        let start = if resumed { options.resume_from } else { 0 };

        let written = stream_to_file(file, response, url, target, start, options).await?;
        debug!(path = %target.display(), bytes = written, resumed, "transfer complete");
        Ok(())
    }
}

/// Streams the response body to `file`, returning the final size on disk.
///
/// Each chunk is flushed before progress is reported, so a transfer dropped
/// by the watchdog leaves every reported byte on disk.
async fn stream_to_file(
    mut file: File,
    response: reqwest::Response,
    url: &str,
    target: &Path,
    start: u64,
    options: &FetchOptions,
) -> Result<u64, TransferError> {
    let mut stream = response.bytes_stream();
    let mut on_disk = start;

    if let Some(progress) = &options.on_progress {
        progress(on_disk);
    }

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| TransferError::network(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(target, e))?;
        file.flush()
            .await
            .map_err(|e| TransferError::io(target, e))?;
        on_disk += chunk.len() as u64;
        if let Some(progress) = &options.on_progress {
            progress(on_disk);
        }
    }

    Ok(on_disk)
}
