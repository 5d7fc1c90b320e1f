//! Fetches encoded audio into memory so decoders get a seekable buffer.

use std::io::Read;
use std::path::Path;

use bytes::Bytes;

use crate::error::{Result, SpeakerError};

pub async fn read_file(path: &Path) -> Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| SpeakerError::fetch(path.display().to_string(), e))?;

    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(Bytes::from(data))
}

pub async fn get_url(url: &str) -> Result<Bytes> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| SpeakerError::fetch(url, e))?
        .error_for_status()
        .map_err(|e| SpeakerError::fetch(url, e))?;

    let data = response
        .bytes()
        .await
        .map_err(|e| SpeakerError::fetch(url, e))?;

    debug!("Downloaded {} bytes from {url}", data.len());
    Ok(data)
}

/// Drain a blocking byte-stream handle on a worker thread.
pub async fn read_stream(mut reader: Box<dyn Read + Send>) -> Result<Bytes> {
    let data = tokio::task::spawn_blocking(move || {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map(|_| data)
    })
    .await?
    .map_err(|e| SpeakerError::fetch("byte stream", e))?;

    Ok(Bytes::from(data))
}

/// File extension of a path or URL, ignoring any query string or fragment.
pub fn extension_of(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let name = path.rsplit('/').next().unwrap_or(path);

    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
