use anyhow::{Error, anyhow};
use bytes::Bytes;
use reqwest::get as reqwest_get;
use tokio::fs::read as tokio_fs_read;
use url::Url;

/// Fetches the full body of a resource.
///
/// Supported URL schemes:
/// - `http`, `https`: Fetched via `reqwest`
/// - `file`: Read from the local filesystem
///
/// # Errors
///
/// - Returns `Err` if the URL scheme is unsupported
/// - Returns `Err` if HTTP fetch fails or returns a non-success status
/// - Returns `Err` if the file path is invalid or the file cannot be read
pub async fn fetch_bytes(url: &Url) -> Result<Bytes, Error> {
    match url.scheme() {
        "http" | "https" => {
            let response = reqwest_get(url.clone())
                .await
                .map_err(|err| anyhow!("Failed to fetch URL {url}: {err}"))?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Failed to fetch URL: {} (Status: {})",
                    url,
                    response.status()
                ));
            }
            response
                .bytes()
                .await
                .map_err(|err| anyhow!("Failed to read body of {url}: {err}"))
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| anyhow!("Invalid file path for file url: {url}"))?;
            let data = tokio_fs_read(&path)
                .await
                .map_err(|err| anyhow!("Failed to read {}: {err}", path.display()))?;
            Ok(Bytes::from(data))
        }
        _ => Err(anyhow!("Unsupported url scheme {}", url.scheme())),
    }
}
