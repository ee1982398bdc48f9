use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::util::format_speed;

const USER_AGENT: &str = concat!("mnc-ka-launcher/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, String> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("GET {url} failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("GET {url} status error: {e}"))?
            .text()
            .await
            .map_err(|e| format!("GET {url} body error: {e}"))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| format!("failed to parse {url}: {e}"))
    }

    /// Stream `url` into `dest`, calling `progress` with (downloaded, total).
    ///
    /// Bytes land in `<dest>.part` first; `dest` only appears once the whole
    /// body arrived. Returns the number of bytes written.
    pub async fn download_to_path<F>(
        &self,
        url: &str,
        dest: &Path,
        progress: F,
    ) -> Result<u64, String>
    where
        F: FnMut(u64, Option<u64>),
    {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create download dir: {e}"))?;
        }
        let partial = partial_path(dest);
        let started = Instant::now();

        let downloaded = match self.stream_to_file(url, &partial, progress).await {
            Ok(downloaded) => downloaded,
            Err(err) => {
                if fs::remove_file(&partial).await.is_ok() {
                    debug!("removed partial download {}", partial.display());
                }
                return Err(err);
            }
        };
        fs::rename(&partial, dest)
            .await
            .map_err(|e| format!("failed to move download into {}: {e}", dest.display()))?;

        let elapsed = started.elapsed().as_secs_f32().max(f32::EPSILON);
        debug!(
            "downloaded {} ({} bytes, {})",
            url,
            downloaded,
            format_speed(downloaded as f32 / elapsed)
        );
        Ok(downloaded)
    }

    async fn stream_to_file<F>(&self, url: &str, path: &Path, mut progress: F) -> Result<u64, String>
    where
        F: FnMut(u64, Option<u64>),
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("download request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("download status error: {e}"))?;

        let mut file = File::create(path)
            .await
            .map_err(|e| format!("failed to create file {}: {e}", path.display()))?;

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("stream error: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write error: {e}"))?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total);
        }

        file.flush()
            .await
            .map_err(|e| format!("flush error: {e}"))?;

        if let Some(total) = total
            && downloaded < total
        {
            return Err(format!(
                "download incomplete: received {} of {} bytes",
                downloaded, total
            ));
        }
        Ok(downloaded)
    }

    /// Download a file unless a copy with the expected SHA-1 is already on disk.
    ///
    /// Without a checksum an existing file is trusted as-is.
    pub async fn download_verified(
        &self,
        url: &str,
        dest: &Path,
        sha1: Option<&str>,
    ) -> Result<(), String> {
        if fs::metadata(dest).await.is_ok() {
            match sha1 {
                None => return Ok(()),
                Some(expected) if sha1_file(dest).await? == expected => return Ok(()),
                Some(_) => debug!("checksum mismatch for {}, downloading again", dest.display()),
            }
        }

        self.download_to_path(url, dest, |_, _| {}).await?;

        if let Some(expected) = sha1 {
            let actual = sha1_file(dest).await?;
            if actual != expected {
                let _ = fs::remove_file(dest).await;
                return Err(format!(
                    "checksum mismatch for {}: expected {expected}, got {actual}",
                    dest.display()
                ));
            }
        }
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

pub async fn sha1_file(path: &Path) -> Result<String, String> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(sha1_hex(&bytes))
}

#[must_use]
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `body` once over plain HTTP and return the base URL.
    pub async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        serve_with_length(status_line, body, body.len()).await
    }

    /// Like [`serve_once`] but announces `content_length`, which may exceed
    /// the bytes actually sent.
    pub async fn serve_with_length(
        status_line: &'static str,
        body: &'static [u8],
        content_length: usize,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let header = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_input() {
        assert_eq!(
            sha1_hex(b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[tokio::test]
    async fn verified_download_skips_matching_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("cached.bin");
        tokio::fs::write(&dest, b"hello").await.unwrap();

        let client = NetworkClient::new();
        // Unreachable URL: succeeding proves no request was made.
        client
            .download_verified(
                "http://127.0.0.1:9/never",
                &dest,
                Some("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verified_download_rejects_bad_checksum() {
        let base = test_server::serve_once("200 OK", b"payload").await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("file.bin");

        let err = NetworkClient::new()
            .download_verified(&format!("{base}/file.bin"), &dest, Some("deadbeef"))
            .await
            .unwrap_err();
        assert!(err.contains("checksum mismatch"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn truncated_body_leaves_no_file_behind() {
        let base = test_server::serve_with_length("200 OK", b"partial", 1000).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("lib.jar");

        let result = NetworkClient::new()
            .download_to_path(&format!("{base}/lib.jar"), &dest, |_, _| {})
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
