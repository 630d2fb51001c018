use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::DataError;

/// Read the raw sheet bytes from an `http(s)` URL or a local path.
///
/// Both paths are bounded by `timeout` so a dead sheet link fails startup
/// instead of hanging it.
pub async fn fetch_source(source: &str, timeout: Duration) -> Result<Vec<u8>, DataError> {
    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch_url(url, timeout).await,
        _ => read_file(source, timeout).await,
    }
}

async fn fetch_url(url: Url, timeout: Duration) -> Result<Vec<u8>, DataError> {
    let http = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DataError::DataSource(format!("failed to build HTTP client: {}", e)))?;

    debug!("Fetching match sheet from {}", url);
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| DataError::DataSource(format!("request to {} failed: {}", url, e)))?;

    if !resp.status().is_success() {
        return Err(DataError::DataSource(format!(
            "{} returned HTTP {}",
            url,
            resp.status()
        )));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| DataError::DataSource(format!("failed to read body from {}: {}", url, e)))?;
    info!("Downloaded match sheet ({} bytes)", body.len());
    Ok(body.to_vec())
}

async fn read_file(path: &str, timeout: Duration) -> Result<Vec<u8>, DataError> {
    debug!("Reading match sheet from {}", path);
    match tokio::time::timeout(timeout, tokio::fs::read(path)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(DataError::DataSource(format!("cannot read {}: {}", path, e))),
        Err(_) => Err(DataError::DataSource(format!(
            "reading {} timed out after {:?}",
            path, timeout
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_local_file() {
        let path = std::env::temp_dir().join(format!("bumper-odds-{}.csv", std::process::id()));
        tokio::fs::write(&path, b"Timestamp\n").await.unwrap();

        let bytes = fetch_source(path.to_str().unwrap(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, b"Timestamp\n");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_is_a_data_source_error() {
        let err = fetch_source("/definitely/not/here.csv", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::DataSource(_)));
    }

    #[tokio::test]
    async fn unreachable_url_is_a_data_source_error() {
        // Port 9 on loopback is closed in test environments.
        let err = fetch_source("http://127.0.0.1:9/sheet.csv", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::DataSource(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out_as_data_source_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let started = std::time::Instant::now();
        let err = fetch_source(&format!("http://{}/sheet.csv", addr), Duration::from_secs(1))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, DataError::DataSource(_)));
        assert!(elapsed >= Duration::from_millis(900), "gave up after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "hung for {:?}", elapsed);
        server.abort();
    }
}
