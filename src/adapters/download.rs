use crate::domain::ports::Downloader;
use crate::utils::error::{PlateauError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Last path segment of the URL, without query string.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| PlateauError::InvalidConfigValueError {
        field: "url".to_string(),
        value: url.to_string(),
        reason: e.to_string(),
    })?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PlateauError::InvalidConfigValueError {
            field: "url".to_string(),
            value: url.to_string(),
            reason: "URL has no file name".to_string(),
        })
}

/// Opens a zip archive and returns its entry count.
pub fn verify_zip(path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)?;
    let archive = zip::ZipArchive::new(file)?;
    Ok(archive.len())
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download_to(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(file_name_from_url(url)?);
        tracing::info!("downloading {} to {}", url, path.display());

        let mut response = self.client.get(url).send().await?.error_for_status()?;

        tokio::fs::create_dir_all(dir).await?;
        let mut file = tokio::fs::File::create(&path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        tracing::debug!("downloaded {} bytes", written);

        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) {
            let zip_path = path.clone();
            let entries = tokio::task::spawn_blocking(move || verify_zip(&zip_path))
                .await
                .map_err(std::io::Error::from)??;
            tracing::info!("downloaded zip has {} entries", entries);
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn zip_bytes() -> Vec<u8> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("udx/bldg/53394525_bldg_6697_op.gml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<core:CityModel/>").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/assets/a/13101_citygml.zip?x=1").unwrap(),
            "13101_citygml.zip"
        );
        assert!(file_name_from_url("https://example.com/").is_err());
        assert!(file_name_from_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_download_zip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/assets/13101_citygml.zip");
            then.status(200).body(zip_bytes());
        });

        let dir = TempDir::new().unwrap();
        let path = HttpDownloader::new()
            .download_to(&server.url("/assets/13101_citygml.zip"), dir.path())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(path, dir.path().join("13101_citygml.zip"));
        assert_eq!(verify_zip(&path).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_download_broken_zip_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken.zip");
            then.status(200).body("not a zip");
        });

        let dir = TempDir::new().unwrap();
        let err = HttpDownloader::new()
            .download_to(&server.url("/broken.zip"), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, PlateauError::ZipError(_)));
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.zip");
            then.status(404);
        });

        let dir = TempDir::new().unwrap();
        let err = HttpDownloader::new()
            .download_to(&server.url("/missing.zip"), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, PlateauError::ApiError(_)));
    }
}
