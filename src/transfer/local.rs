//! Local-disk file source
//!
//! The CLI's stand-in for the inbound messaging client: serves a file
//! already on disk as a chunked byte stream.

use crate::error::{RelayError, Result};
use crate::transfer::{ByteStream, FileSource};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;

pub struct LocalFileSource {
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl LocalFileSource {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(RelayError::Validation(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RelayError::Validation(format!("Invalid file name: {}", path.display()))
            })?;

        Ok(Self {
            path,
            file_name,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn declared_size(&self) -> u64 {
        self.size
    }

    async fn open(&self) -> Result<ByteStream> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(ReaderStream::new(file).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_source_reports_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[7u8; 256])
            .unwrap();

        let source = LocalFileSource::new(&path).await.unwrap();
        assert_eq!(source.file_name(), "sample.bin");
        assert_eq!(source.declared_size(), 256);
    }

    #[tokio::test]
    async fn test_source_streams_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[42u8; 1000])
            .unwrap();

        let source = LocalFileSource::new(&path).await.unwrap();
        let mut stream = source.open().await.unwrap();
        let mut total = 0u64;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len() as u64;
        }
        assert_eq!(total, 1000);
    }

    #[tokio::test]
    async fn test_missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileSource::new(dir.path().join("absent.bin")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileSource::new(dir.path()).await;
        assert!(matches!(result, Err(RelayError::Validation(_))));
    }
}
