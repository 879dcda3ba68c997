//! Where tile image bytes come from

use anyhow::{Context, Result, bail};
use std::path::{Component, Path, PathBuf};

/// Credentials mode of an image request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrossOrigin {
    #[default]
    Anonymous,
    UseCredentials,
}

/// One image fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    pub url: String,
    pub cross_origin: CrossOrigin,
}

impl ImageRequest {
    pub fn anonymous(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cross_origin: CrossOrigin::Anonymous,
        }
    }
}

/// Fetches encoded image bytes for a tile URL
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync + 'static {
    async fn fetch(&self, request: ImageRequest) -> Result<Vec<u8>>;
}

/// Serves tile URLs as paths relative to a local directory
#[derive(Clone, Debug)]
pub struct DirectoryImageSource {
    root: PathBuf,
}

impl DirectoryImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File backing `url`; absolute URLs and `..` segments are rejected
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let relative = Path::new(url.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("Tile URL escapes the tile directory: {}", url);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ImageSource for DirectoryImageSource {
    async fn fetch(&self, request: ImageRequest) -> Result<Vec<u8>> {
        let path = self.resolve(&request.url)?;
        let bytes = tokio::task::spawn_blocking({
            let path = path.clone();
            move || std::fs::read(path)
        })
        .await
        .context("Tile read task failed")?
        .with_context(|| format!("Failed to read tile: {}", path.display()))?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escapes() {
        let source = DirectoryImageSource::new("/srv/tiles");
        assert_eq!(
            source.resolve("/3/14/14.png").unwrap(),
            PathBuf::from("/srv/tiles/3/14/14.png")
        );
        assert!(source.resolve("../secret.png").is_err());
        assert!(source.resolve("3/../../x.png").is_err());
    }

    #[tokio::test]
    async fn test_fetch_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("1")).unwrap();
        std::fs::write(dir.path().join("1").join("2.png"), b"bytes").unwrap();

        let source = DirectoryImageSource::new(dir.path());
        let bytes = source.fetch(ImageRequest::anonymous("1/2.png")).await.unwrap();
        assert_eq!(bytes, b"bytes");
        assert!(source.fetch(ImageRequest::anonymous("1/missing.png")).await.is_err());
    }
}
