use std::path::PathBuf;

use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::error;

/// Flat on-disk store for post image attachments.
///
/// Files are written to a temp path first and renamed into place, so a
/// partially written upload never becomes visible.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Stores the data and returns the relative path to keep with the post.
    pub async fn save(
        &self,
        subdir: &str,
        file_name: &str,
        data: Bytes,
    ) -> std::io::Result<String> {
        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).await?;
        let final_path = dir.join(file_name);
        let temp_path = final_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        if let Err(e) = file.write_all(&data).await {
            error!("Failed to store file to tmp path {temp_path:?}: {e}");
            fs::remove_file(&temp_path)
                .await
                .map_err(|e| error!("Failed to remove file {temp_path:?}: {e}"))
                .ok();
            return Err(e);
        }
        file.flush().await?;
        drop(file);
        fs::rename(&temp_path, &final_path).await?;

        Ok(format!("{subdir}/{file_name}"))
    }

    pub async fn open(&self, relative_path: &str) -> std::io::Result<fs::File> {
        fs::File::open(self.root.join(relative_path)).await
    }
}

/// File extension for the few image content types posts accept.
pub fn ext_for_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt as _;

    use super::*;

    #[tokio::test]
    async fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());

        let path = store
            .save("posts", "cover.png", Bytes::from_static(b"not really a png"))
            .await
            .unwrap();
        assert_eq!(path, "posts/cover.png");

        let mut file = store.open(&path).await.unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"not really a png");

        // no temp leftovers
        assert!(!dir.path().join("posts/cover.tmp").exists());
    }

    #[tokio::test]
    async fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf());
        assert!(store.open("posts/nope.png").await.is_err());
    }

    #[test]
    fn test_ext_for_mime() {
        assert_eq!(ext_for_mime("image/png"), Some("png"));
        assert_eq!(ext_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_for_mime("application/pdf"), None);
    }
}
