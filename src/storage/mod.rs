use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no file extension is mapped for content type '{0}'")]
    UnmappedContentType(String),
}

/// Where manuscript bytes end up. Implementations hand back a stable URL that
/// is stored on the submission as `manuscriptFileUrl`.
pub trait ManuscriptStore: Send + Sync {
    fn save(&self, bytes: &[u8], content_type: &str) -> Result<String, StorageError>;
}

/// Maps an accepted MIME type to the extension used on disk.
/// Kept fixed so configuration can never introduce an unsafe extension.
pub fn mime_to_safe_extension(mime_type: &str) -> Option<&'static str> {
    let map: BTreeMap<&str, &str> = [
        ("application/msword", "doc"),
        ("application/pdf", "pdf"),
        (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        ),
        ("application/rtf", "rtf"),
        ("text/plain", "txt"),
    ]
    .iter()
    .cloned()
    .collect();

    map.get(mime_type).cloned()
}

/// Writes manuscripts below `<root>/xx/yy/<uuid>.<ext>` and serves them from `url_prefix`.
pub struct LocalManuscriptStore {
    root: PathBuf,
    url_prefix: String,
}

impl LocalManuscriptStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        LocalManuscriptStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl ManuscriptStore for LocalManuscriptStore {
    fn save(&self, bytes: &[u8], content_type: &str) -> Result<String, StorageError> {
        let ext = mime_to_safe_extension(content_type)
            .ok_or_else(|| StorageError::UnmappedContentType(content_type.to_string()))?;

        let file_id = Uuid::new_v4().to_string();
        let dir1 = &file_id[0..2];
        let dir2 = &file_id[2..4];
        let dir = self.root.join(dir1).join(dir2);
        fs::create_dir_all(&dir)?;

        let file_name = format!("{}.{}", file_id, ext);
        fs::write(dir.join(&file_name), bytes)?;

        Ok(format!("{}/{}/{}/{}", self.url_prefix, dir1, dir2, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_store_shards_by_id_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalManuscriptStore::new(dir.path(), "/media/manuscripts/");

        let url = store.save(b"%PDF-1.4", "application/pdf").unwrap();
        assert!(url.starts_with("/media/manuscripts/"));
        assert!(url.ends_with(".pdf"));

        let relative = url.trim_start_matches("/media/manuscripts/");
        let on_disk = dir.path().join(relative);
        assert_eq!(fs::read(on_disk).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn unknown_content_type_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalManuscriptStore::new(dir.path(), "/media/manuscripts");
        assert!(matches!(
            store.save(b"MZ", "application/x-msdownload"),
            Err(StorageError::UnmappedContentType(_))
        ));
    }
}
