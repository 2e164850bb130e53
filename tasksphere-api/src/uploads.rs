/// File-upload policy and storage
///
/// Uploads (task attachments, avatars) pass a shared policy: an extension
/// allow-list of jpg/jpeg/png/pdf and a 2 MB size cap. Accepted files are
/// written under the configured upload directory with a generated uuid
/// filename, so uploads can never collide or traverse paths.

use bytes::Bytes;
use uuid::Uuid;

/// Allowed file extensions (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// Maximum upload size in bytes (2 MB)
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Error type for upload handling
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Extension missing or not on the allow-list
    #[error("Only .jpg, .jpeg, .png, .pdf files are allowed")]
    DisallowedType,

    /// File exceeds the size cap
    #[error("File exceeds the 2MB size limit")]
    TooLarge,

    /// Filesystem write failed
    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracts the lowercased extension from a filename
pub fn file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Validates a file against the upload policy
///
/// Checks the extension allow-list and the size cap. Returns the accepted
/// extension on success.
pub fn validate_upload(filename: &str, size: usize) -> Result<String, UploadError> {
    let ext = file_extension(filename).ok_or(UploadError::DisallowedType)?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::DisallowedType);
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }

    Ok(ext)
}

/// Stores an accepted upload on disk
///
/// Writes under `<upload_dir>/<subdir>/` with a uuid filename carrying the
/// original extension, creating directories as needed. Returns the stored
/// path (relative to the working directory).
pub async fn store_upload(
    upload_dir: &str,
    subdir: &str,
    filename: &str,
    data: Bytes,
) -> Result<String, UploadError> {
    let ext = validate_upload(filename, data.len())?;

    let dir = format!("{}/{}", upload_dir.trim_end_matches('/'), subdir);
    tokio::fs::create_dir_all(&dir).await?;

    let stored_path = format!("{}/{}.{}", dir, Uuid::new_v4(), ext);
    tokio::fs::write(&stored_path, &data).await?;

    Ok(stored_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("photo.jpeg"), Some("jpeg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("no_extension"), None);
    }

    #[test]
    fn test_validate_upload_allowed_types() {
        assert!(validate_upload("a.jpg", 100).is_ok());
        assert!(validate_upload("a.jpeg", 100).is_ok());
        assert!(validate_upload("a.png", 100).is_ok());
        assert!(validate_upload("a.pdf", 100).is_ok());
        assert_eq!(validate_upload("a.PNG", 100).unwrap(), "png");
    }

    #[test]
    fn test_validate_upload_rejects_disallowed_types() {
        assert!(matches!(
            validate_upload("script.exe", 100),
            Err(UploadError::DisallowedType)
        ));
        assert!(matches!(
            validate_upload("notes.txt", 100),
            Err(UploadError::DisallowedType)
        ));
        assert!(matches!(
            validate_upload("noext", 100),
            Err(UploadError::DisallowedType)
        ));
    }

    #[test]
    fn test_validate_upload_rejects_oversize() {
        assert!(validate_upload("a.pdf", MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_upload("a.pdf", MAX_UPLOAD_BYTES + 1),
            Err(UploadError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_store_upload_writes_file() {
        let dir = std::env::temp_dir().join(format!("tasksphere-test-{}", Uuid::new_v4()));
        let dir_str = dir.to_str().unwrap().to_string();

        let stored = store_upload(&dir_str, "tasks", "doc.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        assert!(stored.ends_with(".pdf"));
        let contents = tokio::fs::read(&stored).await.unwrap();
        assert_eq!(contents, b"%PDF");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
