use crate::core::Storage;
use crate::utils::error::Result;
use std::path::Path;

/// Reads files relative to `base_path` on the local disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AdvisorError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_relative_to_base_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("profiles.csv"), b"CommuterID\n1\n").unwrap();

        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        let data = storage.read_file("profiles.csv").await.unwrap();
        assert_eq!(data, b"CommuterID\n1\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        let err = storage.read_file("missing.csv").await.unwrap_err();
        assert!(matches!(err, AdvisorError::IoError(_)));
    }
}
