use crate::models::{ArtifactKind, GeneratedArtifact};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes generated binaries into a local content directory.
///
/// Files are written to a temporary name and renamed into place, so a reader
/// never observes a partially written artifact. Concurrent writers are kept
/// apart by [`ArtifactStore::unique_name`].
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_path: PathBuf,
    public_prefix: String,
}

impl ArtifactStore {
    pub fn new(base_path: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `{prefix}_{unix_ts}_{8 hex}.{ext}`.
    pub fn unique_name(prefix: &str, ext: &str) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}_{}.{}",
            prefix,
            chrono::Utc::now().timestamp(),
            &suffix[..8],
            ext
        )
    }

    pub fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }

    pub async fn persist(
        &self,
        bytes: &[u8],
        file_name: &str,
        kind: ArtifactKind,
        source_prompt: &str,
    ) -> Result<GeneratedArtifact, PersistenceError> {
        if file_name.is_empty()
            || file_name.starts_with('.')
            || file_name.contains(['/', '\\'])
        {
            return Err(PersistenceError::InvalidName(file_name.to_string()));
        }

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.base_path.clone(),
                source,
            })?;

        let local_path = self.base_path.join(file_name);
        let temp_path = self.base_path.join(format!(".{}.part", file_name));

        if let Err(source) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PersistenceError::Io {
                path: temp_path,
                source,
            });
        }
        if let Err(source) = fs::rename(&temp_path, &local_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PersistenceError::Io {
                path: local_path,
                source,
            });
        }

        let size_bytes = fs::metadata(&local_path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: local_path.clone(),
                source,
            })?
            .len();

        tracing::info!(
            file_name = %file_name,
            kind = kind.as_str(),
            size_bytes,
            "Artifact stored"
        );

        Ok(GeneratedArtifact {
            kind,
            file_name: file_name.to_string(),
            public_path: self.public_path(file_name),
            local_path,
            size_bytes,
            source_prompt: source_prompt.to_string(),
        })
    }
}
