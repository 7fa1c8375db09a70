//! Images already present in the project tree, usable as video sources
//! without an upload.

use super::media::is_supported_extension;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Directories searched, relative to the project root. The root itself comes last.
pub const SEARCH_DIRS: [&str; 5] = ["img", "images", "assets", "storage/images", "."];

/// Directory names never descended into, wherever they appear.
const SKIPPED_NAMES: [&str; 2] = ["target", "node_modules"];

const MAX_DEPTH: usize = 6;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LocalImageError {
    #[error("Image path must be relative to the project and stay inside it: {0}")]
    OutsideProject(String),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LocalImage {
    /// Project-relative path with forward slashes.
    pub path: String,
    pub name: String,
    pub size_bytes: u64,
    /// Human-readable size, e.g. `12.5 KB`.
    pub size: String,
}

pub struct LocalImageScanner {
    project_root: PathBuf,
    /// Canonical paths of directories excluded from listings.
    skipped: Vec<PathBuf>,
}

impl LocalImageScanner {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            skipped: Vec::new(),
        }
    }

    /// Exclude these directories, e.g. the service's own output and upload
    /// storage. Directories that do not exist yet are ignored.
    pub fn skipping<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.skipped
            .extend(dirs.into_iter().filter_map(|d| d.as_ref().canonicalize().ok()));
        self
    }

    /// All supported images under the search directories, deduplicated and
    /// sorted by path. Blocking; run it off the async executor.
    pub fn scan(&self) -> Vec<LocalImage> {
        let mut found = BTreeMap::new();

        for dir in SEARCH_DIRS {
            let base = self.project_root.join(dir);
            if !base.is_dir() || self.is_skipped(&base) {
                continue;
            }

            for entry in WalkDir::new(&base)
                .max_depth(MAX_DEPTH)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !self.should_skip_dir(e))
            {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping unreadable entry during scan");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(image) = self.describe(entry.path()) {
                    found.entry(image.path.clone()).or_insert(image);
                }
            }
        }

        found.into_values().collect()
    }

    /// Resolve a caller-supplied project-relative path to a readable image.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, LocalImageError> {
        let requested = Path::new(relative.trim());
        let escapes = requested.as_os_str().is_empty()
            || requested
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LocalImageError::OutsideProject(relative.to_string()));
        }

        let candidate = self.project_root.join(requested);
        let canonical = candidate
            .canonicalize()
            .map_err(|_| LocalImageError::NotFound(relative.to_string()))?;
        let root = self
            .project_root
            .canonicalize()
            .map_err(|_| LocalImageError::NotFound(relative.to_string()))?;
        // Symlinks may still point elsewhere.
        if !canonical.starts_with(&root) {
            return Err(LocalImageError::OutsideProject(relative.to_string()));
        }
        if !canonical.is_file() {
            return Err(LocalImageError::NotFound(relative.to_string()));
        }

        let supported = canonical
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_supported_extension);
        if !supported {
            return Err(LocalImageError::UnsupportedType(relative.to_string()));
        }

        Ok(canonical)
    }

    fn should_skip_dir(&self, entry: &walkdir::DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || SKIPPED_NAMES.contains(&name.as_ref()) {
            return true;
        }
        self.is_skipped(entry.path())
    }

    fn is_skipped(&self, dir: &Path) -> bool {
        !self.skipped.is_empty()
            && dir
                .canonicalize()
                .is_ok_and(|path| self.skipped.contains(&path))
    }

    fn describe(&self, path: &Path) -> Option<LocalImage> {
        let ext = path.extension()?.to_str()?;
        if !is_supported_extension(ext) {
            return None;
        }
        let rel = path.strip_prefix(&self.project_root).ok()?;
        let size_bytes = std::fs::metadata(path).ok()?.len();

        Some(LocalImage {
            path: normalize(&to_forward_slashes(rel)),
            name: path.file_name()?.to_string_lossy().into_owned(),
            size_bytes,
            size: human_size(size_bytes),
        })
    }
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `./img/a.png` and `img/a.png` name the same file.
fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub fn human_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes < MB {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("img/nested")).unwrap();
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("storage/generated")).unwrap();
        fs::create_dir_all(root.join("storage/images")).unwrap();
        fs::create_dir_all(root.join("storage/uploads")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("img/cat.png"), vec![0u8; 2048]).unwrap();
        fs::write(root.join("img/nested/dog.JPG"), vec![0u8; 10]).unwrap();
        fs::write(root.join("assets/logo.webp"), vec![0u8; 3 * 1024 * 1024]).unwrap();
        fs::write(root.join("assets/readme.txt"), b"text").unwrap();
        fs::write(root.join(".git/hidden.png"), b"x").unwrap();
        fs::write(root.join("storage/generated/veo_video_1_a.png"), b"x").unwrap();
        fs::write(root.join("storage/uploads/upload_1_b.png"), b"x").unwrap();
        fs::write(root.join("storage/images/sky.jpg"), b"x").unwrap();
        fs::write(root.join("node_modules/pkg/icon.png"), b"x").unwrap();
        fs::write(root.join("cover.gif"), b"gif").unwrap();
        dir
    }

    #[test]
    fn scan_finds_each_image_once() {
        let dir = project();
        let root = dir.path();
        let images = LocalImageScanner::new(root)
            .skipping([root.join("storage/generated"), root.join("storage/uploads")])
            .scan();

        let paths: Vec<&str> = images.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "assets/logo.webp",
                "cover.gif",
                "img/cat.png",
                "img/nested/dog.JPG",
                "storage/images/sky.jpg",
            ]
        );
        let logo = &images[0];
        assert_eq!(logo.name, "logo.webp");
        assert_eq!(logo.size, "3.0 MB");
        assert_eq!(images[2].size, "2.0 KB");
    }

    #[test]
    fn skipped_directories_come_from_the_caller() {
        let dir = project();
        let root = dir.path();
        let images = LocalImageScanner::new(root)
            .skipping([root.join("storage/images"), root.join("does/not/exist")])
            .scan();

        let paths: Vec<&str> = images.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"storage/generated/veo_video_1_a.png"));
        assert!(paths.contains(&"storage/uploads/upload_1_b.png"));
        assert!(!paths.contains(&"storage/images/sky.jpg"));
        assert!(!paths.iter().any(|p| p.starts_with("node_modules")));
    }

    #[test]
    fn resolve_accepts_project_images() {
        let dir = project();
        let scanner = LocalImageScanner::new(dir.path());

        let path = scanner.resolve("img/cat.png").unwrap();

        assert!(path.ends_with("img/cat.png"));
    }

    #[test]
    fn resolve_rejects_traversal_and_absolute_paths() {
        let dir = project();
        let scanner = LocalImageScanner::new(dir.path().join("img"));

        assert!(matches!(
            scanner.resolve("../assets/logo.webp"),
            Err(LocalImageError::OutsideProject(_))
        ));
        assert!(matches!(
            scanner.resolve("/etc/passwd"),
            Err(LocalImageError::OutsideProject(_))
        ));
        assert!(matches!(scanner.resolve(""), Err(LocalImageError::OutsideProject(_))));
    }

    #[test]
    fn resolve_reports_missing_and_unsupported_files() {
        let dir = project();
        let scanner = LocalImageScanner::new(dir.path());

        assert!(matches!(scanner.resolve("img/missing.png"), Err(LocalImageError::NotFound(_))));
        assert!(matches!(
            scanner.resolve("assets/readme.txt"),
            Err(LocalImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn sizes_switch_to_megabytes() {
        assert_eq!(human_size(512), "0.5 KB");
        assert_eq!(human_size(1024 * 1024), "1.0 MB");
    }
}
