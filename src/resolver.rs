//! Request parameters to on-disk files

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::routing::RequestFlag;

/// Length of the date and extension suffix of live update files, `_18_06_02.obf.gz`
pub const DATE_AND_EXT_LEN: usize = 16;

/// Errors from file resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Name is empty or would escape the files root
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// No candidate location holds the file
    #[error("File not found: {0}")]
    NotFound(String),
}

/// A file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,

    /// File name sent in `Content-Disposition`
    pub name: String,

    pub len: u64,
}

/// Maps a flag and file name to a file under the files root
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory, relative to the root, that a flag points into
    pub fn flag_dir(flag: RequestFlag, file_name: &str) -> Result<PathBuf, ResolveError> {
        let dir = match flag {
            RequestFlag::Srtm => PathBuf::from("srtm"),
            RequestFlag::SrtmCountry => PathBuf::from("srtm-countries"),
            RequestFlag::Road => PathBuf::from("road-indexes"),
            RequestFlag::Osmc => Path::new("osmc").join(day_folder(file_name)?),
            RequestFlag::Aosmc => Path::new("aosmc").join(day_folder(file_name)?),
            RequestFlag::Wiki | RequestFlag::Wikivoyage => PathBuf::from("wiki"),
            RequestFlag::Hillshade => PathBuf::from("hillshade"),
            RequestFlag::Inapp => PathBuf::from("indexes/inapp"),
            RequestFlag::Fonts => PathBuf::from("indexes/fonts"),
            RequestFlag::Standard => PathBuf::from("indexes"),
        };
        Ok(dir)
    }

    /// Candidate paths in priority order
    pub fn candidates(&self, dir: &Path, file_name: &str) -> [PathBuf; 4] {
        let zipped = format!("{file_name}.zip");
        [
            self.root.join(&zipped),
            self.root.join(dir).join(&zipped),
            self.root.join(file_name),
            self.root.join(dir).join(file_name),
        ]
    }

    /// Resolve a download request
    pub async fn resolve(&self, flag: RequestFlag, file_name: &str) -> Result<ResolvedFile, ResolveError> {
        check_name(file_name)?;
        let dir = Self::flag_dir(flag, file_name)?;
        self.resolve_in(&dir, file_name).await
    }

    /// Resolve `file_name` against the root and `dir`
    pub async fn resolve_in(&self, dir: &Path, file_name: &str) -> Result<ResolvedFile, ResolveError> {
        check_name(file_name)?;

        for candidate in self.candidates(dir, file_name) {
            if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
                if metadata.is_file() {
                    let name = candidate
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file_name.to_string());
                    return Ok(ResolvedFile {
                        path: candidate,
                        name,
                        len: metadata.len(),
                    });
                }
            }
        }

        tracing::debug!(file = %file_name, dir = %dir.display(), "No candidate matched");
        Err(ResolveError::NotFound(file_name.to_string()))
    }
}

fn check_name(file_name: &str) -> Result<(), ResolveError> {
    if file_name.is_empty()
        || file_name.contains(['/', '\\', '\0'])
        || file_name.contains("..")
    {
        return Err(ResolveError::InvalidName(file_name.to_string()));
    }
    Ok(())
}

/// Live update folder: the name without its date and extension, lower-cased
fn day_folder(file_name: &str) -> Result<String, ResolveError> {
    file_name
        .len()
        .checked_sub(DATE_AND_EXT_LEN)
        .and_then(|end| file_name.get(..end))
        .map(str::to_lowercase)
        .ok_or_else(|| ResolveError::NotFound(file_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, len: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![0u8; len]).unwrap();
    }

    #[tokio::test]
    async fn test_prefers_zip_variant() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("indexes/Germany_europe.obf.zip"), 12);

        let resolver = FileResolver::new(root.path());
        let file = resolver
            .resolve(RequestFlag::Standard, "Germany_europe.obf")
            .await
            .unwrap();
        assert_eq!(file.path, root.path().join("indexes/Germany_europe.obf.zip"));
        assert_eq!(file.name, "Germany_europe.obf.zip");
        assert_eq!(file.len, 12);
    }

    #[tokio::test]
    async fn test_candidate_priority() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("wiki/Spain.obf"), 1);
        touch(&root.path().join("Spain.obf"), 2);

        let resolver = FileResolver::new(root.path());
        let file = resolver.resolve(RequestFlag::Wiki, "Spain.obf").await.unwrap();
        assert_eq!(file.path, root.path().join("Spain.obf"));

        touch(&root.path().join("Spain.obf.zip"), 3);
        let file = resolver.resolve(RequestFlag::Wikivoyage, "Spain.obf").await.unwrap();
        assert_eq!(file.path, root.path().join("Spain.obf.zip"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("indexes/Nowhere.obf")).unwrap();

        let resolver = FileResolver::new(root.path());
        assert_eq!(
            resolver.resolve(RequestFlag::Standard, "Nowhere.obf").await,
            Err(ResolveError::NotFound("Nowhere.obf".to_string()))
        );
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let resolver = FileResolver::new(root.path());

        for name in ["../secret", "a/b.obf", "..", "", "a\\b"] {
            assert!(matches!(
                resolver.resolve(RequestFlag::Standard, name).await,
                Err(ResolveError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_live_update_day_folder() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("aosmc/germany_europe/Germany_europe_18_06_02.obf.gz"), 4);

        let resolver = FileResolver::new(root.path());
        let file = resolver
            .resolve(RequestFlag::Aosmc, "Germany_europe_18_06_02.obf.gz")
            .await
            .unwrap();
        assert_eq!(file.len, 4);

        assert!(matches!(
            resolver.resolve(RequestFlag::Osmc, "short.obf").await,
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_flag_dirs() {
        assert_eq!(
            FileResolver::flag_dir(RequestFlag::SrtmCountry, "x").unwrap(),
            PathBuf::from("srtm-countries")
        );
        assert_eq!(
            FileResolver::flag_dir(RequestFlag::Osmc, "Us_ohio_18_06_02.obf.gz").unwrap(),
            PathBuf::from("osmc/us_ohio")
        );
    }
}
