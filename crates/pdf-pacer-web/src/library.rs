//! Directory of PDFs served by id.
//!
//! A document's id is its file stem, the same id the CLI stores progress
//! under, so both front ends share saved positions. The directory is read
//! on every lookup; files can be added or removed while the server runs.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use pdf_pacer_core::document_id;

/// One PDF in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub id: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct Library {
    dir: PathBuf,
}

impl Library {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All PDFs in the directory, sorted by id
    pub async fn list(&self) -> io::Result<Vec<LibraryEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !is_pdf(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(LibraryEntry {
                id: document_id(&path),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: metadata.len(),
                path,
            });
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    /// Entry for `id`, or `None` when no PDF has that stem
    pub async fn find(&self, id: &str) -> io::Result<Option<LibraryEntry>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        Ok(self.list().await?.into_iter().find(|entry| entry.id == id))
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Ids come from URLs; anything that could name another directory is rejected
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.starts_with('.') && !id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_with(files: &[&str]) -> (TempDir, Library) {
        let dir = TempDir::new().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        let library = Library::new(dir.path());
        (dir, library)
    }

    #[tokio::test]
    async fn test_list_only_pdfs_sorted() {
        let (_dir, library) = library_with(&["zebra.pdf", "notes.txt", "Atlas.PDF", "moby-dick.pdf"]);
        let ids: Vec<_> = library
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        assert_eq!(ids, ["Atlas", "moby-dick", "zebra"]);
    }

    #[tokio::test]
    async fn test_find_by_stem() {
        let (_dir, library) = library_with(&["moby-dick.pdf"]);
        let entry = library.find("moby-dick").await.unwrap().unwrap();
        assert_eq!(entry.file_name, "moby-dick.pdf");
        assert_eq!(entry.size_bytes, 8);
        assert!(library.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_rejects_paths() {
        let (_dir, library) = library_with(&["book.pdf"]);
        assert!(library.find("../book").await.unwrap().is_none());
        assert!(library.find(".hidden").await.unwrap().is_none());
        assert!(library.find("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let library = Library::new("/nonexistent/pdf-pacer-library");
        assert!(library.list().await.is_err());
    }
}
