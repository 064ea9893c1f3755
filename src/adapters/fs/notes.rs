//! Filesystem-backed detail notes.
//!
//! One markdown file per item under `<dir>/<id>.md`. Sections are only ever
//! appended; the file stays readable as a running investigation log.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::errors::HuntResult;
use crate::domain::models::work_item::ItemId;
use crate::domain::ports::notes::DetailNotes;

pub struct FsDetailNotes {
    dir: PathBuf,
}

impl FsDetailNotes {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, item_id: &ItemId) -> PathBuf {
        self.dir.join(format!("{item_id}.md"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DetailNotes for FsDetailNotes {
    async fn load(&self, item_id: &ItemId) -> HuntResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(item_id)).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn append(&self, item_id: &ItemId, title: &str, body: &str) -> HuntResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(item_id);
        let mut text = match tokio::fs::read_to_string(&path).await {
            Ok(existing) => existing,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                format!("# {item_id}\n")
            }
            Err(err) => return Err(err.into()),
        };
        text.push_str(&format!("\n## {title}\n\n{body}\n"));
        tokio::fs::write(&path, text).await?;
        Ok(())
    }

    async fn remove(&self, item_id: &ItemId) -> HuntResult<()> {
        match tokio::fs::remove_file(self.path_for(item_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
