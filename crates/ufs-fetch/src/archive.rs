//! Rebuild a whole tree from a walk.
//!
//! Paths here are qualified by the root name: the root entry is the root
//! name itself and every descendant is `root_name/relative/path` (or just the
//! relative path when the root name is empty). Extraction maps the empty
//! path to the destination itself, and never writes through a symlink that
//! already exists below the destination.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use ufs_codec::is_valid_entry_name;
use ufs_types::ContentAddress;
use ufs_walk::Item;

use crate::config::FetchConfig;
use crate::driver::Driver;
use crate::error::{FetchError, FetchResult};
use crate::fetcher::BlockFetcher;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File { data: Bytes },
    Symlink { target: Bytes },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: EntryKind,
}

/// Every entry of a tree in walk order, with file contents assembled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its qualified path.
    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Total bytes across all files.
    pub fn file_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| match &entry.kind {
                EntryKind::File { data } => data.len() as u64,
                _ => 0,
            })
            .sum()
    }

    /// Write every entry below `dest`. Parents precede children in walk
    /// order, so directories exist before anything is written into them.
    pub async fn extract_to(&self, dest: &Path) -> FetchResult<()> {
        for entry in &self.entries {
            let target = resolve(dest, &entry.path).await?;
            match &entry.kind {
                EntryKind::Directory => fs::create_dir_all(&target).await?,
                EntryKind::File { data } => {
                    create_parent(&target).await?;
                    fs::write(&target, data).await?;
                }
                EntryKind::Symlink { target: link } => write_symlink(&target, link).await?,
            }
        }
        debug!(dest = %dest.display(), entries = self.entries.len(), "extracted archive");
        Ok(())
    }
}

/// Walk the tree at `root` and hold it in memory.
pub async fn materialize<F: BlockFetcher + ?Sized>(
    fetcher: Arc<F>,
    root: ContentAddress,
    root_name: &str,
    config: FetchConfig,
) -> FetchResult<Archive> {
    check_root_name(root_name)?;
    let mut driver = Driver::new(fetcher, root, root_name, config);
    let mut entries = Vec::new();
    let mut open: Option<(String, BytesMut)> = None;
    let mut first = true;

    while let Some(item) = driver.next_item().await? {
        let is_root = std::mem::take(&mut first);
        match item {
            Item::Directory { is_new: false, .. } => {}
            Item::Directory { path, .. } => entries.push(ArchiveEntry {
                path: qualify(root_name, &path, is_root),
                kind: EntryKind::Directory,
            }),
            Item::Symlink { path, target } => entries.push(ArchiveEntry {
                path: qualify(root_name, &path, is_root),
                kind: EntryKind::Symlink { target },
            }),
            Item::File {
                is_new,
                path,
                segment,
            } => {
                if is_new {
                    open = Some((qualify(root_name, &path, is_root), BytesMut::new()));
                }
                if let Some((_, buf)) = open.as_mut() {
                    buf.extend_from_slice(segment.as_bytes());
                }
                if segment.is_final() {
                    if let Some((path, buf)) = open.take() {
                        entries.push(ArchiveEntry {
                            path,
                            kind: EntryKind::File { data: buf.freeze() },
                        });
                    }
                }
            }
        }
    }

    Ok(Archive { entries })
}

/// Walk the tree at `root` and write it below `dest` as it arrives. File
/// contents are streamed, never held whole. Returns the number of entries
/// written.
pub async fn materialize_to_dir<F: BlockFetcher + ?Sized>(
    fetcher: Arc<F>,
    root: ContentAddress,
    root_name: &str,
    dest: &Path,
    config: FetchConfig,
) -> FetchResult<u64> {
    check_root_name(root_name)?;
    let mut driver = Driver::new(fetcher, root, root_name, config);
    let mut open: Option<fs::File> = None;
    let mut first = true;
    let mut written = 0;

    while let Some(item) = driver.next_item().await? {
        let is_root = std::mem::take(&mut first);
        match item {
            Item::Directory { is_new: false, .. } => {}
            Item::Directory { path, .. } => {
                fs::create_dir_all(resolve(dest, &qualify(root_name, &path, is_root)).await?)
                    .await?;
                written += 1;
            }
            Item::Symlink { path, target } => {
                let link = resolve(dest, &qualify(root_name, &path, is_root)).await?;
                write_symlink(&link, &target).await?;
                written += 1;
            }
            Item::File {
                is_new,
                path,
                segment,
            } => {
                if is_new {
                    let target = resolve(dest, &qualify(root_name, &path, is_root)).await?;
                    create_parent(&target).await?;
                    open = Some(fs::File::create(&target).await?);
                    written += 1;
                }
                if let Some(file) = open.as_mut() {
                    file.write_all(segment.as_bytes()).await?;
                    if segment.is_final() {
                        file.flush().await?;
                        open = None;
                    }
                }
            }
        }
    }

    debug!(dest = %dest.display(), entries = written, "materialized tree");
    Ok(written)
}

fn qualify(root_name: &str, path: &str, is_root: bool) -> String {
    if is_root || root_name.is_empty() {
        path.to_owned()
    } else {
        format!("{root_name}/{path}")
    }
}

/// The root name becomes the first path component below the destination.
fn check_root_name(root_name: &str) -> FetchResult<()> {
    if root_name.is_empty() || is_valid_entry_name(root_name) {
        Ok(())
    } else {
        Err(FetchError::InvalidRootName(root_name.to_owned()))
    }
}

/// Map `path` below `dest`. Every component must be a plain name, and no
/// existing component below `dest`, the target included, may be a symlink.
async fn resolve(dest: &Path, path: &str) -> FetchResult<PathBuf> {
    let relative = Path::new(path);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(FetchError::UnsafePath(dest.join(relative)));
    }

    let mut target = dest.to_path_buf();
    for component in relative.components() {
        target.push(component);
        match fs::symlink_metadata(&target).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(FetchError::UnsafePath(target));
            }
            Ok(_) => {}
            // Nothing deeper exists yet.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(dest.join(relative)),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(target)
}

async fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}

#[cfg(unix)]
async fn write_symlink(path: &Path, target: &[u8]) -> std::io::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    create_parent(path).await?;
    fs::symlink(OsStr::from_bytes(target), path).await
}

#[cfg(not(unix))]
async fn write_symlink(path: &Path, _target: &[u8]) -> std::io::Result<()> {
    tracing::warn!(path = %path.display(), "symlinks are not supported on this platform; skipping");
    Ok(())
}
