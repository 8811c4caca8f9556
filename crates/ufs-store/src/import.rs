//! Encode a local file, symlink, or directory tree into a block store.
//!
//! The tree is visited contents-first with siblings sorted by name, so every
//! directory is built after all of its children and the resulting root
//! address depends only on the tree's contents and the builder config.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use ufs_codec::{BuilderConfig, Built, DagBuilder, DirEntry};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::sink::StoreSink;
use crate::traits::BlockStore;

/// Outcome of [`import_path`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    /// Root of the imported graph.
    pub root: Built,
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Blocks handed to the store, including ones it already held.
    pub blocks_written: u64,
}

/// Import `path` into `store`. Symlinks are stored as links, never followed.
/// Entries that are neither files, directories, nor symlinks are skipped.
pub fn import_path<S: BlockStore + ?Sized>(
    store: &S,
    path: &Path,
    config: BuilderConfig,
) -> StoreResult<ImportSummary> {
    let mut sink = StoreSink::new(store);
    let mut builder = DagBuilder::new(&mut sink, config)?;

    let mut listings: HashMap<PathBuf, Vec<DirEntry>> = HashMap::new();
    let mut root = None;
    let (mut files, mut directories, mut symlinks) = (0, 0, 0);

    let walker = WalkDir::new(path)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();

        let built = if file_type.is_dir() {
            directories += 1;
            let children = listings.remove(entry.path()).unwrap_or_default();
            builder.add_directory(children)?
        } else if file_type.is_file() {
            files += 1;
            let reader = BufReader::new(File::open(entry.path())?);
            builder.add_file(reader)?
        } else if file_type.is_symlink() {
            symlinks += 1;
            let target = fs::read_link(entry.path())?;
            builder.add_symlink(&link_target_bytes(&target))?
        } else {
            warn!(path = %entry.path().display(), "skipping special file");
            continue;
        };

        debug!(
            path = %entry.path().display(),
            address = %built.address.short_hex(),
            size = built.size,
            "imported entry"
        );

        if entry.depth() == 0 {
            root = Some(built);
            continue;
        }

        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| StoreError::UnsupportedName(entry.path().to_path_buf()))?;
        let parent = entry
            .path()
            .parent()
            .ok_or_else(|| StoreError::UnsupportedName(entry.path().to_path_buf()))?;
        listings
            .entry(parent.to_path_buf())
            .or_default()
            .push(DirEntry::new(name, built));
    }

    let root = root.ok_or_else(|| StoreError::UnsupportedName(path.to_path_buf()))?;
    Ok(ImportSummary {
        root,
        files,
        directories,
        symlinks,
        blocks_written: builder.blocks_written(),
    })
}

#[cfg(unix)]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn link_target_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().into_owned().into_bytes()
}
