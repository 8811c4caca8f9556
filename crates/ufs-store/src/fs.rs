//! Loose-file block store.
//!
//! Layout under the root directory:
//! ```text
//! <root>/<first 2 hex chars>/<remaining 62 hex chars>
//! ```
//! Writes go to a temporary file in the target directory and are renamed
//! into place, so a reader never observes a partial block.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use ufs_crypto::ContentHasher;
use ufs_types::ContentAddress;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlockStore;

/// Block store backed by one file per block.
#[derive(Debug, Clone)]
pub struct FsBlockStore {
    root: PathBuf,
}

impl FsBlockStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened block store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `address`, whether or not it exists.
    pub fn block_path(&self, address: &ContentAddress) -> PathBuf {
        let hex = address.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl BlockStore for FsBlockStore {
    fn get(&self, address: &ContentAddress) -> StoreResult<Option<Bytes>> {
        let data = match fs::read(self.block_path(address)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let computed = ContentHasher::BLOCK.hash(&data);
        if computed != *address {
            warn!(
                address = %address.short_hex(),
                computed = %computed.short_hex(),
                "stored block failed verification"
            );
            return Err(StoreError::HashMismatch {
                address: *address,
                computed,
            });
        }
        Ok(Some(Bytes::from(data)))
    }

    fn put(&self, block: &[u8]) -> StoreResult<ContentAddress> {
        let address = ContentHasher::BLOCK.hash(block);
        let path = self.block_path(&address);
        if path.exists() {
            return Ok(address);
        }

        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "block path has no parent"))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(block)?;
        tmp.as_file().sync_data()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(address = %address.short_hex(), len = block.len(), "stored block");
        Ok(address)
    }

    fn contains(&self, address: &ContentAddress) -> StoreResult<bool> {
        Ok(self.block_path(address).try_exists()?)
    }

    fn remove(&self, address: &ContentAddress) -> StoreResult<bool> {
        match fs::remove_file(self.block_path(address)) {
            Ok(()) => {
                debug!(address = %address.short_hex(), "removed block");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FsBlockStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path().join("blocks")).unwrap();
        (dir, store)
    }

    #[test]
    fn put_and_get() {
        let (_dir, store) = temp_store();
        let address = store.put(b"on disk").unwrap();
        assert!(store.contains(&address).unwrap());
        assert_eq!(store.get(&address).unwrap().unwrap(), &b"on disk"[..]);
    }

    #[test]
    fn loose_layout() {
        let (_dir, store) = temp_store();
        let address = store.put(b"layout").unwrap();
        let hex = address.to_hex();
        let expected = store.root().join(&hex[..2]).join(&hex[2..]);
        assert_eq!(store.block_path(&address), expected);
        assert_eq!(fs::read(expected).unwrap(), b"layout");
    }

    #[test]
    fn put_is_idempotent() {
        let (_dir, store) = temp_store();
        let a = store.put(b"twice").unwrap();
        let b = store.put(b"twice").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_block_is_none() {
        let (_dir, store) = temp_store();
        let address = ContentAddress::from_hash([4; 32]);
        assert!(store.get(&address).unwrap().is_none());
        assert!(!store.contains(&address).unwrap());
        assert!(!store.remove(&address).unwrap());
    }

    #[test]
    fn corrupted_block_detected() {
        let (_dir, store) = temp_store();
        let address = store.put(b"pristine").unwrap();
        fs::write(store.block_path(&address), b"tampered").unwrap();

        let err = store.get(&address).unwrap_err();
        assert!(matches!(
            err,
            StoreError::HashMismatch { address: a, computed }
                if a == address && computed == ContentHasher::BLOCK.hash(b"tampered")
        ));
    }

    #[test]
    fn remove_deletes_file() {
        let (_dir, store) = temp_store();
        let address = store.put(b"ephemeral").unwrap();
        assert!(store.remove(&address).unwrap());
        assert!(!store.block_path(&address).exists());
    }

    #[test]
    fn reopen_sees_existing_blocks() {
        let (dir, store) = temp_store();
        let address = store.put(b"persistent").unwrap();
        drop(store);

        let reopened = FsBlockStore::open(dir.path().join("blocks")).unwrap();
        assert_eq!(reopened.require(&address).unwrap(), &b"persistent"[..]);
    }
}
