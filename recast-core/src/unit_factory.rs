use crate::error::Result;
use crate::unit::{ChunkStore, StoreParams};
use crate::unit_fs::FsChunkStore;
use crate::unit_mem::MemChunkStore;

pub enum Backend {
    Fs,
    Memory,
}

/// Open an existing store. The memory backend ignores `params`.
pub fn open_store(backend: Backend, params: StoreParams) -> Result<Box<dyn ChunkStore>> {
    match backend {
        Backend::Fs => Ok(Box::new(FsChunkStore::open(params)?)),
        Backend::Memory => Ok(Box::new(MemChunkStore::new())),
    }
}

/// Create (or reuse) a store for writing.
pub fn create_store(backend: Backend, params: StoreParams) -> Result<Box<dyn ChunkStore>> {
    match backend {
        Backend::Fs => Ok(Box::new(FsChunkStore::new(params)?)),
        Backend::Memory => Ok(Box::new(MemChunkStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;
    use crate::recipe::{Recipe, Reconstruction};
    use crate::reconstruct::Dispatcher;
    use crate::validate::batch::{BatchOptions, validate_store};

    fn fill(store: &mut dyn ChunkStore) {
        for (i, part) in [&b"first"[..], b"second"].iter().enumerate() {
            let offset = if i == 0 { 0 } else { 5 };
            let r = Recipe::describe(i as u64, offset, part, part.len() as u64, Reconstruction::Store, HashAlgorithm::Sha256);
            store.put_unit(part, &r).unwrap();
        }
    }

    #[test]
    fn both_backends_validate_alike() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fs_store = create_store(Backend::Fs, StoreParams::new(tmp.path().join("s"))).unwrap();
        let mut mem_store = create_store(Backend::Memory, StoreParams::new(tmp.path())).unwrap();
        fill(fs_store.as_mut());
        fill(mem_store.as_mut());

        let d = Dispatcher::default();
        let a = validate_store(fs_store.as_ref(), &d, &BatchOptions::default()).unwrap();
        let b = validate_store(mem_store.as_ref(), &d, &BatchOptions::default()).unwrap();
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.stats.successful, 2);

        let reopened = open_store(Backend::Fs, StoreParams::new(tmp.path().join("s"))).unwrap();
        assert_eq!(reopened.units().unwrap().len(), 2);
    }

    #[test]
    fn opening_a_missing_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(open_store(Backend::Fs, StoreParams::new(tmp.path().join("nope"))).is_err());
    }
}
