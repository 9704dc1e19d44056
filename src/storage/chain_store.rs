use crate::core::Block;
use crate::error::{LedgerError, Result};
use log::info;
use sled::{Batch, Db, Tree};
use std::path::Path;
use std::sync::Mutex;

const BLOCKS_TREE: &str = "blocks";

/// Durable home of a node's chain.
///
/// The ledger calls `load` once when it opens and `save` after every
/// mutation it commits.
pub trait ChainStore: Send + Sync {
    fn load(&self) -> Result<Vec<Block>>;
    fn save(&self, blocks: &[Block]) -> Result<()>;
}

/// Sled-backed store: one entry per block, keyed by big-endian index,
/// holding the block's JSON.
pub struct SledChainStore {
    db: Db,
    blocks: Tree,
}

impl SledChainStore {
    pub fn open(path: &Path) -> Result<SledChainStore> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::Database(format!("Failed to open blocks tree: {e}")))?;
        info!("Opened chain store at {}", path.display());
        Ok(SledChainStore { db, blocks })
    }

    pub fn get_db(&self) -> &Db {
        &self.db
    }
}

impl ChainStore for SledChainStore {
    fn load(&self) -> Result<Vec<Block>> {
        let mut chain = Vec::new();
        for entry in self.blocks.iter() {
            let (_, value) =
                entry.map_err(|e| LedgerError::Database(format!("Failed to read block: {e}")))?;
            chain.push(serde_json::from_slice::<Block>(&value)?);
        }
        Ok(chain)
    }

    fn save(&self, blocks: &[Block]) -> Result<()> {
        let stored_len = self.stored_len()?.min(blocks.len());
        let first_changed = self.first_changed(blocks, stored_len)?;

        let mut batch = Batch::default();
        for block in &blocks[first_changed..] {
            let key = block.get_index().to_be_bytes();
            batch.insert(key.to_vec(), serde_json::to_vec(block)?);
        }
        let len = blocks.len() as u64;
        for entry in self.blocks.range(len.to_be_bytes()..) {
            let (key, _) =
                entry.map_err(|e| LedgerError::Database(format!("Failed to scan blocks: {e}")))?;
            batch.remove(key);
        }
        self.blocks
            .apply_batch(batch)
            .map_err(|e| LedgerError::Database(format!("Failed to write blocks: {e}")))?;
        self.db
            .flush()
            .map_err(|e| LedgerError::Database(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

impl SledChainStore {
    /// Number of stored blocks, read from the highest key
    fn stored_len(&self) -> Result<usize> {
        let last = self
            .blocks
            .last()
            .map_err(|e| LedgerError::Database(format!("Failed to read last block: {e}")))?;
        match last {
            None => Ok(0),
            Some((key, _)) => {
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    LedgerError::Database(format!("Malformed block key of {} bytes", key.len()))
                })?;
                Ok(u64::from_be_bytes(bytes) as usize + 1)
            }
        }
    }

    /// Position of the first block in `blocks` that differs from storage.
    ///
    /// Blocks are hash-linked, so once a stored entry matches byte for byte
    /// every entry below it matches too. Walking down from the shared tail
    /// keeps an append down to one comparison.
    fn first_changed(&self, blocks: &[Block], shared: usize) -> Result<usize> {
        let mut position = shared;
        while position > 0 {
            let block = &blocks[position - 1];
            let encoded = serde_json::to_vec(block)?;
            let existing = self
                .blocks
                .get(block.get_index().to_be_bytes())
                .map_err(|e| LedgerError::Database(format!("Failed to read block: {e}")))?;
            if existing.as_deref() == Some(encoded.as_slice()) {
                break;
            }
            position -= 1;
        }
        Ok(position)
    }
}

/// Volatile store, for tests and throwaway nodes
#[derive(Default)]
pub struct MemoryChainStore {
    blocks: Mutex<Vec<Block>>,
}

impl MemoryChainStore {
    pub fn new() -> MemoryChainStore {
        MemoryChainStore::default()
    }

    pub fn with_blocks(blocks: Vec<Block>) -> MemoryChainStore {
        MemoryChainStore {
            blocks: Mutex::new(blocks),
        }
    }
}

impl ChainStore for MemoryChainStore {
    fn load(&self) -> Result<Vec<Block>> {
        let blocks = self
            .blocks
            .lock()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire store lock: {e}")))?;
        Ok(blocks.clone())
    }

    fn save(&self, blocks: &[Block]) -> Result<()> {
        let mut stored = self
            .blocks
            .lock()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire store lock: {e}")))?;
        *stored = blocks.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Payload;
    use serde_json::json;
    use tempfile::tempdir;

    fn chain_of(len: usize) -> Vec<Block> {
        let mut chain = vec![Block::generate_genesis_block()];
        while chain.len() < len {
            let payload = Payload::from(json!({"n": chain.len()}));
            let block = Block::new_successor(chain.last().unwrap(), payload, 1).unwrap();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_sled_store_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = SledChainStore::open(&temp_dir.path().join("chain")).unwrap();
        assert!(store.load().unwrap().is_empty());

        let chain = chain_of(3);
        store.save(&chain).unwrap();
        assert_eq!(store.load().unwrap(), chain);
    }

    #[test]
    fn test_sled_store_shrinks_on_replace() {
        let temp_dir = tempdir().unwrap();
        let store = SledChainStore::open(&temp_dir.path().join("chain")).unwrap();
        store.save(&chain_of(4)).unwrap();

        let shorter = chain_of(2);
        store.save(&shorter).unwrap();
        assert_eq!(store.load().unwrap(), shorter);
    }

    #[test]
    fn test_sled_store_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("chain");
        let chain = chain_of(2);
        {
            let store = SledChainStore::open(&path).unwrap();
            store.save(&chain).unwrap();
        }
        let store = SledChainStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), chain);
    }

    #[test]
    fn test_append_writes_only_the_tail() {
        let temp_dir = tempdir().unwrap();
        let store = SledChainStore::open(&temp_dir.path().join("chain")).unwrap();
        let chain = chain_of(4);
        store.save(&chain[..3]).unwrap();

        // Entries below a matching tail are neither read back nor rewritten
        let key = 0u64.to_be_bytes();
        store.blocks.insert(key, b"untouched".to_vec()).unwrap();
        store.save(&chain).unwrap();

        assert_eq!(store.blocks.get(key).unwrap().unwrap().as_ref(), b"untouched");
        assert_eq!(store.stored_len().unwrap(), 4);
        let last: Block = serde_json::from_slice(&store.blocks.get(3u64.to_be_bytes()).unwrap().unwrap()).unwrap();
        assert_eq!(last, chain[3]);
    }

    #[test]
    fn test_divergent_suffix_is_rewritten() {
        let temp_dir = tempdir().unwrap();
        let store = SledChainStore::open(&temp_dir.path().join("chain")).unwrap();
        store.save(&chain_of(3)).unwrap();

        // Same genesis, different blocks from index 1 on
        let fork = chain_of(5);
        store.save(&fork).unwrap();
        assert_eq!(store.load().unwrap(), fork);
        assert_eq!(store.first_changed(&fork, 5).unwrap(), 5);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryChainStore::new();
        let chain = chain_of(2);
        store.save(&chain).unwrap();
        assert_eq!(store.load().unwrap(), chain);
    }
}
