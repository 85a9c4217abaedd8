use std::collections::{BTreeMap, btree_map};

use crate::{
    error::Result,
    storage::engine::{Engine, EngineIterator},
};

/// In-memory ordered byte map
#[derive(Debug, Default)]
pub struct MemoryEngine {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self { data: BTreeMap::new() }
    }
}

impl Engine for MemoryEngine {
    type EngineIterator<'a> = MemoryEngineIterator<'a>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.data.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.data.remove(key).is_some())
    }

    fn scan(&self) -> Self::EngineIterator<'_> {
        MemoryEngineIterator {
            inner: self.data.iter(),
        }
    }

    fn clear(&mut self) -> usize {
        let removed = self.data.len();
        self.data.clear();
        removed
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// In-memory storage engine iterator
pub struct MemoryEngineIterator<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, Vec<u8>>,
}

impl<'a> EngineIterator for MemoryEngineIterator<'a> {}

impl<'a> Iterator for MemoryEngineIterator<'a> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Self::map)
    }
}

impl<'a> MemoryEngineIterator<'a> {
    fn map(item: (&Vec<u8>, &Vec<u8>)) -> <MemoryEngineIterator<'a> as Iterator>::Item {
        let (k, v) = item;
        Ok((k.clone(), v.clone()))
    }
}
