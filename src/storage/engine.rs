use crate::error::Result;

/// Abstract byte-level storage interface backing a relation's rows.
///
/// Keys are ordered byte strings; scans return entries in key order.
pub trait Engine {
    type EngineIterator<'a>: EngineIterator
    where
        Self: 'a;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn delete(&mut self, key: &[u8]) -> Result<bool>;
    /// Every entry in key order
    fn scan(&self) -> Self::EngineIterator<'_>;
    /// Removes every entry, returning how many were removed
    fn clear(&mut self) -> usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage engine iterator trait
pub trait EngineIterator: Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> {}
