//! Indexable collections of encoded samples, the interface external training drivers pull items
//! through.
use crate::{EncodedSequence, Result, SequenceEncoder};
use std::path::Path;
use std::sync::Arc;
use tracing::*;

/// A collection of items with a known size, readable by index.
///
/// Implementations must be safe to read from several threads at once; a driver that prefetches
/// with a pool of workers will call [`Self::get`] concurrently for different indices.
pub trait Dataset<I>: Send + Sync {
    /// The item at `index`, or `None` if it's out of range
    fn get(&self, index: usize) -> Option<I>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item in index order
    fn iter(&self) -> DatasetIterator<'_, I>
    where
        Self: Sized,
    {
        DatasetIterator::new(self)
    }
}

impl<D, I> Dataset<I> for Arc<D>
where
    D: Dataset<I>,
{
    fn get(&self, index: usize) -> Option<I> {
        self.as_ref().get(index)
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }
}

pub struct DatasetIterator<'a, I> {
    dataset: &'a dyn Dataset<I>,
    index: usize,
}

impl<'a, I> DatasetIterator<'a, I> {
    pub fn new(dataset: &'a dyn Dataset<I>) -> Self {
        Self { dataset, index: 0 }
    }
}

impl<I> Iterator for DatasetIterator<'_, I> {
    type Item = I;

    fn next(&mut self) -> Option<I> {
        let item = self.dataset.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

/// Every line of a corpus file, encoded up front and held in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceDataset {
    sequences: Vec<EncodedSequence>,
}

impl SequenceDataset {
    pub fn from_sequences(sequences: Vec<EncodedSequence>) -> Self {
        Self { sequences }
    }

    /// Encode the file at `path` with `encoder`, honoring its line limit and empty line policy
    pub fn from_file(path: impl AsRef<Path>, encoder: &SequenceEncoder) -> Result<Self> {
        let path = path.as_ref();
        let sequences = encoder.encode_file(path)?;

        info!(path = %path.display(), samples = sequences.len(), "Loaded dataset");
        Ok(Self { sequences })
    }

    pub fn sequences(&self) -> &[EncodedSequence] {
        &self.sequences
    }
}

impl Dataset<EncodedSequence> for SequenceDataset {
    fn get(&self, index: usize) -> Option<EncodedSequence> {
        self.sequences.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }
}
