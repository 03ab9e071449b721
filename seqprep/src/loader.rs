//! Sequential batching over a [`Dataset`].
//!
//! This is the minimal driver needed to feed a training loop from a single thread.  Shuffling and
//! parallel prefetching are left to whatever framework consumes the batches; the dataset and
//! batcher traits are all such a framework needs.
use crate::error::InvalidBatchSizeSnafu;
use crate::{
    Batch, Batcher, Collator, Dataset, EncodedSequence, EncoderConfig, Result, SequenceDataset,
    SequenceEncoder, Vocabulary,
};
use snafu::ensure;
use std::path::Path;
use std::sync::Arc;

/// Pulls items from a dataset `batch_size` at a time, in index order, and batches each group.
pub struct DataLoader<I, O> {
    dataset: Arc<dyn Dataset<I>>,
    batcher: Arc<dyn Batcher<I, O>>,
    batch_size: usize,
}

impl<I, O> DataLoader<I, O> {
    pub fn new(
        dataset: Arc<dyn Dataset<I>>,
        batcher: Arc<dyn Batcher<I, O>>,
        batch_size: usize,
    ) -> Result<Self> {
        ensure!(batch_size > 0, InvalidBatchSizeSnafu);

        Ok(Self {
            dataset,
            batcher,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches a full pass yields.  The last one is short if the dataset length isn't a
    /// multiple of the batch size.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn iter(&self) -> BatchIterator<'_, I, O> {
        BatchIterator {
            loader: self,
            index: 0,
        }
    }
}

pub struct BatchIterator<'a, I, O> {
    loader: &'a DataLoader<I, O>,

    /// Dataset index of the first item of the next batch
    index: usize,
}

impl<I, O> Iterator for BatchIterator<'_, I, O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        let len = self.loader.dataset.len();
        if self.index >= len {
            return None;
        }

        let end = (self.index + self.loader.batch_size).min(len);
        let items = (self.index..end)
            .filter_map(|index| self.loader.dataset.get(index))
            .collect();
        self.index = end;

        Some(self.loader.batcher.batch(items))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .loader
            .dataset
            .len()
            .saturating_sub(self.index)
            .div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

/// Load the file at `path` as variable-length sequences and batch them with the vocabulary's pad
/// token.
pub fn data_loader(
    path: impl AsRef<Path>,
    vocab: Arc<Vocabulary>,
    limit: Option<usize>,
    batch_size: usize,
) -> Result<DataLoader<EncodedSequence, Batch>> {
    let collator = Collator::for_vocab(&vocab);
    let encoder = SequenceEncoder::new(
        vocab,
        &EncoderConfig {
            limit,
            ..Default::default()
        },
    )?;
    let dataset: Arc<dyn Dataset<EncodedSequence>> =
        Arc::new(SequenceDataset::from_file(path, &encoder)?);
    let batcher: Arc<dyn Batcher<EncodedSequence, Batch>> = Arc::new(collator);

    DataLoader::new(dataset, batcher, batch_size)
}
