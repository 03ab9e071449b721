//! Collating variable-length sequences into rectangular, padded batches.
use crate::{EncodedSequence, TokenId, Vocabulary};
use std::cmp::Reverse;

/// Turns a group of items into one batch.
pub trait Batcher<I, O>: Send + Sync {
    fn batch(&self, items: Vec<I>) -> O;
}

/// A group of sequences right-padded to a common length.
///
/// Rows are ordered longest first, which is generally not the order the sequences were passed in.
/// Callers that need the original order have to keep track of it themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    /// `rows * seq_len` IDs, row-major
    ids: Vec<TokenId>,

    /// Length of each row before padding
    lengths: Vec<usize>,

    seq_len: usize,
}

impl Batch {
    /// `[rows, seq_len]`
    pub fn shape(&self) -> [usize; 2] {
        [self.lengths.len(), self.seq_len]
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// The unpadded length of every row, in row order.  Non-increasing.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn row(&self, index: usize) -> Option<&[TokenId]> {
        (index < self.lengths.len())
            .then(|| &self.ids[index * self.seq_len..(index + 1) * self.seq_len])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[TokenId]> {
        (0..self.lengths.len()).filter_map(|index| self.row(index))
    }

    /// All IDs in row-major order, ready to be handed to a tensor library
    pub fn as_flat(&self) -> &[TokenId] {
        &self.ids
    }

    pub fn into_rows(self) -> Vec<Vec<TokenId>> {
        self.rows().map(<[TokenId]>::to_vec).collect()
    }
}

/// Sort `sequences` longest first and right-pad them all with `pad_id` to the longest length.
///
/// The sort is stable, so sequences of equal length stay in their input order.  An empty input
/// gives an empty batch.
pub fn collate(mut sequences: Vec<EncodedSequence>, pad_id: TokenId) -> Batch {
    sequences.sort_by_key(|sequence| Reverse(sequence.len()));

    let seq_len = sequences.first().map_or(0, Vec::len);
    let mut ids = Vec::with_capacity(sequences.len() * seq_len);
    let mut lengths = Vec::with_capacity(sequences.len());

    for sequence in sequences {
        lengths.push(sequence.len());
        let padding = seq_len - sequence.len();
        ids.extend(sequence);
        ids.extend(std::iter::repeat(pad_id).take(padding));
    }

    Batch {
        ids,
        lengths,
        seq_len,
    }
}

/// [`Batcher`] that applies [`collate`] with a fixed pad ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collator {
    pad_id: TokenId,
}

impl Collator {
    pub fn new(pad_id: TokenId) -> Self {
        Self { pad_id }
    }

    /// Pad with the vocabulary's pad token, or with its end token if it doesn't reserve one.
    pub fn for_vocab(vocab: &Vocabulary) -> Self {
        Self::new(vocab.pad_id().unwrap_or_else(|| vocab.end_id()))
    }

    pub fn pad_id(&self) -> TokenId {
        self.pad_id
    }
}

impl Batcher<EncodedSequence, Batch> for Collator {
    fn batch(&self, items: Vec<EncodedSequence>) -> Batch {
        collate(items, self.pad_id)
    }
}
