//! Preprocessing for sequence-to-sequence training data.
//!
//! The pipeline runs in three steps:
//!
//! 1. Count the words of a corpus and build a [`Vocabulary`] from the frequent ones with
//!    [`build_vocab`] or a [`VocabBuilder`].
//! 2. Encode each line of text as token IDs with a [`SequenceEncoder`], either padded/truncated to
//!    a fixed length or as long as the line needs.
//! 3. Group the encoded lines into batches with [`collate`], which sorts them longest first and
//!    pads them to a common length.
//!
//! [`SequenceDataset`] and [`DataLoader`] tie the steps together for a training loop, and expose
//! the [`Dataset`] and [`Batcher`] traits a driver with its own shuffling or prefetching can use
//! instead.
mod collate;
mod config;
mod dataset;
mod encode;
mod error;
mod loader;
mod token;
mod vocab;

pub use collate::*;
pub use config::*;
pub use dataset::*;
pub use encode::*;
pub use error::*;
pub use loader::*;
pub use token::*;
pub use vocab::*;

pub type Result<T> = std::result::Result<T, SeqprepError>;
