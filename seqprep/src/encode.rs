//! Turning lines of text into sequences of token IDs.
use crate::error::{FileIoSnafu, InvalidMaxLenSnafu};
use crate::{EncodedSequence, Result, Vocabulary};
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use strum::EnumString;
use tracing::*;

/// How long encoded sequences are.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncodeMode {
    /// As long as the line needs: one ID per word plus the start and end markers
    Variable,

    /// Exactly `max_len` IDs.  Long lines are truncated, short ones padded with the end marker.
    Fixed { max_len: usize },
}

/// What to do with a line that has no words in it.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    EnumString,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EmptyLinePolicy {
    /// Stop reading; the empty line and everything after it is ignored
    #[default]
    Stop,

    /// Ignore the line and keep reading
    Skip,

    /// Encode it like any other line, which yields just the start and end markers
    Keep,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EncoderConfig {
    /// Pad or truncate every sequence to this length.  Variable-length encoding if not set.
    pub max_len: Option<usize>,

    /// Read at most this many lines from a file
    pub limit: Option<usize>,

    pub empty_lines: EmptyLinePolicy,
}

impl EncoderConfig {
    pub fn mode(&self) -> EncodeMode {
        match self.max_len {
            Some(max_len) => EncodeMode::Fixed { max_len },
            None => EncodeMode::Variable,
        }
    }
}

/// Encode a line as `[start, ids of each word.., end]`.
///
/// Words missing from the vocabulary are encoded as the unknown token.  Reserved literals in the
/// text, like a literal `</s>`, are looked up like any other word and so map to their reserved
/// IDs.
pub fn encode_line(line: &str, vocab: &Vocabulary) -> EncodedSequence {
    std::iter::once(vocab.start_id())
        .chain(line.split_whitespace().map(|word| vocab.id_or_unknown(word)))
        .chain(std::iter::once(vocab.end_id()))
        .collect()
}

/// Encode a line into exactly `max_len` IDs.
///
/// Slot 0 holds the start ID and every slot not filled by a word holds the end ID.  At most
/// `max_len - 2` words are encoded and the rest of the line is dropped, so a line that fits
/// always has at least one end ID after it.  A `max_len` of 1 yields just the start ID, and 0
/// yields an empty sequence.
pub fn encode_line_padded(line: &str, vocab: &Vocabulary, max_len: usize) -> EncodedSequence {
    let mut sample = vec![vocab.end_id(); max_len];
    if let Some(first) = sample.first_mut() {
        *first = vocab.start_id();
    }

    let words = line.split_whitespace().take(max_len.saturating_sub(2));
    for (slot, word) in sample.iter_mut().skip(1).zip(words) {
        *slot = vocab.id_or_unknown(word);
    }

    sample
}

/// Encode the lines of the file at `path`, using the default [`EmptyLinePolicy`].
///
/// See [`SequenceEncoder::encode_file`].
pub fn encode_file(
    path: impl AsRef<Path>,
    vocab: Arc<Vocabulary>,
    mode: EncodeMode,
    limit: Option<usize>,
) -> Result<Vec<EncodedSequence>> {
    let config = EncoderConfig {
        max_len: match mode {
            EncodeMode::Variable => None,
            EncodeMode::Fixed { max_len } => Some(max_len),
        },
        limit,
        ..Default::default()
    };

    SequenceEncoder::new(vocab, &config)?.encode_file(path)
}

/// Encodes text with a particular vocabulary and configuration.
///
/// Cheap to clone, and safe to share between threads.
#[derive(Clone, Debug)]
pub struct SequenceEncoder {
    vocab: Arc<Vocabulary>,
    mode: EncodeMode,
    limit: Option<usize>,
    empty_lines: EmptyLinePolicy,
}

impl SequenceEncoder {
    pub fn new(vocab: Arc<Vocabulary>, config: &EncoderConfig) -> Result<Self> {
        let mode = config.mode();
        if let EncodeMode::Fixed { max_len } = mode {
            ensure!(max_len > 0, InvalidMaxLenSnafu { max_len });
        }

        Ok(Self {
            vocab,
            mode,
            limit: config.limit,
            empty_lines: config.empty_lines,
        })
    }

    pub fn vocab(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn mode(&self) -> EncodeMode {
        self.mode
    }

    /// Encode a single line according to this encoder's mode
    pub fn encode(&self, line: &str) -> EncodedSequence {
        match self.mode {
            EncodeMode::Variable => encode_line(line, &self.vocab),
            EncodeMode::Fixed { max_len } => encode_line_padded(line, &self.vocab, max_len),
        }
    }

    /// Encode the lines of `reader` in order.
    ///
    /// Reading ends after `limit` lines if there is one, or at the first empty line under
    /// [`EmptyLinePolicy::Stop`].  Lines holding only whitespace count as empty.  Lines passed
    /// over by [`EmptyLinePolicy::Skip`] still count towards the limit.
    pub fn encode_reader(&self, reader: impl BufRead) -> std::io::Result<Vec<EncodedSequence>> {
        let mut sequences = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            if Some(index) == self.limit {
                trace!(limit = index, "Line limit reached");
                break;
            }

            let line = line?;
            if line.trim().is_empty() {
                match self.empty_lines {
                    EmptyLinePolicy::Stop => {
                        debug!(line = index + 1, "Empty line; ignoring the rest of the input");
                        break;
                    }
                    EmptyLinePolicy::Skip => continue,
                    EmptyLinePolicy::Keep => {}
                }
            }

            sequences.push(self.encode(&line));
        }

        Ok(sequences)
    }

    /// Encode the lines of the file at `path`.  See [`Self::encode_reader`].
    pub fn encode_file(&self, path: impl AsRef<Path>) -> Result<Vec<EncodedSequence>> {
        let path = path.as_ref();

        let file = std::fs::File::open(path).context(FileIoSnafu { path })?;
        let sequences = self
            .encode_reader(BufReader::new(file))
            .context(FileIoSnafu { path })?;

        debug!(path = %path.display(), sequences = sequences.len(), mode = ?self.mode, "Encoded file");
        Ok(sequences)
    }
}
