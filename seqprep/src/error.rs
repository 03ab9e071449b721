use crate::ReservedToken;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeqprepError {
    #[snafu(display("File I/O error on file '{}'", path.display()))]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Vocabulary file '{}' is not a valid JSON token map", path.display()))]
    VocabJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Vocabulary file '{}' is inconsistent: {reason}", path.display()))]
    InvalidVocabulary { path: PathBuf, reason: String },

    #[snafu(display("Config file '{}' could not be parsed", path.display()))]
    ConfigJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Reserved {first} and {second} tokens share the literal '{literal}'"))]
    DuplicateReservedLiteral {
        literal: String,
        first: ReservedToken,
        second: ReservedToken,
    },

    #[snafu(display("Fixed-length encoding needs a max length of at least 1, got {max_len}"))]
    InvalidMaxLen { max_len: usize },

    #[snafu(display("Batch size must be at least 1"))]
    InvalidBatchSize,
}
