use crate::error::DuplicateReservedLiteralSnafu;
use crate::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// A token in its integer form, the ID the vocabulary assigned to the token string.
///
/// IDs are contiguous starting at 0, with the reserved tokens always occupying the lowest IDs.
pub type TokenId = usize;

/// One line of text encoded as token IDs.
///
/// Always starts with the start-of-sequence ID.  Depending on the encoding mode it either ends
/// with the end-of-sequence ID or is padded out to a fixed length with it.
pub type EncodedSequence = Vec<TokenId>;

/// The tokens every vocabulary reserves, in the order they are assigned IDs.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    EnumString,
    EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ReservedToken {
    Start,
    End,
    Unknown,
    Pad,
}

impl ReservedToken {
    /// The fixed ID of this reserved token.  The pad token only has this ID in vocabularies that
    /// reserve it.
    pub const fn id(self) -> TokenId {
        match self {
            ReservedToken::Start => 0,
            ReservedToken::End => 1,
            ReservedToken::Unknown => 2,
            ReservedToken::Pad => 3,
        }
    }
}

/// The literal strings used for the reserved tokens.
///
/// This is the only place these literals live; everything else asks a `ReservedTokens` (usually
/// the one owned by a [`crate::Vocabulary`]) for them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReservedTokens {
    pub start: String,
    pub end: String,
    pub unknown: String,
    pub pad: String,
}

impl Default for ReservedTokens {
    fn default() -> Self {
        Self {
            start: "<s>".to_string(),
            end: "</s>".to_string(),
            unknown: "UNK".to_string(),
            pad: "<pad>".to_string(),
        }
    }
}

impl ReservedTokens {
    pub fn literal(&self, token: ReservedToken) -> &str {
        match token {
            ReservedToken::Start => &self.start,
            ReservedToken::End => &self.end,
            ReservedToken::Unknown => &self.unknown,
            ReservedToken::Pad => &self.pad,
        }
    }

    /// The reserved tokens in ID order, paired with their literal strings.
    ///
    /// When `with_pad` is false the pad token is left out, and the vocabulary has only three
    /// reserved IDs.
    pub fn in_id_order(&self, with_pad: bool) -> impl Iterator<Item = (ReservedToken, &str)> {
        ReservedToken::iter()
            .filter(move |token| with_pad || *token != ReservedToken::Pad)
            .map(move |token| (token, self.literal(token)))
    }

    /// Check that no two reserved tokens use the same literal.
    ///
    /// All four literals are checked, pad included, whether or not a vocabulary reserves a pad
    /// ID.
    pub fn validate(&self) -> Result<()> {
        for (i, first) in ReservedToken::iter().enumerate() {
            for second in ReservedToken::iter().skip(i + 1) {
                let literal = self.literal(first);
                ensure!(
                    literal != self.literal(second),
                    DuplicateReservedLiteralSnafu {
                        literal,
                        first,
                        second,
                    }
                );
            }
        }

        Ok(())
    }

    /// Is `word` one of the reserved literals?
    pub fn is_reserved(&self, word: &str) -> bool {
        ReservedToken::iter().any(|token| self.literal(token) == word)
    }
}
