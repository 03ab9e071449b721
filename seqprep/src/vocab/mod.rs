use crate::error::{FileIoSnafu, InvalidVocabularySnafu, VocabJsonSnafu};
use crate::{ReservedToken, ReservedTokens, Result, TokenId};
use serde::ser::SerializeMap;
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::*;

mod builder;
mod hash;

pub use builder::*;
pub(crate) use hash::{HashMap, TokenEncoder};

/// The mapping between token strings and the integer IDs fed to a model.
///
/// The reserved tokens always occupy the lowest IDs, in [`ReservedToken`] order: start, end,
/// unknown, and then the pad token for vocabularies that reserve one.  All other tokens follow,
/// with IDs contiguous from there.  No token appears twice.
///
/// A `Vocabulary` is never modified after it's constructed, so a single instance can be shared
/// (usually behind an `Arc`) by any number of threads encoding text at the same time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    reserved: ReservedTokens,

    /// Whether the pad token is reserved at [`ReservedToken::Pad`]'s ID
    has_pad: bool,

    encoder: TokenEncoder,

    /// Token strings indexed by their ID
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from the reserved tokens followed by `content` tokens, in that order.
    ///
    /// Content tokens that collide with a reserved literal, or that were already added, are
    /// ignored so the reserved IDs can never be reassigned.  Fails if two reserved tokens share
    /// a literal.
    pub fn new<I, S>(reserved: ReservedTokens, with_pad: bool, content: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        reserved.validate()?;

        let mut tokens: Vec<String> = reserved
            .in_id_order(with_pad)
            .map(|(_, literal)| literal.to_string())
            .collect();
        let mut ids: HashMap<String, TokenId> = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id))
            .collect();

        for token in content {
            let token = token.into();
            if reserved.is_reserved(&token) || ids.contains_key(&token) {
                continue;
            }
            ids.insert(token.clone(), tokens.len());
            tokens.push(token);
        }

        let encoder = TokenEncoder::new(ids);
        debug_assert_eq!(encoder.len(), tokens.len());

        Ok(Self {
            reserved,
            has_pad: with_pad,
            encoder,
            tokens,
        })
    }

    /// Load a vocabulary previously written by [`Self::save`] (or any JSON object mapping tokens
    /// to IDs).
    ///
    /// The file must hold contiguous IDs starting at 0, with the start, end and unknown literals
    /// from `reserved` at their fixed IDs.  If the pad literal is present at its reserved ID the
    /// vocabulary reserves a pad token; if it's present anywhere else the file is rejected.
    pub fn load(path: impl AsRef<Path>, reserved: ReservedTokens) -> Result<Self> {
        let path = path.as_ref();
        reserved.validate()?;

        let json = std::fs::read_to_string(path).context(FileIoSnafu { path })?;
        let map: HashMap<String, TokenId> =
            serde_json::from_str(&json).context(VocabJsonSnafu { path })?;

        let mut tokens: Vec<Option<String>> = vec![None; map.len()];
        for (token, &id) in &map {
            let slot = tokens
                .get_mut(id)
                .with_context(|| InvalidVocabularySnafu {
                    path,
                    reason: format!("ID {id} of '{token}' is outside 0..{}", map.len()),
                })?;
            ensure!(
                slot.is_none(),
                InvalidVocabularySnafu {
                    path,
                    reason: format!("ID {id} is assigned to more than one token"),
                }
            );
            *slot = Some(token.clone());
        }
        // Every ID is in range and no two tokens share one, so every slot is filled
        let tokens: Vec<String> = tokens.into_iter().flatten().collect();

        let has_pad = match map.get(reserved.literal(ReservedToken::Pad)) {
            Some(&id) => {
                ensure!(
                    id == ReservedToken::Pad.id(),
                    InvalidVocabularySnafu {
                        path,
                        reason: format!(
                            "pad token '{}' has ID {id} instead of {}",
                            reserved.pad,
                            ReservedToken::Pad.id()
                        ),
                    }
                );
                true
            }
            None => false,
        };

        for (token, literal) in reserved.in_id_order(false) {
            let found = map.get(literal).copied();
            ensure!(
                found == Some(token.id()),
                InvalidVocabularySnafu {
                    path,
                    reason: format!(
                        "reserved {token} token '{literal}' should have ID {} but has {found:?}",
                        token.id()
                    ),
                }
            );
        }

        debug!(path = %path.display(), tokens = tokens.len(), has_pad, "Loaded vocabulary");

        Ok(Self {
            reserved,
            has_pad,
            encoder: TokenEncoder::new(map),
            tokens,
        })
    }

    /// Write the vocabulary to `path` as a JSON object mapping each token to its ID, with the
    /// entries in ID order.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let file = std::fs::File::create(path).context(FileIoSnafu { path })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &TokensById(&self.tokens))
            .context(VocabJsonSnafu { path })?;
        writer.flush().context(FileIoSnafu { path })?;

        debug!(path = %path.display(), tokens = self.tokens.len(), "Saved vocabulary");
        Ok(())
    }

    pub fn reserved(&self) -> &ReservedTokens {
        &self.reserved
    }

    /// True if this vocabulary reserves a pad token
    pub fn has_pad(&self) -> bool {
        self.has_pad
    }

    /// Number of tokens, reserved ones included
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Never true: a vocabulary always holds at least the reserved tokens
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.encoder.id_for_token(token)
    }

    /// The ID of `token`, or the unknown token's ID if it's not in the vocabulary.
    pub fn id_or_unknown(&self, token: &str) -> TokenId {
        self.id(token).unwrap_or_else(|| self.unknown_id())
    }

    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// The ID of a reserved token.  Only `None` for the pad token in vocabularies without one.
    pub fn reserved_id(&self, token: ReservedToken) -> Option<TokenId> {
        match token {
            ReservedToken::Pad if !self.has_pad => None,
            _ => Some(token.id()),
        }
    }

    pub fn start_id(&self) -> TokenId {
        ReservedToken::Start.id()
    }

    pub fn end_id(&self) -> TokenId {
        ReservedToken::End.id()
    }

    pub fn unknown_id(&self) -> TokenId {
        ReservedToken::Unknown.id()
    }

    pub fn pad_id(&self) -> Option<TokenId> {
        self.reserved_id(ReservedToken::Pad)
    }

    /// All tokens with their IDs, in ID order
    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.as_str(), id))
    }

    /// Map IDs back to the token strings they stand for.
    ///
    /// IDs that aren't in this vocabulary come back as `None`.  Note that the unknown token
    /// decodes to the unknown literal, not to whatever word it replaced.
    pub fn decode<'a>(&'a self, ids: &'a [TokenId]) -> impl Iterator<Item = Option<&'a str>> + 'a {
        ids.iter().map(move |id| self.token(*id))
    }
}

/// Serializes a token table as a JSON object in ID order, which a hash map would not preserve.
struct TokensById<'a>(&'a [String]);

impl Serialize for TokensById<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, token) in self.0.iter().enumerate() {
            map.serialize_entry(token, &id)?;
        }
        map.end()
    }
}
