//! Every token of every encoded line goes through a hash lookup, so the choice of hash function
//! matters more here than anywhere else.
//!
//! This is isolated to this module to make it easier to experiment with different impls.
use crate::token::TokenId;

pub use rustc_hash::FxHashMap as HashMap;

/// Maintains the mapping from token strings to the IDs assigned to them in the vocabulary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenEncoder(HashMap<String, TokenId>);

impl TokenEncoder {
    pub fn new<Iter, S>(items: Iter) -> Self
    where
        Iter: IntoIterator<Item = (S, TokenId)>,
        S: Into<String>,
    {
        Self(
            items
                .into_iter()
                .map(|(token, id)| (token.into(), id))
                .collect(),
        )
    }

    pub fn id_for_token(&self, token: &str) -> Option<TokenId> {
        self.0.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
