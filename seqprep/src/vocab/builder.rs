//! Building a [`Vocabulary`] from a text corpus by counting word frequencies.
use super::HashMap;
use crate::error::FileIoSnafu;
use crate::{ReservedTokens, Result, Vocabulary};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use strum::EnumString;
use tracing::*;

/// The order in which content tokens are assigned IDs after the reserved tokens.
///
/// Either way the result is reproducible for a given corpus.
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
pub enum VocabOrder {
    /// Most frequent first; ties broken by the token's byte order
    #[default]
    Frequency,

    /// The order in which each token first occurs in the corpus, files in the order given
    FirstSeen,
}

/// How `min_count` is compared with a token's frequency.
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
pub enum MinCountPolicy {
    /// Keep tokens seen at least `min_count` times
    #[default]
    AtLeast,

    /// Keep only tokens seen strictly more than `min_count` times
    Exceeds,
}

impl MinCountPolicy {
    pub fn keeps(self, count: usize, min_count: usize) -> bool {
        match self {
            MinCountPolicy::AtLeast => count >= min_count,
            MinCountPolicy::Exceeds => count > min_count,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VocabConfig {
    pub min_count: usize,
    pub min_count_policy: MinCountPolicy,
    pub order: VocabOrder,

    /// Reserve the pad token at ID 3.  Without it the vocabulary has three reserved tokens and
    /// the pad ID for batching has to come from somewhere else.
    pub reserve_pad: bool,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            min_count: 1,
            min_count_policy: MinCountPolicy::default(),
            order: VocabOrder::default(),
            reserve_pad: true,
        }
    }
}

/// Occurrence counts of every word in a corpus.
///
/// Words are kept in the order they were first seen, so iterating a table built from the same
/// input always yields the same sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    /// Index of each word in `entries`
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        match self.index.get(word) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(word.to_string(), self.entries.len());
                self.entries.push((word.to_string(), 1));
            }
        }
    }

    /// The number of times `word` was counted, 0 if never
    pub fn count(&self, word: &str) -> usize {
        self.index.get(word).map_or(0, |&i| self.entries[i].1)
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of words counted, duplicates included
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Words and their counts in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries
            .iter()
            .map(|(word, count)| (word.as_str(), *count))
    }

    /// Words and their counts in the given order
    pub fn ordered(&self, order: VocabOrder) -> Vec<(&str, usize)> {
        match order {
            VocabOrder::FirstSeen => self.iter().collect(),
            VocabOrder::Frequency => self
                .iter()
                .sorted_by(|(a_word, a_count), (b_word, b_count)| {
                    b_count.cmp(a_count).then_with(|| a_word.cmp(b_word))
                })
                .collect(),
        }
    }
}

/// Counts the words of a corpus and turns the counts into a [`Vocabulary`].
///
/// Feed it text with [`Self::add_line`], [`Self::add_reader`] or [`Self::add_file`], then call
/// [`Self::build`].  The unknown-token literal is never counted, since it stands for words that
/// aren't in the vocabulary rather than being one itself.
#[derive(Clone, Debug)]
pub struct VocabBuilder {
    reserved: ReservedTokens,
    config: VocabConfig,
    frequencies: FrequencyTable,
}

impl VocabBuilder {
    pub fn new(reserved: ReservedTokens, config: VocabConfig) -> Self {
        Self {
            reserved,
            config,
            frequencies: FrequencyTable::new(),
        }
    }

    pub fn add_line(&mut self, line: &str) {
        for word in line.split_whitespace() {
            if word != self.reserved.unknown {
                self.frequencies.add(word);
            }
        }
    }

    /// Count every line of `reader`, returning the number of lines read
    pub fn add_reader(&mut self, reader: impl BufRead) -> std::io::Result<usize> {
        let mut lines = 0;
        for line in reader.lines() {
            self.add_line(&line?);
            lines += 1;
        }

        Ok(lines)
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let file = std::fs::File::open(path).context(FileIoSnafu { path })?;
        let lines = self
            .add_reader(BufReader::new(file))
            .context(FileIoSnafu { path })?;

        debug!(path = %path.display(), lines, distinct_words = self.frequencies.len(), "Counted words");
        Ok(())
    }

    pub fn frequencies(&self) -> &FrequencyTable {
        &self.frequencies
    }

    /// Build a vocabulary from the words counted so far
    pub fn build(&self) -> Result<Vocabulary> {
        let VocabConfig {
            min_count,
            min_count_policy,
            order,
            reserve_pad,
        } = self.config;

        let kept = self
            .frequencies
            .ordered(order)
            .into_iter()
            .filter(|(_, count)| min_count_policy.keeps(*count, min_count))
            .map(|(word, _)| word);

        let vocab = Vocabulary::new(self.reserved.clone(), reserve_pad, kept)?;

        let retained = if self.frequencies.is_empty() {
            0.0
        } else {
            vocab.len() as f64 / self.frequencies.len() as f64 * 100.0
        };
        info!(
            words = self.frequencies.len(),
            vocab_size = vocab.len(),
            retained = %format!("{retained:.2}%"),
            min_count,
            %min_count_policy,
            "Built vocabulary"
        );

        Ok(vocab)
    }

    /// Consume the builder, returning the vocabulary along with the counts it was built from
    pub fn finish(self) -> Result<(Vocabulary, FrequencyTable)> {
        let vocab = self.build()?;
        Ok((vocab, self.frequencies))
    }
}

/// Count the words in `files`, build a vocabulary from them and save it to `output`.
///
/// Returns the word counts so the caller can inspect them.  Any file that can't be read fails the
/// whole operation, and nothing is written in that case.
pub fn build_vocab<I, P>(
    files: I,
    output: impl AsRef<Path>,
    reserved: &ReservedTokens,
    config: &VocabConfig,
) -> Result<FrequencyTable>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    info!("Building vocabulary");

    let mut builder = VocabBuilder::new(reserved.clone(), config.clone());
    for path in files {
        builder.add_file(path.into())?;
    }

    let (vocab, frequencies) = builder.finish()?;
    vocab.save(output)?;

    Ok(frequencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::init_test_logging;
    use crate::SeqprepError;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn builder(config: VocabConfig) -> VocabBuilder {
        VocabBuilder::new(ReservedTokens::default(), config)
    }

    #[test]
    fn counts_words_in_first_seen_order() {
        let mut table = FrequencyTable::new();
        for word in ["b", "a", "b", "c", "b", "a"] {
            table.add(word);
        }

        assert_eq!(vec![("b", 3), ("a", 2), ("c", 1)], table.iter().collect::<Vec<_>>());
        assert_eq!(6, table.total());
        assert_eq!(0, table.count("zebra"));
    }

    #[test]
    fn frequency_order_breaks_ties_by_token() {
        let mut table = FrequencyTable::new();
        for word in ["z", "y", "x", "x", "w"] {
            table.add(word);
        }

        assert_eq!(
            vec![("x", 2), ("w", 1), ("y", 1), ("z", 1)],
            table.ordered(VocabOrder::Frequency)
        );
    }

    #[test]
    fn small_corpus() {
        init_test_logging();

        let mut builder = builder(VocabConfig {
            reserve_pad: false,
            ..Default::default()
        });
        builder.add_line("a a b");

        assert_eq!(2, builder.frequencies().count("a"));
        assert_eq!(1, builder.frequencies().count("b"));

        let vocab = builder.build().unwrap();
        assert_eq!(
            vec![("<s>", 0), ("</s>", 1), ("UNK", 2), ("a", 3), ("b", 4)],
            vocab.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_literal_is_not_counted() {
        let mut builder = builder(VocabConfig::default());
        builder.add_line("UNK foo UNK");

        assert_eq!(0, builder.frequencies().count("UNK"));
        assert_eq!(1, builder.frequencies().len());
        assert_eq!(Some(2), builder.build().unwrap().id("UNK"));
    }

    #[test]
    fn min_count_policies() {
        let corpus = "a a a b b c";

        let kept = |min_count_policy| {
            let mut builder = builder(VocabConfig {
                min_count: 2,
                min_count_policy,
                ..Default::default()
            });
            builder.add_line(corpus);
            let vocab = builder.build().unwrap();
            ["a", "b", "c"]
                .into_iter()
                .filter(|word| vocab.id(word).is_some())
                .collect::<Vec<_>>()
        };

        assert_eq!(vec!["a", "b"], kept(MinCountPolicy::AtLeast));
        assert_eq!(vec!["a"], kept(MinCountPolicy::Exceeds));
    }

    #[test]
    fn first_seen_order_spans_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&first, "y y\nx\n").unwrap();
        std::fs::write(&second, "w x x\n").unwrap();

        let mut builder = builder(VocabConfig {
            order: VocabOrder::FirstSeen,
            ..Default::default()
        });
        builder.add_file(&first).unwrap();
        builder.add_file(&second).unwrap();

        let vocab = builder.build().unwrap();
        assert_eq!(
            vec!["y", "x", "w"],
            vocab.iter().skip(4).map(|(word, _)| word).collect::<Vec<_>>()
        );
    }

    #[test]
    fn build_vocab_writes_file() {
        init_test_logging();

        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let output = dir.path().join("vocab.json");
        std::fs::write(&corpus, "the cat\nthe dog\n").unwrap();

        let frequencies = build_vocab(
            [&corpus],
            &output,
            &ReservedTokens::default(),
            &VocabConfig::default(),
        )
        .unwrap();
        assert_eq!(2, frequencies.count("the"));

        let vocab = Vocabulary::load(&output, ReservedTokens::default()).unwrap();
        assert_eq!(Some(4), vocab.id("the"));
        assert_eq!(7, vocab.len());
    }

    #[test]
    fn build_vocab_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("vocab.json");

        let result = build_vocab(
            [dir.path().join("missing.txt")],
            &output,
            &ReservedTokens::default(),
            &VocabConfig::default(),
        );

        assert_matches!(result, Err(SeqprepError::FileIo { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn build_vocab_rejects_shared_reserved_literal() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let output = dir.path().join("vocab.json");
        std::fs::write(&corpus, "a b\n").unwrap();
        let reserved = ReservedTokens {
            pad: "UNK".to_string(),
            ..Default::default()
        };

        let result = build_vocab([&corpus], &output, &reserved, &VocabConfig::default());

        assert_matches!(result, Err(SeqprepError::DuplicateReservedLiteral { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn empty_corpus_has_only_reserved_tokens() {
        let vocab = builder(VocabConfig::default()).build().unwrap();

        assert_eq!(4, vocab.len());
    }

    proptest! {
        #[test]
        fn rebuilding_is_deterministic(lines in prop::collection::vec("[a-e ]{0,12}", 0..8), min_count in 0usize..3) {
            for order in [VocabOrder::Frequency, VocabOrder::FirstSeen] {
                let config = VocabConfig { min_count, order, ..Default::default() };

                let mut first = builder(config.clone());
                let mut second = builder(config);
                for line in &lines {
                    first.add_line(line);
                    second.add_line(line);
                }

                prop_assert_eq!(first.build().unwrap(), second.build().unwrap());
            }
        }

        #[test]
        fn rare_words_are_dropped(lines in prop::collection::vec("[a-e]{1,2}( [a-e]{1,2}){0,6}", 1..8), min_count in 1usize..4) {
            let mut builder = builder(VocabConfig { min_count, ..Default::default() });
            for line in &lines {
                builder.add_line(line);
            }
            let vocab = builder.build().unwrap();

            for (word, count) in builder.frequencies().iter() {
                prop_assert_eq!(count >= min_count, vocab.id(word).is_some());
            }
            for (i, (_, id)) in vocab.iter().enumerate() {
                prop_assert_eq!(i, id);
            }
        }
    }
}
