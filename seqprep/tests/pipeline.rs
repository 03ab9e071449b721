//! Runs the whole pipeline against files on disk: build a vocabulary, load it back, encode a
//! corpus with it and batch the result.
use seqprep::{
    build_vocab, collate, data_loader, encode_file, Dataset, EncodeMode, EncoderConfig,
    ReservedTokens, SequenceDataset, SequenceEncoder, VocabConfig, Vocabulary,
};
use std::path::Path;
use std::sync::Arc;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn small_corpus_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write(dir.path(), "corpus.txt", "a a b\n");
    let vocab_path = dir.path().join("vocab.json");

    let config = VocabConfig {
        min_count: 1,
        reserve_pad: false,
        ..Default::default()
    };
    let frequencies = build_vocab([&corpus], &vocab_path, &ReservedTokens::default(), &config).unwrap();
    assert_eq!(vec![("a", 2), ("b", 1)], frequencies.iter().collect::<Vec<_>>());

    let vocab = Arc::new(Vocabulary::load(&vocab_path, ReservedTokens::default()).unwrap());
    assert_eq!(
        vec![("<s>", 0), ("</s>", 1), ("UNK", 2), ("a", 3), ("b", 4)],
        vocab.iter().collect::<Vec<_>>()
    );

    let queries = write(dir.path(), "queries.txt", "a c\n");
    let encoded = encode_file(&queries, vocab, EncodeMode::Variable, None).unwrap();
    assert_eq!(vec![vec![0, 3, 2, 1]], encoded);
}

#[test]
fn vocabulary_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let article = write(dir.path(), "article.txt", "the cat sat on the mat\nthe dog sat\n");
    let summary = write(dir.path(), "summary.txt", "cat sat\ndog on mat\n");

    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    let config = VocabConfig::default();
    build_vocab([&article, &summary], &first, &ReservedTokens::default(), &config).unwrap();
    build_vocab([&article, &summary], &second, &ReservedTokens::default(), &config).unwrap();

    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        std::fs::read_to_string(&second).unwrap()
    );
}

#[test]
fn fixed_length_dataset_batches_without_padding() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write(dir.path(), "corpus.txt", "x y z w\nx\n\nnever read\n");

    let vocab = Arc::new(Vocabulary::new(ReservedTokens::default(), true, ["x", "y"]).unwrap());
    let encoder = SequenceEncoder::new(
        vocab,
        &EncoderConfig {
            max_len: Some(4),
            ..Default::default()
        },
    )
    .unwrap();

    let dataset = SequenceDataset::from_file(&corpus, &encoder).unwrap();
    assert_eq!(2, dataset.len());

    let batch = collate(dataset.iter().collect(), 3);
    assert_eq!([2, 4], batch.shape());
    assert_eq!(
        vec![vec![0, 4, 5, 1], vec![0, 4, 1, 1]],
        batch.into_rows()
    );
}

#[test]
fn loader_covers_every_line_once() {
    let dir = tempfile::tempdir().unwrap();
    let lines = (1..=7)
        .map(|n| vec!["w"; n].join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    let corpus = write(dir.path(), "corpus.txt", &lines);

    let vocab = Arc::new(Vocabulary::new(ReservedTokens::default(), true, ["w"]).unwrap());
    let loader = data_loader(&corpus, vocab, None, 3).unwrap();

    assert_eq!(3, loader.num_batches());
    let mut lengths = loader
        .iter()
        .flat_map(|batch| batch.lengths().to_vec())
        .collect::<Vec<_>>();
    lengths.sort_unstable();
    assert_eq!((3..=9).collect::<Vec<_>>(), lengths);
}
