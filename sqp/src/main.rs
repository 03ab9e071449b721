use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use seqprep::{
    Batch, Batcher, Collator, DataLoader, Dataset, EmptyLinePolicy, EncodedSequence,
    MinCountPolicy, PipelineConfig, SequenceDataset, SequenceEncoder, VocabOrder, Vocabulary,
};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Globals {
    /// Read pipeline settings from a JSON config file.
    ///
    /// Command line options override the values in the file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,
}

impl Globals {
    fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        match &self.config {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                Ok(PipelineConfig::load(path)?)
            }
            None => Ok(PipelineConfig::default()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Count the words in one or more corpus files and write the resulting vocabulary as JSON
    BuildVocab {
        /// Where to write the vocabulary
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Words seen fewer times than this are left out
        #[arg(long)]
        min_count: Option<usize>,

        /// Whether a word needs `at-least` or strictly more than (`exceeds`) min-count occurrences
        #[arg(long)]
        min_count_policy: Option<MinCountPolicy>,

        /// Order of word IDs: `frequency` or `first-seen`
        #[arg(long)]
        order: Option<VocabOrder>,

        /// Don't reserve a pad token
        #[arg(long)]
        no_pad: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Encode each line of a file as token IDs, printing one sequence per line
    Encode {
        #[command(flatten)]
        input: EncodeArgs,

        /// Pad or truncate every sequence to this many IDs
        #[arg(long)]
        max_len: Option<usize>,
    },

    /// Encode a file and print the collated batches as JSON, one batch per line
    Batch {
        #[command(flatten)]
        input: EncodeArgs,

        #[arg(long)]
        batch_size: Option<usize>,

        /// Pad with this ID instead of the vocabulary's pad token
        #[arg(long)]
        pad_id: Option<usize>,
    },
}

#[derive(Args)]
struct EncodeArgs {
    /// Vocabulary file written by `build-vocab`
    #[arg(long, value_name = "FILE")]
    vocab: PathBuf,

    /// Read at most this many lines
    #[arg(long)]
    limit: Option<usize>,

    /// What to do at an empty line: `stop`, `skip` or `keep`
    #[arg(long)]
    empty_lines: Option<EmptyLinePolicy>,

    file: PathBuf,
}

impl EncodeArgs {
    /// Apply these options to `config` and load the vocabulary
    fn load(&self, config: &mut PipelineConfig) -> anyhow::Result<Arc<Vocabulary>> {
        if let Some(limit) = self.limit {
            config.encoder.limit = Some(limit);
        }
        if let Some(empty_lines) = self.empty_lines {
            config.encoder.empty_lines = empty_lines;
        }

        let vocab = Vocabulary::load(&self.vocab, config.reserved.clone())?;
        Ok(Arc::new(vocab))
    }
}

impl Commands {
    fn execute(self, globals: &Globals, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut config = globals.load_config()?;
        match self {
            Commands::BuildVocab {
                output,
                min_count,
                min_count_policy,
                order,
                no_pad,
                files,
            } => {
                let vocab_config = &mut config.vocab;
                if let Some(min_count) = min_count {
                    vocab_config.min_count = min_count;
                }
                if let Some(policy) = min_count_policy {
                    vocab_config.min_count_policy = policy;
                }
                if let Some(order) = order {
                    vocab_config.order = order;
                }
                if no_pad {
                    vocab_config.reserve_pad = false;
                }

                let frequencies =
                    seqprep::build_vocab(&files, &output, &config.reserved, &config.vocab)?;

                writeln!(
                    out,
                    "Counted {} distinct words ({} in total); vocabulary written to {}",
                    frequencies.len(),
                    frequencies.total(),
                    output.display()
                )?;
            }
            Commands::Encode { input, max_len } => {
                let vocab = input.load(&mut config)?;
                if let Some(max_len) = max_len {
                    config.encoder.max_len = Some(max_len);
                }

                let encoder = SequenceEncoder::new(vocab, &config.encoder)?;
                for sequence in encoder.encode_file(&input.file)? {
                    writeln!(out, "{}", format_sequence(&sequence))?;
                }
            }
            Commands::Batch {
                input,
                batch_size,
                pad_id,
            } => {
                let vocab = input.load(&mut config)?;
                let batch_size = batch_size.unwrap_or(config.batch_size);

                let collator = match pad_id {
                    Some(pad_id) => Collator::new(pad_id),
                    None => Collator::for_vocab(&vocab),
                };
                debug!(pad_id = collator.pad_id(), batch_size, "Collating batches");

                let encoder = SequenceEncoder::new(vocab, &config.encoder)?;
                let dataset: Arc<dyn Dataset<EncodedSequence>> =
                    Arc::new(SequenceDataset::from_file(&input.file, &encoder)?);
                let batcher: Arc<dyn Batcher<EncodedSequence, Batch>> = Arc::new(collator);
                let loader = DataLoader::new(dataset, batcher, batch_size)?;

                for batch in loader.iter() {
                    let shape = batch.shape();
                    let lengths = batch.lengths().to_vec();
                    let json = serde_json::json!({
                        "shape": shape,
                        "lengths": lengths,
                        "rows": batch.into_rows(),
                    });
                    writeln!(out, "{json}")?;
                }
            }
        }

        out.flush().context("Failed to write output")?;
        Ok(())
    }
}

fn format_sequence(sequence: &[usize]) -> String {
    sequence
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() {
    let cli = Cli::parse();
    let default_log_directive = match cli.globals.debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // Log events go to stderr as JSON, so stdout carries only the command output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_directive.into())
                .from_env_lossy(),
        )
        .json()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if let Err(e) = cli.command.execute(&cli.globals, &mut out) {
        error!("{:#}", e);
        exit(1);
    } else {
        debug!("command executed successfully");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that there aren't any invalid attributes in the CLI specification that can only be
    /// detected at runtime
    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    fn run(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("sqp").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        cli.command.execute(&cli.globals, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn build_then_encode_then_batch() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let vocab = dir.path().join("vocab.json");
        std::fs::write(&corpus, "a a b\nb c a\n").unwrap();
        let corpus = corpus.to_str().unwrap();
        let vocab = vocab.to_str().unwrap();

        let output = run(&["build-vocab", "-o", vocab, "--min-count", "2", corpus]).unwrap();
        assert!(output.starts_with("Counted 3 distinct words (6 in total)"));

        // a=4, b=5, c is unknown
        let output = run(&["encode", "--vocab", vocab, "--max-len", "4", corpus]).unwrap();
        assert_eq!("0 4 4 1\n0 5 2 1\n", output);

        let output = run(&["encode", "--vocab", vocab, "--limit", "1", corpus]).unwrap();
        assert_eq!("0 4 4 5 1\n", output);

        let output = run(&["batch", "--vocab", vocab, "--batch-size", "2", corpus]).unwrap();
        assert_eq!(
            r#"{"lengths":[5,5],"rows":[[0,4,4,5,1],[0,5,2,4,1]],"shape":[2,5]}"#.to_string()
                + "\n",
            output
        );
    }

    #[test]
    fn config_file_sets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let vocab = dir.path().join("vocab.json");
        let config = dir.path().join("config.json");
        std::fs::write(&corpus, "x y\n").unwrap();
        std::fs::write(
            &config,
            r#"{ "vocab": { "reserve-pad": false }, "encoder": { "max-len": 3 } }"#,
        )
        .unwrap();
        let (corpus, vocab, config) = (
            corpus.to_str().unwrap(),
            vocab.to_str().unwrap(),
            config.to_str().unwrap(),
        );

        run(&["-c", config, "build-vocab", "-o", vocab, corpus]).unwrap();
        let output = run(&["-c", config, "encode", "--vocab", vocab, corpus]).unwrap();
        assert_eq!("0 3 1\n", output);
    }

    #[test]
    fn config_with_shared_reserved_literal_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let vocab = dir.path().join("vocab.json");
        let config = dir.path().join("config.json");
        std::fs::write(&corpus, "x y\n").unwrap();
        std::fs::write(&config, r#"{ "reserved": { "pad": "UNK" } }"#).unwrap();

        let result = run(&[
            "-c",
            config.to_str().unwrap(),
            "build-vocab",
            "-o",
            vocab.to_str().unwrap(),
            corpus.to_str().unwrap(),
        ]);

        assert!(result.is_err());
        assert!(!vocab.exists());
    }

    #[test]
    fn missing_vocab_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let result = run(&["encode", "--vocab", missing.to_str().unwrap(), "corpus.txt"]);
        assert!(result.is_err());
    }
}
