use std::fs::File;
use std::io::{prelude::*, stderr, BufReader};
use std::path::PathBuf;

use aksara::{DecodingMode, Trainer};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to train HMM models of Aksara.")]
struct Args {
    /// A `word/TAG` training corpus, one sentence per line
    #[arg(long, required = true)]
    corpus: Vec<PathBuf>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// The transition context: {bigram, trigram}
    #[arg(long, default_value = "trigram")]
    mode: DecodingMode,

    /// The compression level of zstd
    #[arg(long, default_value = "19")]
    zstd_level: i32,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    eprintln!("Loading corpus...");
    let mut trainer = Trainer::new();
    for path in args.corpus {
        eprintln!("Loading {path:?} ...");
        let f = BufReader::new(File::open(path)?);
        for (i, line) in f.lines().enumerate() {
            if i % 10000 == 0 {
                eprint!("# of sentences: {}\r", trainer.n_sentences());
                stderr().flush()?;
            }
            trainer.add_line(i + 1, &line?)?;
        }
        eprintln!("# of sentences: {}", trainer.n_sentences());
    }
    eprintln!("# of tokens: {}", trainer.n_tokens());

    eprintln!("Start training...");
    let model = trainer.train(args.mode)?;
    eprintln!("Finish training.");

    let mut f = zstd::Encoder::new(File::create(args.model)?, args.zstd_level)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
