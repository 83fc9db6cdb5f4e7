use std::fs::File;
use std::io::{prelude::*, stderr, stdin};
use std::path::PathBuf;

use aksara::{parse_tagged_line, DecodingMode, Disambiguator, HmmModel};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the tagging accuracy of Aksara models.")]
struct Args {
    /// The model file to evaluate
    #[arg(long)]
    model: PathBuf,

    /// Override the transition context of the model: {bigram, trigram}
    #[arg(long)]
    mode: Option<DecodingMode>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = HmmModel::read(&mut f)?;
    let mut disambiguator = Disambiguator::new(model);
    if let Some(mode) = args.mode {
        disambiguator = disambiguator.mode(mode);
    }

    eprintln!("Start tagging");
    let mut n_correct = 0;
    let mut n_total = 0;
    for (i, line) in stdin().lock().lines().enumerate() {
        let pairs = parse_tagged_line(i + 1, &line?)?;
        if pairs.is_empty() {
            continue;
        }
        let words: Vec<&str> = pairs.iter().map(|(w, _)| w.as_str()).collect();
        let tags = disambiguator.decode_unconstrained(&words)?;
        for ((_, gold), pred) in pairs.iter().zip(&tags) {
            if gold == pred {
                n_correct += 1;
            }
            n_total += 1;
        }
    }

    if n_total == 0 {
        return Err("no token in the input".into());
    }
    println!("Accuracy: {}", n_correct as f64 / n_total as f64);
    println!("Correct: {n_correct}");
    println!("Total: {n_total}");

    Ok(())
}
