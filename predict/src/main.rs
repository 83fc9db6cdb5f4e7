use std::fs::File;
use std::io::{prelude::*, stderr, stdin, stdout, BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use aksara::{
    Analyzer, ConlluRow, DecodingMode, Disambiguator, FomaAnalyzer, HmmModel, LexiconAnalyzer,
    MorphologicalAnalyzer, Pipeline, Tokenizer,
};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    about = "A program to analyze Indonesian text.",
    group = ArgGroup::new("analyzer").required(true),
)]
struct Args {
    /// The HMM model file to use for disambiguation
    #[arg(long)]
    model: PathBuf,

    /// A compiled foma transducer
    #[arg(long, group = "analyzer")]
    fst: Option<PathBuf>,

    /// A tab-separated lexicon used instead of a transducer
    #[arg(long, group = "analyzer")]
    lexicon: Option<PathBuf>,

    /// The foma executable
    #[arg(long, default_value = "foma")]
    foma_command: String,

    /// Use the informal rules beside the formal rules
    #[arg(long)]
    informal: bool,

    /// Only output lemmatization results
    #[arg(long)]
    lemma: bool,

    /// Only output POS tagging results
    #[arg(long)]
    postag: bool,

    /// Override the transition context of the model: {bigram, trigram}
    #[arg(long)]
    mode: Option<DecodingMode>,

    /// Number of threads
    #[arg(long, default_value = "0")]
    n_threads: usize,
}

fn format_row(row: &ConlluRow, args: &Args) -> String {
    if !args.lemma && !args.postag {
        return row.to_string();
    }
    let mut cols = vec![row.id().to_string(), row.form().to_string()];
    if args.lemma {
        cols.push(row.lemma().unwrap_or("_").to_string());
    }
    if args.postag {
        cols.push(row.upos().map_or("_", |t| t.as_str()).to_string());
    }
    cols.join("\t")
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
    let mut f = zstd::Decoder::new(File::open(&args.model)?)?;
    let model = HmmModel::read(&mut f)?;
    let mut disambiguator = Disambiguator::new(model);
    if let Some(mode) = args.mode {
        disambiguator = disambiguator.mode(mode);
    }

    let backend: Box<dyn Analyzer> = if let Some(path) = &args.lexicon {
        eprintln!("Loading lexicon...");
        let lexicon = LexiconAnalyzer::from_reader(BufReader::new(File::open(path)?))?;
        eprintln!("# of words: {}", lexicon.len());
        Box::new(lexicon)
    } else if let Some(path) = &args.fst {
        Box::new(FomaAnalyzer::new(path).command(args.foma_command.as_str()))
    } else {
        return Err("either --fst or --lexicon is required".into());
    };
    let analyzer = MorphologicalAnalyzer::new(backend).informal(args.informal);
    let pipeline = Pipeline::new(analyzer, disambiguator)?;
    let tokenizer = Tokenizer::new()?;

    eprintln!("Start analysis");
    let mut out = BufWriter::new(stdout().lock());
    let mut n_sentences = 0;
    let mut n_words = 0;
    let start = Instant::now();
    let mut write_sentence = |sentence: &str, rows: &[ConlluRow]| -> std::io::Result<()> {
        n_sentences += 1;
        n_words += rows.len();
        writeln!(out, "# sent_id = {n_sentences}")?;
        writeln!(out, "# text = {sentence}")?;
        for row in rows {
            writeln!(out, "{}", format_row(row, &args))?;
        }
        writeln!(out)
    };
    if args.n_threads == 0 {
        for line in stdin().lock().lines() {
            for sentence in tokenizer.split_sentences(&line?)? {
                let rows = pipeline.analyze(&sentence)?;
                write_sentence(&sentence, &rows)?;
            }
        }
    } else {
        let mut pipeline = pipeline.multithreading(args.n_threads);
        for line in stdin().lock().lines() {
            let sentences = tokenizer.split_sentences(&line?)?;
            let results = pipeline.analyze_batch(&sentences)?;
            for (sentence, rows) in sentences.iter().zip(&results) {
                write_sentence(sentence, rows)?;
            }
        }
    }
    let duration = start.elapsed();
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());
    eprintln!(
        "Speed: {} [sentences/sec]",
        n_sentences as f64 / duration.as_secs_f64()
    );
    eprintln!("# of rows: {n_words}");

    Ok(())
}
