#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Aksara
//!
//! Aksara is an Indonesian morphological analyzer with HMM-based part-of-speech
//! disambiguation.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use aksara::{Disambiguator, FomaAnalyzer, HmmModel, MorphologicalAnalyzer, Pipeline};
//!
//! let mut f = BufReader::new(File::open("model.bin").unwrap());
//! let model = HmmModel::read(&mut f).unwrap();
//! let analyzer = MorphologicalAnalyzer::new(Box::new(FomaAnalyzer::new("aksara.bin")));
//! let pipeline = Pipeline::new(analyzer, Disambiguator::new(model)).unwrap();
//!
//! for line in stdin().lock().lines() {
//!     for (sentence, rows) in pipeline.analyze_text(&line.unwrap()).unwrap() {
//!         println!("# text = {}", sentence);
//!         for row in rows {
//!             println!("{}", row);
//!         }
//!         println!();
//!     }
//! }
//! ```
//!
//! Models are built with [`Trainer`] from a `word/TAG` corpus.

mod utils;

mod analysis;
mod analyzer;
mod disambiguator;
mod finalizer;
mod model;
mod pipeline;
mod row;
mod tokenizer;
mod trainer;

pub mod errors;

pub use analysis::{CandidateAnalysis, Feature, PosTag};
pub use analyzer::{
    Analyzer, FomaAnalyzer, LexiconAnalyzer, MorphologicalAnalyzer, WordAnalysis,
    UNKNOWN_ANALYSIS,
};
pub use disambiguator::Disambiguator;
pub use finalizer::{finalize, ConlluRow};
pub use model::{DecodingMode, HmmModel, HmmState, TransitionContext};
pub use pipeline::{Dependency, DependencyParser, Pipeline};
pub use row::{
    AmbiguousRow, CandidateRowBuilder, DisambiguatedRow, MultiwordRow, RowId, SentenceRow,
};
pub use tokenizer::{Token, Tokenizer};
pub use trainer::{parse_tagged_line, Trainer};

#[cfg(feature = "multithreading")]
pub use pipeline::MultithreadPipeline;
