#[cfg(feature = "multithreading")]
use std::sync::Arc;
#[cfg(feature = "multithreading")]
use std::thread;

#[cfg(feature = "multithreading")]
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::analysis::PosTag;
use crate::analyzer::{is_ascii_alpha, is_word_char, MorphologicalAnalyzer, WordAnalysis};
use crate::disambiguator::Disambiguator;
use crate::errors::{AksaraError, Result};
use crate::finalizer::{finalize, ConlluRow};
use crate::row::{CandidateRowBuilder, RowId};
use crate::tokenizer::Tokenizer;

/// Head and relation of one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// 1-based index of the head word, or 0 for the root.
    pub head: usize,
    pub relation: String,
}

/// External dependency parser.
pub trait DependencyParser: Send + Sync {
    /// Predicts one [`Dependency`] per word.
    ///
    /// # Errors
    ///
    /// Any failure of the parser.
    fn predict(&self, words: &[&str], tags: &[PosTag]) -> Result<Vec<Dependency>>;
}

/// Returns true if the analysis of a lowercased word is only a foreign-word guess.
fn is_foreign_guess(analysis: &WordAnalysis) -> bool {
    match analysis {
        WordAnalysis::Guess(cand) => cand.tag() == PosTag::X && is_ascii_alpha(cand.lemma()),
        WordAnalysis::Candidates(raw) => {
            let n_alpha = raw.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
            n_alpha != 0 && raw[n_alpha..].starts_with("+X")
        }
    }
}

/// Full analysis pipeline: tokenization, morphological analysis, disambiguation and optional
/// dependency parsing.
pub struct Pipeline {
    tokenizer: Tokenizer,
    analyzer: MorphologicalAnalyzer,
    builder: CandidateRowBuilder,
    disambiguator: Disambiguator,
    dependency_parser: Option<Box<dyn DependencyParser>>,
}

impl Pipeline {
    /// Creates a new pipeline.
    ///
    /// # Errors
    ///
    /// If the tokenizer patterns cannot be compiled, an error variant will be returned.
    pub fn new(analyzer: MorphologicalAnalyzer, disambiguator: Disambiguator) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new()?,
            analyzer,
            builder: CandidateRowBuilder::new(),
            disambiguator,
            dependency_parser: None,
        })
    }

    /// Attaches a dependency parser. Without one, the head and relation columns stay empty.
    pub fn dependency_parser(mut self, parser: Box<dyn DependencyParser>) -> Self {
        self.dependency_parser = Some(parser);
        self
    }

    /// Gets the tokenizer.
    pub const fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Analyzes one sentence.
    ///
    /// The first word of the sentence is looked up in lowercase. If that only yields a
    /// foreign-word guess, the original casing is looked up instead.
    ///
    /// # Errors
    ///
    /// Failures of the analyzer or the dependency parser are returned as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{
    ///     DecodingMode, Disambiguator, LexiconAnalyzer, MorphologicalAnalyzer, Pipeline, Trainer,
    /// };
    ///
    /// let mut lexicon = LexiconAnalyzer::new();
    /// lexicon.insert("dia", "dia+PRON");
    /// lexicon.insert("makan", "makan+VERB");
    /// lexicon.insert(".", ".+PUNCT");
    ///
    /// let mut trainer = Trainer::new();
    /// trainer.add_corpus("Dia/PRON makan/VERB ./PUNCT\n".as_bytes()).unwrap();
    /// let disambiguator = Disambiguator::new(trainer.train(DecodingMode::Trigram).unwrap());
    ///
    /// let pipeline = Pipeline::new(
    ///     MorphologicalAnalyzer::new(Box::new(lexicon)),
    ///     disambiguator,
    /// )
    /// .unwrap();
    /// let rows = pipeline.analyze("Dia makan.").unwrap();
    ///
    /// assert_eq!(3, rows.len());
    /// assert_eq!(Some("makan"), rows[1].lemma());
    /// ```
    pub fn analyze(&self, sentence: &str) -> Result<Vec<ConlluRow>> {
        let tokens = self.tokenizer.tokenize(sentence)?;
        let first_word_idx = tokens.iter().position(|t| {
            t.surface()
                .chars()
                .next()
                .map_or(false, |c| is_word_char(c) || c.is_whitespace() || c == '+')
        });

        let mut rows = vec![];
        let mut next_id = 1;
        for (i, token) in tokens.iter().enumerate() {
            let analysis = if Some(i) == first_word_idx {
                let analysis = self.analyzer.analyze(&token.surface().to_lowercase())?;
                if is_foreign_guess(&analysis) {
                    self.analyzer.analyze(token.surface())?
                } else {
                    analysis
                }
            } else {
                self.analyzer.analyze(token.surface())?
            };
            next_id = match analysis {
                WordAnalysis::Candidates(raw) => {
                    self.builder.build(next_id, token, &raw, &mut rows)?
                }
                WordAnalysis::Guess(cand) => {
                    self.builder.build_guess(next_id, token, cand, &mut rows)
                }
            };
        }
        debug!(n_tokens = tokens.len(), n_words = next_id - 1, "analyzed");

        let rows = self.disambiguator.disambiguate(rows)?;
        let mut rows = finalize(&rows);
        if let Some(parser) = &self.dependency_parser {
            self.attach_dependencies(parser.as_ref(), &mut rows)?;
        }
        Ok(rows)
    }

    fn attach_dependencies(
        &self,
        parser: &dyn DependencyParser,
        rows: &mut [ConlluRow],
    ) -> Result<()> {
        let mut words = vec![];
        let mut tags = vec![];
        for row in rows.iter() {
            if let (RowId::Single(_), Some(tag)) = (row.id(), row.upos()) {
                words.push(row.form());
                tags.push(tag);
            }
        }
        let deps = parser.predict(&words, &tags)?;
        if deps.len() != words.len() {
            return Err(AksaraError::Parser(format!(
                "{} dependencies for {} words",
                deps.len(),
                words.len()
            )));
        }
        let mut deps = deps.into_iter();
        for row in rows.iter_mut() {
            if let RowId::Single(_) = row.id() {
                if let Some(dep) = deps.next() {
                    row.set_dependency(dep.head, dep.relation);
                }
            }
        }
        Ok(())
    }

    /// Splits a text into sentences and analyzes each of them.
    ///
    /// # Returns
    ///
    /// Pairs of a sentence and its rows.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::analyze()`].
    pub fn analyze_text(&self, text: &str) -> Result<Vec<(String, Vec<ConlluRow>)>> {
        let mut result = vec![];
        for sentence in self.tokenizer.split_sentences(text)? {
            let rows = self.analyze(&sentence)?;
            result.push((sentence, rows));
        }
        Ok(result)
    }

    /// Creates a multithreading pipeline. This function is the alias of
    /// [`MultithreadPipeline::new()`].
    ///
    /// # Arguments
    ///
    /// * `n_threads` - The number of threads.
    ///
    /// # Returns
    ///
    /// A multithread pipeline.
    #[cfg(feature = "multithreading")]
    #[cfg_attr(docsrs, doc(cfg(feature = "multithreading")))]
    pub fn multithreading(self, n_threads: usize) -> MultithreadPipeline {
        MultithreadPipeline::new(self, n_threads)
    }
}

/// Pipeline analyzing sentences on worker threads.
#[cfg(feature = "multithreading")]
#[cfg_attr(docsrs, doc(cfg(feature = "multithreading")))]
pub struct MultithreadPipeline {
    task_tx: Sender<(usize, String)>,
    result_rx: Receiver<(usize, Result<Vec<ConlluRow>>)>,
}

#[cfg(feature = "multithreading")]
impl MultithreadPipeline {
    /// Creates a multithreading pipeline.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - A normal pipeline.
    /// * `n_threads` - The number of threads. At least one thread is spawned.
    ///
    /// # Returns
    ///
    /// A multithread pipeline.
    pub fn new(pipeline: Pipeline, n_threads: usize) -> Self {
        let pipeline = Arc::new(pipeline);

        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, String)>();
        for _ in 0..n_threads.max(1) {
            let pipeline = Arc::clone(&pipeline);
            let result_tx = result_tx.clone();
            let task_rx = task_rx.clone();
            thread::spawn(move || {
                for (i, sentence) in task_rx {
                    let rows = pipeline.analyze(&sentence);
                    if result_tx.send((i, rows)).is_err() {
                        break;
                    }
                }
            });
        }

        Self { task_tx, result_rx }
    }

    /// Analyzes sentences in parallel.
    ///
    /// # Returns
    ///
    /// The rows of each sentence, in input order.
    ///
    /// # Errors
    ///
    /// The first error in input order is returned.
    pub fn analyze_batch<S>(&mut self, sentences: &[S]) -> Result<Vec<Vec<ConlluRow>>>
    where
        S: AsRef<str>,
    {
        let stopped = || AksaraError::Integrity("worker threads have stopped".to_string());
        for (i, sentence) in sentences.iter().enumerate() {
            self.task_tx
                .send((i, sentence.as_ref().to_string()))
                .map_err(|_| stopped())?;
        }
        let mut results: Vec<Option<Result<Vec<ConlluRow>>>> =
            sentences.iter().map(|_| None).collect();
        for _ in 0..sentences.len() {
            let (i, rows) = self.result_rx.recv().map_err(|_| stopped())?;
            results[i] = Some(rows);
        }
        results
            .into_iter()
            .map(|rows| rows.unwrap_or_else(|| Err(stopped())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::CandidateAnalysis;
    use crate::analyzer::LexiconAnalyzer;
    use crate::model::DecodingMode;
    use crate::trainer::Trainer;

    const CORPUS: &str = "\
Pengeluaran/NOUN itu/DET dipasok/VERB dari/ADP luar/NOUN ./PUNCT
Air/NOUN nya/PRON dingin/ADJ ./PUNCT
Jakarta/PROPN besar/ADJ ./PUNCT
";

    fn pipeline() -> Pipeline {
        let mut lexicon = LexiconAnalyzer::new();
        lexicon.insert(
            "pengeluaran",
            "keluar+NOUN+Number=Sing+Pref=peN+Stem=VERB+Suff=an",
        );
        lexicon.insert("dipasok", "pasok+VERB+Voice=Pass+Pref=di+Stem=VERB");
        lexicon.insert("airnya", "air+NOUN+Number=Sing_+nya+PRON+PronType=Prs");
        lexicon.insert("Jakarta", "Jakarta+PROPN");
        lexicon.insert("besar", "besar+ADJ");
        lexicon.insert("besar", "besar+NOUN");
        lexicon.insert(".", ".+PUNCT");
        lexicon.insert("saya", "saya+PRON+Person=1");
        lexicon.insert("suka", "suka+VERB");

        let mut trainer = Trainer::new();
        trainer.add_corpus(CORPUS.as_bytes()).unwrap();
        let model = trainer.train(DecodingMode::Trigram).unwrap();

        Pipeline::new(
            MorphologicalAnalyzer::new(Box::new(lexicon)),
            Disambiguator::new(model),
        )
        .unwrap()
    }

    struct ChainParser;

    impl DependencyParser for ChainParser {
        fn predict(&self, words: &[&str], _tags: &[PosTag]) -> Result<Vec<Dependency>> {
            Ok((0..words.len())
                .map(|i| Dependency {
                    head: i,
                    relation: if i == 0 { "root" } else { "dep" }.to_string(),
                })
                .collect())
        }
    }

    struct BrokenParser;

    impl DependencyParser for BrokenParser {
        fn predict(&self, _words: &[&str], _tags: &[PosTag]) -> Result<Vec<Dependency>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_analyze_sentence() {
        let pipeline = pipeline();
        let rows = pipeline.analyze("Pengeluaran dipasok yanjg airnya.").unwrap();

        let lines: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            vec![
                "1\tPengeluaran\tkeluar\tNOUN\t_\tNumber=Sing\t_\t_\t_\tMorf=peN+keluar<VERB>+an_NOUN",
                "2\tdipasok\tpasok\tVERB\t_\tVoice=Pass\t_\t_\t_\tMorf=di+pasok<VERB>_VERB",
                "3\tyanjg\tyanjg\tX\t_\tForeign=Yes\t_\t_\t_\tMorf=yanjg<X>_X",
                "4-5\tairnya\t_\t_\t_\t_\t_\t_\t_\t_",
                "4\tair\tair\tNOUN\t_\tNumber=Sing\t_\t_\t_\tMorf=air<X>_NOUN",
                "5\tnya\tnya\tPRON\t_\tPronType=Prs\t_\t_\t_\tMorf=nya<X>_PRON|SpaceAfter=No",
                "6\t.\t.\tPUNCT\t_\t_\t_\t_\t_\tMorf=.<X>_PUNCT",
            ],
            lines
        );
    }

    #[test]
    fn test_analyze_first_word_original_casing() {
        let pipeline = pipeline();
        let rows = pipeline.analyze("Jakarta besar.").unwrap();

        assert_eq!(Some("Jakarta"), rows[0].lemma());
        assert_eq!(Some(PosTag::Propn), rows[0].upos());
        assert_eq!(Some(PosTag::Adj), rows[1].upos());
    }

    #[test]
    fn test_analyze_text() {
        let pipeline = pipeline();
        let result = pipeline.analyze_text("Jakarta besar. Pengeluaran dipasok.").unwrap();

        assert_eq!(2, result.len());
        assert_eq!("Jakarta besar.", result[0].0);
        assert_eq!("Pengeluaran dipasok.", result[1].0);
        assert_eq!(Some("keluar"), result[1].1[0].lemma());
    }

    #[test]
    fn test_analyze_empty() {
        let pipeline = pipeline();

        assert!(pipeline.analyze("   ").unwrap().is_empty());
    }

    #[test]
    fn test_dependency_parser() {
        let pipeline = pipeline().dependency_parser(Box::new(ChainParser));
        let rows = pipeline.analyze("airnya dipasok.").unwrap();

        assert_eq!(RowId::Range(1, 2), rows[0].id());
        assert_eq!(None, rows[0].head());
        assert_eq!(Some(0), rows[1].head());
        assert_eq!(Some("root"), rows[1].deprel());
        assert_eq!(Some(1), rows[2].head());
        assert_eq!(Some(3), rows[4].head());
    }

    #[test]
    fn test_dependency_parser_length_mismatch() {
        let pipeline = pipeline().dependency_parser(Box::new(BrokenParser));
        let r = pipeline.analyze("Jakarta besar.");

        assert_eq!(
            "ParserError: 0 dependencies for 3 words",
            &r.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_analyze_unknown_surface_kept() {
        let pipeline = pipeline();

        for (sentence, surface, tag) in [
            ("Saya suka snake_case.", "snake_case", PosTag::X),
            ("Saya _ .", "_", PosTag::X),
            ("Saya @user_name .", "@user_name", PosTag::Sym),
            ("Saya +4 .", "+4", PosTag::Sym),
        ] {
            let rows = pipeline.analyze(sentence).unwrap();
            let row = rows.iter().find(|r| r.form() == surface).unwrap();

            assert!(rows.iter().all(|r| matches!(r.id(), RowId::Single(_))));
            assert_eq!(Some(surface), row.lemma());
            assert_eq!(Some(tag), row.upos());
        }
    }

    #[test]
    fn test_analyze_unknown_surface_columns() {
        let pipeline = pipeline();
        let rows = pipeline.analyze("Saya suka snake_case.").unwrap();

        let lines: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            vec![
                "1\tSaya\tsaya\tPRON\t_\tPerson=1\t_\t_\t_\tMorf=saya<X>_PRON",
                "2\tsuka\tsuka\tVERB\t_\t_\t_\t_\t_\tMorf=suka<X>_VERB",
                "3\tsnake_case\tsnake_case\tX\t_\tForeign=Yes\t_\t_\t_\tMorf=snake_case<X>_X|SpaceAfter=No",
                "4\t.\t.\tPUNCT\t_\t_\t_\t_\t_\tMorf=.<X>_PUNCT",
            ],
            lines
        );
    }

    #[test]
    fn test_is_foreign_guess() {
        let guess =
            |lemma: &str, tag| WordAnalysis::Guess(CandidateAnalysis::new(lemma, tag, vec![]));
        let candidates = |s: &str| WordAnalysis::Candidates(s.to_string());

        assert!(is_foreign_guess(&guess("jakarta", PosTag::X)));
        assert!(!is_foreign_guess(&guess("jakarta", PosTag::Propn)));
        assert!(!is_foreign_guess(&guess("snake_case", PosTag::X)));
        assert!(!is_foreign_guess(&guess("1990", PosTag::X)));
        assert!(is_foreign_guess(&candidates("jakarta+X+Foreign=Yes")));
        assert!(!is_foreign_guess(&candidates("jakarta+PROPN")));
        assert!(!is_foreign_guess(&candidates("+X")));
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn test_multithreading() {
        let sentences = ["Jakarta besar.", "Pengeluaran dipasok yanjg airnya.", "besar."];
        let expected: Vec<Vec<ConlluRow>> = {
            let pipeline = pipeline();
            sentences
                .iter()
                .map(|s| pipeline.analyze(s).unwrap())
                .collect()
        };
        let mut pipeline = pipeline().multithreading(2);

        assert_eq!(expected, pipeline.analyze_batch(&sentences).unwrap());
    }
}
