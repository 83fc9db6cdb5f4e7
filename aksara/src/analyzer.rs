use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::Command;

use hashbrown::HashMap;
use tracing::debug;

use crate::analysis::{CandidateAnalysis, Feature, PosTag};
use crate::errors::{AksaraError, Result};

/// Analysis returned by the finite-state analyzer for words it does not know.
pub const UNKNOWN_ANALYSIS: &str = "???";

const INFORMAL_PREFIX: &str = "@informal";
const PROPN_WORDS: &[&str] = &["of", "the", "n't", "'s", "'m"];
const PUNCT_CHARS: &[char] = &['“', '”', ',', '.', '?', '!', '(', ')', '—', '"', ':', '\'', '-'];

/// Raw morphological analysis backend.
pub trait Analyzer: Send + Sync {
    /// Looks up a word.
    ///
    /// # Returns
    ///
    /// Newline-separated candidate strings of the form `lemma+TAG[+Name=Value]*`, or
    /// [`UNKNOWN_ANALYSIS`].
    ///
    /// # Errors
    ///
    /// Any failure of the backend.
    fn lookup(&self, word: &str) -> Result<String>;
}

/// Backend calling the `foma` command with a compiled transducer.
pub struct FomaAnalyzer {
    bin_path: PathBuf,
    command: String,
}

impl FomaAnalyzer {
    /// Creates a new analyzer.
    ///
    /// # Arguments
    ///
    /// * `bin_path` - A compiled foma binary (`.bin`) file.
    pub fn new<P>(bin_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            bin_path: bin_path.into(),
            command: "foma".to_string(),
        }
    }

    /// Overrides the executable name. The default is `foma`.
    pub fn command<S>(mut self, command: S) -> Self
    where
        S: Into<String>,
    {
        self.command = command.into();
        self
    }
}

impl Analyzer for FomaAnalyzer {
    fn lookup(&self, word: &str) -> Result<String> {
        let mut script = tempfile::NamedTempFile::new()?;
        writeln!(script, "load {}", self.bin_path.display())?;
        write!(script, "apply up {word}")?;
        script.flush()?;

        let output = Command::new(&self.command)
            .arg("-q")
            .arg("-f")
            .arg(script.path())
            .output()?;
        if !output.status.success() {
            return Err(AksaraError::Analyzer(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim(),
            )));
        }
        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout.trim_end().to_string())
    }
}

/// In-process backend backed by a lexicon of precomputed analyses.
#[derive(Default)]
pub struct LexiconAnalyzer {
    entries: HashMap<String, Vec<String>>,
}

impl LexiconAnalyzer {
    /// Creates an empty lexicon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an analysis of `surface`. Multiple analyses of one surface are kept in insertion
    /// order.
    pub fn insert<S, T>(&mut self, surface: S, analysis: T)
    where
        S: Into<String>,
        T: Into<String>,
    {
        self.entries
            .entry(surface.into())
            .or_default()
            .push(analysis.into());
    }

    /// Loads a lexicon from `surface<TAB>analysis` lines.
    ///
    /// Empty lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a line has no tab or `rdr` fails.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut lexicon = Self::new();
        for (i, line) in rdr.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (surface, analysis) = line
                .split_once('\t')
                .ok_or_else(|| AksaraError::invalid_corpus(i + 1, "missing tab separator"))?;
            lexicon.insert(surface, analysis);
        }
        Ok(lexicon)
    }

    /// Returns the number of surfaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the lexicon has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Analyzer for LexiconAnalyzer {
    fn lookup(&self, word: &str) -> Result<String> {
        Ok(self
            .entries
            .get(word)
            .map_or_else(|| UNKNOWN_ANALYSIS.to_string(), |a| a.join("\n")))
    }
}

/// Result of [`MorphologicalAnalyzer::analyze()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordAnalysis {
    /// Distinct candidate strings joined by `\n`, as produced by the backend.
    Candidates(String),

    /// A single analysis guessed for a word unknown to the backend. Its lemma is the surface
    /// as is, so it is never parsed as a candidate string.
    Guess(CandidateAnalysis),
}

/// Adapter turning raw backend lookups into candidates.
///
/// Unknown words are resolved with reduplication and character-class heuristics, so the
/// result always holds at least one candidate.
pub struct MorphologicalAnalyzer {
    backend: Box<dyn Analyzer>,
    informal: bool,
}

impl MorphologicalAnalyzer {
    /// Creates a new adapter.
    pub fn new(backend: Box<dyn Analyzer>) -> Self {
        Self {
            backend,
            informal: false,
        }
    }

    /// Enables the informal rules of the transducer.
    pub const fn informal(mut self, informal: bool) -> Self {
        self.informal = informal;
        self
    }

    fn raw_lookup(&self, word: &str) -> Result<String> {
        if self.informal {
            self.backend.lookup(&format!("{INFORMAL_PREFIX}{word}"))
        } else {
            self.backend.lookup(word)
        }
    }

    /// Analyzes a word.
    ///
    /// # Returns
    ///
    /// Backend candidates, de-duplicated in first-occurrence order, or a guess if the backend
    /// does not know the word.
    ///
    /// # Errors
    ///
    /// Failures of the backend are returned as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{CandidateAnalysis, Feature, LexiconAnalyzer, MorphologicalAnalyzer};
    /// use aksara::{PosTag, WordAnalysis};
    ///
    /// let mut lexicon = LexiconAnalyzer::new();
    /// lexicon.insert("buku", "buku+NOUN");
    /// let analyzer = MorphologicalAnalyzer::new(Box::new(lexicon));
    ///
    /// assert_eq!(
    ///     WordAnalysis::Candidates("buku+NOUN".to_string()),
    ///     analyzer.analyze("buku").unwrap(),
    /// );
    /// assert_eq!(
    ///     WordAnalysis::Guess(CandidateAnalysis::new(
    ///         "yanjg",
    ///         PosTag::X,
    ///         vec![Feature::new("Foreign", "Yes")],
    ///     )),
    ///     analyzer.analyze("yanjg").unwrap(),
    /// );
    /// ```
    pub fn analyze(&self, word: &str) -> Result<WordAnalysis> {
        let analysis = self.raw_lookup(word)?;
        if analysis.trim() == UNKNOWN_ANALYSIS || analysis.trim().is_empty() {
            debug!(word, "unknown word");
            return self.analyze_unknown(word);
        }
        Ok(WordAnalysis::Candidates(dedup_lines(&analysis)))
    }

    fn analyze_unknown(&self, surface: &str) -> Result<WordAnalysis> {
        if let Some(analysis) = self.analyze_redup(surface)? {
            return Ok(WordAnalysis::Candidates(dedup_lines(&analysis)));
        }
        let first = surface.chars().next().unwrap_or_default();
        let tag = if first.is_ascii_uppercase() || PROPN_WORDS.contains(&surface) {
            PosTag::Propn
        } else if PUNCT_CHARS.contains(&first) {
            PosTag::Punct
        } else if !is_word_char(first) {
            PosTag::Sym
        } else {
            PosTag::X
        };
        let features = if tag == PosTag::X {
            vec![Feature::new("Foreign", "Yes")]
        } else {
            vec![]
        };
        Ok(WordAnalysis::Guess(CandidateAnalysis::new(
            surface, tag, features,
        )))
    }

    /// Resolves `word-word` reduplication of lowercase words from the analysis of the first
    /// half.
    fn analyze_redup(&self, surface: &str) -> Result<Option<String>> {
        let (first, second) = match surface.split_once('-') {
            Some((f, s)) if is_ascii_lower(f) && is_ascii_lower(s) => (f, s),
            _ => return Ok(None),
        };
        let first_analysis = self.raw_lookup(first)?;
        let first_analysis = first_analysis.trim();
        if first_analysis == UNKNOWN_ANALYSIS {
            return Ok(None);
        }
        let second_analysis = self.raw_lookup(second)?;
        let second_analysis = second_analysis.trim();
        let (first_lemma, first_tag) = trim_clitics(first_analysis);
        if second_analysis != UNKNOWN_ANALYSIS && trim_clitics(second_analysis).0 != first_lemma {
            return Ok(None);
        }
        if first_tag == "NOUN" {
            Ok(Some(first_analysis.replace("+Number=Sing", "+Number=Plur")))
        } else {
            Ok(Some(first_analysis.to_string()))
        }
    }
}

/// Returns the lemma and the tag of the first candidate of an analysis, ignoring clitics.
fn trim_clitics(analysis: &str) -> (&str, &str) {
    let first = analysis.lines().next().unwrap_or_default();
    let host = first.rsplit("+_").next().unwrap_or_default();
    let host = host.split("_+").next().unwrap_or_default();
    let mut parts = host.split('+');
    (
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    )
}

fn dedup_lines(analysis: &str) -> String {
    let mut candidates: Vec<&str> = vec![];
    for cand in analysis.lines().map(str::trim).filter(|c| !c.is_empty()) {
        if !candidates.contains(&cand) {
            candidates.push(cand);
        }
    }
    candidates.join("\n")
}

pub(crate) fn is_ascii_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_ascii_lower(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase())
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
