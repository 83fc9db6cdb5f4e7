use std::io::BufRead;
use std::str::FromStr;

use hashbrown::HashMap;
use tracing::info;

use crate::analysis::PosTag;
use crate::errors::{AksaraError, Result};
use crate::model::{DecodingMode, HmmModel, HmmState, N_STATES};
use crate::utils::SerializableHashMap;

/// Parses one line of a `word/TAG` corpus.
///
/// The word is everything before the last `/`. A token with an empty tag (e.g. `//`) is tagged
/// as [`PosTag::Punct`].
///
/// # Arguments
///
/// * `line_no` - 1-based line number used in error messages.
/// * `line` - A whitespace-separated line.
///
/// # Errors
///
/// [`AksaraError::InvalidCorpus`] is returned for a token without `/` or with an unknown tag.
///
/// # Examples
///
/// ```
/// use aksara::{parse_tagged_line, PosTag};
///
/// let pairs = parse_tagged_line(1, "Dia/PRON makan/VERB ./").unwrap();
/// assert_eq!(("Dia".to_string(), PosTag::Pron), pairs[0]);
/// assert_eq!((".".to_string(), PosTag::Punct), pairs[2]);
/// ```
pub fn parse_tagged_line(line_no: usize, line: &str) -> Result<Vec<(String, PosTag)>> {
    let mut pairs = vec![];
    for token in line.split_whitespace() {
        let (word, tag) = token
            .rsplit_once('/')
            .ok_or_else(|| AksaraError::invalid_corpus(line_no, format!("no tag: {token}")))?;
        let tag = if tag.is_empty() {
            PosTag::Punct
        } else {
            PosTag::from_str(tag).map_err(|_| {
                AksaraError::invalid_corpus(line_no, format!("unknown tag: {token}"))
            })?
        };
        pairs.push((word.to_string(), tag));
    }
    Ok(pairs)
}

/// Trainer of [`HmmModel`].
///
/// Sentences are concatenated into one tag stream `START t1 .. tn END START ...`, so the
/// trigram context of a sentence-initial tag is `(END, START)`.
pub struct Trainer {
    emissions: Vec<HashMap<String, u32>>,
    bigram: Vec<u32>,
    trigram: Vec<u32>,
    n_tokens: u64,
    n_sentences: usize,
    prev2: Option<usize>,
    prev1: Option<usize>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Trainer {
    /// Creates a new trainer.
    pub fn new() -> Self {
        Self {
            emissions: vec![HashMap::new(); PosTag::N_TAGS],
            bigram: vec![0; N_STATES * N_STATES],
            trigram: vec![0; N_STATES * N_STATES * N_STATES],
            n_tokens: 0,
            n_sentences: 0,
            prev2: None,
            prev1: None,
        }
    }

    fn push_state(&mut self, state: HmmState) {
        let cur = state.index();
        if let Some(prev1) = self.prev1 {
            self.bigram[prev1 * N_STATES + cur] += 1;
            if let Some(prev2) = self.prev2 {
                self.trigram[(prev2 * N_STATES + prev1) * N_STATES + cur] += 1;
            }
        }
        self.prev2 = self.prev1;
        self.prev1 = Some(cur);
    }

    /// Adds a tagged sentence.
    pub fn add_sentence<S>(&mut self, pairs: &[(S, PosTag)])
    where
        S: AsRef<str>,
    {
        self.push_state(HmmState::Start);
        for (word, tag) in pairs {
            *self.emissions[tag.index()]
                .entry(word.as_ref().to_string())
                .or_insert(0) += 1;
            self.n_tokens += 1;
            self.push_state(HmmState::Tag(*tag));
        }
        self.push_state(HmmState::End);
        self.n_sentences += 1;
    }

    /// Parses and adds one corpus line. Empty lines are ignored.
    ///
    /// # Errors
    ///
    /// See [`parse_tagged_line()`].
    pub fn add_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let pairs = parse_tagged_line(line_no, line)?;
        if !pairs.is_empty() {
            self.add_sentence(&pairs);
        }
        Ok(())
    }

    /// Adds every line of a corpus.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. Parse errors report the line
    /// number within `rdr`.
    pub fn add_corpus<R>(&mut self, rdr: R) -> Result<()>
    where
        R: BufRead,
    {
        for (i, line) in rdr.lines().enumerate() {
            self.add_line(i + 1, &line?)?;
        }
        Ok(())
    }

    /// Gets the number of added tokens.
    pub const fn n_tokens(&self) -> u64 {
        self.n_tokens
    }

    /// Gets the number of added sentences.
    pub const fn n_sentences(&self) -> usize {
        self.n_sentences
    }

    /// Builds the model.
    ///
    /// # Arguments
    ///
    /// * `mode` - The decoding mode stored in the model.
    ///
    /// # Errors
    ///
    /// An error is returned if no token has been added.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{DecodingMode, PosTag, Trainer};
    ///
    /// let mut trainer = Trainer::new();
    /// trainer.add_corpus("Dia/PRON makan/VERB ./PUNCT\n".as_bytes()).unwrap();
    /// let model = trainer.train(DecodingMode::Bigram).unwrap();
    ///
    /// assert!(model.emission_prob("makan", PosTag::Verb) > model.emission_prob("makan", PosTag::Noun));
    /// ```
    pub fn train(self, mode: DecodingMode) -> Result<HmmModel> {
        if self.n_tokens == 0 {
            return Err(AksaraError::invalid_argument("corpus", "no token"));
        }
        info!(
            n_sentences = self.n_sentences,
            n_tokens = self.n_tokens,
            %mode,
            "training finished"
        );
        let emissions = self
            .emissions
            .into_iter()
            .map(SerializableHashMap)
            .collect();
        HmmModel::from_counts(mode, self.n_tokens, emissions, self.bigram, self.trigram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::TransitionContext;

    #[test]
    fn test_parse_tagged_line() {
        let pairs = parse_tagged_line(1, "1/2/NUM  buku/NOUN\t,/").unwrap();

        assert_eq!(
            vec![
                ("1/2".to_string(), PosTag::Num),
                ("buku".to_string(), PosTag::Noun),
                (",".to_string(), PosTag::Punct),
            ],
            pairs
        );
    }

    #[test]
    fn test_parse_tagged_line_errors() {
        let r = parse_tagged_line(7, "buku/NOUN rumah");
        assert_eq!(
            "InvalidCorpusError: line 7: no tag: rumah",
            &r.err().unwrap().to_string()
        );

        let r = parse_tagged_line(2, "buku/NN");
        assert_eq!(
            "InvalidCorpusError: line 2: unknown tag: buku/NN",
            &r.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_train_empty() {
        let mut trainer = Trainer::new();
        trainer.add_corpus("\n\n".as_bytes()).unwrap();
        let r = trainer.train(DecodingMode::Trigram);

        assert_eq!(
            "InvalidArgumentError: corpus: no token",
            &r.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_train_counts_across_lines() {
        let mut trainer = Trainer::new();
        trainer
            .add_corpus("a/NOUN\n\nb/VERB c/NOUN\n".as_bytes())
            .unwrap();

        assert_eq!(3, trainer.n_tokens());
        assert_eq!(2, trainer.n_sentences());

        let model = trainer.train(DecodingMode::Trigram).unwrap();
        let noun = HmmState::Tag(PosTag::Noun);
        let verb = HmmState::Tag(PosTag::Verb);

        // Stream: START NOUN END START VERB NOUN END
        assert_eq!(1, model.bigram[HmmState::End.index() * N_STATES + HmmState::Start.index()]);
        let p = model.transition_prob(
            verb,
            TransitionContext::Trigram(HmmState::End, HmmState::Start),
        );
        assert!((p - 2. / 18.).abs() < 1e-12);
        let p = model.transition_prob(HmmState::End, TransitionContext::Bigram(noun));
        assert!((p - 3. / 19.).abs() < 1e-12);
        // (1 + 1) / (2 + 3)
        assert!((model.emission_prob("a", PosTag::Noun) - 2. / 5.).abs() < 1e-12);
    }

    #[test]
    fn test_add_corpus_line_number() {
        let mut trainer = Trainer::new();
        let r = trainer.add_corpus("a/NOUN\nb/VERB\nc\n".as_bytes());

        assert_eq!(
            "InvalidCorpusError: line 3: no tag: c",
            &r.err().unwrap().to_string()
        );
    }
}
