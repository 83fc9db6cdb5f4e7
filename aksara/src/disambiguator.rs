use tracing::{debug, debug_span};

use crate::analysis::PosTag;
use crate::errors::{AksaraError, Result};
use crate::model::{DecodingMode, HmmModel, HmmState, TransitionContext};
use crate::row::{AmbiguousRow, DisambiguatedRow, SentenceRow};

/// A node of the Viterbi lattice.
#[derive(Debug, Clone, Copy)]
struct Node {
    tag: PosTag,
    state: HmmState,
    // State of the predecessor node. Part of the node identity in trigram mode.
    prev_state: HmmState,
    score: f64,
    back: usize,
}

/// Viterbi disambiguator choosing one tag per token.
///
/// In bigram mode there is one lattice node per candidate tag. In trigram mode there is one node
/// per (previous state, tag) pair, so the two-tag context of every transition is exact.
///
/// When two paths reach a node with the same score, the one found first is kept. Candidates are
/// visited in row order and predecessors in lattice order, so decoding is deterministic.
pub struct Disambiguator {
    model: HmmModel,
    mode: DecodingMode,
}

impl Disambiguator {
    /// Creates a new disambiguator using the decoding mode stored in `model`.
    pub fn new(model: HmmModel) -> Self {
        let mode = model.mode();
        Self { model, mode }
    }

    /// Overrides the decoding mode.
    pub const fn mode(mut self, mode: DecodingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Gets the model.
    pub const fn model(&self) -> &HmmModel {
        &self.model
    }

    fn context(&self, node: &Node) -> TransitionContext {
        match self.mode {
            DecodingMode::Bigram => TransitionContext::Bigram(node.state),
            DecodingMode::Trigram => TransitionContext::Trigram(node.prev_state, node.state),
        }
    }

    fn same_node(&self, a: &Node, b: &Node) -> bool {
        a.tag == b.tag
            && match self.mode {
                DecodingMode::Bigram => true,
                DecodingMode::Trigram => a.prev_state == b.prev_state,
            }
    }

    fn relax(&self, nodes: &mut Vec<Node>, node: Node) {
        if let Some(existing) = nodes.iter_mut().find(|n| self.same_node(n, &node)) {
            if node.score > existing.score {
                *existing = node;
            }
        } else {
            nodes.push(node);
        }
    }

    /// Finds the most probable tag sequence, restricting each position to its candidate tags.
    ///
    /// A position with a single candidate tag keeps the best predecessor score without any
    /// transition or emission term.
    ///
    /// # Arguments
    ///
    /// * `words` - Surface forms.
    /// * `candidates` - Candidate tags of each word.
    ///
    /// # Returns
    ///
    /// One tag per word, each taken from that word's candidates.
    ///
    /// # Errors
    ///
    /// If the lengths of `words` and `candidates` differ, or a word has no candidate, an error
    /// variant will be returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{DecodingMode, Disambiguator, PosTag, Trainer};
    ///
    /// let mut trainer = Trainer::new();
    /// trainer.add_corpus("Dia/PRON makan/VERB ./PUNCT\n".as_bytes()).unwrap();
    /// let disambiguator = Disambiguator::new(trainer.train(DecodingMode::Bigram).unwrap());
    ///
    /// let tags = disambiguator
    ///     .decode(
    ///         &["Dia", "makan", "."],
    ///         &[vec![PosTag::Pron], vec![PosTag::Noun, PosTag::Verb], vec![PosTag::Punct]],
    ///     )
    ///     .unwrap();
    /// assert_eq!(vec![PosTag::Pron, PosTag::Verb, PosTag::Punct], tags);
    /// ```
    pub fn decode<W, C>(&self, words: &[W], candidates: &[C]) -> Result<Vec<PosTag>>
    where
        W: AsRef<str>,
        C: AsRef<[PosTag]>,
    {
        if words.len() != candidates.len() {
            return Err(AksaraError::invalid_argument(
                "candidates",
                format!(
                    "length mismatch: {} words, {} candidate sets",
                    words.len(),
                    candidates.len()
                ),
            ));
        }
        let _span = debug_span!("viterbi", n_words = words.len(), mode = %self.mode).entered();

        let root = Node {
            tag: PosTag::X,
            state: HmmState::Start,
            prev_state: HmmState::End,
            score: 0.0,
            back: 0,
        };
        let mut lattice: Vec<Vec<Node>> = Vec::with_capacity(words.len());
        for (i, (word, tags)) in words.iter().zip(candidates).enumerate() {
            let mut distinct: Vec<PosTag> = vec![];
            for &tag in tags.as_ref() {
                if !distinct.contains(&tag) {
                    distinct.push(tag);
                }
            }
            if distinct.is_empty() {
                return Err(AksaraError::invalid_argument(
                    "candidates",
                    format!("no candidate tag at position {i}"),
                ));
            }
            let prev_nodes = lattice.last().map_or(std::slice::from_ref(&root), Vec::as_slice);
            let mut nodes = vec![];
            if let &[tag] = distinct.as_slice() {
                for (j, prev) in prev_nodes.iter().enumerate() {
                    self.relax(
                        &mut nodes,
                        Node {
                            tag,
                            state: HmmState::Tag(tag),
                            prev_state: prev.state,
                            score: prev.score,
                            back: j,
                        },
                    );
                }
            } else {
                for tag in distinct {
                    let state = HmmState::Tag(tag);
                    let emission = self.model.emission_prob(word.as_ref(), tag).ln();
                    for (j, prev) in prev_nodes.iter().enumerate() {
                        let transition = self.model.transition_prob(state, self.context(prev));
                        self.relax(
                            &mut nodes,
                            Node {
                                tag,
                                state,
                                prev_state: prev.state,
                                score: prev.score + transition.ln() + emission,
                                back: j,
                            },
                        );
                    }
                }
            }
            lattice.push(nodes);
        }

        let last_nodes = match lattice.last() {
            Some(nodes) => nodes,
            None => return Ok(vec![]),
        };
        let mut best: Option<(usize, f64)> = None;
        for (j, node) in last_nodes.iter().enumerate() {
            let score = node.score
                + self
                    .model
                    .transition_prob(HmmState::End, self.context(node))
                    .ln();
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
        }
        let (mut idx, best_score) = best.ok_or_else(|| {
            AksaraError::Integrity("the lattice has no final node".to_string())
        })?;

        let mut tags = Vec::with_capacity(lattice.len());
        for nodes in lattice.iter().rev() {
            let node = nodes[idx];
            tags.push(node.tag);
            idx = node.back;
        }
        tags.reverse();
        debug!(best_score, "decoded");
        Ok(tags)
    }

    /// Finds the most probable tag sequence over the whole tagset.
    ///
    /// # Errors
    ///
    /// Never fails for a non-empty tagset; the `Result` mirrors [`Disambiguator::decode()`].
    pub fn decode_unconstrained<W>(&self, words: &[W]) -> Result<Vec<PosTag>>
    where
        W: AsRef<str>,
    {
        let candidates = vec![PosTag::ALL; words.len()];
        self.decode(words, &candidates)
    }

    /// Disambiguates the rows of a sentence.
    ///
    /// Multiword header rows pass through unchanged. Each word row is collapsed to its first
    /// candidate carrying the decoded tag.
    ///
    /// # Errors
    ///
    /// See [`Disambiguator::decode()`].
    pub fn disambiguate(
        &self,
        rows: Vec<SentenceRow<AmbiguousRow>>,
    ) -> Result<Vec<SentenceRow<DisambiguatedRow>>> {
        let mut words = vec![];
        let mut candidates = vec![];
        for row in &rows {
            if let SentenceRow::Word(row) = row {
                words.push(row.surface());
                candidates.push(row.tags());
            }
        }
        let decoded = self.decode(&words, &candidates)?;

        let mut decoded = decoded.into_iter();
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let row = match row {
                SentenceRow::Multiword(header) => SentenceRow::Multiword(header),
                SentenceRow::Word(row) => {
                    let tag = decoded.next().ok_or_else(|| {
                        AksaraError::Integrity("decoded sequence is too short".to_string())
                    })?;
                    SentenceRow::Word(collapse(row, tag)?)
                }
            };
            result.push(row);
        }
        Ok(result)
    }
}

fn collapse(row: AmbiguousRow, tag: PosTag) -> Result<DisambiguatedRow> {
    let AmbiguousRow {
        id,
        surface,
        candidates,
        space_after,
    } = row;
    let analysis = candidates
        .into_iter()
        .find(|c| c.tag == tag)
        .ok_or_else(|| {
            AksaraError::Integrity(format!("decoded tag {tag} is not a candidate of {surface}"))
        })?;
    Ok(DisambiguatedRow {
        id,
        surface,
        analysis,
        space_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::CandidateAnalysis;
    use crate::row::MultiwordRow;
    use crate::trainer::Trainer;

    use crate::analysis::PosTag::*;

    const CORPUS: &str = "\
Mereka/PRON membaca/VERB banyak/DET sekali/ADV buku/NOUN ./PUNCT
Dia/PRON menulis/VERB banyak/DET surat/NOUN ./PUNCT
Mereka/PRON makan/VERB nasi/NOUN ./PUNCT
Rumah/NOUN itu/DET besar/ADJ sekali/ADV ./PUNCT
Kami/PRON membaca/VERB buku/NOUN itu/DET ./PUNCT
";

    fn model(mode: DecodingMode) -> HmmModel {
        let mut trainer = Trainer::new();
        trainer.add_corpus(CORPUS.as_bytes()).unwrap();
        trainer.train(mode).unwrap()
    }

    fn sample() -> (Vec<&'static str>, Vec<Vec<PosTag>>) {
        (
            vec!["Mereka", "membaca", "banyak", "sekali", "buku", "."],
            vec![
                vec![Verb, Pron],
                vec![Verb],
                vec![Det, Adj],
                vec![Det, Adv],
                vec![Noun],
                vec![Punct],
            ],
        )
    }

    #[test]
    fn test_decode_trigram_sample() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let (words, candidates) = sample();

        assert_eq!(
            vec![Pron, Verb, Det, Adv, Noun, Punct],
            disambiguator.decode(&words, &candidates).unwrap()
        );
    }

    #[test]
    fn test_decode_bigram_sample() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Bigram));
        let (words, candidates) = sample();

        assert_eq!(
            vec![Pron, Verb, Det, Adv, Noun, Punct],
            disambiguator.decode(&words, &candidates).unwrap()
        );
    }

    #[test]
    fn test_decode_unseen_sentence() {
        // None of the ambiguous words occurs in the corpus, so only transitions decide.
        let words = ["Kalian", "meminjam", "beberapa", "novel", "."];
        let candidates = vec![
            vec![Noun, Pron],
            vec![Verb],
            vec![Adj, Det],
            vec![Verb, Noun],
            vec![Punct],
        ];
        let reversed: Vec<Vec<PosTag>> = candidates
            .iter()
            .map(|c| c.iter().rev().copied().collect())
            .collect();

        for mode in [DecodingMode::Trigram, DecodingMode::Bigram] {
            let disambiguator = Disambiguator::new(model(mode));
            assert_eq!(
                vec![Pron, Verb, Det, Noun, Punct],
                disambiguator.decode(&words, &candidates).unwrap()
            );
            assert_eq!(
                vec![Pron, Verb, Det, Noun, Punct],
                disambiguator.decode(&words, &reversed).unwrap()
            );
        }
    }

    #[test]
    fn test_decode_deterministic() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let (words, candidates) = sample();
        let first = disambiguator.decode(&words, &candidates).unwrap();

        for _ in 0..10 {
            assert_eq!(first, disambiguator.decode(&words, &candidates).unwrap());
        }
    }

    #[test]
    fn test_decode_stays_in_candidates() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let words = ["buku", "buku", "xyz", "."];
        let candidates = [vec![Verb, Adj], vec![Sym], vec![Intj, Part], vec![Num]];
        let tags = disambiguator.decode(&words, &candidates).unwrap();

        for (tag, cands) in tags.iter().zip(&candidates) {
            assert!(cands.contains(tag));
        }
    }

    #[test]
    fn test_decode_single_candidate_kept() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Bigram));
        // Unlikely according to the model, but the only choice.
        let tags = disambiguator
            .decode(&["Mereka"], &[vec![Intj]])
            .unwrap();

        assert_eq!(vec![Intj], tags);
    }

    #[test]
    fn test_decode_tie_first_candidate() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        // Neither tag nor word is ever seen, so both paths score the same.
        let tags = disambiguator
            .decode(&["zzz"], &[vec![Intj, Sym]])
            .unwrap();
        assert_eq!(vec![Intj], tags);

        let tags = disambiguator
            .decode(&["zzz"], &[vec![Sym, Intj]])
            .unwrap();
        assert_eq!(vec![Sym], tags);
    }

    #[test]
    fn test_decode_empty() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let words: [&str; 0] = [];
        let candidates: [Vec<PosTag>; 0] = [];

        assert!(disambiguator.decode(&words, &candidates).unwrap().is_empty());
    }

    #[test]
    fn test_decode_invalid_arguments() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));

        let r = disambiguator.decode(&["a", "b"], &[vec![Noun]]);
        assert_eq!(
            "InvalidArgumentError: candidates: length mismatch: 2 words, 1 candidate sets",
            &r.err().unwrap().to_string()
        );

        let r = disambiguator.decode(&["a"], &[Vec::<PosTag>::new()]);
        assert_eq!(
            "InvalidArgumentError: candidates: no candidate tag at position 0",
            &r.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_decode_unconstrained() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let tags = disambiguator
            .decode_unconstrained(&["Mereka", "membaca", "buku", "."])
            .unwrap();

        assert_eq!(vec![Pron, Verb, Noun, Punct], tags);
    }

    #[test]
    fn test_disambiguate_rows() {
        let disambiguator = Disambiguator::new(model(DecodingMode::Trigram));
        let rows = vec![
            SentenceRow::Word(
                AmbiguousRow::new(
                    1,
                    "Mereka",
                    vec![
                        CandidateAnalysis::new("reka", Verb, vec![]),
                        CandidateAnalysis::new("mereka", Pron, vec![]),
                    ],
                    true,
                )
                .unwrap(),
            ),
            SentenceRow::Multiword(MultiwordRow {
                start: 2,
                end: 3,
                surface: "bacanya".to_string(),
            }),
            SentenceRow::Word(
                AmbiguousRow::new(
                    2,
                    "baca",
                    vec![CandidateAnalysis::new("baca", Verb, vec![])],
                    true,
                )
                .unwrap(),
            ),
            SentenceRow::Word(
                AmbiguousRow::new(
                    3,
                    "nya",
                    vec![
                        CandidateAnalysis::new("nya", Pron, vec![]),
                        CandidateAnalysis::new("nya", Det, vec![]),
                    ],
                    false,
                )
                .unwrap(),
            ),
        ];
        let rows = disambiguator.disambiguate(rows).unwrap();

        assert_eq!(4, rows.len());
        match &rows[0] {
            SentenceRow::Word(row) => {
                assert_eq!("mereka", row.analysis().lemma());
                assert_eq!(Pron, row.analysis().tag());
            }
            SentenceRow::Multiword(_) => unreachable!(),
        }
        assert!(matches!(rows[1], SentenceRow::Multiword(_)));
        match &rows[3] {
            SentenceRow::Word(row) => {
                assert_eq!(3, row.id());
                assert!(!row.space_after());
                assert!([Pron, Det].contains(&row.analysis().tag()));
            }
            SentenceRow::Multiword(_) => unreachable!(),
        }
    }
}
