use std::fmt;

use tracing::{debug_span, warn};

use crate::analysis::{CandidateAnalysis, PosTag};
use crate::errors::{AksaraError, Result};
use crate::tokenizer::Token;

/// Tags whose presence in the first segment means the clitic is attached in front.
const UNSUFFIXED_TAGS: [PosTag; 2] = [PosTag::Pron, PosTag::Det];

/// Row identifier: a 1-based word index or a `start-end` range of a multiword token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowId {
    Single(usize),
    Range(usize, usize),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Single(id) => write!(f, "{id}"),
            Self::Range(start, end) => write!(f, "{start}-{end}"),
        }
    }
}

/// All candidate analyses of one (sub-)token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousRow {
    pub(crate) id: usize,
    pub(crate) surface: String,
    pub(crate) candidates: Vec<CandidateAnalysis>,
    pub(crate) space_after: bool,
}

impl AmbiguousRow {
    /// Creates a new row.
    ///
    /// # Errors
    ///
    /// If `candidates` is empty, an integrity error is returned.
    pub fn new<S>(
        id: usize,
        surface: S,
        candidates: Vec<CandidateAnalysis>,
        space_after: bool,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let surface = surface.into();
        if candidates.is_empty() {
            return Err(AksaraError::Integrity(format!(
                "no candidate for token {id} ({surface})"
            )));
        }
        Ok(Self {
            id,
            surface,
            candidates,
            space_after,
        })
    }

    pub const fn id(&self) -> usize {
        self.id
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Gets the candidates. Never empty.
    pub fn candidates(&self) -> &[CandidateAnalysis] {
        &self.candidates
    }

    pub const fn space_after(&self) -> bool {
        self.space_after
    }

    /// Returns the distinct candidate tags in candidate order.
    pub fn tags(&self) -> Vec<PosTag> {
        let mut tags = Vec::with_capacity(self.candidates.len());
        for cand in &self.candidates {
            if !tags.contains(&cand.tag) {
                tags.push(cand.tag);
            }
        }
        tags
    }
}

/// Header row spanning the sub-tokens of a split token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiwordRow {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) surface: String,
}

impl MultiwordRow {
    pub const fn id(&self) -> RowId {
        RowId::Range(self.start, self.end)
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }
}

/// A word row with the candidate chosen by disambiguation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisambiguatedRow {
    pub(crate) id: usize,
    pub(crate) surface: String,
    pub(crate) analysis: CandidateAnalysis,
    pub(crate) space_after: bool,
}

impl DisambiguatedRow {
    /// Creates a new row.
    pub fn new<S>(id: usize, surface: S, analysis: CandidateAnalysis, space_after: bool) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            surface: surface.into(),
            analysis,
            space_after,
        }
    }

    pub const fn id(&self) -> usize {
        self.id
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Gets the chosen analysis.
    pub const fn analysis(&self) -> &CandidateAnalysis {
        &self.analysis
    }

    pub const fn space_after(&self) -> bool {
        self.space_after
    }
}

/// A row of a sentence: either a multiword header or a word row of type `W`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentenceRow<W> {
    Multiword(MultiwordRow),
    Word(W),
}

/// Builds [`AmbiguousRow`]s from raw analyses.
#[derive(Debug, Default, Clone, Copy)]
pub struct CandidateRowBuilder;

impl CandidateRowBuilder {
    pub const fn new() -> Self {
        Self
    }

    /// Converts the analysis of one token into rows and appends them to `rows`.
    ///
    /// # Arguments
    ///
    /// * `next_id` - The 1-based index given to the first emitted word row.
    /// * `token` - The token.
    /// * `analysis` - The raw analysis: candidates separated by `\n`, each of which may hold two
    ///   segments separated by `_`.
    /// * `rows` - The destination.
    ///
    /// # Returns
    ///
    /// The index following the last emitted word row.
    ///
    /// # Errors
    ///
    /// An integrity error is returned if no candidate remains, and a parse error if a segment is
    /// malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{CandidateRowBuilder, SentenceRow, Token};
    ///
    /// let builder = CandidateRowBuilder::new();
    /// let mut rows = vec![];
    /// let token = Token::new("airnya", true);
    /// let next = builder
    ///     .build(1, &token, "air+NOUN+Number=Sing_+nya+PRON+PronType=Prs", &mut rows)
    ///     .unwrap();
    ///
    /// assert_eq!(3, next);
    /// assert_eq!(3, rows.len());
    /// if let SentenceRow::Word(row) = &rows[2] {
    ///     assert_eq!("nya", row.surface());
    /// }
    /// ```
    pub fn build(
        &self,
        next_id: usize,
        token: &Token,
        analysis: &str,
        rows: &mut Vec<SentenceRow<AmbiguousRow>>,
    ) -> Result<usize> {
        let _span = debug_span!("build_rows", surface = token.surface()).entered();

        let mut candidates: Vec<Vec<&str>> = vec![];
        for cand in analysis.lines().map(str::trim).filter(|c| !c.is_empty()) {
            let segments: Vec<&str> = cand.split('_').filter(|s| !s.is_empty()).collect();
            if !segments.is_empty() && !candidates.contains(&segments) {
                candidates.push(segments);
            }
        }
        let arity = candidates.iter().map(Vec::len).min().ok_or_else(|| {
            AksaraError::Integrity(format!("no candidate for token {}", token.surface()))
        })?;
        let n_all = candidates.len();
        candidates.retain(|segments| segments.len() == arity);
        if candidates.len() != n_all {
            warn!(
                surface = token.surface(),
                dropped = n_all - candidates.len(),
                "dropped candidates with a longer segmentation"
            );
        }

        // Segment-major: columns[j] holds the j-th segment of every candidate.
        let mut columns: Vec<Vec<CandidateAnalysis>> = vec![vec![]; arity];
        for segments in &candidates {
            for (column, segment) in columns.iter_mut().zip(segments) {
                let cand = CandidateAnalysis::parse(segment)?;
                if !column.contains(&cand) {
                    column.push(cand);
                }
            }
        }

        if arity != 2 {
            let column = columns.into_iter().next().unwrap_or_default();
            rows.push(SentenceRow::Word(AmbiguousRow::new(
                next_id,
                token.surface(),
                column,
                token.space_after(),
            )?));
            return Ok(next_id + 1);
        }

        let (front, back) = split_surface(token.surface(), &columns[0], &columns[1]);
        rows.push(SentenceRow::Multiword(MultiwordRow {
            start: next_id,
            end: next_id + 1,
            surface: token.surface().to_string(),
        }));
        let mut columns = columns.into_iter();
        let first = columns.next().unwrap_or_default();
        let second = columns.next().unwrap_or_default();
        rows.push(SentenceRow::Word(AmbiguousRow::new(
            next_id, front, first, true,
        )?));
        rows.push(SentenceRow::Word(AmbiguousRow::new(
            next_id + 1,
            back,
            second,
            token.space_after(),
        )?));
        Ok(next_id + 2)
    }

    /// Appends the row of a token that has a single guessed analysis.
    ///
    /// The analysis is taken as is, so the surface may hold `_` or `+`.
    ///
    /// # Returns
    ///
    /// The index following the emitted word row.
    pub fn build_guess(
        &self,
        next_id: usize,
        token: &Token,
        analysis: CandidateAnalysis,
        rows: &mut Vec<SentenceRow<AmbiguousRow>>,
    ) -> usize {
        rows.push(SentenceRow::Word(AmbiguousRow {
            id: next_id,
            surface: token.surface().to_string(),
            candidates: vec![analysis],
            space_after: token.space_after(),
        }));
        next_id + 1
    }
}

/// Splits a surface in two. The concatenation of the result always equals `surface`.
fn split_surface<'a>(
    surface: &'a str,
    first: &[CandidateAnalysis],
    second: &[CandidateAnalysis],
) -> (&'a str, &'a str) {
    let n_chars = surface.chars().count();
    let is_in_front = first.iter().any(|c| UNSUFFIXED_TAGS.contains(&c.tag));
    let split_chars = if is_in_front {
        first.first().map_or(0, |c| c.lemma.chars().count())
    } else {
        n_chars.saturating_sub(second.first().map_or(0, |c| c.lemma.chars().count()))
    };
    let split_chars = split_chars.min(n_chars);
    let split_at = surface
        .char_indices()
        .nth(split_chars)
        .map_or(surface.len(), |(i, _)| i);
    surface.split_at(split_at)
}
