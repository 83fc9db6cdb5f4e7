use std::fmt;

use crate::analysis::{CandidateAnalysis, Feature, PosTag};
use crate::row::{DisambiguatedRow, MultiwordRow, RowId, SentenceRow};

const PREPREF: &str = "Prepref";
const PREF: &str = "Pref";
const STEM: &str = "Stem";
const SUFF: &str = "Suff";

fn is_morf_feature(feature: &Feature) -> bool {
    matches!(feature.name(), PREPREF | PREF | STEM | SUFF)
}

/// A finished 10-column output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConlluRow {
    id: RowId,
    form: String,
    lemma: Option<String>,
    upos: Option<PosTag>,
    feats: Option<String>,
    head: Option<usize>,
    deprel: Option<String>,
    misc: Option<String>,
}

impl ConlluRow {
    /// Creates a word row from a disambiguated row.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{CandidateAnalysis, ConlluRow, DisambiguatedRow};
    ///
    /// let analysis = CandidateAnalysis::parse("lapang+NOUN+Number=Sing+Stem=ADJ+Suff=an").unwrap();
    /// let row = DisambiguatedRow::new(5, "lapangan", analysis, false);
    /// let row = ConlluRow::from_word(&row);
    ///
    /// assert_eq!(
    ///     "5\tlapangan\tlapang\tNOUN\t_\tNumber=Sing\t_\t_\t_\tMorf=lapang<ADJ>+an_NOUN|SpaceAfter=No",
    ///     row.to_string(),
    /// );
    /// ```
    pub fn from_word(row: &DisambiguatedRow) -> Self {
        let analysis = row.analysis();
        Self {
            id: RowId::Single(row.id()),
            form: row.surface().to_string(),
            lemma: Some(analysis.lemma().to_string()),
            upos: Some(analysis.tag()),
            feats: Some(feats_string(analysis)),
            head: None,
            deprel: None,
            misc: Some(morf_string(analysis, row.space_after())),
        }
    }

    /// Creates a range row. Every column except the id and the form is `_`.
    pub fn from_multiword(row: &MultiwordRow) -> Self {
        Self {
            id: row.id(),
            form: row.surface().to_string(),
            lemma: None,
            upos: None,
            feats: None,
            head: None,
            deprel: None,
            misc: None,
        }
    }

    pub(crate) fn set_dependency(&mut self, head: usize, deprel: String) {
        self.head = Some(head);
        self.deprel = Some(deprel);
    }

    pub const fn id(&self) -> RowId {
        self.id
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn lemma(&self) -> Option<&str> {
        self.lemma.as_deref()
    }

    pub const fn upos(&self) -> Option<PosTag> {
        self.upos
    }

    /// Gets the sorted morphological features, `_` if there are none.
    pub fn feats(&self) -> Option<&str> {
        self.feats.as_deref()
    }

    pub const fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn deprel(&self) -> Option<&str> {
        self.deprel.as_deref()
    }

    /// Gets the `Morf=` annotation.
    pub fn misc(&self) -> Option<&str> {
        self.misc.as_deref()
    }
}

impl fmt::Display for ConlluRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t_\t{}\t",
            self.id,
            self.form,
            self.lemma.as_deref().unwrap_or("_"),
            self.upos.map_or("_", PosTag::as_str),
            self.feats.as_deref().unwrap_or("_"),
        )?;
        match self.head {
            Some(head) => write!(f, "{head}\t")?,
            None => f.write_str("_\t")?,
        }
        write!(
            f,
            "{}\t_\t{}",
            self.deprel.as_deref().unwrap_or("_"),
            self.misc.as_deref().unwrap_or("_"),
        )
    }
}

fn sorted_features(analysis: &CandidateAnalysis) -> Vec<&Feature> {
    let mut features: Vec<&Feature> = analysis.features().iter().collect();
    features.sort_unstable();
    features
}

fn feats_string(analysis: &CandidateAnalysis) -> String {
    let feats: Vec<String> = sorted_features(analysis)
        .into_iter()
        .filter(|f| !is_morf_feature(f))
        .map(ToString::to_string)
        .collect();
    if feats.is_empty() {
        "_".to_string()
    } else {
        feats.join("|")
    }
}

fn morf_string(analysis: &CandidateAnalysis, space_after: bool) -> String {
    let features = sorted_features(analysis);
    let values = |name: &str| -> String {
        features
            .iter()
            .filter(|f| f.name() == name)
            .map(|f| f.value())
            .collect()
    };
    let prepref = values(PREPREF);
    let pref = values(PREF);
    let stem = values(STEM);
    let suff = values(SUFF);

    let mut morf = "Morf=".to_string();
    if !prepref.is_empty() {
        morf.push_str(&prepref);
        morf.push('+');
    }
    if !pref.is_empty() {
        morf.push_str(&pref);
        morf.push('+');
    }
    morf.push_str(analysis.lemma());
    morf.push('<');
    morf.push_str(if stem.is_empty() { "X" } else { stem.as_str() });
    morf.push('>');
    if !suff.is_empty() {
        morf.push('+');
        morf.push_str(&suff);
    }
    morf.push('_');
    morf.push_str(analysis.tag().as_str());
    if !space_after {
        morf.push_str("|SpaceAfter=No");
    }
    morf
}

/// Converts the rows of a disambiguated sentence into output rows, in order.
pub fn finalize(rows: &[SentenceRow<DisambiguatedRow>]) -> Vec<ConlluRow> {
    rows.iter()
        .map(|row| match row {
            SentenceRow::Multiword(row) => ConlluRow::from_multiword(row),
            SentenceRow::Word(row) => ConlluRow::from_word(row),
        })
        .collect()
}
