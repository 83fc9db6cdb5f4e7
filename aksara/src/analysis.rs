use std::fmt;
use std::str::FromStr;

use crate::errors::{AksaraError, Result};

/// Universal part-of-speech tag.
///
/// The discriminants are dense indices used by the transition tables of [`HmmModel`], so the
/// order of the variants must not change.
///
/// [`HmmModel`]: crate::HmmModel
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PosTag {
    Noun = 0,
    Pron = 1,
    Verb = 2,
    Num = 3,
    Adj = 4,
    Adp = 5,
    Cconj = 6,
    Sconj = 7,
    X = 8,
    Aux = 9,
    Det = 10,
    Adv = 11,
    Part = 12,
    Intj = 13,
    Punct = 14,
    Sym = 15,
    Propn = 16,
}

impl PosTag {
    /// Number of tags in the tagset.
    pub const N_TAGS: usize = 17;

    /// All tags in index order.
    pub const ALL: [Self; Self::N_TAGS] = [
        Self::Noun,
        Self::Pron,
        Self::Verb,
        Self::Num,
        Self::Adj,
        Self::Adp,
        Self::Cconj,
        Self::Sconj,
        Self::X,
        Self::Aux,
        Self::Det,
        Self::Adv,
        Self::Part,
        Self::Intj,
        Self::Punct,
        Self::Sym,
        Self::Propn,
    ];

    /// Returns the tag name used in analyzer output and corpora.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::PosTag;
    ///
    /// assert_eq!("PROPN", PosTag::Propn.as_str());
    /// ```
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noun => "NOUN",
            Self::Pron => "PRON",
            Self::Verb => "VERB",
            Self::Num => "NUM",
            Self::Adj => "ADJ",
            Self::Adp => "ADP",
            Self::Cconj => "CCONJ",
            Self::Sconj => "SCONJ",
            Self::X => "X",
            Self::Aux => "AUX",
            Self::Det => "DET",
            Self::Adv => "ADV",
            Self::Part => "PART",
            Self::Intj => "INTJ",
            Self::Punct => "PUNCT",
            Self::Sym => "SYM",
            Self::Propn => "PROPN",
        }
    }

    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosTag {
    type Err = AksaraError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| AksaraError::invalid_argument("tag", format!("unknown tag: {tag}")))
    }
}

/// A morphological attribute such as `Number=Sing`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Feature {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl Feature {
    /// Creates a new feature.
    pub fn new<S, T>(name: S, value: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Gets the feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the feature value. Empty if the analyzer emitted a bare name.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.value)
        }
    }
}

/// One possible morphological decomposition of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateAnalysis {
    pub(crate) lemma: String,
    pub(crate) tag: PosTag,
    pub(crate) features: Vec<Feature>,
}

impl CandidateAnalysis {
    /// Creates a new candidate.
    pub fn new<S>(lemma: S, tag: PosTag, features: Vec<Feature>) -> Self
    where
        S: Into<String>,
    {
        Self {
            lemma: lemma.into(),
            tag,
            features,
        }
    }

    /// Parses one clitic-free segment of an analyzer output.
    ///
    /// The segment has the form `lemma+TAG[+Name=Value]*`. Leading and trailing `+`, left over
    /// from the `+_` and `_+` clitic markers, are ignored.
    ///
    /// # Errors
    ///
    /// An error is returned if the segment has no tag or the tag is not in the tagset.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::{CandidateAnalysis, PosTag};
    ///
    /// let c = CandidateAnalysis::parse("buku+NOUN+Number=Sing").unwrap();
    /// assert_eq!("buku", c.lemma());
    /// assert_eq!(PosTag::Noun, c.tag());
    /// assert_eq!("Number=Sing", c.features()[0].to_string());
    /// ```
    pub fn parse(segment: &str) -> Result<Self> {
        let segment = segment.trim_matches('+');
        let mut parts = segment.split('+');
        let lemma = parts.next().unwrap_or_default();
        let tag = parts.next().ok_or_else(|| {
            AksaraError::invalid_argument("segment", format!("no tag in analysis: {segment}"))
        })?;
        let tag = PosTag::from_str(tag)?;
        let features = parts
            .filter(|f| !f.is_empty())
            .map(|f| match f.split_once('=') {
                Some((name, value)) => Feature::new(name, value),
                None => Feature::new(f, ""),
            })
            .collect();
        Ok(Self {
            lemma: lemma.to_string(),
            tag,
            features,
        })
    }

    /// Gets the lemma.
    pub fn lemma(&self) -> &str {
        &self.lemma
    }

    /// Gets the part-of-speech tag.
    pub const fn tag(&self) -> PosTag {
        self.tag
    }

    /// Gets the features in analyzer order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_names() {
        for (i, tag) in PosTag::ALL.iter().enumerate() {
            assert_eq!(i, tag.index());
            assert_eq!(*tag, tag.as_str().parse::<PosTag>().unwrap());
        }
    }

    #[test]
    fn test_tag_unknown() {
        let t = "FOO".parse::<PosTag>();

        assert_eq!(
            "InvalidArgumentError: tag: unknown tag: FOO",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_parse_candidate_with_features() {
        let c = CandidateAnalysis::parse("keluar+NOUN+Number=Sing+Pref=peN+Suff=an").unwrap();

        assert_eq!(
            CandidateAnalysis::new(
                "keluar",
                PosTag::Noun,
                vec![
                    Feature::new("Number", "Sing"),
                    Feature::new("Pref", "peN"),
                    Feature::new("Suff", "an"),
                ],
            ),
            c
        );
    }

    #[test]
    fn test_parse_candidate_clitic_marker() {
        let c = CandidateAnalysis::parse("+nya+PRON+PronType=Prs").unwrap();

        assert_eq!("nya", c.lemma());
        assert_eq!(PosTag::Pron, c.tag());
        assert_eq!(vec![Feature::new("PronType", "Prs")], c.features());
    }

    #[test]
    fn test_parse_candidate_bare_feature() {
        let c = CandidateAnalysis::parse("ok+X+Foreign").unwrap();

        assert_eq!("Foreign", c.features()[0].to_string());
    }

    #[test]
    fn test_parse_candidate_missing_tag() {
        let c = CandidateAnalysis::parse("buku");

        assert_eq!(
            "InvalidArgumentError: segment: no tag in analysis: buku",
            &c.err().unwrap().to_string()
        );
    }
}
