use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::analysis::PosTag;
use crate::errors::{AksaraError, Result};
use crate::utils::SerializableHashMap;

const MODEL_MAGIC: &[u8] = b"AksaraHMM 0.1\n";

pub(crate) const N_STATES: usize = PosTag::N_TAGS + 2;

/// Tag context used by the transition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodingMode {
    /// `P(tag | previous tag)`
    Bigram,

    /// `P(tag | previous two tags)`
    #[default]
    Trigram,
}

impl DecodingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bigram => "bigram",
            Self::Trigram => "trigram",
        }
    }
}

impl fmt::Display for DecodingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodingMode {
    type Err = &'static str;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "bigram" => Ok(Self::Bigram),
            "trigram" => Ok(Self::Trigram),
            _ => Err("Could not parse a mode value"),
        }
    }
}

/// A state of the tag sequence: a tag or one of the sentence boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HmmState {
    Tag(PosTag),
    Start,
    End,
}

impl HmmState {
    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Tag(tag) => tag.index(),
            Self::Start => PosTag::N_TAGS,
            Self::End => PosTag::N_TAGS + 1,
        }
    }
}

impl From<PosTag> for HmmState {
    fn from(tag: PosTag) -> Self {
        Self::Tag(tag)
    }
}

/// Conditioning context of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionContext {
    Bigram(HmmState),
    Trigram(HmmState, HmmState),
}

/// Hidden Markov model of tag sequences.
///
/// Both bigram and trigram transition counts are kept, so one model serves either
/// [`DecodingMode`]. The model is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmModel {
    pub(crate) mode: DecodingMode,
    pub(crate) n_tokens: u64,

    // Indexed by tag.
    pub(crate) emissions: Vec<SerializableHashMap<String, u32>>,
    pub(crate) tag_totals: Vec<u64>,

    // bigram[prev * N_STATES + next]
    pub(crate) bigram: Vec<u32>,
    pub(crate) bigram_totals: Vec<u64>,

    // trigram[(prev2 * N_STATES + prev1) * N_STATES + next]
    pub(crate) trigram: Vec<u32>,
    pub(crate) trigram_totals: Vec<u64>,
}

impl HmmModel {
    pub(crate) fn from_counts(
        mode: DecodingMode,
        n_tokens: u64,
        emissions: Vec<SerializableHashMap<String, u32>>,
        bigram: Vec<u32>,
        trigram: Vec<u32>,
    ) -> Result<Self> {
        if n_tokens == 0 {
            return Err(AksaraError::invalid_model("the model has no token"));
        }
        if emissions.len() != PosTag::N_TAGS
            || bigram.len() != N_STATES * N_STATES
            || trigram.len() != N_STATES * N_STATES * N_STATES
        {
            return Err(AksaraError::invalid_model("table sizes mismatch"));
        }
        let tag_totals = emissions
            .iter()
            .map(|e| e.values().map(|&c| u64::from(c)).sum())
            .collect();
        let bigram_totals = bigram
            .chunks(N_STATES)
            .map(|row| row.iter().map(|&c| u64::from(c)).sum())
            .collect();
        let trigram_totals = trigram
            .chunks(N_STATES)
            .map(|row| row.iter().map(|&c| u64::from(c)).sum())
            .collect();
        Ok(Self {
            mode,
            n_tokens,
            emissions,
            tag_totals,
            bigram,
            bigram_totals,
            trigram,
            trigram_totals,
        })
    }

    /// Gets the decoding mode the model was trained for.
    pub const fn mode(&self) -> DecodingMode {
        self.mode
    }

    /// Gets the number of tokens in the training corpus.
    pub const fn n_tokens(&self) -> u64 {
        self.n_tokens
    }

    /// Returns the add-one smoothed emission probability `P(word | tag)`.
    ///
    /// The result is strictly positive for any word, including unseen ones.
    pub fn emission_prob(&self, word: &str, tag: PosTag) -> f64 {
        let count = self.emissions[tag.index()].get(word).copied().unwrap_or(0);
        (f64::from(count) + 1.0) / (self.tag_totals[tag.index()] + self.n_tokens) as f64
    }

    /// Returns the add-one smoothed transition probability `P(next | context)`.
    ///
    /// The denominator adds the tagset size, so the result is strictly positive.
    pub fn transition_prob(&self, next: HmmState, context: TransitionContext) -> f64 {
        let (count, total) = match context {
            TransitionContext::Bigram(prev) => {
                let ctx = prev.index();
                (
                    self.bigram[ctx * N_STATES + next.index()],
                    self.bigram_totals[ctx],
                )
            }
            TransitionContext::Trigram(prev2, prev1) => {
                let ctx = prev2.index() * N_STATES + prev1.index();
                (
                    self.trigram[ctx * N_STATES + next.index()],
                    self.trigram_totals[ctx],
                )
            }
        };
        (f64::from(count) + 1.0) / (total + PosTag::N_TAGS as u64) as f64
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. If the data is not a model,
    /// [`AksaraError::InvalidModel`] is returned.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; MODEL_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(AksaraError::invalid_model("unknown model format"));
        }
        Ok(bincode::decode_from_std_read(
            rdr,
            bincode::config::standard(),
        )?)
    }
}

impl Encode for HmmModel {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let mode: u8 = match self.mode {
            DecodingMode::Bigram => 2,
            DecodingMode::Trigram => 3,
        };
        Encode::encode(&mode, encoder)?;
        Encode::encode(&self.n_tokens, encoder)?;
        Encode::encode(&self.emissions, encoder)?;
        Encode::encode(&self.bigram, encoder)?;
        Encode::encode(&self.trigram, encoder)?;
        Ok(())
    }
}

impl Decode for HmmModel {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let mode: u8 = Decode::decode(decoder)?;
        let mode = match mode {
            2 => DecodingMode::Bigram,
            3 => DecodingMode::Trigram,
            _ => return Err(DecodeError::OtherString(format!("invalid mode: {mode}"))),
        };
        let n_tokens = Decode::decode(decoder)?;
        let emissions = Decode::decode(decoder)?;
        let bigram = Decode::decode(decoder)?;
        let trigram = Decode::decode(decoder)?;
        Self::from_counts(mode, n_tokens, emissions, bigram, trigram)
            .map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}
