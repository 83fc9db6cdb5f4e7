//! Definition of errors.

pub type Result<T, E = AksaraError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AksaraError {
    /// The model file is broken or was written by an incompatible version.
    #[error("InvalidModelError: {0}")]
    InvalidModel(String),

    #[error("InvalidArgumentError: {arg}: {msg}")]
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,

        /// Error message.
        msg: String,
    },

    /// A line of a training or evaluation corpus could not be parsed.
    #[error("InvalidCorpusError: line {line}: {msg}")]
    InvalidCorpus { line: usize, msg: String },

    /// A row ended up without any candidate analysis.
    #[error("IntegrityError: {0}")]
    Integrity(String),

    /// The external morphological analyzer failed.
    #[error("AnalyzerError: {0}")]
    Analyzer(String),

    /// The external dependency parser failed.
    #[error("ParserError: {0}")]
    Parser(String),

    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    RegexError(#[from] fancy_regex::Error),

    #[error(transparent)]
    DecodeError(#[from] bincode::error::DecodeError),

    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl AksaraError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(msg.into())
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    pub(crate) fn invalid_corpus<S>(line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidCorpus {
            line,
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            "InvalidModelError: bad magic",
            AksaraError::invalid_model("bad magic").to_string(),
        );
        assert_eq!(
            "InvalidArgumentError: words: is empty",
            AksaraError::invalid_argument("words", "is empty").to_string(),
        );
        assert_eq!(
            "InvalidCorpusError: line 3: missing tag",
            AksaraError::invalid_corpus(3, "missing tag").to_string(),
        );
    }
}
