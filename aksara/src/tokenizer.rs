use fancy_regex::Regex;

use crate::errors::Result;

const TOKEN_PATTERN: &str = concat!(
    r"[0-9]+-an",
    r"|[+-]?[0-9]*[,.]?[0-9]+",
    r"|[A-Z][a-z]\.",
    r"|(?:[A-Z]+\.)(?:[A-Za-z]+\.)+",
    r"|[\w.-]+@(?:[\w-]+\.)+[\w-]{2,4}",
    r"|([^\w\s+])\1+",
    r"|@[\w.]+",
    r"|:\S(?=\s|$)",
    r"|:-\S(?=\s|$)",
    r"|\w+(?=n't)",
    r"|n't",
    r"|\w+(?='[ms]\s)",
    r"|'[ms](?=\s)",
    r"|[^\w\s+]",
    r"|[\w-]*",
);

const SENTENCE_END_PATTERN: &str = r"[.!?]+\s";

/// A surface token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub(crate) surface: String,
    pub(crate) space_after: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new<S>(surface: S, space_after: bool) -> Self
    where
        S: Into<String>,
    {
        Self {
            surface: surface.into(),
            space_after,
        }
    }

    /// Gets the surface string.
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Returns `false` if the next token follows this one without whitespace.
    pub const fn space_after(&self) -> bool {
        self.space_after
    }
}

/// Rule-based tokenizer for Indonesian text.
pub struct Tokenizer {
    token_re: Regex,
    sentence_end_re: Regex,
}

impl Tokenizer {
    /// Creates a new tokenizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in patterns cannot be compiled.
    pub fn new() -> Result<Self> {
        Ok(Self {
            token_re: Regex::new(TOKEN_PATTERN)?,
            sentence_end_re: Regex::new(SENTENCE_END_PATTERN)?,
        })
    }

    /// Splits a sentence into tokens.
    ///
    /// Whitespace runs are collapsed before matching. The last token always has
    /// `space_after = true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new().unwrap();
    /// let tokens = tokenizer.tokenize("Saya makan.").unwrap();
    ///
    /// let surfaces: Vec<_> = tokens.iter().map(|t| t.surface()).collect();
    /// assert_eq!(vec!["Saya", "makan", "."], surfaces);
    /// assert!(!tokens[1].space_after());
    /// ```
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut spans: Vec<(usize, usize)> = vec![];
        for m in self.token_re.find_iter(&normalized) {
            let m = m?;
            if m.start() != m.end() {
                spans.push((m.start(), m.end()));
            }
        }
        let mut tokens = Vec::with_capacity(spans.len());
        for (i, &(start, end)) in spans.iter().enumerate() {
            let space_after = spans.get(i + 1).map_or(true, |&(next, _)| next != end);
            tokens.push(Token::new(&normalized[start..end], space_after));
        }
        Ok(tokens)
    }

    /// Splits a text into sentences after each run of `.`, `!` or `?` followed by whitespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use aksara::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new().unwrap();
    /// let sentences = tokenizer.split_sentences("Apa kabar? Baik sekali.").unwrap();
    ///
    /// assert_eq!(vec!["Apa kabar?", "Baik sekali."], sentences);
    /// ```
    pub fn split_sentences(&self, text: &str) -> Result<Vec<String>> {
        let mut sentences = vec![];
        let mut last = 0;
        for m in self.sentence_end_re.find_iter(text) {
            let m = m?;
            push_trimmed(&mut sentences, &text[last..m.end()]);
            last = m.end();
        }
        push_trimmed(&mut sentences, &text[last..]);
        Ok(sentences)
    }
}

fn push_trimmed(sentences: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        sentences.push(s.to_string());
    }
}
