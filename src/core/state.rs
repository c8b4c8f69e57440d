/// Chain states, the fixed-length token windows used as model keys.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An ordered tuple of tokens identifying one node of a Markov chain.
///
/// Equality and hashing follow the token tuple. The space-joined string
/// form is only produced at storage and display boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct State {
    tokens: Vec<String>,
}

impl State {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a space-separated state string. Runs of whitespace and
    /// leading/trailing separators are ignored.
    pub fn parse(text: &str) -> Self {
        Self::new(text.split_whitespace())
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of tokens in this state.
    pub fn order(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl From<&str> for State {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(State::parse(&text))
    }
}
