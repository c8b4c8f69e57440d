/// Pre-aggregated transition tables and their line-oriented text format.
///
/// One state per line:
///
/// ```text
/// the murder:{'of': 12, 'was': 3}
/// ```
///
/// The part before the first `:` is the state; the rest is a dict literal
/// mapping successor states to non-negative weights (raw counts or
/// probabilities).
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::chain::{MarkovChain, Transitions};
use crate::core::state::State;

#[derive(Debug, Error)]
pub enum TransitionFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode transition file with any of: {}", display_list(.tried))]
    EncodingFailure { tried: Vec<TextEncoding> },
}

fn display_list(encodings: &[TextEncoding]) -> String {
    encodings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A line of a transition file that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Text encodings attempted when reading a transition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1. Decodes any byte sequence.
    Latin1,
    /// Windows code page 1252. Rejects its five unassigned bytes.
    Windows1252,
}

/// Default fallback order.
pub const DEFAULT_ENCODINGS: [TextEncoding; 3] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
];

/// Code points for bytes 0x80..=0x9F in Windows-1252; `None` is unassigned.
#[rustfmt::skip]
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

impl TextEncoding {
    /// Decode `bytes`, or `None` if they are invalid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[(b - 0x80) as usize],
                    _ => Some(b as char),
                })
                .collect(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "cp1252",
        })
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "cp1252" | "windows-1252" => Ok(TextEncoding::Windows1252),
            other => Err(format!("unsupported encoding: {}", other)),
        }
    }
}

/// State → raw successor weights, as loaded from storage.
///
/// Unlike [`MarkovChain`], weights are not normalized and a state may
/// have no successors at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionTable {
    entries: FxHashMap<State, Vec<(State, f64)>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a chain's probabilities into a table.
    pub fn from_chain(chain: &MarkovChain) -> Self {
        Self {
            entries: chain
                .iter()
                .map(|(state, successors)| (state.clone(), successors.to_vec()))
                .collect(),
        }
    }

    /// Set the successors of `state`, replacing any earlier entry.
    pub fn insert(&mut self, state: State, successors: Vec<(State, f64)>) {
        self.entries.insert(state, successors);
    }

    pub fn get(&self, state: &State) -> Option<&[(State, f64)]> {
        self.entries.get(state).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the table in the line format, states sorted.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for state in self.states() {
            let successors = &self.entries[state];
            write!(writer, "{}:{{", state)?;
            for (i, (next, weight)) in successors.iter().enumerate() {
                if i > 0 {
                    write!(writer, ", ")?;
                }
                write!(writer, "'{}': {:?}", escape(&next.to_string()), weight)?;
            }
            writeln!(writer, "}}")?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}

impl Transitions for TransitionTable {
    fn successors(&self, state: &State) -> Option<&[(State, f64)]> {
        self.get(state)
    }

    fn states(&self) -> Vec<&State> {
        let mut states: Vec<&State> = self.entries.keys().collect();
        states.sort();
        states
    }

    fn state_count(&self) -> usize {
        self.len()
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Result of loading a transition file.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: TransitionTable,
    /// Encoding that decoded the file.
    pub encoding: TextEncoding,
    /// Lines that contained a `:` but whose mapping could not be parsed.
    pub skipped: Vec<ParseFailure>,
}

/// Load a transition file, trying each encoding in order.
///
/// Malformed lines are skipped and recorded in the report. Fails only if
/// the file cannot be read or no encoding decodes it.
pub fn load_table(path: &Path, encodings: &[TextEncoding]) -> Result<LoadReport, TransitionFileError> {
    let bytes = std::fs::read(path)?;

    for &encoding in encodings {
        let text = match encoding.decode(&bytes) {
            Some(text) => text,
            None => {
                warn!(%encoding, path = %path.display(), "failed to decode, trying next encoding");
                continue;
            }
        };

        let (table, skipped) = parse_table(&text);
        for failure in &skipped {
            warn!(path = %path.display(), "skipping malformed {}", failure);
        }
        info!(
            %encoding,
            path = %path.display(),
            states = table.len(),
            skipped = skipped.len(),
            "loaded transitions"
        );
        return Ok(LoadReport {
            table,
            encoding,
            skipped,
        });
    }

    Err(TransitionFileError::EncodingFailure {
        tried: encodings.to_vec(),
    })
}

/// Parse decoded file contents. Lines without a `:` are ignored.
pub fn parse_table(text: &str) -> (TransitionTable, Vec<ParseFailure>) {
    let mut table = TransitionTable::new();
    let mut skipped = Vec::new();

    for (index, line) in text.lines().enumerate() {
        match parse_line(line) {
            None => {}
            Some(Ok((state, successors))) => table.insert(state, successors),
            Some(Err(reason)) => skipped.push(ParseFailure {
                line: index + 1,
                reason,
            }),
        }
    }

    debug!(states = table.len(), skipped = skipped.len(), "parsed transition text");
    (table, skipped)
}

/// Parse one line. `None` if the line has no `:` separator.
pub fn parse_line(line: &str) -> Option<Result<(State, Vec<(State, f64)>), String>> {
    let (state, mapping) = line.trim().split_once(':')?;
    Some(DictParser::new(mapping.trim()).parse().map(|successors| {
        let successors = successors
            .into_iter()
            .map(|(next, weight)| (State::parse(&next), weight))
            .collect();
        (State::parse(state), successors)
    }))
}

/// Parser for the dict literals used in transition files: string keys in
/// single or double quotes, numeric values.
struct DictParser {
    chars: Vec<char>,
    pos: usize,
}

impl DictParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<(String, f64)>, String> {
        let mut entries: Vec<(String, f64)> = Vec::new();

        self.skip_ws();
        self.expect('{')?;
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            let key = self.string()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.number()?;
            // a repeated key keeps its first position and its last value
            if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
                entry.1 = value;
            } else {
                entries.push((key, value));
            }
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect('}')?;
            break;
        }
        self.skip_ws();
        if self.pos < self.chars.len() {
            return Err(format!("trailing input at column {}", self.pos + 1));
        }
        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if !total.is_finite() {
            return Err("weights sum to a non-finite value".to_string());
        }

        Ok(entries)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(format!(
                    "expected '{}' at column {}, found '{}'",
                    c,
                    self.pos + 1,
                    found
                )),
                None => Err(format!("expected '{}', found end of line", c)),
            }
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(format!("expected string key at column {}", self.pos + 1)),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                        Some(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                        None => return Err("unterminated string".to_string()),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        if literal.is_empty() {
            return Err(format!("expected number at column {}", start + 1));
        }
        let value: f64 = literal
            .parse()
            .map_err(|_| format!("invalid number '{}'", literal))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("weight must be a non-negative number, got {}", literal));
        }
        Ok(value)
    }
}
