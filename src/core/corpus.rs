/// Corpus preparation for the tools: line reading and word cleaning.
///
/// The chain itself only ever sees the token sequence produced here.
use std::path::Path;

/// Characters removed from a line before it is split into words.
const STRIPPED: &[char] = &[
    ',', '.', '"', '\'', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '{', '}', '?', '/',
    ';', '`', '~', ':', '<', '>', '+', '=', '\\', '[',
];

/// Read a text file and return its trimmed, non-empty lines.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Lowercase, strip punctuation, and keep only purely alphabetic words.
pub fn clean_line(line: &str) -> Vec<String> {
    let lowered: String = line
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect();
    lowered
        .split_whitespace()
        .filter(|word| word.chars().all(char::is_alphabetic))
        .map(str::to_owned)
        .collect()
}

/// Clean every line and concatenate the words in order.
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| clean_line(line.as_ref()))
        .collect()
}

/// Read and tokenize a corpus file.
pub fn load_corpus(path: &Path) -> std::io::Result<Vec<String>> {
    let lines = read_lines(path)?;
    Ok(tokenize_lines(&lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(
            clean_line("\"The Murder of Roger Ackroyd,\" she said!"),
            vec!["the", "murder", "of", "roger", "ackroyd", "she", "said"]
        );
    }

    #[test]
    fn drops_non_alphabetic_words() {
        assert_eq!(clean_line("chapter 12 began at 3pm"), vec!["chapter", "began", "at"]);
    }

    #[test]
    fn contractions_collapse() {
        assert_eq!(clean_line("don't stop"), vec!["dont", "stop"]);
    }

    #[test]
    fn hyphens_and_closing_brackets_are_kept() {
        // the kept character makes the word non-alphabetic, so it is dropped
        assert_eq!(clean_line("a well-known fact"), vec!["a", "fact"]);
        assert_eq!(clean_line("[sic] noted"), vec!["noted"]);
        assert_eq!(clean_line("[aside"), vec!["aside"]);
    }

    #[test]
    fn lines_concatenate_in_order() {
        let tokens = tokenize_lines(&["One two.", "", "Three"]);
        assert_eq!(tokens, vec!["one", "two", "three"]);
    }

    #[test]
    fn read_lines_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "  first line \n\n   \nsecond\n").unwrap();
        assert_eq!(read_lines(&path).unwrap(), vec!["first line", "second"]);
    }
}
