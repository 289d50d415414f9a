//! Tokenized-argument view of a client command.
//!
//! The host engine tokenizes incoming commands before handing them to the
//! module; this type mirrors that access pattern (count, by-index,
//! remainder-as-string). The `say_*` accessors re-split the joined form on
//! plain spaces, which differs from the quote-aware tokenizer and is what
//! the chat parsing paths expect.

use crate::strutil::MAX_STRING_CHARS;

/// A tokenized client command.
#[derive(Debug, Clone)]
pub struct CommandArgs {
    tokens: Vec<String>,
}

impl CommandArgs {
    /// Tokenize a raw command line the way the host tokenizer does:
    /// whitespace-separated, double quotes group a single token.
    pub fn tokenize(line: &str) -> Self {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut quoted = false;

        for c in line.chars() {
            match c {
                '"' => {
                    if quoted {
                        tokens.push(std::mem::take(&mut current));
                    }
                    quoted = !quoted;
                }
                ' ' | '\t' if !quoted => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }

        Self { tokens }
    }

    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn argc(&self) -> usize {
        self.tokens.len()
    }

    /// Argument by index; absent arguments read as the empty string.
    pub fn argv(&self, n: usize) -> &str {
        self.tokens.get(n).map(String::as_str).unwrap_or("")
    }

    /// Arguments from `start` onwards joined by single spaces, truncated
    /// to [`MAX_STRING_CHARS`] - 1 characters.
    pub fn concat(&self, start: usize) -> String {
        let mut line = String::new();
        for (i, tok) in self.tokens.iter().enumerate().skip(start) {
            if line.chars().count() + tok.chars().count() >= MAX_STRING_CHARS - 1 {
                break;
            }
            line.push_str(tok);
            if i != self.tokens.len() - 1 {
                line.push(' ');
            }
        }
        line.trim_end().to_string()
    }

    /// Number of space-separated words in the joined command line.
    pub fn say_argc(&self) -> usize {
        self.concat(0).split_whitespace().count()
    }

    /// The `n`-th space-separated word of the joined command line.
    pub fn say_argv(&self, n: usize) -> Option<String> {
        self.concat(0)
            .split_whitespace()
            .nth(n)
            .map(str::to_string)
    }

    /// The joined command line with the first `start` words removed.
    pub fn say_concat(&self, start: usize) -> String {
        let joined = self.concat(0);
        let mut rest = joined.as_str();
        for _ in 0..start {
            rest = rest.trim_start();
            match rest.find(' ') {
                Some(pos) => rest = &rest[pos..],
                None => return String::new(),
            }
        }
        rest.trim_start().to_string()
    }
}
