//! Symbol list — the set of trading pairs to scrape.
//!
//! Stored as a plain-text file, one pair per line. Blank lines and
//! `#`-prefixed comment lines are ignored. The file is the only symbol
//! source; there is no in-code override.

use std::path::Path;

/// An ordered list of trading-pair symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    /// Load a symbol list from a text file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read symbol file: {e}"))?;
        Ok(Self::from_text(&content))
    }

    /// Parse a symbol list from text. Blank and comment lines are dropped,
    /// surrounding whitespace is trimmed.
    pub fn from_text(content: &str) -> Self {
        let symbols = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        Self { symbols }
    }

    /// The three majors, as a convenience default for tests and quick starts.
    pub fn default_pairs() -> Self {
        Self {
            symbols: vec!["BTC/USDT".into(), "ETH/USDT".into(), "SOL/USDT".into()],
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Borrowed view for APIs that take &[&str].
    pub fn as_refs(&self) -> Vec<&str> {
        self.symbols.iter().map(String::as_str).collect()
    }
}
