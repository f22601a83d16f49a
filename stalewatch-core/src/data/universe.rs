//! Watchlist: the universe of symbols that are expected to have data.
//!
//! Plain text, one ticker per line. Blank lines and `#` comment lines are
//! ignored, trailing `# ...` comments are stripped, tickers are uppercased.

use std::collections::BTreeSet;
use std::path::Path;

use super::provider::{SourceError, SymbolUniverse};
use crate::domain::{normalize_symbol, Symbol};

/// A named set of tracked symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    name: String,
    symbols: BTreeSet<Symbol>,
}

impl Watchlist {
    /// Load a watchlist file. A missing file is a `MissingSource`.
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::MissingSource(display.clone())
            } else {
                SourceError::Read {
                    path: display.clone(),
                    reason: e.to_string(),
                }
            }
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(display);
        Ok(Self::parse(name, &content))
    }

    /// Parse watchlist text.
    pub fn parse(name: impl Into<String>, content: &str) -> Self {
        let symbols = content
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .map(normalize_symbol)
            .collect();
        Self {
            name: name.into(),
            symbols,
        }
    }

    pub fn from_symbols<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            symbols: symbols
                .into_iter()
                .map(|s| normalize_symbol(s.as_ref()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }
}

impl SymbolUniverse for Watchlist {
    fn symbols(&self) -> Result<BTreeSet<Symbol>, SourceError> {
        Ok(self.symbols.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_comments_and_blanks() {
        let text = "# main list\n\naapl\n  msft  \nBRK.B # berkshire\n#TSLA\n";
        let w = Watchlist::parse("main", text);
        assert_eq!(w.len(), 3);
        assert!(w.contains("AAPL"));
        assert!(w.contains("MSFT"));
        assert!(w.contains("BRK.B"));
        assert!(!w.contains("TSLA"));
    }

    #[test]
    fn duplicates_collapse() {
        let w = Watchlist::parse("dup", "spy\nSPY\n");
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn from_file_uses_file_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("my_main_512.txt");
        std::fs::write(&path, "abc\n").unwrap();
        let w = Watchlist::from_file(&path).unwrap();
        assert_eq!(w.name(), "my_main_512.txt");
        assert_eq!(w.symbols().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_missing_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = Watchlist::from_file(&tmp.path().join("none.txt")).unwrap_err();
        assert!(err.is_missing());
    }
}
