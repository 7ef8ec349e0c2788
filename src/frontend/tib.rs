/// Terminal input buffer: one line of source and a read position.
#[derive(Debug, Clone, Default)]
pub struct Tib {
    source: Vec<char>,
    pos: usize,
}

impl Tib {
    pub fn new(line: &str) -> Self {
        Tib {
            source: line.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Next whitespace-delimited token.
    pub fn next_token(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        Some(self.source[start..self.pos].iter().collect())
    }

    /// Raw text up to `delim`, consuming the delimiter.
    ///
    /// Leading delimiters are skipped and the first captured character (the
    /// blank after the parsing word) is dropped. `None` once the line is used
    /// up.
    pub fn scan(&mut self, delim: char) -> Option<String> {
        while self.current() == Some(delim) {
            self.pos += 1;
        }
        if self.current().is_none() {
            return None;
        }
        let start = self.pos;
        while let Some(ch) = self.current() {
            if ch == delim {
                break;
            }
            self.pos += 1;
        }
        let captured: String = self.source[start + 1..self.pos].iter().collect();
        if self.current() == Some(delim) {
            self.pos += 1;
        }
        Some(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<String> {
        let mut tib = Tib::new(line);
        std::iter::from_fn(|| tib.next_token()).collect()
    }

    #[test]
    fn test_whitespace_tokens() {
        assert_eq!(tokens("  : sq  dup * ;\t"), vec![":", "sq", "dup", "*", ";"]);
        assert!(tokens("   ").is_empty());
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_scan_string() {
        let mut tib = Tib::new(".\" hello world\" cr");
        assert_eq!(tib.next_token().as_deref(), Some(".\""));
        assert_eq!(tib.scan('"').as_deref(), Some("hello world"));
        assert_eq!(tib.next_token().as_deref(), Some("cr"));
        assert_eq!(tib.next_token(), None);
    }

    #[test]
    fn test_scan_comment() {
        let mut tib = Tib::new("( n -- n ) dup");
        tib.next_token();
        assert_eq!(tib.scan(')').as_deref(), Some("n -- n "));
        assert_eq!(tib.next_token().as_deref(), Some("dup"));
    }

    #[test]
    fn test_scan_to_end_of_line() {
        let mut tib = Tib::new("\\ the rest is ignored");
        tib.next_token();
        assert_eq!(tib.scan('\n').as_deref(), Some("the rest is ignored"));
        assert_eq!(tib.next_token(), None);
    }

    #[test]
    fn test_scan_empty() {
        let mut tib = Tib::new("s\" \"");
        tib.next_token();
        assert_eq!(tib.scan('"').as_deref(), Some(""));

        let mut tib = Tib::new("(");
        tib.next_token();
        assert_eq!(tib.scan(')'), None);
    }
}
