/// One token of a source line. A token immediately followed by a
/// colon is a label declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub is_label: bool,
}

/// Lazy splitter over one line of assembly text. Whitespace and
/// commas separate tokens; a colon terminates a label token.
pub struct Tokenizer<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str) -> Self {
        Tokenizer { line, pos: 0 }
    }

    /// Commas on the whole line, independent of the scan position.
    /// Pass one sizes `.long` lines from this count.
    pub fn comma_count(&self) -> usize {
        self.line.bytes().filter(|&b| b == b',').count()
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let bytes = self.line.as_bytes();
        loop {
            while self.pos < bytes.len() && matches!(bytes[self.pos], b' ' | b'\t' | b',') {
                self.pos += 1;
            }
            if self.pos >= bytes.len() {
                return None;
            }
            let start = self.pos;
            while self.pos < bytes.len() && !matches!(bytes[self.pos], b' ' | b'\t' | b',' | b':')
            {
                self.pos += 1;
            }
            let text = &self.line[start..self.pos];
            let is_label = self.pos < bytes.len() && bytes[self.pos] == b':';
            if is_label {
                self.pos += 1;
            }
            if !text.is_empty() {
                return Some(Token { text, is_label });
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<&str> {
        Tokenizer::new(line).map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_spaces_and_commas() {
        assert_eq!(texts("moveq r1, #5"), vec!["moveq", "r1", "#5"]);
        assert_eq!(texts(".word 1,2,3"), vec![".word", "1", "2", "3"]);
        assert_eq!(texts("  \t "), Vec::<&str>::new());
    }

    #[test]
    fn colon_marks_a_label() {
        let mut tokens = Tokenizer::new("main: addal r1, #1");
        let first = tokens.next_token().unwrap();
        assert_eq!(first.text, "main");
        assert!(first.is_label);
        let second = tokens.next_token().unwrap();
        assert_eq!(second.text, "addal");
        assert!(!second.is_label);
    }

    #[test]
    fn counts_commas_on_the_whole_line() {
        let mut tokens = Tokenizer::new("vals: .long a + b, #7, c");
        tokens.next_token();
        assert_eq!(tokens.comma_count(), 2);
    }

    #[test]
    fn sign_tokens_stand_alone() {
        assert_eq!(texts(".long a + b"), vec![".long", "a", "+", "b"]);
    }
}
