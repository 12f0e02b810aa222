//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for the rule DSL.
///
/// Never fails: characters it does not recognise become single-character
/// `Punct` tokens, leaving syntax errors to the parser.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens ending in `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '=' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(Operator::Eq)
                    } else {
                        TokenKind::Punct('=')
                    }
                }

                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(Operator::Ne)
                    } else {
                        TokenKind::Punct('!')
                    }
                }

                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(Operator::Ge)
                    } else {
                        TokenKind::Operator(Operator::Gt)
                    }
                }

                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Operator(Operator::Le)
                    } else {
                        TokenKind::Operator(Operator::Lt)
                    }
                }

                '-' => {
                    self.advance();
                    if self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.scan_number(start_pos, true)
                    } else {
                        TokenKind::Punct('-')
                    }
                }

                '/' => self.scan_regex_or_slash(),

                '"' => self.scan_string(),

                c if c.is_ascii_digit() => self.scan_number(start_pos, false),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),

                c => {
                    self.advance();
                    TokenKind::Punct(c)
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// Scan a keyword or a dotted path (`tab.countPerOrigin:domain`).
    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':') {
                self.advance();
            } else {
                break;
            }
        }

        let word = &self.source[start..self.pos];
        match Keyword::from_word(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Path(word.to_string()),
        }
    }

    /// Scan a string literal with escape sequences.
    ///
    /// An unterminated string runs to the end of input.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => break,
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        Some('\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some('"') => {
                            self.advance();
                            value.push('"');
                        }
                        _ => value.push('\\'),
                    }
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                    value.push('\n');
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::String(value)
    }

    /// Scan a number, or a duration when digits are directly followed by a
    /// single `m`/`h`/`d` unit.
    fn scan_number(&mut self, start: usize, negative: bool) -> TokenKind {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let mut fractional = false;
        if self.peek_char() == Some('.')
            && self.peek_next_char().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            fractional = true;
            self.advance(); // .
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if !negative && !fractional {
            if let Some(unit) = self.peek_char() {
                let unit_ends_word = self
                    .peek_next_char()
                    .map(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':')))
                    .unwrap_or(true);
                if matches!(unit, 'm' | 'h' | 'd') && unit_ends_word {
                    self.advance();
                    return TokenKind::Duration(self.source[start..self.pos].to_string());
                }
            }
        }

        let text = &self.source[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            // digits with an optional fraction always parse; keep the lexer total anyway
            Err(_) => TokenKind::Punct(text.chars().next().unwrap_or('0')),
        }
    }

    /// Scan `/pattern/flags`, or a lone `/` when no closing slash exists on
    /// the same line.
    fn scan_regex_or_slash(&mut self) -> TokenKind {
        let start = self.pos;
        let rest = &self.source[start + 1..];

        let mut close = None;
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            match c {
                '\n' => break,
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '/' => {
                    close = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            self.advance();
            return TokenKind::Punct('/');
        };

        let end = start + 1 + close + 1;
        while self.pos < end {
            self.advance();
        }
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Regex(self.source[start..self.pos].to_string())
    }

    /// Skip whitespace and `//` line comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].char_indices();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers_and_durations() {
        assert_eq!(
            kinds("42 30m 1h 7d"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Duration("30m".to_string()),
                TokenKind::Duration("1h".to_string()),
                TokenKind::Duration("7d".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_variants() {
        assert_eq!(
            kinds("3.5 -10 7days"),
            vec![
                TokenKind::Number(3.5),
                TokenKind::Number(-10.0),
                TokenKind::Number(7.0),
                TokenKind::Path("days".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        let tokens = kinds("rule Rule onAction onaction");
        assert_eq!(tokens[0], TokenKind::Keyword(Keyword::Rule));
        assert_eq!(tokens[1], TokenKind::Path("Rule".to_string()));
        assert_eq!(tokens[2], TokenKind::Keyword(Keyword::OnAction));
        assert_eq!(tokens[3], TokenKind::Path("onaction".to_string()));
    }

    #[test]
    fn test_all_keywords_recognised() {
        let source = "rule when then trigger flags all any in is contains regex group snooze close \
                      immediate repeat every once at onAction manual and name by for";
        let tokens = tokenize(source);
        assert_eq!(tokens.len(), 26);
        assert!(tokens[..25].iter().all(|t| matches!(t.kind, TokenKind::Keyword(_))));
    }

    #[test]
    fn test_paths_with_dots_and_colons() {
        assert_eq!(
            kinds("tab.countPerOrigin:domain tab.age"),
            vec![
                TokenKind::Path("tab.countPerOrigin:domain".to_string()),
                TokenKind::Path("tab.age".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("== != >= <= > < = !"),
            vec![
                TokenKind::Operator(Operator::Eq),
                TokenKind::Operator(Operator::Ne),
                TokenKind::Operator(Operator::Ge),
                TokenKind::Operator(Operator::Le),
                TokenKind::Operator(Operator::Gt),
                TokenKind::Operator(Operator::Lt),
                TokenKind::Punct('='),
                TokenKind::Punct('!'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"" "back\\slash" "tab\there""#),
            vec![
                TokenKind::String("say \"hi\"".to_string()),
                TokenKind::String("back\\slash".to_string()),
                TokenKind::String("tab\there".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_eof() {
        assert_eq!(
            kinds(r#"name "abc"#),
            vec![
                TokenKind::Keyword(Keyword::Name),
                TokenKind::String("abc".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_regex_literal_kept_whole() {
        assert_eq!(
            kinds(r"tab.url regex /github\.com\/[a-z]+/i"),
            vec![
                TokenKind::Path("tab.url".to_string()),
                TokenKind::Keyword(Keyword::Regex),
                TokenKind::Regex(r"/github\.com\/[a-z]+/i".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lone_slash_is_punct() {
        assert_eq!(
            kinds("a / b"),
            vec![
                TokenKind::Path("a".to_string()),
                TokenKind::Punct('/'),
                TokenKind::Path("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_elided() {
        let source = "rule // a comment with \"quotes\" and /slashes/\nwhen";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Keyword(Keyword::Rule),
                TokenKind::Keyword(Keyword::When),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_characters_become_punct() {
        assert_eq!(
            kinds("when @ then"),
            vec![
                TokenKind::Keyword(Keyword::When),
                TokenKind::Punct('@'),
                TokenKind::Keyword(Keyword::Then),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = tokenize("rule\n  \"x\"");
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
        assert_eq!(tokens[1].span.start, 7);
    }

    #[test]
    fn test_empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   // only a comment"), vec![TokenKind::Eof]);
    }
}
