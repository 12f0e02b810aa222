//! Parser implementation

use super::ast::*;
use crate::lexer::*;

impl Parser {
    /// Parse one `rule "Name" [disabled] { ... }` block.
    pub(crate) fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword(Keyword::Rule)?;

        let name = match &self.current().kind {
            TokenKind::String(s) if !s.is_empty() => {
                let s = s.clone();
                self.advance();
                s
            }
            TokenKind::String(_) => return Err(self.error("Expected non-empty rule name")),
            _ => return Err(self.expected("STRING rule name")),
        };

        let mut rule = Rule::new(name);

        if self.check_word("disabled") {
            self.advance();
            rule.enabled = false;
        }

        self.expect_punct('{')?;

        if self.check_keyword(Keyword::When) {
            self.advance();
            rule.when = Some(self.parse_condition()?);
        }

        if self.check_keyword(Keyword::Then) {
            self.advance();
            rule.then.push(self.parse_action()?);
            while self.check_keyword(Keyword::And) {
                self.advance();
                rule.then.push(self.parse_action()?);
            }
        }

        if self.check_keyword(Keyword::Trigger) {
            self.advance();
            rule.trigger = Some(self.parse_trigger()?);
        }

        if self.check_keyword(Keyword::Flags) {
            self.advance();
            loop {
                let flag = match &self.current().kind {
                    TokenKind::Path(p) => p.clone(),
                    TokenKind::Keyword(k) => k.as_str().to_string(),
                    _ => break,
                };
                self.advance();
                rule.flags.insert(flag, true);
            }
        }

        self.expect_punct('}')?;
        Ok(rule)
    }

    /// Parse a condition: `and`-chained terms, flattened into one `All`.
    pub(crate) fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let mut terms = vec![self.parse_and_term()?];

        while self.check_keyword(Keyword::And) {
            self.advance();
            terms.push(self.parse_and_term()?);
        }

        if terms.len() == 1 {
            Ok(terms.remove(0))
        } else {
            Ok(Condition::All(terms))
        }
    }

    /// Parse `all(...)`, `any(...)` or a single comparison.
    pub(crate) fn parse_and_term(&mut self) -> Result<Condition, ParseError> {
        if self.check_keyword(Keyword::All) {
            self.advance();
            return self.parse_condition_list().map(Condition::All);
        }
        if self.check_keyword(Keyword::Any) {
            self.advance();
            return self.parse_condition_list().map(Condition::Any);
        }
        self.parse_comparison()
    }

    /// Parse `'(' condition (',' condition)* ')'`.
    fn parse_condition_list(&mut self) -> Result<Vec<Condition>, ParseError> {
        self.expect_punct('(')?;
        let mut children = vec![self.parse_condition()?];
        while self.check_punct(',') {
            self.advance();
            children.push(self.parse_condition()?);
        }
        self.expect_punct(')')?;
        Ok(children)
    }

    /// Parse `PATH op operand`.
    pub(crate) fn parse_comparison(&mut self) -> Result<Condition, ParseError> {
        let path = match &self.current().kind {
            TokenKind::Path(p) => p.clone(),
            _ => return Err(self.expected("PATH or all/any")),
        };
        self.advance();

        let condition = match &self.current().kind {
            TokenKind::Operator(op) => {
                let op = *op;
                self.advance();
                let operand = self.parse_scalar_operand()?;
                match op {
                    Operator::Eq => Condition::Eq(path, operand),
                    Operator::Ne => Condition::Neq(path, operand),
                    Operator::Gt => Condition::Gt(path, operand),
                    Operator::Ge => Condition::Gte(path, operand),
                    Operator::Lt => Condition::Lt(path, operand),
                    Operator::Le => Condition::Lte(path, operand),
                }
            }
            TokenKind::Keyword(Keyword::In) => {
                self.advance();
                Condition::In(path, self.parse_string_list()?)
            }
            TokenKind::Keyword(Keyword::Is) => {
                self.advance();
                Condition::Is(path, self.parse_identity_operand()?)
            }
            TokenKind::Keyword(Keyword::Contains) => {
                self.advance();
                Condition::Contains(path, self.parse_scalar_operand()?)
            }
            TokenKind::Keyword(Keyword::Regex) => {
                self.advance();
                Condition::Regex(path, self.parse_regex_operand()?)
            }
            _ => return Err(self.expected("OPERATOR")),
        };

        Ok(condition)
    }

    /// Parse a single literal operand. Duration tokens stay strings.
    pub(crate) fn parse_scalar_operand(&mut self) -> Result<Literal, ParseError> {
        let literal = match &self.current().kind {
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::Number(n) => Literal::Number(*n),
            TokenKind::Duration(d) => Literal::String(d.clone()),
            TokenKind::Path(p) if p == "true" => Literal::Bool(true),
            TokenKind::Path(p) if p == "false" => Literal::Bool(false),
            TokenKind::Path(p) if p == "null" => Literal::Null,
            _ => return Err(self.unexpected("an operand")),
        };
        self.advance();
        Ok(literal)
    }

    /// Parse `'[' STRING (',' STRING)* ']'`.
    pub(crate) fn parse_string_list(&mut self) -> Result<Literal, ParseError> {
        self.expect_punct('[')?;
        let mut items = Vec::new();
        if !self.check_punct(']') {
            items.push(self.expect_string()?);
            while self.check_punct(',') {
                self.advance();
                items.push(self.expect_string()?);
            }
        }
        self.expect_punct(']')?;
        Ok(Literal::List(items))
    }

    /// Parse the operand of `is`: `true`, `false` or `null`.
    pub(crate) fn parse_identity_operand(&mut self) -> Result<Literal, ParseError> {
        let literal = match &self.current().kind {
            TokenKind::Path(p) if p == "true" => Literal::Bool(true),
            TokenKind::Path(p) if p == "false" => Literal::Bool(false),
            TokenKind::Path(p) if p == "null" => Literal::Null,
            _ => return Err(self.expected("true, false or null after 'is'")),
        };
        self.advance();
        Ok(literal)
    }

    /// Parse the operand of `regex`: a `/.../flags` literal or a string.
    pub(crate) fn parse_regex_operand(&mut self) -> Result<RegexLiteral, ParseError> {
        let literal = match &self.current().kind {
            TokenKind::Regex(r) => RegexLiteral::new(r.clone()),
            TokenKind::String(s) => RegexLiteral::new(s.clone()),
            _ => return Err(self.expected("REGEX or STRING after 'regex'")),
        };
        self.advance();
        Ok(literal)
    }

    /// Parse an action.
    pub(crate) fn parse_action(&mut self) -> Result<Action, ParseError> {
        match &self.current().kind {
            TokenKind::Keyword(Keyword::Close) => {
                self.advance();
                let keep_first = self.check_word("keepFirst");
                if keep_first {
                    self.advance();
                }
                Ok(Action::Close { keep_first })
            }
            TokenKind::Keyword(Keyword::Group) => {
                self.advance();
                let mut name = None;
                let mut by = None;
                if self.check_keyword(Keyword::Name) {
                    self.advance();
                    name = Some(self.expect_string()?);
                }
                if self.check_keyword(Keyword::By) {
                    self.advance();
                    by = Some(self.expect_path()?);
                }
                let create_if_missing = self.check_word("createIfMissing");
                if create_if_missing {
                    self.advance();
                }
                Ok(Action::Group {
                    name,
                    by,
                    create_if_missing,
                })
            }
            TokenKind::Keyword(Keyword::Snooze) => {
                self.advance();
                self.expect_keyword(Keyword::For)?;
                let duration = self.expect_duration()?;
                let mut wake_into = None;
                if self.check_word("wakeInto") {
                    self.advance();
                    let target = match &self.current().kind {
                        TokenKind::Path(p) => WakeTarget::from_word(p),
                        _ => None,
                    };
                    match target {
                        Some(target) => {
                            self.advance();
                            wake_into = Some(target);
                        }
                        None => {
                            return Err(self.expected("wake target (sameWindow, newWindow or originalWindow)"))
                        }
                    }
                }
                Ok(Action::Snooze { duration, wake_into })
            }
            TokenKind::Path(p) if p == "suspend" => {
                self.advance();
                Ok(Action::Suspend)
            }
            _ => Err(self.expected("action (close, group, snooze or suspend)")),
        }
    }

    /// Parse a trigger policy.
    pub(crate) fn parse_trigger(&mut self) -> Result<Trigger, ParseError> {
        match &self.current().kind {
            TokenKind::Keyword(Keyword::Immediate) => {
                self.advance();
                Ok(Trigger::Immediate)
            }
            TokenKind::Keyword(Keyword::Manual) => {
                self.advance();
                Ok(Trigger::Manual)
            }
            TokenKind::Keyword(Keyword::OnAction) => {
                self.advance();
                Ok(Trigger::OnAction)
            }
            TokenKind::Keyword(Keyword::Repeat) => {
                self.advance();
                self.expect_keyword(Keyword::Every)?;
                Ok(Trigger::RepeatEvery(self.expect_duration()?))
            }
            TokenKind::Keyword(Keyword::Once) => {
                self.advance();
                self.expect_keyword(Keyword::At)?;
                Ok(Trigger::OnceAt(self.expect_string()?))
            }
            _ => Err(self.expected("trigger (immediate, manual, onAction, repeat every, once at)")),
        }
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().kind == TokenKind::Keyword(keyword)
    }

    pub(crate) fn check_punct(&self, c: char) -> bool {
        self.current().kind == TokenKind::Punct(c)
    }

    /// True when the current token is the bare word `word`.
    pub(crate) fn check_word(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Path(p) if p == word)
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.expected(&format!("KEYWORD '{}'", keyword.as_str())))
        }
    }

    pub(crate) fn expect_punct(&mut self, c: char) -> Result<(), ParseError> {
        if self.check_punct(c) {
            self.advance();
            Ok(())
        } else {
            let name = punct_name(c).unwrap_or("PUNCT");
            Err(self.expected(name))
        }
    }

    pub(crate) fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.expected("STRING")),
        }
    }

    pub(crate) fn expect_path(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Path(p) => {
                let p = p.clone();
                self.advance();
                Ok(p)
            }
            _ => Err(self.expected("PATH")),
        }
    }

    pub(crate) fn expect_duration(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Duration(d) => {
                let d = d.clone();
                self.advance();
                Ok(d)
            }
            _ => Err(self.expected("DURATION")),
        }
    }

    /// "Expected <what>, found <token>".
    pub(crate) fn expected(&self, what: &str) -> ParseError {
        self.error(&format!("Expected {}, found {}", what, self.current().kind))
    }

    /// "Unexpected <token>, expected <what>".
    pub(crate) fn unexpected(&self, what: &str) -> ParseError {
        self.error(&format!("Unexpected {}, expected {}", self.current().kind, what))
    }

    pub(crate) fn error(&self, msg: &str) -> ParseError {
        let span = self.current().span;
        ParseError {
            message: msg.to_string(),
            position: span.start,
            line: span.line,
            column: span.column,
        }
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Parse DSL source into its rules.
pub fn parse_dsl(source: &str) -> Result<Vec<Rule>, ParseError> {
    let tokens = Lexer::new(source).tokenize();
    let rules = Parser::new(tokens).parse()?;
    tracing::debug!(rules = rules.len(), "parsed rule DSL");
    Ok(rules)
}

/// Parse source that must contain exactly one rule.
pub fn parse_rule(source: &str) -> Result<Rule, ParseError> {
    let mut rules = parse_dsl(source)?;
    if rules.len() != 1 {
        return Err(ParseError {
            message: format!("Expected exactly one rule, found {}", rules.len()),
            position: 0,
            line: 1,
            column: 1,
        });
    }
    Ok(rules.remove(0))
}

// ============================================================================
// TESTS
// ============================================================================
