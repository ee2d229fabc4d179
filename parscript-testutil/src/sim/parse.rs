//! Lexer, AST and parser for the R subset understood by [`SimRuntime`].
//!
//! Operator precedence (lowest → highest):
//!   `<-` `<<-`  →  `=`  →  `||` `|`  →  `&&` `&`  →  `!`  →  comparison  →
//!   `+` `-`  →  `*` `/`  →  `:`  →  unary minus  →  `^`  →
//!   postfix (`(…)`, `[…]`, `[[…]]`, `$name`)  →  primary
//!
//! [`SimRuntime`]: super::SimRuntime

use std::sync::Arc;

use parscript::rexp::Rexp;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Int(i32),
    Str(String),
    Ident(String),

    // Keywords
    Function,
    If,
    Else,
    For,
    In,
    True,
    False,
    Null,
    Na,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Colon,
    Bang,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    And,
    OrOr,
    Or,
    Assign,      // =
    LeftAssign,  // <-
    SuperAssign, // <<-
    Dollar,

    // Punctuation
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    LDoubleBracket,
    RBracket,
    Newline,
    Semicolon,
    /// Unrecognised input byte, reported instead of masking as EOF.
    Unknown(char),
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.pos += 1;
                }
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_number(&mut self, first: char) -> Token {
        let start = self.pos - first.len_utf8();
        while matches!(self.peek(), Some('0'..='9')) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while matches!(self.peek(), Some('0'..='9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E'))
            && matches!(self.peek2(), Some('0'..='9' | '+' | '-'))
        {
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some('0'..='9')) {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        if self.eat('L') {
            if let Ok(n) = text.parse::<i32>() {
                return Token::Int(n);
            }
        }
        Token::Num(text.parse().unwrap_or(f64::NAN))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err("unexpected end of input in string constant".into()),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(c) => s.push(c),
                    None => return Err("unexpected end of input in string constant".into()),
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn read_ident(&mut self, first: char) -> Token {
        let start = self.pos - first.len_utf8();
        while matches!(
            self.peek(),
            Some(c) if c.is_alphanumeric() || c == '_' || c == '.'
        ) {
            self.advance();
        }
        match &self.src[start..self.pos] {
            "function" => Token::Function,
            "if" => Token::If,
            "else" => Token::Else,
            "for" => Token::For,
            "in" => Token::In,
            "TRUE" => Token::True,
            "FALSE" => Token::False,
            "NULL" => Token::Null,
            "NA" => Token::Na,
            name => Token::Ident(name.to_owned()),
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_ws_and_comments();
        let Some(ch) = self.advance() else {
            return Ok(Token::Eof);
        };

        Ok(match ch {
            '0'..='9' => self.read_number(ch),
            '.' if matches!(self.peek(), Some('0'..='9')) => self.read_number(ch),
            '"' | '\'' => self.read_string(ch)?,
            '`' => match self.read_string('`')? {
                Token::Str(s) => Token::Ident(s),
                other => other,
            },
            c if c.is_alphabetic() || c == '.' => self.read_ident(c),
            '\n' => Token::Newline,
            ';' => Token::Semicolon,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            ':' => Token::Colon,
            '$' => Token::Dollar,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ']' => Token::RBracket,
            '[' => {
                if self.eat('[') {
                    Token::LDoubleBracket
                } else {
                    Token::LBracket
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::Eq
                } else {
                    Token::Assign
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else if self.peek() == Some('-') {
                    self.pos += 1;
                    Token::LeftAssign
                } else if self.peek() == Some('<') && self.peek2() == Some('-') {
                    self.pos += 2;
                    Token::SuperAssign
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::AndAnd
                } else {
                    Token::And
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::OrOr
                } else {
                    Token::Or
                }
            }
            c => Token::Unknown(c),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = matches!(t, Token::Eof);
            tokens.push(t);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Range,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A call argument, possibly named (`f(x, sep = "")`).
#[derive(Debug, Clone)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub params: Vec<Param>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Const(Rexp),
    Ident(String),
    Call(Box<Expr>, Vec<Arg>),
    /// `x[i]`
    Index(Box<Expr>, Box<Expr>),
    /// `x[[i]]`
    Element(Box<Expr>, Box<Expr>),
    /// `x$name`
    Dollar(Box<Expr>, String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `target <- value`; `global` for `<<-`.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        global: bool,
    },
    Function(Arc<FunctionDef>),
    Block(Vec<Expr>),
    If(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    For(String, Box<Expr>, Box<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Inside `(…)` or `[…]`, where newlines do not end an expression.
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn skip_newlines(&mut self) {
        while self.tokens.get(self.pos) == Some(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> &Token {
        if self.nesting > 0 {
            self.skip_newlines();
        }
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("unexpected {} (expected {what})", describe(self.peek())))
        }
    }

    /// Parse a binary operand; a newline right after an operator is allowed.
    fn operand<F>(&mut self, f: F) -> Result<Expr, String>
    where
        F: FnOnce(&mut Self) -> Result<Expr, String>,
    {
        self.skip_newlines();
        f(self)
    }

    // ── Program / statements ──────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Vec<Expr>, String> {
        let mut exprs = Vec::new();
        loop {
            while matches!(self.peek(), Token::Newline | Token::Semicolon) {
                self.pos += 1;
            }
            if self.peek() == &Token::Eof {
                break;
            }
            exprs.push(self.parse_expr()?);
            match self.peek() {
                Token::Newline | Token::Semicolon | Token::Eof => {}
                other => return Err(format!("unexpected {}", describe(other))),
            }
        }
        Ok(exprs)
    }

    fn parse_block(&mut self) -> Result<Expr, String> {
        // `{` already consumed; newlines separate statements again.
        let saved = std::mem::replace(&mut self.nesting, 0);
        let mut exprs = Vec::new();
        loop {
            while matches!(self.peek(), Token::Newline | Token::Semicolon) {
                self.pos += 1;
            }
            if self.eat(&Token::RBrace) {
                break;
            }
            if self.peek() == &Token::Eof {
                return Err("unexpected end of input (expected '}')".into());
            }
            exprs.push(self.parse_expr()?);
            match self.peek() {
                Token::Newline | Token::Semicolon | Token::RBrace => {}
                other => return Err(format!("unexpected {}", describe(other))),
            }
        }
        self.nesting = saved;
        Ok(Expr::Block(exprs))
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_left_assign()
    }

    fn parse_left_assign(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_eq_assign()?;
        let global = match self.peek() {
            Token::LeftAssign => false,
            Token::SuperAssign => true,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.operand(Self::parse_left_assign)?;
        make_assign(lhs, rhs, global)
    }

    fn parse_eq_assign(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_or()?;
        if self.eat(&Token::Assign) {
            let rhs = self.operand(Self::parse_left_assign)?;
            return make_assign(lhs, rhs, false);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        loop {
            let op = match self.peek() {
                Token::OrOr => BinOp::OrOr,
                Token::Or => BinOp::Or,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.operand(Self::parse_and)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_not()?;
        loop {
            let op = match self.peek() {
                Token::AndAnd => BinOp::AndAnd,
                Token::And => BinOp::And,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.operand(Self::parse_not)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.operand(Self::parse_additive)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.operand(Self::parse_multiplicative)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_range()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.operand(Self::parse_range)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_range(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&Token::Colon) {
            let rhs = self.operand(Self::parse_unary)?;
            lhs = Expr::Binary(BinOp::Range, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::Caret) {
            // right-associative, and binds tighter than unary minus on the left
            let exp = self.operand(Self::parse_unary)?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary()?;
        loop {
            // Postfix operators must start on the same line.
            match self.tokens.get(self.pos) {
                Some(Token::LParen) => {
                    self.pos += 1;
                    let args = self.parse_args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    self.nesting += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']'")?;
                    self.nesting -= 1;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some(Token::LDoubleBracket) => {
                    self.pos += 1;
                    self.nesting += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "']]'")?;
                    self.expect(&Token::RBracket, "']]'")?;
                    self.nesting -= 1;
                    expr = Expr::Element(Box::new(expr), Box::new(index));
                }
                Some(Token::Dollar) => {
                    self.pos += 1;
                    let name = match self.advance() {
                        Token::Ident(name) | Token::Str(name) => name,
                        other => {
                            return Err(format!("unexpected {} after '$'", describe(&other)))
                        }
                    };
                    expr = Expr::Dollar(Box::new(expr), name);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Arguments of a call; `(` already consumed.
    fn parse_args(&mut self) -> Result<Vec<Arg>, String> {
        self.nesting += 1;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let name = match (self.peek().clone(), self.tokens.get(self.pos + 1)) {
                    (Token::Ident(n) | Token::Str(n), Some(Token::Assign)) => Some(n),
                    _ => None,
                };
                if name.is_some() {
                    self.pos += 2;
                }
                let value = self.parse_left_assign_arg()?;
                args.push(Arg { name, value });
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma, "',' or ')'")?;
            }
        }
        self.nesting -= 1;
        Ok(args)
    }

    /// An argument value: like an expression, but `=` never assigns.
    fn parse_left_assign_arg(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_or()?;
        let global = match self.peek() {
            Token::LeftAssign => false,
            Token::SuperAssign => true,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.operand(Self::parse_left_assign)?;
        make_assign(lhs, rhs, global)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, String> {
        self.expect(&Token::LParen, "'(' after 'function'")?;
        self.nesting += 1;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let name = match self.advance() {
                    Token::Ident(n) => n,
                    other => return Err(format!("unexpected {} in parameter list", describe(&other))),
                };
                let default = if self.eat(&Token::Assign) {
                    Some(self.parse_or()?)
                } else {
                    None
                };
                params.push(Param { name, default });
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma, "',' or ')'")?;
            }
        }
        self.nesting -= 1;
        Ok(params)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let tok = self.advance();
        match tok {
            Token::Num(x) => Ok(Expr::Const(Rexp::double(x))),
            Token::Int(n) => Ok(Expr::Const(Rexp::integer(n))),
            Token::Str(s) => Ok(Expr::Const(Rexp::string(s))),
            Token::True => Ok(Expr::Const(Rexp::logical(true))),
            Token::False => Ok(Expr::Const(Rexp::logical(false))),
            Token::Null => Ok(Expr::Const(Rexp::Null)),
            Token::Na => Ok(Expr::Const(Rexp::Logical(vec![None]))),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                self.nesting += 1;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                self.nesting -= 1;
                Ok(inner)
            }
            Token::LBrace => self.parse_block(),
            Token::Function => {
                let params = self.parse_params()?;
                self.skip_newlines();
                let body = self.parse_expr()?;
                Ok(Expr::Function(Arc::new(FunctionDef { params, body })))
            }
            Token::If => {
                self.expect(&Token::LParen, "'(' after 'if'")?;
                self.nesting += 1;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                self.nesting -= 1;
                self.skip_newlines();
                let then = self.parse_expr()?;
                // `else` may start on the next line.
                let save = self.pos;
                self.skip_newlines();
                let else_ = if self.eat(&Token::Else) {
                    self.skip_newlines();
                    Some(Box::new(self.parse_expr()?))
                } else {
                    self.pos = save;
                    None
                };
                Ok(Expr::If(Box::new(cond), Box::new(then), else_))
            }
            Token::For => {
                self.expect(&Token::LParen, "'(' after 'for'")?;
                self.nesting += 1;
                let var = match self.advance() {
                    Token::Ident(n) => n,
                    other => return Err(format!("unexpected {} in for loop", describe(&other))),
                };
                self.expect(&Token::In, "'in'")?;
                let seq = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                self.nesting -= 1;
                self.skip_newlines();
                let body = self.parse_expr()?;
                Ok(Expr::For(var, Box::new(seq), Box::new(body)))
            }
            other => Err(format!("unexpected {}", describe(&other))),
        }
    }
}

fn make_assign(target: Expr, value: Expr, global: bool) -> Result<Expr, String> {
    match target {
        Expr::Ident(_) | Expr::Dollar(..) | Expr::Element(..) | Expr::Index(..) => Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
            global,
        }),
        Expr::Const(Rexp::Character(ref v)) if v.len() == 1 => {
            let name = v[0].clone().unwrap_or_default();
            Ok(Expr::Assign {
                target: Box::new(Expr::Ident(name)),
                value: Box::new(value),
                global,
            })
        }
        _ => Err("invalid assignment target".into()),
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Eof => "end of input".into(),
        Token::Newline => "end of line".into(),
        Token::Ident(n) => format!("symbol '{n}'"),
        Token::Str(_) => "string constant".into(),
        Token::Num(_) | Token::Int(_) => "numeric constant".into(),
        Token::Unknown(c) => format!("input '{c}'"),
        other => format!("{other:?}"),
    }
}

/// Parse R source into a sequence of top-level expressions.
pub fn parse_program(src: &str) -> Result<Vec<Expr>, String> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_program()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Expr {
        let mut exprs = parse_program(src).expect("parse failed");
        assert_eq!(exprs.len(), 1, "expected one expression in {src:?}");
        exprs.remove(0)
    }

    #[test]
    fn statements_split_on_newline_and_semicolon() {
        assert_eq!(parse_program("a = 1; b <- 2\nc = 3;").unwrap().len(), 3);
        assert!(parse_program("").unwrap().is_empty());
        assert!(parse_program("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn eq_assign_and_arrow_assign() {
        assert!(matches!(parse_one("x = 1"), Expr::Assign { global: false, .. }));
        assert!(matches!(parse_one("x <- 1"), Expr::Assign { global: false, .. }));
        assert!(matches!(parse_one("x <<- 1"), Expr::Assign { global: true, .. }));
    }

    #[test]
    fn dollar_assignment_target() {
        match parse_one("variables$toto='goodValue'") {
            Expr::Assign { target, .. } => {
                assert!(matches!(*target, Expr::Dollar(_, ref n) if n == "toto"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn named_arguments() {
        match parse_one("cat('a', sep='', file=stderr())") {
            Expr::Call(_, args) => {
                assert_eq!(args.len(), 3);
                assert!(args[0].name.is_none());
                assert_eq!(args[1].name.as_deref(), Some("sep"));
                assert_eq!(args[2].name.as_deref(), Some("file"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn function_with_block_body() {
        let e = parse_one("f = function(x, y = 2) {\n  z <- x + y\n  z * 2\n}");
        match e {
            Expr::Assign { value, .. } => match *value {
                Expr::Function(def) => {
                    assert_eq!(def.params.len(), 2);
                    assert!(def.params[1].default.is_some());
                    assert!(matches!(def.body, Expr::Block(ref b) if b.len() == 2));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn index_and_element() {
        assert!(matches!(parse_one("args[3]"), Expr::Index(..)));
        assert!(matches!(parse_one("x[[1]]"), Expr::Element(..)));
        assert!(matches!(parse_one("x[[y[1]]]"), Expr::Element(..)));
    }

    #[test]
    fn newline_inside_parens_is_ignored() {
        assert_eq!(parse_program("f(1,\n  2)\n").unwrap().len(), 1);
    }

    #[test]
    fn if_else_inside_block() {
        let e = parse_one("{\n if (x) 1\n else 2\n}");
        match e {
            Expr::Block(stmts) => assert!(matches!(stmts[0], Expr::If(_, _, Some(_)))),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn integer_literal_suffix() {
        assert!(matches!(parse_one("5L"), Expr::Const(Rexp::Integer(_))));
        assert!(matches!(parse_one("5"), Expr::Const(Rexp::Double(_))));
    }

    #[test]
    fn syntax_errors() {
        assert!(parse_program("x = ").is_err());
        assert!(parse_program("f(1, 2").is_err());
        assert!(parse_program("'unterminated").is_err());
        assert!(parse_program("1 = 2").is_err());
    }
}
