use std::fmt::Display;
use unicode_xid;

use crate::cursor;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Kind {
    Module,
    Procedure,
    Var,
    Begin,
    End,
    If,
    Then,
    Else,
    Elsif,
    While,
    Do,
    Array,
    Record,
    Const,
    Type,
    Identifier,
    AddOp,    // + OR AND
    MulOp,    // * / & DIV MOD
    Number,
    RelOp,    // < > <= >= #
    AssignOp, // :=
    Symbol,   // { } [ ]
    Unknown,
    Eof,
    Str,
    Error,
    Empty,
    Comma,     // ,
    SemiColon, // ;
    Colon,     // :
    Period,    // .
    Equal,     // =
    LParen,    // (
    RParen,    // )
    IntegerType,
    RealType,
    CharType,
    Minus, // -
    Tilde, // ~
    Read,
    Write,
    WriteLn,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Module => "MODULE",
            Kind::Procedure => "PROCEDURE",
            Kind::Var => "VAR",
            Kind::Begin => "BEGIN",
            Kind::End => "END",
            Kind::If => "IF",
            Kind::Then => "THEN",
            Kind::Else => "ELSE",
            Kind::Elsif => "ELSIF",
            Kind::While => "WHILE",
            Kind::Do => "DO",
            Kind::Array => "ARRAY",
            Kind::Record => "RECORD",
            Kind::Const => "CONST",
            Kind::Type => "TYPE",
            Kind::Identifier => "identifier",
            Kind::AddOp => "addop",
            Kind::MulOp => "mulop",
            Kind::Number => "number",
            Kind::RelOp => "relop",
            Kind::AssignOp => "':='",
            Kind::Symbol => "symbol",
            Kind::Unknown => "unknown",
            Kind::Eof => "end of file",
            Kind::Str => "string literal",
            Kind::Error => "error",
            Kind::Empty => "empty",
            Kind::Comma => "','",
            Kind::SemiColon => "';'",
            Kind::Colon => "':'",
            Kind::Period => "'.'",
            Kind::Equal => "'='",
            Kind::LParen => "'('",
            Kind::RParen => "')'",
            Kind::IntegerType => "INTEGER",
            Kind::RealType => "REAL",
            Kind::CharType => "CHAR",
            Kind::Minus => "'-'",
            Kind::Tilde => "'~'",
            Kind::Read => "READ",
            Kind::Write => "WRITE",
            Kind::WriteLn => "WRITELN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    None,
    Text(String),
    Int(i64),
    Real(f64),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Lexeme {
    pub kind: Kind,
    pub line: usize,
    pub value: Value,
}

impl Lexeme {
    pub fn new(kind: Kind, line: usize, value: Value) -> Lexeme {
        Lexeme { kind, line, value }
    }

    pub fn text(kind: Kind, line: usize, text: impl Into<String>) -> Lexeme {
        Lexeme::new(kind, line, Value::Text(text.into()))
    }

    /// Source spelling of the lexeme; numbers are rendered back to their
    /// literal form.
    pub fn lexeme(&self) -> String {
        match &self.value {
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Real(r) => format!("{:?}", r),
            Value::None => self.kind.to_string(),
        }
    }

    pub fn is(&self, kind: Kind) -> bool {
        self.kind == kind
    }
}

impl Display for Lexeme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<5}\t{:<16}\t{}", self.line, self.kind, self.lexeme())
    }
}

pub fn keyword(word: &str) -> Option<Kind> {
    let kind = match word {
        "MODULE" => Kind::Module,
        "PROCEDURE" => Kind::Procedure,
        "VAR" => Kind::Var,
        "BEGIN" => Kind::Begin,
        "END" => Kind::End,
        "IF" => Kind::If,
        "THEN" => Kind::Then,
        "ELSE" => Kind::Else,
        "ELSIF" => Kind::Elsif,
        "WHILE" => Kind::While,
        "DO" => Kind::Do,
        "ARRAY" => Kind::Array,
        "RECORD" => Kind::Record,
        "CONST" => Kind::Const,
        "TYPE" => Kind::Type,
        // logical operators share the additive class
        "OR" | "AND" => Kind::AddOp,
        "DIV" | "MOD" => Kind::MulOp,
        "INTEGER" => Kind::IntegerType,
        "REAL" => Kind::RealType,
        "CHAR" => Kind::CharType,
        "READ" => Kind::Read,
        "WRITE" => Kind::Write,
        "WRITELN" => Kind::WriteLn,
        _ => return None,
    };
    Some(kind)
}

/// Lazily tokenize `content`. The stream ends with exactly one `Kind::Eof`.
pub fn tokenize<'a>(content: &'a str) -> impl Iterator<Item = Lexeme> + 'a {
    let mut cursor = cursor::Cursor::new(content);
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let token = cursor.advance_token();
        if token.is(Kind::Eof) {
            done = true;
        }
        Some(token)
    })
}

impl cursor::Cursor<'_> {
    pub fn advance_token(&mut self) -> Lexeme {
        loop {
            self.eat_while(is_whitespace);
            if self.first() == '(' && self.second() == '*' {
                let line = self.line();
                if !self.block_comment() {
                    return Lexeme::text(Kind::Error, line, "unterminated comment");
                }
                continue;
            }
            break;
        }
        let line = self.line();
        self.advance_token_(line)
    }

    fn advance_token_(&mut self, line: usize) -> Lexeme {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return Lexeme::new(Kind::Eof, line, Value::None),
        };
        let kind = match first_char {
            ':' => match self.first() {
                '=' => {
                    self.bump();
                    return Lexeme::text(Kind::AssignOp, line, ":=");
                }
                _ => Kind::Colon,
            },
            '<' | '>' => match self.first() {
                '=' => {
                    self.bump();
                    return Lexeme::text(Kind::RelOp, line, format!("{}=", first_char));
                }
                _ => Kind::RelOp,
            },
            '#' => Kind::RelOp,
            '=' => Kind::Equal,
            '+' => Kind::AddOp,
            '-' => Kind::Minus,
            '*' | '/' | '&' => Kind::MulOp,
            '~' => Kind::Tilde,
            '{' | '}' | '[' | ']' => Kind::Symbol,
            ',' => Kind::Comma,
            ';' => Kind::SemiColon,
            '(' => Kind::LParen,
            ')' => Kind::RParen,
            '.' if is_digit(self.first()) => return self.number(line),
            '.' => Kind::Period,
            '"' | '\'' => return self.str(line),
            c if is_digit(c) => return self.number(line),
            c if is_id_start(c) => {
                let mut ident = String::new();
                ident.push(c);
                self.ident_continue(&mut ident);
                let kind = keyword(&ident).unwrap_or(Kind::Identifier);
                return Lexeme::text(kind, line, ident);
            }
            _ => Kind::Unknown,
        };
        Lexeme::text(kind, line, first_char.to_string())
    }

    // process `(*..*)`, returns false if the input ends inside the comment
    fn block_comment(&mut self) -> bool {
        // bump `(*`
        self.bump();
        self.bump();
        // nested depth of block comments
        let mut depth = 1_usize;
        while let Some(c) = self.bump() {
            match c {
                '(' if self.first() == '*' => {
                    self.bump();
                    depth += 1;
                }
                '*' if self.first() == ')' => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => (),
            }
        }
        depth == 0
    }

    fn ident_continue(&mut self, ident: &mut String) {
        debug_assert!(is_id_start(self.prev()));
        // Start is already eaten, eat the rest of identifier.
        self.eat_while_back(ident, is_id_continue);
    }

    fn str(&mut self, line: usize) -> Lexeme {
        let quote = self.prev();
        debug_assert!(quote == '"' || quote == '\'');
        let mut buf = String::new();
        self.eat_while_back(&mut buf, |c| c != quote && c != '\n');
        if self.first() != quote {
            Lexeme::text(Kind::Error, line, "unterminated string literal")
        } else {
            self.bump();
            Lexeme::text(Kind::Str, line, buf)
        }
    }

    fn number(&mut self, line: usize) -> Lexeme {
        let mut buf = String::new();
        buf.push(self.prev());
        self.eat_while_back(&mut buf, is_digit);
        let is_real = if buf.starts_with('.') {
            true
        } else if self.first() == '.' && is_digit(self.second()) {
            self.bump();
            buf.push('.');
            self.eat_while_back(&mut buf, is_digit);
            true
        } else {
            false
        };
        if is_real {
            match buf.parse::<f64>() {
                Ok(r) => Lexeme::new(Kind::Number, line, Value::Real(r)),
                Err(_) => Lexeme::text(Kind::Error, line, format!("invalid number {}", buf)),
            }
        } else {
            match buf.parse::<i64>() {
                Ok(i) => Lexeme::new(Kind::Number, line, Value::Int(i)),
                Err(_) => Lexeme::text(Kind::Error, line, format!("integer {} out of range", buf)),
            }
        }
    }
}

pub fn is_whitespace(c: char) -> bool {
    // This is Pattern_White_Space.
    matches!(
        c,
        '\u{0009}'   // \t
        | '\u{000A}' // \n
        | '\u{000B}' // vertical tab
        | '\u{000C}' // form feed
        | '\u{000D}' // \r
        | '\u{0020}' // space
        | '\u{0085}'
        | '\u{200E}'
        | '\u{200F}'
        | '\u{2028}'
        | '\u{2029}'
    )
}

// `_` is reserved for compiler generated names (`_t0`, `_S0`).
pub fn is_id_start(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_start(c)
}

pub fn is_id_continue(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_continue(c)
}

pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}
