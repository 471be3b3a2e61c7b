//! Tokenizer for DragonScript source text.

use logos::Logos;

use crate::base::{TextRange, TextSize};

use super::SyntaxError;

#[derive(Logos, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\f\r]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    #[token("\n")]
    Newline,
    #[token(";")]
    Semicolon,

    // Keywords
    #[token("abstract")]
    Abstract,
    #[token("and")]
    And,
    #[token("block")]
    Block,
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("cast")]
    Cast,
    #[token("castable")]
    Castable,
    #[token("catch")]
    Catch,
    #[token("class")]
    Class,
    #[token("continue")]
    Continue,
    #[token("downto")]
    Downto,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("enum")]
    Enum,
    #[token("extends")]
    Extends,
    #[token("false")]
    False,
    #[token("fixed")]
    Fixed,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("if")]
    If,
    #[token("implements")]
    Implements,
    #[token("interface")]
    Interface,
    #[token("namespace")]
    Namespace,
    #[token("native")]
    Native,
    #[token("not")]
    Not,
    #[token("null")]
    Null,
    #[token("or")]
    Or,
    #[token("pin")]
    Pin,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("requires")]
    Requires,
    #[token("return")]
    Return,
    #[token("select")]
    Select,
    #[token("static")]
    Static,
    #[token("step")]
    Step,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("to")]
    To,
    #[token("true")]
    True,
    #[token("try")]
    Try,
    #[token("typeof")]
    Typeof,
    #[token("var")]
    Var,
    #[token("while")]
    While,

    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,
    #[regex("0x[0-9a-fA-F]+")]
    HexInt,
    #[regex("[0-9]+")]
    Int,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,
    #[regex(r"'([^'\\\n]|\\.)'")]
    Byte,

    // Punctuation and operators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Assign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,

    /// Synthetic terminator appended after the last real token.
    Eof,
}

impl Token {
    /// Operator tokens that may name an operator function (`func int +(int v)`).
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Token::Assign
                | Token::MulAssign
                | Token::DivAssign
                | Token::ModAssign
                | Token::AddAssign
                | Token::SubAssign
                | Token::ShlAssign
                | Token::ShrAssign
                | Token::AndAssign
                | Token::OrAssign
                | Token::XorAssign
                | Token::AmpAmp
                | Token::PipePipe
                | Token::EqEq
                | Token::NotEq
                | Token::Le
                | Token::Ge
                | Token::Shl
                | Token::Shr
                | Token::Lt
                | Token::Gt
                | Token::PlusPlus
                | Token::MinusMinus
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Percent
                | Token::Amp
                | Token::Pipe
                | Token::Caret
                | Token::Tilde
                | Token::Bang
        )
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }
}

/// A token with its source slice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: Token,
    pub text: &'a str,
    pub range: TextRange,
}

/// Split `text` into lexemes, always ending with a single [`Token::Eof`].
///
/// Unrecognised characters are reported and skipped.
pub fn tokenize(text: &str) -> (Vec<Lexeme<'_>>, Vec<SyntaxError>) {
    let mut lexemes = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(text);

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        match token {
            Ok(kind) => lexemes.push(Lexeme {
                kind,
                text: lexer.slice(),
                range,
            }),
            Err(()) => errors.push(SyntaxError::new(
                format!("Unexpected character '{}'", lexer.slice()),
                range,
            )),
        }
    }

    lexemes.push(Lexeme {
        kind: Token::Eof,
        text: "",
        range: TextRange::empty(TextSize::of(text)),
    });
    (lexemes, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Token> {
        tokenize(text).0.into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("class Foo extends Bar"),
            vec![
                Token::Class,
                Token::Ident,
                Token::Extends,
                Token::Ident,
                Token::Eof
            ]
        );
        assert_eq!(kinds("classy"), vec![Token::Ident, Token::Eof]);
    }

    #[test]
    fn test_comments_and_continuations_are_skipped() {
        assert_eq!(
            kinds("a // tail\n/* block\n comment */ b \\\n c"),
            vec![
                Token::Ident,
                Token::Newline,
                Token::Ident,
                Token::Ident,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("1 2.5 0xff \"s\\\"x\" 'a'"),
            vec![
                Token::Int,
                Token::Float,
                Token::HexInt,
                Token::String,
                Token::Byte,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a <<= b << c <= d"),
            vec![
                Token::Ident,
                Token::ShlAssign,
                Token::Ident,
                Token::Shl,
                Token::Ident,
                Token::Le,
                Token::Ident,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_reported() {
        let (lexemes, errors) = tokenize("a $ b");
        assert_eq!(errors.len(), 1);
        assert_eq!(lexemes.len(), 3);
    }
}
