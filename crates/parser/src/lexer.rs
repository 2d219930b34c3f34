use kata_data::Span;

pub type SourceSpan = Span<u32>;

/// Which flavour of string literal a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKind {
    Normal,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Invalid,
    Ident,
    StrLit(StrKind),
    Eof,
    Builtin,
    Equal,
    LParen,
    RParen,
    Semicolon,
    Percent,
    LBrace,
    RBrace,
    Period,
    Ellipsis2,
    Ellipsis3,
    Minus,
    Arrow,
    Colon,
    Slash,
    Comma,
    Ampersand,
    AmpersandEqual,
    NumberLiteral,

    KeywordAlign,
    KeywordAnd,
    KeywordAsm,
    KeywordBreak,
    KeywordColdcc,
    KeywordComptime,
    KeywordConst,
    KeywordContinue,
    KeywordDefer,
    KeywordElse,
    KeywordEnum,
    KeywordError,
    KeywordExport,
    KeywordExtern,
    KeywordFalse,
    KeywordFn,
    KeywordFor,
    KeywordGoto,
    KeywordIf,
    KeywordInline,
    KeywordNakedcc,
    KeywordNoalias,
    KeywordNull,
    KeywordOr,
    KeywordPacked,
    KeywordPub,
    KeywordReturn,
    KeywordStdcallcc,
    KeywordStruct,
    KeywordSwitch,
    KeywordTest,
    KeywordThis,
    KeywordTrue,
    KeywordUndefined,
    KeywordUnion,
    KeywordUnreachable,
    KeywordUse,
    KeywordVar,
    KeywordVolatile,
    KeywordWhile,
}

/// A lexeme classification and its byte range. The text is always recovered
/// by slicing the source buffer; tokens never own it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

impl Token {
    pub fn slice<'src>(&self, source: &'src str) -> &'src str {
        &source[self.span.usize_range()]
    }
}

fn keyword(lexeme: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match lexeme {
        "align" => KeywordAlign,
        "and" => KeywordAnd,
        "asm" => KeywordAsm,
        "break" => KeywordBreak,
        "coldcc" => KeywordColdcc,
        "comptime" => KeywordComptime,
        "const" => KeywordConst,
        "continue" => KeywordContinue,
        "defer" => KeywordDefer,
        "else" => KeywordElse,
        "enum" => KeywordEnum,
        "error" => KeywordError,
        "export" => KeywordExport,
        "extern" => KeywordExtern,
        "false" => KeywordFalse,
        "fn" => KeywordFn,
        "for" => KeywordFor,
        "goto" => KeywordGoto,
        "if" => KeywordIf,
        "inline" => KeywordInline,
        "nakedcc" => KeywordNakedcc,
        "noalias" => KeywordNoalias,
        "null" => KeywordNull,
        "or" => KeywordOr,
        "packed" => KeywordPacked,
        "pub" => KeywordPub,
        "return" => KeywordReturn,
        "stdcallcc" => KeywordStdcallcc,
        "struct" => KeywordStruct,
        "switch" => KeywordSwitch,
        "test" => KeywordTest,
        "this" => KeywordThis,
        "true" => KeywordTrue,
        "undefined" => KeywordUndefined,
        "union" => KeywordUnion,
        "unreachable" => KeywordUnreachable,
        "use" => KeywordUse,
        "var" => KeywordVar,
        "volatile" => KeywordVolatile,
        "while" => KeywordWhile,
        _ => return None,
    })
}

pub fn token_description(kind: TokenKind) -> &'static str {
    use TokenKind::*;
    match kind {
        Invalid => "invalid bytes",
        Ident => "identifier",
        StrLit(_) => "string literal",
        Eof => "end of file",
        Builtin => "builtin",
        Equal => "`=`",
        LParen => "`(`",
        RParen => "`)`",
        Semicolon => "`;`",
        Percent => "`%`",
        LBrace => "`{`",
        RBrace => "`}`",
        Period => "`.`",
        Ellipsis2 => "`..`",
        Ellipsis3 => "`...`",
        Minus => "`-`",
        Arrow => "`->`",
        Colon => "`:`",
        Slash => "`/`",
        Comma => "`,`",
        Ampersand => "`&`",
        AmpersandEqual => "`&=`",
        NumberLiteral => "number literal",
        KeywordAlign => "`align`",
        KeywordAnd => "`and`",
        KeywordAsm => "`asm`",
        KeywordBreak => "`break`",
        KeywordColdcc => "`coldcc`",
        KeywordComptime => "`comptime`",
        KeywordConst => "`const`",
        KeywordContinue => "`continue`",
        KeywordDefer => "`defer`",
        KeywordElse => "`else`",
        KeywordEnum => "`enum`",
        KeywordError => "`error`",
        KeywordExport => "`export`",
        KeywordExtern => "`extern`",
        KeywordFalse => "`false`",
        KeywordFn => "`fn`",
        KeywordFor => "`for`",
        KeywordGoto => "`goto`",
        KeywordIf => "`if`",
        KeywordInline => "`inline`",
        KeywordNakedcc => "`nakedcc`",
        KeywordNoalias => "`noalias`",
        KeywordNull => "`null`",
        KeywordOr => "`or`",
        KeywordPacked => "`packed`",
        KeywordPub => "`pub`",
        KeywordReturn => "`return`",
        KeywordStdcallcc => "`stdcallcc`",
        KeywordStruct => "`struct`",
        KeywordSwitch => "`switch`",
        KeywordTest => "`test`",
        KeywordThis => "`this`",
        KeywordTrue => "`true`",
        KeywordUndefined => "`undefined`",
        KeywordUnion => "`union`",
        KeywordUnreachable => "`unreachable`",
        KeywordUse => "`use`",
        KeywordVar => "`var`",
        KeywordVolatile => "`volatile`",
        KeywordWhile => "`while`",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Identifier,
    Builtin,
    C,
    StringLiteral,
    StringLiteralBackslash,
    Minus,
    Slash,
    LineComment,
    Zero,
    NumberLiteral,
    NumberDot,
    FloatFraction,
    FloatExponentUnsigned,
    FloatExponentNumber,
    Ampersand,
    Period,
    Period2,
}

/// Byte-at-a-time scanner over a source buffer. Each call to [`Lexer::next`]
/// runs the state machine from `Start` until one token is complete; once the
/// buffer is exhausted it keeps returning an `Eof` token whose offsets equal
/// the buffer length. Scanning never allocates and never fails: bytes that
/// match no rule become one-byte `Invalid` tokens, and a string literal cut
/// short by a newline surfaces as `Invalid` for the parser to report.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    index: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        _ = u32::try_from(source.len()).expect("source exceeds max len of 2^32-1");
        Self { source, index: 0 }
    }

    pub fn next(&mut self) -> Token {
        use TokenKind as T;

        let mut state = State::Start;
        let mut kind = T::Eof;
        let mut start = self.index;
        // offset of the `.` that opened a NumberDot, so `0..` can rewind
        let mut dot_index = self.index;

        'scan: loop {
            let Some(&c) = self.source.as_bytes().get(self.index) else {
                match state {
                    // unterminated at end of input
                    State::StringLiteral | State::StringLiteralBackslash => kind = T::Invalid,
                    State::LineComment => {
                        kind = T::Eof;
                        start = self.index;
                    }
                    _ => {}
                }
                break 'scan;
            };
            match state {
                State::Start => match c {
                    b' ' | b'\n' => {
                        self.index += 1;
                        start = self.index;
                    }
                    b'"' => {
                        kind = T::StrLit(StrKind::Normal);
                        state = State::StringLiteral;
                        self.index += 1;
                    }
                    b'c' => {
                        kind = T::Ident;
                        state = State::C;
                        self.index += 1;
                    }
                    b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                        kind = T::Ident;
                        state = State::Identifier;
                        self.index += 1;
                    }
                    b'@' => {
                        kind = T::Builtin;
                        state = State::Builtin;
                        self.index += 1;
                    }
                    b'=' => {
                        kind = T::Equal;
                        self.index += 1;
                        break 'scan;
                    }
                    b'(' => {
                        kind = T::LParen;
                        self.index += 1;
                        break 'scan;
                    }
                    b')' => {
                        kind = T::RParen;
                        self.index += 1;
                        break 'scan;
                    }
                    b';' => {
                        kind = T::Semicolon;
                        self.index += 1;
                        break 'scan;
                    }
                    b'%' => {
                        kind = T::Percent;
                        self.index += 1;
                        break 'scan;
                    }
                    b'{' => {
                        kind = T::LBrace;
                        self.index += 1;
                        break 'scan;
                    }
                    b'}' => {
                        kind = T::RBrace;
                        self.index += 1;
                        break 'scan;
                    }
                    b':' => {
                        kind = T::Colon;
                        self.index += 1;
                        break 'scan;
                    }
                    b',' => {
                        kind = T::Comma;
                        self.index += 1;
                        break 'scan;
                    }
                    b'.' => {
                        kind = T::Period;
                        state = State::Period;
                        self.index += 1;
                    }
                    b'-' => {
                        kind = T::Minus;
                        state = State::Minus;
                        self.index += 1;
                    }
                    b'/' => {
                        kind = T::Slash;
                        state = State::Slash;
                        self.index += 1;
                    }
                    b'&' => {
                        kind = T::Ampersand;
                        state = State::Ampersand;
                        self.index += 1;
                    }
                    b'0' => {
                        kind = T::NumberLiteral;
                        state = State::Zero;
                        self.index += 1;
                    }
                    b'1'..=b'9' => {
                        kind = T::NumberLiteral;
                        state = State::NumberLiteral;
                        self.index += 1;
                    }
                    _ => {
                        kind = T::Invalid;
                        self.index += 1;
                        break 'scan;
                    }
                },
                State::Identifier => match c {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => self.index += 1,
                    _ => break 'scan,
                },
                State::Builtin => match c {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => self.index += 1,
                    _ => break 'scan,
                },
                State::C => match c {
                    b'"' => {
                        kind = T::StrLit(StrKind::C);
                        state = State::StringLiteral;
                        self.index += 1;
                    }
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                        state = State::Identifier;
                        self.index += 1;
                    }
                    _ => break 'scan,
                },
                State::StringLiteral => match c {
                    b'"' => {
                        self.index += 1;
                        break 'scan;
                    }
                    b'\\' => {
                        state = State::StringLiteralBackslash;
                        self.index += 1;
                    }
                    // the newline is left for the next token; the parser
                    // reports the truncated literal
                    b'\n' => {
                        kind = T::Invalid;
                        break 'scan;
                    }
                    _ => self.index += 1,
                },
                State::StringLiteralBackslash => {
                    // one escaped byte, consumed unconditionally
                    state = State::StringLiteral;
                    self.index += 1;
                }
                State::Minus => match c {
                    b'>' => {
                        kind = T::Arrow;
                        self.index += 1;
                        break 'scan;
                    }
                    _ => break 'scan,
                },
                State::Slash => match c {
                    b'/' => {
                        state = State::LineComment;
                        self.index += 1;
                    }
                    _ => break 'scan,
                },
                State::LineComment => match c {
                    b'\n' => {
                        kind = T::Eof;
                        state = State::Start;
                        self.index += 1;
                        start = self.index;
                    }
                    _ => self.index += 1,
                },
                State::Zero => match c {
                    b'b' | b'o' | b'x' => {
                        state = State::NumberLiteral;
                        self.index += 1;
                    }
                    _ => state = State::NumberLiteral,
                },
                State::NumberLiteral => match c {
                    b'.' => {
                        state = State::NumberDot;
                        dot_index = self.index;
                        self.index += 1;
                    }
                    b'e' | b'E' | b'p' | b'P' => {
                        state = State::FloatExponentUnsigned;
                        self.index += 1;
                    }
                    // hex digits except the exponent letters
                    b'0'..=b'9' | b'a'..=b'd' | b'f' | b'A'..=b'D' | b'F' => self.index += 1,
                    _ => break 'scan,
                },
                State::NumberDot => match c {
                    // `0..10` lexes as a number and then a range; rewind so
                    // the next token starts at the first `.`
                    b'.' => {
                        self.index = dot_index;
                        break 'scan;
                    }
                    _ => state = State::FloatFraction,
                },
                State::FloatFraction => match c {
                    b'e' | b'E' | b'p' | b'P' => {
                        state = State::FloatExponentUnsigned;
                        self.index += 1;
                    }
                    b'0'..=b'9' | b'a'..=b'd' | b'f' | b'A'..=b'D' | b'F' => self.index += 1,
                    _ => break 'scan,
                },
                State::FloatExponentUnsigned => match c {
                    b'+' | b'-' => {
                        state = State::FloatExponentNumber;
                        self.index += 1;
                    }
                    _ => state = State::FloatExponentNumber,
                },
                State::FloatExponentNumber => match c {
                    b'0'..=b'9' | b'a'..=b'd' | b'f' | b'A'..=b'D' | b'F' => self.index += 1,
                    _ => break 'scan,
                },
                State::Ampersand => match c {
                    b'=' => {
                        kind = T::AmpersandEqual;
                        self.index += 1;
                        break 'scan;
                    }
                    _ => break 'scan,
                },
                State::Period => match c {
                    b'.' => {
                        kind = T::Ellipsis2;
                        state = State::Period2;
                        self.index += 1;
                    }
                    _ => break 'scan,
                },
                State::Period2 => match c {
                    b'.' => {
                        kind = T::Ellipsis3;
                        self.index += 1;
                        break 'scan;
                    }
                    _ => break 'scan,
                },
            }
        }

        if kind == TokenKind::Ident {
            if let Some(kw) = keyword(&self.source[start..self.index]) {
                kind = kw;
            }
        }

        Token { kind, span: SourceSpan::new(start as u32, self.index as u32) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next();
            if token.kind == TokenKind::Eof {
                return tokens;
            }
            tokens.push(token);
        }
    }

    fn lex_kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_single_char_tokens() {
        let kinds = lex_kinds("= ( ) ; % { } . : / , &");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Equal,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Percent,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Period,
                TokenKind::Colon,
                TokenKind::Slash,
                TokenKind::Comma,
                TokenKind::Ampersand,
            ]
        );
    }

    #[test]
    fn test_multi_char_operators() {
        let kinds = lex_kinds("-> - .. ... &= &");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Arrow,
                TokenKind::Minus,
                TokenKind::Ellipsis2,
                TokenKind::Ellipsis3,
                TokenKind::AmpersandEqual,
                TokenKind::Ampersand,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        let source = "align and asm break coldcc comptime const continue defer else enum \
                      error export extern false fn for goto if inline nakedcc noalias null \
                      or packed pub return stdcallcc struct switch test this true undefined \
                      union unreachable use var volatile while";
        let kinds = lex_kinds(source);
        assert_eq!(kinds.len(), 39);
        assert!(kinds.iter().all(|k| !matches!(k, TokenKind::Ident)));
        assert_eq!(kinds[0], TokenKind::KeywordAlign);
        assert_eq!(kinds[38], TokenKind::KeywordWhile);
    }

    #[test]
    fn test_identifier_not_keyword() {
        let kinds = lex_kinds("constant alignment pubx fnord _var");
        assert!(kinds.iter().all(|k| *k == TokenKind::Ident));
    }

    #[test]
    fn test_c_prefix() {
        assert_eq!(lex_kinds("c\"abc\""), vec![TokenKind::StrLit(StrKind::C)]);
        assert_eq!(lex_kinds("cabc"), vec![TokenKind::Ident]);
        assert_eq!(lex_kinds("c"), vec![TokenKind::Ident]);
    }

    #[test]
    fn test_string_literal() {
        let tokens = lex_all(r#" "hello" "#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::StrLit(StrKind::Normal));
        assert_eq!(tokens[0].span.usize_range(), 1..8);
    }

    #[test]
    fn test_string_escape() {
        let source = r#""a\"b""#;
        let tokens = lex_all(source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::StrLit(StrKind::Normal));
        assert_eq!(tokens[0].slice(source), source);
    }

    #[test]
    fn test_string_cut_by_newline() {
        let kinds = lex_kinds("\"abc\nfoo");
        assert_eq!(kinds, vec![TokenKind::Invalid, TokenKind::Ident]);
    }

    #[test]
    fn test_string_unterminated_at_eof() {
        assert_eq!(lex_kinds("\"abc"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_number_literals() {
        let kinds = lex_kinds("0 42 0x1f 0b101 0o7 3.14 1e10 1.5e+3 0x1p4");
        assert!(kinds.iter().all(|k| *k == TokenKind::NumberLiteral));
        assert_eq!(kinds.len(), 9);
    }

    #[test]
    fn test_number_then_range() {
        let source = "0..10";
        let tokens = lex_all(source);
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::NumberLiteral, TokenKind::Ellipsis2, TokenKind::NumberLiteral]
        );
        assert_eq!(tokens[0].slice(source), "0");
        assert_eq!(tokens[2].slice(source), "10");
    }

    #[test]
    fn test_number_fraction_not_range() {
        let source = "1.5";
        let tokens = lex_all(source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].slice(source), "1.5");
    }

    #[test]
    fn test_line_comment_discarded() {
        let kinds = lex_kinds("a // ignore me\nb");
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Ident]);
    }

    #[test]
    fn test_line_comment_at_eof() {
        assert_eq!(lex_kinds("a // trailing"), vec![TokenKind::Ident]);
    }

    #[test]
    fn test_builtin() {
        let source = "@import";
        let tokens = lex_all(source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Builtin);
        assert_eq!(tokens[0].slice(source), "@import");
    }

    #[test]
    fn test_invalid_byte() {
        assert_eq!(lex_kinds("#"), vec![TokenKind::Invalid]);
        assert_eq!(lex_kinds("\t"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_eof_token_offsets() {
        let source = "abc  ";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.next().kind, TokenKind::Ident);
        let eof = lexer.next();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.start, source.len() as u32);
        assert_eq!(eof.span.end, source.len() as u32);
        // next() past the end keeps returning the same token
        assert_eq!(lexer.next(), eof);
    }

    #[test]
    fn test_empty_input() {
        let mut lexer = Lexer::new("");
        let eof = lexer.next();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.usize_range(), 0..0);
    }

    // Tokens must tile the buffer: extents never overlap and every gap is
    // whitespace the scanner skipped.
    fn assert_tiles(source: &str) {
        let tokens = lex_all(source);
        let mut prev_end = 0usize;
        for token in &tokens {
            let range = token.span.usize_range();
            assert!(range.start >= prev_end, "overlapping tokens in {:?}", source);
            assert!(
                source[prev_end..range.start].bytes().all(|b| b == b' ' || b == b'\n'),
                "non-whitespace gap in {:?}",
                source
            );
            prev_end = range.end;
        }
        assert!(source[prev_end..].bytes().all(|b| b == b' ' || b == b'\n'));
    }

    #[test]
    fn test_tokens_tile_the_buffer() {
        assert_tiles("const a = b;\n");
        assert_tiles("  fn  main ( argc :  c_int )  ->  c_int { }\n\n");
        assert_tiles("0..10 ... -> &= c\"x\" @import");
        assert_tiles("   \n \n ");
    }

    #[test]
    fn test_span_round_trip() {
        let source = "  pub  fn  main  ";
        let tokens = lex_all(source);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].slice(source), "pub");
        assert_eq!(tokens[1].slice(source), "fn");
        assert_eq!(tokens[2].slice(source), "main");
    }
}
