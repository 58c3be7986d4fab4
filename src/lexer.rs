// パス: src/lexer.rs
// 役割: Go ソース断片向けの字句解析器とトークン定義を提供する
// 意図: 断片の完結判定・分割・深さ計算に必要な位置付きトークンを生成する
// 関連ファイル: src/parser.rs, src/errors.rs, src/repl/continuation.rs
//! 字句解析モジュール
//!
//! - Go の字句規則（識別子・キーワード・数値/文字/文字列/生文字列リテラル・コメント・演算子）に従う。
//! - 改行および入力末尾でのセミコロン自動挿入を再現する。挿入されたセミコロンの値は `"\n"`。
//! - 入力末尾で閉じていない生文字列・ブロックコメントは `unexpected_eof` 付きのエラーとして返す。

use crate::errors::LexerError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Token {
    /// 改行または入力末尾で自動挿入されたセミコロンかどうか。
    pub fn is_auto_semi(&self) -> bool {
        self.kind == TokenKind::Semi && self.value == "\n"
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.value == op
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.value == kw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    Eof,
    Ident,
    Keyword,
    Int,
    Float,
    Imag,
    Char,
    String,
    Op,
    Semi,
}

/// Go の予約語。
pub const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

// 最長一致のため長い順に並べる。
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "&^=", "...", "&&", "||", "<-", "++", "--", "==", "!=", "<=", ">=", ":=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^", "+", "-", "*", "/", "%", "&", "|",
    "^", "<", ">", "=", "!", "~", "(", ")", "[", "]", "{", "}", ",", ".", ":",
];

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    /// 入力全体を 1 度だけ走査して行頭インデックスを収集する。
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + 1);
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos.min(src.len())].chars().count() + 1;
        (idx + 1, col)
    }

    /// 指定行に対応するテキスト断片を返す（改行は除去する）。
    fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|idx| self.starts.get(idx)) else {
            return "";
        };
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

fn is_letter(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_rest(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
    tokens: Vec<Token>,
    // 直前のトークンが行末でセミコロン挿入を引き起こすか
    need_semi: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
            tokens: Vec::new(),
            need_semi: false,
        }
    }

    /// 末尾まで走査し、得られたトークンと最初のエラー（あれば）を返す。
    fn run(mut self) -> (Vec<Token>, Option<LexerError>) {
        let result = self.scan_all();
        if result.is_ok() {
            self.insert_semi(self.src.len());
        }
        let len = self.src.len();
        self.push(TokenKind::Eof, len, len);
        (self.tokens, result.err())
    }

    fn scan_all(&mut self) -> Result<(), LexerError> {
        while let Some(ch) = self.peek_char() {
            match ch {
                '\n' => {
                    self.insert_semi(self.cursor);
                    self.cursor += 1;
                }
                ' ' | '\t' | '\r' => self.cursor += 1,
                '/' if self.starts_with("//") => self.skip_line_comment(),
                '/' if self.starts_with("/*") => self.skip_block_comment()?,
                _ => self.lex_token()?,
            }
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        // 改行自体は残しておき、セミコロン挿入は次の反復に任せる。
        match self.src[self.cursor..].find('\n') {
            Some(off) => self.cursor += off,
            None => self.cursor = self.src.len(),
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        let Some(off) = self.src[start + 2..].find("*/") else {
            return Err(self
                .err("LEX001", "ブロックコメントが閉じていません", start)
                .eof());
        };
        let end = start + 2 + off + 2;
        // 改行を含むブロックコメントは改行として振る舞う。
        if self.src[start..end].contains('\n') {
            self.insert_semi(start);
        }
        self.cursor = end;
        Ok(())
    }

    fn lex_token(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        let Some(ch) = self.peek_char() else {
            return Ok(());
        };
        if ch == ';' {
            self.cursor += 1;
            self.push(TokenKind::Semi, start, self.cursor);
            return Ok(());
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_second_char().is_some_and(|c| c.is_ascii_digit())) {
            self.lex_number();
            return Ok(());
        }
        if is_letter(ch) {
            self.lex_identifier_or_keyword();
            return Ok(());
        }
        match ch {
            '\'' => return self.lex_quoted('\'', TokenKind::Char, "LEX002", "文字リテラルが閉じていません"),
            '"' => return self.lex_quoted('"', TokenKind::String, "LEX003", "文字列リテラルが閉じていません"),
            '`' => return self.lex_raw_string(),
            _ => {}
        }
        if let Some(op) = OPERATORS.iter().find(|op| self.starts_with(op)) {
            self.cursor += op.len();
            self.push(TokenKind::Op, start, self.cursor);
            return Ok(());
        }
        Err(self.err("LEX090", format!("不正な文字です: {:?}", ch), start))
    }

    fn lex_quoted(
        &mut self,
        quote: char,
        kind: TokenKind,
        code: &'static str,
        msg: &str,
    ) -> Result<(), LexerError> {
        let start = self.cursor;
        self.cursor += 1;
        let mut escaped = false;
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.cursor += ch.len_utf8();
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                self.push(kind, start, self.cursor);
                return Ok(());
            }
        }
        // 解釈付きリテラルは行をまたげないため、続きを待っても完結しない。
        Err(self.err(code, msg, start))
    }

    fn lex_raw_string(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        match self.src[start + 1..].find('`') {
            Some(off) => {
                self.cursor = start + 1 + off + 1;
                self.push(TokenKind::String, start, self.cursor);
                Ok(())
            }
            None => Err(self
                .err("LEX004", "生文字列リテラルが閉じていません", start)
                .eof()),
        }
    }

    fn lex_number(&mut self) {
        let start = self.cursor;
        let hex = self.starts_with("0x") || self.starts_with("0X");
        while let Some(ch) = self.peek_char() {
            let exponent = if hex {
                matches!(ch, 'p' | 'P')
            } else {
                matches!(ch, 'e' | 'E')
            };
            if exponent && matches!(self.peek_second_char(), Some('+') | Some('-')) {
                self.cursor += 2;
                continue;
            }
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.cursor += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.cursor];
        let kind = if text.ends_with('i') {
            TokenKind::Imag
        } else if text.contains('.')
            || (hex && text.contains(['p', 'P']))
            || (!hex && text.contains(['e', 'E']))
        {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        self.push(kind, start, self.cursor);
    }

    fn lex_identifier_or_keyword(&mut self) {
        let start = self.cursor;
        while let Some(ch) = self.peek_char() {
            if is_ident_rest(ch) {
                self.cursor += ch.len_utf8();
            } else {
                break;
            }
        }
        let kind = if KEYWORDS.contains(&&self.src[start..self.cursor]) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.push(kind, start, self.cursor);
    }

    fn insert_semi(&mut self, pos: usize) {
        if self.need_semi {
            let (line, col) = self.line_map.locate(self.src, pos);
            self.tokens.push(Token {
                kind: TokenKind::Semi,
                value: "\n".into(),
                pos,
                end: pos,
                line,
                col,
            });
            self.need_semi = false;
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let (line, col) = self.line_map.locate(self.src, start);
        let value = &self.src[start..end];
        self.need_semi = match kind {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String => true,
            TokenKind::Keyword => matches!(value, "break" | "continue" | "fallthrough" | "return"),
            TokenKind::Op => matches!(value, "++" | "--" | ")" | "]" | "}"),
            TokenKind::Semi | TokenKind::Eof => false,
        };
        self.tokens.push(Token {
            kind,
            value: value.into(),
            pos: start,
            end,
            line,
            col,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn peek_second_char(&self) -> Option<char> {
        let mut iter = self.src[self.cursor..].chars();
        iter.next()?;
        iter.next()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.src[self.cursor..].starts_with(pattern)
    }

    fn err(&self, code: &'static str, message: impl Into<String>, pos: usize) -> LexerError {
        let (line, col) = self.line_map.locate(self.src, pos);
        LexerError::at_with_snippet(
            code,
            message,
            Some(pos),
            Some(line),
            Some(col),
            self.line_map.line_text(self.src, line).to_string(),
        )
    }
}

/// ソース全体をトークン列へ変換する。末尾には必ず `Eof` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    match Lexer::new(src).run() {
        (tokens, None) => Ok(tokens),
        (_, Some(err)) => Err(err),
    }
}

/// エラー位置の手前までのトークンを返す寛容版。入力途中の深さ計算に使う。
pub fn lex_lossy(src: &str) -> Vec<Token> {
    Lexer::new(src).run().0
}
