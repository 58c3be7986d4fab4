//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col / @pos）。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>,      // バイトオフセット（任意）
    pub line: Option<usize>,     // 1-origin（任意）
    pub col: Option<usize>,      // 1-origin（任意）
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
            line,
            col,
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col, self.pos) {
            (Some(l), Some(c), _) => write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?,
            (_, _, Some(p)) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = if c > 1 {
                " ".repeat(c - 1) + "^"
            } else {
                "^".to_string()
            };
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

/// 字句解析エラー。入力途中で終わった場合は `unexpected_eof` が立つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    pub info: ErrorInfo,
    pub unexpected_eof: bool,
}

impl LexerError {
    pub fn at_with_snippet(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            info: ErrorInfo::at(code, msg, pos, line, col).with_snippet(snippet),
            unexpected_eof: false,
        }
    }

    pub fn eof(mut self) -> Self {
        self.unexpected_eof = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub ErrorInfo);
impl ParseError {
    pub fn at(
        code: &'static str,
        msg: impl Into<String>,
        pos: Option<usize>,
        line: Option<usize>,
        col: Option<usize>,
    ) -> Self {
        Self(ErrorInfo::at(code, msg, pos, line, col))
    }
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        Self(err.info)
    }
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.info, f)
    }
}
impl StdError for LexerError {}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ParseError {}

/// REPL セッションが利用者へ返すエラー分類。
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("構文エラー: {0}")]
    Syntax(#[from] ParseError),
    #[error("{diagnostics}")]
    Compile { diagnostics: String },
    /// 実行が何らかの出力または非ゼロ終了を伴った。断片は保持されない。
    #[error("{}", run_effect_message(.status))]
    RunHadEffect { status: Option<i32> },
    #[error("ツールチェーンの実行に失敗しました: {0}")]
    Toolchain(#[from] io::Error),
    #[error("{context}: {source}")]
    Collaborator {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Command(String),
}

impl ReplError {
    pub fn collaborator(context: impl Into<String>, source: io::Error) -> Self {
        Self::Collaborator {
            context: context.into(),
            source,
        }
    }

    /// 利用者へ改めて表示すべきかどうか。
    ///
    /// 正常終了した実行の出力は既に端末へ流れているので再表示しない。
    pub fn needs_report(&self) -> bool {
        !matches!(self, Self::RunHadEffect { status: Some(0) })
    }
}

fn run_effect_message(status: &Option<i32>) -> String {
    match *status {
        Some(0) => "実行結果を出力したため断片は保持されません".to_string(),
        Some(code) => format!("exit status {}", code),
        None => "プログラムがシグナルで終了しました".to_string(),
    }
}
