// パス: src/repl/continuation.rs
// 役割: 複数行入力のバッファとネスト深さ、プロンプト文字列、履歴用の 1 行化を扱う
// 意図: 開いた括弧が残る間は継続プロンプトを深さ分インデントして出し続ける
// 関連ファイル: src/repl/cmd.rs, src/lexer.rs
use crate::lexer::{lex_lossy, TokenKind};

pub const PROMPT: &str = "GOP$ ";
pub const CONTINUATION_PROMPT: &str = ".....";
const INDENT: &str = "    ";

/// 継続入力中のバッファ。
#[derive(Debug, Default)]
pub struct ContinuationBuffer {
    buffer: String,
    depth: usize,
}

impl ContinuationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の入力に使うプロンプト。バッファが空なら通常プロンプト。
    pub fn prompt(&self) -> String {
        if self.buffer.is_empty() {
            PROMPT.to_string()
        } else {
            format!("{}{}", CONTINUATION_PROMPT, INDENT.repeat(self.depth))
        }
    }

    pub fn push_line(&mut self, line: &str) -> &str {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);
        &self.buffer
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// 深さを数え直す。浅くなった場合は直前の行を浅いプロンプトで描き直す制御列を返す。
    pub fn reindent(&mut self) -> Option<String> {
        let previous = self.depth;
        self.depth = count_depth(&self.buffer);
        if self.depth >= previous {
            return None;
        }
        let mut lines = self.buffer.split('\n');
        let last = lines.next_back()?;
        lines.next()?;
        // カーソルを 1 行上へ戻し、行頭から描き直して右側を消す。
        Some(format!("\x1b[1A\r{}{}\x1b[0K\n", self.prompt(), last))
    }

    /// バッファを確定して空にし、履歴へ積む 1 行表現を返す。
    pub fn accept(&mut self) -> String {
        let entry = collapse_for_history(&self.buffer);
        self.cancel();
        entry
    }

    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.depth = 0;
    }
}

/// `{` `(` の数から `}` `)` の数を引いた値。負にはならない。
pub fn count_depth(src: &str) -> usize {
    let depth: i64 = lex_lossy(src)
        .iter()
        .filter(|t| t.kind == TokenKind::Op)
        .map(|t| match t.value.as_str() {
            "{" | "(" => 1,
            "}" | ")" => -1,
            _ => 0,
        })
        .sum();
    usize::try_from(depth).unwrap_or(0)
}

/// 空行を落とし、最初と最後の改行は詰め、残りの改行は `;` にする。
fn collapse_for_history(buffer: &str) -> String {
    let lines: Vec<&str> = buffer.split('\n').filter(|l| !l.is_empty()).collect();
    match lines.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, middle @ .., last] => format!("{}{}{}", first, middle.join(";"), last),
    }
}
