// パス: src/repl/line_editor.rs
// 役割: プロンプト表示付きの行編集と入力履歴の保持・永続化
// 意図: Ctrl-C をその場で中断結果として呼び出し側へ返し、履歴は上下キーで呼び戻せるようにする
// 関連ファイル: src/repl/cmd.rs, src/repl/continuation.rs, src/bin/gop.rs
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

pub const HISTORY_ENV: &str = "GOP_HISTORY_FILE";
const MAX_HISTORY: usize = 1000;

/// 行入力が返す 3 種類の結果を表す列挙体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Line(String),
    Eof,
    Interrupted,
}

/// rustyline による行エディタ。履歴は最大 1000 件で、直前と同じ入力は積まない。
pub struct LineEditor {
    editor: Editor<(), DefaultHistory>,
    history_path: Option<PathBuf>,
    // 子プロセス実行中に端末から届いた SIGINT を記録するフラグ
    interrupted: Arc<AtomicBool>,
}

impl LineEditor {
    pub fn new(history_path: Option<PathBuf>, interrupted: Arc<AtomicBool>) -> io::Result<Self> {
        let config = Config::builder()
            .max_history_size(MAX_HISTORY)
            .and_then(|b| b.history_ignore_dups(true))
            .map_err(readline_io)?
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config).map_err(readline_io)?;
        if let Some(path) = history_path.as_deref() {
            match editor.load_history(path) {
                Ok(()) => {}
                Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(error = %e, "failed to read history file"),
            }
        }
        Ok(Self {
            editor,
            history_path,
            interrupted,
        })
    }

    /// プロンプトを出力し、1 行分の入力または制御結果を取得する。
    ///
    /// 入力中の Ctrl-C は即座に `Interrupted` になる。
    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            tracing::debug!("SIGINT was delivered while a program was running");
        }
        read_result(self.editor.readline(prompt))
    }

    /// 空行は履歴に積まない。
    pub fn add_history(&mut self, entry: &str) {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Err(e) = self.editor.add_history_entry(trimmed) {
            tracing::warn!(error = %e, "failed to add history entry");
        }
    }

    pub fn save_history(&mut self) -> io::Result<()> {
        let Some(path) = self.history_path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.editor.save_history(path).map_err(readline_io)
    }

    /// 古い順の履歴。
    pub fn history_entries(&self) -> Vec<String> {
        self.editor.history().iter().cloned().collect()
    }
}

fn read_result(raw: Result<String, ReadlineError>) -> io::Result<ReadResult> {
    match raw {
        Ok(line) => Ok(ReadResult::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(ReadResult::Interrupted),
        Err(ReadlineError::Eof) => Ok(ReadResult::Eof),
        Err(e) => Err(readline_io(e)),
    }
}

fn readline_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

/// SIGINT をプロセス全体で吸収し、受信を記録するフラグを返す。
///
/// 実行中の子プロセスは端末からの割り込みで終了するが、REPL 自身は終了しない。
pub fn install_interrupt_flag() -> io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
    Ok(flag)
}

/// 履歴ファイルの場所。環境変数があればそれを、無ければ `<home>/history`。
pub fn history_path(home: &Path) -> PathBuf {
    match env::var_os(HISTORY_ENV) {
        Some(path) => PathBuf::from(path),
        None => home.join("history"),
    }
}
