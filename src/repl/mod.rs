// パス: src/repl/mod.rs
// 役割: 対話フロントエンドのモジュール群と公開 API
// 意図: コマンド解釈・継続入力・行入力・テンプレートを役割ごとに分ける
// 関連ファイル: src/repl/cmd.rs, src/session.rs, src/bin/gop.rs
//! gop の対話環境を構成するモジュール群をまとめたファサード。
//!
//! - `cmd`: メインループとコマンド解釈
//! - `continuation`: 複数行入力と継続プロンプト
//! - `line_editor`: 行入力と履歴
//! - `template`: テンプレートの保存・読込
//! - `printer`: 固定文言

pub mod cmd;
pub mod continuation;
pub mod line_editor;
mod printer;
pub mod template;

pub use cmd::{
    parse_repl_command, run_repl, run_repl_with, Dispatch, ReplCommand, ReplLineSource, ReplMsg,
    ReplShell,
};
pub use continuation::{count_depth, ContinuationBuffer};
pub use line_editor::{install_interrupt_flag, LineEditor, ReadResult};
pub use template::TemplateStore;
