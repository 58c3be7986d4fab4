// パス: src/lib.rs
// 役割: クレートのルート。各コンポーネントのモジュールを束ねる
// 意図: 断片パーサ・ワークスペース・組み立て・ビルド・診断調整・トランザクションを外から使えるようにする
// 関連ファイル: src/session.rs, src/workspace.rs, src/repl/mod.rs
//! gop (Rust) ルートモジュール
//!
//! Go プログラムを断片ごとに組み立て、受け付けるたびにコンパイルと実行をやり直す REPL。
//!
//! 構成:
//! - `lexer` / `parser`: Go 断片の字句解析と、宣言リスト / 文リストへの切り分け
//! - `workspace`: import 集合・定義・文・引数の保持と変更
//! - `assembler`: ワークスペースからのソース組み立て
//! - `driver`: コンパイルと実行（`Toolchain` で差し替え可能）
//! - `reconcile`: 未使用 / 未定義 import の診断に基づく調整
//! - `session`: 1 断片ごとの投機ビルドと確定 / 巻き戻し
//! - `repl`: 対話フロントエンド

pub mod assembler;
pub mod ast;
pub mod config;
pub mod driver;
pub mod errors;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod reconcile;
pub mod repl;
pub mod session;
pub mod workspace;

pub use crate::assembler::{render, RenderOptions};
pub use crate::driver::{BuildDriver, BuildPaths, CompileReport, GoToolchain, RunReport, Toolchain};
pub use crate::errors::{ErrorInfo, ParseError, ReplError};
pub use crate::session::{Session, Submission};
pub use crate::workspace::{EchoStyle, ItemKind, Workspace};
