// パス: src/session.rs
// 役割: 断片 1 つ分の「適用 → コンパイル → 診断調整 → 再コンパイル → 実行 → 確定 / 巻き戻し」を管理する
// 意図: 失敗した断片がワークスペースに痕跡を残さないことを保証する
// 関連ファイル: src/workspace.rs, src/driver.rs, src/reconcile.rs, src/repl/cmd.rs
//! 投機ビルドのトランザクション。
//!
//! ワークスペースはセッションが所有し、グローバル状態は持たない。
//! コンパイルは 1 断片につき最大 2 回（診断調整後の再試行は 1 回だけ）。

use crate::assembler::{render, RenderOptions};
use crate::driver::{BuildDriver, Toolchain};
use crate::errors::ReplError;
use crate::parser::{parse_fragment, split_index_prefix, FragmentError};
use crate::reconcile::reconcile;
use crate::workspace::{EchoStyle, ItemKind, Workspace};

/// `submit` の結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// 入力途中。呼び出し側はバッファを保持して続きを読む。
    Incomplete,
    /// ビルドと無出力の実行に成功し、断片が確定した。
    Committed,
    /// 空の断片。ビルドもしていない。
    Unchanged,
}

/// 1 回のコンパイル試行の帰結。
#[derive(Debug, Clone, PartialEq, Eq)]
enum BuildStep {
    Compiled,
    NeedsReconciliation(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

pub struct Session<T: Toolchain> {
    workspace: Workspace,
    driver: BuildDriver<T>,
    echo: EchoStyle,
    default_imports: Vec<String>,
}

impl<T: Toolchain> Session<T> {
    pub fn new(driver: BuildDriver<T>, echo: EchoStyle, default_imports: Vec<String>) -> Self {
        Self {
            workspace: Workspace::with_default_imports(&default_imports),
            driver,
            echo,
            default_imports,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn driver(&self) -> &BuildDriver<T> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut BuildDriver<T> {
        &mut self.driver
    }

    pub fn echo_style(&self) -> EchoStyle {
        self.echo
    }

    /// 断片（先頭に挿入位置を付けてもよい）を投機的に適用する。
    ///
    /// 失敗時はワークスペースを適用前の状態へ戻してからエラーを返す。
    pub fn submit(&mut self, line: &str) -> Result<Submission, ReplError> {
        let (pos, text) = split_index_prefix(line);
        let fragment = match parse_fragment(text) {
            Ok(fragment) => fragment,
            Err(FragmentError::Incomplete) => return Ok(Submission::Incomplete),
            Err(FragmentError::Syntax(err)) => return Err(err.into()),
        };
        if fragment.is_empty() {
            return Ok(Submission::Unchanged);
        }

        let snapshot = self.workspace.snapshot();
        tracing::debug!(?pos, "snapshot taken before applying fragment");
        self.workspace.apply(fragment, pos, self.echo);

        match self.speculative_build() {
            Ok(()) => {
                tracing::debug!("fragment committed");
                Ok(Submission::Committed)
            }
            Err(err) => {
                self.workspace.restore(snapshot);
                tracing::debug!(error = %err, "fragment rolled back");
                Err(err)
            }
        }
    }

    fn speculative_build(&mut self) -> Result<(), ReplError> {
        let mut attempt = Attempt::First;
        loop {
            match self.compile_step(attempt)? {
                BuildStep::Compiled => break,
                BuildStep::NeedsReconciliation(diagnostics) => {
                    let moves = reconcile(&mut self.workspace, &diagnostics);
                    tracing::debug!(moved = moves.len(), "retrying compile after reconciliation");
                    attempt = Attempt::Retry;
                }
                BuildStep::Failed(diagnostics) => return Err(ReplError::Compile { diagnostics }),
            }
        }

        let report = self.driver.run(&self.workspace.argv)?;
        if report.had_effect() {
            return Err(ReplError::RunHadEffect {
                status: report.status,
            });
        }
        Ok(())
    }

    fn compile_step(&mut self, attempt: Attempt) -> Result<BuildStep, ReplError> {
        let source = render(&self.workspace, RenderOptions::compile());
        tracing::debug!(?attempt, "compile attempt");
        let report = self.driver.compile(&source)?;
        Ok(match (report.success, attempt) {
            (true, _) => BuildStep::Compiled,
            (false, Attempt::First) => BuildStep::NeedsReconciliation(report.diagnostics),
            (false, Attempt::Retry) => BuildStep::Failed(report.diagnostics),
        })
    }

    pub fn render(&self, opts: RenderOptions) -> String {
        render(&self.workspace, opts)
    }

    /// 要素を削除し、読み飛ばした番号への警告を返す。
    pub fn remove_items(&mut self, kind: ItemKind, spec: &str) -> Result<Vec<String>, ReplError> {
        self.workspace
            .remove_items(kind, spec)
            .map_err(ReplError::Command)
    }

    pub fn reset(&mut self) {
        self.workspace.reset(&self.default_imports);
    }

    /// ワークスペースを空にし、行列から断片を組み直して直接取り込む（ビルドはしない）。
    ///
    /// 行は断片が完結するまで連結する。構文エラーの断片で中断し、それまでの取り込みは残す。
    /// どちらの場合も最後に既定の非アクティブ候補を戻す。
    pub fn replace_all<I, S>(&mut self, lines: I) -> Result<usize, ReplError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.workspace.active.clear();
        self.workspace.inactive.clear();
        self.workspace.definitions.clear();
        self.workspace.statements.clear();

        let mut merged = 0usize;
        let mut pending = String::new();
        let mut outcome = Ok(());
        for line in lines {
            pending.push_str(line.as_ref());
            pending.push('\n');
            match parse_fragment(&pending) {
                Ok(fragment) => {
                    if !fragment.is_empty() {
                        self.workspace.merge_direct(fragment);
                        merged += 1;
                    }
                    pending.clear();
                }
                Err(FragmentError::Incomplete) => {}
                Err(FragmentError::Syntax(err)) => {
                    outcome = Err(ReplError::Syntax(err));
                    break;
                }
            }
        }
        if outcome.is_ok() && !pending.trim().is_empty() {
            tracing::warn!(pending = %pending.trim(), "template ended inside an unfinished fragment");
        }
        self.workspace.restore_default_imports(&self.default_imports);
        outcome.map(|_| merged)
    }

    pub fn set_argv(&mut self, text: &str) {
        self.workspace.argv = text.trim().to_string();
    }

    pub fn argv(&self) -> &str {
        &self.workspace.argv
    }
}
