// パス: src/driver.rs
// 役割: 組み立てたソースを固定パスへ書き出してコンパイルし、生成物を実行する
// 意図: 外部ツールチェーン呼び出しを Toolchain トレイトの背後に閉じ込め、テストで差し替え可能にする
// 関連ファイル: src/session.rs, src/reconcile.rs, tests/test_support.rs
//! ビルドドライバ。
//!
//! コンパイルと実行は独立した 2 回のサブプロセス呼び出しで、どちらもタイムアウトは持たない。
//! 実行時の stdout / stderr は 2 本のスレッドで並行に端末とメモリへ複製する。

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::NamedTempFile;

use crate::errors::ReplError;

/// コンパイル結果。診断は stdout / stderr を結合したそのままのテキスト。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub success: bool,
    pub diagnostics: String,
}

/// 実行結果。`status` はシグナル終了なら `None`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Option<i32>,
}

impl RunReport {
    /// 何か出力した、または非ゼロで終了したかどうか。
    pub fn had_effect(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty() || self.status != Some(0)
    }
}

/// 外部コンパイラと生成物実行の抽象。
pub trait Toolchain {
    fn compile(&mut self, source: &Path, artifact: &Path) -> io::Result<CompileReport>;
    fn execute(&mut self, artifact: &Path, argv: &[String]) -> io::Result<RunReport>;
}

/// `go build` と生成物の直接実行による実装。
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
}

impl GoToolchain {
    pub fn new(go: impl Into<PathBuf>) -> Self {
        Self { go: go.into() }
    }
}

impl Toolchain for GoToolchain {
    fn compile(&mut self, source: &Path, artifact: &Path) -> io::Result<CompileReport> {
        let output = Command::new(&self.go)
            .arg("build")
            .arg("-o")
            .arg(artifact)
            .arg(source)
            .stdin(Stdio::null())
            .output()?;
        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CompileReport {
            success: output.status.success(),
            diagnostics,
        })
    }

    fn execute(&mut self, artifact: &Path, argv: &[String]) -> io::Result<RunReport> {
        let mut child = Command::new(artifact)
            .args(argv)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let child_out = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdout を取得できません"))?;
        let child_err = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stderr を取得できません"))?;

        // 片方のパイプが詰まって子が止まらないよう、両ストリームを同時に吸い出す。
        let (stdout, stderr, status) = thread::scope(|scope| -> io::Result<_> {
            let out_copy = thread::Builder::new()
                .name("gop-run-stdout".to_string())
                .spawn_scoped(scope, move || tee(child_out, io::stdout()))?;
            let err_copy = thread::Builder::new()
                .name("gop-run-stderr".to_string())
                .spawn_scoped(scope, move || tee(child_err, io::stderr()))?;
            let status = child.wait()?;
            let stdout = join_copy(out_copy)?;
            let stderr = join_copy(err_copy)?;
            Ok((stdout, stderr, status))
        })?;

        Ok(RunReport {
            stdout,
            stderr,
            status: status.code(),
        })
    }
}

fn join_copy(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "出力コピー用スレッドが異常終了しました"))?
}

/// `src` を読み切るまで `sink` へ流しつつ、読んだ内容を返す。
pub fn tee<R: Read, W: Write>(mut src: R, mut sink: W) -> io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        // 端末側への書き込み失敗は捕捉結果に影響させない。
        let _ = sink.write_all(&buf[..n]).and_then(|_| sink.flush());
        captured.extend_from_slice(&buf[..n]);
    }
    Ok(captured)
}

/// ソースと生成物の固定パス。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub source: PathBuf,
    pub artifact: PathBuf,
}

impl BuildPaths {
    pub fn in_home(home: &Path) -> Self {
        let artifact = if cfg!(windows) { "gop.exe" } else { "gop" };
        Self {
            source: home.join("gop.go"),
            artifact: home.join(artifact),
        }
    }
}

pub struct BuildDriver<T: Toolchain> {
    toolchain: T,
    paths: BuildPaths,
}

impl<T: Toolchain> BuildDriver<T> {
    pub fn new(toolchain: T, paths: BuildPaths) -> Self {
        Self { toolchain, paths }
    }

    pub fn paths(&self) -> &BuildPaths {
        &self.paths
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn toolchain_mut(&mut self) -> &mut T {
        &mut self.toolchain
    }

    /// ソースを書き出してコンパイルする。非ゼロ終了か診断出力があれば失敗扱い。
    pub fn compile(&mut self, source_text: &str) -> Result<CompileReport, ReplError> {
        self.write_source(source_text)?;
        let report = self
            .toolchain
            .compile(&self.paths.source, &self.paths.artifact)?;
        let success = report.success && report.diagnostics.trim().is_empty();
        tracing::debug!(success, bytes = source_text.len(), "compiled workspace source");
        Ok(CompileReport {
            success,
            diagnostics: report.diagnostics,
        })
    }

    /// 生成物を argv 付きで実行する。
    pub fn run(&mut self, argv_text: &str) -> Result<RunReport, ReplError> {
        let argv = tokenize_argv(argv_text);
        let report = self.toolchain.execute(&self.paths.artifact, &argv)?;
        tracing::debug!(
            status = ?report.status,
            stdout = report.stdout.len(),
            stderr = report.stderr.len(),
            "ran artifact"
        );
        Ok(report)
    }

    // 同じディレクトリの一時ファイルへ書いてから置き換える。
    fn write_source(&self, text: &str) -> io::Result<()> {
        let dir = self
            .paths
            .source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.paths.source).map_err(|e| e.error)?;
        Ok(())
    }
}

static ARG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|[^\s"]+"#).expect("argv pattern is valid"));

/// 引数文字列を二重引用符を考慮して分割する。引用符は外し、`\"` は `"` に戻す。
pub fn tokenize_argv(text: &str) -> Vec<String> {
    ARG_TOKEN
        .find_iter(text)
        .map(|m| {
            let raw = m.as_str();
            let inner = raw
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(raw);
            inner.replace("\\\"", "\"")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_respects_quotes_and_escapes() {
        assert_eq!(
            tokenize_argv(r#"-n 3 "hello world" "say \"hi\"" plain"#),
            vec!["-n", "3", "hello world", "say \"hi\"", "plain"]
        );
        assert!(tokenize_argv("   ").is_empty());
    }

    #[test]
    fn run_report_effect_detection() {
        assert!(!RunReport { status: Some(0), ..Default::default() }.had_effect());
        assert!(RunReport { status: Some(1), ..Default::default() }.had_effect());
        assert!(RunReport { status: None, ..Default::default() }.had_effect());
        assert!(RunReport { stderr: b"x".to_vec(), status: Some(0), ..Default::default() }.had_effect());
    }

    #[test]
    fn tee_copies_to_sink_and_capture() {
        let mut sink = Vec::new();
        let captured = tee(&b"line one\nline two\n"[..], &mut sink).unwrap();
        assert_eq!(captured, sink);
        assert_eq!(captured, b"line one\nline two\n");
    }

    #[test]
    fn build_paths_live_under_home() {
        let paths = BuildPaths::in_home(Path::new("/tmp/gop-home"));
        assert_eq!(paths.source, Path::new("/tmp/gop-home/gop.go"));
        assert!(paths.artifact.starts_with("/tmp/gop-home"));
    }
}
