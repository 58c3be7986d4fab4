// パス: src/repl/cmd.rs
// 役割: REPL のコマンド解釈、断片の振り分け、入出力ループ
// 意図: 入力行をコマンドか Go の断片かに分け、セッションとテンプレート操作へ橋渡しする
// 関連ファイル: src/session.rs, src/repl/continuation.rs, src/repl/template.rs, src/repl/line_editor.rs
//! gop REPL におけるコマンド処理と入力ループ。

use std::io::{self, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::assembler::RenderOptions;
use crate::config::Config;
use crate::driver::{BuildDriver, BuildPaths, GoToolchain, Toolchain};
use crate::errors::ReplError;
use crate::session::{Session, Submission};
use crate::workspace::ItemKind;

use super::continuation::ContinuationBuffer;
use super::line_editor::{history_path, LineEditor, ReadResult};
use super::printer::{help_text, WELCOME};
use super::template::{TemplateStore, STARTUP_TEMPLATE};

/// 設定に従って Go ツールチェーンで対話セッションを開始する。
///
/// # Examples
/// ```no_run
/// # use std::sync::{atomic::AtomicBool, Arc};
/// # fn main() -> std::io::Result<()> {
/// let config = gop::config::Config::without_file(&gop::config::Cli::default());
/// gop::repl::run_repl(&config, Arc::new(AtomicBool::new(false)))
/// # }
/// ```
pub fn run_repl(config: &Config, interrupted: Arc<AtomicBool>) -> io::Result<()> {
    let driver = BuildDriver::new(
        GoToolchain::new(&config.go),
        BuildPaths::in_home(&config.home),
    );
    let session = Session::new(driver, config.echo, config.default_imports.clone());
    let mut shell = ReplShell::new(session, TemplateStore::new(&config.home));
    let mut editor = LineEditor::new(Some(history_path(&config.home)), interrupted)?;
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    writeln!(stdout, "{}", WELCOME.trim_end())?;
    if config.load_template {
        let msgs = shell.load_startup_template();
        dispatch_messages(msgs, &mut stdout, &mut stderr)?;
    }
    run_repl_with(&mut editor, &mut shell, &mut stdout, &mut stderr)
}

/// 行入力元の抽象。テストでは台本どおりに行を返す実装に差し替える。
pub trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
    fn add_history(&mut self, entry: &str);
    fn save_history(&mut self) -> io::Result<()>;
}

impl ReplLineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        LineEditor::read_line(self, prompt)
    }

    fn add_history(&mut self, entry: &str) {
        LineEditor::add_history(self, entry);
    }

    fn save_history(&mut self) -> io::Result<()> {
        LineEditor::save_history(self)
    }
}

/// 入力が尽きるまで読み、継続入力をまとめてからシェルへ渡す。
pub fn run_repl_with<S, T, W, E>(
    editor: &mut S,
    shell: &mut ReplShell<T>,
    out: &mut W,
    err: &mut E,
) -> io::Result<()>
where
    S: ReplLineSource,
    T: Toolchain,
    W: Write,
    E: Write,
{
    let mut pending = ContinuationBuffer::new();

    loop {
        let prompt = pending.prompt();
        match editor.read_line(&prompt) {
            Ok(ReadResult::Line(line)) => {
                if !pending.is_pending() && line.is_empty() {
                    continue;
                }
                pending.push_line(&line);
                if let Some(redraw) = pending.reindent() {
                    write!(out, "{}", redraw)?;
                    out.flush()?;
                }
                match shell.dispatch(pending.buffer()) {
                    Ok(Dispatch::Continue) => continue,
                    Ok(Dispatch::Done(msgs)) => dispatch_messages(msgs, out, err)?,
                    Err(e) => report_error(&e, err)?,
                }
                let entry = pending.accept();
                editor.add_history(&entry);
            }
            Ok(ReadResult::Interrupted) => {
                if pending.is_pending() {
                    let entry = pending.accept();
                    editor.add_history(&entry);
                } else {
                    writeln!(out, "(^D to quit)")?;
                }
            }
            Ok(ReadResult::Eof) => {
                writeln!(out)?;
                break;
            }
            Err(e) => {
                writeln!(err, "入力エラー: {}", e)?;
                break;
            }
        }
    }

    if let Err(e) = editor.save_history() {
        tracing::warn!(error = %e, "failed to save history");
        writeln!(err, "ヒストリーの保存に失敗しました: {}", e)?;
    }
    Ok(())
}

fn report_error<E: Write>(e: &ReplError, err: &mut E) -> io::Result<()> {
    if let ReplError::Collaborator { .. } = e {
        tracing::warn!(error = %e, "collaborator failure");
    }
    if e.needs_report() {
        writeln!(err, "エラー: {}", e)?;
    }
    Ok(())
}

fn dispatch_messages<W: Write, E: Write>(
    msgs: Vec<ReplMsg>,
    out: &mut W,
    err: &mut E,
) -> io::Result<()> {
    for msg in msgs {
        match msg {
            ReplMsg::Out(s) => writeln!(out, "{}", s)?,
            ReplMsg::Err(s) => writeln!(err, "{}", s)?,
        }
    }
    Ok(())
}

/// 対話セッションがユーザーへ返す応答メッセージのカテゴリ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplMsg {
    Out(String),
    Err(String),
}

/// `dispatch` の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 断片が未完。続きの行を待つ。
    Continue,
    Done(Vec<ReplMsg>),
}

/// REPL が解釈できるトップレベルコマンドの集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// `?` / `help`
    Help,
    /// `-[dpc]番号指定`。先頭の種類文字を含む引数をそのまま持つ。
    Remove(String),
    /// `!` / `!!`
    Inspect { line_numbers: bool },
    /// `>name`
    Save(String),
    /// `<name`
    Load(String),
    Reset,
    List,
    ShowArg,
    SetArg(String),
    /// 上記以外は Go の断片。
    Fragment(String),
    /// 空行・空白のみ。
    Empty,
}

/// `help` と各行頭の `echo X` を展開する。
pub fn expand_aliases(input: &str) -> String {
    if input == "help" {
        return "?".to_string();
    }
    input
        .split('\n')
        .map(|line| match line.strip_prefix("echo ") {
            Some(expr) => format!("println({})", expr),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 生の入力文字列を `ReplCommand` 列挙に解析する。
pub fn parse_repl_command(input: &str) -> ReplCommand {
    let s = expand_aliases(input.trim());
    if s.is_empty() {
        return ReplCommand::Empty;
    }
    if let Some(rest) = s.strip_prefix('>') {
        return ReplCommand::Save(rest.trim().to_string());
    }
    if !s.starts_with("<-") {
        if let Some(rest) = s.strip_prefix('<') {
            return ReplCommand::Load(rest.trim().to_string());
        }
    }
    match s.as_str() {
        "reset" => return ReplCommand::Reset,
        "list" => return ReplCommand::List,
        "arg" => return ReplCommand::ShowArg,
        _ => {}
    }
    if let Some(rest) = s.strip_prefix("arg ") {
        let is_go_assignment = rest.starts_with('=') || rest.starts_with(":=");
        if !is_go_assignment {
            return ReplCommand::SetArg(rest.trim().to_string());
        }
    }
    if s.starts_with('?') {
        return ReplCommand::Help;
    }
    if let Some(rest) = s.strip_prefix('-') {
        return ReplCommand::Remove(rest.trim().to_string());
    }
    if let Some(rest) = s.strip_prefix('!') {
        return ReplCommand::Inspect {
            line_numbers: rest.trim() == "!",
        };
    }
    ReplCommand::Fragment(s)
}

/// セッションとテンプレート置き場を束ねたコマンド実行系。
pub struct ReplShell<T: Toolchain> {
    session: Session<T>,
    templates: TemplateStore,
}

impl<T: Toolchain> ReplShell<T> {
    pub fn new(session: Session<T>, templates: TemplateStore) -> Self {
        Self { session, templates }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    /// 1 入力（継続行をまとめたもの）を処理する。
    pub fn dispatch(&mut self, input: &str) -> Result<Dispatch, ReplError> {
        let msgs = match parse_repl_command(input) {
            ReplCommand::Empty => Vec::new(),
            ReplCommand::Help => vec![ReplMsg::Out(help_text().to_string())],
            ReplCommand::Remove(args) => self.exec_remove(&args)?,
            ReplCommand::Inspect { line_numbers } => vec![ReplMsg::Out(
                self.session.render(RenderOptions::inspect(line_numbers)),
            )],
            ReplCommand::Save(name) => {
                let source = self.session.render(RenderOptions::compile());
                self.templates.save(&name, &source)?;
                Vec::new()
            }
            ReplCommand::Load(name) => self.exec_load(&name)?,
            ReplCommand::Reset => {
                self.session.reset();
                Vec::new()
            }
            ReplCommand::List => self
                .templates
                .list()?
                .into_iter()
                .enumerate()
                .map(|(idx, name)| ReplMsg::Out(format!("{}\t{}", idx, name)))
                .collect(),
            ReplCommand::ShowArg => vec![ReplMsg::Out(self.session.argv().to_string())],
            ReplCommand::SetArg(text) => {
                self.session.set_argv(&text);
                Vec::new()
            }
            ReplCommand::Fragment(text) => match self.session.submit(&text)? {
                Submission::Incomplete => return Ok(Dispatch::Continue),
                Submission::Committed | Submission::Unchanged => Vec::new(),
            },
        };
        Ok(Dispatch::Done(msgs))
    }

    fn exec_remove(&mut self, args: &str) -> Result<Vec<ReplMsg>, ReplError> {
        let mut chars = args.chars();
        let Some(letter) = chars.next() else {
            return Err(ReplError::Command("削除する種類 (d/p/c) を指定してください".into()));
        };
        let kind = ItemKind::from_letter(letter)
            .ok_or_else(|| ReplError::Command(format!("不明な種類 '{}' です", letter)))?;
        let warnings = self.session.remove_items(kind, chars.as_str())?;
        Ok(warnings.into_iter().map(ReplMsg::Err).collect())
    }

    fn exec_load(&mut self, name: &str) -> Result<Vec<ReplMsg>, ReplError> {
        let body = self.templates.load(name)?;
        let merged = self.session.replace_all(body.split('\n'))?;
        tracing::info!(template = name, fragments = merged, "workspace rebuilt from template");
        Ok(Vec::new())
    }

    /// 起動時テンプレートがあれば読み込み、結果をメッセージで返す。
    pub fn load_startup_template(&mut self) -> Vec<ReplMsg> {
        if !self.templates.has_startup_template() {
            return Vec::new();
        }
        match self.exec_load(STARTUP_TEMPLATE) {
            Ok(msgs) => msgs,
            Err(e) => vec![ReplMsg::Err(format!("エラー: {}", e))],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;

    use super::{
        expand_aliases, parse_repl_command, run_repl_with, Dispatch, ReadResult, ReplCommand,
        ReplLineSource, ReplMsg, ReplShell,
    };
    use crate::driver::{BuildDriver, BuildPaths, CompileReport, RunReport, Toolchain};
    use crate::errors::ReplError;
    use crate::repl::template::TemplateStore;
    use crate::session::Session;
    use crate::workspace::{default_import_list, EchoStyle};

    /// コンパイルは常に成功し、実行は何も出力しないツールチェーン。
    struct QuietToolchain;

    impl Toolchain for QuietToolchain {
        fn compile(&mut self, _: &Path, _: &Path) -> io::Result<CompileReport> {
            Ok(CompileReport { success: true, diagnostics: String::new() })
        }

        fn execute(&mut self, _: &Path, _: &[String]) -> io::Result<RunReport> {
            Ok(RunReport { status: Some(0), ..Default::default() })
        }
    }

    fn shell(home: &Path) -> ReplShell<QuietToolchain> {
        let driver = BuildDriver::new(QuietToolchain, BuildPaths::in_home(home));
        let session = Session::new(driver, EchoStyle::Discard, default_import_list());
        ReplShell::new(session, TemplateStore::with_cwd(home, home))
    }

    struct ScriptedLineSource {
        events: VecDeque<ReadResult>,
        prompts: Vec<String>,
        history: Vec<String>,
        saved: bool,
    }

    impl ScriptedLineSource {
        fn new(lines: &[&str]) -> Self {
            Self {
                events: lines.iter().map(|l| ReadResult::Line(l.to_string())).collect(),
                prompts: Vec::new(),
                history: Vec::new(),
                saved: false,
            }
        }
    }

    impl ReplLineSource for ScriptedLineSource {
        fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
            self.prompts.push(prompt.to_string());
            Ok(self.events.pop_front().unwrap_or(ReadResult::Eof))
        }

        fn add_history(&mut self, entry: &str) {
            self.history.push(entry.to_string());
        }

        fn save_history(&mut self) -> io::Result<()> {
            self.saved = true;
            Ok(())
        }
    }

    #[test]
    /// 代表的なコマンドが想定した `ReplCommand` に分類されるかを確認する。
    fn parse_repl_command_variants() {
        assert_eq!(parse_repl_command("help"), ReplCommand::Help);
        assert_eq!(parse_repl_command("?"), ReplCommand::Help);
        assert_eq!(parse_repl_command("-c 1,2"), ReplCommand::Remove("c 1,2".into()));
        assert_eq!(parse_repl_command("!"), ReplCommand::Inspect { line_numbers: false });
        assert_eq!(parse_repl_command("!!"), ReplCommand::Inspect { line_numbers: true });
        assert_eq!(parse_repl_command(">demo"), ReplCommand::Save("demo".into()));
        assert_eq!(parse_repl_command("< demo"), ReplCommand::Load("demo".into()));
        assert_eq!(parse_repl_command("<-ch"), ReplCommand::Fragment("<-ch".into()));
        assert_eq!(parse_repl_command("reset"), ReplCommand::Reset);
        assert_eq!(parse_repl_command("list"), ReplCommand::List);
        assert_eq!(parse_repl_command("arg"), ReplCommand::ShowArg);
        assert_eq!(parse_repl_command("arg -n 3"), ReplCommand::SetArg("-n 3".into()));
        assert_eq!(parse_repl_command("arg := 1"), ReplCommand::Fragment("arg := 1".into()));
        assert_eq!(parse_repl_command("arg = 2"), ReplCommand::Fragment("arg = 2".into()));
        assert_eq!(parse_repl_command("   "), ReplCommand::Empty);
    }

    #[test]
    fn echo_alias_expands_per_line() {
        assert_eq!(expand_aliases("echo x"), "println(x)");
        assert_eq!(expand_aliases("a := 1\necho a + 1"), "a := 1\nprintln(a + 1)");
        assert_eq!(expand_aliases("echoes()"), "echoes()");
    }

    #[test]
    /// 削除コマンドの不正な種類は Command エラーとして返る。
    fn remove_rejects_unknown_kind_and_reports_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path());
        assert!(matches!(sh.dispatch("-x"), Err(ReplError::Command(_))));
        assert!(matches!(sh.dispatch("-"), Err(ReplError::Command(_))));
        assert!(matches!(sh.dispatch("-c"), Err(ReplError::Command(_))));
        match sh.dispatch("-p 0,42").unwrap() {
            Dispatch::Done(msgs) => assert_eq!(msgs.len(), 1),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(sh.session().workspace().inactive.len(), default_import_list().len() - 1);
    }

    #[test]
    fn arg_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path());
        sh.dispatch("arg -v \"a b\"").unwrap();
        assert_eq!(
            sh.dispatch("arg").unwrap(),
            Dispatch::Done(vec![ReplMsg::Out("-v \"a b\"".into())])
        );
    }

    #[test]
    /// 保存したテンプレートを読み戻すと同じソースになる。
    fn save_then_load_restores_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path());
        sh.dispatch("import \"os\"").unwrap();
        sh.dispatch("func f() int { return len(os.Args) }").unwrap();
        sh.dispatch("n := f()").unwrap();
        let before = sh.session().render(crate::assembler::RenderOptions::compile());
        sh.dispatch(">snap").unwrap();
        sh.dispatch("reset").unwrap();
        assert!(sh.session().workspace().statements.is_empty());
        sh.dispatch("<snap").unwrap();
        let after = sh.session().render(crate::assembler::RenderOptions::compile());
        assert_eq!(before, after);
        match sh.dispatch("list").unwrap() {
            Dispatch::Done(msgs) => assert_eq!(msgs, vec![ReplMsg::Out("0\tsnap.tmpl".into())]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    /// 継続入力がまとまって 1 つの履歴になり、プロンプトが深さに追従する。
    fn loop_buffers_continuation_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path());
        let mut script = ScriptedLineSource::new(&["func f() {", "g()", "}", "", "?"]);
        let mut out = Vec::new();
        let mut err = Vec::new();
        run_repl_with(&mut script, &mut sh, &mut out, &mut err).unwrap();

        assert_eq!(script.prompts[0], "GOP$ ");
        assert_eq!(script.prompts[1], ".....    ");
        assert_eq!(script.prompts[2], ".....    ");
        assert_eq!(script.prompts[3], "GOP$ ");
        assert_eq!(script.history, vec!["func f() {g()}", "?"]);
        assert!(script.saved);
        let stdout = String::from_utf8(out).unwrap();
        assert!(stdout.contains("コマンド:"));
        assert_eq!(sh.session().workspace().definitions.len(), 1);
        assert!(err.is_empty());
    }

    #[test]
    fn interrupt_cancels_pending_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell(dir.path());
        let mut script = ScriptedLineSource::new(&["func f() {"]);
        script.events.push_back(ReadResult::Interrupted);
        script.events.push_back(ReadResult::Interrupted);
        let mut out = Vec::new();
        let mut err = Vec::new();
        run_repl_with(&mut script, &mut sh, &mut out, &mut err).unwrap();
        assert_eq!(script.prompts[2], "GOP$ ");
        assert!(String::from_utf8(out).unwrap().contains("(^D to quit)"));
        assert!(sh.session().workspace().definitions.is_empty());
    }
}
