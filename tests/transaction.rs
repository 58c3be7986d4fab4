// パス: tests/transaction.rs
// 役割: 投機ビルドのトランザクション性質（巻き戻し・診断調整・挿入順・自動 echo）を検証する
// 意図: 偽ツールチェーンで外部プロセスなしに確定 / 巻き戻しの境界を固定する
// 関連ファイル: src/session.rs, src/reconcile.rs, tests/test_support.rs
#[path = "test_support.rs"]
mod support;

use gop::assembler::RenderOptions;
use gop::ast::ImportSpec;
use gop::errors::ReplError;
use gop::session::Submission;
use gop::workspace::EchoStyle;

use support::{
    failed_compile, printed_run, session_with, snapshot, statement_texts, FakeToolchain,
};

#[test]
/// `x := 1` は println で echo され、出力があるため確定せず元の状態に戻る。
fn end_to_end_echo_rolls_back_after_output() {
    let home = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::silent().queue_run(printed_run("1\n"));
    let mut session = session_with(home.path(), fake, EchoStyle::Print);
    let before = snapshot(session.workspace());

    let err = session.submit("x := 1").unwrap_err();
    assert!(matches!(err, ReplError::RunHadEffect { status: Some(0) }));
    assert!(!err.needs_report());

    let compiled = &session.driver().toolchain().sources[0];
    assert!(compiled.contains("func main() {\n\tx := 1\n\tprintln(x)\n}\n"));
    assert_eq!(snapshot(session.workspace()), before);
}

#[test]
fn silent_fragment_is_committed() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Discard);
    assert_eq!(session.submit("x := 1").unwrap(), Submission::Committed);
    assert_eq!(statement_texts(session.workspace()), vec!["x := 1", "_ = x"]);
}

#[test]
/// 構文エラー・コンパイル失敗・非ゼロ終了のいずれでも 4 コレクションが一致する。
fn failures_leave_no_trace() {
    let home = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::scripted_compiles(vec![
        support::ok_compile(),
        failed_compile("./gop.go:5:7: undefined: nothing\n"),
        failed_compile("./gop.go:5:7: undefined: nothing\n"),
    ])
    .queue_run(support::silent_run())
    .queue_run(gop::driver::RunReport {
        status: Some(3),
        ..Default::default()
    });
    let mut session = session_with(home.path(), fake, EchoStyle::Discard);
    assert_eq!(session.submit("import \"os\"").unwrap(), Submission::Committed);
    let before = snapshot(session.workspace());

    assert!(matches!(session.submit("x := (1"), Ok(Submission::Incomplete)));
    assert!(matches!(session.submit("x := 1)"), Err(ReplError::Syntax(_))));
    assert_eq!(snapshot(session.workspace()), before);

    let err = session.submit("y := nothing").unwrap_err();
    assert!(matches!(err, ReplError::Compile { .. }));
    assert_eq!(snapshot(session.workspace()), before);

    let err = session.submit("z := 2").unwrap_err();
    assert_eq!(err.to_string(), "exit status 3");
    assert_eq!(snapshot(session.workspace()), before);
}

#[test]
/// 未使用 import を 1 つだけ含む断片は、調整後の再コンパイルで未使用と報告されなくなる。
fn reconciliation_converges_for_single_unused_import() {
    let home = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::with_compiler(|src| {
        if src.contains("import \"os\"\n") {
            failed_compile("./gop.go:3:8: \"os\" imported and not used\n")
        } else {
            support::ok_compile()
        }
    });
    let mut session = session_with(home.path(), fake, EchoStyle::Discard);

    assert_eq!(session.submit("import \"os\"").unwrap(), Submission::Committed);
    let sources = &session.driver().toolchain().sources;
    assert_eq!(sources.len(), 2);
    assert!(!sources[1].contains("import \"os\"\n"));

    let ws = session.workspace();
    assert!(ws.active.is_empty());
    assert!(ws.inactive.contains(&ImportSpec::new("os")));
}

#[test]
/// 再試行も失敗した場合、診断調整で動かした import も適用前の位置へ戻る。
fn failed_retry_undoes_reconciled_import_moves() {
    let home = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::scripted_compiles(vec![
        support::ok_compile(),
        failed_compile(
            "./gop.go:3:8: \"os\" imported and not used\n./gop.go:7:6: undefined: strings\n",
        ),
        failed_compile("./gop.go:7:26: undefined: missing\n"),
    ]);
    let mut session = session_with(home.path(), fake, EchoStyle::Discard);
    assert_eq!(session.submit("import \"os\"").unwrap(), Submission::Committed);
    let before = snapshot(session.workspace());
    assert!(session.workspace().active.contains(&ImportSpec::new("os")));

    let err = session.submit("_ = strings.ToUpper(missing)").unwrap_err();
    assert!(matches!(err, ReplError::Compile { ref diagnostics } if diagnostics.contains("missing")));

    // 再試行時のソースでは import が入れ替わっていたことを確認する。
    let retried = session.driver().toolchain().sources.last().unwrap().clone();
    assert!(retried.contains("import \"strings\"\n"));
    assert!(!retried.contains("import \"os\"\n"));

    assert_eq!(snapshot(session.workspace()), before);
    assert!(session.workspace().active.contains(&ImportSpec::new("os")));
    assert!(session.workspace().inactive.contains(&ImportSpec::new("strings")));
}

#[test]
/// 未定義名は非アクティブ候補の import を有効にして解決する。
fn undefined_package_is_activated_from_candidates() {
    let home = tempfile::tempdir().unwrap();
    let fake = FakeToolchain::with_compiler(|src| {
        if src.contains("strings.ToUpper") && !src.contains("import \"strings\"\n") {
            failed_compile("./gop.go:6:7: undefined: strings\n")
        } else {
            support::ok_compile()
        }
    });
    let mut session = session_with(home.path(), fake, EchoStyle::Discard);
    assert_eq!(
        session.submit("_ = strings.ToUpper(\"a\")").unwrap(),
        Submission::Committed
    );
    assert!(session.workspace().active.contains(&ImportSpec::new("strings")));
    assert!(!session.workspace().inactive.contains(&ImportSpec::new("strings")));
}

#[test]
fn import_sets_stay_disjoint_and_unique() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Discard);
    for line in [
        "import \"fmt\"",
        "import \"os\"",
        "import (\n\t\"os\"\n\tj \"encoding/json\"\n)",
        "import j \"encoding/json\"",
    ] {
        session.submit(line).unwrap();
    }
    let ws = session.workspace();
    let active: Vec<_> = ws.active.iter().cloned().collect();
    assert_eq!(
        active,
        vec![ImportSpec::new("os"), ImportSpec::aliased("encoding/json", "j")]
    );
    for spec in ws.active.iter() {
        assert!(!ws.inactive.contains(spec));
    }
    let mut inactive: Vec<_> = ws.inactive.iter().collect();
    let total = inactive.len();
    inactive.dedup();
    assert_eq!(inactive.len(), total);
}

#[test]
/// 位置指定挿入は前後の既存要素を保ち、新しい要素だけを間に入れる。
fn ordered_insertion_preserves_prefix_and_suffix() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Discard);
    for line in ["a()", "b()", "c()", "d()"] {
        session.submit(line).unwrap();
    }
    let original = statement_texts(session.workspace());
    session.submit("2 x()\ny()").unwrap();
    let updated = statement_texts(session.workspace());
    assert_eq!(&updated[..2], &original[..2]);
    assert_eq!(&updated[2..4], &["x()".to_string(), "y()".to_string()]);
    assert_eq!(&updated[4..], &original[2..]);

    session.submit("99 z()").unwrap();
    assert_eq!(statement_texts(session.workspace()).last().unwrap(), "z()");

    session.submit("99999999999999999999 w()").unwrap();
    assert_eq!(statement_texts(session.workspace()).last().unwrap(), "w()");
}

#[test]
fn auto_echo_follows_left_hand_side_order() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Print);
    session.submit("a, b := 1, 2").unwrap();
    let compiled = session.driver().toolchain().sources.last().unwrap().clone();
    assert!(compiled.contains("\ta, b := 1, 2\n\tprintln(a)\n\tprintln(b)\n"));

    session.submit("c, _ := 1, 2").unwrap();
    let compiled = session.driver().toolchain().sources.last().unwrap().clone();
    assert!(compiled.contains("\tc, _ := 1, 2\n\tprintln(c)\n}"));
}

#[test]
/// 変更の無いワークスペースは何度描画しても同じテキストになる。
fn rendering_is_deterministic_across_commands() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Discard);
    session.submit("type point struct{ x, y int }").unwrap();
    session.submit("p := point{1, 2}").unwrap();
    let first = session.render(RenderOptions::inspect(true));
    let second = session.render(RenderOptions::inspect(true));
    assert_eq!(first, second);
    assert!(first.contains("d0:\ttype point struct{ x, y int }"));
}

#[test]
fn argv_is_tokenized_for_the_run() {
    let home = tempfile::tempdir().unwrap();
    let mut session = session_with(home.path(), FakeToolchain::silent(), EchoStyle::Discard);
    session.set_argv("-n 2 \"two words\"");
    session.submit("f := 1").unwrap();
    assert_eq!(
        session.driver().toolchain().argvs[0],
        vec!["-n", "2", "two words"]
    );
}
