// パス: src/bin/gop.rs
// 役割: コマンドライン引数を読み、作業ディレクトリを用意して REPL を起動する
// 意図: 作業ディレクトリを作れない場合だけを致命的エラーとして終了する
// 関連ファイル: src/repl/cmd.rs, src/config.rs, src/logging.rs
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use gop::config::{Cli, Config};

fn main() -> ExitCode {
    let cli = Cli::parse();
    gop::logging::init();

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("警告: {} (既定値で起動します)", e);
            Config::without_file(&cli)
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.home) {
        eprintln!("作業ディレクトリ {} を作成できません: {}", config.home.display(), e);
        return ExitCode::from(1);
    }

    let interrupted = match gop::repl::install_interrupt_flag() {
        Ok(flag) => flag,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGINT handler");
            Arc::new(AtomicBool::new(false))
        }
    };

    if let Err(e) = gop::repl::run_repl(&config, interrupted) {
        eprintln!("REPL 実行中にエラーが発生しました: {}", e);
    }
    ExitCode::SUCCESS
}
