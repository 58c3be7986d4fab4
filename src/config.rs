// パス: src/config.rs
// 役割: コマンドライン引数と設定ファイルを読み、起動設定を確定する
// 意図: 組み込み既定値 < 設定ファイル < コマンドラインの優先順位で値を決める
// 関連ファイル: src/bin/gop.rs, src/repl/cmd.rs, src/workspace.rs
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::workspace::{default_import_list, EchoStyle};

pub const CONFIG_FILE: &str = "config.json";

/// Go の断片を逐次組み立て、コンパイル・実行する対話環境。
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "gop", version, about)]
pub struct Cli {
    /// 作業ディレクトリ（ソース・生成物・履歴・テンプレートの置き場）
    #[arg(long, env = "GOP_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,
    /// Go ツールチェーンのコマンド
    #[arg(long, value_name = "BIN")]
    pub go: Option<PathBuf>,
    /// `:=` で定義した名前の自動 echo の書き方
    #[arg(long, value_enum)]
    pub echo: Option<EchoStyle>,
    /// 起動時に gop.tmpl を読み込まない
    #[arg(long)]
    pub no_template: bool,
    /// 設定ファイル（既定は <home>/config.json）
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// 設定ファイルの内容。すべて省略可能。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub go: Option<PathBuf>,
    pub echo: Option<EchoStyle>,
    pub no_template: Option<bool>,
    pub default_imports: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("設定ファイル {path} を読み込めません: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("設定ファイル {path} の形式が不正です: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// ファイルが無ければ `None`。
    pub fn read_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(path, &text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 確定した起動設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home: PathBuf,
    pub go: PathBuf,
    pub echo: EchoStyle,
    pub load_template: bool,
    pub default_imports: Vec<String>,
}

impl Config {
    /// コマンドラインと（あれば）設定ファイルから設定を組み立てる。
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let home = resolve_home(cli);
        let file = match &cli.config {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::read_optional(&home.join(CONFIG_FILE))?.unwrap_or_default(),
        };
        Ok(Self::merge(cli, home, file))
    }

    /// 設定ファイルを使わずに組み立てる。
    pub fn without_file(cli: &Cli) -> Self {
        Self::merge(cli, resolve_home(cli), FileConfig::default())
    }

    pub fn merge(cli: &Cli, home: PathBuf, file: FileConfig) -> Self {
        let go = cli
            .go
            .clone()
            .or(file.go)
            .unwrap_or_else(|| PathBuf::from("go"));
        let echo = cli.echo.or(file.echo).unwrap_or_default();
        let load_template = !(cli.no_template || file.no_template.unwrap_or(false));
        let default_imports = file.default_imports.unwrap_or_else(default_import_list);
        Self {
            home,
            go,
            echo,
            load_template,
            default_imports,
        }
    }
}

fn resolve_home(cli: &Cli) -> PathBuf {
    cli.home.clone().unwrap_or_else(default_home)
}

/// `$HOME/.gop`。HOME が無ければカレントディレクトリ直下。
pub fn default_home() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gop")
}
