// パス: src/repl/template.rs
// 役割: 組み立て済みソースのテンプレート保存・読込・一覧
// 意図: `>name` / `<name` / `list` と起動時の gop.tmpl 読込を支える
// 関連ファイル: src/repl/cmd.rs, src/session.rs
//! テンプレートファイル（`*.tmpl`）の入出力。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::ReplError;

pub const TEMPLATE_SUFFIX: &str = ".tmpl";
pub const STARTUP_TEMPLATE: &str = "gop.tmpl";

const MAIN_OPEN: &str = "func main() {";
const MAIN_CLOSE: &str = "}";

#[derive(Debug, Clone)]
pub struct TemplateStore {
    home: PathBuf,
    cwd: PathBuf,
}

impl TemplateStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self::with_cwd(home, PathBuf::from("."))
    }

    pub fn with_cwd(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    /// `<home>/<name>.tmpl` へ書き出し、書いたパスを返す。
    pub fn save(&self, name: &str, source: &str) -> Result<PathBuf, ReplError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReplError::Command("保存するテンプレート名がありません".into()));
        }
        let path = self.home.join(with_suffix(name));
        fs::write(&path, source).map_err(|e| {
            ReplError::collaborator(format!("テンプレート {} を書き込めません", path.display()), e)
        })?;
        tracing::info!(path = %path.display(), "template saved");
        Ok(path)
    }

    /// カレントディレクトリ、無ければ home からテンプレートを読み、main の外枠を外した本文を返す。
    pub fn load(&self, name: &str) -> Result<String, ReplError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReplError::Command("読み込むテンプレート名がありません".into()));
        }
        let file = with_suffix(name);
        let local = self.cwd.join(&file);
        let text = match fs::read_to_string(&local) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let fallback = self.home.join(&file);
                fs::read_to_string(&fallback).map_err(|e| {
                    ReplError::collaborator(
                        format!("テンプレート {} を読み込めません", fallback.display()),
                        e,
                    )
                })?
            }
            Err(e) => {
                return Err(ReplError::collaborator(
                    format!("テンプレート {} を読み込めません", local.display()),
                    e,
                ))
            }
        };
        tracing::info!(template = %file, "template loaded");
        Ok(strip_main_wrapper(&text))
    }

    /// home 直下の `.tmpl` ファイル名（隠しファイルを除く）を名前順で返す。
    pub fn list(&self) -> Result<Vec<String>, ReplError> {
        let entries = fs::read_dir(&self.home).map_err(|e| {
            ReplError::collaborator(format!("{} を一覧できません", self.home.display()), e)
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| ReplError::collaborator(format!("{} を一覧できません", self.home.display()), e))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !name.ends_with(TEMPLATE_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// 起動時テンプレートが home かカレントディレクトリにあるか。
    pub fn has_startup_template(&self) -> bool {
        exists(&self.home.join(STARTUP_TEMPLATE)) || exists(&self.cwd.join(STARTUP_TEMPLATE))
    }
}

fn exists(path: &Path) -> bool {
    path.is_file()
}

fn with_suffix(name: &str) -> String {
    if name.ends_with(TEMPLATE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, TEMPLATE_SUFFIX)
    }
}

/// 最初の `func main() {` と、その後ろで最後の `}` を取り除く。
pub fn strip_main_wrapper(text: &str) -> String {
    let Some(open) = text.find(MAIN_OPEN) else {
        return text.to_string();
    };
    let mut body = String::with_capacity(text.len());
    body.push_str(&text[..open]);
    body.push_str(&text[open + MAIN_OPEN.len()..]);
    if let Some(close) = body[open..].rfind(MAIN_CLOSE).map(|i| open + i) {
        body.replace_range(close..close + MAIN_CLOSE.len(), "");
    }
    body
}
