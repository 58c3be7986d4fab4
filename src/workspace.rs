// パス: src/workspace.rs
// 役割: 組み立て中プログラムの import 集合・定義列・文列・引数を保持し、断片を適用する
// 意図: スナップショットによる一括巻き戻しと、位置指定挿入・マスク削除を型付きで提供する
// 関連ファイル: src/ast.rs, src/assembler.rs, src/session.rs, src/reconcile.rs
//! ワークスペース（組み立て中プログラムの状態）とその変更操作。

use clap::ValueEnum;
use serde::Deserialize;

use crate::ast::{Decl, Definition, Fragment, ImportSpec, Statement};

/// 起動時と reset 後に非アクティブ候補として並べる標準パッケージ。
pub const DEFAULT_IMPORTS: &[&str] = &["fmt", "strconv", "strings", "time", "encoding/json", "bytes"];

/// 自動 echo 文の書き方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EchoStyle {
    /// `println(name)`
    #[default]
    Print,
    /// `_ = name`
    Discard,
}

impl EchoStyle {
    pub fn statement_for(self, name: &str) -> Statement {
        match self {
            EchoStyle::Print => Statement::new(format!("println({})", name)),
            EchoStyle::Discard => Statement::new(format!("_ = {}", name)),
        }
    }
}

/// 挿入順を保つ重複なしの import 集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    specs: Vec<ImportSpec>,
}

impl ImportSet {
    pub fn contains(&self, spec: &ImportSpec) -> bool {
        self.specs.iter().any(|s| s == spec)
    }

    /// 未登録なら末尾に追加し、追加したかどうかを返す。
    pub fn insert(&mut self, spec: ImportSpec) -> bool {
        if self.contains(&spec) {
            return false;
        }
        self.specs.push(spec);
        true
    }

    /// 条件に合う最初の要素を取り除いて返す。
    pub fn take_first(&mut self, pred: impl Fn(&ImportSpec) -> bool) -> Option<ImportSpec> {
        let idx = self.specs.iter().position(pred)?;
        Some(self.specs.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn clear(&mut self) {
        self.specs.clear();
    }

    fn retain_unmasked(&mut self, mask: &[bool]) {
        remove_by_mask(&mut self.specs, mask);
    }
}

/// 削除コマンドが対象とする要素の種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Definition,
    Import,
    Statement,
}

impl ItemKind {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'd' => Some(ItemKind::Definition),
            'p' => Some(ItemKind::Import),
            'c' => Some(ItemKind::Statement),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            ItemKind::Definition => 'd',
            ItemKind::Import => 'p',
            ItemKind::Statement => 'c',
        }
    }
}

/// 巻き戻し用に丸ごと複製したワークスペースの 4 コレクション。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    active: ImportSet,
    inactive: ImportSet,
    definitions: Vec<Definition>,
    statements: Vec<Statement>,
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub active: ImportSet,
    pub inactive: ImportSet,
    pub definitions: Vec<Definition>,
    pub statements: Vec<Statement>,
    pub argv: String,
}

impl Workspace {
    /// 既定の非アクティブ候補だけを持つワークスペースを作る。
    pub fn with_default_imports(defaults: &[String]) -> Self {
        let mut ws = Self::default();
        ws.restore_default_imports(defaults);
        ws
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            active: self.active.clone(),
            inactive: self.inactive.clone(),
            definitions: self.definitions.clone(),
            statements: self.statements.clone(),
        }
    }

    /// スナップショット時点へ 4 コレクションを戻す。argv は対象外。
    pub fn restore(&mut self, snap: WorkspaceSnapshot) {
        self.active = snap.active;
        self.inactive = snap.inactive;
        self.definitions = snap.definitions;
        self.statements = snap.statements;
    }

    /// 解析済み断片を位置 `pos` へ適用する。範囲外や `None` は末尾。
    ///
    /// 文の場合は `:=` で導入された各名前（`_` を除く）の echo 文を定義文の直後に挿入する。
    pub fn apply(&mut self, fragment: Fragment, pos: Option<usize>, echo: EchoStyle) {
        match fragment {
            Fragment::Declarations(decls) => {
                let mut defs = Vec::new();
                for decl in decls {
                    match decl {
                        Decl::Import(specs) => {
                            for spec in specs {
                                if !self.inactive.contains(&spec) {
                                    self.active.insert(spec);
                                }
                            }
                        }
                        Decl::Definition(def) => defs.push(def),
                    }
                }
                splice_at(&mut self.definitions, pos, defs);
            }
            Fragment::Statements(stmts) => {
                let mut expanded = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    let echoes: Vec<Statement> = stmt
                        .defines
                        .iter()
                        .filter(|name| name.as_str() != "_")
                        .map(|name| echo.statement_for(name))
                        .collect();
                    expanded.push(stmt);
                    expanded.extend(echoes);
                }
                splice_at(&mut self.statements, pos, expanded);
            }
        }
    }

    /// 投機ビルドを経由せず末尾へそのまま取り込む（テンプレート読込用）。
    pub fn merge_direct(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::Declarations(decls) => {
                for decl in decls {
                    match decl {
                        Decl::Import(specs) => {
                            for spec in specs {
                                self.inactive.take_first(|s| s == &spec);
                                self.active.insert(spec);
                            }
                        }
                        Decl::Definition(def) => self.definitions.push(def),
                    }
                }
            }
            Fragment::Statements(stmts) => self.statements.extend(stmts),
        }
    }

    /// 既定候補のうちアクティブでも非アクティブでもないものを非アクティブ側へ足す。
    pub fn restore_default_imports(&mut self, defaults: &[String]) {
        for path in defaults {
            let spec = ImportSpec::new(path.as_str());
            if !self.active.contains(&spec) {
                self.inactive.insert(spec);
            }
        }
    }

    /// 4 コレクションを空にして既定候補を戻す。argv は保持する。
    pub fn reset(&mut self, defaults: &[String]) {
        self.active.clear();
        self.inactive.clear();
        self.definitions.clear();
        self.statements.clear();
        self.restore_default_imports(defaults);
    }

    pub fn item_count(&self, kind: ItemKind) -> usize {
        match kind {
            ItemKind::Definition => self.definitions.len(),
            ItemKind::Import => self.active.len() + self.inactive.len(),
            ItemKind::Statement => self.statements.len(),
        }
    }

    pub fn remove_definitions(&mut self, mask: &[bool]) {
        remove_by_mask(&mut self.definitions, mask);
    }

    pub fn remove_statements(&mut self, mask: &[bool]) {
        remove_by_mask(&mut self.statements, mask);
    }

    /// アクティブ → 非アクティブの通し番号に対するマスクで import を削除する。
    pub fn remove_imports(&mut self, mask: &[bool]) {
        let split = self.active.len().min(mask.len());
        let (active_mask, inactive_mask) = mask.split_at(split);
        self.active.retain_unmasked(active_mask);
        self.inactive.retain_unmasked(inactive_mask);
    }

    /// 指定文字列で要素を削除し、読み飛ばした指定への警告を返す。
    pub fn remove_items(&mut self, kind: ItemKind, spec: &str) -> Result<Vec<String>, String> {
        let len = self.item_count(kind);
        if len == 0 {
            return Err(format!("'{}' に削除できる要素がありません", kind.letter()));
        }
        let (mask, warnings) = parse_index_spec(len, spec);
        match kind {
            ItemKind::Definition => self.remove_definitions(&mask),
            ItemKind::Import => self.remove_imports(&mask),
            ItemKind::Statement => self.remove_statements(&mask),
        }
        Ok(warnings)
    }
}

fn splice_at<T>(items: &mut Vec<T>, pos: Option<usize>, new_items: Vec<T>) {
    let at = match pos {
        Some(p) if p <= items.len() => p,
        _ => items.len(),
    };
    items.splice(at..at, new_items);
}

/// マスクが true の位置を取り除く。マスクより後ろの要素は残す。
fn remove_by_mask<T>(items: &mut Vec<T>, mask: &[bool]) {
    let mut idx = 0;
    items.retain(|_| {
        let drop = mask.get(idx).copied().unwrap_or(false);
        idx += 1;
        !drop
    });
}

/// `1,3-5` 形式の指定を長さ `len` の削除マスクへ変換する。空指定は最後の要素。
///
/// 整数でない指定や範囲外の番号は警告に積んで読み飛ばす。
pub fn parse_index_spec(len: usize, spec: &str) -> (Vec<bool>, Vec<String>) {
    let mut mask = vec![false; len];
    let mut warnings = Vec::new();
    let spec = spec.trim();
    if spec.is_empty() {
        if let Some(last) = mask.last_mut() {
            *last = true;
        }
        return (mask, warnings);
    }

    let mut mark = |text: &str, warnings: &mut Vec<String>| match text.trim().parse::<usize>() {
        Ok(idx) if idx < len => mask[idx] = true,
        Ok(idx) => warnings.push(format!("{} は範囲外です", idx)),
        Err(_) => warnings.push(format!("{} は整数ではありません", text.trim())),
    };

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let bounds = (lo.trim().parse::<usize>(), hi.trim().parse::<usize>());
                match bounds {
                    (Ok(lo), Ok(hi)) => {
                        // 走査は要素数までに抑え、はみ出た部分はまとめて 1 件の警告にする。
                        if lo < len {
                            for idx in lo..=hi.min(len - 1) {
                                mark(&idx.to_string(), &mut warnings);
                            }
                        }
                        if hi >= len && hi >= lo {
                            let from = lo.max(len);
                            warnings.push(if from == hi {
                                format!("{} は範囲外です", hi)
                            } else {
                                format!("{}-{} は範囲外です", from, hi)
                            });
                        }
                    }
                    (Err(_), _) => warnings.push(format!("{} は整数ではありません", lo.trim())),
                    (_, Err(_)) => warnings.push(format!("{} は整数ではありません", hi.trim())),
                }
            }
            None => mark(part, &mut warnings),
        }
    }
    (mask, warnings)
}

pub fn default_import_list() -> Vec<String> {
    DEFAULT_IMPORTS.iter().map(|s| s.to_string()).collect()
}
