// パス: src/reconcile.rs
// 役割: コンパイル診断から未使用 / 未定義の import を読み取り、アクティブ集合を組み替える
// 意図: 利用者の操作なしに 2 回目のコンパイルを通せるよう import を自動調整する
// 関連ファイル: src/workspace.rs, src/session.rs, src/driver.rs
//! 診断に基づく import の移動。

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::ImportSpec;
use crate::workspace::Workspace;

// 旧形式: imported and not used: "p" [as a]
static UNUSED_LEGACY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"imported and not used: "([^"]+)"(?: as ([A-Za-z_.][\w]*))?"#)
        .expect("legacy unused-import pattern is valid")
});

// 現行形式: "p" imported [as a] and not used
static UNUSED_CURRENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]+)" imported (?:as ([A-Za-z_.][\w]*) )?and not used"#)
        .expect("current unused-import pattern is valid")
});

static UNDEFINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"undefined: ([A-Za-z_][A-Za-z0-9_]*)").expect("undefined-name pattern is valid")
});

/// import の移動方向。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMove {
    Deactivated(ImportSpec),
    Activated(ImportSpec),
}

/// 診断テキストに従って import を移動し、実際に行った移動を返す。
///
/// 1. 未使用と報告された `(path, alias)` をアクティブから非アクティブへ
/// 2. 未定義と報告された名前を束縛する非アクティブ import をアクティブへ
pub fn reconcile(ws: &mut Workspace, diagnostics: &str) -> Vec<ImportMove> {
    let mut moves = Vec::new();

    for spec in unused_imports(diagnostics) {
        if let Some(found) = ws.active.take_first(|s| *s == spec) {
            ws.inactive.insert(found.clone());
            moves.push(ImportMove::Deactivated(found));
        }
    }

    for name in undefined_names(diagnostics) {
        if let Some(found) = ws.inactive.take_first(|s| s.binding_name() == name) {
            ws.active.insert(found.clone());
            moves.push(ImportMove::Activated(found));
        }
    }

    for mv in &moves {
        tracing::debug!(?mv, "reconciled import");
    }
    moves
}

/// 診断に現れる未使用 import を出現順で返す。
pub fn unused_imports(diagnostics: &str) -> Vec<ImportSpec> {
    let mut found: Vec<(usize, ImportSpec)> = Vec::new();
    for re in [&*UNUSED_LEGACY, &*UNUSED_CURRENT] {
        for caps in re.captures_iter(diagnostics) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let spec = ImportSpec {
                path: path.as_str().to_string(),
                alias: caps.get(2).map(|m| m.as_str().to_string()),
            };
            found.push((whole.start(), spec));
        }
    }
    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, spec)| spec).collect()
}

pub fn undefined_names(diagnostics: &str) -> Vec<&str> {
    UNDEFINED
        .captures_iter(diagnostics)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}
