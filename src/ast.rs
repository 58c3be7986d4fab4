// パス: src/ast.rs
// 役割: ワークスペースが保持する import / 定義 / 文ノードと解析結果の型を定義する
// 意図: 断片の解析結果を描画可能な最小表現で持ち回る
// 関連ファイル: src/parser.rs, src/workspace.rs, src/assembler.rs
//! ソース断片のノード表現。
//!
//! ノードは正規化済みのソーステキストを保持し、`Display` がそのまま描画（renderNode）になる。
//! 構文木は持たない。コンパイル可能かどうかの最終判断は外部コンパイラに委ねる。

use std::fmt;

/// `(path, alias)` で一意になる import 指定。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportSpec {
    pub path: String,
    pub alias: Option<String>,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: None,
        }
    }

    pub fn aliased(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: Some(alias.into()),
        }
    }

    /// パッケージを参照するときの名前。別名が無ければパスの最終要素。
    pub fn binding_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

impl fmt::Display for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "import {} \"{}\"", alias, self.path),
            None => write!(f, "import \"{}\"", self.path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Func,
    Type,
    Var,
    Const,
}

/// import 以外のトップレベル宣言。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: DefKind,
    pub text: String,
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// エントリ関数本体に置かれる 1 文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// `a, b := ...` 形式のとき左辺に現れる名前（出現順）。それ以外は空。
    pub defines: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            defines: Vec::new(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 宣言リスト中の 1 要素。import 宣言は複数の指定をまとめて持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Import(Vec<ImportSpec>),
    Definition(Definition),
}

/// 断片の解析結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Declarations(Vec<Decl>),
    Statements(Vec<Statement>),
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Declarations(decls) => decls.is_empty(),
            Fragment::Statements(stmts) => stmts.is_empty(),
        }
    }
}
