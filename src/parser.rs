// パス: src/parser.rs
// 役割: 入力断片を宣言リストまたは文リストとして解析し、入力途中か構文エラーかを判別する
// 意図: ワークスペースへ適用できる単位（import / 定義 / 文）へ断片を切り分ける
// 関連ファイル: src/lexer.rs, src/ast.rs, src/workspace.rs
//! 断片パーサ
//!
//! - まず宣言リストとして解釈し、失敗したら関数本体に置かれる文リストとして解釈する。
//! - 完全な構文木は作らない。トップレベルのセミコロンで要素を区切り、括弧の対応・
//!   末尾トークン・制御文の本体有無から「入力途中」を判定する。
//! - 型検査や細かな文法違反は外部コンパイラの診断に任せる。

use crate::ast::{Decl, DefKind, Definition, Fragment, ImportSpec, Statement};
use crate::errors::ParseError;
use crate::lexer::{lex, Token, TokenKind};

/// 断片解析の失敗。`Incomplete` は続きの入力を待つべきことを表す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    Incomplete,
    Syntax(ParseError),
}

impl From<ParseError> for FragmentError {
    fn from(err: ParseError) -> Self {
        FragmentError::Syntax(err)
    }
}

// 末尾に来たら続きが必要になる演算子。
const CONTINUATION_OPS: &[&str] = &[
    "+", "-", "*", "/", "%", "&", "|", "^", "<<", ">>", "&^", "&&", "||", "<-", "==", "!=", "<",
    "<=", ">", ">=", "=", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=",
    "&^=", "!", "~", ",", ".", ":",
];

const CONTINUATION_KEYWORDS: &[&str] = &[
    "else",
    "func",
    "go",
    "defer",
    "import",
    "var",
    "const",
    "type",
    "package",
    "chan",
    "map",
    "struct",
    "interface",
    "range",
    "goto",
];

/// 先頭の 10 進数を挿入位置として切り出す。数字の直後に空白が無ければ位置指定とみなさない。
///
/// # Examples
/// ```
/// use gop::parser::split_index_prefix;
/// assert_eq!(split_index_prefix("2 x := 1"), (Some(2), "x := 1"));
/// assert_eq!(split_index_prefix("1.5"), (None, "1.5"));
/// ```
pub fn split_index_prefix(line: &str) -> (Option<usize>, &str) {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let digits = &line[..line.len() - rest.len()];
    if digits.is_empty() || !rest.starts_with(char::is_whitespace) {
        return (None, line);
    }
    // 桁あふれは「末尾へ追加」と同じ意味なので上限に丸める。
    let pos = digits.parse::<usize>().unwrap_or(usize::MAX);
    (Some(pos), rest.trim_start())
}

/// 断片を宣言リスト、だめなら文リストとして解析する。
pub fn parse_fragment(src: &str) -> Result<Fragment, FragmentError> {
    let items = scan_items(src)?;
    match declarations_from_items(src, &items) {
        Ok(decls) => Ok(Fragment::Declarations(decls)),
        Err(decl_err) => match statements_from_items(src, &items) {
            Ok(stmts) => Ok(Fragment::Statements(stmts)),
            Err(stmt_err) => {
                // 宣言キーワードで始まる断片なら宣言側の診断の方が的確。
                let starts_as_decl = items
                    .first()
                    .map(|item| item.starts_as_declaration())
                    .unwrap_or(false);
                Err(if starts_as_decl { decl_err } else { stmt_err }.into())
            }
        },
    }
}

/// トップレベル宣言リストとして解析する。先頭の `package` 句は読み捨てる。
pub fn parse_declarations(src: &str) -> Result<Vec<Decl>, FragmentError> {
    let items = scan_items(src)?;
    Ok(declarations_from_items(src, &items)?)
}

/// 関数本体に置かれる文リストとして解析する。
pub fn parse_statements(src: &str) -> Result<Vec<Statement>, FragmentError> {
    let items = scan_items(src)?;
    Ok(statements_from_items(src, &items)?)
}

/// トップレベルのセミコロンで区切られた 1 要素。
#[derive(Debug)]
struct Item {
    tokens: Vec<Token>,
}

impl Item {
    fn first(&self) -> &Token {
        &self.tokens[0]
    }

    /// 末尾の自動セミコロンを除いた最後のトークン。
    fn last_significant(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|t| t.kind != TokenKind::Semi)
    }

    fn text(&self, src: &str) -> String {
        let start = self.first().pos;
        let end = self.last_significant().map(|t| t.end).unwrap_or(start);
        normalize_text(&src[start..end])
    }

    fn starts_as_declaration(&self) -> bool {
        let first = self.first();
        first.is_keyword("import") || first.is_keyword("package") || self.is_named_func()
    }

    /// `func Name(...)` または `func (r T) Name(...)` で始まるかどうか。
    fn is_named_func(&self) -> bool {
        if !self.first().is_keyword("func") {
            return false;
        }
        match self.tokens.get(1) {
            Some(t) if t.kind == TokenKind::Ident => true,
            Some(t) if t.is_op("(") => {
                let Some(close) = matching_close(&self.tokens, 1) else {
                    return false;
                };
                let name = self.tokens.get(close + 1);
                let after = self.tokens.get(close + 2);
                matches!(name, Some(n) if n.kind == TokenKind::Ident)
                    && matches!(after, Some(a) if a.is_op("(") || a.is_op("["))
            }
            _ => false,
        }
    }

    /// `a, b := ...` 形式なら左辺の名前を返す。
    fn defined_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut expect_name = true;
        for tok in &self.tokens {
            if expect_name {
                if tok.kind != TokenKind::Ident {
                    return Vec::new();
                }
                names.push(tok.value.clone());
                expect_name = false;
            } else if tok.is_op(",") {
                expect_name = true;
            } else if tok.is_op(":=") {
                return names;
            } else {
                return Vec::new();
            }
        }
        Vec::new()
    }
}

fn matching_close(tokens: &[Token], open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate().skip(open_idx) {
        if tok.kind != TokenKind::Op {
            continue;
        }
        match tok.value.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// 行末の空白を落とし、前後の空行を除いた表示用テキストへ整える。
fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Plain(char),
    // struct / interface の本体
    TypeBody,
}

/// 制御文（if / for / switch / select）のヘッダ解析状態。
#[derive(Debug, Default)]
struct Header {
    open: bool,
    pending_func: bool,
}

/// 入力全体を字句解析し、トップレベル要素へ分割する。
fn scan_items(src: &str) -> Result<Vec<Item>, FragmentError> {
    let tokens = lex(src).map_err(|err| {
        if err.unexpected_eof {
            FragmentError::Incomplete
        } else {
            FragmentError::Syntax(err.into())
        }
    })?;

    let mut items: Vec<Item> = Vec::new();
    let mut open_headers: Vec<bool> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut stack: Vec<Bracket> = Vec::new();
    let mut header = Header::default();
    let mut last_close_was_type = false;

    for tok in tokens {
        if tok.kind == TokenKind::Eof {
            break;
        }
        let at_top = stack.is_empty();
        if at_top && tok.kind == TokenKind::Semi {
            // for / if / switch のヘッダ内にある明示的な ';' は区切りではない。
            if header.open && !tok.is_auto_semi() {
                current.push(tok);
                continue;
            }
            if !current.is_empty() {
                items.push(Item {
                    tokens: std::mem::take(&mut current),
                });
                open_headers.push(header.open);
            }
            header = Header::default();
            continue;
        }

        if at_top {
            if starts_control_header(&current, &tok) {
                header.open = true;
            } else if header.open && tok.is_keyword("func") {
                header.pending_func = true;
            }
        }

        if tok.kind == TokenKind::Op {
            match tok.value.as_str() {
                "(" | "[" => {
                    stack.push(Bracket::Plain(tok.value.chars().next().unwrap_or('(')));
                }
                "{" => {
                    let after_type_kw = current
                        .last()
                        .map(|t| t.is_keyword("struct") || t.is_keyword("interface"))
                        .unwrap_or(false);
                    if after_type_kw {
                        stack.push(Bracket::TypeBody);
                    } else {
                        if at_top && header.open {
                            if header.pending_func {
                                header.pending_func = false;
                            } else if !opens_composite_literal(&current, last_close_was_type) {
                                header.open = false;
                            }
                        }
                        stack.push(Bracket::Plain('{'));
                    }
                }
                ")" | "]" | "}" => {
                    let closer = tok.value.chars().next().unwrap_or(')');
                    let opened = stack.pop();
                    let matches = match (opened, closer) {
                        (Some(Bracket::Plain('(')), ')') => true,
                        (Some(Bracket::Plain('[')), ']') => true,
                        (Some(Bracket::Plain('{')), '}') | (Some(Bracket::TypeBody), '}') => true,
                        _ => false,
                    };
                    if !matches {
                        return Err(FragmentError::Syntax(ParseError::at(
                            "FRG001",
                            format!("対応しない閉じ括弧 '{}' です", closer),
                            Some(tok.pos),
                            Some(tok.line),
                            Some(tok.col),
                        )));
                    }
                    last_close_was_type = opened == Some(Bracket::TypeBody);
                }
                _ => {}
            }
        }
        current.push(tok);
    }

    if !stack.is_empty() {
        return Err(FragmentError::Incomplete);
    }
    if !current.is_empty() {
        items.push(Item { tokens: current });
        open_headers.push(header.open);
    }

    let last = items.len().saturating_sub(1);
    for (idx, (item, header_open)) in items.iter().zip(open_headers).enumerate() {
        if !header_open {
            continue;
        }
        if idx == last {
            return Err(FragmentError::Incomplete);
        }
        let tok = item.first();
        return Err(FragmentError::Syntax(ParseError::at(
            "FRG002",
            format!("'{}' の本体 '{{' が同じ行にありません", tok.value),
            Some(tok.pos),
            Some(tok.line),
            Some(tok.col),
        )));
    }

    if let Some(tail) = items.last().and_then(|item| item.last_significant()) {
        let dangling = match tail.kind {
            TokenKind::Op => CONTINUATION_OPS.contains(&tail.value.as_str()),
            TokenKind::Keyword => CONTINUATION_KEYWORDS.contains(&tail.value.as_str()),
            _ => false,
        };
        if dangling {
            return Err(FragmentError::Incomplete);
        }
    }

    Ok(items)
}

/// 文頭（ラベル直後を含む）の制御キーワード、または `else if` かどうか。
fn starts_control_header(current: &[Token], tok: &Token) -> bool {
    if tok.kind != TokenKind::Keyword {
        return false;
    }
    let at_statement_start = match current {
        [] => true,
        [label, colon] => label.kind == TokenKind::Ident && colon.is_op(":"),
        _ => false,
    };
    match tok.value.as_str() {
        "for" | "switch" | "select" => at_statement_start,
        "if" => at_statement_start || current.last().map(|t| t.is_keyword("else")).unwrap_or(false),
        _ => false,
    }
}

/// ヘッダ中の '{' が複合リテラルの開始かどうかを直前のトークンから推定する。
fn opens_composite_literal(current: &[Token], last_close_was_type: bool) -> bool {
    let mut idx = current.len();
    let Some(prev) = current.last() else {
        return false;
    };
    if prev.is_op("}") {
        return last_close_was_type;
    }
    // 型名（pkg.T を含む）とポインタ記号を読み飛ばした先が ']' なら []T{ / map[K]V{ の形。
    let mut saw_type_name = false;
    while idx > 0 {
        let tok = &current[idx - 1];
        if tok.kind == TokenKind::Ident && !saw_type_name {
            saw_type_name = true;
            idx -= 1;
            if idx >= 2 && current[idx - 1].is_op(".") && current[idx - 2].kind == TokenKind::Ident {
                idx -= 2;
            }
        } else if tok.is_op("*") && saw_type_name {
            idx -= 1;
        } else {
            return saw_type_name && tok.is_op("]");
        }
    }
    false
}

enum DeclClass {
    Package,
    Decl(Decl),
    NotDecl,
}

fn declarations_from_items(src: &str, items: &[Item]) -> Result<Vec<Decl>, ParseError> {
    let mut decls = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match classify_declaration(src, item)? {
            DeclClass::Package if idx == 0 => {}
            DeclClass::Package => {
                return Err(error_at(item.first(), "FRG003", "package 句は先頭にしか置けません"));
            }
            DeclClass::Decl(decl) => decls.push(decl),
            DeclClass::NotDecl => {
                return Err(error_at(item.first(), "FRG004", "トップレベル宣言ではありません"));
            }
        }
    }
    Ok(decls)
}

fn classify_declaration(src: &str, item: &Item) -> Result<DeclClass, ParseError> {
    let first = item.first();
    if first.kind != TokenKind::Keyword {
        return Ok(DeclClass::NotDecl);
    }
    let kind = match first.value.as_str() {
        "package" => {
            let named = matches!(item.tokens.get(1), Some(t) if t.kind == TokenKind::Ident);
            if !named || item.tokens.len() != 2 {
                return Err(error_at(first, "FRG005", "package 句が不正です"));
            }
            return Ok(DeclClass::Package);
        }
        "import" => return parse_import_specs(item).map(|specs| DeclClass::Decl(Decl::Import(specs))),
        "type" => DefKind::Type,
        "var" => DefKind::Var,
        "const" => DefKind::Const,
        "func" if item.is_named_func() => DefKind::Func,
        _ => return Ok(DeclClass::NotDecl),
    };
    Ok(DeclClass::Decl(Decl::Definition(Definition {
        kind,
        text: item.text(src),
    })))
}

/// `import "p"`, `import a "p"`, `import ( ... )` の各形式から指定を取り出す。
fn parse_import_specs(item: &Item) -> Result<Vec<ImportSpec>, ParseError> {
    let rest = &item.tokens[1..];
    let bad = |tok: &Token| error_at(tok, "FRG010", "import 指定が不正です");
    match rest.first() {
        Some(open) if open.is_op("(") => {
            let Some((close, body)) = rest[1..].split_last() else {
                return Err(bad(open));
            };
            if !close.is_op(")") {
                return Err(bad(close));
            }
            body.split(|t| t.kind == TokenKind::Semi)
                .filter(|spec| !spec.is_empty())
                .map(|spec| parse_import_spec(spec).ok_or_else(|| bad(&spec[0])))
                .collect()
        }
        Some(tok) => parse_import_spec(rest)
            .map(|spec| vec![spec])
            .ok_or_else(|| bad(tok)),
        None => Err(bad(item.first())),
    }
}

fn parse_import_spec(tokens: &[Token]) -> Option<ImportSpec> {
    let (alias, path) = match tokens {
        [path] => (None, path),
        [alias, path] if alias.kind == TokenKind::Ident || alias.is_op(".") => {
            (Some(alias.value.clone()), path)
        }
        _ => return None,
    };
    if path.kind != TokenKind::String || path.value.len() < 2 {
        return None;
    }
    let inner = &path.value[1..path.value.len() - 1];
    Some(ImportSpec {
        path: inner.to_string(),
        alias,
    })
}

fn statements_from_items(src: &str, items: &[Item]) -> Result<Vec<Statement>, ParseError> {
    items
        .iter()
        .map(|item| {
            if item.starts_as_declaration() {
                return Err(error_at(
                    item.first(),
                    "FRG006",
                    "文の位置に宣言は置けません",
                ));
            }
            Ok(Statement {
                text: item.text(src),
                defines: item.defined_names(),
            })
        })
        .collect()
}

fn error_at(tok: &Token, code: &'static str, msg: &str) -> ParseError {
    ParseError::at(code, msg, Some(tok.pos), Some(tok.line), Some(tok.col))
}

#[cfg(test)]
mod tests {
    use super::{
        parse_declarations, parse_fragment, parse_statements, split_index_prefix, FragmentError,
    };
    use crate::ast::{Decl, DefKind, Fragment, ImportSpec};

    fn stmt_texts(src: &str) -> Vec<String> {
        match parse_fragment(src) {
            Ok(Fragment::Statements(stmts)) => stmts.into_iter().map(|s| s.text).collect(),
            other => panic!("expected statements, got {:?}", other),
        }
    }

    fn is_incomplete(src: &str) -> bool {
        matches!(parse_fragment(src), Err(FragmentError::Incomplete))
    }

    fn syntax_code(src: &str) -> &'static str {
        match parse_fragment(src) {
            Err(FragmentError::Syntax(err)) => err.0.code,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn index_prefix_requires_trailing_whitespace() {
        assert_eq!(split_index_prefix("0 x := 1"), (Some(0), "x := 1"));
        assert_eq!(split_index_prefix("12\tfoo()"), (Some(12), "foo()"));
        assert_eq!(split_index_prefix("42"), (None, "42"));
        assert_eq!(split_index_prefix("x := 1"), (None, "x := 1"));
        assert_eq!(
            split_index_prefix("99999999999999999999 x()"),
            (Some(usize::MAX), "x()")
        );
    }

    #[test]
    /// import 宣言の 3 形式と別名が取り出せることを確認する。
    fn import_forms_are_recognised() {
        let decls = parse_declarations("import \"fmt\"").unwrap();
        assert_eq!(decls, vec![Decl::Import(vec![ImportSpec::new("fmt")])]);

        let decls = parse_declarations("import js \"encoding/json\"").unwrap();
        assert_eq!(
            decls,
            vec![Decl::Import(vec![ImportSpec::aliased("encoding/json", "js")])]
        );

        let decls = parse_declarations("import (\n\t\"os\"\n\t_ \"net/http/pprof\"\n)").unwrap();
        assert_eq!(
            decls,
            vec![Decl::Import(vec![
                ImportSpec::new("os"),
                ImportSpec::aliased("net/http/pprof", "_"),
            ])]
        );
    }

    #[test]
    /// 関数・型・変数宣言が定義として分類され、元の順序を保つことを確認する。
    fn definitions_keep_kind_and_order() {
        let decls = parse_declarations("type T int; func (t T) M() {}; var v = 1; const c = 2").unwrap();
        let kinds: Vec<DefKind> = decls
            .iter()
            .map(|d| match d {
                Decl::Definition(def) => def.kind,
                Decl::Import(_) => panic!("unexpected import"),
            })
            .collect();
        assert_eq!(kinds, vec![DefKind::Type, DefKind::Func, DefKind::Var, DefKind::Const]);
    }

    #[test]
    fn package_clause_is_ignored_only_at_the_front() {
        let decls = parse_declarations("package main\nfunc f() {}").unwrap();
        assert_eq!(decls.len(), 1);
        assert!(matches!(
            parse_declarations("func f() {}\npackage main"),
            Err(FragmentError::Syntax(_))
        ));
    }

    #[test]
    fn statements_are_split_on_top_level_semicolons() {
        assert_eq!(stmt_texts("a := 1; b := 2"), vec!["a := 1", "b := 2"]);
        assert_eq!(
            stmt_texts("for i := 0; i < 3; i++ {\n    println(i)\n}"),
            vec!["for i := 0; i < 3; i++ {\n    println(i)\n}"]
        );
        assert_eq!(
            stmt_texts("if v := f(); v > 0 { g() } else if w := h(); w { k() }"),
            vec!["if v := f(); v > 0 { g() } else if w := h(); w { k() }"]
        );
    }

    #[test]
    /// ヘッダ中の複合リテラルや関数リテラルを本体と取り違えないことを確認する。
    fn header_literals_do_not_close_the_header() {
        assert_eq!(
            stmt_texts("for _, v := range []int{1, 2} { println(v) }"),
            vec!["for _, v := range []int{1, 2} { println(v) }"]
        );
        assert_eq!(
            stmt_texts("for _, s := range []struct{ a int }{{1}} { println(s.a) }"),
            vec!["for _, s := range []struct{ a int }{{1}} { println(s.a) }"]
        );
        assert_eq!(
            stmt_texts("if f := func() bool { return true }; f() { println(1) }"),
            vec!["if f := func() bool { return true }; f() { println(1) }"]
        );
        assert_eq!(stmt_texts("if m[k] { g() }"), vec!["if m[k] { g() }"]);
    }

    #[test]
    /// 短縮変数宣言の左辺名だけが defines に入ることを確認する。
    fn short_variable_declarations_report_names() {
        let stmts = parse_statements("a, b := 1, 2; c = 3; d, _ := f()").unwrap();
        assert_eq!(stmts[0].defines, vec!["a", "b"]);
        assert!(stmts[1].defines.is_empty());
        assert_eq!(stmts[2].defines, vec!["d", "_"]);
        let stmts = parse_statements("for i := 0; i < 1; i++ {}").unwrap();
        assert!(stmts[0].defines.is_empty());
    }

    #[test]
    fn unfinished_input_is_incomplete() {
        assert!(is_incomplete("func f() {"));
        assert!(is_incomplete("x := f(1,"));
        assert!(is_incomplete("x := 1 +"));
        assert!(is_incomplete("import ("));
        assert!(is_incomplete("s := `multi"));
        assert!(is_incomplete("for i := 0; i < 3; i++"));
        assert!(is_incomplete("if x { } else"));
        assert!(is_incomplete("/* comment"));
    }

    #[test]
    fn hard_errors_are_syntax_errors() {
        assert_eq!(syntax_code("x := \"abc"), "LEX003");
        assert_eq!(syntax_code("f())"), "FRG001");
        assert_eq!(syntax_code("x := @"), "LEX090");
        assert_eq!(syntax_code("import \"fmt\"; x := 1"), "FRG006");
        assert_eq!(syntax_code("if x\n{\n}"), "FRG002");
        assert_eq!(syntax_code("import 42"), "FRG010");
    }

    #[test]
    fn declarations_win_over_statements_for_var() {
        assert!(matches!(
            parse_fragment("var x = 1"),
            Ok(Fragment::Declarations(_))
        ));
        assert!(matches!(
            parse_fragment("func() { println(1) }()"),
            Ok(Fragment::Statements(_))
        ));
    }

    #[test]
    /// コメントだけ・空白だけの断片は空の宣言リストになる。
    fn empty_and_comment_only_fragments() {
        assert_eq!(parse_fragment("").unwrap(), Fragment::Declarations(Vec::new()));
        assert_eq!(
            parse_fragment("// just a note").unwrap(),
            Fragment::Declarations(Vec::new())
        );
    }
}
