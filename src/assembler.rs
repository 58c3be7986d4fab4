// パス: src/assembler.rs
// 役割: ワークスペースから単一のコンパイル可能な Go ソースを組み立てる
// 意図: 毎回ゼロから決定的に描画し、確認表示用の id / 行番号 / 非アクティブ import を切り替える
// 関連ファイル: src/workspace.rs, src/driver.rs, src/repl/cmd.rs
//! ソース組み立て。
//!
//! 出力順は固定: package 句、アクティブ import、（任意で）非アクティブ import、空行、
//! 定義、`func main()` とその本体の文。

use std::fmt::Write as _;

use crate::workspace::Workspace;

/// 非アクティブ import に付ける目印。再コンパイル時の未使用診断と対応づく文言にしている。
pub const INACTIVE_MARKER: &str = " // imported and not used";

/// 描画オプション。すべて false がコンパイル用の描画。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// `pN:` / `dN:` / `cN:` の論理 id を行頭に付ける。
    pub ids: bool,
    /// 全行に 1 始まりの行番号を付ける。
    pub line_numbers: bool,
    /// 非アクティブ import を目印付きで含める。
    pub inactive: bool,
}

impl RenderOptions {
    pub fn compile() -> Self {
        Self::default()
    }

    /// `!` / `!!` の確認表示用。
    pub fn inspect(line_numbers: bool) -> Self {
        Self {
            ids: true,
            line_numbers,
            inactive: true,
        }
    }
}

pub fn render(ws: &Workspace, opts: RenderOptions) -> String {
    let mut out = String::new();
    let gutter = if opts.ids { "\t" } else { "" };

    out.push_str(gutter);
    out.push_str("package main\n\n");

    let mut import_no = 0usize;
    for spec in ws.active.iter() {
        if opts.ids {
            let _ = write!(out, "p{}:\t", import_no);
        }
        let _ = writeln!(out, "{}", spec);
        import_no += 1;
    }
    if opts.inactive {
        for spec in ws.inactive.iter() {
            if opts.ids {
                let _ = write!(out, "p{}:\t", import_no);
            }
            let _ = writeln!(out, "{}{}", spec, INACTIVE_MARKER);
            import_no += 1;
        }
    }
    out.push('\n');

    for (idx, def) in ws.definitions.iter().enumerate() {
        if opts.ids {
            let _ = write!(out, "d{}:\t", idx);
            out.push_str(&indent_continuation(&def.text, "\n\t"));
        } else {
            out.push_str(&def.text);
        }
        out.push_str("\n\n");
    }

    out.push_str(gutter);
    out.push_str("func main() {\n");
    for (idx, stmt) in ws.statements.iter().enumerate() {
        if opts.ids {
            let _ = write!(out, "c{}:\t\t", idx);
            out.push_str(&indent_continuation(&stmt.text, "\n\t\t"));
        } else {
            out.push('\t');
            out.push_str(&indent_continuation(&stmt.text, "\n\t"));
        }
        out.push('\n');
    }
    out.push_str(gutter);
    out.push_str("}\n");

    if opts.line_numbers {
        number_lines(&out)
    } else {
        out
    }
}

fn indent_continuation(text: &str, sep: &str) -> String {
    text.split('\n').collect::<Vec<_>>().join(sep)
}

// 末尾の改行の後ろにも空の行番号行が付く。
fn number_lines(src: &str) -> String {
    let mut numbered = String::with_capacity(src.len() + src.len() / 8);
    for (idx, line) in src.split('\n').enumerate() {
        let _ = writeln!(numbered, "{}\t{}", idx + 1, line);
    }
    numbered
}

#[cfg(test)]
mod tests {
    use super::{render, RenderOptions};
    use crate::ast::{DefKind, Definition, ImportSpec, Statement};
    use crate::workspace::Workspace;

    fn sample() -> Workspace {
        let mut ws = Workspace::default();
        ws.active.insert(ImportSpec::new("os"));
        ws.inactive.insert(ImportSpec::new("fmt"));
        ws.definitions.push(Definition {
            kind: DefKind::Func,
            text: "func f() int {\n\treturn 1\n}".into(),
        });
        ws.statements.push(Statement::new("x := f()"));
        ws.statements.push(Statement::new("if x > 0 {\n\tos.Exit(0)\n}"));
        ws
    }

    #[test]
    fn compile_rendering_omits_inactive_imports() {
        let src = render(&sample(), RenderOptions::compile());
        let expected = "package main\n\nimport \"os\"\n\nfunc f() int {\n\treturn 1\n}\n\nfunc main() {\n\tx := f()\n\tif x > 0 {\n\t\tos.Exit(0)\n\t}\n}\n";
        assert_eq!(src, expected);
    }

    #[test]
    /// id 付き描画では非アクティブ import に目印が付き、番号は通しになる。
    fn inspect_rendering_carries_ids_and_marker() {
        let src = render(&sample(), RenderOptions::inspect(false));
        assert!(src.starts_with("\tpackage main\n\np0:\timport \"os\"\np1:\timport \"fmt\" // imported and not used\n"));
        assert!(src.contains("d0:\tfunc f() int {\n\t\treturn 1\n\t}\n\n\tfunc main() {\n"));
        assert!(src.contains("c0:\t\tx := f()\nc1:\t\tif x > 0 {\n\t\t\tos.Exit(0)\n\t\t}\n\t}\n"));
    }

    #[test]
    fn line_numbers_prefix_every_line() {
        let src = render(&Workspace::default(), RenderOptions::inspect(true));
        let lines: Vec<&str> = src.lines().collect();
        assert_eq!(lines[0], "1\t\tpackage main");
        assert_eq!(lines[1], "2\t");
        assert!(lines.iter().enumerate().all(|(i, l)| l.starts_with(&format!("{}\t", i + 1))));
    }

    #[test]
    fn rendering_is_deterministic() {
        let ws = sample();
        assert_eq!(render(&ws, RenderOptions::inspect(true)), render(&ws, RenderOptions::inspect(true)));
    }
}
