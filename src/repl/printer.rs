// パス: src/repl/printer.rs
// 役割: ヘルプと起動メッセージの表示
// 意図: 対話時の固定文言を一箇所にまとめる
// 関連ファイル: src/repl/cmd.rs
pub(crate) const WELCOME: &str = concat!(
    "gop: Go の断片を組み立てて実行する REPL (Rust)\n",
    "'?' でコマンド一覧を表示します。\n",
);

const HELP_TEXT: &str = concat!(
    "コマンド:\n",
    "  ?|help                  ヘルプ（本メッセージ）\n",
    "  -[dpc][#],[#]-[#],...   定義(d) / import(p) / 文(c) を削除（番号省略で最後の 1 件）\n",
    "  ![!]                    組み立て中のソースを表示（!! で行番号付き）\n",
    "  <tmpl                   テンプレートを読み込む\n",
    "  >tmpl                   テンプレートへ書き出す\n",
    "  [#]...                  定義または文を追加（# は挿入位置）\n",
    "  echo EXPR               println(EXPR) の別名\n",
    "  reset                   ワークスペースを初期化\n",
    "  list                    テンプレート一覧\n",
    "  arg [TEXT]              実行時引数の表示 / 設定\n",
);

pub(crate) fn help_text() -> &'static str {
    HELP_TEXT.trim_end()
}
