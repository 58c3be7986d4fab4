// パス: src/logging.rs
// 役割: tracing の購読者を初期化する
// 意図: 診断ログを stderr へ出し、実行中プログラムの stdout と混ざらないようにする
// 関連ファイル: src/bin/gop.rs, src/session.rs
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// フィルタを読む環境変数。
pub const LOG_ENV: &str = "GOP_LOG";
const DEFAULT_FILTER: &str = "gop=warn";

/// 既に初期化済みなら false を返す。
pub fn init() -> bool {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true),
    );

    if subscriber.try_init().is_err() {
        return false;
    }
    tracing::debug!(filter_env = LOG_ENV, "tracing initialized");
    true
}
