//! Constants for the Noren adapter.

/// UAT REST endpoint used by the Noren sample applications.
pub const NOREN_UAT_BASE_URL: &str = "http://kumra.kambala.co.in:9959/NorenWClient/";

/// UAT WebSocket endpoint used by the Noren sample applications.
pub const NOREN_UAT_WS_URL: &str = "ws://kumra.kambala.co.in:9657/NorenWS/";

pub const NOREN_USER_AGENT: &str = concat!("nautilus-noren-adapter/", env!("CARGO_PKG_VERSION"));

/// Value sent as `source`/`ordersource` on every request originated by this client.
pub const NOREN_SOURCE: &str = "API";

pub const NOREN_APK_VERSION: &str = "1.0.0";

/// Separator between exchange and token in an instrument key (`NSE|22`).
pub const NOREN_KEY_DELIMITER: char = '|';

/// Separator between instrument keys in a single subscription frame.
pub const NOREN_WS_KEY_SEPARATOR: char = '#';

/// Response status for a successful call.
pub const NOREN_STAT_OK: &str = "Ok";

/// Datetime layout used by `TPSeries` and the order books.
pub const NOREN_DATETIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WS_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 3;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RECONNECT_DELAY_MAX_MS: u64 = 5_000;
pub const DEFAULT_RECONNECT_JITTER_MS: u64 = 250;

/// Growth factor between consecutive reconnect delays.
pub const RECONNECT_BACKOFF_FACTOR: f64 = 2.0;
