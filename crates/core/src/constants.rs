//! Shared constants for pharmasync.

/// Attempts before a queued action is frozen as `failed`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Seconds a removed pre-count item can be brought back with undo.
pub const DEFAULT_UNDO_WINDOW_SECS: u64 = 5;

/// HTTP client timeout for remote backend calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// SQLite connection pool size for the local queue store.
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

/// Maximum number of rows any listing endpoint returns.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Default number of rows when the caller gives no limit.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Prefix of locally generated placeholder ids for optimistic items.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Remote table holding inventory count sessions.
pub const SESSIONS_TABLE: &str = "inventory_sessions";

/// Remote table holding pre-count scan rows, unique on `(session_id, ean)`.
pub const PRE_COUNT_ITEMS_TABLE: &str = "pre_count_items";

/// Remote table holding the product catalog, unique on `ean`.
pub const PRODUCTS_TABLE: &str = "products";
