//! Migration v2: status-change timestamp and drain-order index

pub(super) const COLUMN: &str = "updated_at_ms";
pub(super) const COLUMN_DEF: &str = "INTEGER";

pub(super) const INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_pending_actions_status_created
    ON pending_actions(status, created_at_ms, id);
";
