use pharmasync_core::{
    ActionPatch, ActionPayload, ActionStatus, PendingAction, QueueStats, now_millis,
};
use rusqlite::params;

use super::{Storage, get_conn, log_row_error};
use crate::error::StorageError;

const SELECT_COLUMNS: &str = "SELECT id, action_type, entity, payload, status, retries, error,
                                     created_at_ms, updated_at_ms
                                FROM pending_actions";

fn conversion_error(
    column: usize,
    err: pharmasync_core::CoreError,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn row_to_pending_action(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingAction> {
    let action_type: String = row.get(1)?;
    let entity: String = row.get(2)?;
    let payload: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(PendingAction {
        id: row.get(0)?,
        action_type: action_type.parse().map_err(|e| conversion_error(1, e))?,
        entity: entity.parse().map_err(|e| conversion_error(2, e))?,
        payload: ActionPayload::from_json(&payload).map_err(|e| conversion_error(3, e))?,
        status: status.parse().map_err(|e| conversion_error(4, e))?,
        retries: row.get(5)?,
        error: row.get(6)?,
        timestamp: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Storage {
    /// Append a new `pending` action.
    ///
    /// # Errors
    /// Returns error if the payload cannot be encoded or the insert fails.
    pub fn enqueue_action(&self, payload: &ActionPayload) -> Result<PendingAction, StorageError> {
        let conn = get_conn(&self.pool)?;
        let now = now_millis();
        let encoded = payload.to_json()?;
        conn.execute(
            "INSERT INTO pending_actions
               (action_type, entity, payload, status, retries, created_at_ms, updated_at_ms)
               VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)",
            params![payload.action_type().as_str(), payload.entity().as_str(), encoded, now],
        )?;
        Ok(PendingAction {
            id: conn.last_insert_rowid(),
            action_type: payload.action_type(),
            entity: payload.entity(),
            payload: payload.clone(),
            timestamp: now,
            status: ActionStatus::Pending,
            retries: 0,
            error: None,
            updated_at: Some(now),
        })
    }

    /// Pending and failed actions, oldest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_pending_actions(&self) -> Result<Vec<PendingAction>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS}
              WHERE status IN ('pending', 'failed')
              ORDER BY created_at_ms ASC, id ASC"
        ))?;
        let actions = stmt.query_map([], row_to_pending_action)?.filter_map(log_row_error).collect();
        Ok(actions)
    }

    /// Every stored action regardless of status, oldest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_actions(&self, limit: usize) -> Result<Vec<PendingAction>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS}
              ORDER BY created_at_ms ASC, id ASC
              LIMIT ?1"
        ))?;
        let actions = stmt
            .query_map(params![limit as i64], row_to_pending_action)?
            .filter_map(log_row_error)
            .collect();
        Ok(actions)
    }

    /// # Errors
    /// Returns error if the query fails or the stored row is corrupt.
    pub fn get_action(&self, id: i64) -> Result<Option<PendingAction>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id], row_to_pending_action)?;
        Ok(rows.next().transpose()?)
    }

    /// Merge `patch` into the stored action. `retries` never decreases.
    ///
    /// # Errors
    /// Returns `NotFound` if the action no longer exists.
    pub fn update_action_status(&self, id: i64, patch: &ActionPatch) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        let affected = conn.execute(
            "UPDATE pending_actions
               SET status = COALESCE(?1, status),
                   retries = MAX(retries, COALESCE(?2, retries)),
                   error = COALESCE(?3, error),
                   updated_at_ms = ?4
               WHERE id = ?5",
            params![
                patch.status.map(|s| s.as_str()),
                patch.retries,
                patch.error.as_deref(),
                now_millis(),
                id
            ],
        )?;
        if affected == 0 {
            return Err(StorageError::NotFound { entity: "pending action", id: id.to_string() });
        }
        Ok(())
    }

    /// Delete an action after confirmed success. Returns whether a row existed.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    pub fn remove_action(&self, id: i64) -> Result<bool, StorageError> {
        let conn = get_conn(&self.pool)?;
        let affected = conn.execute("DELETE FROM pending_actions WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// # Errors
    /// Returns error if the query fails.
    pub fn queue_stats(&self) -> Result<QueueStats, StorageError> {
        let conn = get_conn(&self.pool)?;
        let (pending, syncing, failed, total, oldest): (
            Option<i64>,
            Option<i64>,
            Option<i64>,
            i64,
            Option<i64>,
        ) = conn.query_row(
            "SELECT
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'syncing' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END),
                COUNT(*),
                MIN(CASE WHEN status IN ('pending', 'failed') THEN created_at_ms END)
            FROM pending_actions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;
        Ok(QueueStats {
            pending: pending.unwrap_or(0) as u64,
            syncing: syncing.unwrap_or(0) as u64,
            failed: failed.unwrap_or(0) as u64,
            total: total as u64,
            oldest_pending_at: oldest,
        })
    }

    /// Put actions left in `syncing` by an interrupted drain back to `pending`.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub fn release_syncing_actions(&self) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let affected = conn.execute(
            "UPDATE pending_actions SET status = 'pending', updated_at_ms = ?1
               WHERE status = 'syncing'",
            params![now_millis()],
        )?;
        Ok(affected)
    }

    /// Drop every `failed` action.
    ///
    /// # Errors
    /// Returns error if the delete fails.
    pub fn clear_failed_actions(&self) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let affected = conn.execute("DELETE FROM pending_actions WHERE status = 'failed'", [])?;
        Ok(affected)
    }
}
