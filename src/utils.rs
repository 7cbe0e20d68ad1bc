use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use sqlx::SqlitePool;

/// Portal local time, UTC+07:00.
const PORTAL_UTC_OFFSET_SECS: i32 = 7 * 3600;

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

pub(crate) fn get_now() -> DateTime<FixedOffset> {
    DateTime::<FixedOffset>::from(chrono::offset::Local::now())
}

pub fn portal_offset() -> FixedOffset {
    FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Unix seconds as an instant in portal local time.
pub fn deadline_from_epoch(epoch: i64) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .map(|dt| dt.with_timezone(&portal_offset()))
}
