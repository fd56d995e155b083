//! Attendance log
//!
//! Capped, ordered, persisted record of closed sessions. The whole list is
//! stored as one keyed JSON array entry, newest first; appending past the
//! cap evicts the oldest record.

use crate::db::store;
use crate::error::Result;
use acmp_common::time::parse_minutes;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum records retained; the oldest is evicted on overflow
pub const MAX_RECORDS: usize = 10;

/// kiosk_store entry holding the serialized log
const STORE_KEY: &str = "attendance_log";

/// A closed check-in, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub member_id: String,
    pub name: String,
    #[serde(default)]
    pub temporary: bool,
    pub check_in_time: DateTime<Local>,
    pub purpose: String,
    pub topic: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Formatted whole-minute count, e.g. `"3m"`
    pub duration: String,
}

/// Derived log statistics
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: usize,
    /// Records whose visit started on the current local calendar day
    pub today: usize,
    /// 0 or 1: this subsystem supports exactly one concurrent session
    pub active: usize,
    pub average_duration_min: i64,
}

/// The persisted attendance log. Append and read are the only operations.
pub struct AttendanceLog {
    db: Pool<Sqlite>,
    /// Newest first
    records: RwLock<Vec<AttendanceRecord>>,
}

impl AttendanceLog {
    /// Open the log, restoring any persisted records
    pub async fn open(db: Pool<Sqlite>) -> Result<Self> {
        let records: Vec<AttendanceRecord> = store::get_value(&db, STORE_KEY)
            .await?
            .unwrap_or_default();
        if !records.is_empty() {
            info!("Restored {} attendance records", records.len());
        }
        Ok(Self {
            db,
            records: RwLock::new(records),
        })
    }

    /// Prepend a record, evicting the oldest past the cap, and persist the
    /// full ordered list.
    pub async fn append(&self, record: AttendanceRecord) -> Result<()> {
        let snapshot = {
            let mut records = self.records.write().await;
            records.insert(0, record);
            if records.len() > MAX_RECORDS {
                let evicted = records.pop();
                if let Some(evicted) = evicted {
                    debug!("Evicted oldest attendance record {}", evicted.id);
                }
            }
            records.clone()
        };

        store::set_value(&self.db, STORE_KEY, &snapshot).await
    }

    /// Snapshot of the stored records, newest first
    pub async fn records(&self) -> Vec<AttendanceRecord> {
        self.records.read().await.clone()
    }

    /// Derived statistics. The active count comes from the orchestrator:
    /// closed records never carry it.
    pub async fn stats(&self, session_active: bool) -> LogStats {
        let records = self.records.read().await;
        let today = Local::now().date_naive();

        let today_count = records
            .iter()
            .filter(|r| r.start_time.date_naive() == today)
            .count();

        let average_duration_min = if records.is_empty() {
            0
        } else {
            let total: i64 = records.iter().map(|r| parse_minutes(&r.duration)).sum();
            total / records.len() as i64
        };

        LogStats {
            total: records.len(),
            today: today_count,
            active: usize::from(session_active),
            average_duration_min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acmp_common::time::format_minutes;
    use chrono::Duration as ChronoDuration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_log() -> AttendanceLog {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::initialize_database(&pool).await.unwrap();
        AttendanceLog::open(pool).await.unwrap()
    }

    fn record(n: usize, minutes: i64) -> AttendanceRecord {
        let now = Local::now();
        AttendanceRecord {
            id: Uuid::new_v4(),
            member_id: format!("ACM{n:02}"),
            name: format!("Membre {n}"),
            temporary: false,
            check_in_time: now - ChronoDuration::minutes(minutes),
            purpose: "étude".to_string(),
            topic: "Non spécifié".to_string(),
            start_time: now - ChronoDuration::minutes(minutes),
            end_time: now,
            duration: format_minutes(minutes),
        }
    }

    #[tokio::test]
    async fn test_append_is_newest_first() {
        let log = setup_log().await;
        log.append(record(1, 5)).await.unwrap();
        log.append(record(2, 10)).await.unwrap();

        let records = log.records().await;
        assert_eq!(records[0].member_id, "ACM02");
        assert_eq!(records[1].member_id, "ACM01");
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let log = setup_log().await;
        for n in 1..=11 {
            log.append(record(n, 1)).await.unwrap();
        }

        let records = log.records().await;
        assert_eq!(records.len(), MAX_RECORDS);
        // First append is gone; order is strictly newest-first
        assert!(records.iter().all(|r| r.member_id != "ACM01"));
        assert_eq!(records[0].member_id, "ACM11");
        assert_eq!(records[9].member_id, "ACM02");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::initialize_database(&pool).await.unwrap();

        let log = AttendanceLog::open(pool.clone()).await.unwrap();
        log.append(record(1, 3)).await.unwrap();
        drop(log);

        let reopened = AttendanceLog::open(pool).await.unwrap();
        let records = reopened.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration, "3m");
    }

    #[tokio::test]
    async fn test_stats() {
        let log = setup_log().await;
        assert_eq!(
            log.stats(false).await,
            LogStats {
                total: 0,
                today: 0,
                active: 0,
                average_duration_min: 0
            }
        );

        log.append(record(1, 2)).await.unwrap();
        log.append(record(2, 4)).await.unwrap();

        let stats = log.stats(true).await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.average_duration_min, 3);
    }
}
