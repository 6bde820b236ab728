use std::{
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Local};
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

pub type SecondsSinceUnix = i64;

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = match (config.in_memory, &config.path) {
        (true, _) => open_in_memory()?,
        (false, Some(path)) => open_from_file(path)?,
        (false, None) => {
            return Err(StorageError::Internal(anyhow!(
                "no database path configured"
            )));
        }
    };
    // a locked database fails the query after this long instead of blocking forever
    db.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    schema::init(&db)?;
    Ok(db)
}

/// converts time to number of seconds since unix_epoch
pub fn system_time_to_i64(time: SystemTime) -> anyhow::Result<SecondsSinceUnix> {
    i64::try_from(
        time.duration_since(UNIX_EPOCH)
            .with_context(|| "failed to get unix timestamp")?
            .as_secs(),
    )
    .with_context(|| "failed to get import timestamp in seconds")
}

/// converts number of seconds since unix epoch local time to local date time
pub fn i64_seconds_to_local_time(since_unix: i64) -> anyhow::Result<DateTime<Local>> {
    let datetime = DateTime::from_timestamp(since_unix, 0).ok_or(anyhow!(
        "failed to convert {since_unix} s timestamp to datetime"
    ))?;

    Ok(DateTime::from(datetime))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use tempfile::tempdir;

    use crate::{
        config::Database,
        storage::{
            db::{i64_seconds_to_local_time, open, system_time_to_i64},
            schema,
        },
    };

    fn in_memory() -> Database {
        Database {
            in_memory: true,
            path: None,
            busy_timeout_ms: 100,
        }
    }

    #[test]
    fn open_in_memory_db_initializes_schema() {
        let db = open(&in_memory()).unwrap();

        let mut stmt = db
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        for table in schema::tables::ALL_TABLES {
            assert!(tables.contains(&table.to_string()));
        }
    }

    #[test]
    fn open_file_db_twice_keeps_schema() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = Database {
            in_memory: false,
            path: Some(dir.path().join("catalog.db")),
            busy_timeout_ms: 100,
        };

        drop(open(&config)?);
        let db = open(&config)?;

        let count: i64 =
            db.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        assert_eq!(count, 0);

        Ok(())
    }

    #[test]
    fn open_without_path_fails() {
        let config = Database {
            in_memory: false,
            path: None,
            busy_timeout_ms: 100,
        };
        assert!(open(&config).is_err());
    }

    #[test]
    fn timestamps_round_trip() -> anyhow::Result<()> {
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let secs = system_time_to_i64(time)?;
        assert_eq!(secs, 1_700_000_000);
        assert_eq!(i64_seconds_to_local_time(secs)?.timestamp(), secs);
        Ok(())
    }
}
