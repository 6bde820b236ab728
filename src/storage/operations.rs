use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::SystemTime,
};

use crate::{
    config,
    domain::{
        id::TrackId,
        track::{MusicProfile, Track, TrackStats, TrackStatus},
    },
    storage::{
        db::{self, SecondsSinceUnix, system_time_to_i64},
        error::StorageError,
        schema::{columns, tables},
        store::TrackStore,
    },
};

use columns::*;
use rusqlite::{OptionalExtension, params, params_from_iter, types::Value};
use tables::*;

/// Counts shown by `moodlist status`
#[derive(Debug, PartialEq, Eq)]
pub struct CatalogStatus {
    pub tracks: usize,
    pub active_tracks: usize,
    /// last import, `None` if nothing was ever imported
    pub imported_at: Option<SecondsSinceUnix>,
}

/// Track row before its status and play count are checked
struct TrackRow {
    id: String,
    status: String,
    play_count: Option<i64>,
}

/// SQLite-backed track catalog
pub struct Storage {
    pub(crate) db: rusqlite::Connection,
}

impl Storage {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db: rusqlite::Connection = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    /// Replaces the stored version of every given track (tags and features
    /// included) and records the import time. All or nothing.
    pub fn import_tracks(&mut self, tracks: &[Track]) -> Result<usize, StorageError> {
        self._import_tracks(SystemTime::now(), tracks)
    }

    fn _import_tracks(
        &mut self,
        import_time: SystemTime,
        tracks: &[Track],
    ) -> Result<usize, StorageError> {
        let time_secs = system_time_to_i64(import_time).map_err(StorageError::Internal)?;
        let tx = self.db.transaction()?;

        for track in tracks {
            let play_count = match &track.stats {
                Some(TrackStats {
                    play_count: Some(count),
                }) => Some(i64::try_from(*count).map_err(|_| StorageError::MalformedTrack {
                    id: track.id.to_string(),
                    reason: format!("play count {count} does not fit the database"),
                })?),
                _ => None,
            };

            let id = track.id.as_str();
            tx.execute(
                &format!("DELETE FROM {TRACK_MOODS} WHERE {TRACK_ID} = ?1"),
                params![id],
            )?;
            tx.execute(
                &format!("DELETE FROM {TRACK_FEATURES} WHERE {TRACK_ID} = ?1"),
                params![id],
            )?;
            tx.execute(
                &format!(
                    "INSERT INTO {TRACKS} ({ID}, {STATUS}, {PLAY_COUNT}) VALUES (?1, ?2, ?3)
                     ON CONFLICT ({ID}) DO UPDATE SET {STATUS} = excluded.{STATUS}, {PLAY_COUNT} = excluded.{PLAY_COUNT}"
                ),
                params![id, track.status.as_str(), play_count],
            )?;

            for mood in &track.mood_ids {
                tx.execute(
                    &format!("INSERT INTO {TRACK_MOODS} ({TRACK_ID}, {MOOD_ID}) VALUES (?1, ?2)"),
                    params![id, mood],
                )?;
            }

            if let Some(profile) = &track.music_profile {
                for (feature, value) in &profile.typical_features {
                    tx.execute(
                        &format!(
                            "INSERT INTO {TRACK_FEATURES} ({TRACK_ID}, {FEATURE}, {VALUE}) VALUES (?1, ?2, ?3)"
                        ),
                        params![id, feature, value],
                    )?;
                }
            }
        }

        tx.execute(
            &format!("INSERT INTO {IMPORTS} ({IMPORTED_AT}) VALUES (?1)"),
            params![time_secs],
        )?;

        tx.commit()?;
        log::info!("Imported {} tracks", tracks.len());
        Ok(tracks.len())
    }

    /// Reads a single track with its tags and features.
    pub fn get_track(&self, track_id: &TrackId) -> Result<Track, StorageError> {
        let row = self
            .db
            .query_row(
                &format!("SELECT {ID}, {STATUS}, {PLAY_COUNT} FROM {TRACKS} WHERE {ID} = ?1"),
                params![track_id.as_str()],
                |row| {
                    Ok(TrackRow {
                        id: row.get(0)?,
                        status: row.get(1)?,
                        play_count: row.get(2)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Err(StorageError::TrackNotFound(track_id.clone()));
        };
        self.load_tracks(vec![row])?
            .pop()
            .ok_or_else(|| StorageError::TrackNotFound(track_id.clone()))
    }

    pub fn status(&self) -> Result<CatalogStatus, StorageError> {
        let tracks: i64 =
            self.db
                .query_row(&format!("SELECT COUNT(*) FROM {TRACKS}"), [], |row| row.get(0))?;
        let active_tracks: i64 = self.db.query_row(
            &format!("SELECT COUNT(*) FROM {TRACKS} WHERE {STATUS} = ?1"),
            params![TrackStatus::Active.as_str()],
            |row| row.get(0),
        )?;
        let imported_at: Option<SecondsSinceUnix> = self.db.query_row(
            &format!("SELECT MAX({IMPORTED_AT}) FROM {IMPORTS}"),
            [],
            |row| row.get(0),
        )?;

        Ok(CatalogStatus {
            tracks: count_to_usize(tracks)?,
            active_tracks: count_to_usize(active_tracks)?,
            imported_at,
        })
    }

    /// Builds tracks from their rows, fetching tags and features for all of
    /// them with one query per table and batch.
    fn load_tracks(&self, rows: Vec<TrackRow>) -> Result<Vec<Track>, StorageError> {
        let mut moods: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut features: HashMap<String, BTreeMap<String, f64>> = HashMap::new();

        for batch in rows.chunks(DETAIL_BATCH_SIZE) {
            let in_list = placeholders(1, batch.len());
            let ids = move || batch.iter().map(|row| Value::Text(row.id.clone()));

            let mut stmt = self.db.prepare(&format!(
                "SELECT {TRACK_ID}, {MOOD_ID} FROM {TRACK_MOODS} WHERE {TRACK_ID} IN ({in_list})"
            ))?;
            let mood_rows = stmt
                .query_map(params_from_iter(ids()), |r| {
                    Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (track_id, mood) in mood_rows {
                moods.entry(track_id).or_default().insert(mood);
            }

            let mut stmt = self.db.prepare(&format!(
                "SELECT {TRACK_ID}, {FEATURE}, {VALUE} FROM {TRACK_FEATURES} WHERE {TRACK_ID} IN ({in_list})"
            ))?;
            let feature_rows = stmt
                .query_map(params_from_iter(ids()), |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, f64>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (track_id, feature, value) in feature_rows {
                features.entry(track_id).or_default().insert(feature, value);
            }
        }

        rows.into_iter()
            .map(|row| {
                let mood_ids = moods.remove(&row.id).unwrap_or_default();
                let features = features.remove(&row.id).unwrap_or_default();
                build_track(row, mood_ids, features)
            })
            .collect()
    }

    fn query_track_rows(
        &self,
        tags: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<TrackRow>, StorageError> {
        // ?1 is the status, tags take ?2..=?n+1 and the limit comes last
        let tag_params = placeholders(2, tags.len());
        let limit_param = tags.len() + 2;

        let sql = format!(
            "SELECT t.{ID}, t.{STATUS}, t.{PLAY_COUNT} FROM {TRACKS} t
             WHERE t.{STATUS} = ?1
               AND EXISTS (
                   SELECT 1 FROM {TRACK_MOODS} m
                   WHERE m.{TRACK_ID} = t.{ID} AND m.{MOOD_ID} IN ({tag_params})
               )
             ORDER BY t.{ID}
             LIMIT ?{limit_param}"
        );

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let values = std::iter::once(Value::Text(TrackStatus::Active.as_str().to_string()))
            .chain(tags.iter().map(|tag| Value::Text(tag.clone())))
            .chain(std::iter::once(Value::Integer(limit)));

        let mut stmt = self.db.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(TrackRow {
                    id: row.get(0)?,
                    status: row.get(1)?,
                    play_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

impl TrackStore for Storage {
    fn query_active_tracks_by_mood_tags(
        &self,
        tags: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<Track>, StorageError> {
        if tags.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self.query_track_rows(tags, limit)?;
        log::debug!("Store matched {} tracks for tags {:?}", rows.len(), tags);

        self.load_tracks(rows)
    }
}

/// Track ids bound per detail query, well under SQLite's variable limit.
const DETAIL_BATCH_SIZE: usize = 500;

/// `?first, ?first+1, ...` for `count` parameters
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_track(
    row: TrackRow,
    mood_ids: BTreeSet<String>,
    features: BTreeMap<String, f64>,
) -> Result<Track, StorageError> {
    let malformed = |reason: String| StorageError::MalformedTrack {
        id: row.id.clone(),
        reason,
    };

    let id = TrackId::parse(&row.id).map_err(|e| malformed(e.to_string()))?;
    let status = row
        .status
        .parse::<TrackStatus>()
        .map_err(|e| malformed(e.to_string()))?;
    let play_count = row
        .play_count
        .map(|count| {
            u64::try_from(count).map_err(|_| malformed(format!("negative play count {count}")))
        })
        .transpose()?;

    Ok(Track {
        id,
        mood_ids,
        status,
        // the schema cannot tell an empty profile from a missing one
        music_profile: (!features.is_empty()).then(|| MusicProfile {
            typical_features: features,
        }),
        stats: play_count.map(|count| TrackStats {
            play_count: Some(count),
        }),
    })
}

fn count_to_usize(count: i64) -> Result<usize, StorageError> {
    usize::try_from(count).map_err(|e| {
        StorageError::Internal(anyhow::anyhow!(
            "Strange conversion error to usize after select count: {e}"
        ))
    })
}

#[cfg(test)]
pub(crate) fn setup_storage() -> anyhow::Result<Storage> {
    let conn = rusqlite::Connection::open_in_memory()?;
    crate::storage::schema::init(&conn)?;
    Ok(Storage::from_existing_conn(conn))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeSet,
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use rusqlite::params;

    use super::setup_storage;
    use crate::{
        domain::{
            id::TrackId,
            track::{Track, TrackStatus},
        },
        storage::{error::StorageError, schema::*, store::TrackStore},
    };

    fn mock_track(id: &str) -> Track {
        Track::new(TrackId::parse(id).unwrap())
    }

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_import_and_get_track() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;

        let track = mock_track("trk-1")
            .with_moods(["workout", "energetic"])
            .with_feature("energy", 0.8)
            .with_feature("tempo", 150.0)
            .with_play_count(1000);

        let imported = storage.import_tracks(&[track.clone()])?;
        assert_eq!(imported, 1);

        let loaded = storage.get_track(&track.id)?;
        assert_eq!(loaded, track);

        Ok(())
    }

    #[test]
    fn test_import_keeps_missing_optionals_missing() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;

        let track = mock_track("bare").with_moods(["chill"]);
        storage.import_tracks(&[track.clone()])?;

        let loaded = storage.get_track(&track.id)?;
        assert!(loaded.music_profile.is_none());
        assert!(loaded.stats.is_none());
        assert_eq!(loaded.play_count(), 0);

        Ok(())
    }

    #[test]
    fn test_reimport_replaces_tags_and_features() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;

        storage.import_tracks(&[mock_track("a")
            .with_moods(["chill", "mellow"])
            .with_feature("energy", 0.2)])?;
        storage.import_tracks(&[mock_track("a")
            .with_moods(["workout"])
            .with_feature("tempo", 140.0)
            .with_status(TrackStatus::Inactive)])?;

        let loaded = storage.get_track(&TrackId::parse("a")?)?;
        assert_eq!(loaded.mood_ids, tags(&["workout"]));
        assert_eq!(loaded.feature("energy"), None);
        assert_eq!(loaded.feature("tempo"), Some(140.0));
        assert_eq!(loaded.status, TrackStatus::Inactive);

        Ok(())
    }

    #[test]
    fn test_get_track_not_in_db() -> anyhow::Result<()> {
        let storage = setup_storage()?;

        let result = storage.get_track(&TrackId::parse("missing")?);

        assert!(matches!(result, Err(StorageError::TrackNotFound(id)) if id.as_str() == "missing"));

        Ok(())
    }

    #[test]
    fn test_query_matches_any_tag() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;
        storage.import_tracks(&[
            mock_track("a").with_moods(["workout"]),
            mock_track("b").with_moods(["energetic", "party"]),
            mock_track("c").with_moods(["chill"]),
        ])?;

        let tracks =
            storage.query_active_tracks_by_mood_tags(&tags(&["energetic", "workout"]), 200)?;

        assert_eq!(ids(&tracks), vec!["a", "b"]);

        Ok(())
    }

    #[test]
    fn test_query_returns_track_once_when_several_tags_match() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;
        storage.import_tracks(&[mock_track("a").with_moods(["energetic", "workout"])])?;

        let tracks =
            storage.query_active_tracks_by_mood_tags(&tags(&["energetic", "workout"]), 200)?;

        assert_eq!(ids(&tracks), vec!["a"]);
        assert_eq!(tracks[0].mood_ids, tags(&["energetic", "workout"]));

        Ok(())
    }

    #[test]
    fn test_query_skips_inactive_tracks() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;
        storage.import_tracks(&[
            mock_track("a").with_moods(["workout"]),
            mock_track("b")
                .with_moods(["workout"])
                .with_status(TrackStatus::Inactive),
            mock_track("c")
                .with_moods(["workout"])
                .with_status(TrackStatus::Removed),
        ])?;

        let tracks = storage.query_active_tracks_by_mood_tags(&tags(&["workout"]), 200)?;

        assert_eq!(ids(&tracks), vec!["a"]);

        Ok(())
    }

    #[test]
    fn test_query_respects_limit() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;
        let tracks = (0..10)
            .map(|i| mock_track(&format!("t{i:02}")).with_moods(["focus"]))
            .collect::<Vec<_>>();
        storage.import_tracks(&tracks)?;

        let result = storage.query_active_tracks_by_mood_tags(&tags(&["focus"]), 3)?;
        assert_eq!(result.len(), 3);

        let none = storage.query_active_tracks_by_mood_tags(&tags(&["focus"]), 0)?;
        assert!(none.is_empty());

        Ok(())
    }

    #[test]
    fn test_query_with_no_tags_is_empty() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;
        storage.import_tracks(&[mock_track("a").with_moods(["focus"])])?;

        let result = storage.query_active_tracks_by_mood_tags(&BTreeSet::new(), 10)?;
        assert!(result.is_empty());

        Ok(())
    }

    #[test]
    fn test_query_reports_malformed_rows() -> anyhow::Result<()> {
        let storage = setup_storage()?;
        storage.db.execute(
            &format!("INSERT INTO {TRACKS} ({ID}, {STATUS}, {PLAY_COUNT}) VALUES (?1, ?2, ?3)"),
            params!["bad", "active", -5],
        )?;
        storage.db.execute(
            &format!("INSERT INTO {TRACK_MOODS} ({TRACK_ID}, {MOOD_ID}) VALUES (?1, ?2)"),
            params!["bad", "focus"],
        )?;

        let result = storage.query_active_tracks_by_mood_tags(&tags(&["focus"]), 10);

        assert!(matches!(result, Err(StorageError::MalformedTrack { id, .. }) if id == "bad"));

        Ok(())
    }

    #[test]
    fn test_query_attaches_details_across_batches() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;

        let count = super::DETAIL_BATCH_SIZE * 2 + 7;
        let tracks = (0..count)
            .map(|i| {
                mock_track(&format!("t{i:05}"))
                    .with_moods(["focus".to_string(), format!("tag-{i}")])
                    .with_feature("energy", i as f64)
            })
            .collect::<Vec<_>>();
        storage.import_tracks(&tracks)?;

        let loaded = storage.query_active_tracks_by_mood_tags(&tags(&["focus"]), count + 10)?;

        assert_eq!(loaded.len(), count);
        for (i, track) in loaded.iter().enumerate() {
            assert_eq!(track.id.as_str(), format!("t{i:05}"));
            assert_eq!(track.feature("energy"), Some(i as f64));
            assert_eq!(track.mood_ids, tags(&["focus", &format!("tag-{i}")]));
        }

        Ok(())
    }

    #[test]
    fn test_status_counts_and_import_time() -> anyhow::Result<()> {
        let mut storage = setup_storage()?;

        let empty = storage.status()?;
        assert_eq!(empty.tracks, 0);
        assert_eq!(empty.imported_at, None);

        let import_time = UNIX_EPOCH + Duration::from_secs(200);
        storage._import_tracks(
            import_time,
            &[
                mock_track("a").with_moods(["focus"]),
                mock_track("b")
                    .with_moods(["focus"])
                    .with_status(TrackStatus::Pending),
            ],
        )?;

        let status = storage.status()?;
        assert_eq!(status.tracks, 2);
        assert_eq!(status.active_tracks, 1);
        assert_eq!(status.imported_at, Some(200));

        storage._import_tracks(SystemTime::now(), &[])?;
        assert!(storage.status()?.imported_at > Some(200));

        Ok(())
    }
}
