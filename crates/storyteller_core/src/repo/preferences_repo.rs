//! Preference flag persistence.
//!
//! # Invariants
//! - Missing keys read as `false`.
//! - `save` writes every flag in one transaction.

use crate::model::preferences::{
    Preferences, CONTINUATION_TIP_SEEN_KEY, FIRST_RUN_COMPLETE_KEY,
};
use crate::repo::{ensure_table, StoreError, StoreResult};
use rusqlite::{params, Connection};

pub trait PreferencesRepository {
    fn load(&self) -> StoreResult<Preferences>;
    fn save(&self, preferences: &Preferences) -> StoreResult<()>;
}

/// SQLite-backed preferences repository.
pub struct SqlitePreferencesRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePreferencesRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_table(conn, "preferences")?;
        Ok(Self { conn })
    }
}

impl PreferencesRepository for SqlitePreferencesRepository<'_> {
    fn load(&self) -> StoreResult<Preferences> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM preferences;")?;
        let mut rows = stmt.query([])?;
        let mut preferences = Preferences::default();
        while let Some(row) = rows.next()? {
            let key: String = row.get("key")?;
            let value = match row.get::<_, i64>("value")? {
                0 => false,
                1 => true,
                other => {
                    return Err(StoreError::InvalidData(format!(
                        "invalid preference value `{other}` for `{key}`"
                    )));
                }
            };
            match key.as_str() {
                FIRST_RUN_COMPLETE_KEY => preferences.first_run_complete = value,
                CONTINUATION_TIP_SEEN_KEY => preferences.continuation_tip_seen = value,
                _ => {}
            }
        }
        Ok(preferences)
    }

    fn save(&self, preferences: &Preferences) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in [
            (FIRST_RUN_COMPLETE_KEY, preferences.first_run_complete),
            (CONTINUATION_TIP_SEEN_KEY, preferences.continuation_tip_seen),
        ] {
            tx.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
                params![key, i64::from(value)],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PreferencesRepository, SqlitePreferencesRepository};
    use crate::db::open_db_in_memory;
    use crate::model::preferences::Preferences;

    #[test]
    fn absent_keys_read_as_false() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePreferencesRepository::try_new(&conn).unwrap();
        assert_eq!(repo.load().unwrap(), Preferences::default());
        assert!(repo.load().unwrap().is_first_run());
    }

    #[test]
    fn saved_flags_are_read_back() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqlitePreferencesRepository::try_new(&conn).unwrap();
        let preferences = Preferences {
            first_run_complete: true,
            continuation_tip_seen: false,
        };
        repo.save(&preferences).unwrap();
        assert_eq!(repo.load().unwrap(), preferences);

        let updated = Preferences {
            continuation_tip_seen: true,
            ..preferences
        };
        repo.save(&updated).unwrap();
        assert_eq!(repo.load().unwrap(), updated);
    }
}
