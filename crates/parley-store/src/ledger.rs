use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::error::StoreError;

/// Durable mapping of banned identity -> expiry instant.
///
/// Backed by a JSON file holding a list of `[identity, epochMillis]` pairs,
/// rewritten wholesale on every mutation. Lookups are exact-match on the
/// identity string as it was banned; expired records are evicted lazily.
/// Storage failures are logged and swallowed so moderation keeps working on
/// the in-memory state.
pub struct BanLedger {
    inner: Mutex<Inner>,
}

struct Inner {
    path: Option<PathBuf>,
    bans: BTreeMap<String, DateTime<Utc>>,
}

impl BanLedger {
    /// Open the ledger backed by `path`. Records already expired are not
    /// loaded; a missing or unreadable file yields an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut bans = BTreeMap::new();

        if path.exists() {
            match read_entries(&path) {
                Ok(entries) => {
                    let now = Utc::now();
                    for (nick, expiry_ms) in entries {
                        if let Some(expiry) = DateTime::from_timestamp_millis(expiry_ms) {
                            if expiry > now {
                                bans.insert(nick, expiry);
                            }
                        }
                    }
                    tracing::info!(
                        path = %path.display(),
                        active = bans.len(),
                        "Loaded active bans"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load bans");
                }
            }
        }

        Self {
            inner: Mutex::new(Inner {
                path: Some(path),
                bans,
            }),
        }
    }

    /// Ledger with no backing file. Used in tests and works identically
    /// apart from persistence.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                path: None,
                bans: BTreeMap::new(),
            }),
        }
    }

    /// True iff a non-expired record exists for exactly `nick`. An expired
    /// record is removed on the spot and the file rewritten.
    pub fn is_banned(&self, nick: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.bans.get(nick) {
            Some(expiry) if *expiry > Utc::now() => true,
            Some(_) => {
                inner.bans.remove(nick);
                persist(&inner);
                false
            }
            None => false,
        }
    }

    /// Insert or overwrite a record expiring `minutes` from now, then
    /// persist. Always succeeds in memory.
    pub fn ban(&self, nick: &str, minutes: i64) {
        let mut inner = self.inner.lock();
        inner
            .bans
            .insert(nick.to_string(), Utc::now() + Duration::minutes(minutes));
        persist(&inner);
    }

    /// Remove a record if present; persists only when something was removed.
    /// Returns whether a record existed.
    pub fn unban(&self, nick: &str) -> bool {
        let mut inner = self.inner.lock();
        let existed = inner.bans.remove(nick).is_some();
        if existed {
            persist(&inner);
        }
        existed
    }

    /// Whole minutes left on an active ban, rounded up. None when no
    /// record exists or it has already expired.
    pub fn remaining_minutes(&self, nick: &str) -> Option<i64> {
        let inner = self.inner.lock();
        let expiry = inner.bans.get(nick)?;
        let ms = (*expiry - Utc::now()).num_milliseconds();
        if ms <= 0 {
            return None;
        }
        Some((ms + 59_999) / 60_000)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().bans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_entries(path: &Path) -> Result<Vec<(String, i64)>, StoreError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Rewrite the whole file from the in-memory map. Failures are logged and
/// the in-memory state stands.
fn persist(inner: &Inner) {
    let Some(path) = &inner.path else {
        return;
    };

    let entries: Vec<(&String, i64)> = inner
        .bans
        .iter()
        .map(|(nick, expiry)| (nick, expiry.timestamp_millis()))
        .collect();

    let result = serde_json::to_string_pretty(&entries)
        .map_err(StoreError::from)
        .and_then(|json| std::fs::write(path, json).map_err(StoreError::from));

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Failed to persist bans");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parley-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("bans.json")
    }

    #[test]
    fn ban_then_is_banned() {
        let ledger = BanLedger::in_memory();
        assert!(!ledger.is_banned("carol"));

        ledger.ban("carol", 35);
        assert!(ledger.is_banned("carol"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn ban_lookup_is_exact_match() {
        let ledger = BanLedger::in_memory();
        ledger.ban("Carol", 35);
        assert!(ledger.is_banned("Carol"));
        assert!(!ledger.is_banned("carol"));
    }

    #[test]
    fn expired_ban_evicted_on_lookup() {
        let ledger = BanLedger::in_memory();
        ledger.ban("carol", -1);
        assert!(!ledger.is_banned("carol"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn unban_reports_whether_record_existed() {
        let ledger = BanLedger::in_memory();
        ledger.ban("carol", 35);
        assert!(ledger.unban("carol"));
        assert!(!ledger.unban("carol"));
        assert!(!ledger.is_banned("carol"));
    }

    #[test]
    fn remaining_minutes_rounds_up() {
        let ledger = BanLedger::in_memory();
        ledger.ban("carol", 35);
        let remaining = ledger.remaining_minutes("carol").unwrap();
        assert!(remaining == 35 || remaining == 34, "got: {remaining}");

        assert!(ledger.remaining_minutes("nobody").is_none());
    }

    #[test]
    fn bans_survive_reload() {
        let path = temp_file();
        {
            let ledger = BanLedger::load(&path);
            ledger.ban("carol", 35);
        }
        let ledger = BanLedger::load(&path);
        assert!(ledger.is_banned("carol"));
    }

    #[test]
    fn expired_records_not_loaded() {
        let path = temp_file();
        {
            let ledger = BanLedger::load(&path);
            ledger.ban("old", -5);
            ledger.ban("fresh", 35);
        }
        let ledger = BanLedger::load(&path);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_banned("fresh"));
        assert!(!ledger.is_banned("old"));
    }

    #[test]
    fn corrupt_file_yields_empty_ledger() {
        let path = temp_file();
        std::fs::write(&path, "not json at all").unwrap();

        let ledger = BanLedger::load(&path);
        assert!(ledger.is_empty());

        // And mutations still persist over the corrupt file.
        ledger.ban("carol", 35);
        let reloaded = BanLedger::load(&path);
        assert!(reloaded.is_banned("carol"));
    }

    #[test]
    fn file_holds_identity_millis_pairs() {
        let path = temp_file();
        let ledger = BanLedger::load(&path);
        ledger.ban("carol", 35);

        let data = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<(String, i64)> = serde_json::from_str(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "carol");
        assert!(entries[0].1 > Utc::now().timestamp_millis());
    }

    #[test]
    fn unban_rewrites_file() {
        let path = temp_file();
        let ledger = BanLedger::load(&path);
        ledger.ban("carol", 35);
        ledger.unban("carol");

        let reloaded = BanLedger::load(&path);
        assert!(reloaded.is_empty());
    }
}
