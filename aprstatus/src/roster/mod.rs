//! Operator roster.
//!
//! Maps callsigns to the platform users that own them. The mapping is built
//! by pattern-matching callsigns out of directory names and is reconciled on
//! every refresh: identities are overwritten in place (dispatch timestamps
//! survive), and callsigns no platform user mentions any more are dropped.
//! Lookups and timestamp updates run concurrently with refresh under a
//! reader/writer lock; the directory fetch happens before the lock is taken.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::platform::{PlatformError, PlatformUser, PresenceClient};

/// Callsign shape: two alphanumerics, a digit, then two or three more.
fn callsign_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w{2}\d\w{2,3}").unwrap())
}

/// Record for one callsign found in the platform directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorRecord {
    /// Platform identifier for status calls.
    pub user_id: String,
    /// Name shown in logs.
    pub display_name: String,
    /// When a status was last dispatched for this callsign; `None` means
    /// never.
    pub last_update: Option<DateTime<Utc>>,
    /// Source that produced the last dispatched status.
    pub last_update_source: String,
}

impl OperatorRecord {
    fn from_user(user: &PlatformUser) -> Self {
        Self {
            user_id: user.id.clone(),
            display_name: user.preferred_name().to_string(),
            last_update: None,
            last_update_source: String::new(),
        }
    }

    /// Overwrite the platform identity, preserving dispatch timestamps.
    fn update_identity(&mut self, user: &PlatformUser) {
        self.user_id = user.id.clone();
        self.display_name = user.preferred_name().to_string();
    }
}

/// Counters for one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// The callsign → operator mapping.
#[derive(Default)]
pub struct Roster {
    records: RwLock<HashMap<String, OperatorRecord>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the platform directory and reconcile the mapping against it.
    ///
    /// A failed fetch leaves the existing mapping untouched.
    pub async fn refresh<C: PresenceClient>(
        &self,
        client: &C,
    ) -> Result<RefreshStats, PlatformError> {
        info!("fetching user directory");
        let users = client.list_users().await?;
        Ok(self.apply_directory(&users))
    }

    /// Reconcile the mapping against a directory listing.
    ///
    /// Holds the write lock for the whole add/update/remove pass so readers
    /// never observe a half-rebuilt mapping.
    pub fn apply_directory(&self, users: &[PlatformUser]) -> RefreshStats {
        let mut stats = RefreshStats::default();
        let Ok(mut records) = self.records.write() else {
            return stats;
        };

        for user in users {
            if user.deleted {
                debug!(user = %user.name, "ignoring deleted user");
                stats.skipped += 1;
                continue;
            }
            let callsigns = extract_callsigns(user);
            if callsigns.is_empty() {
                debug!(user = %user.name, name = %user.preferred_name(), "ignoring user without callsign");
                stats.skipped += 1;
                continue;
            }
            for callsign in callsigns {
                match records.entry(callsign) {
                    Entry::Occupied(mut entry) => {
                        entry.get_mut().update_identity(user);
                        debug!(callsign = %entry.key(), user = %user.preferred_name(), "operator updated");
                        stats.updated += 1;
                    }
                    Entry::Vacant(entry) => {
                        info!(callsign = %entry.key(), user = %user.preferred_name(), "operator added");
                        entry.insert(OperatorRecord::from_user(user));
                        stats.added += 1;
                    }
                }
            }
        }

        // Drop callsigns no listed name mentions any more. The scan covers
        // the listing as fetched, deleted entries included, mirroring the
        // extraction side's name fields.
        records.retain(|callsign, _| {
            let listed = users.iter().any(|user| {
                user.real_name.to_uppercase().contains(callsign.as_str())
                    || user.display_name.to_uppercase().contains(callsign.as_str())
            });
            if !listed {
                info!(callsign = %callsign, "operator removed, no longer listed");
                stats.removed += 1;
            }
            listed
        });

        stats
    }

    /// Record for a callsign, if one is known. Case-insensitive.
    pub fn lookup(&self, callsign: &str) -> Option<OperatorRecord> {
        let key = callsign.to_uppercase();
        self.records.read().ok()?.get(&key).cloned()
    }

    /// Stamp a record with the time and source of an accepted dispatch.
    ///
    /// Returns false when the callsign is not in the mapping (it may have
    /// been removed by a concurrent refresh).
    pub fn mark_updated(&self, callsign: &str, now: DateTime<Utc>, source: &str) -> bool {
        let key = callsign.to_uppercase();
        let Ok(mut records) = self.records.write() else {
            return false;
        };
        match records.get_mut(&key) {
            Some(record) => {
                record.last_update = Some(now);
                record.last_update_source = source.to_string();
                true
            }
            None => false,
        }
    }

    /// All known callsigns, sorted.
    pub fn callsigns(&self) -> Vec<String> {
        let Ok(records) = self.records.read() else {
            return Vec::new();
        };
        let mut callsigns: Vec<String> = records.keys().cloned().collect();
        callsigns.sort();
        callsigns
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> HashMap<String, OperatorRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

/// Pull callsigns out of a directory entry.
///
/// The real name is the primary field; the profile display name is only
/// consulted when the real name yields nothing. Matching runs on the
/// upper-cased text, so the returned keys are already normalized.
fn extract_callsigns(user: &PlatformUser) -> Vec<String> {
    let real_name = user.real_name.to_uppercase();
    let callsigns: Vec<String> = callsign_pattern()
        .find_iter(&real_name)
        .map(|m| m.as_str().to_string())
        .collect();
    if !callsigns.is_empty() {
        return callsigns;
    }

    let display_name = user.display_name.to_uppercase();
    callsign_pattern()
        .find_iter(&display_name)
        .map(|m| m.as_str().to_string())
        .collect()
}
