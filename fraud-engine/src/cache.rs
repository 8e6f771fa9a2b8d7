//! Profile cache
//!
//! Best-effort read-through / write-through cache in front of the
//! authoritative [`ProfileStore`](crate::store::ProfileStore). Entries older
//! than the staleness tolerance are treated as misses. Concurrent analyses
//! for the same user may overwrite each other (last write wins).

use crate::types::UserRiskProfile;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CachedProfile {
    profile: UserRiskProfile,
    cached_at: Instant,
}

/// Concurrent profile cache keyed by user ID
pub struct ProfileCache {
    entries: DashMap<String, CachedProfile>,
    ttl: Duration,
}

impl ProfileCache {
    /// Create a cache with the given staleness tolerance
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh cached profile, if any. Stale entries are evicted.
    pub fn get(&self, user_id: &str) -> Option<UserRiskProfile> {
        let fresh = self.entries.get(user_id).and_then(|entry| {
            if entry.cached_at.elapsed() <= self.ttl {
                Some(entry.profile.clone())
            } else {
                None
            }
        });

        if fresh.is_none() {
            self.entries
                .remove_if(user_id, |_, entry| entry.cached_at.elapsed() > self.ttl);
        }
        fresh
    }

    /// Insert or replace a profile
    pub fn insert(&self, profile: UserRiskProfile) {
        self.entries.insert(
            profile.user_id.clone(),
            CachedProfile {
                profile,
                cached_at: Instant::now(),
            },
        );
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistoricalAnalysis, RiskFactors, RiskLevel};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn profile(user_id: &str, score: f64) -> UserRiskProfile {
        let now = Utc::now();
        UserRiskProfile {
            user_id: user_id.to_string(),
            risk_score: score,
            risk_level: RiskLevel::Low,
            factors: RiskFactors {
                account_age: 50.0,
                transaction_history: 50.0,
                verification_level: 100.0,
                behavioral_consistency: 50.0,
                network_reputation: 50.0,
            },
            flags: BTreeSet::new(),
            created_at: now,
            last_updated: now,
            historical_analysis: HistoricalAnalysis::empty(now),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.insert(profile("u1", 12.0));

        assert_eq!(cache.get("u1").map(|p| p.risk_score), Some(12.0));
        assert!(cache.get("u2").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.insert(profile("u1", 12.0));
        cache.insert(profile("u1", 30.0));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("u1").map(|p| p.risk_score), Some(30.0));
    }

    #[test]
    fn test_stale_entries_are_evicted() {
        let cache = ProfileCache::new(Duration::ZERO);
        cache.insert(profile("u1", 12.0));
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("u1").is_none());
        assert!(cache.is_empty());
    }
}
