//! Directory-listing cache policies.
//!
//! ```text
//! NoCaching        → read_dir on every call
//! CheckTimestamps  → stat dir, refresh when mtime moved
//! FuzzyTimestamps  → trust listing for one quantum, then behave like
//!                    CheckTimestamps (plus refresh when the last refresh
//!                    landed within one quantum of the dir mtime)
//! FullCaching      → refresh only after explicit invalidation
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::metadata::FileMetadata;

/// Directory-listing freshness policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CachingMode {
    /// Always hit the underlying medium.
    NoCaching,
    /// Revalidate a cached listing by comparing the directory timestamp.
    #[default]
    CheckTimestamps,
    /// Revalidate only after a coarse time quantum has elapsed.
    FuzzyTimestamps,
    /// Cache until explicitly invalidated.
    FullCaching,
}

impl CachingMode {
    /// Whether listings are memoized at all.
    pub fn is_caching(self) -> bool {
        self != CachingMode::NoCaching
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            CachingMode::NoCaching => 0,
            CachingMode::CheckTimestamps => 1,
            CachingMode::FuzzyTimestamps => 2,
            CachingMode::FullCaching => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CachingMode::NoCaching,
            2 => CachingMode::FuzzyTimestamps,
            3 => CachingMode::FullCaching,
            _ => CachingMode::CheckTimestamps,
        }
    }
}

/// A memoized directory listing.
#[derive(Debug, Clone)]
pub struct DirListing {
    /// Entries in the order the medium returned them, sorted by name.
    pub entries: Arc<Vec<FileMetadata>>,
    /// Directory mtime observed when the listing was read.
    pub dir_modified: Option<DateTime<Utc>>,
    /// When the listing was read.
    pub refreshed_at: DateTime<Utc>,
    /// When the listing was last confirmed fresh.
    pub checked_at: DateTime<Utc>,
}

/// What to do with a cached listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Freshness {
    /// Use as-is.
    Fresh,
    /// Use as-is, but record that it was revalidated now.
    Confirmed,
    /// Directory vanished; treat as empty.
    Vanished,
    /// Re-read the directory.
    Stale,
}

/// Decide whether `listing` may be served under `mode`.
///
/// `current_mtime` is only consulted by the timestamp modes; callers pass a
/// closure so `FullCaching` and a fresh fuzzy window never stat.
pub(crate) fn revalidate(
    mode: CachingMode,
    listing: &DirListing,
    now: DateTime<Utc>,
    quantum: Duration,
    current_mtime: impl FnOnce() -> Option<DateTime<Utc>>,
) -> Freshness {
    match mode {
        CachingMode::NoCaching => Freshness::Stale,
        CachingMode::FullCaching => Freshness::Fresh,
        CachingMode::CheckTimestamps => match current_mtime() {
            None => Freshness::Vanished,
            Some(mtime) if Some(mtime) != listing.dir_modified => Freshness::Stale,
            Some(_) => Freshness::Fresh,
        },
        CachingMode::FuzzyTimestamps => {
            if within(now, listing.checked_at, quantum) {
                return Freshness::Fresh;
            }
            match current_mtime() {
                None => Freshness::Vanished,
                Some(mtime) if Some(mtime) != listing.dir_modified => Freshness::Stale,
                // A refresh that raced the last write may have missed it.
                Some(mtime) if within(listing.refreshed_at, mtime, quantum) => Freshness::Stale,
                Some(_) => Freshness::Confirmed,
            }
        }
    }
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, quantum: Duration) -> bool {
    (a - b).abs().to_std().is_ok_and(|delta| delta < quantum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn listing(dir_modified: DateTime<Utc>, at: DateTime<Utc>) -> DirListing {
        DirListing {
            entries: Arc::new(Vec::new()),
            dir_modified: Some(dir_modified),
            refreshed_at: at,
            checked_at: at,
        }
    }

    #[test]
    fn test_mode_round_trips_through_u8() {
        for mode in [
            CachingMode::NoCaching,
            CachingMode::CheckTimestamps,
            CachingMode::FuzzyTimestamps,
            CachingMode::FullCaching,
        ] {
            assert_eq!(CachingMode::from_u8(mode.to_u8()), mode);
        }
    }

    #[test]
    fn test_full_caching_never_stats() {
        let now = Utc::now();
        let l = listing(now, now);
        let verdict = revalidate(CachingMode::FullCaching, &l, now, Duration::ZERO, || {
            panic!("full caching must not stat")
        });
        assert_eq!(verdict, Freshness::Fresh);
    }

    #[test]
    fn test_check_timestamps() {
        let t0 = Utc::now() - TimeDelta::seconds(10);
        let l = listing(t0, t0);
        let q = Duration::from_millis(16);
        assert_eq!(revalidate(CachingMode::CheckTimestamps, &l, Utc::now(), q, || Some(t0)), Freshness::Fresh);
        let moved = t0 + TimeDelta::seconds(1);
        assert_eq!(revalidate(CachingMode::CheckTimestamps, &l, Utc::now(), q, || Some(moved)), Freshness::Stale);
        assert_eq!(revalidate(CachingMode::CheckTimestamps, &l, Utc::now(), q, || None), Freshness::Vanished);
    }

    #[test]
    fn test_fuzzy_trusts_listing_inside_quantum() {
        let now = Utc::now();
        let l = listing(now - TimeDelta::seconds(5), now);
        let verdict = revalidate(CachingMode::FuzzyTimestamps, &l, now, Duration::from_secs(60), || {
            panic!("inside the quantum no stat is issued")
        });
        assert_eq!(verdict, Freshness::Fresh);
    }

    #[test]
    fn test_fuzzy_rechecks_after_quantum() {
        let mtime = Utc::now() - TimeDelta::seconds(30);
        let refreshed = mtime + TimeDelta::seconds(10);
        let l = listing(mtime, refreshed);
        let q = Duration::from_millis(16);
        assert_eq!(revalidate(CachingMode::FuzzyTimestamps, &l, Utc::now(), q, || Some(mtime)), Freshness::Confirmed);

        // Refresh happened in the same quantum as the write: re-read.
        let racy = listing(mtime, mtime + TimeDelta::milliseconds(3));
        assert_eq!(revalidate(CachingMode::FuzzyTimestamps, &racy, Utc::now(), q, || Some(mtime)), Freshness::Stale);
    }
}
