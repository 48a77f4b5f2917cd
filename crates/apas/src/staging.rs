// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Transient object naming and scoped release of transient resources.

use crate::error::Result;
use chrono::{DateTime, Utc};
use diagnostics::log_warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Prefix shared by every transient view and staging table.
pub const STAGING_PREFIX: &str = "__apas_staging";

const SUFFIX_LEN: usize = 10;
const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `__apas_staging_<YYYYmmddHHMMSS>_<10 uppercase alphanumerics>`.
///
/// The timestamp has second resolution; the random suffix separates runs
/// started within the same second.
pub fn staging_name<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())]))
        .collect();
    format!("{STAGING_PREFIX}_{}_{suffix}", now.format("%Y%m%d%H%M%S"))
}

/// Source of staging names: a clock plus a random generator.
pub struct StagingNamer {
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    rng: StdRng,
}

impl StagingNamer {
    /// Wall clock and an entropy-seeded generator.
    #[must_use]
    pub fn system() -> Self {
        Self {
            clock: Box::new(Utc::now),
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed clock and seed, for reproducible names.
    #[must_use]
    pub fn fixed(now: DateTime<Utc>, seed: u64) -> Self {
        Self {
            clock: Box::new(move || now),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_name(&mut self) -> String {
        staging_name((self.clock)(), &mut self.rng)
    }
}

impl Default for StagingNamer {
    fn default() -> Self {
        Self::system()
    }
}

/// Run `release` after `outcome` has been produced, on success and failure alike.
///
/// The first failure wins: when both fail, the release error is logged and
/// the body error is returned.
pub fn release_after<T>(
    outcome: Result<T>,
    what: &str,
    release: impl FnOnce() -> Result<()>,
) -> Result<T> {
    let released = release();
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            log_warn!("Releasing {what} failed after an earlier error: {error}",
                      what: what, error: release_err.to_string());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApasError;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 5)
            .single()
            .expect("valid time")
    }

    #[test]
    fn test_name_shape() {
        let name = StagingNamer::fixed(at_noon(), 7).next_name();
        let (head, suffix) = name.rsplit_once('_').expect("suffix");
        assert_eq!(head, "__apas_staging_20240101120005");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| SUFFIX_CHARS.contains(&b)));
    }

    #[test]
    fn test_fixed_namer_is_reproducible() {
        let a: Vec<String> = {
            let mut namer = StagingNamer::fixed(at_noon(), 42);
            (0..3).map(|_| namer.next_name()).collect()
        };
        let b: Vec<String> = {
            let mut namer = StagingNamer::fixed(at_noon(), 42);
            (0..3).map(|_| namer.next_name()).collect()
        };
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_release_runs_on_failure() {
        let mut released = false;
        let out: Result<()> = release_after(Err(ApasError::config("body")), "view", || {
            released = true;
            Ok(())
        });
        assert!(released);
        assert_eq!(out.unwrap_err().to_string(), "Configuration error: body");
    }

    #[test]
    fn test_original_error_wins() {
        let out: Result<()> = release_after(Err(ApasError::config("body")), "view", || {
            Err(ApasError::config("release"))
        });
        assert_eq!(out.unwrap_err().to_string(), "Configuration error: body");
    }

    #[test]
    fn test_release_error_surfaces_after_success() {
        let out = release_after(Ok(5), "view", || Err(ApasError::config("release")));
        assert_eq!(out.unwrap_err().to_string(), "Configuration error: release");
    }
}
