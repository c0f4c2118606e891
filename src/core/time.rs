// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Timestamp conversions.
//!
//! Blocks carry nanoseconds since the Unix epoch as `i64`. Descriptors on disk
//! and external consumers use the seconds + nanoseconds split of
//! [`prost_types::Timestamp`].

use std::time::{SystemTime, UNIX_EPOCH};

use prost_types::Timestamp;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Convert nanoseconds since the epoch to a `Timestamp`.
///
/// The split is Euclidean so `nanos` is always in `0..1_000_000_000`,
/// including for instants before the epoch.
pub fn nsec_to_timestamp(nsec: i64) -> Timestamp {
    Timestamp {
        seconds: nsec.div_euclid(NANOS_PER_SEC),
        nanos: nsec.rem_euclid(NANOS_PER_SEC) as i32,
    }
}

/// Convert a `Timestamp` to nanoseconds since the epoch.
///
/// Exact for every value produced by [`nsec_to_timestamp`]; instants outside
/// the `i64` range clamp to its bounds.
pub fn timestamp_to_nsec(ts: &Timestamp) -> i64 {
    let nsec = i128::from(ts.seconds) * i128::from(NANOS_PER_SEC) + i128::from(ts.nanos);
    nsec.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Current wall-clock time in nanoseconds since the epoch.
pub fn now_nsec() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_nanos()).unwrap_or(i64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nsec_to_timestamp() {
        let ts = nsec_to_timestamp(1_500_000_000);
        assert_eq!(ts.seconds, 1);
        assert_eq!(ts.nanos, 500_000_000);
    }

    #[test]
    fn test_pre_epoch_split() {
        let ts = nsec_to_timestamp(-1);
        assert_eq!(ts.seconds, -1);
        assert_eq!(ts.nanos, 999_999_999);
        assert_eq!(timestamp_to_nsec(&ts), -1);
    }

    #[test]
    fn test_round_trip_values() {
        for nsec in [
            0,
            1,
            999_999_999,
            1_700_000_000_123_456_789,
            -42_000_000_001,
            i64::MIN,
            i64::MIN + 1,
            i64::MAX,
        ] {
            assert_eq!(timestamp_to_nsec(&nsec_to_timestamp(nsec)), nsec);
        }
    }

    #[test]
    fn test_out_of_range_timestamp_clamps() {
        let far_past = Timestamp {
            seconds: i64::MIN,
            nanos: 0,
        };
        assert_eq!(timestamp_to_nsec(&far_past), i64::MIN);
        let far_future = Timestamp {
            seconds: i64::MAX,
            nanos: 999_999_999,
        };
        assert_eq!(timestamp_to_nsec(&far_future), i64::MAX);
    }

    #[test]
    fn test_now_is_after_2020() {
        assert!(now_nsec() > 1_577_836_800 * NANOS_PER_SEC);
    }
}
