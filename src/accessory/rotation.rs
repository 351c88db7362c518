use chrono::{DateTime, TimeDelta, Utc};

/// How often a beacon replaces the key it broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    nanos: i128,
}

impl Cadence {
    /// Cadence of the primary key, used while the beacon is near its owner.
    pub const PRIMARY: Self = Self::from_secs(15 * 60);
    /// Cadence of the secondary key, used once the beacon has been separated.
    pub const SECONDARY: Self = Self::from_secs(24 * 60 * 60);

    const NANOS_PER_SEC: i128 = 1_000_000_000;

    const fn from_secs(secs: i64) -> Self {
        Self {
            nanos: secs as i128 * Self::NANOS_PER_SEC,
        }
    }

    /// A cadence of `period`, which must be positive.
    pub fn new(period: TimeDelta) -> Option<Self> {
        let nanos = delta_nanos(period);
        (nanos > 0).then_some(Self { nanos })
    }
}

/// The slice of a key schedule covering a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationWindow {
    /// Number of keys to derive. Never zero.
    pub count: u64,
    /// Number of rotations between the initial time and the (aligned) start of the window.
    pub offset: u64,
}

/// Work out which keys a beacon paired at `initial_time` broadcast between `from` and `to`.
///
/// `from` is aligned down to a multiple of the cadence first. Rotation counts are
/// truncated toward zero, not floored, so when `from` precedes `initial_time` the
/// window is one rotation shorter than a floor-based count would make it. Key sets
/// derived by peers depend on this; do not "fix" it.
pub fn rotation_window(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    initial_time: DateTime<Utc>,
    cadence: Cadence,
) -> RotationWindow {
    let from = unix_nanos(from);
    let real_from = from - from.rem_euclid(cadence.nanos);

    let elapsed_from = real_from - unix_nanos(initial_time);
    let elapsed_to = unix_nanos(to) - unix_nanos(initial_time);

    // `/` on integers truncates toward zero
    let rotations_from = elapsed_from / cadence.nanos;
    let rotations_to = elapsed_to / cadence.nanos;

    let count = rotations_to - rotations_from;
    // at least one key, even for empty or inverted windows
    let count = if count <= 0 { 1 } else { count };

    RotationWindow {
        count: u64::try_from(count).unwrap_or(u64::MAX),
        offset: u64::try_from(rotations_from.max(0)).unwrap_or(u64::MAX),
    }
}

fn unix_nanos(time: DateTime<Utc>) -> i128 {
    i128::from(time.timestamp()) * Cadence::NANOS_PER_SEC
        + i128::from(time.timestamp_subsec_nanos())
}

fn delta_nanos(delta: TimeDelta) -> i128 {
    // both parts carry the sign of the delta
    i128::from(delta.num_seconds()) * Cadence::NANOS_PER_SEC + i128::from(delta.subsec_nanos())
}
