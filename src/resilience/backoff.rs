//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Highest exponent applied to the delta; later attempts sit at `max_ms` anyway.
const MAX_EXPONENT: u32 = 30;

const JITTER_MIN_PERMILLE: u128 = 800;
const JITTER_MAX_PERMILLE: u128 = 1200;

/// Calculate the delay before retry number `attempt`.
///
/// `attempt` counts failures so far: 0 means "before the first call" and
/// never waits. For `attempt >= 1` the delay is
/// `min_ms + (2^attempt - 1) * jittered(delta_ms)`, capped at `max_ms`,
/// where the delta is scaled by a random factor in `[0.8, 1.2]`. The
/// growth term outpaces the jitter spread, so delays never shrink from one
/// attempt to the next. Past [`MAX_EXPONENT`] the growth term stops
/// doubling, so those attempts take the top of the jitter range instead.
pub fn calculate_backoff(attempt: u32, min_ms: u64, max_ms: u64, delta_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let growth = (1u128 << attempt.min(MAX_EXPONENT)) - 1;
    let jitter_permille: u128 = if attempt > MAX_EXPONENT {
        JITTER_MAX_PERMILLE
    } else {
        rand::thread_rng().gen_range(JITTER_MIN_PERMILLE..=JITTER_MAX_PERMILLE)
    };
    let spread = growth * u128::from(delta_ms) * jitter_permille / 1000;
    let spread = u64::try_from(spread).unwrap_or(u64::MAX);

    Duration::from_millis(min_ms.saturating_add(spread).min(max_ms))
}

/// Stretch `delay` to honor a server retry hint, still capped at `max_ms`.
pub fn apply_retry_hint(delay: Duration, hint: Option<Duration>, max_ms: u64) -> Duration {
    let hinted = hint.unwrap_or_default();
    delay.max(hinted).min(Duration::from_millis(max_ms))
}
