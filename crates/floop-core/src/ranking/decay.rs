//! Time-decay functions over elapsed durations. All return values in
//! `[0, 1]`; a zero/negative elapsed duration always returns `1.0`.

use chrono::Duration;

fn elapsed_days(elapsed: Duration) -> f64 {
    elapsed.num_milliseconds() as f64 / 86_400_000.0
}

/// `exp(-ln2 * elapsed / half_life)`.
pub fn exponential(elapsed: Duration, half_life_days: f64) -> f64 {
    let days = elapsed_days(elapsed);
    if days <= 0.0 {
        return 1.0;
    }
    if half_life_days <= 0.0 {
        return 0.0;
    }
    (-std::f64::consts::LN_2 * days / half_life_days).exp()
}

/// `1 - elapsed/max_age`, floored at 0.
pub fn linear(elapsed: Duration, max_age_days: f64) -> f64 {
    let days = elapsed_days(elapsed);
    if days <= 0.0 {
        return 1.0;
    }
    if max_age_days <= 0.0 {
        return 0.0;
    }
    (1.0 - days / max_age_days).max(0.0)
}

/// Step decay: 1.0 while `elapsed < recent`, 0.75 while `< medium`, 0.5
/// while `< old`, 0.25 otherwise.
pub fn step(elapsed: Duration, recent_days: f64, medium_days: f64, old_days: f64) -> f64 {
    let days = elapsed_days(elapsed);
    if days <= 0.0 {
        return 1.0;
    }
    if days < recent_days {
        1.0
    } else if days < medium_days {
        0.75
    } else if days < old_days {
        0.5
    } else {
        0.25
    }
}

/// Exponential decay floored at `min_score`.
pub fn boosted(elapsed: Duration, half_life_days: f64, min_score: f64) -> f64 {
    exponential(elapsed, half_life_days).max(min_score)
}

/// Returns 0 for a missing timestamp, otherwise `f(now - ts)`.
pub fn decay_from(ts: Option<chrono::DateTime<chrono::Utc>>, now: chrono::DateTime<chrono::Utc>, f: impl Fn(Duration) -> f64) -> f64 {
    match ts {
        None => 0.0,
        Some(ts) if ts.timestamp() == 0 => 0.0,
        Some(ts) => f(now - ts),
    }
}
