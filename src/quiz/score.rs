//! Answer-latency scoring.

const BASE_SCORE: f64 = 100.0;
/// Answering within this many seconds earns the full base score.
const PERFECT_TIME: f64 = 3.0;
/// At or beyond this the multiplier bottoms out.
const MAX_ANSWER_TIME: f64 = 5.0;
const MIN_MULTIPLIER: f64 = 0.1;

/// Points for a correct answer given its latency in seconds. Between the
/// perfect and maximum times the multiplier falls linearly from 1.0 to
/// [`MIN_MULTIPLIER`]; the product is truncated to an integer.
pub fn calculate_score(answer_time_secs: f64) -> i64 {
    if answer_time_secs <= PERFECT_TIME {
        return BASE_SCORE as i64;
    }

    if answer_time_secs >= MAX_ANSWER_TIME {
        return (BASE_SCORE * MIN_MULTIPLIER) as i64;
    }

    let multiplier = 1.0
        - ((answer_time_secs - PERFECT_TIME) / (MAX_ANSWER_TIME - PERFECT_TIME))
            * (1.0 - MIN_MULTIPLIER);
    (BASE_SCORE * multiplier) as i64
}
