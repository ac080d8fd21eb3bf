//! Query timing and pool gauges for the Spill repositories.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Histogram of repository query latency, labelled by query name.
pub const QUERY_DURATION_METRIC: &str = "db_query_duration_seconds";

pub fn record_query_duration(query: &'static str, duration_secs: f64) {
    histogram!(QUERY_DURATION_METRIC, "query" => query).record(duration_secs);
}

/// Busy connections as a share of the pool, 0 when the pool is empty.
fn pool_utilisation(size: u32, idle: usize) -> f64 {
    if size == 0 {
        return 0.0;
    }
    let busy = (size as usize).saturating_sub(idle);
    busy as f64 / size as f64
}

/// Publishes pool gauges. Called from the health probes, so they refresh
/// whenever the orchestrator polls.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    gauge!("db_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("db_pool_connections", "state" => "busy")
        .set((size as usize).saturating_sub(idle) as f64);
    gauge!("db_pool_utilisation").set(pool_utilisation(size, idle));
}

/// Times one repository query. Names are static so the label set stays
/// bounded.
///
/// ```ignore
/// let timer = QueryTimer::new("check_in_streak");
/// let row = sqlx::query_as::<_, StreakEntity>(sql).fetch_optional(&mut *tx).await?;
/// timer.record();
/// ```
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_keeps_query_name() {
        let timer = QueryTimer::new("flag_toxic_post");
        assert_eq!(timer.query, "flag_toxic_post");
        // No recorder installed: recording is a no-op.
        timer.record();
    }

    #[test]
    fn test_pool_utilisation() {
        assert_eq!(pool_utilisation(0, 0), 0.0);
        assert_eq!(pool_utilisation(10, 10), 0.0);
        assert_eq!(pool_utilisation(10, 5), 0.5);
        assert_eq!(pool_utilisation(4, 0), 1.0);
        // Idle can briefly read above size while connections are closing.
        assert_eq!(pool_utilisation(2, 3), 0.0);
    }
}
