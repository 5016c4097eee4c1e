use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, OnceLock},
    time::Duration,
};

use crate::{error::BuildErrorCode, service::transaction_builder::TransactionResult};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

// 直方图分桶上界（毫秒）：<1, <5, <10, <50, <100, >=100
const LATENCY_BUCKETS_MS: [u128; 5] = [1, 5, 10, 50, 100];

struct MetricsState {
    submitted: u64,
    succeeded: u64,
    cancelled: u64,
    failed: HashMap<&'static str, u64>,
    fee_total: u128,
    latency_sum_ms: u128,
    latency_hist_buckets: [u64; 6],
}

fn state() -> MutexGuard<'static, MetricsState> {
    let m = METRICS.get_or_init(|| {
        Mutex::new(MetricsState {
            submitted: 0,
            succeeded: 0,
            cancelled: 0,
            failed: HashMap::new(),
            fee_total: 0,
            latency_sum_ms: 0,
            latency_hist_buckets: [0; 6],
        })
    });
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn count_submitted() {
    state().submitted += 1;
}

/// 记录一次终态结果与耗时
pub fn record_outcome(outcome: &TransactionResult, elapsed: Duration) {
    let mut s = state();
    match outcome {
        Ok(tx) => {
            s.succeeded += 1;
            s.fee_total += u128::from(tx.fee);
        }
        Err(e) if e.code() == BuildErrorCode::Cancelled => s.cancelled += 1,
        Err(e) => *s.failed.entry(e.code().as_str()).or_insert(0) += 1,
    }

    let ms = elapsed.as_millis();
    s.latency_sum_ms += ms;
    let idx = LATENCY_BUCKETS_MS
        .iter()
        .position(|upper| ms < *upper)
        .unwrap_or(LATENCY_BUCKETS_MS.len());
    s.latency_hist_buckets[idx] += 1;
}

/// 已提交构建数
pub fn submitted_total() -> u64 {
    state().submitted
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();
    out.push_str("# HELP txcore_builds_submitted_total Build tasks submitted\n");
    out.push_str("# TYPE txcore_builds_submitted_total counter\n");
    out.push_str(&format!("txcore_builds_submitted_total {}\n", s.submitted));

    out.push_str("# HELP txcore_builds_finished_total Build tasks by outcome\n");
    out.push_str("# TYPE txcore_builds_finished_total counter\n");
    out.push_str(&format!(
        "txcore_builds_finished_total{{result=\"ok\"}} {}\n",
        s.succeeded
    ));
    out.push_str(&format!(
        "txcore_builds_finished_total{{result=\"cancelled\"}} {}\n",
        s.cancelled
    ));

    out.push_str("# HELP txcore_build_errors_total Failed builds per error code\n");
    out.push_str("# TYPE txcore_build_errors_total counter\n");
    let mut codes: Vec<_> = s.failed.iter().collect();
    codes.sort();
    for (code, v) in codes {
        out.push_str(&format!(
            "txcore_build_errors_total{{code=\"{}\"}} {}\n",
            code, v
        ));
    }

    out.push_str("# HELP txcore_build_fee_total Sum of fees of built transactions\n");
    out.push_str("# TYPE txcore_build_fee_total counter\n");
    out.push_str(&format!("txcore_build_fee_total {}\n", s.fee_total));

    out.push_str("# HELP txcore_build_latency_ms_sum Sum of build latency in ms\n");
    out.push_str("# TYPE txcore_build_latency_ms_sum counter\n");
    out.push_str(&format!(
        "txcore_build_latency_ms_sum {}\n",
        s.latency_sum_ms
    ));

    out.push_str("# HELP txcore_build_latency_ms_bucket Build latency histogram (ms)\n");
    out.push_str("# TYPE txcore_build_latency_ms_bucket histogram\n");
    let mut cumulative = 0u64;
    for (i, upper) in LATENCY_BUCKETS_MS.iter().enumerate() {
        cumulative += s.latency_hist_buckets[i];
        out.push_str(&format!(
            "txcore_build_latency_ms_bucket{{le=\"{}\"}} {}\n",
            upper, cumulative
        ));
    }
    cumulative += s.latency_hist_buckets[LATENCY_BUCKETS_MS.len()];
    out.push_str(&format!(
        "txcore_build_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
        cumulative
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    #[test]
    fn test_render_contains_recorded_error_code() {
        record_outcome(
            &Err(BuildError::InsufficientFunds {
                needed: 10,
                available: 1,
            }),
            Duration::from_millis(3),
        );
        let text = render_prometheus();
        assert!(text.contains("txcore_build_errors_total{code=\"insufficient_funds\"}"));
        assert!(text.contains("txcore_build_latency_ms_bucket{le=\"+Inf\"}"));
    }

    #[test]
    fn test_submitted_counter_increases() {
        let before = submitted_total();
        count_submitted();
        assert!(submitted_total() > before);
    }
}
