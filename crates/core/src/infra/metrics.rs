use serde::Serialize;
use std::sync::Mutex;

const LATENCY_CAP: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    jobs_submitted: u64,
    jobs_completed: u64,
    jobs_failed: u64,
    jobs_cancelled: u64,
    status_polls: u64,
    transient_errors: u64,
    stale_responses: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（シェルに返す用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub jobs_submitted: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub status_polls: u64,
    pub transient_errors: u64,
    pub stale_responses: u64,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub start: Option<f64>,
    pub status: Option<f64>,
    pub scenes: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_jobs_submitted(&self) {
        self.counters.lock().unwrap().jobs_submitted += 1;
    }

    pub fn inc_jobs_completed(&self) {
        self.counters.lock().unwrap().jobs_completed += 1;
    }

    pub fn inc_jobs_failed(&self) {
        self.counters.lock().unwrap().jobs_failed += 1;
    }

    pub fn inc_jobs_cancelled(&self) {
        self.counters.lock().unwrap().jobs_cancelled += 1;
    }

    pub fn inc_status_polls(&self) {
        self.counters.lock().unwrap().status_polls += 1;
    }

    pub fn inc_transient_errors(&self) {
        self.counters.lock().unwrap().transient_errors += 1;
    }

    pub fn inc_stale_responses(&self) {
        self.counters.lock().unwrap().stale_responses += 1;
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock().unwrap();
        latencies.push(record);
        // 最新1000件のみ保持
        if latencies.len() > LATENCY_CAP {
            let excess = latencies.len() - LATENCY_CAP;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock().unwrap();
        let latencies = self.latencies.lock().unwrap();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            jobs_submitted: c.jobs_submitted,
            jobs_completed: c.jobs_completed,
            jobs_failed: c.jobs_failed,
            jobs_cancelled: c.jobs_cancelled,
            status_polls: c.status_polls,
            transient_errors: c.transient_errors,
            stale_responses: c.stale_responses,
            avg_latency_ms: AvgLatency {
                start: avg("start"),
                status: avg("status"),
                scenes: avg("scenes"),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
