use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Instant;

use crate::error::{CreatorError, Result};

pub struct Metrics;

impl Metrics {
    pub fn init(port: u16) -> Result<()> {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .map_err(|e| CreatorError::Metrics(format!("Failed to install Prometheus exporter: {}", e)))
    }

    pub fn record_validation(success: bool, kind: &str) {
        counter!("rollup_param_validation_total", 1, "kind" => kind.to_string());
        if !success {
            counter!("rollup_param_validation_failure", 1, "kind" => kind.to_string());
        }
    }

    pub fn record_rpc_call(method: &str, success: bool, duration: f64) {
        counter!("rpc_calls_total", 1, "method" => method.to_string());
        histogram!("rpc_call_duration_seconds", duration, "method" => method.to_string());

        if !success {
            counter!("rpc_calls_failed", 1, "method" => method.to_string());
        }
    }

    pub fn record_rollup_submission(chain_id: u64, success: bool, duration: f64) {
        let chain = chain_id.to_string();
        counter!("rollup_submission_total", 1, "chain" => chain.clone());
        histogram!("rollup_submission_duration_seconds", duration, "chain" => chain.clone());
        if !success {
            counter!("rollup_submission_failure", 1, "chain" => chain);
        }
    }
}

pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
