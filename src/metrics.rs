//! Per-operation request metrics with Graphite and log reporting.
//!
//! Each repository operation keeps a call count, an error count and the
//! cumulative latency in atomics. Reporters read snapshots on an interval.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::MetricsConfig;
use crate::error::AppError;

/// Operations that are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Delete,
    Count,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Write,
        Operation::Delete,
        Operation::Count,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::Count => "count",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Default)]
struct Timer {
    calls: AtomicU64,
    errors: AtomicU64,
    total_micros: AtomicU64,
}

/// Point-in-time view of one operation's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub calls: u64,
    pub errors: u64,
    pub total_micros: u64,
}

impl TimerSnapshot {
    /// Mean latency in milliseconds, zero before the first call.
    pub fn mean_millis(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_micros as f64 / self.calls as f64 / 1000.0
        }
    }
}

/// Metric registry shared by the request handlers.
#[derive(Default)]
pub struct Metrics {
    timers: [Timer; 4],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call of `op`.
    pub fn record(&self, op: Operation, elapsed: Duration, ok: bool) {
        let timer = &self.timers[op.index()];
        timer.calls.fetch_add(1, Ordering::Relaxed);
        timer
            .total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if !ok {
            timer.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Awaits `fut` and records its latency and outcome under `op`.
    pub async fn time<T, F>(&self, op: Operation, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let started = Instant::now();
        let result = fut.await;
        self.record(op, started.elapsed(), result.is_ok());
        result
    }

    pub fn snapshot(&self, op: Operation) -> TimerSnapshot {
        let timer = &self.timers[op.index()];
        TimerSnapshot {
            calls: timer.calls.load(Ordering::Relaxed),
            errors: timer.errors.load(Ordering::Relaxed),
            total_micros: timer.total_micros.load(Ordering::Relaxed),
        }
    }

    /// Renders every timer in the Graphite plaintext protocol.
    pub fn graphite_lines(&self, prefix: &str, timestamp: i64) -> String {
        let mut out = String::new();
        for op in Operation::ALL {
            let snapshot = self.snapshot(op);
            let path = metric_path(prefix, op);
            out.push_str(&format!("{}.count {} {}\n", path, snapshot.calls, timestamp));
            out.push_str(&format!("{}.errors {} {}\n", path, snapshot.errors, timestamp));
            out.push_str(&format!(
                "{}.mean {:.3} {}\n",
                path,
                snapshot.mean_millis(),
                timestamp
            ));
        }
        out
    }

    fn log(&self) {
        for op in Operation::ALL {
            let snapshot = self.snapshot(op);
            tracing::info!(
                operation = %op,
                calls = snapshot.calls,
                errors = snapshot.errors,
                mean_ms = snapshot.mean_millis(),
                "metrics"
            );
        }
    }
}

fn metric_path(prefix: &str, op: Operation) -> String {
    let prefix = prefix.trim_end_matches('.');
    if prefix.is_empty() {
        format!("brands.{}", op)
    } else {
        format!("{}.brands.{}", prefix, op)
    }
}

/// Starts the reporters enabled in `config`.
pub fn spawn_reporters(metrics: Arc<Metrics>, config: &MetricsConfig) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(address) = config.graphite_tcp_address.clone() {
        let metrics = Arc::clone(&metrics);
        let prefix = config.graphite_prefix.clone();
        let every = Duration::from_secs(config.graphite_interval_secs.max(1));
        tracing::info!(%address, %prefix, "reporting metrics to Graphite");
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let lines = metrics.graphite_lines(&prefix, chrono::Utc::now().timestamp());
                if let Err(e) = push_graphite(&address, &lines).await {
                    tracing::warn!(%address, error = %e, "failed to push metrics to Graphite");
                }
            }
        }));
    }

    if config.log_metrics {
        let every = Duration::from_secs(config.log_interval_secs.max(1));
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                metrics.log();
            }
        }));
    }

    handles
}

async fn push_graphite(address: &str, lines: &str) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(address).await?;
    stream.write_all(lines.as_bytes()).await?;
    stream.shutdown().await
}
