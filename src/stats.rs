//! Throughput, erasure, and retransmission counters, summarized at
//! completion. Modeled on `aeronet_proto`'s small counter types
//! (`byte_count.rs`) rather than pulling in a metrics crate, since the
//! distilled spec treats a full metrics/observability layer as out of
//! scope but still expects a completion summary.

use std::time::{Duration, Instant};

use tracing::info;

/// Running counters for one side of a transfer.
#[derive(Debug, Clone)]
pub struct TransferStats {
    symbols_sent: u64,
    repairs_sent: u64,
    symbols_absorbed: u64,
    symbols_redundant: u64,
    started_at: Instant,
}

impl Default for TransferStats {
    fn default() -> Self {
        Self {
            symbols_sent: 0,
            repairs_sent: 0,
            symbols_absorbed: 0,
            symbols_redundant: 0,
            started_at: Instant::now(),
        }
    }
}

impl TransferStats {
    /// Records `n` symbols sent (originals and repairs alike).
    pub fn add_symbols_sent(&mut self, n: u64) {
        self.symbols_sent += n;
    }

    /// Records `n` symbols sent specifically as repairs (a subset of
    /// [`TransferStats::add_symbols_sent`]).
    pub fn add_repairs_sent(&mut self, n: u64) {
        self.repairs_sent += n;
    }

    /// Records `n` symbols accepted by a decoder.
    pub fn add_symbols_absorbed(&mut self, n: u64) {
        self.symbols_absorbed += n;
    }

    /// Records `n` symbols rejected by a decoder as redundant.
    pub fn add_symbols_redundant(&mut self, n: u64) {
        self.symbols_redundant += n;
    }

    /// Wall-clock time since this counter set was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Total symbols sent.
    #[must_use]
    pub fn symbols_sent(&self) -> u64 {
        self.symbols_sent
    }

    /// Total repair symbols sent.
    #[must_use]
    pub fn repairs_sent(&self) -> u64 {
        self.repairs_sent
    }

    /// Fraction of sent symbols that were repairs, in `[0, 1]`.
    #[must_use]
    pub fn retransmission_rate(&self) -> f64 {
        if self.symbols_sent == 0 {
            0.0
        } else {
            self.repairs_sent as f64 / self.symbols_sent as f64
        }
    }

    /// Fraction of absorbed symbols that turned out redundant, in
    /// `[0, 1]`.
    #[must_use]
    pub fn redundancy_rate(&self) -> f64 {
        let total = self.symbols_absorbed + self.symbols_redundant;
        if total == 0 {
            0.0
        } else {
            self.symbols_redundant as f64 / total as f64
        }
    }

    /// Emits an `info`-level completion summary: bytes/sec, repair rate,
    /// redundancy rate.
    pub fn log_summary(&self, bytes_transferred: u64) {
        let secs = self.elapsed().as_secs_f64().max(f64::EPSILON);
        let rate = bytes_transferred as f64 / secs;
        info!(
            bytes = bytes_transferred,
            seconds = secs,
            bytes_per_sec = rate,
            symbols_sent = self.symbols_sent,
            repairs_sent = self.repairs_sent,
            retransmission_rate = self.retransmission_rate(),
            redundancy_rate = self.redundancy_rate(),
            "transfer finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retransmission_rate_zero_when_nothing_sent() {
        let stats = TransferStats::default();
        assert_eq!(stats.retransmission_rate(), 0.0);
    }

    #[test]
    fn retransmission_rate_reflects_repairs() {
        let mut stats = TransferStats::default();
        stats.add_symbols_sent(10);
        stats.add_repairs_sent(2);
        assert!((stats.retransmission_rate() - 0.2).abs() < 1e-9);
    }
}
