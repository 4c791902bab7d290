//! Metrics instrumentation for taproot-dns.
//!
//! All metrics are prefixed with `taproot_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a served question.
pub fn record_query(outcome: QueryOutcome, duration: std::time::Duration) {
    let outcome_str = match outcome {
        QueryOutcome::Resolved => "resolved",
        QueryOutcome::Refused => "refused",
        QueryOutcome::Failed => "failed",
    };

    counter!("taproot_dns.query.count", "outcome" => outcome_str).increment(1);
    histogram!("taproot_dns.query.duration.seconds", "outcome" => outcome_str)
        .record(duration.as_secs_f64());
}

/// Outcome of a served question, for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryOutcome {
    /// An address was produced.
    Resolved,
    /// Resolution failed and the response was refused.
    Refused,
    /// The datagram was dropped on an unexpected error.
    Failed,
}

/// Record an answer served straight from the static overrides.
pub fn record_override_hit() {
    counter!("taproot_dns.resolve.override.count").increment(1);
}

/// Record one step of the delegation walk.
pub fn record_delegation_step(row: DelegationRow) {
    let row_str = match row {
        DelegationRow::Glue => "glue",
        DelegationRow::CnameWithSoa => "cname_soa",
        DelegationRow::Cname => "cname",
        DelegationRow::Soa => "soa",
        DelegationRow::AuthorityName => "authority_name",
    };

    counter!("taproot_dns.resolve.delegation.count", "row" => row_str).increment(1);
}

/// How a delegation step advanced.
#[derive(Debug, Clone, Copy)]
pub enum DelegationRow {
    /// Glue address from the additional section.
    Glue,
    /// CNAME answered alongside an SOA record.
    CnameWithSoa,
    /// CNAME answered without an SOA record.
    Cname,
    /// SOA master name stood in for missing glue.
    Soa,
    /// Authority known only by name, resolved out of band.
    AuthorityName,
}

/// Record an upstream exchange.
pub fn record_upstream_exchange(cache_hit: bool) {
    let source = if cache_hit { "cache" } else { "network" };
    counter!("taproot_dns.upstream.exchange.count", "source" => source).increment(1);
}

/// Record an exhausted work budget.
pub fn record_budget_exhausted() {
    counter!("taproot_dns.resolve.overrun.count").increment(1);
}

/// Record the response cache size.
pub fn record_response_cache_entries(entries: usize) {
    gauge!("taproot_dns.upstream.cache.entries").set(entries as f64);
}

/// Record a datagram dropped by the front-end.
pub fn record_dropped_datagram(reason: DropReason) {
    let reason_str = match reason {
        DropReason::Malformed => "malformed",
        DropReason::Unsupported => "unsupported",
        DropReason::HandlerError => "handler_error",
    };

    counter!("taproot_dns.server.dropped.count", "reason" => reason_str).increment(1);
}

/// Why the front-end dropped a datagram.
#[derive(Debug, Clone, Copy)]
pub enum DropReason {
    /// The datagram did not parse as a DNS message.
    Malformed,
    /// A question asked for a record type other than A.
    Unsupported,
    /// Resolution failed with a non-refusable error.
    HandlerError,
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
