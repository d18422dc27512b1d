//! NDJSON progress events for controller runs.
//!
//! Emits event lines to stderr when enabled, so a supervising agent can watch
//! a long run without touching stdout. Request milestones fire every 100th
//! synchronized round.

/// Streaming emitter for NDJSON controller events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceEmitter {
    enabled: bool,
}

impl TraceEmitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Create a disabled emitter (no output).
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Create an enabled emitter.
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn emit_json(&self, json: &str) {
        if self.enabled {
            eprintln!("{}", json);
        }
    }

    pub fn emit_started(&self, rank: usize, size: usize) {
        let json = format!(
            r#"{{"event":"controller_started","rank":{},"size":{}}}"#,
            rank, size
        );
        self.emit_json(&json);
    }

    pub fn emit_halted(&self) {
        self.emit_json(r#"{"event":"controller_halted"}"#);
    }

    pub fn emit_registered(&self, worker_rank: usize, registered: usize) {
        let json = format!(
            r#"{{"event":"worker_registered","worker_rank":{},"registered":{}}}"#,
            worker_rank, registered
        );
        self.emit_json(&json);
    }

    pub fn emit_deregistered(&self, worker_rank: usize, registered: usize) {
        let json = format!(
            r#"{{"event":"worker_deregistered","worker_rank":{},"registered":{}}}"#,
            worker_rank, registered
        );
        self.emit_json(&json);
    }

    pub fn emit_round(&self, round: u64) {
        let json = format!(r#"{{"event":"round_served","round":{}}}"#, round);
        self.emit_json(&json);
    }

    pub fn emit_grid_pass(&self, node_counts: [u64; 3]) {
        let json = format!(
            r#"{{"event":"grid_pass_served","node_counts":[{},{},{}]}}"#,
            node_counts[0], node_counts[1], node_counts[2]
        );
        self.emit_json(&json);
    }

    pub fn emit_error(&self, detail: &str) {
        let detail = serde_json::to_string(detail).unwrap_or_else(|_| "\"\"".to_string());
        let json = format!(r#"{{"event":"controller_error","detail":{}}}"#, detail);
        self.emit_json(&json);
    }
}
