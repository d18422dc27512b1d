//! The dense per-step fix: ship a snapshot, add the controller's deltas.

use forcelink_proto::transport::Channel;
use forcelink_proto::{deregister, exchange_forces, register};

use crate::config::DenseArgs;
use crate::error::{FixError, FixResult};
use crate::host::{collect_group, HostAtoms};

/// A fix that asks the controller for per-particle force deltas every
/// `every`-th step. Updating every timestep is very slow; raise `every` when
/// the controlled force varies slowly.
pub struct DenseFix<C: Channel> {
    channel: C,
    every: u64,
    counter: u64,
    dipole: bool,
    max_ms: f64,
    controller_rank: Option<usize>,
}

impl<C: Channel> DenseFix<C> {
    pub fn new(channel: C, args: DenseArgs) -> Self {
        Self {
            channel,
            every: args.every,
            counter: 0,
            dipole: args.dipole,
            max_ms: 0.0,
            controller_rank: None,
        }
    }

    /// Response budget per exchange in milliseconds; 0 (the default) waits
    /// indefinitely.
    pub fn set_response_budget(&mut self, max_ms: f64) {
        self.max_ms = max_ms;
    }

    /// Register with the controller. Fatal when no `ack` arrives within the
    /// registration window; ensure the controller is running first.
    pub fn init(&mut self) -> FixResult<()> {
        self.controller_rank = Some(register(&self.channel)?);
        Ok(())
    }

    /// Per-step hook. On every `every`-th call, snapshots the in-group
    /// particles, exchanges with the controller, and adds the returned deltas
    /// to the host's force array. `every = 0` leaves the fix inert.
    pub fn post_force<H: HostAtoms>(&mut self, host: &mut H) -> FixResult<()> {
        let controller_rank = self.controller_rank.ok_or(FixError::Unregistered)?;
        if self.every == 0 {
            return Ok(());
        }
        self.counter += 1;
        if self.counter < self.every {
            return Ok(());
        }
        self.counter = 0;

        let (atoms, indices) = collect_group(host, self.dipole);
        let deltas = exchange_forces(&self.channel, &atoms, self.max_ms, controller_rank)?;
        for (&index, delta) in indices.iter().zip(&deltas) {
            host.add_force(index, [delta.dfx, delta.dfy, delta.dfz]);
        }
        Ok(())
    }

    /// Announce departure to the controller. Safe to call more than once;
    /// also fired on drop as a fallback.
    pub fn detach(&mut self) {
        if let Some(rank) = self.controller_rank.take() {
            deregister(&self.channel, rank);
        }
    }
}

impl<C: Channel> Drop for DenseFix<C> {
    fn drop(&mut self) {
        self.detach();
    }
}
