//! Controller runtime for fixes where no atom's force delta can be computed
//! before every worker's atoms have been reported.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use forcelink_proto::transport::Channel;
use forcelink_proto::wire::{self, AtomState, ForceDelta, Message};

use crate::error::ControllerResult;
use crate::runtime::{serve, ControllerConfig};

/// Verdict of the gather callback for one synchronized round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The bulk computation has not finished; every buffered worker gets a
    /// `waiting` packet and the callback is asked again after a short delay.
    /// Good for checking on the progress of an expensive job, bad for
    /// blocking inside.
    NotReady,
}

/// Pause between readiness retries while the bulk computation runs.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Serve synchronized rounds: buffer each worker's batch by sender rank and
/// reply `waiting` until all registered workers have reported. Once the round
/// is complete, the batches are flattened in ascending-rank order and
/// `gathered` is polled until it reports [`Readiness::Ready`]; `force_at` is
/// then asked for each atom by its index into that flattened list, and every
/// worker receives the slice for its own batch, in batch order.
pub fn run_dependent<C, R, F>(
    channel: &C,
    config: &ControllerConfig,
    mut gathered: R,
    mut force_at: F,
) -> ControllerResult<()>
where
    C: Channel,
    R: FnMut(&[AtomState]) -> Readiness,
    F: FnMut(usize) -> ForceDelta,
{
    let mut batches: BTreeMap<usize, Vec<AtomState>> = BTreeMap::new();
    let mut rounds: u64 = 0;

    serve(channel, config, move |channel, message, source, registry| {
        let Message::Request { atoms, .. } = message else {
            return Ok(());
        };

        batches.insert(source, atoms);
        if batches.len() != registry.count() {
            channel.send(source, &wire::encode(&Message::Waiting)?)?;
            return Ok(());
        }

        let flattened: Vec<AtomState> = batches.values().flatten().copied().collect();
        while gathered(&flattened) == Readiness::NotReady {
            let waiting = wire::encode(&Message::Waiting)?;
            for &rank in batches.keys() {
                channel.send(rank, &waiting)?;
            }
            thread::sleep(RETRY_DELAY);
        }

        rounds += 1;
        if rounds % 100 == 0 {
            config.trace.emit_round(rounds);
        }

        let mut index: usize = 0;
        for (&rank, batch) in &batches {
            let deltas: Vec<ForceDelta> = batch
                .iter()
                .map(|_| {
                    let delta = force_at(index);
                    index += 1;
                    delta
                })
                .collect();
            channel.send(rank, &wire::encode(&Message::Response { atoms: deltas })?)?;
        }
        batches.clear();
        Ok(())
    })
}
