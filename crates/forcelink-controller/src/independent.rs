//! Controller runtime for fixes whose per-atom force deltas are independent
//! of every other atom. Much cheaper than the dependent runtime when cross
//! -worker synchronization is not needed.

use forcelink_proto::transport::Channel;
use forcelink_proto::wire::{self, AtomState, ForceDelta, Message};

use crate::error::ControllerResult;
use crate::runtime::{serve, ControllerConfig};

/// Serve `request` packets by applying `force` to each listed atom and
/// replying immediately. Runs until every registered worker deregisters.
pub fn run_independent<C, F>(
    channel: &C,
    config: &ControllerConfig,
    mut force: F,
) -> ControllerResult<()>
where
    C: Channel,
    F: FnMut(&AtomState) -> ForceDelta,
{
    let mut instances: usize = 0;
    let mut rounds: u64 = 0;
    serve(channel, config, move |channel, message, source, registry| {
        let Message::Request { atoms, .. } = message else {
            return Ok(());
        };

        let deltas: Vec<ForceDelta> = atoms.iter().map(&mut force).collect();
        channel.send(source, &wire::encode(&Message::Response { atoms: deltas })?)?;

        // One round = one request from every registered worker.
        instances += 1;
        if registry.count() > 0 && instances % registry.count() == 0 {
            instances = 0;
            rounds += 1;
            if rounds % 100 == 0 {
                config.trace.emit_round(rounds);
            }
        }
        Ok(())
    })
}
