//! The shared controller event loop: registration bookkeeping, tolerant
//! decoding, idle-timeout enforcement, and the world lifecycle wrapper.

use std::thread;
use std::time::{Duration, Instant};

use forcelink_proto::transport::{split_exchange, Channel, World};
use forcelink_proto::wire::{self, Message};

use crate::error::{ControllerError, ControllerResult};
use crate::registry::Registry;
use crate::trace::TraceEmitter;

/// Exit code handed to the substrate when the idle timeout fires.
pub const IDLE_ABORT_CODE: i32 = 10;

/// Sleep between probe polls when the channel is quiet.
const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Abort the exchange context after this long without any packet.
    pub idle_timeout_ms: u64,
    pub trace: TraceEmitter,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 10_000,
            trace: TraceEmitter::disabled(),
        }
    }
}

/// Run one controller event loop until every registered worker has left.
///
/// `register`/`deregister` bookkeeping is handled here; everything else is
/// passed to `handle`. Packets that fail to decode are ignored (tolerant
/// reader), as are message types the handler has no interest in. The idle
/// timer resets on every received packet; on expiry the exchange context is
/// aborted with [`IDLE_ABORT_CODE`] and the loop reports the timeout.
pub(crate) fn serve<C, H>(
    channel: &C,
    config: &ControllerConfig,
    mut handle: H,
) -> ControllerResult<()>
where
    C: Channel,
    H: FnMut(&C, Message, usize, &Registry) -> ControllerResult<()>,
{
    let mut registry = Registry::new();
    let mut last_packet = Instant::now();
    config.trace.emit_started(channel.rank(), channel.size());

    loop {
        match channel.try_probe()? {
            Some(probe) => {
                let bytes = channel.recv(&probe)?;
                last_packet = Instant::now();
                let message = match wire::decode(&bytes) {
                    Ok(message) => message,
                    Err(_) => continue,
                };
                match message {
                    Message::Register => {
                        registry.register();
                        channel.send(probe.source, &wire::encode(&Message::Ack)?)?;
                        config.trace.emit_registered(probe.source, registry.count());
                    }
                    Message::Deregister => {
                        registry.deregister()?;
                        config
                            .trace
                            .emit_deregistered(probe.source, registry.count());
                    }
                    other => handle(channel, other, probe.source, &registry)?,
                }
                if registry.finished() {
                    break;
                }
            }
            None => {
                thread::sleep(IDLE_POLL);
                if last_packet.elapsed().as_millis() as u64 > config.idle_timeout_ms {
                    config.trace.emit_error("idle timeout");
                    channel.abort(IDLE_ABORT_CODE);
                    return Err(ControllerError::IdleTimeout {
                        ms: config.idle_timeout_ms,
                    });
                }
            }
        }
    }

    config.trace.emit_halted();
    Ok(())
}

/// Own the full controller lifecycle around a loop body: perform both
/// mandatory splits, run the body on the exchange context, then hold the
/// world barrier before the contexts are released. With an MPI world that
/// was initialized by this process, dropping the world afterwards finalizes
/// the substrate.
pub fn serve_world<W, F>(world: &W, run: F) -> ControllerResult<()>
where
    W: World,
    F: FnOnce(&W::Channel) -> ControllerResult<()>,
{
    let channels = split_exchange(world)?;
    let outcome = run(&channels.exchange);
    if outcome.is_ok() {
        world.barrier();
    }
    outcome
}
