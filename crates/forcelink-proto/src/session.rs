//! Worker-side session lifecycle: the registration handshake and the
//! best-effort deregistration that brackets every run.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ExchangeError, ExchangeResult};
use crate::transport::Channel;
use crate::wire::{self, Message};

/// How long a worker waits for the controller's `ack` before giving up.
pub const REGISTRATION_TIMEOUT_MS: f64 = 10_000.0;

/// Sleep between probe polls while awaiting a packet.
const POLL_INTERVAL: Duration = Duration::from_micros(250);

/// Await the next packet from any source, decoding it and reporting the
/// sender's rank. `max_ms` bounds the wait in wall time; 0 disables the
/// budget.
pub fn await_packet<C: Channel>(channel: &C, max_ms: f64) -> ExchangeResult<(Message, usize)> {
    let start = Instant::now();
    loop {
        if let Some(probe) = channel.try_probe()? {
            let bytes = channel.recv(&probe)?;
            let message = wire::decode(&bytes)?;
            return Ok((message, probe.source));
        }
        if max_ms > 0.0 && start.elapsed().as_secs_f64() * 1_000.0 > max_ms {
            return Err(ExchangeError::ResponseTimeout { ms: max_ms });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Register with the controller: announce to every other rank of the exchange
/// context, then wait for an `ack`. Returns the acking sender's rank, which is
/// the controller rank for the rest of the session. Non-`ack` packets arriving
/// meanwhile are discarded.
pub fn register<C: Channel>(channel: &C) -> ExchangeResult<usize> {
    let raw = wire::encode(&Message::Register)?;
    let rank = channel.rank();
    for peer in 0..channel.size() {
        if peer != rank {
            channel.send(peer, &raw)?;
        }
    }

    loop {
        match await_packet(channel, REGISTRATION_TIMEOUT_MS) {
            Ok((Message::Ack, source)) => return Ok(source),
            Ok(_) => continue,
            Err(ExchangeError::ResponseTimeout { .. }) => {
                return Err(ExchangeError::RegistrationTimeout)
            }
            Err(err) => return Err(err),
        }
    }
}

/// Announce departure to the controller. Best-effort: no reply is expected and
/// send failures are swallowed, since deregistration runs on teardown paths.
pub fn deregister<C: Channel>(channel: &C, controller_rank: usize) {
    if let Ok(raw) = wire::encode(&Message::Deregister) {
        let _ = channel.send(controller_rank, &raw);
    }
}
