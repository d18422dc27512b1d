//! Worker-side interchange operations: the per-step force dialog and the
//! force-field grid request.

use crate::error::{ExchangeError, ExchangeResult};
use crate::session::await_packet;
use crate::transport::Channel;
use crate::wire::{self, AtomState, ForceDelta, GridReply, Message};

/// Ship a particle snapshot and await the per-particle force deltas.
///
/// Packets from ranks other than the controller are discarded; `waiting`
/// packets restart the wait (the controller is still computing). Any other
/// reply type, and a reply whose length differs from the request, are fatal
/// protocol errors. `max_ms` bounds each wait; 0 disables the budget.
pub fn exchange_forces<C: Channel>(
    channel: &C,
    atoms: &[AtomState],
    max_ms: f64,
    controller_rank: usize,
) -> ExchangeResult<Vec<ForceDelta>> {
    let request = Message::Request {
        expect_response: max_ms,
        atoms: atoms.to_vec(),
    };
    channel.send(controller_rank, &wire::encode(&request)?)?;

    loop {
        let (message, source) = await_packet(channel, max_ms)?;
        if source != controller_rank {
            continue;
        }
        match message {
            Message::Waiting => continue,
            Message::Response { atoms: deltas } => {
                if deltas.len() != atoms.len() {
                    return Err(ExchangeError::Protocol(format!(
                        "controller sent {} force deltas for {} atoms",
                        deltas.len(),
                        atoms.len()
                    )));
                }
                return Ok(deltas);
            }
            other => {
                return Err(ExchangeError::Protocol(format!(
                    "controller sent unexpected `{}' packet while awaiting a response",
                    other.kind()
                )))
            }
        }
    }
}

/// Request a force-delta grid for the given geometry, optionally enclosing a
/// particle snapshot for controllers that want it. Blocks on the controller's
/// reply. The caller applies the returned node deltas and honors a returned
/// `every` as its new refresh interval.
pub fn exchange_grid<C: Channel>(
    channel: &C,
    offset: [f64; 3],
    spacing: [f64; 3],
    node_counts: [u64; 3],
    atoms: Option<&[AtomState]>,
    controller_rank: usize,
) -> ExchangeResult<GridReply> {
    let request = Message::GridRequest {
        offset,
        spacing,
        node_counts,
        atoms: atoms.map(<[AtomState]>::to_vec),
    };
    channel.send(controller_rank, &wire::encode(&request)?)?;

    let probe = channel.probe(Some(controller_rank))?;
    let bytes = channel.recv(&probe)?;
    wire::decode_grid_reply(&bytes)
}
