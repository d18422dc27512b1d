//! Controller runtime for the force-field grid mode: one node delta per
//! lattice point, computed on request.

use forcelink_proto::transport::Channel;
use forcelink_proto::wire::{self, AtomState, GridReply, Message, NodeDelta};

use crate::error::ControllerResult;
use crate::runtime::{serve, ControllerConfig};

/// Where a node sits within one grid pass. Stateful callbacks reset their
/// accumulators on [`GridPhase::First`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridPhase {
    First,
    Middle,
}

/// The geometry a worker asked the grid to cover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridQuery {
    pub offset: [f64; 3],
    pub spacing: [f64; 3],
    pub node_counts: [u64; 3],
}

/// Serve `gridRequest` packets: walk the requested lattice x-outer, y-middle,
/// z-inner, asking `node_force` for the delta at each node position. The
/// callback also sees the snapshot the worker enclosed (empty when none was
/// sent). Replies use the bare `{"nodes": [...]}` form; when `announce_every`
/// is set, each reply retunes the workers' refresh interval to it.
pub fn run_grid<C, F>(
    channel: &C,
    config: &ControllerConfig,
    announce_every: Option<u64>,
    mut node_force: F,
) -> ControllerResult<()>
where
    C: Channel,
    F: FnMut(GridPhase, &GridQuery, &[AtomState], [f64; 3]) -> [f64; 3],
{
    serve(channel, config, move |channel, message, source, _registry| {
        let Message::GridRequest {
            offset,
            spacing,
            node_counts,
            atoms,
        } = message
        else {
            return Ok(());
        };

        let query = GridQuery {
            offset,
            spacing,
            node_counts,
        };
        let snapshot = atoms.unwrap_or_default();
        let capacity = (node_counts[0] * node_counts[1] * node_counts[2]) as usize;
        let mut nodes = Vec::with_capacity(capacity);
        let mut phase = GridPhase::First;

        for i in 0..node_counts[0] {
            for j in 0..node_counts[1] {
                for k in 0..node_counts[2] {
                    let position = [
                        offset[0] + spacing[0] * i as f64,
                        offset[1] + spacing[1] * j as f64,
                        offset[2] + spacing[2] * k as f64,
                    ];
                    let [dfx, dfy, dfz] = node_force(phase, &query, &snapshot, position);
                    phase = GridPhase::Middle;
                    nodes.push(NodeDelta {
                        x_index: i,
                        y_index: j,
                        z_index: k,
                        dfx,
                        dfy,
                        dfz,
                    });
                }
            }
        }

        let reply = GridReply {
            nodes,
            every: announce_every,
        };
        channel.send(source, &wire::encode_grid_reply(&reply)?)?;
        config.trace.emit_grid_pass(node_counts);
        Ok(())
    })
}
