//! MPI adapter for the transport seams, enabled by the `mpi-support` feature.
//!
//! The substrate demands singular init/finalize per process: [`MpiWorld::init`]
//! owns the runtime (finalized when the world drops), while
//! [`MpiWorld::attach`] joins a runtime the host simulator already
//! initialized and never finalizes it. [`World::owns_runtime`] reports which
//! of the two happened.

use mpi::environment::Universe;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::{Communicator, Destination, Equivalence, Source};
use mpi::Rank;

use crate::error::{ExchangeError, ExchangeResult};
use crate::transport::{self, Probe};

pub struct MpiWorld {
    universe: Option<Universe>,
    world: SimpleCommunicator,
}

impl MpiWorld {
    /// Initialize the MPI runtime in this process. Fails when it is already
    /// initialized; use [`MpiWorld::attach`] in that case.
    pub fn init() -> ExchangeResult<Self> {
        let universe = mpi::initialize().ok_or_else(|| {
            ExchangeError::Substrate("MPI runtime is already initialized".into())
        })?;
        let world = universe.world();
        Ok(Self {
            universe: Some(universe),
            world,
        })
    }

    /// Join the MPI runtime the host already initialized. The host keeps
    /// responsibility for finalization.
    pub fn attach() -> Self {
        Self {
            universe: None,
            world: SimpleCommunicator::world(),
        }
    }
}

impl transport::World for MpiWorld {
    type Channel = MpiChannel;

    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn split(&self, color: i32) -> ExchangeResult<MpiChannel> {
        let comm = self
            .world
            .split_by_color(Color::with_value(color))
            .ok_or_else(|| {
                ExchangeError::Substrate(format!("split by color {color} produced no context"))
            })?;
        Ok(MpiChannel { comm })
    }

    fn owns_runtime(&self) -> bool {
        self.universe.is_some()
    }

    fn barrier(&self) {
        self.world.barrier();
    }
}

pub struct MpiChannel {
    comm: SimpleCommunicator,
}

fn probe_from_status(status: &mpi::point_to_point::Status) -> Probe {
    Probe {
        source: status.source_rank() as usize,
        tag: status.tag(),
        len: status.count(u8::equivalent_datatype()) as usize,
    }
}

impl transport::Channel for MpiChannel {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn send(&self, peer: usize, bytes: &[u8]) -> ExchangeResult<()> {
        self.comm
            .process_at_rank(peer as Rank)
            .send_with_tag(bytes, transport::EXCHANGE_TAG);
        Ok(())
    }

    fn try_probe(&self) -> ExchangeResult<Option<Probe>> {
        Ok(self
            .comm
            .any_process()
            .immediate_probe_with_tag(transport::EXCHANGE_TAG)
            .map(|status| probe_from_status(&status)))
    }

    fn probe(&self, source: Option<usize>) -> ExchangeResult<Probe> {
        let status = match source {
            Some(rank) => self
                .comm
                .process_at_rank(rank as Rank)
                .probe_with_tag(transport::EXCHANGE_TAG),
            None => self
                .comm
                .any_process()
                .probe_with_tag(transport::EXCHANGE_TAG),
        };
        Ok(probe_from_status(&status))
    }

    fn recv(&self, probe: &Probe) -> ExchangeResult<Vec<u8>> {
        let mut buffer = vec![0u8; probe.len];
        self.comm
            .process_at_rank(probe.source as Rank)
            .receive_into_with_tag(&mut buffer[..], probe.tag);
        Ok(buffer)
    }

    fn barrier(&self) {
        self.comm.barrier();
    }

    fn abort(&self, code: i32) {
        self.comm.abort(code);
    }
}
