//! The force-field fix: a precomputed grid of force deltas, sampled by
//! trilinear interpolation of particle position. Independent of particle
//! velocities and existing forces.

use forcelink_proto::transport::Channel;
use forcelink_proto::wire::AtomState;
use forcelink_proto::{deregister, exchange_grid, register};

use crate::config::FieldArgs;
use crate::error::{FixError, FixResult};
use crate::grid::{ForceGrid, GridSpec, RefreshMode};
use crate::host::{collect_group, HostAtoms};

pub struct FieldFix<C: Channel> {
    channel: C,
    grid: ForceGrid,
    every: u64,
    counter: u64,
    dipole: bool,
    controller_rank: Option<usize>,
}

impl<C: Channel> FieldFix<C> {
    /// Build the grid over the host's simulation box and keep the channel for
    /// later exchanges. The box bounds are read once here; the grid never
    /// follows a deforming box.
    pub fn new<H: HostAtoms + ?Sized>(channel: C, args: FieldArgs, host: &H) -> FixResult<Self> {
        let (box_lo, box_hi) = host.box_bounds();
        let spec = GridSpec::from_box(args.bins, box_lo, box_hi)?;
        Ok(Self {
            channel,
            grid: ForceGrid::new(spec),
            every: args.every,
            counter: 0,
            dipole: args.dipole,
            controller_rank: None,
        })
    }

    /// Register with the controller and populate the grid with the first
    /// pass. The first request encloses no atom data.
    pub fn init(&mut self) -> FixResult<()> {
        self.controller_rank = Some(register(&self.channel)?);
        self.refresh(None)
    }

    /// Current refresh interval; controllers may retune it live through grid
    /// replies.
    pub fn every(&self) -> u64 {
        self.every
    }

    pub fn grid(&self) -> &ForceGrid {
        &self.grid
    }

    fn refresh(&mut self, atoms: Option<&[AtomState]>) -> FixResult<()> {
        let controller_rank = self.controller_rank.ok_or(FixError::Unregistered)?;
        let spec = *self.grid.spec();
        let reply = exchange_grid(
            &self.channel,
            spec.origin(),
            spec.spacing(),
            spec.node_counts_wire(),
            atoms,
            controller_rank,
        )?;
        self.grid.apply(&reply.nodes, RefreshMode::Accumulate)?;
        if let Some(every) = reply.every {
            self.every = every;
        }
        Ok(())
    }

    /// Per-step hook. When `every > 0` and the step counter wraps, the grid
    /// is refreshed with the current in-group snapshot enclosed. Every
    /// in-group particle then receives the interpolated delta at its
    /// position.
    pub fn post_force<H: HostAtoms>(&mut self, host: &mut H) -> FixResult<()> {
        if self.every > 0 {
            self.counter += 1;
            if self.counter >= self.every {
                self.counter = 0;
                let (atoms, _) = collect_group(host, self.dipole);
                self.refresh(Some(&atoms))?;
            }
        }

        for index in 0..host.len() {
            if !host.in_group(index) {
                continue;
            }
            let delta = self.grid.sample(host.position(index));
            host.add_force(index, delta);
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

impl<C: Channel> Drop for FieldFix<C> {
    fn drop(&mut self) {
        self.detach();
    }
}
