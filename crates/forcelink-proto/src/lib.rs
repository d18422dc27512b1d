#![forbid(unsafe_code)]

pub mod error;
pub mod exchange;
#[cfg(feature = "mpi-support")]
pub mod mpi_backend;
pub mod session;
pub mod transport;
pub mod wire;

pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{exchange_forces, exchange_grid};
pub use session::{await_packet, deregister, register, REGISTRATION_TIMEOUT_MS};
pub use transport::{
    split_exchange, Channel, ExchangeChannels, MemoryChannel, MemoryWorld, Probe, World,
    EXCHANGE_COLOR, EXCHANGE_TAG, HOST_COLOR,
};
pub use wire::{AtomState, Dipole, ForceDelta, GridReply, Message, NodeDelta};
