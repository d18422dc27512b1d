//! Rank-addressed message substrate behind the worker/controller dialog.
//!
//! The substrate is specified as two trait seams: a [`World`] that can be
//! split by color into isolated communication contexts, and a [`Channel`]
//! offering probe/send/recv over the ranks of one context. Production runs
//! use the MPI adapter (`mpi-support` feature); tests and single-process runs
//! use [`MemoryWorld`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{ExchangeError, ExchangeResult};

/// Color reserved for plugin traffic when splitting the world.
pub const EXCHANGE_COLOR: i32 = 56789;

/// Color of the companion split that keeps the host's collective discipline
/// intact. Both splits must happen, in this order: host first, exchange second.
pub const HOST_COLOR: i32 = 0;

/// The only tag in use; packets are sequenced by send order per rank pair.
pub const EXCHANGE_TAG: i32 = 0;

/// Result of a successful probe: where the pending packet came from and how
/// many bytes a receive must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    pub source: usize,
    pub tag: i32,
    pub len: usize,
}

/// One endpoint of an isolated communication context.
pub trait Channel {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Blocking send to one peer. At-most-once, ordered per rank pair.
    fn send(&self, peer: usize, bytes: &[u8]) -> ExchangeResult<()>;

    /// Non-blocking probe for a packet from any source.
    fn try_probe(&self) -> ExchangeResult<Option<Probe>>;

    /// Blocking probe, optionally restricted to one source rank.
    fn probe(&self, source: Option<usize>) -> ExchangeResult<Probe>;

    /// Receive the packet described by a prior probe.
    fn recv(&self, probe: &Probe) -> ExchangeResult<Vec<u8>>;

    /// Synchronization barrier (no-op for non-MPI channels).
    fn barrier(&self) {}

    /// Tear down the context with a non-zero exit code, waking any peers
    /// blocked on it.
    fn abort(&self, code: i32);
}

/// A process-spanning substrate that can be split into colored contexts.
pub trait World {
    type Channel: Channel;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Carve out the context shared by every rank splitting with `color`.
    fn split(&self, color: i32) -> ExchangeResult<Self::Channel>;

    /// True when this process initialized the substrate itself and is
    /// responsible for finalizing it. Hosts that own the runtime report
    /// false, and the plugin must not initialize on top of them.
    fn owns_runtime(&self) -> bool {
        false
    }

    /// World-wide barrier (no-op for non-MPI worlds).
    fn barrier(&self) {}
}

/// The pair of contexts every participant must hold: the host companion
/// split and the plugin exchange split.
pub struct ExchangeChannels<C> {
    pub exchange: C,
    pub host: C,
}

/// Perform both mandatory splits in order. Dropping either channel early
/// breaks the collective discipline on the other side.
pub fn split_exchange<W: World>(world: &W) -> ExchangeResult<ExchangeChannels<W::Channel>> {
    let host = world.split(HOST_COLOR)?;
    let exchange = world.split(EXCHANGE_COLOR)?;
    Ok(ExchangeChannels { exchange, host })
}

// --- In-process mailbox substrate ---

struct Packet {
    source: usize,
    tag: i32,
    bytes: Vec<u8>,
}

struct Mailbox {
    queue: Mutex<VecDeque<Packet>>,
    ready: Condvar,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }
}

struct Group {
    boxes: Vec<Mailbox>,
    abort: Mutex<Option<i32>>,
}

impl Group {
    fn new(size: usize) -> Self {
        Self {
            boxes: (0..size).map(|_| Mailbox::new()).collect(),
            abort: Mutex::new(None),
        }
    }

    fn abort_code(&self) -> Option<i32> {
        *self.abort.lock().expect("abort flag poisoned")
    }
}

struct WorldShared {
    size: usize,
    groups: Mutex<HashMap<i32, Arc<Group>>>,
}

/// In-process substrate: one endpoint per simulated rank, mailboxes keyed by
/// split color. Every rank that asks for a color joins the same context and
/// keeps its world rank there, which mirrors how the plugin and controller
/// both split with the same two colors.
#[derive(Clone)]
pub struct MemoryWorld {
    rank: usize,
    shared: Arc<WorldShared>,
}

impl MemoryWorld {
    /// Create the endpoints of a `size`-rank world.
    pub fn group(size: usize) -> Vec<MemoryWorld> {
        let shared = Arc::new(WorldShared {
            size,
            groups: Mutex::new(HashMap::new()),
        });
        (0..size)
            .map(|rank| MemoryWorld {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl World for MemoryWorld {
    type Channel = MemoryChannel;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn split(&self, color: i32) -> ExchangeResult<MemoryChannel> {
        let mut groups = self.shared.groups.lock().expect("group table poisoned");
        let group = groups
            .entry(color)
            .or_insert_with(|| Arc::new(Group::new(self.shared.size)))
            .clone();
        Ok(MemoryChannel {
            rank: self.rank,
            group,
        })
    }
}

/// One rank's endpoint within a colored [`MemoryWorld`] context.
#[derive(Clone)]
pub struct MemoryChannel {
    rank: usize,
    group: Arc<Group>,
}

impl MemoryChannel {
    fn checked_abort(&self) -> ExchangeResult<()> {
        match self.group.abort_code() {
            Some(code) => Err(ExchangeError::Aborted(code)),
            None => Ok(()),
        }
    }
}

impl Channel for MemoryChannel {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.group.boxes.len()
    }

    fn send(&self, peer: usize, bytes: &[u8]) -> ExchangeResult<()> {
        self.checked_abort()?;
        let mailbox = self
            .group
            .boxes
            .get(peer)
            .ok_or_else(|| ExchangeError::Substrate(format!("no rank {peer} in this context")))?;
        let mut queue = mailbox.queue.lock().expect("mailbox poisoned");
        queue.push_back(Packet {
            source: self.rank,
            tag: EXCHANGE_TAG,
            bytes: bytes.to_vec(),
        });
        mailbox.ready.notify_all();
        Ok(())
    }

    fn try_probe(&self) -> ExchangeResult<Option<Probe>> {
        self.checked_abort()?;
        let mailbox = &self.group.boxes[self.rank];
        let queue = mailbox.queue.lock().expect("mailbox poisoned");
        Ok(queue.front().map(|packet| Probe {
            source: packet.source,
            tag: packet.tag,
            len: packet.bytes.len(),
        }))
    }

    fn probe(&self, source: Option<usize>) -> ExchangeResult<Probe> {
        let mailbox = &self.group.boxes[self.rank];
        let mut queue = mailbox.queue.lock().expect("mailbox poisoned");
        loop {
            if let Some(code) = self.group.abort_code() {
                return Err(ExchangeError::Aborted(code));
            }
            let hit = queue
                .iter()
                .find(|packet| source.map_or(true, |wanted| packet.source == wanted));
            if let Some(packet) = hit {
                return Ok(Probe {
                    source: packet.source,
                    tag: packet.tag,
                    len: packet.bytes.len(),
                });
            }
            queue = mailbox.ready.wait(queue).expect("mailbox poisoned");
        }
    }

    fn recv(&self, probe: &Probe) -> ExchangeResult<Vec<u8>> {
        let mailbox = &self.group.boxes[self.rank];
        let mut queue = mailbox.queue.lock().expect("mailbox poisoned");
        let index = queue
            .iter()
            .position(|packet| packet.source == probe.source)
            .ok_or_else(|| {
                ExchangeError::Protocol("receive without a matching probed packet".into())
            })?;
        let packet = queue.remove(index).expect("index from position");
        Ok(packet.bytes)
    }

    fn abort(&self, code: i32) {
        *self.group.abort.lock().expect("abort flag poisoned") = Some(code);
        for mailbox in &self.group.boxes {
            // Take the queue lock so a peer between its abort check and its
            // wait cannot miss the notification.
            let _queue = mailbox.queue.lock().expect("mailbox poisoned");
            mailbox.ready.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn split_shares_one_context_per_color() {
        let world = MemoryWorld::group(2);
        let a = world[0].split(EXCHANGE_COLOR).expect("split");
        let b = world[1].split(EXCHANGE_COLOR).expect("split");
        assert_eq!(a.rank(), 0);
        assert_eq!(b.rank(), 1);
        assert_eq!(a.size(), 2);

        a.send(1, b"ping").expect("send");
        let probe = b.probe(None).expect("probe");
        assert_eq!(probe.source, 0);
        assert_eq!(probe.len, 4);
        assert_eq!(b.recv(&probe).expect("recv"), b"ping");
    }

    #[test]
    fn colors_are_isolated() {
        let world = MemoryWorld::group(2);
        let noisy = world[0].split(HOST_COLOR).expect("split");
        let quiet = world[1].split(EXCHANGE_COLOR).expect("split");
        noisy.send(1, b"host traffic").expect("send");
        assert!(quiet.try_probe().expect("probe").is_none());
    }

    #[test]
    fn packets_keep_send_order_per_pair() {
        let world = MemoryWorld::group(2);
        let sender = world[0].split(EXCHANGE_COLOR).expect("split");
        let receiver = world[1].split(EXCHANGE_COLOR).expect("split");
        sender.send(1, b"first").expect("send");
        sender.send(1, b"second").expect("send");
        let probe = receiver.probe(None).expect("probe");
        assert_eq!(receiver.recv(&probe).expect("recv"), b"first");
        let probe = receiver.probe(None).expect("probe");
        assert_eq!(receiver.recv(&probe).expect("recv"), b"second");
    }

    #[test]
    fn probe_can_filter_by_source() {
        let world = MemoryWorld::group(3);
        let a = world[0].split(EXCHANGE_COLOR).expect("split");
        let b = world[1].split(EXCHANGE_COLOR).expect("split");
        let c = world[2].split(EXCHANGE_COLOR).expect("split");
        a.send(2, b"from a").expect("send");
        b.send(2, b"from b").expect("send");
        let probe = c.probe(Some(1)).expect("probe");
        assert_eq!(probe.source, 1);
        assert_eq!(c.recv(&probe).expect("recv"), b"from b");
        // The earlier packet from rank 0 is still there.
        let probe = c.probe(None).expect("probe");
        assert_eq!(probe.source, 0);
    }

    #[test]
    fn abort_wakes_blocked_probe() {
        let world = MemoryWorld::group(2);
        let blocked = world[0].split(EXCHANGE_COLOR).expect("split");
        let aborter = world[1].split(EXCHANGE_COLOR).expect("split");
        let waiter = thread::spawn(move || blocked.probe(None));
        thread::sleep(Duration::from_millis(20));
        aborter.abort(10);
        match waiter.join().expect("join") {
            Err(ExchangeError::Aborted(code)) => assert_eq!(code, 10),
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn send_to_missing_rank_is_an_error() {
        let world = MemoryWorld::group(1);
        let only = world[0].split(EXCHANGE_COLOR).expect("split");
        assert!(only.send(3, b"nobody home").is_err());
    }

    #[test]
    fn split_exchange_returns_both_contexts() {
        let world = MemoryWorld::group(2);
        let channels = split_exchange(&world[0]).expect("split");
        let peer = split_exchange(&world[1]).expect("split");
        channels.exchange.send(1, b"x").expect("send");
        let probe = peer.exchange.probe(None).expect("probe");
        assert_eq!(probe.source, 0);
        assert!(peer.host.try_probe().expect("probe").is_none());
    }
}
