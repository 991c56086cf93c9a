//! In-process transport: every rank is a thread.
//!
//! Each ordered pair of ranks `(src, dst)` gets its own unbounded crossbeam
//! channel. Sends never block, receives name their source explicitly, so
//! messages are buffered per source rank and per-pair FIFO order is the
//! only ordering the protocol relies on. When a rank stops, dropping its
//! [`LocalComm`] disconnects its outgoing channels and every peer that
//! later waits on it gets a communication error instead of hanging.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::thread;
use tracing::{debug, error};

use super::{Communicator, Tag, ROOT};
use crate::error::{LifeError, Result};

#[derive(Debug)]
struct Envelope {
    tag: Tag,
    payload: Vec<u8>,
}

/// One rank's endpoint in a [`LocalGroup`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank.
    outbox: Vec<Sender<Envelope>>,
    /// Indexed by source rank.
    inbox: Vec<Receiver<Envelope>>,
}

/// Factory for a fully connected set of in-process ranks.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `size` connected endpoints, index `r` being rank `r`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Result<Vec<LocalComm>> {
        if size == 0 {
            return Err(LifeError::Configuration(
                "process count must be > 0".to_string(),
            ));
        }

        // channels[src][dst]
        let mut senders: Vec<Vec<Sender<Envelope>>> = Vec::with_capacity(size);
        let mut receivers: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for src in 0..size {
            let mut row = Vec::with_capacity(size);
            for dst_inbox in receivers.iter_mut() {
                let (tx, rx) = unbounded();
                row.push(tx);
                dst_inbox[src] = Some(rx);
            }
            senders.push(row);
        }

        let comms = senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalComm {
                rank,
                size,
                outbox,
                inbox: inbox.into_iter().flatten().collect(),
            })
            .collect();
        Ok(comms)
    }
}

/// Run `f` once per rank on its own scoped thread and collect the results
/// in rank order.
///
/// A rank that panics is reported as a communication failure of the group.
pub fn run_group<F, R>(size: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(LocalComm) -> R + Sync,
    R: Send,
{
    let comms = LocalGroup::new(size)?;
    let f = &f;

    thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let rank = comm.rank;
                thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || f(comm))
                    .map_err(|e| LifeError::communication(rank, format!("spawn failed: {e}")))
            })
            .collect();

        let mut results = Vec::with_capacity(size);
        let mut failure = None;
        for (rank, handle) in handles.into_iter().enumerate() {
            match handle {
                Ok(handle) => match handle.join() {
                    Ok(result) => results.push(result),
                    Err(_) => {
                        error!(rank, "rank thread panicked");
                        failure.get_or_insert(LifeError::communication(
                            rank,
                            "rank thread panicked",
                        ));
                    }
                },
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    })
}

impl LocalComm {
    fn check_peer(&self, peer: usize) -> Result<()> {
        if peer >= self.size {
            return Err(LifeError::communication(
                self.rank,
                format!("rank {peer} is outside a group of {}", self.size),
            ));
        }
        Ok(())
    }

    fn post(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> Result<()> {
        self.check_peer(dest)?;
        self.outbox[dest]
            .send(Envelope { tag, payload })
            .map_err(|_| LifeError::communication(self.rank, format!("rank {dest} left the group")))
    }

    fn take(&self, source: usize, tag: Tag) -> Result<Vec<u8>> {
        self.check_peer(source)?;
        let envelope = self.inbox[source].recv().map_err(|_| {
            LifeError::communication(self.rank, format!("rank {source} left the group"))
        })?;
        if envelope.tag != tag {
            return Err(LifeError::communication(
                self.rank,
                format!(
                    "expected {tag:?} from rank {source}, got {:?}",
                    envelope.tag
                ),
            ));
        }
        Ok(envelope.payload)
    }

    fn take_into(&self, source: usize, tag: Tag, buf: &mut [u8]) -> Result<()> {
        let payload = self.take(source, tag)?;
        if payload.len() != buf.len() {
            return Err(LifeError::communication(
                self.rank,
                format!(
                    "{tag:?} from rank {source} carried {} bytes, expected {}",
                    payload.len(),
                    buf.len()
                ),
            ));
        }
        buf.copy_from_slice(&payload);
        Ok(())
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send_receive(
        &self,
        send: &[u8],
        dest: usize,
        recv: &mut [u8],
        source: usize,
        tag: Tag,
    ) -> Result<()> {
        // Unbounded send completes immediately, so the receive can follow.
        self.post(dest, tag, send.to_vec())?;
        self.take_into(source, tag, recv)
    }

    fn scatter(&self, send: Option<&[u8]>, recv: &mut [u8]) -> Result<()> {
        if self.rank != ROOT {
            return self.take_into(ROOT, Tag::Scatter, recv);
        }

        let send = send.ok_or_else(|| {
            LifeError::communication(self.rank, "root called scatter without data")
        })?;
        let block = recv.len();
        if send.len() != block * self.size {
            return Err(LifeError::communication(
                self.rank,
                format!(
                    "scatter buffer holds {} bytes, {} ranks x {block} expected",
                    send.len(),
                    self.size
                ),
            ));
        }
        for (dest, chunk) in send.chunks(block.max(1)).enumerate().take(self.size) {
            if dest == ROOT {
                recv.copy_from_slice(chunk);
            } else {
                self.post(dest, Tag::Scatter, chunk.to_vec())?;
            }
        }
        Ok(())
    }

    fn gather(&self, send: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.rank != ROOT {
            self.post(ROOT, Tag::Gather, send.to_vec())?;
            return Ok(None);
        }

        let block = send.len();
        let mut all = vec![0u8; block * self.size];
        all[..block].copy_from_slice(send);
        // Receive by source rank, never by arrival order.
        for source in 1..self.size {
            self.take_into(source, Tag::Gather, &mut all[source * block..(source + 1) * block])?;
        }
        debug!(bytes = all.len(), "gathered blocks from {} ranks", self.size);
        Ok(Some(all))
    }

    fn broadcast(&self, buf: &mut [u8]) -> Result<()> {
        if self.rank == ROOT {
            for dest in 1..self.size {
                self.post(dest, Tag::Broadcast, buf.to_vec())?;
            }
            Ok(())
        } else {
            self.take_into(ROOT, Tag::Broadcast, buf)
        }
    }

    fn reduce_max(&self, local: f64) -> Result<Option<f64>> {
        if self.rank != ROOT {
            self.post(ROOT, Tag::Reduce, local.to_le_bytes().to_vec())?;
            return Ok(None);
        }
        let mut max = local;
        for source in 1..self.size {
            let mut bytes = [0u8; 8];
            self.take_into(source, Tag::Reduce, &mut bytes)?;
            max = max.max(f64::from_le_bytes(bytes));
        }
        Ok(Some(max))
    }

    fn barrier(&self) -> Result<()> {
        if self.rank == ROOT {
            for source in 1..self.size {
                self.take_into(source, Tag::Barrier, &mut [])?;
            }
            for dest in 1..self.size {
                self.post(dest, Tag::Barrier, Vec::new())?;
            }
            Ok(())
        } else {
            self.post(ROOT, Tag::Barrier, Vec::new())?;
            self.take_into(ROOT, Tag::Barrier, &mut [])
        }
    }
}
