use std::collections::BTreeMap;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use sightline_common::ObserverId;
use sightline_view::ServerMessage;

use crate::codec::{CodecError, encode_frame};
use crate::queue::OutboundReceiver;

/// Byte stream a connection's frames are written to.
pub type FrameSink = Box<dyn Write + Send>;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to spawn network worker: {0}")]
    Spawn(#[source] io::Error),
    #[error("network worker has stopped")]
    WorkerGone,
    #[error("network worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

enum Command {
    Attach {
        observer: ObserverId,
        receiver: OutboundReceiver,
        sink: FrameSink,
    },
    Detach(ObserverId),
    Shutdown,
}

/// Totals reported when the worker shuts down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub frames_written: u64,
    pub bytes_written: u64,
    /// Connections dropped because their sink failed.
    pub connections_dropped: u64,
}

/// Handle to the network I/O thread.
pub struct NetworkWorker {
    commands: Sender<Command>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl NetworkWorker {
    /// Start the worker. When no connection had anything to write, it waits
    /// up to `poll_interval` for a command before polling again.
    pub fn spawn(poll_interval: Duration) -> Result<Self, NetError> {
        let (commands, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("sightline-net".into())
            .spawn(move || run(rx, poll_interval))
            .map_err(NetError::Spawn)?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    /// Start writing `receiver`'s messages to `sink`.
    pub fn attach(
        &self,
        observer: ObserverId,
        receiver: OutboundReceiver,
        sink: FrameSink,
    ) -> Result<(), NetError> {
        self.send(Command::Attach {
            observer,
            receiver,
            sink,
        })
    }

    /// Stop serving `observer`. Messages still queued are discarded.
    pub fn detach(&self, observer: ObserverId) -> Result<(), NetError> {
        self.send(Command::Detach(observer))
    }

    /// Flush what is queued, stop the thread and return its totals.
    pub fn shutdown(mut self) -> Result<WorkerStats, NetError> {
        // The thread also stops if the command channel closes, so a failed
        // send is not an error here.
        let _ = self.commands.send(Command::Shutdown);
        self.join()
    }

    fn send(&self, command: Command) -> Result<(), NetError> {
        self.commands.send(command).map_err(|_| NetError::WorkerGone)
    }

    fn join(&mut self) -> Result<WorkerStats, NetError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| NetError::WorkerPanicked),
            None => Ok(WorkerStats::default()),
        }
    }
}

impl Drop for NetworkWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = self.join();
        }
    }
}

struct Connection {
    receiver: OutboundReceiver,
    sink: FrameSink,
    batch: Vec<ServerMessage>,
}

enum ConnectionStatus {
    Idle,
    Wrote { frames: u64, bytes: u64 },
    /// The producer is gone and everything it sent was written.
    Closed { frames: u64, bytes: u64 },
}

impl Connection {
    fn pump(&mut self) -> Result<ConnectionStatus, NetError> {
        let open = self.receiver.drain_into(&mut self.batch);
        let mut frames = 0;
        let mut bytes = 0;
        for message in self.batch.drain(..) {
            let frame = encode_frame(&message)?;
            self.sink.write_all(&frame)?;
            frames += 1;
            bytes += frame.len() as u64;
        }
        if frames > 0 {
            self.sink.flush()?;
        }
        Ok(match (open, frames) {
            (false, _) => ConnectionStatus::Closed { frames, bytes },
            (true, 0) => ConnectionStatus::Idle,
            (true, _) => ConnectionStatus::Wrote { frames, bytes },
        })
    }
}

fn run(commands: Receiver<Command>, poll_interval: Duration) -> WorkerStats {
    let mut connections: BTreeMap<ObserverId, Connection> = BTreeMap::new();
    let mut stats = WorkerStats::default();
    let mut kick = Vec::new();
    let mut idle = false;

    tracing::debug!("network worker started");
    loop {
        let mut shutdown = false;
        let mut next = if idle {
            match commands.recv_timeout(poll_interval) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => Some(Command::Shutdown),
            }
        } else {
            None
        };
        loop {
            let command = match next.take() {
                Some(command) => command,
                None => match commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => Command::Shutdown,
                },
            };
            match command {
                Command::Attach {
                    observer,
                    receiver,
                    sink,
                } => {
                    tracing::debug!(%observer, "connection attached");
                    connections.insert(
                        observer,
                        Connection {
                            receiver,
                            sink,
                            batch: Vec::new(),
                        },
                    );
                }
                Command::Detach(observer) => {
                    if connections.remove(&observer).is_some() {
                        tracing::debug!(%observer, "connection detached");
                    }
                }
                Command::Shutdown => {
                    shutdown = true;
                    break;
                }
            }
        }

        idle = true;
        for (observer, connection) in connections.iter_mut() {
            match connection.pump() {
                Ok(ConnectionStatus::Idle) => {}
                Ok(ConnectionStatus::Wrote { frames, bytes }) => {
                    stats.frames_written += frames;
                    stats.bytes_written += bytes;
                    idle = false;
                }
                Ok(ConnectionStatus::Closed { frames, bytes }) => {
                    stats.frames_written += frames;
                    stats.bytes_written += bytes;
                    tracing::debug!(%observer, "observer queue closed");
                    kick.push(*observer);
                }
                Err(err) => {
                    tracing::warn!(%observer, error = %err, "connection failed, detaching");
                    stats.connections_dropped += 1;
                    kick.push(*observer);
                }
            }
        }
        for observer in kick.drain(..) {
            connections.remove(&observer);
        }

        if shutdown {
            tracing::debug!(
                frames = stats.frames_written,
                bytes = stats.bytes_written,
                "network worker stopped"
            );
            return stats;
        }
    }
}
