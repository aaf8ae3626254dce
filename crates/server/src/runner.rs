use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use sightline_common::{ObjectId, ObserverId, VisibilityFlags};
use sightline_kernel::World;
use sightline_net::OutboundReceiver;

use crate::config::tick_interval;
use crate::error::ServerError;
use crate::instance::{GameInstance, InstanceStats};

/// A world mutation queued for the next tick's mutation phase.
pub type Mutation = Box<dyn FnOnce(&mut World) + Send>;

type Reply<T> = Sender<Result<T, ServerError>>;

enum Command {
    Join {
        controlled: ObjectId,
        ability: VisibilityFlags,
        reply: Reply<(ObserverId, OutboundReceiver)>,
    },
    ChangeControl {
        observer: ObserverId,
        controlled: ObjectId,
        reply: Reply<()>,
    },
    Leave {
        observer: ObserverId,
        reply: Reply<()>,
    },
    Mutate(Mutation),
    Stats(Sender<InstanceStats>),
    Shutdown,
}

/// Runs a [`GameInstance`] on its own thread at a fixed tick rate.
///
/// Session changes are applied between ticks; mutations are batched into
/// the next tick's mutation phase in the order they were submitted.
pub struct InstanceRunner {
    commands: Sender<Command>,
    handle: Option<JoinHandle<GameInstance>>,
}

impl InstanceRunner {
    pub fn spawn(instance: GameInstance, tick_rate_hz: f32) -> Result<Self, ServerError> {
        if !(tick_rate_hz.is_finite() && tick_rate_hz > 0.0) {
            return Err(ServerError::InvalidTickRate(tick_rate_hz));
        }
        let interval = tick_interval(tick_rate_hz);
        let (commands, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("sightline-instance".into())
            .spawn(move || run(instance, rx, interval))
            .map_err(ServerError::Spawn)?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    pub fn join(
        &self,
        controlled: ObjectId,
        ability: VisibilityFlags,
    ) -> Result<(ObserverId, OutboundReceiver), ServerError> {
        self.request(|reply| Command::Join {
            controlled,
            ability,
            reply,
        })
    }

    pub fn change_control(&self, observer: ObserverId, controlled: ObjectId) -> Result<(), ServerError> {
        self.request(|reply| Command::ChangeControl {
            observer,
            controlled,
            reply,
        })
    }

    pub fn leave(&self, observer: ObserverId) -> Result<(), ServerError> {
        self.request(|reply| Command::Leave { observer, reply })
    }

    /// Queue `mutation` for the next tick.
    pub fn mutate(&self, mutation: impl FnOnce(&mut World) + Send + 'static) -> Result<(), ServerError> {
        self.send(Command::Mutate(Box::new(mutation)))
    }

    pub fn stats(&self) -> Result<InstanceStats, ServerError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(Command::Stats(reply))?;
        rx.recv().map_err(|_| ServerError::RunnerGone)
    }

    /// Stop ticking and hand the instance back.
    pub fn shutdown(mut self) -> Result<GameInstance, ServerError> {
        let _ = self.commands.send(Command::Shutdown);
        let handle = self.handle.take().ok_or(ServerError::RunnerGone)?;
        handle.join().map_err(|_| ServerError::RunnerPanicked)
    }

    fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, ServerError> {
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.send(command(reply))?;
        rx.recv().map_err(|_| ServerError::RunnerGone)?
    }

    fn send(&self, command: Command) -> Result<(), ServerError> {
        self.commands.send(command).map_err(|_| ServerError::RunnerGone)
    }
}

impl Drop for InstanceRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.commands.send(Command::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run(mut instance: GameInstance, commands: Receiver<Command>, interval: Duration) -> GameInstance {
    tracing::info!(interval_ms = interval.as_millis() as u64, "instance runner started");
    let mut mutations: Vec<Mutation> = Vec::new();
    let mut last = Instant::now();

    loop {
        let deadline = last + interval;
        loop {
            // A steady stream of commands must not hold the tick back.
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let timeout = deadline - now;
            let command = match commands.recv_timeout(timeout) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return stop(instance),
            };
            match command {
                Command::Join {
                    controlled,
                    ability,
                    reply,
                } => {
                    let _ = reply.send(instance.join(controlled, ability));
                }
                Command::ChangeControl {
                    observer,
                    controlled,
                    reply,
                } => {
                    let _ = reply.send(instance.change_control(observer, controlled));
                }
                Command::Leave { observer, reply } => {
                    let _ = reply.send(instance.leave(observer));
                }
                Command::Mutate(mutation) => mutations.push(mutation),
                Command::Stats(reply) => {
                    let _ = reply.send(instance.stats());
                }
                Command::Shutdown => return stop(instance),
            }
        }

        let now = Instant::now();
        let elapsed = now - last;
        last = now;
        let batch = std::mem::take(&mut mutations);
        instance.tick(elapsed, |world| {
            for mutation in batch {
                mutation(world);
            }
        });
    }
}

fn stop(instance: GameInstance) -> GameInstance {
    let stats = instance.stats();
    tracing::info!(ticks = stats.ticks, sessions = stats.sessions, "instance runner stopped");
    instance
}
