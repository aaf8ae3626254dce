use crate::protocol::{ServerMessage, UpdateRecord};

/// The outbound channel's receiving side went away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("outbound queue disconnected")]
    Disconnected,
}

/// Where an observer's messages go. The network layer implements this for
/// its per-connection queue; tests collect into a `Vec`.
pub trait UpdateSink {
    fn enqueue(&mut self, message: ServerMessage) -> Result<(), EmitError>;
}

impl UpdateSink for Vec<ServerMessage> {
    fn enqueue(&mut self, message: ServerMessage) -> Result<(), EmitError> {
        self.push(message);
        Ok(())
    }
}

impl<S: UpdateSink + ?Sized> UpdateSink for &mut S {
    fn enqueue(&mut self, message: ServerMessage) -> Result<(), EmitError> {
        (**self).enqueue(message)
    }
}

/// Packages update records and hands them to a sink, dropping empty ones.
#[derive(Debug)]
pub struct UpdateEmitter<S> {
    sink: S,
    emitted: u64,
    skipped: u64,
}

impl<S: UpdateSink> UpdateEmitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            emitted: 0,
            skipped: 0,
        }
    }

    /// Enqueue `record` as a graphics update. Returns `false` when the
    /// record was empty and nothing was sent.
    pub fn emit(&mut self, record: UpdateRecord) -> Result<bool, EmitError> {
        if record.is_empty() {
            self.skipped += 1;
            return Ok(false);
        }
        tracing::trace!(
            options = record.options.bits(),
            tiles = record.tiles.len(),
            diffs = record.diffs.len(),
            "graphics update"
        );
        self.send(ServerMessage::GraphicsUpdate(record))?;
        Ok(true)
    }

    /// Enqueue any other message unconditionally.
    pub fn send(&mut self, message: ServerMessage) -> Result<(), EmitError> {
        self.sink.enqueue(message)?;
        self.emitted += 1;
        Ok(())
    }

    /// Messages handed to the sink so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Empty records dropped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}
