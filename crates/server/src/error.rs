use sightline_common::{ConfigError, ObserverId};
use sightline_kernel::WorldError;
use sightline_view::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("tick rate must be positive and finite, got {0}")]
    InvalidTickRate(f32),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("no session for observer {0}")]
    UnknownSession(ObserverId),
    #[error("failed to spawn instance runner: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("instance runner has stopped")]
    RunnerGone,
    #[error("instance runner panicked")]
    RunnerPanicked,
}
