use std::time::Duration;

use sightline_common::{ObjectId, ObserverId, VisibilityFlags};
use sightline_kernel::World;
use sightline_net::{OutboundQueue, OutboundReceiver, outbound_channel};
use sightline_view::{ObjectDensityOverlay, ObserverView, UpdateEmitter, ViewError};

use crate::config::InstanceConfig;

/// One connected participant: their camera and their outbound queue.
pub struct Session {
    id: ObserverId,
    view: ObserverView,
    emitter: UpdateEmitter<OutboundQueue>,
}

impl Session {
    pub(crate) fn open(
        id: ObserverId,
        controlled: ObjectId,
        ability: VisibilityFlags,
        config: &InstanceConfig,
    ) -> Result<(Self, OutboundReceiver), ViewError> {
        let (queue, receiver) = outbound_channel();
        let view = build_view(id, controlled, ability, config)?;
        let session = Self {
            id,
            view,
            emitter: UpdateEmitter::new(queue),
        };
        Ok((session, receiver))
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn view(&self) -> &ObserverView {
        &self.view
    }

    pub fn controlled(&self) -> Option<ObjectId> {
        self.view.tracked_entity()
    }

    /// Messages enqueued for this participant so far.
    pub fn messages_sent(&self) -> u64 {
        self.emitter.emitted()
    }

    /// Replace the camera with a fresh one following `controlled`. The
    /// outbound queue is kept, so the client sees a full baseline next tick.
    pub(crate) fn change_control(
        &mut self,
        controlled: ObjectId,
        config: &InstanceConfig,
    ) -> Result<(), ViewError> {
        let ability = self.view.visibility_ability();
        self.view = build_view(self.id, controlled, ability, config)?;
        Ok(())
    }

    pub(crate) fn tick(&mut self, world: &World, elapsed: Duration) -> Result<(), ViewError> {
        self.view.tick(world, elapsed, &mut self.emitter)
    }
}

fn build_view(
    id: ObserverId,
    controlled: ObjectId,
    ability: VisibilityFlags,
    config: &InstanceConfig,
) -> Result<ObserverView, ViewError> {
    let mut view = ObserverView::new(id, config.aoi)?;
    view.set_visibility_ability(ability);
    view.set_tracked_entity(controlled);
    if let Some(period) = config.overlay_period() {
        view.set_overlay(Box::new(ObjectDensityOverlay::new(period)));
    }
    Ok(view)
}
