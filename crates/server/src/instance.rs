use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use sightline_common::{ObjectId, ObserverId, VisibilityFlags};
use sightline_kernel::{World, WorldError};
use sightline_net::OutboundReceiver;

use crate::config::InstanceConfig;
use crate::error::ServerError;
use crate::session::Session;

/// Running totals for an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceStats {
    pub ticks: u64,
    pub sessions: usize,
    pub objects: usize,
    /// Sessions dropped because their view failed.
    pub dropped_sessions: u64,
    pub diffs_recorded: u64,
}

/// Outcome of one [`GameInstance::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Diffs recorded during the mutation phase.
    pub diffs: usize,
    pub dropped: Vec<ObserverId>,
}

/// One world and everyone watching it.
pub struct GameInstance {
    config: InstanceConfig,
    world: World,
    sessions: BTreeMap<ObserverId, Session>,
    stats: InstanceStats,
}

impl GameInstance {
    pub fn new(config: InstanceConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let world = World::new(config.world_size)?;
        Ok(Self::with_world(config, world))
    }

    /// Wrap an existing world. `config` is assumed valid.
    pub fn with_world(config: InstanceConfig, world: World) -> Self {
        Self {
            config,
            world,
            sessions: BTreeMap::new(),
            stats: InstanceStats::default(),
        }
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access between ticks, e.g. for initial population.
    /// Diffs recorded here are observed on the next tick.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn session(&self, observer: ObserverId) -> Option<&Session> {
        self.sessions.get(&observer)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> InstanceStats {
        InstanceStats {
            sessions: self.sessions.len(),
            objects: self.world.object_count(),
            ..self.stats.clone()
        }
    }

    /// Open a session following `controlled`. The returned receiver yields
    /// the participant's updates from the next tick on.
    pub fn join(
        &mut self,
        controlled: ObjectId,
        ability: VisibilityFlags,
    ) -> Result<(ObserverId, OutboundReceiver), ServerError> {
        if !self.world.objects().contains_key(&controlled) {
            return Err(WorldError::UnknownObject(controlled).into());
        }
        let id = ObserverId::new();
        let (session, receiver) = Session::open(id, controlled, ability, &self.config)?;
        self.sessions.insert(id, session);
        tracing::info!(observer = %id, %controlled, "participant joined");
        Ok((id, receiver))
    }

    /// Point an existing session at another object. Its view is rebuilt.
    pub fn change_control(&mut self, observer: ObserverId, controlled: ObjectId) -> Result<(), ServerError> {
        if !self.world.objects().contains_key(&controlled) {
            return Err(WorldError::UnknownObject(controlled).into());
        }
        let session = self
            .sessions
            .get_mut(&observer)
            .ok_or(ServerError::UnknownSession(observer))?;
        session.change_control(controlled, &self.config)?;
        tracing::info!(%observer, %controlled, "control changed");
        Ok(())
    }

    /// Close a session. Anything still queued for it is discarded.
    pub fn leave(&mut self, observer: ObserverId) -> Result<(), ServerError> {
        self.sessions
            .remove(&observer)
            .ok_or(ServerError::UnknownSession(observer))?;
        tracing::info!(%observer, "participant left");
        Ok(())
    }

    /// Run one tick: apply `mutate`, let every session observe the result,
    /// then release the tick's diffs.
    pub fn tick(&mut self, elapsed: Duration, mutate: impl FnOnce(&mut World)) -> TickReport {
        let tick = self.world.tick();
        let _span = tracing::info_span!("tick", tick).entered();

        mutate(&mut self.world);
        let diffs = self.world.change_log().len();

        let mut dropped = Vec::new();
        for (id, session) in self.sessions.iter_mut() {
            if let Err(err) = session.tick(&self.world, elapsed) {
                tracing::warn!(observer = %id, error = %err, "dropping session");
                dropped.push(*id);
            }
        }
        for id in &dropped {
            self.sessions.remove(id);
        }

        self.world.drain_diffs();
        self.world.step();

        self.stats.ticks += 1;
        self.stats.diffs_recorded += diffs as u64;
        self.stats.dropped_sessions += dropped.len() as u64;
        tracing::trace!(diffs, sessions = self.sessions.len(), "tick complete");
        TickReport {
            tick,
            diffs,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_common::{AoiConfig, Coordinate, Direction};
    use sightline_kernel::ObjectSpec;
    use sightline_view::{ServerMessage, UpdateOptions, ViewDiff};

    fn config() -> InstanceConfig {
        InstanceConfig {
            aoi: AoiConfig {
                fov: 7,
                min_padding: 2,
                z_fov: 1,
            },
            world_size: Coordinate::new(40, 40, 1),
            ..Default::default()
        }
    }

    fn instance_with_player() -> (GameInstance, ObjectId) {
        let mut instance = GameInstance::new(config()).unwrap();
        let player = instance
            .world_mut()
            .spawn(ObjectSpec::new("player", Coordinate::new(10, 10, 0)))
            .unwrap();
        (instance, player)
    }

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn rejects_invalid_config() {
        let config = InstanceConfig {
            tick_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(GameInstance::new(config).is_err());
    }

    #[test]
    fn joining_sends_baseline_on_next_tick() {
        let (mut instance, player) = instance_with_player();
        let (observer, rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        assert!(rx.is_empty());

        instance.tick(TICK, |_| {});
        let messages = rx.poll();
        assert_eq!(messages.len(), 1);
        let ServerMessage::GraphicsUpdate(record) = &messages[0] else {
            panic!("expected graphics update");
        };
        assert!(record.options.contains(UpdateOptions::WINDOW_SHIFT));
        assert_eq!(record.tiles.len(), 121);
        assert_eq!(instance.session(observer).map(|s| s.controlled()), Some(Some(player)));
    }

    #[test]
    fn join_requires_existing_object() {
        let mut instance = GameInstance::new(config()).unwrap();
        let err = instance.join(ObjectId(99), VisibilityFlags::NONE).unwrap_err();
        assert!(matches!(err, ServerError::World(WorldError::UnknownObject(_))));
    }

    #[test]
    fn mutations_are_observed_in_the_same_tick() {
        let (mut instance, player) = instance_with_player();
        let (_, rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        instance.tick(TICK, |_| {});
        rx.poll();

        let report = instance.tick(TICK, |world| {
            world.move_object(player, Direction::South).unwrap();
        });
        assert_eq!(report.diffs, 1);
        assert!(instance.world().change_log().is_empty());

        let messages = rx.poll();
        let [ServerMessage::GraphicsUpdate(record)] = &messages[..] else {
            panic!("expected one update, got {messages:?}");
        };
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Move {
                object: player,
                direction: Direction::South
            }]
        );
    }

    #[test]
    fn disconnected_session_is_dropped_alone() {
        let (mut instance, player) = instance_with_player();
        let (gone, gone_rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        let (stays, stays_rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        drop(gone_rx);

        let report = instance.tick(TICK, |_| {});
        assert_eq!(report.dropped, vec![gone]);
        assert!(instance.session(gone).is_none());
        assert!(instance.session(stays).is_some());
        assert_eq!(stays_rx.poll().len(), 1);
        assert_eq!(instance.stats().dropped_sessions, 1);
    }

    #[test]
    fn leave_discards_session() {
        let (mut instance, player) = instance_with_player();
        let (observer, _rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        instance.leave(observer).unwrap();
        assert_eq!(instance.session_count(), 0);
        assert!(matches!(
            instance.leave(observer),
            Err(ServerError::UnknownSession(_))
        ));
    }

    #[test]
    fn change_control_rebuilds_view() {
        let (mut instance, player) = instance_with_player();
        let horse = instance
            .world_mut()
            .spawn(ObjectSpec::new("horse", Coordinate::new(30, 30, 0)).speed(8.0))
            .unwrap();
        let (observer, rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        instance.tick(TICK, |_| {});
        rx.poll();

        instance.change_control(observer, horse).unwrap();
        instance.tick(TICK, |_| {});
        let messages = rx.poll();
        let [ServerMessage::GraphicsUpdate(record)] = &messages[..] else {
            panic!("expected one update, got {messages:?}");
        };
        assert_eq!(record.camera, Some(Coordinate::new(30, 30, 0)));
        assert_eq!(record.tiles.len(), 121);
        assert_eq!(record.controllable.map(|c| (c.id, c.speed)), Some((horse, 8.0)));
    }

    #[test]
    fn overlay_follows_config() {
        let mut config = config();
        config.overlay_period_ms = 100;
        let mut instance = GameInstance::new(config).unwrap();
        let player = instance
            .world_mut()
            .spawn(ObjectSpec::new("player", Coordinate::new(10, 10, 0)))
            .unwrap();
        let (_, rx) = instance.join(player, VisibilityFlags::NONE).unwrap();

        instance.tick(Duration::from_millis(100), |_| {});
        let messages = rx.poll();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1], ServerMessage::OverlayUpdate(ref infos) if infos.len() == 121));
    }

    #[test]
    fn stats_track_ticks_and_objects() {
        let (mut instance, player) = instance_with_player();
        // Keep the receiver so the session is not dropped as disconnected.
        let (_, _rx) = instance.join(player, VisibilityFlags::NONE).unwrap();
        instance.tick(TICK, |world| {
            world.spawn(ObjectSpec::new("mob", Coordinate::new(1, 1, 0))).unwrap();
        });
        let stats = instance.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.objects, 2);
        // The player's spawn from setup plus the mob's.
        assert_eq!(stats.diffs_recorded, 2);
    }
}
