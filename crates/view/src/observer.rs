use std::collections::HashSet;
use std::time::Duration;

use sightline_common::{AoiConfig, Coordinate, ObjectId, ObserverId, VisibilityFlags};
use sightline_kernel::{Diff, Tile, TileRef, World};
use sightline_stream::{Recount, Shift, SpatialWindow, WindowError};

use crate::emitter::{EmitError, UpdateEmitter, UpdateSink};
use crate::filter::VisibilityFilter;
use crate::overlay::CameraOverlay;
use crate::protocol::{Controllable, OverlayInfo, ServerMessage, UpdateOptions, UpdateRecord};
use crate::synthesis::{KnownObjects, SynthesisReport, Synthesizer};

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Lifecycle of an [`ObserverView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No valid window. Nothing is sent.
    Suspended,
    /// A tracked object is assigned; the next update places the window.
    Placing,
    /// The window follows the tracked object.
    Tracking,
}

/// Running totals for one observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStats {
    /// Non-empty updates produced.
    pub updates: u64,
    pub full_recounts: u64,
    pub shifts: u64,
    pub evicted_tiles: u64,
    pub tiles_sent: u64,
    pub diffs_sent: u64,
    pub synthesis: SynthesisReport,
}

impl ViewStats {
    fn absorb(&mut self, report: &SynthesisReport) {
        let total = &mut self.synthesis;
        total.forwarded += report.forwarded;
        total.synthesized += report.synthesized;
        total.coalesced += report.coalesced;
        total.suppressed += report.suppressed;
        total.superseded += report.superseded;
        total.filtered += report.filtered;
        total.anomalies += report.anomalies;
    }
}

/// One participant's camera over the world.
///
/// Each tick [`ObserverView::update_view`] follows the tracked object,
/// snapshots every window tile the client has not seen yet, and turns the
/// diffs of the remaining tiles into observer-local changes.
pub struct ObserverView {
    id: ObserverId,
    window: SpatialWindow,
    known_visible: KnownObjects,
    tracked: Option<ObjectId>,
    ability: VisibilityFlags,
    state: ViewState,
    focus_changed: bool,
    overlay: Option<Box<dyn CameraOverlay>>,
    overlay_reset: bool,
    stats: ViewStats,
}

impl ObserverView {
    pub fn new(id: ObserverId, config: AoiConfig) -> Result<Self, ViewError> {
        Ok(Self {
            id,
            window: SpatialWindow::new(config)?,
            known_visible: KnownObjects::new(),
            tracked: None,
            ability: VisibilityFlags::NONE,
            state: ViewState::Suspended,
            focus_changed: false,
            overlay: None,
            overlay_reset: false,
            stats: ViewStats::default(),
        })
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn window(&self) -> &SpatialWindow {
        &self.window
    }

    /// Objects the client currently knows about, keyed by id, with the
    /// position it was last sent for each.
    pub fn known_visible(&self) -> &KnownObjects {
        &self.known_visible
    }

    pub fn tracked_entity(&self) -> Option<ObjectId> {
        self.tracked
    }

    pub fn visibility_ability(&self) -> VisibilityFlags {
        self.ability
    }

    pub fn stats(&self) -> &ViewStats {
        &self.stats
    }

    /// Follow `object` from now on. The client is told about the new
    /// controllable on the next update in which the object exists.
    pub fn set_tracked_entity(&mut self, object: ObjectId) {
        tracing::debug!(observer = %self.id, %object, "tracking entity");
        self.tracked = Some(object);
        self.focus_changed = true;
        if self.state == ViewState::Suspended {
            self.state = ViewState::Placing;
        }
    }

    /// Change what the observer can see through. A tracking view is placed
    /// again so the client gets a baseline under the new ability.
    pub fn set_visibility_ability(&mut self, ability: VisibilityFlags) {
        if self.ability == ability {
            return;
        }
        self.ability = ability;
        if self.state == ViewState::Tracking {
            self.state = ViewState::Placing;
        }
    }

    /// Stop sending anything until a tracked entity is assigned again.
    pub fn suspend(&mut self) {
        tracing::debug!(observer = %self.id, "view suspended");
        self.state = ViewState::Suspended;
    }

    pub fn set_overlay(&mut self, overlay: Box<dyn CameraOverlay>) {
        self.overlay = Some(overlay);
    }

    /// Drop the overlay and tell the client to clear it.
    pub fn reset_overlay(&mut self) {
        self.overlay = None;
        self.overlay_reset = true;
    }

    pub fn filter(&self) -> VisibilityFilter {
        VisibilityFilter::new(self.tracked, self.ability)
    }

    /// Build this tick's update. Call after the world has been mutated and
    /// before its diffs are drained.
    pub fn update_view(&mut self, world: &World) -> UpdateRecord {
        let _span = tracing::debug_span!("update_view", observer = %self.id).entered();
        let mut record = UpdateRecord::default();

        let mut evicted = Vec::new();
        if let Some(anchor) = self.anchor(world) {
            match self.state {
                ViewState::Suspended => {}
                ViewState::Placing => self.place(world, anchor, &mut record),
                ViewState::Tracking => {
                    if self.window.anchor() != Some(anchor) {
                        evicted = self.follow(world, anchor, &mut record);
                    }
                }
            }
        }
        if self.state != ViewState::Tracking {
            return record;
        }

        let filter = self.filter();
        let mut fresh = HashSet::new();
        let mut pending: Vec<&Diff> = Vec::new();
        let mut snapshotted = Vec::new();
        for (slot, tile, synced) in self.window.cells() {
            if synced {
                if let Some(tile) = world.tile(tile) {
                    pending.extend(world.pending_diffs(tile.coord()));
                }
                continue;
            }
            let Some(snapshot) = world.tile_snapshot(tile, |o| filter.permits_object(o)) else {
                continue;
            };
            record.tiles.push(snapshot);
            snapshotted.push(slot);
        }
        for slot in snapshotted {
            self.window.mark_synced(slot);
        }
        // A tile snapshot replaces whatever the client had placed on it.
        if !record.tiles.is_empty() {
            let covered: HashSet<Coordinate> = record.tiles.iter().map(|tile| tile.coord).collect();
            self.known_visible.retain(|_, at| !covered.contains(at));
            for tile in &record.tiles {
                for object in &tile.objects {
                    self.known_visible.insert(object.id, tile.coord);
                    fresh.insert(object.id);
                }
            }
        }
        // Evicted tiles were in sync until now, so the client still needs
        // this tick's changes on them.
        let evicted: Vec<&Tile> = evicted.iter().filter_map(|tile| world.tile(*tile)).collect();
        for tile in &evicted {
            pending.extend(world.pending_diffs(tile.coord()));
        }

        let synthesizer = Synthesizer {
            observer: self.id,
            world,
            filter,
            bounds: self.window.bounds(),
            fresh: &fresh,
        };
        let (diffs, report) = synthesizer.run(pending, &mut self.known_visible);
        self.stats.absorb(&report);
        record.diffs = diffs;

        // The client forgets whatever it last placed on an evicted tile.
        let gone: HashSet<Coordinate> = evicted.iter().map(|tile| tile.coord()).collect();
        if !gone.is_empty() {
            self.known_visible.retain(|_, at| !gone.contains(at));
        }

        if self.window.take_shifted() {
            record.options |= UpdateOptions::WINDOW_SHIFT;
            record.origin = Some(self.window.origin());
        }
        if !record.diffs.is_empty() {
            record.options |= UpdateOptions::DIFFERENCES;
        }
        if self.focus_changed {
            if let Some(object) = self.tracked.and_then(|id| world.object(id)) {
                record.options |= UpdateOptions::NEW_CONTROLLABLE;
                record.controllable = Some(Controllable {
                    id: object.id,
                    speed: object.speed,
                });
                self.focus_changed = false;
            }
        }

        if !record.is_empty() {
            self.stats.updates += 1;
            self.stats.tiles_sent += record.tiles.len() as u64;
            self.stats.diffs_sent += record.diffs.len() as u64;
        }
        record
    }

    /// Run one tick for this observer: build the update, then push it and
    /// any due overlay messages through `emitter`.
    pub fn tick<S: UpdateSink>(
        &mut self,
        world: &World,
        elapsed: Duration,
        emitter: &mut UpdateEmitter<S>,
    ) -> Result<(), ViewError> {
        let record = self.update_view(world);
        emitter.emit(record)?;

        if self.overlay_reset {
            emitter.send(ServerMessage::OverlayReset)?;
            self.overlay_reset = false;
        }
        if let Some(infos) = self.overlay_update(world, elapsed) {
            emitter.send(ServerMessage::OverlayUpdate(infos))?;
        }
        Ok(())
    }

    fn overlay_update(&mut self, world: &World, elapsed: Duration) -> Option<Vec<OverlayInfo>> {
        let filter = self.filter();
        let overlay = self.overlay.as_mut()?;
        if !overlay.is_due(elapsed) || self.state != ViewState::Tracking {
            return None;
        }
        let infos = self
            .window
            .cells()
            .filter_map(|(_, tile, _)| world.tile(tile))
            .map(|tile| overlay.info(world, tile, &filter))
            .collect();
        Some(infos)
    }

    /// Tile coordinate of the tracked object, if it still stands on one.
    fn anchor(&self, world: &World) -> Option<Coordinate> {
        let object = world.object(self.tracked?)?;
        world.tile_at(object.position).map(|tile| tile.coord())
    }

    fn place(&mut self, world: &World, anchor: Coordinate, record: &mut UpdateRecord) {
        if self.window.full_recount(world, anchor) == Recount::NoAnchor {
            return;
        }
        self.known_visible.clear();
        self.state = ViewState::Tracking;
        self.stats.full_recounts += 1;
        record.options |= UpdateOptions::CAMERA_MOVE;
        record.camera = Some(anchor);
        tracing::debug!(observer = %self.id, %anchor, "window placed");
    }

    /// Returns the tiles that fell out of the window.
    fn follow(&mut self, world: &World, anchor: Coordinate, record: &mut UpdateRecord) -> Vec<TileRef> {
        let evicted = match self.window.try_shift(world, anchor) {
            Shift::NoAnchor => return Vec::new(),
            Shift::Unchanged => Vec::new(),
            Shift::Recounted => {
                self.known_visible.clear();
                self.stats.full_recounts += 1;
                Vec::new()
            }
            Shift::Moved { evicted, .. } => {
                self.stats.shifts += 1;
                self.stats.evicted_tiles += evicted.len() as u64;
                evicted
            }
        };
        record.options |= UpdateOptions::CAMERA_MOVE;
        record.camera = Some(anchor);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::ObjectDensityOverlay;
    use crate::protocol::ViewDiff;
    use sightline_common::Direction;
    use sightline_kernel::ObjectSpec;

    const PLAYER: Coordinate = Coordinate::new(10, 10, 0);

    fn config() -> AoiConfig {
        AoiConfig {
            fov: 7,
            min_padding: 2,
            z_fov: 1,
        }
    }

    /// A 40x40 world with a tracked player whose window is already placed.
    fn setup() -> (World, ObserverView, ObjectId) {
        let mut world = World::new(Coordinate::new(40, 40, 1)).unwrap();
        let player = world.spawn(ObjectSpec::new("player", PLAYER)).unwrap();
        let mut view = ObserverView::new(ObserverId::new(), config()).unwrap();
        view.set_tracked_entity(player);
        observe(&mut world, &mut view);
        (world, view, player)
    }

    fn observe(world: &mut World, view: &mut ObserverView) -> UpdateRecord {
        let record = view.update_view(world);
        world.drain_diffs();
        world.step();
        record
    }

    #[test]
    fn first_update_sends_whole_window() {
        let mut world = World::new(Coordinate::new(40, 40, 1)).unwrap();
        let player = world.spawn(ObjectSpec::new("player", PLAYER)).unwrap();
        let mut view = ObserverView::new(ObserverId::new(), config()).unwrap();
        assert_eq!(view.state(), ViewState::Suspended);
        view.set_tracked_entity(player);
        assert_eq!(view.state(), ViewState::Placing);

        let record = observe(&mut world, &mut view);
        assert_eq!(
            record.options,
            UpdateOptions::WINDOW_SHIFT | UpdateOptions::CAMERA_MOVE | UpdateOptions::NEW_CONTROLLABLE
        );
        assert_eq!(record.camera, Some(PLAYER));
        assert_eq!(record.origin, Some(Coordinate::new(5, 5, 0)));
        assert_eq!(record.tiles.len(), 121);
        // The player's own Add is covered by the snapshot.
        assert!(record.diffs.is_empty());
        assert_eq!(
            record.controllable,
            Some(Controllable {
                id: player,
                speed: 4.0
            })
        );
        assert!(view.known_visible().contains_key(&player));
        assert_eq!(view.state(), ViewState::Tracking);
        assert_eq!(view.window().synced_count(), 121);
    }

    #[test]
    fn placing_clears_known_and_sync_state() {
        let (world, mut view, _) = setup();
        assert!(!view.known_visible().is_empty());

        let mut record = UpdateRecord::default();
        view.place(&world, PLAYER, &mut record);
        assert!(view.known_visible().is_empty());
        assert_eq!(view.window().synced_count(), 0);
    }

    #[test]
    fn quiet_tick_sends_nothing() {
        let (world, mut view, _) = setup();
        let mut emitter = UpdateEmitter::new(Vec::new());
        view.tick(&world, Duration::from_millis(50), &mut emitter).unwrap();
        assert!(emitter.sink().is_empty());
        assert_eq!(emitter.skipped(), 1);
    }

    #[test]
    fn spawn_then_step_arrives_as_one_add() {
        let (mut world, mut view, _) = setup();
        let t = Coordinate::new(12, 12, 0);
        let id = world.spawn(ObjectSpec::new("mob", t)).unwrap();
        world.move_object(id, Direction::East).unwrap();

        let record = observe(&mut world, &mut view);
        assert_eq!(record.options, UpdateOptions::DIFFERENCES);
        assert_eq!(record.diffs.len(), 1);
        match &record.diffs[0] {
            ViewDiff::Add { snapshot, at } => {
                assert_eq!(snapshot.id, id);
                assert_eq!(*at, t.step(Direction::East));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn move_within_window_is_sent_once() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(8, 8, 0))).unwrap();
        observe(&mut world, &mut view);

        world.move_object(id, Direction::North).unwrap();
        let record = observe(&mut world, &mut view);
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Move {
                object: id,
                direction: Direction::North
            }]
        );
    }

    #[test]
    fn object_walking_in_is_added_at_final_tile() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(17, 10, 0))).unwrap();
        let record = observe(&mut world, &mut view);
        assert!(record.is_empty());
        assert!(!view.known_visible().contains_key(&id));

        for _ in 0..3 {
            world.move_object(id, Direction::West).unwrap();
        }
        let record = observe(&mut world, &mut view);
        assert_eq!(record.diffs.len(), 1);
        assert!(matches!(
            &record.diffs[0],
            ViewDiff::Add { snapshot, at } if snapshot.id == id && *at == Coordinate::new(14, 10, 0)
        ));
        assert!(view.known_visible().contains_key(&id));

        world.move_object(id, Direction::West).unwrap();
        let record = observe(&mut world, &mut view);
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Move {
                object: id,
                direction: Direction::West
            }]
        );
    }

    #[test]
    fn teleport_into_window_adds() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(30, 30, 0))).unwrap();
        observe(&mut world, &mut view);

        world.relocate(id, Coordinate::new(12, 12, 0)).unwrap();
        let record = observe(&mut world, &mut view);
        assert!(matches!(
            &record.diffs[..],
            [ViewDiff::Add { at, .. }] if *at == Coordinate::new(12, 12, 0)
        ));
    }

    #[test]
    fn teleport_inside_window_keeps_object_known() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(12, 12, 0))).unwrap();
        observe(&mut world, &mut view);

        world.relocate(id, Coordinate::new(7, 7, 0)).unwrap();
        let record = observe(&mut world, &mut view);
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Relocate {
                object: id,
                to: Coordinate::new(7, 7, 0)
            }]
        );
        assert!(view.known_visible().contains_key(&id));
        assert_eq!(view.stats().synthesis.suppressed, 1);
    }

    #[test]
    fn teleport_out_of_window_removes() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(12, 12, 0))).unwrap();
        observe(&mut world, &mut view);

        world.relocate(id, Coordinate::new(35, 35, 0)).unwrap();
        let record = observe(&mut world, &mut view);
        assert_eq!(record.diffs, vec![ViewDiff::Remove { object: id }]);
        assert!(!view.known_visible().contains_key(&id));
    }

    #[test]
    fn removal_is_forwarded() {
        let (mut world, mut view, _) = setup();
        let id = world.spawn(ObjectSpec::new("mob", Coordinate::new(9, 9, 0))).unwrap();
        observe(&mut world, &mut view);

        world.remove(id).unwrap();
        let record = observe(&mut world, &mut view);
        assert_eq!(record.diffs, vec![ViewDiff::Remove { object: id }]);
        assert!(!view.known_visible().contains_key(&id));
        assert_eq!(view.stats().synthesis.anomalies, 0);
    }

    #[test]
    fn invisible_objects_stay_hidden() {
        let (mut world, mut view, _) = setup();
        let ghost = world
            .spawn(ObjectSpec::new("ghost", Coordinate::new(9, 9, 0)).invisible(VisibilityFlags(1)))
            .unwrap();
        let record = observe(&mut world, &mut view);
        assert!(record.is_empty());

        world.move_object(ghost, Direction::East).unwrap();
        assert!(observe(&mut world, &mut view).is_empty());
        assert!(!view.known_visible().contains_key(&ghost));
    }

    #[test]
    fn gaining_ability_resends_baseline() {
        let (mut world, mut view, _) = setup();
        let ghost = world
            .spawn(ObjectSpec::new("ghost", Coordinate::new(9, 9, 0)).invisible(VisibilityFlags(1)))
            .unwrap();
        observe(&mut world, &mut view);

        view.set_visibility_ability(VisibilityFlags(1));
        let record = observe(&mut world, &mut view);
        assert_eq!(record.tiles.len(), 121);
        let seen = record
            .tiles
            .iter()
            .flat_map(|t| &t.objects)
            .any(|o| o.id == ghost);
        assert!(seen);
        assert!(view.known_visible().contains_key(&ghost));
    }

    #[test]
    fn invisible_player_sees_itself() {
        let mut world = World::new(Coordinate::new(40, 40, 1)).unwrap();
        let player = world
            .spawn(ObjectSpec::new("player", PLAYER).invisible(VisibilityFlags(1)))
            .unwrap();
        let mut view = ObserverView::new(ObserverId::new(), config()).unwrap();
        view.set_tracked_entity(player);
        observe(&mut world, &mut view);
        assert!(view.known_visible().contains_key(&player));
    }

    #[test]
    fn drift_inside_padding_moves_camera_only() {
        let (mut world, mut view, player) = setup();
        world.move_object(player, Direction::East).unwrap();

        let record = observe(&mut world, &mut view);
        assert_eq!(record.options, UpdateOptions::CAMERA_MOVE | UpdateOptions::DIFFERENCES);
        assert_eq!(record.camera, Some(Coordinate::new(11, 10, 0)));
        assert_eq!(record.origin, None);
        assert!(record.tiles.is_empty());
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Move {
                object: player,
                direction: Direction::East
            }]
        );
    }

    #[test]
    fn shift_evicts_objects_and_sends_new_tiles() {
        let (mut world, mut view, player) = setup();
        let left = world.spawn(ObjectSpec::new("mob", Coordinate::new(6, 10, 0))).unwrap();
        observe(&mut world, &mut view);
        assert!(view.known_visible().contains_key(&left));

        world.relocate(player, Coordinate::new(15, 10, 0)).unwrap();
        let record = observe(&mut world, &mut view);
        assert!(record.options.contains(UpdateOptions::WINDOW_SHIFT | UpdateOptions::CAMERA_MOVE));
        assert_eq!(record.origin, Some(Coordinate::new(10, 5, 0)));
        assert_eq!(record.tiles.len(), 55);
        assert!(record.tiles.iter().all(|t| t.coord.x >= 16));
        assert_eq!(
            record.diffs,
            vec![ViewDiff::Relocate {
                object: player,
                to: Coordinate::new(15, 10, 0)
            }]
        );
        assert!(!view.known_visible().contains_key(&left));
        assert_eq!(view.stats().evicted_tiles, 55);
    }

    #[test]
    fn snapshotted_object_gets_no_diff() {
        let (mut world, mut view, player) = setup();
        let edge = world.spawn(ObjectSpec::new("mob", Coordinate::new(15, 10, 0))).unwrap();
        observe(&mut world, &mut view);

        world.relocate(player, Coordinate::new(15, 11, 0)).unwrap();
        world.move_object(edge, Direction::East).unwrap();
        let record = observe(&mut world, &mut view);

        assert!(record.diffs.iter().all(|d| d.object() != edge));
        let in_snapshot = record
            .tiles
            .iter()
            .find(|t| t.coord == Coordinate::new(16, 10, 0))
            .map(|t| t.objects.iter().any(|o| o.id == edge));
        assert_eq!(in_snapshot, Some(true));
        assert!(view.known_visible().contains_key(&edge));
    }

    #[test]
    fn focus_change_announces_controllable() {
        let (mut world, mut view, _) = setup();
        let other = world
            .spawn(ObjectSpec::new("horse", Coordinate::new(12, 12, 0)).speed(6.0))
            .unwrap();
        observe(&mut world, &mut view);

        view.set_tracked_entity(other);
        let record = observe(&mut world, &mut view);
        assert!(record.options.contains(UpdateOptions::NEW_CONTROLLABLE | UpdateOptions::CAMERA_MOVE));
        assert_eq!(record.camera, Some(Coordinate::new(12, 12, 0)));
        assert_eq!(
            record.controllable,
            Some(Controllable {
                id: other,
                speed: 6.0
            })
        );
    }

    #[test]
    fn lost_tracked_entity_is_a_no_op() {
        let (mut world, mut view, player) = setup();
        world.remove(player).unwrap();

        let record = observe(&mut world, &mut view);
        assert_eq!(record.diffs, vec![ViewDiff::Remove { object: player }]);
        assert_eq!(record.camera, None);

        let record = observe(&mut world, &mut view);
        assert!(record.is_empty());
    }

    #[test]
    fn suspended_view_sends_nothing_until_retracked() {
        let (mut world, mut view, player) = setup();
        view.suspend();
        world.spawn(ObjectSpec::new("mob", Coordinate::new(9, 9, 0))).unwrap();
        assert!(observe(&mut world, &mut view).is_empty());

        view.set_tracked_entity(player);
        let record = observe(&mut world, &mut view);
        assert_eq!(record.tiles.len(), 121);
        assert_eq!(view.known_visible().len(), 2);
    }

    #[test]
    fn overlay_is_sent_when_due_and_reset_on_request() {
        let (world, mut view, player) = setup();
        view.set_overlay(Box::new(ObjectDensityOverlay::new(Duration::from_millis(100))));
        let mut emitter = UpdateEmitter::new(Vec::new());

        view.tick(&world, Duration::from_millis(50), &mut emitter).unwrap();
        assert!(emitter.sink().is_empty());

        view.tick(&world, Duration::from_millis(50), &mut emitter).unwrap();
        let messages = emitter.sink_mut().drain(..).collect::<Vec<_>>();
        let [ServerMessage::OverlayUpdate(infos)] = &messages[..] else {
            panic!("expected one overlay update, got {messages:?}");
        };
        assert_eq!(infos.len(), 121);
        let at_player = infos.iter().find(|i| i.coord == PLAYER).map(|i| i.value);
        assert_eq!(at_player, Some(1));
        assert!(world.object(player).is_some());

        view.reset_overlay();
        view.tick(&world, Duration::from_millis(500), &mut emitter).unwrap();
        assert_eq!(emitter.sink().as_slice(), &[ServerMessage::OverlayReset]);
    }
}
