//! Turns the world's raw per-tile diffs into the observer-local diffs a
//! client can apply to what it already knows.

use std::collections::{HashMap, HashSet};

use sightline_common::{Coordinate, ObjectId, ObserverId};
use sightline_kernel::{Diff, DiffKind, World};
use sightline_stream::WindowBounds;

use crate::filter::VisibilityFilter;
use crate::protocol::ViewDiff;

/// Objects the client knows about, with the position it was last told.
///
/// An object that walks out of the window with a forwarded `Move` stays
/// here at its last sent position. It leaves on a Remove, on a shift that
/// evicts that position, or on a snapshot of that tile that omits it.
pub type KnownObjects = HashMap<ObjectId, Coordinate>;

/// Counters from one synthesis pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Diffs forwarded more or less as recorded.
    pub forwarded: u64,
    /// `Add`s made up for objects entering the window.
    pub synthesized: u64,
    /// Later diffs folded into an `Add` of the same update.
    pub coalesced: u64,
    /// In-window `RelocateAway`s, which change nothing for the client.
    pub suppressed: u64,
    /// Diffs skipped because the object is in a tile snapshot of this update.
    pub superseded: u64,
    /// Diffs the observer is not allowed to perceive.
    pub filtered: u64,
    /// Diffs contradicting what the observer knows; dropped.
    pub anomalies: u64,
}

pub(crate) struct Synthesizer<'a> {
    pub observer: ObserverId,
    pub world: &'a World,
    pub filter: VisibilityFilter,
    pub bounds: WindowBounds,
    /// Objects included in a tile snapshot during this update.
    pub fresh: &'a HashSet<ObjectId>,
}

#[derive(Default)]
struct Output {
    diffs: Vec<Option<ViewDiff>>,
    /// Index into `diffs` of the `Add` emitted this update, per object.
    added: HashMap<ObjectId, usize>,
    /// Objects that entered the window but no longer exist.
    vanished: HashSet<ObjectId>,
    report: SynthesisReport,
}

impl Synthesizer<'_> {
    /// Process `diffs` in sequence order, updating `known` as the client's
    /// view changes.
    pub fn run(
        &self,
        mut diffs: Vec<&Diff>,
        known: &mut KnownObjects,
    ) -> (Vec<ViewDiff>, SynthesisReport) {
        // Moves are indexed on two tiles, so the same diff can show up twice.
        diffs.sort_by_key(|d| d.sequence);
        diffs.dedup_by_key(|d| d.sequence);

        let mut out = Output::default();
        for diff in diffs {
            self.apply(diff, known, &mut out);
        }
        let diffs = out.diffs.into_iter().flatten().collect();
        (diffs, out.report)
    }

    fn apply(&self, diff: &Diff, known: &mut KnownObjects, out: &mut Output) {
        let id = diff.object;
        if !self.filter.permits(id, diff.invisibility) {
            out.report.filtered += 1;
            return;
        }
        if self.fresh.contains(&id) {
            out.report.superseded += 1;
            return;
        }
        if out.vanished.contains(&id) {
            return;
        }

        let told = known.get(&id).copied();
        match &diff.kind {
            DiffKind::Add { at, snapshot } => {
                if told.is_some() {
                    self.anomaly(diff, out);
                    return;
                }
                known.insert(id, *at);
                out.added.insert(id, out.diffs.len());
                out.diffs.push(Some(ViewDiff::Add {
                    snapshot: snapshot.clone(),
                    at: *at,
                }));
                out.report.forwarded += 1;
            }
            DiffKind::Move { from, direction } => {
                let to = from.step(*direction);
                let Some(told) = told else {
                    self.enter(id, to, known, out);
                    return;
                };
                known.insert(id, to);
                if Self::coalesce(id, to, out) {
                    return;
                }
                // A relative step only lands right from where the client
                // last saw the object.
                let forwarded = if told == *from {
                    ViewDiff::Move {
                        object: id,
                        direction: *direction,
                    }
                } else {
                    ViewDiff::Relocate { object: id, to }
                };
                out.diffs.push(Some(forwarded));
                out.report.forwarded += 1;
            }
            DiffKind::Relocate { to } => {
                if told.is_none() {
                    self.enter(id, *to, known, out);
                    return;
                }
                known.insert(id, *to);
                if !Self::coalesce(id, *to, out) {
                    out.diffs.push(Some(ViewDiff::Relocate { object: id, to: *to }));
                    out.report.forwarded += 1;
                }
            }
            DiffKind::RelocateAway { to } => {
                if told.is_none() {
                    self.anomaly(diff, out);
                } else if self.bounds.contains(*to) {
                    out.report.suppressed += 1;
                } else {
                    known.remove(&id);
                    Self::retract(id, out);
                }
            }
            DiffKind::Remove => {
                if told.is_none() {
                    self.anomaly(diff, out);
                    return;
                }
                known.remove(&id);
                Self::retract(id, out);
            }
        }
    }

    /// An object the client does not know arrived at `at`.
    fn enter(&self, id: ObjectId, at: Coordinate, known: &mut KnownObjects, out: &mut Output) {
        let Some(object) = self.world.object(id) else {
            tracing::debug!(observer = %self.observer, object = %id, "entering object no longer exists");
            out.vanished.insert(id);
            return;
        };
        known.insert(id, at);
        out.added.insert(id, out.diffs.len());
        out.diffs.push(Some(ViewDiff::Add {
            snapshot: object.snapshot(),
            at,
        }));
        out.report.synthesized += 1;
    }

    /// Fold a position change into an `Add` already in this update.
    fn coalesce(id: ObjectId, to: Coordinate, out: &mut Output) -> bool {
        let Some(&index) = out.added.get(&id) else {
            return false;
        };
        let Some(Some(ViewDiff::Add { at, .. })) = out.diffs.get_mut(index) else {
            return false;
        };
        *at = to;
        out.report.coalesced += 1;
        true
    }

    /// The client must forget `id`. If it only learned about it in this
    /// update, drop the `Add` instead of sending both.
    fn retract(id: ObjectId, out: &mut Output) {
        if let Some(index) = out.added.remove(&id) {
            out.diffs[index] = None;
            out.report.coalesced += 1;
            return;
        }
        out.diffs.push(Some(ViewDiff::Remove { object: id }));
        out.report.forwarded += 1;
    }

    fn anomaly(&self, diff: &Diff, out: &mut Output) {
        tracing::warn!(
            observer = %self.observer,
            object = %diff.object,
            sequence = diff.sequence,
            kind = diff.kind.name(),
            "diff contradicts known set, dropped"
        );
        out.report.anomalies += 1;
    }
}
