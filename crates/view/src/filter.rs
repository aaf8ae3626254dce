use sightline_common::{ObjectId, VisibilityFlags};
use sightline_kernel::ObjectData;

/// Decides whether an observer may perceive an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityFilter {
    /// The observer's own controlled object, always perceivable.
    pub viewer: Option<ObjectId>,
    /// See-invisible ability of the observer.
    pub ability: VisibilityFlags,
}

impl VisibilityFilter {
    pub fn new(viewer: Option<ObjectId>, ability: VisibilityFlags) -> Self {
        Self { viewer, ability }
    }

    pub fn permits(&self, object: ObjectId, invisibility: VisibilityFlags) -> bool {
        self.viewer == Some(object) || self.ability.contains(invisibility)
    }

    pub fn permits_object(&self, object: &ObjectData) -> bool {
        self.permits(object.id, object.invisibility)
    }
}
