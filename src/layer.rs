//! The map widget seen from the reconciliation engine.
//!
//! [`MapLayer`] is the capability surface the engine drives: place, restyle
//! and remove point markers and floating labels, and toggle whole overlay
//! groups. [`SceneLayer`] is an in-memory implementation that mirrors what a
//! real widget would show; the headless sync binary and the tests use it.

use crate::style::MarkerStyle;
use crate::types::{CategoryGroup, MapPoint};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct LabelHandle(pub u64);

pub trait MapLayer {
    fn place_marker(
        &mut self,
        group: CategoryGroup,
        at: MapPoint,
        style: &MarkerStyle,
        popup: &str,
    ) -> MarkerHandle;

    fn update_marker(&mut self, handle: MarkerHandle, at: MapPoint, style: &MarkerStyle, popup: &str);

    fn remove_marker(&mut self, handle: MarkerHandle);

    fn place_label(&mut self, group: CategoryGroup, at: MapPoint, text: &str, class: &str)
        -> LabelHandle;

    fn update_label(&mut self, handle: LabelHandle, at: MapPoint, text: &str, class: &str);

    fn remove_label(&mut self, handle: LabelHandle);

    /// Detach a label from its group without destroying it, or re-attach it.
    fn set_label_attached(&mut self, handle: LabelHandle, attached: bool);

    fn set_group_visible(&mut self, group: CategoryGroup, visible: bool);
}

// ---------------------------------------------------------------------------
// In-memory scene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SceneMarker {
    pub group: CategoryGroup,
    pub at: MapPoint,
    pub style: MarkerStyle,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneLabel {
    pub group: CategoryGroup,
    pub at: MapPoint,
    pub text: String,
    pub class: String,
    pub attached: bool,
}

/// Running totals of every call made against the layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerCounters {
    pub markers_placed: u64,
    pub markers_updated: u64,
    pub markers_removed: u64,
    pub labels_placed: u64,
    pub labels_updated: u64,
    pub labels_removed: u64,
}

#[derive(Debug, Default)]
pub struct SceneLayer {
    next_handle: u64,
    markers: HashMap<MarkerHandle, SceneMarker>,
    labels: HashMap<LabelHandle, SceneLabel>,
    hidden_groups: HashSet<CategoryGroup>,
    counters: LayerCounters,
}

impl SceneLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&SceneMarker> {
        self.markers.get(&handle)
    }

    pub fn label(&self, handle: LabelHandle) -> Option<&SceneLabel> {
        self.labels.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn markers_in(&self, group: CategoryGroup) -> usize {
        self.markers.values().filter(|m| m.group == group).count()
    }

    pub fn is_group_visible(&self, group: CategoryGroup) -> bool {
        !self.hidden_groups.contains(&group)
    }

    /// A label is on screen when attached and its group is shown.
    pub fn is_label_shown(&self, handle: LabelHandle) -> bool {
        self.labels
            .get(&handle)
            .is_some_and(|l| l.attached && self.is_group_visible(l.group))
    }

    pub fn counters(&self) -> LayerCounters {
        self.counters
    }
}

impl MapLayer for SceneLayer {
    fn place_marker(
        &mut self,
        group: CategoryGroup,
        at: MapPoint,
        style: &MarkerStyle,
        popup: &str,
    ) -> MarkerHandle {
        let handle = MarkerHandle(self.next());
        self.markers.insert(
            handle,
            SceneMarker {
                group,
                at,
                style: style.clone(),
                popup: popup.to_string(),
            },
        );
        self.counters.markers_placed += 1;
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, at: MapPoint, style: &MarkerStyle, popup: &str) {
        if let Some(m) = self.markers.get_mut(&handle) {
            m.at = at;
            m.style = style.clone();
            m.popup = popup.to_string();
            self.counters.markers_updated += 1;
        }
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            self.counters.markers_removed += 1;
        }
    }

    fn place_label(
        &mut self,
        group: CategoryGroup,
        at: MapPoint,
        text: &str,
        class: &str,
    ) -> LabelHandle {
        let handle = LabelHandle(self.next());
        self.labels.insert(
            handle,
            SceneLabel {
                group,
                at,
                text: text.to_string(),
                class: class.to_string(),
                attached: true,
            },
        );
        self.counters.labels_placed += 1;
        handle
    }

    fn update_label(&mut self, handle: LabelHandle, at: MapPoint, text: &str, class: &str) {
        if let Some(l) = self.labels.get_mut(&handle) {
            l.at = at;
            l.text = text.to_string();
            l.class = class.to_string();
            self.counters.labels_updated += 1;
        }
    }

    fn remove_label(&mut self, handle: LabelHandle) {
        if self.labels.remove(&handle).is_some() {
            self.counters.labels_removed += 1;
        }
    }

    fn set_label_attached(&mut self, handle: LabelHandle, attached: bool) {
        if let Some(l) = self.labels.get_mut(&handle) {
            l.attached = attached;
        }
    }

    fn set_group_visible(&mut self, group: CategoryGroup, visible: bool) {
        if visible {
            self.hidden_groups.remove(&group);
        } else {
            self.hidden_groups.insert(group);
        }
    }
}
