//! Reconciliation engine – diff a fresh snapshot against what is on the map.
//!
//! One [`Reconciler`] exists per category group and exclusively owns that
//! group's [`RenderedSet`]. A pass:
//!
//! 1. drops entities at the unset position `(0, 0)` (silently);
//! 2. drops entities outside the world bounds (with a warning);
//! 3. collapses duplicate ids, the later record winning;
//! 4. updates existing marker/label pairs in place and creates new ones;
//! 5. removes every pair whose id was not in the filtered snapshot, except
//!    debug-flagged ones.
//!
//! Nothing in a pass can fail. A poll that produced no snapshot never reaches
//! the engine, so the rendered set is only ever replaced by a whole pass.

use crate::coords::{CoordinateConvention, CoordinateMapper};
use crate::layer::{LabelHandle, MapLayer, MarkerHandle};
use crate::protocol::Snapshot;
use crate::style::{pin_style, PinStyle};
use crate::types::{CategoryGroup, Entity, MapPoint, WorldPoint};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Category profile
// ---------------------------------------------------------------------------

/// Per-group knobs that used to be copy-pasted per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProfile {
    pub group: CategoryGroup,
    pub convention: CoordinateConvention,
    /// Whether pairs in this group carry a floating text label.
    pub labels: bool,
}

impl CategoryProfile {
    pub fn for_group(group: CategoryGroup) -> Self {
        match group {
            CategoryGroup::Players => Self {
                group,
                convention: CoordinateConvention::Raw,
                labels: true,
            },
            CategoryGroup::Npcs | CategoryGroup::Garages => Self {
                group,
                convention: CoordinateConvention::Normalized,
                labels: true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered set
// ---------------------------------------------------------------------------

/// Two-state label visibility, driven by the marker's popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelVisibility {
    Shown,
    SuppressedByPopup,
}

/// The visual projection of one tracked entity.
#[derive(Debug, Clone)]
pub struct RenderedMarkerPair {
    pub entity: Entity,
    pub marker: MarkerHandle,
    pub label: Option<LabelHandle>,
    /// Where the marker currently sits on the map.
    pub at: MapPoint,
    pub label_visibility: LabelVisibility,
    /// Injected manually; survives the removal sweep until cleared.
    pub debug: bool,
}

/// Id → pair, iterated in first-sighting order.
#[derive(Debug, Default)]
pub struct RenderedSet {
    pairs: HashMap<String, RenderedMarkerPair>,
    order: Vec<String>,
}

impl RenderedSet {
    pub fn get(&self, id: &str) -> Option<&RenderedMarkerPair> {
        self.pairs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pairs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedMarkerPair> {
        self.order.iter().filter_map(|id| self.pairs.get(id))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.iter().map(|p| &p.entity)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut RenderedMarkerPair> {
        self.pairs.get_mut(id)
    }

    fn insert(&mut self, pair: RenderedMarkerPair) {
        let id = pair.entity.id.clone();
        if self.pairs.insert(id.clone(), pair).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: &str) -> Option<RenderedMarkerPair> {
        let pair = self.pairs.remove(id)?;
        self.order.retain(|o| o != id);
        Some(pair)
    }
}

// ---------------------------------------------------------------------------
// Pass report
// ---------------------------------------------------------------------------

/// What a single reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub skipped_unset: usize,
    pub skipped_out_of_bounds: Vec<String>,
    /// Records dropped because a later record in the same snapshot had the same id.
    pub duplicates: usize,
}

impl PassReport {
    /// True if the pass created or destroyed anything.
    pub fn changed_membership(&self) -> bool {
        !self.created.is_empty() || !self.removed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler {
    profile: CategoryProfile,
    mapper: CoordinateMapper,
    label_offset: f64,
    rendered: RenderedSet,
    passes: u64,
}

/// Everything the layer needs to draw one entity.
struct Placement {
    style: &'static PinStyle,
    at: MapPoint,
    label_at: MapPoint,
    label_text: String,
    popup: String,
}

impl Reconciler {
    pub fn new(profile: CategoryProfile, mapper: CoordinateMapper, label_offset: f64) -> Self {
        Self {
            profile,
            mapper,
            label_offset,
            rendered: RenderedSet::default(),
            passes: 0,
        }
    }

    pub fn profile(&self) -> &CategoryProfile {
        &self.profile
    }

    pub fn rendered(&self) -> &RenderedSet {
        &self.rendered
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Current marker position for `id`, for click-to-center.
    pub fn position_of(&self, id: &str) -> Option<MapPoint> {
        self.rendered.get(id).map(|p| p.at)
    }

    // -----------------------------------------------------------------------
    // Main pass
    // -----------------------------------------------------------------------

    /// Apply one snapshot to the rendered set and the map layer.
    pub fn reconcile(&mut self, snapshot: &Snapshot, layer: &mut dyn MapLayer) -> PassReport {
        let mut report = PassReport::default();

        if snapshot.group != self.profile.group {
            warn!(
                "Ignoring {} snapshot handed to the {} engine",
                snapshot.group, self.profile.group
            );
            return report;
        }
        self.passes += 1;

        // Filter + collapse duplicates, keeping first-sighting order.
        let mut survivors: Vec<&Entity> = Vec::with_capacity(snapshot.len());
        let mut slot_of: HashMap<&str, usize> = HashMap::with_capacity(snapshot.len());
        for entity in &snapshot.entities {
            if entity.position.is_unset() {
                report.skipped_unset += 1;
                continue;
            }
            if entity.category.group() != self.profile.group {
                warn!(
                    "Skipping {} {}: not part of the {} group",
                    entity.category, entity.id, self.profile.group
                );
                continue;
            }
            if !self.mapper.contains(entity.position) {
                warn!(
                    "{} {} coordinates out of bounds: {}",
                    entity.category, entity.id, entity.position
                );
                report.skipped_out_of_bounds.push(entity.id.clone());
                continue;
            }
            match slot_of.get(entity.id.as_str()) {
                Some(&slot) => {
                    survivors[slot] = entity;
                    report.duplicates += 1;
                }
                None => {
                    slot_of.insert(entity.id.as_str(), survivors.len());
                    survivors.push(entity);
                }
            }
        }

        for entity in &survivors {
            if self.upsert(entity, layer) {
                report.created.push(entity.id.clone());
            } else {
                report.updated.push(entity.id.clone());
            }
        }

        // Removal sweep.
        let seen: HashSet<&str> = survivors.iter().map(|e| e.id.as_str()).collect();
        let stale: Vec<String> = self
            .rendered
            .iter()
            .filter(|p| !p.debug && !seen.contains(p.entity.id.as_str()))
            .map(|p| p.entity.id.clone())
            .collect();
        for id in stale {
            self.destroy(&id, layer);
            report.removed.push(id);
        }

        report
    }

    // -----------------------------------------------------------------------
    // Debug dots
    // -----------------------------------------------------------------------

    /// Place (or move) a manually injected entity that the removal sweep
    /// leaves alone. Returns false if it has no position yet or is out of
    /// bounds.
    pub fn inject_debug(&mut self, entity: &Entity, layer: &mut dyn MapLayer) -> bool {
        if entity.position.is_unset() {
            return false;
        }
        if entity.category.group() != self.profile.group {
            warn!(
                "Debug dot {} is a {}, not part of the {} group",
                entity.id, entity.category, self.profile.group
            );
            return false;
        }
        if !self.mapper.contains(entity.position) {
            warn!(
                "Debug dot {} coordinates out of bounds: {}",
                entity.id, entity.position
            );
            return false;
        }
        self.upsert(entity, layer);
        if let Some(pair) = self.rendered.get_mut(&entity.id) {
            pair.debug = true;
        }
        debug!("Injected debug dot {} at {}", entity.id, entity.position);
        true
    }

    /// Remove a debug-flagged pair. Non-debug ids are left to the sweep.
    pub fn clear_debug(&mut self, id: &str, layer: &mut dyn MapLayer) -> bool {
        match self.rendered.get(id) {
            Some(pair) if pair.debug => {
                self.destroy(id, layer);
                true
            }
            _ => false,
        }
    }

    pub fn is_debug(&self, id: &str) -> bool {
        self.rendered.get(id).is_some_and(|p| p.debug)
    }

    // -----------------------------------------------------------------------
    // Popup-driven label visibility
    // -----------------------------------------------------------------------

    pub fn popup_opened(&mut self, id: &str, layer: &mut dyn MapLayer) {
        self.set_label_visibility(id, LabelVisibility::SuppressedByPopup, layer);
    }

    pub fn popup_closed(&mut self, id: &str, layer: &mut dyn MapLayer) {
        self.set_label_visibility(id, LabelVisibility::Shown, layer);
    }

    fn set_label_visibility(
        &mut self,
        id: &str,
        visibility: LabelVisibility,
        layer: &mut dyn MapLayer,
    ) {
        let Some(pair) = self.rendered.get_mut(id) else {
            return;
        };
        if pair.label_visibility == visibility {
            return;
        }
        pair.label_visibility = visibility;
        if let Some(label) = pair.label {
            layer.set_label_attached(label, visibility == LabelVisibility::Shown);
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn placement(&self, entity: &Entity) -> Placement {
        let style = pin_style(entity.category);
        let p = entity.position;
        let convention = self.profile.convention;
        let label_text = style.format_name(entity.name());
        let popup = match self.profile.group {
            CategoryGroup::Garages => format!("Garage {}", entity.id),
            _ => format!("{label_text} {p}"),
        };
        Placement {
            style,
            at: self.mapper.place(convention, p),
            label_at: self
                .mapper
                .place(convention, WorldPoint::new(p.x, p.y - self.label_offset)),
            label_text,
            popup,
        }
    }

    /// Create or fully restyle the pair for `entity`. Returns true if created.
    fn upsert(&mut self, entity: &Entity, layer: &mut dyn MapLayer) -> bool {
        let place = self.placement(entity);
        let marker_style = place.style.marker_style();
        let label_class = place.style.label_class();
        let group = self.profile.group;

        if let Some(pair) = self.rendered.get_mut(&entity.id) {
            layer.update_marker(pair.marker, place.at, &marker_style, &place.popup);
            match pair.label {
                Some(label) => {
                    layer.update_label(label, place.label_at, &place.label_text, &label_class)
                }
                None if self.profile.labels => {
                    let label =
                        layer.place_label(group, place.label_at, &place.label_text, &label_class);
                    if pair.label_visibility == LabelVisibility::SuppressedByPopup {
                        layer.set_label_attached(label, false);
                    }
                    pair.label = Some(label);
                }
                None => {}
            }
            pair.at = place.at;
            pair.entity = entity.clone();
            return false;
        }

        let marker = layer.place_marker(group, place.at, &marker_style, &place.popup);
        let label = self
            .profile
            .labels
            .then(|| layer.place_label(group, place.label_at, &place.label_text, &label_class));
        debug!("Created {} marker {} at {}", entity.category, entity.id, place.at);
        self.rendered.insert(RenderedMarkerPair {
            entity: entity.clone(),
            marker,
            label,
            at: place.at,
            label_visibility: LabelVisibility::Shown,
            debug: false,
        });
        true
    }

    fn destroy(&mut self, id: &str, layer: &mut dyn MapLayer) {
        if let Some(pair) = self.rendered.remove(id) {
            layer.remove_marker(pair.marker);
            if let Some(label) = pair.label {
                layer.remove_label(label);
            }
            debug!("Removed {} marker {}", pair.entity.category, id);
        }
    }
}
