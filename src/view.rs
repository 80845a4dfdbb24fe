//! Derived views of the player Rendered Set: summary counters, the filterable
//! side panel, and the map viewport that panel clicks recenter.
//!
//! Everything here reads the rendered set; nothing writes back to it. A
//! search query only decides which rows are listed.

use crate::engine::RenderedSet;
use crate::style::pin_style;
use crate::types::{Category, Entity, MapPoint};
use serde::Serialize;

pub const VEHICLE_WIKI_BASE: &str = "https://motortown.fandom.com/wiki/";

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub total_admins: usize,
    pub total_police: usize,
}

pub fn build_summary<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Summary {
    entities
        .into_iter()
        .fold(Summary::default(), |mut s, e| {
            s.total += 1;
            match e.category {
                Category::Admin => s.total_admins += 1,
                Category::Police => s.total_police += 1,
                _ => {}
            }
            s
        })
}

// ---------------------------------------------------------------------------
// Panel rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRow {
    pub id: String,
    /// Display name with its category glyph.
    pub name: String,
    pub color: String,
    pub vehicle: Option<VehicleLink>,
    /// Whole km/h, only while in a vehicle.
    pub speed_kmh: Option<i64>,
    pub x: i64,
    pub y: i64,
}

impl PanelRow {
    pub fn from_entity(entity: &Entity) -> Self {
        let style = pin_style(entity.category);
        let vehicle = entity.active_vehicle().and_then(|v| {
            vehicle_wiki_url(v).map(|url| VehicleLink {
                name: v.to_string(),
                url,
            })
        });
        let speed_kmh = entity
            .active_vehicle()
            .map(|_| entity.speed_kmh.unwrap_or(0.0).floor() as i64);
        Self {
            id: entity.id.clone(),
            name: style.format_name(entity.name()),
            color: style.color.to_string(),
            vehicle,
            speed_kmh,
            x: entity.position.x.trunc() as i64,
            y: entity.position.y.trunc() as i64,
        }
    }

    pub fn coords_text(&self) -> String {
        format!("[{}, {}]", self.x, self.y)
    }

    pub fn speed_text(&self) -> Option<String> {
        self.speed_kmh.map(|s| format!("Speed: {s} km/h"))
    }
}

/// Wiki page for a vehicle: trimmed, whitespace runs collapsed to `_`.
pub fn vehicle_wiki_url(vehicle: &str) -> Option<String> {
    let slug = vehicle.split_whitespace().collect::<Vec<_>>().join("_");
    if slug.is_empty() {
        return None;
    }
    Some(format!("{VEHICLE_WIKI_BASE}{slug}"))
}

/// Case-insensitive substring match on the display name (or id). The query
/// is used as typed; surrounding whitespace is part of it.
pub fn matches_query(entity: &Entity, query: &str) -> bool {
    query.is_empty() || entity.name().to_lowercase().contains(&query.to_lowercase())
}

pub fn build_panel<'a>(entities: impl IntoIterator<Item = &'a Entity>, query: &str) -> Vec<PanelRow> {
    entities
        .into_iter()
        .filter(|e| matches_query(e, query))
        .map(PanelRow::from_entity)
        .collect()
}

// ---------------------------------------------------------------------------
// Incremental panel list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelChange {
    Inserted(String),
    Updated(String),
    Removed(String),
}

/// The panel's visible rows, reconciled by id rather than rebuilt.
///
/// Row order always follows the rendered set's first-sighting order.
#[derive(Debug, Default)]
pub struct PanelList {
    rows: Vec<PanelRow>,
}

impl PanelList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&PanelRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Diff `next` against the current rows by id. `next` must already be in
    /// rendered-set order; the list takes that order as-is.
    pub fn apply(&mut self, next: Vec<PanelRow>) -> Vec<PanelChange> {
        let mut changes: Vec<PanelChange> = self
            .rows
            .iter()
            .filter(|row| !next.iter().any(|n| n.id == row.id))
            .map(|row| PanelChange::Removed(row.id.clone()))
            .collect();

        for row in &next {
            match self.get(&row.id) {
                Some(existing) if existing != row => {
                    changes.push(PanelChange::Updated(row.id.clone()))
                }
                Some(_) => {}
                None => changes.push(PanelChange::Inserted(row.id.clone())),
            }
        }

        self.rows = next;
        changes
    }
}

// ---------------------------------------------------------------------------
// Player panel
// ---------------------------------------------------------------------------

/// Summary counters + filtered list, rebuilt from the player Rendered Set.
#[derive(Debug, Default)]
pub struct PlayerPanel {
    query: String,
    list: PanelList,
    summary: Summary,
    show_debug: bool,
}

impl PlayerPanel {
    pub fn new(show_debug: bool) -> Self {
        Self {
            show_debug,
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn rows(&self) -> &[PanelRow] {
        self.list.rows()
    }

    pub fn row(&self, id: &str) -> Option<&PanelRow> {
        self.list.get(id)
    }

    /// Recompute counters and rows from the current rendered set.
    pub fn refresh(&mut self, rendered: &RenderedSet) -> Vec<PanelChange> {
        self.summary = build_summary(rendered.entities());
        let listed = rendered
            .iter()
            .filter(|p| self.show_debug || !p.debug)
            .map(|p| &p.entity);
        let rows = build_panel(listed, &self.query);
        self.list.apply(rows)
    }

    pub fn set_query(&mut self, query: &str, rendered: &RenderedSet) -> Vec<PanelChange> {
        self.query = query.to_string();
        self.refresh(rendered)
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapViewport {
    pub center: MapPoint,
    pub zoom: u8,
}

impl MapViewport {
    pub fn new(center: MapPoint, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Move the view without touching zoom.
    pub fn center_on(&mut self, at: MapPoint) {
        self.center = at;
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

impl Default for MapViewport {
    fn default() -> Self {
        Self::new(MapPoint::new(0.0, 0.0), 2)
    }
}
