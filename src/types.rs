//! Core live-map types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

/// A point in raw game world-space, before any mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `(0, 0)` is what the feed reports for an entity with no position yet.
    pub fn is_unset(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl std::fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// A point in the display layer's `(lat, lng)` convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapPoint {
    pub lat: f64,
    pub lng: f64,
}

impl MapPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.lat, self.lng)
    }
}

// ---------------------------------------------------------------------------
// World bounds
// ---------------------------------------------------------------------------

/// Fixed axis-aligned rectangle of valid raw coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorldBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(-1_280_000.0, -320_000.0, 920_000.0, 1_880_000.0)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// What kind of thing an entity is.
///
/// `Admin` and `Police` are sub-kinds of player: they share the player
/// Rendered Set and overlay group, and only differ in style.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Player,
    Npc,
    Garage,
    Admin,
    Police,
}

/// The three independently polled and rendered sets.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Players,
    Npcs,
    Garages,
}

impl Category {
    /// Parse a feed-supplied type tag. Unknown tags map to `Player`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "npc" => Category::Npc,
            "garage" => Category::Garage,
            "admin" => Category::Admin,
            "police" => Category::Police,
            _ => Category::Player,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Player => "player",
            Category::Npc => "npc",
            Category::Garage => "garage",
            Category::Admin => "admin",
            Category::Police => "police",
        }
    }

    pub fn group(&self) -> CategoryGroup {
        match self {
            Category::Player | Category::Admin | Category::Police => CategoryGroup::Players,
            Category::Npc => CategoryGroup::Npcs,
            Category::Garage => CategoryGroup::Garages,
        }
    }

    pub fn is_player_kind(&self) -> bool {
        self.group() == CategoryGroup::Players
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CategoryGroup {
    pub const ALL: [CategoryGroup; 3] = [
        CategoryGroup::Players,
        CategoryGroup::Npcs,
        CategoryGroup::Garages,
    ];

    /// Endpoint path polled for this group.
    pub fn endpoint(&self) -> &'static str {
        match self {
            CategoryGroup::Players => "/playerlocations",
            CategoryGroup::Npcs => "/npcs",
            CategoryGroup::Garages => "/garages",
        }
    }

    /// Style used for entities of this group that carry no sub-kind.
    pub fn base_category(&self) -> Category {
        match self {
            CategoryGroup::Players => Category::Player,
            CategoryGroup::Npcs => Category::Npc,
            CategoryGroup::Garages => Category::Garage,
        }
    }
}

impl std::fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CategoryGroup::Players => "players",
            CategoryGroup::Npcs => "npcs",
            CategoryGroup::Garages => "garages",
        };
        f.write_str(name)
    }
}

/// Vehicle value the feed uses for "on foot".
pub const NO_VEHICLE: &str = "None";

/// One tracked object at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: String,
    pub category: Category,
    /// Raw world-space position.
    pub position: WorldPoint,
    pub display_name: Option<String>,
    pub vehicle: Option<String>,
    pub speed_kmh: Option<f64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, category: Category, position: WorldPoint) -> Self {
        Self {
            id: id.into(),
            category,
            position,
            display_name: None,
            vehicle: None,
            speed_kmh: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.vehicle = Some(vehicle.into());
        self
    }

    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = Some(speed_kmh);
        self
    }

    /// Display name, falling back to the raw id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// The current vehicle, unless absent or the "None" sentinel.
    pub fn active_vehicle(&self) -> Option<&str> {
        self.vehicle
            .as_deref()
            .filter(|v| !v.is_empty() && *v != NO_VEHICLE)
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveMapStats {
    pub players: usize,
    pub npcs: usize,
    pub garages: usize,
    pub passes_applied: u64,
    pub failed_polls: u64,
    pub paused_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveMapConfig {
    /// Root URL of the snapshot endpoints.
    pub base_url: String,
    /// Player position poll interval.
    pub player_interval_ms: u64,
    /// NPC poll interval.
    pub npc_interval_ms: u64,
    /// Garage poll interval.
    pub garage_interval_ms: u64,
    /// NPC polling is off unless enabled; its Rendered Set stays live either way.
    pub npcs_enabled: bool,
    /// Initial state of the run/pause toggle for player positions.
    pub start_paused: bool,
    /// Per-request HTTP timeout.
    pub request_timeout_ms: u64,
    /// Labels sit this many raw world units below their marker.
    pub label_offset: f64,
    /// List debug-flagged ids in the player panel.
    pub debug_mode: bool,
    pub bounds: WorldBounds,
}

impl Default for LiveMapConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            player_interval_ms: 400,
            npc_interval_ms: 5_000,
            garage_interval_ms: 20_000,
            npcs_enabled: false,
            start_paused: false,
            request_timeout_ms: 2_000,
            label_offset: 10_000.0,
            debug_mode: false,
            bounds: WorldBounds::default(),
        }
    }
}
