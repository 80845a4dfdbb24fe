//! Snapshot wire format.
//!
//! Every polled endpoint answers with the same envelope:
//!
//! ```json
//! { "status": "ok", "players": [ ... ] }   // /playerlocations
//! { "status": "ok", "data":    [ ... ] }   // /npcs, /garages
//! ```
//!
//! ## Decoding rules
//!
//! 1. `status` must be exactly `"ok"`; anything else is [`SnapshotError::Status`].
//! 2. The list is read from `players`, then `data`. Neither present is
//!    [`SnapshotError::MissingList`].
//! 3. A record that fails to decode is dropped with a warning; the rest of
//!    the snapshot still applies.
//! 4. Records keep raw world coordinates. Zero/out-of-bounds filtering is the
//!    engine's job, not the decoder's.

use crate::identity;
use crate::types::{Category, CategoryGroup, Entity, WorldPoint, NO_VEHICLE};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("snapshot status was {0:?}, expected \"ok\"")]
    Status(Option<String>),
    #[error("snapshot has no `players` or `data` list")]
    MissingList,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

pub const STATUS_OK: &str = "ok";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "X", default)]
    pub x: f64,
    #[serde(rename = "Y", default)]
    pub y: f64,
    #[serde(rename = "Z", default)]
    pub z: f64,
}

/// One player as sent by `/playerlocations`.
///
/// Positions are accepted flat (`X`/`Y`) or nested under `Location`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(rename = "UniqueID", default)]
    pub unique_id: Option<Value>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "X", default)]
    pub x: Option<f64>,
    #[serde(rename = "Y", default)]
    pub y: Option<f64>,
    #[serde(rename = "Location", default)]
    pub location: Option<Location>,
    #[serde(rename = "SpeedKMH", default)]
    pub speed_kmh: Option<f64>,
    #[serde(rename = "VehicleKey", alias = "Vehicle", default)]
    pub vehicle_key: Option<String>,
    #[serde(rename = "PlayerType", default)]
    pub player_type: Option<String>,
    #[serde(rename = "bIsAdmin", default)]
    pub is_admin: Option<bool>,
}

/// NPCs and garages only carry a position, and sometimes an id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(rename = "Id", alias = "UniqueID", default)]
    pub id: Option<Value>,
    #[serde(rename = "X", default)]
    pub x: Option<f64>,
    #[serde(rename = "Y", default)]
    pub y: Option<f64>,
}

impl PlayerRecord {
    fn position(&self) -> WorldPoint {
        match (self.x, self.y, self.location) {
            (Some(x), Some(y), _) => WorldPoint::new(x, y),
            (_, _, Some(loc)) => WorldPoint::new(loc.x, loc.y),
            (x, y, None) => WorldPoint::new(x.unwrap_or(0.0), y.unwrap_or(0.0)),
        }
    }

    fn category(&self) -> Category {
        let category = match (&self.player_type, self.is_admin) {
            (Some(tag), _) => Category::from_tag(tag),
            (None, Some(true)) => Category::Admin,
            _ => Category::Player,
        };
        if category.is_player_kind() {
            category
        } else {
            Category::Player
        }
    }

    pub fn into_entity(self) -> Entity {
        let position = self.position();
        let category = self.category();
        let name = self
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let id = self
            .unique_id
            .as_ref()
            .and_then(id_text)
            .unwrap_or_else(|| name.clone());

        Entity {
            id,
            category,
            position,
            display_name: Some(self.display_name.unwrap_or(name)),
            vehicle: Some(self.vehicle_key.unwrap_or_else(|| NO_VEHICLE.to_string())),
            speed_kmh: Some(self.speed_kmh.unwrap_or(0.0)),
        }
    }
}

impl PointRecord {
    fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }

    /// NPCs without an explicit id are keyed by list position.
    pub fn into_npc(self, index: usize) -> Entity {
        let id = self
            .id
            .as_ref()
            .and_then(id_text)
            .unwrap_or_else(|| format!("npc_{index}"));
        Entity::new(id, Category::Npc, self.position())
    }

    pub fn into_garage(self) -> Entity {
        let position = self.position();
        let natural = self.id.as_ref().and_then(id_text);
        let id = identity::derive_key(
            Category::Garage,
            natural.as_deref(),
            Some(position.x),
            Some(position.y),
        )
        .unwrap_or_else(|| identity::coordinate_key(position.x, position.y));
        Entity::new(id, Category::Garage, position)
    }
}

fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One decoded, unordered list of entities for a category group.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub group: CategoryGroup,
    pub entities: Vec<Entity>,
}

impl Snapshot {
    pub fn new(group: CategoryGroup, entities: Vec<Entity>) -> Self {
        Self { group, entities }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Decode a raw response body for `group`.
pub fn decode_snapshot(group: CategoryGroup, body: &[u8]) -> Result<Snapshot, SnapshotError> {
    let envelope: SnapshotEnvelope = serde_json::from_slice(body)?;
    decode_envelope(group, envelope)
}

pub fn decode_envelope(
    group: CategoryGroup,
    envelope: SnapshotEnvelope,
) -> Result<Snapshot, SnapshotError> {
    if envelope.status.as_deref() != Some(STATUS_OK) {
        return Err(SnapshotError::Status(envelope.status));
    }
    let records = envelope
        .players
        .or(envelope.data)
        .ok_or(SnapshotError::MissingList)?;

    let mut entities = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let entity = match group {
            CategoryGroup::Players => {
                serde_json::from_value::<PlayerRecord>(record).map(PlayerRecord::into_entity)
            }
            CategoryGroup::Npcs => {
                serde_json::from_value::<PointRecord>(record).map(|r| r.into_npc(index))
            }
            CategoryGroup::Garages => {
                serde_json::from_value::<PointRecord>(record).map(PointRecord::into_garage)
            }
        };
        match entity {
            Ok(e) => entities.push(e),
            Err(e) => warn!("Dropping undecodable {group} record #{index}: {e}"),
        }
    }

    Ok(Snapshot::new(group, entities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_flat_player_records() {
        let body = br#"{"status":"ok","players":[
            {"Name":"Alice","X":0,"Y":100000,"SpeedKMH":50,"VehicleKey":"Truck A"},
            {"Name":"Bob","X":5,"Y":6,"PlayerType":"police"}
        ]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        assert_eq!(snap.len(), 2);

        let alice = &snap.entities[0];
        assert_eq!(alice.id, "Alice");
        assert_eq!(alice.position, WorldPoint::new(0.0, 100_000.0));
        assert_eq!(alice.speed_kmh, Some(50.0));
        assert_eq!(alice.active_vehicle(), Some("Truck A"));

        let bob = &snap.entities[1];
        assert_eq!(bob.category, Category::Police);
        assert_eq!(bob.vehicle.as_deref(), Some(NO_VEHICLE));
        assert_eq!(bob.active_vehicle(), None);
    }

    #[test]
    fn decodes_nested_location_and_admin_flag() {
        let body = br#"{"status":"ok","data":[
            {"UniqueID":"7656","Name":"Root","bIsAdmin":true,
             "Location":{"X":10.5,"Y":-20.0,"Z":3.0}}
        ]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        let e = &snap.entities[0];
        assert_eq!(e.id, "7656");
        assert_eq!(e.name(), "Root");
        assert_eq!(e.category, Category::Admin);
        assert_eq!(e.position, WorldPoint::new(10.5, -20.0));
    }

    #[test]
    fn unique_id_wins_over_name() {
        let body = br#"{"status":"ok","players":[
            {"UniqueID":7656,"Name":"Alice","X":1,"Y":2},
            {"UniqueID":"","Name":"Bob","X":3,"Y":4}
        ]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        let ids: Vec<_> = snap.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["7656", "Bob"]);
        assert_eq!(snap.entities[0].name(), "Alice");
    }

    #[test]
    fn missing_player_name_becomes_unknown() {
        let body = br#"{"status":"ok","players":[{"X":1,"Y":2}]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        assert_eq!(snap.entities[0].id, "Unknown");
    }

    #[test]
    fn non_player_type_in_player_feed_is_player() {
        let body = br#"{"status":"ok","players":[{"Name":"x","X":1,"Y":2,"PlayerType":"garage"}]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        assert_eq!(snap.entities[0].category, Category::Player);
    }

    #[test]
    fn garages_are_keyed_by_coordinates() {
        let body = br#"{"status":"ok","data":[{"X":12345,"Y":67890}]}"#;
        let snap = decode_snapshot(CategoryGroup::Garages, body).unwrap();
        assert_eq!(snap.entities[0].id, "d835");
        assert_eq!(snap.entities[0].category, Category::Garage);
    }

    #[test]
    fn npcs_are_keyed_by_index() {
        let body = br#"{"status":"ok","data":[{"X":0,"Y":0},{"X":1,"Y":2},{"Id":"bus-4","X":3,"Y":4}]}"#;
        let snap = decode_snapshot(CategoryGroup::Npcs, body).unwrap();
        let ids: Vec<_> = snap.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["npc_0", "npc_1", "bus-4"]);
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let body = br#"{"status":"initializing"}"#;
        match decode_snapshot(CategoryGroup::Players, body) {
            Err(SnapshotError::Status(Some(s))) => assert_eq!(s, "initializing"),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn missing_list_is_an_error() {
        let body = br#"{"status":"ok"}"#;
        assert!(matches!(
            decode_snapshot(CategoryGroup::Garages, body),
            Err(SnapshotError::MissingList)
        ));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            decode_snapshot(CategoryGroup::Players, b"<html>"),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn bad_record_is_dropped_not_fatal() {
        let body = br#"{"status":"ok","players":[{"Name":"ok","X":1,"Y":1},{"Name":42}]}"#;
        let snap = decode_snapshot(CategoryGroup::Players, body).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.entities[0].id, "ok");
    }
}
