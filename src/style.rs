//! Table-driven pin styling.
//!
//! | category | radius | fill        | label prefix |
//! |----------|--------|-------------|--------------|
//! | player   | 8      | `#b8bb28ff` | –            |
//! | admin    | 8      | `#f0540bff` | 🔨           |
//! | police   | 8      | `#1539daff` | ⭐           |
//! | npc      | 6      | `#00ff00`   | 🚌           |
//! | garage   | 4      | `#272885ff` | 🛠️           |

use crate::types::Category;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStyle {
    pub category: Category,
    pub radius: u32,
    pub color: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

pub const PIN_STYLES: [PinStyle; 5] = [
    PinStyle {
        category: Category::Player,
        radius: 8,
        color: "#b8bb28ff",
        prefix: "",
        suffix: "",
    },
    PinStyle {
        category: Category::Npc,
        radius: 6,
        color: "#00ff00",
        prefix: "🚌",
        suffix: "",
    },
    PinStyle {
        category: Category::Garage,
        radius: 4,
        color: "#272885ff",
        prefix: "🛠️",
        suffix: "",
    },
    PinStyle {
        category: Category::Police,
        radius: 8,
        color: "#1539daff",
        prefix: "⭐",
        suffix: "",
    },
    PinStyle {
        category: Category::Admin,
        radius: 8,
        color: "#f0540bff",
        prefix: "🔨 ",
        suffix: "",
    },
];

/// Look up the style row for a category; falls back to the player row.
pub fn pin_style(category: Category) -> &'static PinStyle {
    PIN_STYLES
        .iter()
        .find(|s| s.category == category)
        .unwrap_or(&PIN_STYLES[0])
}

/// Look up by feed tag (e.g. `"police"`). Unknown tags get the player row.
pub fn pin_style_for_tag(tag: &str) -> &'static PinStyle {
    pin_style(Category::from_tag(tag))
}

impl PinStyle {
    /// `prefix + name + suffix`, as shown in labels and panel rows.
    pub fn format_name(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }

    pub fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            radius: self.radius,
            fill_color: self.color.to_string(),
            ..MarkerStyle::default()
        }
    }

    /// CSS class of the floating label.
    pub fn label_class(&self) -> String {
        format!("{}-label", self.category.as_str())
    }
}

/// Full circle-marker style handed to the map layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub radius: u32,
    pub fill_color: String,
    pub border_color: String,
    pub weight: u32,
    pub opacity: f32,
    pub fill_opacity: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 8,
            fill_color: PIN_STYLES[0].color.to_string(),
            border_color: "#000000".into(),
            weight: 1,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_row() {
        for c in [
            Category::Player,
            Category::Npc,
            Category::Garage,
            Category::Admin,
            Category::Police,
        ] {
            assert_eq!(pin_style(c).category, c);
        }
    }

    #[test]
    fn radii_follow_table() {
        assert_eq!(pin_style(Category::Player).radius, 8);
        assert_eq!(pin_style(Category::Admin).radius, 8);
        assert_eq!(pin_style(Category::Police).radius, 8);
        assert_eq!(pin_style(Category::Npc).radius, 6);
        assert_eq!(pin_style(Category::Garage).radius, 4);
    }

    #[test]
    fn unknown_tag_uses_player_style() {
        let s = pin_style_for_tag("moderator");
        assert_eq!(s.category, Category::Player);
        assert_eq!(s.format_name("bob"), "bob");
    }

    #[test]
    fn prefixes_are_applied() {
        assert_eq!(pin_style(Category::Admin).format_name("root"), "🔨 root");
        assert_eq!(pin_style(Category::Police).format_name("cop"), "⭐cop");
        assert_eq!(pin_style(Category::Garage).label_class(), "garage-label");
    }

    #[test]
    fn marker_style_carries_fill_and_border() {
        let m = pin_style(Category::Npc).marker_style();
        assert_eq!(m.radius, 6);
        assert_eq!(m.fill_color, "#00ff00");
        assert_eq!(m.border_color, "#000000");
        assert!((m.fill_opacity - 0.8).abs() < f32::EPSILON);
    }
}
