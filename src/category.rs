//! Colour categories shared by convoys, occupants, and blockers.
//!
//! A category selects the visual tint of an entity and gates which occupant a
//! convoy's seats accept.

use bevy::prelude::*;
use serde::Deserialize;

/// Closed set of colour categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect, Deserialize)]
pub enum Category {
    /// Purple passengers and convoys.
    Purple,
    /// Orange passengers and convoys.
    Orange,
    /// Blue passengers and convoys.
    Blue,
    /// Red passengers and convoys.
    Red,
    /// Green passengers and convoys.
    Green,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 5] = [
        Category::Purple,
        Category::Orange,
        Category::Blue,
        Category::Red,
        Category::Green,
    ];

    /// Base colour used for this category's material.
    pub fn color(self) -> Color {
        match self {
            Category::Purple => Color::srgb(0.55, 0.25, 0.85),
            Category::Orange => Color::srgb(0.95, 0.55, 0.1),
            Category::Blue => Color::srgb(0.2, 0.45, 0.95),
            Category::Red => Color::srgb(0.9, 0.15, 0.15),
            Category::Green => Color::srgb(0.2, 0.8, 0.3),
        }
    }
}

/// Why an entity occupies space for the move safety check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum BlockerTag {
    /// Static level obstacle.
    Obstacle,
    /// Something wearing a colour category (a convoy segment or a waiting occupant).
    Colored(Category),
}

/// Spatial footprint that other convoys' moves are checked against.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct Blocker {
    /// What kind of blocker this is.
    pub tag: BlockerTag,
    /// Radius of the blocking sphere in world units.
    pub radius: f32,
    /// Layer bits; a query only sees blockers sharing at least one bit with its mask.
    pub layers: u32,
}

impl Blocker {
    /// Default layer every blocker lives on unless configured otherwise.
    pub const DEFAULT_LAYER: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_distinct() {
        for (i, a) in Category::ALL.iter().enumerate() {
            for b in &Category::ALL[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(a.color(), b.color());
            }
        }
    }

    #[test]
    fn category_parses_from_ron() {
        let c: Category = ron::de::from_str("Blue").unwrap();
        assert_eq!(c, Category::Blue);
    }
}
