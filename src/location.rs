//! Symbolic locations and the poses they resolve to.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 6-DoF tool pose.
///
/// Position is in millimeters, orientation is an Euler triple `(rx, ry, rz)` in degrees,
/// matching the `posx` convention of most industrial controllers. Serialized as a flat
/// `[x, y, z, rx, ry, rz]` array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 6]", into = "[f32; 6]")]
pub struct Pose {
    /// Cartesian position of the tool center point.
    pub position: Vec3,
    /// Euler orientation in degrees.
    pub orientation: Vec3,
}

impl Pose {
    pub fn new(x: f32, y: f32, z: f32, rx: f32, ry: f32, rz: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            orientation: Vec3::new(rx, ry, rz),
        }
    }

    /// Returns this pose shifted along world `+Z` by `dz`, orientation unchanged.
    pub fn raised(&self, dz: f32) -> Self {
        Self {
            position: self.position + Vec3::Z * dz,
            orientation: self.orientation,
        }
    }

    pub fn to_array(&self) -> [f32; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.orientation.x,
            self.orientation.y,
            self.orientation.z,
        ]
    }

    /// True when every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl From<[f32; 6]> for Pose {
    fn from(v: [f32; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl From<Pose> for [f32; 6] {
    fn from(pose: Pose) -> Self {
        pose.to_array()
    }
}

/// Lookup table from location name to [`Pose`].
///
/// Names are normalized (trimmed, lowercased) on insert and on lookup, so two names that
/// differ only by case always refer to the same entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Pose>", into = "BTreeMap<String, Pose>")]
pub struct LocationMap {
    entries: BTreeMap<String, Pose>,
}

impl LocationMap {
    /// An empty map with no named locations.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: a home pose, two generic waypoints `a`/`b`, and two cell stations.
    pub fn builtin() -> Self {
        let mut map = Self::new();
        map.insert("home", Pose::new(300.0, 0.0, 500.0, 180.0, 0.0, 180.0));
        map.insert("a", Pose::new(400.0, -200.0, 100.0, 180.0, 0.0, 180.0));
        map.insert("b", Pose::new(400.0, 200.0, 100.0, 180.0, 0.0, 180.0));
        map.insert("conveyor", Pose::new(600.0, -350.0, 150.0, 180.0, 0.0, 90.0));
        map.insert("pallet", Pose::new(550.0, 350.0, 50.0, 180.0, 0.0, 180.0));
        map
    }

    /// Inserts or replaces the pose stored under `name`.
    pub fn insert(&mut self, name: &str, pose: Pose) -> Option<Pose> {
        self.entries.insert(normalize_name(name), pose)
    }

    /// Overlays every entry of `overrides` onto this map (builder pattern).
    pub fn with_overrides(mut self, overrides: &LocationMap) -> Self {
        for (name, pose) in &overrides.entries {
            self.entries.insert(name.clone(), *pose);
        }
        self
    }

    /// Resolves a symbolic name to its pose. Pure: the same name always yields the same pose.
    pub fn resolve(&self, name: &str) -> Option<Pose> {
        self.entries.get(&normalize_name(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pose)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<BTreeMap<String, Pose>> for LocationMap {
    fn from(raw: BTreeMap<String, Pose>) -> Self {
        let mut map = Self::new();
        for (name, pose) in raw {
            map.insert(&name, pose);
        }
        map
    }
}

impl From<LocationMap> for BTreeMap<String, Pose> {
    fn from(map: LocationMap) -> Self {
        map.entries
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
