use serde::{Serialize, Serializer};

use crate::color::{Color, Hsl};

/// Perceptual roles a swatch engine tags its output with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwatchRole {
    Vibrant,
    LightVibrant,
    DarkVibrant,
    Muted,
    LightMuted,
    DarkMuted,
}

impl SwatchRole {
    /// Roles in the order they are filled and listed.
    pub const ALL: [SwatchRole; 6] = [
        SwatchRole::Vibrant,
        SwatchRole::LightVibrant,
        SwatchRole::DarkVibrant,
        SwatchRole::Muted,
        SwatchRole::LightMuted,
        SwatchRole::DarkMuted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SwatchRole::Vibrant => "Vibrant",
            SwatchRole::LightVibrant => "LightVibrant",
            SwatchRole::DarkVibrant => "DarkVibrant",
            SwatchRole::Muted => "Muted",
            SwatchRole::LightMuted => "LightMuted",
            SwatchRole::DarkMuted => "DarkMuted",
        }
    }
}

impl std::fmt::Display for SwatchRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single representative color handed out by the swatch engine.
///
/// `hsl` is carried next to `color` rather than recomputed, since engines are
/// free to report an HSL that is not an exact round trip of the hex value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Swatch {
    pub name: String,
    #[serde(rename = "hex", serialize_with = "serialize_hex")]
    pub color: Color,
    pub hsl: Hsl,
    /// Number of sampled pixels that fell into this swatch's cluster.
    pub population: u32,
    #[serde(rename = "titleTextColor", serialize_with = "serialize_hex")]
    pub title_text_color: Color,
}

impl Swatch {
    /// Build a swatch whose HSL and title text color are derived from `color`.
    pub fn new(name: impl Into<String>, color: Color, population: u32) -> Self {
        Self {
            name: name.into(),
            color,
            hsl: color.to_hsl(),
            population,
            title_text_color: color.text_color(),
        }
    }

    /// Build a swatch from an engine-reported HSL triple.
    pub fn with_hsl(name: impl Into<String>, color: Color, hsl: Hsl, population: u32) -> Self {
        Self {
            name: name.into(),
            color,
            hsl,
            population,
            title_text_color: color.text_color(),
        }
    }

    pub fn hex(&self) -> String {
        self.color.to_hex()
    }
}

fn serialize_hex<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&color.to_hex())
}

/// Ordered mapping from role name to swatch.
///
/// Insertion order is preserved; inserting a name that already exists replaces
/// that entry in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SwatchSet {
    swatches: Vec<Swatch>,
}

impl SwatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize an array-like engine result into a named set.
    ///
    /// Entries are named by position (`"0"`, `"1"`, ...) so no role lookup
    /// will match and [`SwatchSet::primary`] falls back to the first entry.
    pub fn from_unnamed(colors: impl IntoIterator<Item = (Color, u32)>) -> Self {
        let mut set = Self::new();
        for (i, (color, population)) in colors.into_iter().enumerate() {
            set.insert(Swatch::new(i.to_string(), color, population));
        }
        set
    }

    pub fn insert(&mut self, swatch: Swatch) {
        match self.swatches.iter_mut().find(|s| s.name == swatch.name) {
            Some(existing) => *existing = swatch,
            None => self.swatches.push(swatch),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Swatch> {
        self.swatches.iter().find(|s| s.name == name)
    }

    pub fn role(&self, role: SwatchRole) -> Option<&Swatch> {
        self.get(role.as_str())
    }

    /// The swatch accents are derived from: "Vibrant" when present, otherwise
    /// the first swatch in the set.
    pub fn primary(&self) -> Option<&Swatch> {
        self.role(SwatchRole::Vibrant).or_else(|| self.swatches.first())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Swatch> {
        self.swatches.iter()
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
}

impl FromIterator<Swatch> for SwatchSet {
    fn from_iter<I: IntoIterator<Item = Swatch>>(iter: I) -> Self {
        let mut set = SwatchSet::new();
        for swatch in iter {
            set.insert(swatch);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swatch(name: &str, hex: &str) -> Swatch {
        Swatch::new(name, Color::from_hex(hex).unwrap(), 10)
    }

    #[test]
    fn primary_prefers_vibrant() {
        let set: SwatchSet = [
            swatch("Muted", "#808080"),
            swatch("Vibrant", "#3366cc"),
            swatch("DarkVibrant", "#112244"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.primary().unwrap().name, "Vibrant");
    }

    #[test]
    fn primary_falls_back_to_first() {
        let set: SwatchSet = [swatch("LightMuted", "#dddddd"), swatch("Muted", "#808080")]
            .into_iter()
            .collect();
        assert_eq!(set.primary().unwrap().name, "LightMuted");
    }

    #[test]
    fn primary_of_empty_set_is_none() {
        assert!(SwatchSet::new().primary().is_none());
    }

    #[test]
    fn unnamed_set_uses_positional_names() {
        let set = SwatchSet::from_unnamed([
            (Color::new(10, 20, 30), 5),
            (Color::new(200, 100, 50), 3),
        ]);
        let names: Vec<&str> = set.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["0", "1"]);
        assert_eq!(set.primary().unwrap().hex(), "#0a141e");
    }

    #[test]
    fn insert_replaces_same_name_in_place() {
        let mut set = SwatchSet::new();
        set.insert(swatch("Vibrant", "#3366cc"));
        set.insert(swatch("Muted", "#808080"));
        set.insert(swatch("Vibrant", "#cc3366"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().hex(), "#cc3366");
    }

    #[test]
    fn serializes_hex_and_title_text() {
        let set: SwatchSet = [swatch("Vibrant", "#3366CC")].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["name"], "Vibrant");
        assert_eq!(json[0]["hex"], "#3366cc");
        assert_eq!(json[0]["titleTextColor"], "#ffffff");
    }
}
