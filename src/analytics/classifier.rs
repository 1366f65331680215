use serde::{Deserialize, Serialize};

use super::motion::{BoundingBox, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Person,
    Child,
    Animal,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Person => "person",
            Label::Child => "child",
            Label::Animal => "animal",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guard of the rule table: minimum area plus an inclusive aspect ratio band.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassRule {
    pub label: Label,
    pub min_area: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
}

impl ClassRule {
    pub const fn new(label: Label, min_area: f64, min_aspect: f64, max_aspect: f64) -> Self {
        Self {
            label,
            min_area,
            min_aspect,
            max_aspect,
        }
    }

    pub fn matches(&self, area: f64, aspect_ratio: f64) -> bool {
        area >= self.min_area && (self.min_aspect..=self.max_aspect).contains(&aspect_ratio)
    }
}

const DEFAULT_RULES: [ClassRule; 3] = [
    ClassRule::new(Label::Person, 500.0, 1.5, 3.5),
    ClassRule::new(Label::Child, 200.0, 1.0, 2.0),
    ClassRule::new(Label::Animal, 300.0, 0.5, 1.5),
];

/// A labeled region, ready for counting and overlay drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: Label,
    pub bbox: BoundingBox,
    pub area: f64,
}

/// Ordered rule table; the first matching rule decides the label.
pub struct RegionClassifier {
    rules: Vec<ClassRule>,
}

impl RegionClassifier {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    pub fn with_rules(rules: Vec<ClassRule>) -> Self {
        Self { rules }
    }

    pub fn label_for(&self, area: f64, aspect_ratio: Option<f64>) -> Option<Label> {
        let ratio = aspect_ratio.filter(|r| r.is_finite())?;
        self.rules
            .iter()
            .find(|rule| rule.matches(area, ratio))
            .map(|rule| rule.label)
    }

    pub fn classify(&self, region: &Region) -> Option<Classification> {
        let label = self.label_for(region.area, region.aspect_ratio())?;
        Some(Classification {
            label,
            bbox: region.bbox,
            area: region.area,
        })
    }
}

impl Default for RegionClassifier {
    fn default() -> Self {
        Self::new()
    }
}
