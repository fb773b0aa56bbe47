//! Section identity, static group layouts and per-mount registries
//!
//! A group declares its sections once, at composition time, as a
//! [`GroupLayout`]. When the group's gating prerequisite becomes true the
//! layout is frozen into a [`SectionRegistry`] for the lifetime of that mount.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Closed set of section identifiers known at composition time
///
/// Implemented automatically for any small `Copy` enum with a `Display`
/// (wire form) and `FromStr` (parse from the wire form).
pub trait SectionKey: Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static {}

impl<T> SectionKey for T where T: Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static {}

/// Per-section render state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionState {
    /// Lightweight placeholder is rendered
    Skeleton,
    /// Real content is mounted (terminal)
    Active,
}

/// Handle to the viewport region a section renders into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor(String);

impl Anchor {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named sub-region of a group's content area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<K> {
    pub id: K,
    /// `None` while the region is not mounted; scroll requests are absorbed
    pub anchor: Option<Anchor>,
    pub order: u32,
}

impl<K: SectionKey> Section<K> {
    /// Section anchored at a region named after its id
    pub fn new(id: K, order: u32) -> Self {
        Self {
            id,
            anchor: Some(Anchor::new(id.to_string())),
            order,
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn without_anchor(mut self) -> Self {
        self.anchor = None;
        self
    }
}

/// Static declaration of a group: its name, sections and initial seed set
#[derive(Debug, Clone)]
pub struct GroupLayout<K> {
    pub name: String,
    pub sections: Vec<Section<K>>,
    /// Sections active from the moment the group is revealed.
    /// Empty means "the first section".
    pub seed: Vec<K>,
}

impl<K: SectionKey> GroupLayout<K> {
    /// Layout with sections ordered as given and anchors named after their ids
    pub fn new(name: impl Into<String>, ids: impl IntoIterator<Item = K>) -> Self {
        let sections = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Section::new(id, i as u32))
            .collect();
        Self {
            name: name.into(),
            sections,
            seed: Vec::new(),
        }
    }

    pub fn from_sections(name: impl Into<String>, sections: Vec<Section<K>>) -> Self {
        Self {
            name: name.into(),
            sections,
            seed: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: impl IntoIterator<Item = K>) -> Self {
        self.seed = seed.into_iter().collect();
        self
    }

    /// Freeze the layout into a registry
    pub fn registry(&self) -> SectionRegistry<K> {
        SectionRegistry::from_sections(&self.sections)
    }

    /// The seed set, defaulting to the first section in registry order
    pub fn seed_set(&self) -> Vec<K> {
        if !self.seed.is_empty() {
            return self.seed.clone();
        }
        self.registry().first().into_iter().collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.sections.iter().find(|s| !seen.insert(s.id)) {
            return Err(ConfigError::DuplicateSection {
                section: dup.id.to_string(),
                first: self.name.clone(),
                second: self.name.clone(),
            });
        }

        let registry = self.registry();
        if let Some(stray) = self.seed.iter().find(|id| !registry.contains(**id)) {
            return Err(ConfigError::SeedOutsideGroup {
                section: stray.to_string(),
                group: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Ordered, immutable sequence of a group's sections for one mount
#[derive(Debug, Clone)]
pub struct SectionRegistry<K> {
    sections: Vec<Section<K>>,
    index: HashMap<K, usize>,
}

impl<K: SectionKey> SectionRegistry<K> {
    /// Registry of a group whose gating prerequisite is still false
    pub fn empty() -> Self {
        Self {
            sections: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build from declarations, ordered by `order` then declaration order.
    /// A repeated id keeps its first declaration.
    pub fn from_sections(declared: &[Section<K>]) -> Self {
        let mut sections: Vec<Section<K>> = Vec::with_capacity(declared.len());
        for section in declared {
            if sections.iter().any(|s| s.id == section.id) {
                debug!(id = %section.id, "SectionRegistry::from_sections: duplicate id skipped");
                continue;
            }
            sections.push(section.clone());
        }
        sections.sort_by_key(|s| s.order);

        let index = sections.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        Self { sections, index }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn first(&self) -> Option<K> {
        self.sections.first().map(|s| s.id)
    }

    pub fn contains(&self, id: K) -> bool {
        self.index.contains_key(&id)
    }

    /// Position in registry order
    pub fn position(&self, id: K) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn anchor(&self, id: K) -> Option<&Anchor> {
        self.index.get(&id).and_then(|&i| self.sections[i].anchor.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = K> + '_ {
        self.sections.iter().map(|s| s.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section<K>> {
        self.sections.iter()
    }
}

impl<K: SectionKey> Default for SectionRegistry<K> {
    fn default() -> Self {
        Self::empty()
    }
}
