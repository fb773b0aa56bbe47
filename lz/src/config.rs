//! Page configuration
//!
//! Describes which groups sit on the page, how each is tuned, and the script
//! the `lz simulate` command plays against them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{GroupId, SectionId};
use crate::coordinator::GroupConfig;
use crate::error::ConfigError;
use crate::section::{GroupLayout, Section};

/// Main page configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Page URL, including any `section` deep link
    pub url: String,

    /// Viewport height in pixels
    #[serde(rename = "viewport-height")]
    pub viewport_height: f64,

    /// Interval between viewport observations while the script waits
    #[serde(rename = "frame-ms")]
    pub frame_ms: u64,

    /// Whether the viewport can report anchor positions at all
    pub observation: bool,

    /// Event bus capacity
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,

    /// Groups top to bottom
    pub groups: Vec<GroupEntry>,

    /// Steps played by the simulation
    pub script: Vec<ScriptStep>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url: "https://aims.example/activities/1/edit?tab=edit".to_string(),
            viewport_height: 900.0,
            frame_ms: 50,
            observation: true,
            event_capacity: 1024,
            groups: GroupId::ALL.into_iter().map(GroupEntry::new).collect(),
            script: default_script(),
        }
    }
}

/// Scroll down through the overview, then jump to the finances
fn default_script() -> Vec<ScriptStep> {
    vec![
        ScriptStep::wait(500),
        ScriptStep::scroll_to(1100.0),
        ScriptStep::wait(800),
        ScriptStep::jump("transactions"),
        ScriptStep::wait(2000),
        ScriptStep::scroll_to(2400.0),
        ScriptStep::wait(5000),
    ]
}

impl PageConfig {
    /// Validate the composition of the page and every script step
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!(groups = self.groups.len(), steps = self.script.len(), "PageConfig::validate: called");
        if !self.viewport_height.is_finite() || self.viewport_height <= 0.0 {
            return Err(ConfigError::InvalidViewportHeight {
                value: self.viewport_height,
            });
        }
        if self.frame_ms == 0 {
            return Err(ConfigError::ZeroFrameInterval);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroChannelBuffer);
        }

        let mut owners: HashMap<SectionId, GroupId> = HashMap::new();
        for entry in &self.groups {
            entry.validate()?;
            for (id, _) in entry.placements() {
                if let Some(first) = owners.insert(id, entry.group) {
                    return Err(ConfigError::DuplicateSection {
                        section: id.to_string(),
                        first: first.to_string(),
                        second: entry.group.to_string(),
                    });
                }
            }
        }

        self.steps().map(|_| ())
    }

    /// Resolve the script into typed steps
    pub fn steps(&self) -> Result<Vec<Step>, ConfigError> {
        self.script
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let resolved = step.resolve(index)?;
                if let Step::Gate { group, .. } = resolved
                    && !self.groups.iter().any(|g| g.group == group)
                {
                    return Err(ConfigError::UnknownScriptGroup {
                        index,
                        group: group.to_string(),
                    });
                }
                Ok(resolved)
            })
            .collect()
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .lazysection.yml
        let local_config = PathBuf::from(".lazysection.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/lazysection/lazysection.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lazysection").join("lazysection.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// One group on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub group: GroupId,

    /// Initial value of the gating prerequisite
    #[serde(rename = "gate-open", default = "default_true")]
    pub gate_open: bool,

    /// Section override; the catalog layout when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionEntry>>,

    /// Seed set; the first section when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed: Vec<SectionId>,

    /// Tunables; the catalog defaults for the group when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunables: Option<GroupConfig>,
}

fn default_true() -> bool {
    true
}

impl GroupEntry {
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            gate_open: true,
            sections: None,
            seed: Vec::new(),
            tunables: None,
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate_open = false;
        self
    }

    pub fn with_tunables(mut self, tunables: GroupConfig) -> Self {
        self.tunables = Some(tunables);
        self
    }

    /// Sections in page order with their rendered heights and anchor flags
    pub fn placements(&self) -> Vec<(SectionId, SectionEntry)> {
        match &self.sections {
            Some(entries) => entries.iter().map(|e| (e.id, e.clone())).collect(),
            None => self
                .group
                .sections()
                .iter()
                .map(|id| (*id, SectionEntry::new(*id)))
                .collect(),
        }
    }

    pub fn layout(&self) -> GroupLayout<SectionId> {
        let sections = self
            .placements()
            .into_iter()
            .enumerate()
            .map(|(order, (id, entry))| {
                let section = Section::new(id, order as u32);
                if entry.anchored { section } else { section.without_anchor() }
            })
            .collect();
        GroupLayout::from_sections(self.group.as_str(), sections).with_seed(self.seed.iter().copied())
    }

    pub fn config(&self) -> GroupConfig {
        self.tunables.clone().unwrap_or_else(|| self.group.default_config())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (id, entry) in self.placements() {
            if let Some(height) = entry.height
                && (!height.is_finite() || height <= 0.0)
            {
                return Err(ConfigError::InvalidSectionHeight {
                    section: id.to_string(),
                    value: height,
                });
            }
        }
        self.layout().validate()?;
        self.config().validate()
    }
}

/// One section of a group override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub id: SectionId,

    /// Rendered height in pixels; the catalog height when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    /// Whether the section's region is mounted and can be scrolled to
    #[serde(default = "default_true")]
    pub anchored: bool,
}

impl SectionEntry {
    pub fn new(id: SectionId) -> Self {
        Self {
            id,
            height: None,
            anchored: true,
        }
    }

    pub fn height(&self) -> f64 {
        self.height.unwrap_or_else(|| self.id.default_height())
    }
}

/// One script step as written in YAML: exactly one field set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(rename = "wait-ms", default, skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,

    #[serde(rename = "scroll-to-px", default, skip_serializing_if = "Option::is_none")]
    pub scroll_to_px: Option<f64>,

    /// Section name; parsed when played so unknown names reach the jump
    /// channel's own rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateStep>,
}

/// Change a group's gating prerequisite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStep {
    pub group: GroupId,
    pub open: bool,
}

/// A resolved script step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Let time pass while the viewport keeps reporting
    Wait(Duration),
    /// Set the scroll offset, as a user drag would
    ScrollTo(f64),
    /// Page-wide jump request by name
    Jump(String),
    Gate { group: GroupId, open: bool },
}

impl ScriptStep {
    pub fn wait(ms: u64) -> Self {
        Self {
            wait_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn scroll_to(px: f64) -> Self {
        Self {
            scroll_to_px: Some(px),
            ..Self::default()
        }
    }

    pub fn jump(section: impl Into<String>) -> Self {
        Self {
            jump: Some(section.into()),
            ..Self::default()
        }
    }

    pub fn gate(group: GroupId, open: bool) -> Self {
        Self {
            gate: Some(GateStep { group, open }),
            ..Self::default()
        }
    }

    pub fn resolve(&self, index: usize) -> Result<Step, ConfigError> {
        let count = [
            self.wait_ms.is_some(),
            self.scroll_to_px.is_some(),
            self.jump.is_some(),
            self.gate.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if count != 1 {
            return Err(ConfigError::InvalidStep { index, count });
        }

        if let Some(ms) = self.wait_ms {
            return Ok(Step::Wait(Duration::from_millis(ms)));
        }
        if let Some(px) = self.scroll_to_px {
            return Ok(Step::ScrollTo(px));
        }
        if let Some(section) = &self.jump {
            return Ok(Step::Jump(section.clone()));
        }
        match self.gate {
            Some(GateStep { group, open }) => Ok(Step::Gate { group, open }),
            None => Err(ConfigError::InvalidStep { index, count }),
        }
    }
}
