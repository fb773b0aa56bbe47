//! Error types

use thiserror::Error;

/// Errors raised when a section id arrives as a string from outside the page
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SectionError {
    #[error("Unknown section: {id}")]
    Unknown { id: String },

    #[error("Unknown group: {id}")]
    UnknownGroup { id: String },
}

/// Invalid group tunables or page composition
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Activation band top offset must be a finite, non-negative pixel value (got {value})")]
    InvalidTopOffset { value: f64 },

    #[error("Activation band bottom exclusion must be in [0, 1) (got {value})")]
    InvalidBottomExclusion { value: f64 },

    #[error("Preload stagger must be greater than zero")]
    ZeroStagger,

    #[error("Preload grace window ({grace_ms}ms) is shorter than the deep-link settle delay ({settle_ms}ms)")]
    GraceShorterThanSettle { grace_ms: u64, settle_ms: u64 },

    #[error("Channel buffer must be greater than zero")]
    ZeroChannelBuffer,

    #[error("Seed section {section} is not part of group {group}")]
    SeedOutsideGroup { section: String, group: String },

    #[error("Section {section} is declared by both {first} and {second}")]
    DuplicateSection {
        section: String,
        first: String,
        second: String,
    },

    #[error("Script step {index} must set exactly one action (got {count})")]
    InvalidStep { index: usize, count: usize },

    #[error("Script step {index} targets group {group}, which is not on the page")]
    UnknownScriptGroup { index: usize, group: String },

    #[error("Viewport height must be positive (got {value})")]
    InvalidViewportHeight { value: f64 },

    #[error("Frame interval must be greater than zero")]
    ZeroFrameInterval,

    #[error("Section height for {section} must be positive (got {value})")]
    InvalidSectionHeight { section: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_section_message() {
        let err = SectionError::Unknown {
            id: "budget-lines".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown section: budget-lines");
    }

    #[test]
    fn test_grace_message() {
        let err = ConfigError::GraceShorterThanSettle {
            grace_ms: 100,
            settle_ms: 300,
        };
        let msg = err.to_string();
        assert!(msg.contains("100ms"));
        assert!(msg.contains("300ms"));
    }

    #[test]
    fn test_duplicate_section_message() {
        let err = ConfigError::DuplicateSection {
            section: "budgets".to_string(),
            first: "finances".to_string(),
            second: "overview".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("budgets"));
        assert!(msg.contains("finances"));
        assert!(msg.contains("overview"));
    }
}
