//! Engine configuration for match and recursion limits.

use serde::{Deserialize, Serialize};

/// Limits applied by the matcher and the injection resolver.
///
/// # Defaults
///
/// - `max_matches`: 100 000
/// - `max_sequence_steps`: 10 000
/// - `max_injection_depth`: 8
///
/// Missing fields fall back to these defaults when deserialising.
///
/// # Example
///
/// ```
/// use weft_query::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.max_matches(), 100_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of matches collected by one pass before truncation.
    max_matches: usize,
    /// Maximum matching steps spent on one rule at one node.
    max_sequence_steps: usize,
    /// Maximum nesting of recursive injections.
    max_injection_depth: usize,
}

impl EngineConfig {
    /// Creates a configuration with explicit values.
    #[must_use]
    pub const fn new(max_matches: usize, max_sequence_steps: usize, max_injection_depth: usize) -> Self {
        Self {
            max_matches,
            max_sequence_steps,
            max_injection_depth,
        }
    }

    /// Returns the match cap for one pass.
    #[must_use]
    pub const fn max_matches(&self) -> usize {
        self.max_matches
    }

    /// Returns the step budget for a single rule attempt.
    #[must_use]
    pub const fn max_sequence_steps(&self) -> usize {
        self.max_sequence_steps
    }

    /// Returns the injection recursion limit.
    #[must_use]
    pub const fn max_injection_depth(&self) -> usize {
        self.max_injection_depth
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_matches: 100_000,
            max_sequence_steps: 10_000,
            max_injection_depth: 8,
        }
    }
}
