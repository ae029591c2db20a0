//! Override layer a settings tree is currently resolved against.

use serde::{Deserialize, Serialize};

/// Active resolution layer of a whole settings tree.
///
/// Ordering matters: a layer is "active enough" to contribute a value when
/// the current state is greater or equal to it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OverrideState {
    #[default]
    NotDefined = -1,
    Defaults = 0,
    Studio = 1,
    Project = 2,
}

impl OverrideState {
    pub fn name(self) -> &'static str {
        match self {
            OverrideState::NotDefined => "not_defined",
            OverrideState::Defaults => "defaults",
            OverrideState::Studio => "studio",
            OverrideState::Project => "project",
        }
    }
}

impl std::fmt::Display for OverrideState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for OverrideState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "defaults" | "default" => Ok(OverrideState::Defaults),
            "studio" => Ok(OverrideState::Studio),
            "project" => Ok(OverrideState::Project),
            other => Err(format!(
                "Unknown override state '{other}'. Must be one of: defaults, studio, project"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(OverrideState::NotDefined < OverrideState::Defaults);
        assert!(OverrideState::Defaults < OverrideState::Studio);
        assert!(OverrideState::Studio < OverrideState::Project);
        assert!(OverrideState::Project >= OverrideState::Studio);
    }

    #[test]
    fn test_default_is_not_defined() {
        assert_eq!(OverrideState::default(), OverrideState::NotDefined);
    }

    #[test]
    fn test_parse() {
        assert_eq!("studio".parse::<OverrideState>(), Ok(OverrideState::Studio));
        assert_eq!("default".parse::<OverrideState>(), Ok(OverrideState::Defaults));
        assert!("not_defined".parse::<OverrideState>().is_err());
    }
}
