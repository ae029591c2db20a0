//! Extraction of environment groups from resolved settings.
//!
//! A dict level tagged with [`M_ENVIRONMENT_KEY`] declares which of its
//! sibling keys form the environment of a group. Group keys must be unique
//! across the whole document.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constants::{is_metadata_key, M_ENVIRONMENT_KEY};
use crate::error::SettingsError;
use crate::types::Document;

/// Environment variables of one group: variable name to raw settings value.
pub type Environment = Document;

/// One place in the document that declared an environment group.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentCandidate {
    pub env: Environment,
    /// Ancestor keys of the tagged dict, without the last one.
    pub parents: Vec<String>,
}

impl EnvironmentCandidate {
    pub fn location(&self) -> String {
        self.parents.join("/")
    }
}

/// Collect every environment group of `data` without uniqueness checks.
pub fn collect_environment_candidates(data: &Value) -> BTreeMap<String, Vec<EnvironmentCandidate>> {
    let mut output = BTreeMap::new();
    if let Value::Object(map) = data {
        collect_into(map, &mut Vec::new(), &mut output);
    }
    output
}

/// Resolve the environment groups of `data`.
///
/// Fails with [`SettingsError::DuplicatedEnvGroups`] listing every location
/// of each group key declared more than once.
pub fn find_environments(data: &Value) -> Result<BTreeMap<String, Environment>, SettingsError> {
    let candidates = collect_environment_candidates(data);

    let mut duplicated = BTreeMap::new();
    let mut output = BTreeMap::new();
    for (group_key, mut items) in candidates {
        if items.len() > 1 {
            let locations = items.iter().map(EnvironmentCandidate::location).collect();
            duplicated.insert(group_key, locations);
        } else if let Some(item) = items.pop() {
            output.insert(group_key, item.env);
        }
    }

    if !duplicated.is_empty() {
        return Err(SettingsError::DuplicatedEnvGroups(duplicated));
    }
    Ok(output)
}

fn collect_into(
    data: &Document,
    parents: &mut Vec<String>,
    output: &mut BTreeMap<String, Vec<EnvironmentCandidate>>,
) {
    if let Some(Value::Object(metadata)) = data.get(M_ENVIRONMENT_KEY) {
        for (group_key, env_keys) in metadata {
            let mut env = Environment::new();
            for env_key in env_keys.as_array().into_iter().flatten() {
                let Some(env_key) = env_key.as_str() else {
                    continue;
                };
                match data.get(env_key) {
                    Some(value) => {
                        env.insert(env_key.to_string(), value.clone());
                    }
                    None => tracing::warn!(
                        group = %group_key,
                        key = %env_key,
                        path = %parents.join("/"),
                        "Environment key listed in metadata is missing",
                    ),
                }
            }

            let mut item_parents = parents.clone();
            item_parents.pop();
            output
                .entry(group_key.clone())
                .or_default()
                .push(EnvironmentCandidate {
                    env,
                    parents: item_parents,
                });
        }
    }

    for (key, value) in data {
        if is_metadata_key(key) {
            continue;
        }
        if let Value::Object(child) = value {
            parents.push(key.clone());
            collect_into(child, parents, output);
            parents.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_single_group() {
        let data = json!({
            "applications": {
                "maya": {
                    "environment": {
                        "__environment_keys__": {"maya": ["MAYA_VERSION", "PATH"]},
                        "MAYA_VERSION": "2022",
                        "PATH": ["/opt/maya/bin"],
                        "IGNORED": 1
                    }
                }
            }
        });

        let envs = find_environments(&data).unwrap();
        assert_eq!(envs.len(), 1);
        assert_eq!(
            Value::Object(envs["maya"].clone()),
            json!({"MAYA_VERSION": "2022", "PATH": ["/opt/maya/bin"]})
        );
    }

    #[test]
    fn test_multiple_groups_at_different_paths() {
        let data = json!({
            "general": {
                "environment": {"__environment_keys__": {"global": ["A"]}, "A": "1"}
            },
            "tools": {
                "mtoa": {"__environment_keys__": {"mtoa": ["B"]}, "B": "2"}
            }
        });

        let envs = find_environments(&data).unwrap();
        assert_eq!(envs["global"]["A"], json!("1"));
        assert_eq!(envs["mtoa"]["B"], json!("2"));
    }

    #[test]
    fn test_duplicated_group_keys_fail() {
        let data = json!({
            "applications": {
                "maya": {"env": {"__environment_keys__": {"maya": ["A"]}, "A": "1"}}
            },
            "tools": {
                "maya": {"env": {"__environment_keys__": {"maya": ["B"]}, "B": "2"}}
            }
        });

        let err = find_environments(&data).unwrap_err();
        assert_matches!(err, SettingsError::DuplicatedEnvGroups(ref dup) if dup["maya"].len() == 2);
        if let SettingsError::DuplicatedEnvGroups(dup) = err {
            assert_eq!(dup["maya"], vec!["applications/maya", "tools/maya"]);
        }
    }

    #[test]
    fn test_candidate_parents_drop_last_key() {
        let data = json!({
            "a": {"b": {"c": {"__environment_keys__": {"g": []}}}}
        });
        let candidates = collect_environment_candidates(&data);
        assert_eq!(candidates["g"][0].parents, vec!["a", "b"]);
    }

    #[test]
    fn test_non_object_input_is_empty() {
        assert!(find_environments(&json!([1, 2])).unwrap().is_empty());
        assert!(find_environments(&json!({})).unwrap().is_empty());
    }
}
