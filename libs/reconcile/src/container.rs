//! Container patch algorithm.
//!
//! The sidecar slot of a workload is identified by a reserved container
//! name. [`patch`] brings that slot to the desired image (injecting it when
//! missing) and [`strip`] removes it. Both are pure and idempotent:
//!
//! - every sidecar-named container is normalized, not just the first
//! - all other containers keep their values and relative order
//! - an upgraded sidecar keeps its index; a fresh one is appended

use serde::{Deserialize, Serialize};

/// Reserved container name marking the managed sidecar slot.
pub const SIDECAR_CONTAINER_NAME: &str = "sidecar-container";

/// Entrypoint given to every injected sidecar.
pub const SIDECAR_COMMAND: [&str; 2] = ["sleep", "3600"];

/// A container inside a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,

    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
        }
    }

    /// Build the managed sidecar container for `image`.
    pub fn sidecar(image: impl Into<String>) -> Self {
        Self {
            name: SIDECAR_CONTAINER_NAME.to_string(),
            image: image.into(),
            command: SIDECAR_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns true if this container occupies the sidecar slot.
    pub fn is_sidecar(&self) -> bool {
        self.name == SIDECAR_CONTAINER_NAME
    }
}

/// Result of [`patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub containers: Vec<Container>,
    pub changed: bool,
}

/// Result of [`strip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub containers: Vec<Container>,
    pub removed: bool,
}

/// Compute the container list with the sidecar slot at `desired_image`.
pub fn patch(containers: &[Container], desired_image: &str) -> Patched {
    let mut found = false;
    let mut changed = false;

    let mut patched: Vec<Container> = containers
        .iter()
        .map(|c| {
            if !c.is_sidecar() {
                return c.clone();
            }
            found = true;
            if c.image == desired_image {
                c.clone()
            } else {
                changed = true;
                Container::sidecar(desired_image)
            }
        })
        .collect();

    if !found {
        patched.push(Container::sidecar(desired_image));
        changed = true;
    }

    Patched {
        containers: patched,
        changed,
    }
}

/// Compute the container list with every sidecar container removed.
pub fn strip(containers: &[Container]) -> Stripped {
    let remaining: Vec<Container> = containers
        .iter()
        .filter(|c| !c.is_sidecar())
        .cloned()
        .collect();
    let removed = remaining.len() != containers.len();

    Stripped {
        containers: remaining,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn app(image: &str) -> Container {
        Container::new("app", image)
    }

    #[test]
    fn test_inject_appends_sidecar() {
        let result = patch(&[app("app:v1")], "side:v1");

        assert!(result.changed);
        assert_eq!(result.containers.len(), 2);
        assert_eq!(result.containers[0], app("app:v1"));
        assert_eq!(result.containers[1].name, SIDECAR_CONTAINER_NAME);
        assert_eq!(result.containers[1].image, "side:v1");
        assert_eq!(result.containers[1].command, vec!["sleep", "3600"]);
    }

    #[test]
    fn test_inject_into_empty_list() {
        let result = patch(&[], "side:v1");
        assert!(result.changed);
        assert_eq!(result.containers, vec![Container::sidecar("side:v1")]);
    }

    #[test]
    fn test_upgrade_preserves_position() {
        let containers = vec![
            app("app:v1"),
            Container::sidecar("side:v1"),
            Container::new("metrics", "metrics:v3"),
        ];

        let result = patch(&containers, "side:v2");

        assert!(result.changed);
        assert_eq!(
            result.containers,
            vec![
                app("app:v1"),
                Container::sidecar("side:v2"),
                Container::new("metrics", "metrics:v3"),
            ]
        );
    }

    #[test]
    fn test_upgrade_rebuilds_command() {
        let stale = Container {
            name: SIDECAR_CONTAINER_NAME.to_string(),
            image: "side:v1".to_string(),
            command: vec!["run".to_string()],
        };

        let result = patch(&[stale], "side:v2");
        assert_eq!(result.containers, vec![Container::sidecar("side:v2")]);
    }

    #[test]
    fn test_matching_image_is_noop() {
        let containers = vec![app("app:v1"), Container::sidecar("side:v2")];

        let result = patch(&containers, "side:v2");

        assert!(!result.changed);
        assert_eq!(result.containers, containers);
    }

    #[test]
    fn test_all_duplicate_sidecars_normalized() {
        let containers = vec![
            Container::sidecar("side:v1"),
            app("app:v1"),
            Container::sidecar("side:v0"),
        ];

        let result = patch(&containers, "side:v2");

        assert!(result.changed);
        assert_eq!(
            result.containers,
            vec![
                Container::sidecar("side:v2"),
                app("app:v1"),
                Container::sidecar("side:v2"),
            ]
        );
    }

    #[test]
    fn test_partial_duplicate_only_touches_stale_entry() {
        let containers = vec![Container::sidecar("side:v2"), Container::sidecar("side:v1")];

        let result = patch(&containers, "side:v2");

        assert!(result.changed);
        assert_eq!(result.containers[0], containers[0]);
        assert_eq!(result.containers[1], Container::sidecar("side:v2"));
    }

    #[rstest]
    #[case(vec![app("app:v1"), Container::sidecar("side:v2")], vec![app("app:v1")], true)]
    #[case(vec![app("app:v1")], vec![app("app:v1")], false)]
    #[case(vec![], vec![], false)]
    #[case(
        vec![Container::sidecar("a"), app("app:v1"), Container::sidecar("b"), Container::new("db", "pg:16")],
        vec![app("app:v1"), Container::new("db", "pg:16")],
        true
    )]
    fn test_strip(
        #[case] input: Vec<Container>,
        #[case] expected: Vec<Container>,
        #[case] removed: bool,
    ) {
        let result = strip(&input);
        assert_eq!(result.containers, expected);
        assert_eq!(result.removed, removed);
    }

    #[test]
    fn test_container_json_shape() {
        let json = serde_json::to_value(Container::sidecar("side:v1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "sidecar-container",
                "image": "side:v1",
                "command": ["sleep", "3600"],
            })
        );

        let parsed: Container = serde_json::from_str(r#"{"name":"app"}"#).unwrap();
        assert_eq!(parsed, Container::new("app", ""));
    }

    fn arb_container() -> impl Strategy<Value = Container> {
        (
            prop_oneof![
                Just(SIDECAR_CONTAINER_NAME.to_string()),
                Just("app".to_string()),
                Just("worker".to_string()),
                "[a-z]{1,6}",
            ],
            prop_oneof![Just("side:v1".to_string()), Just("side:v2".to_string()), "[a-z]{1,4}:v[0-9]"],
            proptest::collection::vec("[a-z]{1,5}", 0..3),
        )
            .prop_map(|(name, image, command)| Container {
                name,
                image,
                command,
            })
    }

    proptest! {
        #[test]
        fn prop_patch_is_idempotent(
            containers in proptest::collection::vec(arb_container(), 0..6),
            image in prop_oneof![Just("side:v1".to_string()), Just("side:v2".to_string())],
        ) {
            let first = patch(&containers, &image);
            let second = patch(&first.containers, &image);

            prop_assert!(!second.changed);
            prop_assert_eq!(&second.containers, &first.containers);
        }

        #[test]
        fn prop_patch_keeps_other_containers_in_order(
            containers in proptest::collection::vec(arb_container(), 0..6),
        ) {
            let result = patch(&containers, "side:v2");

            let before: Vec<_> = containers.iter().filter(|c| !c.is_sidecar()).collect();
            let after: Vec<_> = result.containers.iter().filter(|c| !c.is_sidecar()).collect();
            prop_assert_eq!(before, after);
            prop_assert!(result.containers.iter().filter(|c| c.is_sidecar()).all(|c| c.image == "side:v2"));
        }

        #[test]
        fn prop_strip_undoes_patch(
            containers in proptest::collection::vec(arb_container(), 0..6),
        ) {
            let stripped = strip(&containers);
            let patched_then_stripped = strip(&patch(&containers, "side:v1").containers);

            prop_assert_eq!(&patched_then_stripped.containers, &stripped.containers);
            prop_assert!(!strip(&stripped.containers).removed);
        }
    }
}
