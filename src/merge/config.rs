//! Recursive merge of configuration trees.
//!
//! The dominant tree drives the merge; directives on it decide how the
//! recessive tree contributes:
//! - `combine.self="override"`: the recessive node is discarded
//! - `combine.self="remove"` on a matched dominant child: the child is dropped
//! - `combine.children="append"`: recessive children are placed before the
//!   dominant ones instead of being matched by name
//! - `combine.id` / `combine.keys` (on recessive nodes): match children by
//!   identity attributes instead of by name

use std::collections::{HashMap, HashSet};

use pom_model::{ConfigNode, COMBINE_CHILDREN, COMBINE_ID, COMBINE_KEYS, COMBINE_SELF};

const SELF_OVERRIDE: &str = "override";
const SELF_REMOVE: &str = "remove";
const CHILDREN_APPEND: &str = "append";

/// Merge `recessive` into `dominant`.
pub fn merge_config(dominant: ConfigNode, recessive: ConfigNode) -> ConfigNode {
    if dominant.attribute(COMBINE_SELF) == Some(SELF_OVERRIDE) {
        return dominant;
    }

    let keys: Option<Vec<String>> = recessive
        .attributes
        .get(COMBINE_KEYS)
        .filter(|k| !k.is_empty())
        .map(|k| k.split(',').map(|s| s.trim().to_string()).collect());

    let mut merged = dominant;
    for (key, value) in recessive.attributes {
        let entry = merged.attributes.entry(key).or_default();
        if entry.is_empty() {
            *entry = value;
        }
    }
    if merged.value.as_deref().map_or(true, str::is_empty) && merged.children.is_empty() {
        if let Some(value) = recessive.value {
            merged.value = Some(value);
        }
    }
    if recessive.children.is_empty() {
        return merged;
    }

    let append = merged.attribute(COMBINE_CHILDREN) == Some(CHILDREN_APPEND);

    let dominant_names: HashSet<String> = merged.children.iter().map(|c| c.name.clone()).collect();
    let mut slots: Vec<Option<ConfigNode>> = merged.children.drain(..).map(Some).collect();
    let mut name_cursor: HashMap<String, usize> = HashMap::new();
    let mut prepended = Vec::new();
    let mut appended = Vec::new();

    for recessive_child in recessive.children {
        let (matched, by_identity) =
            if let Some(id) = recessive_child.attribute(COMBINE_ID).filter(|s| !s.is_empty()) {
                (position_by(&slots, |c| c.attribute(COMBINE_ID) == Some(id)), true)
            } else if let Some(keys) = &keys {
                let found = position_by(&slots, |c| {
                    keys.iter()
                        .all(|k| c.attribute(k) == recessive_child.attribute(k))
                });
                (found, true)
            } else if append {
                (None, false)
            } else {
                (next_by_name(&slots, &mut name_cursor, &recessive_child.name), false)
            };

        match matched {
            Some(idx) => {
                if let Some(dominant_child) = slots[idx].take() {
                    if dominant_child.attribute(COMBINE_SELF) != Some(SELF_REMOVE) {
                        slots[idx] = Some(merge_config(dominant_child, recessive_child));
                    }
                }
            }
            None if append => prepended.push(recessive_child),
            None if !by_identity && dominant_names.contains(&recessive_child.name) => {
                // every same-named dominant child is already paired
            }
            None => appended.push(recessive_child),
        }
    }

    merged.children = prepended
        .into_iter()
        .chain(slots.into_iter().flatten())
        .chain(appended)
        .collect();
    merged
}

/// Merge two optional trees.
pub fn merge_optional(dominant: Option<ConfigNode>, recessive: Option<ConfigNode>) -> Option<ConfigNode> {
    match (dominant, recessive) {
        (Some(d), Some(r)) => Some(merge_config(d, r)),
        (d, r) => d.or(r),
    }
}

fn position_by(slots: &[Option<ConfigNode>], pred: impl Fn(&ConfigNode) -> bool) -> Option<usize> {
    slots
        .iter()
        .rposition(|slot| slot.as_ref().map_or(false, &pred))
}

/// Positional matching: the n-th recessive child named `name` pairs with the
/// n-th dominant child of that name.
fn next_by_name(
    slots: &[Option<ConfigNode>],
    cursor: &mut HashMap<String, usize>,
    name: &str,
) -> Option<usize> {
    let start = cursor.get(name).copied().unwrap_or(0);
    let idx = slots
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, slot)| slot.as_ref().map_or(false, |c| c.name == name))
        .map(|(i, _)| i)?;
    cursor.insert(name.to_string(), idx + 1);
    Some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(node: &ConfigNode) -> Vec<&str> {
        node.children.iter().filter_map(|c| c.value.as_deref()).collect()
    }

    #[test]
    fn test_dominant_value_wins_and_recessive_fills_gaps() {
        let dominant = ConfigNode::new("configuration").with_child(ConfigNode::leaf("source", "17"));
        let recessive = ConfigNode::new("configuration")
            .with_child(ConfigNode::leaf("source", "11"))
            .with_child(ConfigNode::leaf("target", "11"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(merged.child("source").and_then(|c| c.value.as_deref()), Some("17"));
        assert_eq!(merged.child("target").and_then(|c| c.value.as_deref()), Some("11"));
    }

    #[test]
    fn test_override_discards_recessive() {
        let dominant = ConfigNode::new("excludes")
            .with_attribute(COMBINE_SELF, "override")
            .with_child(ConfigNode::leaf("exclude", "a"));
        let recessive = ConfigNode::new("excludes").with_child(ConfigNode::leaf("other", "b"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(values(&merged), vec!["a"]);
    }

    #[test]
    fn test_append_places_recessive_first() {
        let dominant = ConfigNode::new("args")
            .with_attribute(COMBINE_CHILDREN, "append")
            .with_child(ConfigNode::leaf("arg", "child"));
        let recessive = ConfigNode::new("args")
            .with_child(ConfigNode::leaf("arg", "parent-1"))
            .with_child(ConfigNode::leaf("arg", "parent-2"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(values(&merged), vec!["parent-1", "parent-2", "child"]);
    }

    #[test]
    fn test_same_name_children_match_positionally() {
        let dominant = ConfigNode::new("items").with_child(ConfigNode::leaf("item", "a"));
        let recessive = ConfigNode::new("items")
            .with_child(ConfigNode::leaf("item", "b"))
            .with_child(ConfigNode::leaf("item", "c"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(values(&merged), vec!["a"]);
    }

    #[test]
    fn test_remove_drops_matched_child() {
        let dominant = ConfigNode::new("configuration")
            .with_child(ConfigNode::new("debug").with_attribute(COMBINE_SELF, "remove"))
            .with_child(ConfigNode::leaf("verbose", "true"));
        let recessive = ConfigNode::new("configuration").with_child(ConfigNode::leaf("debug", "true"));

        let merged = merge_config(dominant, recessive);
        assert!(merged.child("debug").is_none());
        assert!(merged.child("verbose").is_some());
    }

    #[test]
    fn test_combine_id_matches_across_positions() {
        let dominant = ConfigNode::new("rules")
            .with_child(ConfigNode::new("rule").with_attribute(COMBINE_ID, "b").with_value("B!"))
            .with_child(ConfigNode::new("rule").with_attribute(COMBINE_ID, "a").with_value("A!"));
        let recessive = ConfigNode::new("rules")
            .with_child(
                ConfigNode::new("rule")
                    .with_attribute(COMBINE_ID, "a")
                    .with_attribute("level", "warn"),
            )
            .with_child(ConfigNode::new("rule").with_attribute(COMBINE_ID, "c").with_value("C"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(values(&merged), vec!["B!", "A!", "C"]);
        assert_eq!(merged.children[1].attribute("level"), Some("warn"));
    }

    #[test]
    fn test_combine_keys_matches_by_attributes() {
        let dominant = ConfigNode::new("servers")
            .with_child(ConfigNode::new("server").with_attribute("host", "b").with_value("dom"));
        let recessive = ConfigNode::new("servers")
            .with_attribute(COMBINE_KEYS, "host")
            .with_child(ConfigNode::new("server").with_attribute("host", "a").with_value("rec-a"))
            .with_child(ConfigNode::new("server").with_attribute("host", "b").with_value("rec-b"));

        let merged = merge_config(dominant, recessive);
        assert_eq!(values(&merged), vec!["dom", "rec-a"]);
    }

    #[test]
    fn test_recessive_attributes_fill_missing() {
        let dominant = ConfigNode::new("node").with_attribute("a", "dom");
        let recessive = ConfigNode::new("node")
            .with_attribute("a", "rec")
            .with_attribute("b", "rec");

        let merged = merge_config(dominant, recessive);
        assert_eq!(merged.attribute("a"), Some("dom"));
        assert_eq!(merged.attribute("b"), Some("rec"));
    }
}
