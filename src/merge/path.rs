//! URL-like path joining for inherited path fields.

use std::path::{Component, Path};

use pom_model::PathField;

/// Append `child_path` to `parent_url`, keeping any `scheme://` prefix and
/// collapsing `.` and `..` segments. A trailing slash survives only when
/// `child_path` ends with one.
pub fn append_path(parent_url: &str, child_path: &str) -> String {
    let (protocol, rest) = match parent_url.find("://") {
        Some(idx) => parent_url.split_at(idx + 3),
        None => ("", parent_url),
    };

    let mut segments: Vec<&str> = Vec::new();
    for token in rest
        .split('/')
        .chain(child_path.split('/'))
        .filter(|t| !t.is_empty())
    {
        match token {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(parent_url.len() + child_path.len() + 1);
    out.push_str(protocol);
    if rest.starts_with('/') {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if child_path.ends_with('/') && !segments.is_empty() {
        out.push('/');
    }
    out
}

/// Resolve an inherited path field. The child's own value wins; a child
/// that opts out of inheritance keeps its unset value. Otherwise the
/// parent's value is taken, with `module_path` appended unless either side
/// disables appending.
pub fn inherit_path_field(child: PathField, parent: &PathField, module_path: &str) -> PathField {
    if child.value.is_some() || !child.inherit {
        return child;
    }
    let Some(parent_value) = parent.value.as_deref() else {
        return child;
    };

    let append = child.append_path && parent.append_path;
    let value = if append && !module_path.is_empty() {
        append_path(parent_value, module_path)
    } else {
        parent_value.to_string()
    };
    PathField {
        value: Some(value),
        inherit: child.inherit,
        append_path: append,
    }
}

/// Module path of a child relative to its parent: the relative directory
/// from the parent's base directory to the child's, falling back to the
/// child's artifactId when either directory is unknown or they coincide.
pub fn module_path(parent_dir: Option<&Path>, child_dir: Option<&Path>, artifact_id: &str) -> String {
    match (parent_dir, child_dir) {
        (Some(parent), Some(child)) => match relative_dir(parent, child) {
            Some(rel) if !rel.is_empty() => rel,
            _ => artifact_id.to_string(),
        },
        _ => artifact_id.to_string(),
    }
}

fn relative_dir(from: &Path, to: &Path) -> Option<String> {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    if from.first() != to.first() {
        return None;
    }
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    Some(parts.join("/"))
}
