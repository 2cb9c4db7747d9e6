//! JDK version matching for `Jdk` activations.
//!
//! Accepted forms:
//! - prefix: `11`, `1.8` (matches any version starting with it)
//! - range: `[1.8,11)`, `(,17]`, `[21,)`, exact `[17]`
//! - union of ranges: `[1.8,11),[17,)`
//!
//! Versions compare component by component, numerically, up to the length of
//! the bound: `11.0.2` equals the bound `11`.

use std::cmp::Ordering;

/// JDK range syntax errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionRangeError {
    #[error("empty version requirement")]
    Empty,

    #[error("unbalanced brackets in version range '{0}'")]
    Unbalanced(String),

    #[error("invalid bound in version range '{0}'")]
    InvalidBound(String),
}

impl VersionRangeError {
    pub fn code(&self) -> &'static str {
        match self {
            VersionRangeError::Empty => "EMPTY_RANGE",
            VersionRangeError::Unbalanced(_) => "UNBALANCED_RANGE",
            VersionRangeError::InvalidBound(_) => "INVALID_BOUND",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: String,
    inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Range {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Range {
    fn contains(&self, version: &str) -> bool {
        let above = self.lower.as_ref().map_or(true, |b| {
            let order = compare_to_bound(version, &b.version);
            order == Ordering::Greater || (b.inclusive && order == Ordering::Equal)
        });
        let below = self.upper.as_ref().map_or(true, |b| {
            let order = compare_to_bound(version, &b.version);
            order == Ordering::Less || (b.inclusive && order == Ordering::Equal)
        });
        above && below
    }
}

/// Whether `jdk` satisfies `requirement`. A leading `!` negates.
pub fn jdk_matches(requirement: &str, jdk: &str) -> Result<bool, VersionRangeError> {
    let requirement = requirement.trim();
    let (negated, requirement) = match requirement.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, requirement),
    };
    if requirement.is_empty() {
        return Err(VersionRangeError::Empty);
    }

    let matched = if requirement.starts_with('[') || requirement.starts_with('(') {
        parse_ranges(requirement)?.iter().any(|r| r.contains(jdk))
    } else {
        jdk.starts_with(requirement)
    };
    Ok(matched != negated)
}

fn parse_ranges(spec: &str) -> Result<Vec<Range>, VersionRangeError> {
    let mut ranges = Vec::new();
    let mut rest = spec.trim();

    while !rest.is_empty() {
        let open = rest.chars().next().ok_or(VersionRangeError::Empty)?;
        if open != '[' && open != '(' {
            return Err(VersionRangeError::Unbalanced(spec.to_string()));
        }
        let close_at = rest
            .find([']', ')'])
            .ok_or_else(|| VersionRangeError::Unbalanced(spec.to_string()))?;
        let close = &rest[close_at..close_at + 1];
        let body = &rest[1..close_at];
        ranges.push(parse_range(body, open == '[', close == "]", spec)?);

        rest = rest[close_at + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
        } else if !rest.is_empty() {
            return Err(VersionRangeError::Unbalanced(spec.to_string()));
        }
    }

    if ranges.is_empty() {
        return Err(VersionRangeError::Empty);
    }
    Ok(ranges)
}

fn parse_range(body: &str, lower_inclusive: bool, upper_inclusive: bool, spec: &str) -> Result<Range, VersionRangeError> {
    if body.contains(['[', '(']) {
        return Err(VersionRangeError::Unbalanced(spec.to_string()));
    }

    match body.split_once(',') {
        None => {
            let version = body.trim();
            if version.is_empty() || !lower_inclusive || !upper_inclusive {
                return Err(VersionRangeError::InvalidBound(spec.to_string()));
            }
            let bound = Bound {
                version: version.to_string(),
                inclusive: true,
            };
            Ok(Range {
                lower: Some(bound.clone()),
                upper: Some(bound),
            })
        }
        Some((lower, upper)) => {
            if upper.contains(',') {
                return Err(VersionRangeError::InvalidBound(spec.to_string()));
            }
            let bound = |v: &str, inclusive: bool| {
                let v = v.trim();
                (!v.is_empty()).then(|| Bound {
                    version: v.to_string(),
                    inclusive,
                })
            };
            Ok(Range {
                lower: bound(lower, lower_inclusive),
                upper: bound(upper, upper_inclusive),
            })
        }
    }
}

/// Compare `version` against `bound` over the bound's component count.
fn compare_to_bound(version: &str, bound: &str) -> Ordering {
    let version = components(version);
    let bound = components(bound);
    for (i, b) in bound.iter().enumerate() {
        let v = version.get(i).copied().unwrap_or(0);
        match v.cmp(b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn components(version: &str) -> Vec<u64> {
    version
        .split(['.', '-', '_'])
        .map(|token| {
            let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
