//! Runtime version pinning from the project's declared engine range.

use crate::error::VersionError;

/// Node.js major versions the hosting platform can run, oldest first.
pub const SUPPORTED_NODE_MAJORS: &[u64] = &[18, 20, 22];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRuntime {
    pub major: u64,
}

impl NodeRuntime {
    /// Version string exported to the build environment, e.g. `20.x`.
    pub fn version(&self) -> String {
        format!("{}.x", self.major)
    }

    /// Platform runtime identifier, e.g. `nodejs20.x`.
    pub fn id(&self) -> String {
        format!("nodejs{}.x", self.major)
    }
}

/// Pick the newest supported Node.js major satisfying `engines.node`.
///
/// Ranges are evaluated at major-version granularity: `>=18`, `>16 <21`,
/// `^20.1.0`, `~22`, `20.x`, `18 || 20`, `*`. No declaration selects the
/// newest supported major.
pub fn select_node(range: Option<&str>) -> Result<NodeRuntime, VersionError> {
    let range = range.map(str::trim).filter(|r| !r.is_empty());
    let Some(range) = range else {
        let newest = SUPPORTED_NODE_MAJORS.last().copied().unwrap_or(20);
        return Ok(NodeRuntime { major: newest });
    };

    let selected = SUPPORTED_NODE_MAJORS
        .iter()
        .rev()
        .copied()
        .find(|major| range.split("||").any(|alt| satisfies_all(alt, *major)));

    match selected {
        Some(major) => {
            tracing::debug!(range, major, "selected node runtime");
            Ok(NodeRuntime { major })
        }
        None => Err(VersionError::UnsupportedRuntime {
            requested: range.to_owned(),
            supported: SUPPORTED_NODE_MAJORS
                .iter()
                .map(|m| format!("{m}.x"))
                .collect(),
        }),
    }
}

fn satisfies_all(alternative: &str, major: u64) -> bool {
    let comparators: Vec<&str> = alternative.split_whitespace().collect();
    !comparators.is_empty() && comparators.iter().all(|c| satisfies(c, major))
}

fn satisfies(comparator: &str, major: u64) -> bool {
    let (op, rest) = split_operator(comparator);
    let rest = rest.trim_start_matches('v');
    if rest.is_empty() || rest == "*" || rest.eq_ignore_ascii_case("x") {
        return true;
    }
    let Some(wanted) = leading_major(rest) else {
        return false;
    };
    let exact_major = rest
        .split('.')
        .skip(1)
        .all(|p| p == "0" || p == "x" || p == "X" || p == "*");

    match op {
        ">=" => major >= wanted,
        // `>20.1` still admits a later 20.x release
        ">" if exact_major => major > wanted,
        ">" => major >= wanted,
        "<=" => major <= wanted,
        "<" if exact_major => major < wanted,
        "<" => major <= wanted,
        _ => major == wanted,
    }
}

fn split_operator(comparator: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "^", "~", "="] {
        if let Some(rest) = comparator.strip_prefix(op) {
            return (op, rest.trim());
        }
    }
    ("", comparator)
}

fn leading_major(version: &str) -> Option<u64> {
    version
        .split('.')
        .next()
        // arch-lint: allow(no-silent-result-drop) reason="a non-numeric comparator matches no supported runtime"
        .and_then(|m| m.parse().ok())
}
