//! Namespace index keyed by fully-qualified (dotted) names.
//!
//! - [`FqnCache`] - arena-backed trie with optional segment sanitizing
//! - [`make_identifier`] - resource name → legal identifier segment
//! - [`is_inner_type`] - nested-type membership walk

mod cache;
mod ident;

pub use cache::{FqnCache, NodeId, NodeRef, Sanitizer};
pub use ident::{capitalize, is_anonymous, is_reserved, make_identifier};

/// Whether `relative_inner` names a nested declaration of `top_level`.
///
/// A first segment that is a non-negative integer is always inner. Otherwise
/// every segment must be non-empty and resolve to an existing child, starting
/// from the node for `top_level`.
pub fn is_inner_type<T>(index: &FqnCache<T>, top_level: &str, relative_inner: &str) -> bool {
    if is_anonymous(relative_inner) {
        return true;
    }
    if has_empty_segment(relative_inner) {
        return false;
    }
    index
        .node(top_level)
        .and_then(|node| node.descend(relative_inner))
        .is_some()
}

/// Whether `name` is empty or has an empty dotted segment (`"C."`, `".C"`).
pub fn has_empty_segment(name: &str) -> bool {
    name.split('.').any(str::is_empty)
}

/// Dotted namespace of `fqn` (everything before the last segment).
pub fn namespace_of(fqn: &str) -> &str {
    fqn.rsplit_once('.').map_or("", |(ns, _)| ns)
}

/// Last segment of `fqn`.
pub fn simple_name(fqn: &str) -> &str {
    fqn.rsplit_once('.').map_or(fqn, |(_, name)| name)
}
