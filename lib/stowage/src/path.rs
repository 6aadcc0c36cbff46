//! Structured paths used to address nodes of the in-memory tree.

use std::fmt;
use std::path::MAIN_SEPARATOR;

/// An ordered sequence of name segments.
///
/// A path is *valid* when it holds at least one segment and *direct* when it
/// holds exactly one. The root of a tree is addressed by a single empty
/// segment (see [`TreePath::root`]).
///
/// None of the operations fail: out-of-range accesses and operations on
/// exhausted paths return an empty, invalid path instead, so chains of path
/// algebra never panic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// Parse and normalize a raw path string.
    ///
    /// Forward slashes are accepted on every platform. `.` and `..`
    /// components and redundant separators are collapsed, leading and
    /// trailing separators are trimmed, and the remainder is split on the
    /// host separator. A string that cleans down to nothing is the root path.
    pub fn of(raw: &str) -> Self {
        let native: String = raw
            .chars()
            .map(|c| if c == '/' { MAIN_SEPARATOR } else { c })
            .collect();
        let cleaned = path_clean::clean(native);
        let cleaned = cleaned.to_string_lossy();
        let trimmed = cleaned.trim_matches(MAIN_SEPARATOR);

        if trimmed.is_empty() || trimmed == "." {
            return Self::root();
        }

        Self {
            segments: trimmed.split(MAIN_SEPARATOR).map(str::to_owned).collect(),
        }
    }

    /// The path naming a tree root: one empty segment.
    pub fn root() -> Self {
        Self::segment("")
    }

    /// An empty, invalid path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A path made of exactly one segment, taken as-is.
    pub(crate) fn segment(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn is_direct(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The segment at `index` as a single-segment path, or an invalid path if
    /// `index` is out of range.
    pub fn element_at(&self, index: usize) -> Self {
        match self.segments.get(index) {
            Some(segment) => Self::segment(segment.clone()),
            None => Self::empty(),
        }
    }

    /// A new path made of the segments of `self` followed by the segments of
    /// `other`.
    pub fn concat(&self, other: &TreePath) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + other.segments.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }

    /// Remove and return the first segment.
    pub fn pop(&mut self) -> Self {
        if self.segments.is_empty() {
            return Self::empty();
        }
        Self::segment(self.segments.remove(0))
    }

    /// Remove and return the last segment.
    pub fn drop_last(&mut self) -> Self {
        match self.segments.pop() {
            Some(segment) => Self::segment(segment),
            None => Self::empty(),
        }
    }

    /// The first segment of the path, if any.
    pub(crate) fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Render the path with `/` separators regardless of the host.
    pub fn to_slash_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = String::new();
        separator.push(MAIN_SEPARATOR);
        f.write_str(&self.segments.join(&separator))
    }
}

impl From<&str> for TreePath {
    fn from(raw: &str) -> Self {
        TreePath::of(raw)
    }
}

impl From<&String> for TreePath {
    fn from(raw: &String) -> Self {
        TreePath::of(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sizes() {
        assert_eq!(TreePath::of("a/b/c").len(), 3);
        assert!(!TreePath::of("a/b/c").is_direct());
        assert!(TreePath::of("a").is_direct());
        assert!(TreePath::of("a").is_valid());
        assert!(!TreePath::empty().is_valid());
    }

    #[test]
    fn parse_cleans_the_input() {
        assert_eq!(TreePath::of("/usr/./homeport//home/"), TreePath::of("usr/homeport/home"));
        assert_eq!(TreePath::of("a/b/../c"), TreePath::of("a/c"));
        assert_eq!(TreePath::of("/"), TreePath::root());
        assert_eq!(TreePath::of(""), TreePath::root());
        assert_eq!(TreePath::root().segments(), &[String::new()]);
    }

    #[test]
    fn pop_and_concat_rebuilds_the_path() {
        let original = TreePath::of("a/b/c");
        let mut rest = original.clone();
        let head = rest.pop();

        assert_eq!(head, TreePath::of("a"));
        assert_eq!(rest, TreePath::of("b/c"));
        assert_eq!(head.concat(&rest), original);
    }

    #[test]
    fn drop_last_and_concat_rebuilds_the_path() {
        let original = TreePath::of("a/b/c");
        let mut rest = original.clone();
        let tail = rest.drop_last();

        assert_eq!(tail, TreePath::of("c"));
        assert_eq!(rest.concat(&tail), original);
    }

    #[test]
    fn exhausted_paths_yield_the_empty_sentinel() {
        let mut path = TreePath::of("a");
        assert_eq!(path.pop(), TreePath::of("a"));
        assert!(!path.is_valid());
        assert!(!path.pop().is_valid());
        assert!(!path.drop_last().is_valid());
    }

    #[test]
    fn clones_do_not_share_segments() {
        let original = TreePath::of("a/b/c");
        let mut clone = original.clone();
        clone.pop();
        clone.drop_last();

        assert_eq!(original.len(), 3);
        assert_eq!(clone, TreePath::of("b"));
    }

    #[test]
    fn element_at_bounds() {
        let path = TreePath::of("a/b/c");
        assert_eq!(path.element_at(1), TreePath::of("b"));
        assert!(!path.element_at(3).is_valid());
    }

    #[test]
    fn render() {
        let path = TreePath::root().concat(&TreePath::of("usr/home/test.go"));
        assert_eq!(path.to_slash_string(), "/usr/home/test.go");
        assert_eq!(
            path.to_string(),
            format!("{MAIN_SEPARATOR}usr{MAIN_SEPARATOR}home{MAIN_SEPARATOR}test.go")
        );
    }
}
