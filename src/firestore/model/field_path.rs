use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};

const RESERVED_CHARACTERS: [char; 5] = ['~', '*', '/', '[', ']'];

/// Path to a (possibly nested) field inside a document.
///
/// Ordering is lexicographic over segments, with a path sorting before every
/// path it is a prefix of. This is the order the ambiguity check relies on:
/// after sorting, a conflicting pair of paths is always adjacent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Builds a path from explicit segments.
    ///
    /// Segments are taken literally, so they may contain dots or characters
    /// that are reserved in the dotted form.
    pub fn new<S, I>(segments: I) -> FirestoreResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(invalid_argument(
                "FieldPath must contain at least one segment",
            ));
        }
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(invalid_argument(format!(
                "Element at index {index} should not be an empty string."
            )));
        }
        Ok(Self { segments })
    }

    /// Parses a dotted path such as `"address.city"`.
    pub fn from_dot_separated(path: &str) -> FirestoreResult<Self> {
        if path.is_empty() {
            return Err(invalid_argument("FieldPath string cannot be empty"));
        }
        if path.contains(RESERVED_CHARACTERS) {
            return Err(invalid_argument(format!(
                "Invalid field path \"{path}\". Paths must not contain '~', '*', '/', '[', or ']'."
            )));
        }
        if path.starts_with('.') || path.ends_with('.') || path.contains("..") {
            return Err(invalid_argument(format!(
                "Invalid field path \"{path}\". Paths must not start or end with '.', or contain '..'."
            )));
        }
        FieldPath::new(path.split('.'))
    }

    pub fn document_id() -> Self {
        Self {
            segments: vec!["__name__".to_string()],
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first_segment(&self) -> &str {
        &self.segments[0]
    }

    pub fn last_segment(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Returns a new path with `segment` appended.
    ///
    /// Fails when the segment is empty.
    pub fn child(&self, segment: impl Into<String>) -> FirestoreResult<Self> {
        let segment = segment.into();
        if segment.is_empty() {
            return Err(invalid_argument(format!(
                "Field names must not be empty (found under \"{}\").",
                self.canonical_string()
            )));
        }
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// Returns a new path made of this path's segments followed by `other`'s.
    pub fn append(&self, other: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() == 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns `true` when `other` starts with every segment of this path.
    /// Every path is a prefix of itself.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Dotted, unquoted representation used in messages.
    pub fn canonical_string(&self) -> String {
        self.segments.join(".")
    }

    /// Representation sent on the wire: segments that are not simple
    /// identifiers are wrapped in backticks.
    pub fn formatted_name(&self) -> String {
        self.segments
            .iter()
            .map(|segment| format_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn format_segment(segment: &str) -> String {
    if is_simple_segment(segment) {
        return segment.to_string();
    }
    let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

/// Trait that converts common user inputs into a validated [`FieldPath`].
///
/// Strings are parsed in dotted form; `FieldPath` values pass through.
pub trait IntoFieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath>;
}

impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self)
    }
}

impl<'a> IntoFieldPath for &'a FieldPath {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        Ok(self.clone())
    }
}

impl IntoFieldPath for String {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(&self)
    }
}

impl<'a> IntoFieldPath for &'a str {
    fn into_field_path(self) -> FirestoreResult<FieldPath> {
        FieldPath::from_dot_separated(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(value: &str) -> FieldPath {
        FieldPath::from_dot_separated(value).unwrap()
    }

    #[test]
    fn from_dot_path() {
        let field = path("foo.bar");
        assert_eq!(field.segments(), &["foo", "bar"]);
        assert_eq!(field.len(), 2);
        assert_eq!(field.last_segment(), "bar");
    }

    #[test]
    fn rejects_empty() {
        let err = FieldPath::from_dot_separated("").unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
        assert!(FieldPath::new(Vec::<String>::new()).is_err());
        assert!(FieldPath::new(["a", ""]).is_err());
    }

    #[test]
    fn rejects_malformed_dotted_paths() {
        for bad in [".a", "a.", "a..b", "a/b", "a*", "a[0]", "~a"] {
            assert!(FieldPath::from_dot_separated(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn explicit_segments_are_literal() {
        let field = FieldPath::new(["a.b", "c"]).unwrap();
        assert_eq!(field.len(), 2);
        assert_eq!(field.formatted_name(), "`a.b`.c");
    }

    #[test]
    fn prefix_is_reflexive_and_directional() {
        let a = path("a");
        let ab = path("a.b");
        assert!(a.is_prefix_of(&a));
        assert!(a.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
        assert!(!path("ab").is_prefix_of(&ab));
    }

    #[test]
    fn ordering_puts_prefixes_first() {
        let mut paths = vec![path("b"), path("a.b"), path("a"), path("a.a.z")];
        paths.sort();
        let rendered: Vec<_> = paths.iter().map(FieldPath::canonical_string).collect();
        assert_eq!(rendered, ["a", "a.a.z", "a.b", "b"]);
    }

    #[test]
    fn formats_wire_names() {
        assert_eq!(path("foo._bar1").formatted_name(), "foo._bar1");
        assert_eq!(FieldPath::new(["1st"]).unwrap().formatted_name(), "`1st`");
        assert_eq!(
            FieldPath::new(["back`tick"]).unwrap().formatted_name(),
            "`back\\`tick`"
        );
    }

    #[test]
    fn child_parent_and_append() {
        let base = path("a");
        let child = base.child("b").unwrap();
        assert_eq!(child, path("a.b"));
        assert_eq!(child.parent(), Some(base.clone()));
        assert_eq!(base.parent(), None);
        assert_eq!(base.append(&path("x.y")), path("a.x.y"));
        assert!(base.child("").is_err());
    }
}
