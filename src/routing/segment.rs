//! Route template compilation and per-segment matching.
//!
//! # Template grammar
//! ```text
//! template  := "*" | "/" | segment ("/" segment)*
//! segment   := literal | literal? marker (literal marker)* literal?
//! marker    := "<:" name ">"
//! ```
//!
//! Templates are compiled once at registration into [`SegmentTemplate`]s, so
//! matching never re-parses marker syntax on the request path.

use percent_encoding::percent_decode_str;

use crate::error::RegistrationError;
use crate::routing::path::{find_with_case, eq_with_case, strip_prefix_with_case, strip_suffix_with_case};

const MARKER_OPEN: &str = "<:";
const MARKER_CLOSE: char = '>';

/// Parameter values captured for one match.
///
/// Insertion-ordered; assigning an existing name overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `name`, replacing any earlier value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-decoded value. `None` when absent or not valid UTF-8 once decoded.
    pub fn decoded(&self, name: &str) -> Option<String> {
        let raw = self.get(name)?;
        percent_decode_str(raw)
            .decode_utf8()
            .ok()
            .map(|v| v.into_owned())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One piece of a parameterized segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param(String),
}

/// A compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentTemplate {
    /// Plain text compared against the whole request segment.
    Literal(String),
    /// At least one parameter marker, never two markers back to back.
    Pattern(Vec<Token>),
}

impl SegmentTemplate {
    /// Compile one template segment. `template` is the full route template,
    /// used for error reporting.
    pub fn compile(raw: &str, template: &str) -> Result<Self, RegistrationError> {
        if !raw.contains(MARKER_OPEN) {
            if raw.contains(MARKER_CLOSE) && raw.contains('<') {
                return Err(RegistrationError::malformed(template, format!("stray marker syntax in {raw:?}")));
            }
            return Ok(Self::Literal(raw.to_string()));
        }

        let mut tokens = Vec::new();
        let mut rest = raw;
        while let Some(start) = rest.find(MARKER_OPEN) {
            let literal = &rest[..start];
            if !literal.is_empty() {
                tokens.push(Token::Literal(literal.to_string()));
            } else if matches!(tokens.last(), Some(Token::Param(_))) {
                return Err(RegistrationError::malformed(
                    template,
                    format!("parameters in {raw:?} need a literal separator between them"),
                ));
            }

            let after_open = &rest[start + MARKER_OPEN.len()..];
            let end = after_open.find(MARKER_CLOSE).ok_or_else(|| {
                RegistrationError::malformed(template, format!("unterminated parameter in {raw:?}"))
            })?;
            let name = &after_open[..end];
            if name.is_empty() {
                return Err(RegistrationError::malformed(template, "parameter name is empty"));
            }
            if name.contains(['<', ':']) {
                return Err(RegistrationError::malformed(
                    template,
                    format!("invalid parameter name {name:?}"),
                ));
            }
            tokens.push(Token::Param(name.to_string()));
            rest = &after_open[end + 1..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }

        Ok(Self::Pattern(tokens))
    }

    /// Match one request segment, staging captured values into `params`.
    ///
    /// Returns `false` when the segment does not match; the caller abandons
    /// the whole route in that case.
    pub fn matches(&self, segment: &str, case_sensitive: bool, params: &mut Params) -> bool {
        match self {
            Self::Literal(text) => eq_with_case(text, segment, case_sensitive),
            Self::Pattern(tokens) => match_pattern(tokens, segment, case_sensitive, params),
        }
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        let tokens: &[Token] = match self {
            Self::Literal(_) => &[],
            Self::Pattern(tokens) => tokens,
        };
        tokens.iter().filter_map(|t| match t {
            Token::Param(name) => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }
}

fn match_pattern(tokens: &[Token], segment: &str, case_sensitive: bool, params: &mut Params) -> bool {
    let mut tokens = tokens;
    let mut rest = segment;

    if let Some((Token::Literal(prefix), tail)) = tokens.split_first() {
        match strip_prefix_with_case(rest, prefix, case_sensitive) {
            Some(r) => rest = r,
            None => return false,
        }
        tokens = tail;
    }
    if let Some((Token::Literal(suffix), head)) = tokens.split_last() {
        match strip_suffix_with_case(rest, suffix, case_sensitive) {
            Some(r) => rest = r,
            None => return false,
        }
        tokens = head;
    }

    // What is left alternates Param, Literal, Param, ..., Param.
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        let Token::Param(name) = token else {
            return false;
        };
        match iter.next() {
            Some(Token::Literal(separator)) => {
                let Some(at) = find_with_case(rest, separator, case_sensitive) else {
                    return false;
                };
                params.insert(name.as_str(), &rest[..at]);
                rest = &rest[at + separator.len()..];
            }
            Some(Token::Param(_)) => return false,
            None => {
                params.insert(name.as_str(), rest);
                rest = "";
            }
        }
    }
    true
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTemplate {
    /// `*`: any path of any length.
    CatchAll,
    /// Fixed segment count; zero segments is the root route `/`.
    Segments(Vec<SegmentTemplate>),
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, RegistrationError> {
        if template.trim().is_empty() {
            return Err(RegistrationError::EmptyTemplate);
        }

        let raw: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        if raw.as_slice() == ["*"] {
            return Ok(Self::CatchAll);
        }
        if raw.contains(&"*") {
            return Err(RegistrationError::malformed(
                template,
                "`*` must be the only segment of a catch-all route",
            ));
        }

        let segments = raw
            .into_iter()
            .map(|s| SegmentTemplate::compile(s, template))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Segments(segments))
    }

    /// Match the request path, returning the captured parameters.
    pub fn match_path(&self, segments: &[String], case_sensitive: bool) -> Option<Params> {
        let mut params = Params::new();
        match self {
            Self::CatchAll => Some(params),
            Self::Segments(templates) => {
                if templates.len() != segments.len() {
                    return None;
                }
                for (template, segment) in templates.iter().zip(segments) {
                    if !template.matches(segment, case_sensitive, &mut params) {
                        return None;
                    }
                }
                Some(params)
            }
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::CatchAll)
    }

    /// Every parameter name across all segments, in declaration order.
    pub fn param_names(&self) -> Vec<&str> {
        match self {
            Self::CatchAll => Vec::new(),
            Self::Segments(templates) => templates.iter().flat_map(|t| t.param_names()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(path: &str) -> Vec<String> {
        crate::routing::path::split_segments(path)
    }

    #[test]
    fn test_literal_segment() {
        let t = SegmentTemplate::compile("users", "/users").unwrap();
        let mut params = Params::new();
        assert!(t.matches("users", true, &mut params));
        assert!(!t.matches("Users", true, &mut params));
        assert!(t.matches("Users", false, &mut params));
        assert!(params.is_empty());
    }

    #[test]
    fn test_single_param() {
        let template = PathTemplate::compile("/users/<:id>").unwrap();
        let params = template.match_path(&segments("/users/42"), false).unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_separated_params() {
        let template = PathTemplate::compile("/archive/<:y>-<:m>").unwrap();
        let params = template.match_path(&segments("/archive/2024-07"), false).unwrap();
        assert_eq!(params.get("y"), Some("2024"));
        assert_eq!(params.get("m"), Some("07"));

        // Missing separator fails the whole route.
        assert!(template.match_path(&segments("/archive/202407"), false).is_none());
    }

    #[test]
    fn test_last_param_takes_remainder() {
        let template = PathTemplate::compile("/<:name>.<:ext>").unwrap();
        let params = template.match_path(&segments("/archive.tar.gz"), false).unwrap();
        assert_eq!(params.get("name"), Some("archive"));
        assert_eq!(params.get("ext"), Some("tar.gz"));
    }

    #[test]
    fn test_prefix_and_suffix_literals() {
        let template = PathTemplate::compile("/v<:version>/<:id>.json").unwrap();
        let params = template.match_path(&segments("/v2/abc.json"), true).unwrap();
        assert_eq!(params.get("version"), Some("2"));
        assert_eq!(params.get("id"), Some("abc"));

        assert!(template.match_path(&segments("/x2/abc.json"), true).is_none());
        assert!(template.match_path(&segments("/v2/abc.xml"), true).is_none());
        assert!(template.match_path(&segments("/V2/abc.JSON"), false).is_some());
    }

    #[test]
    fn test_case_insensitive_separator_keeps_value_case() {
        let template = PathTemplate::compile("/<:a>X<:b>").unwrap();
        let params = template.match_path(&segments("/FooxBar"), false).unwrap();
        assert_eq!(params.get("a"), Some("Foo"));
        assert_eq!(params.get("b"), Some("Bar"));
        assert!(template.match_path(&segments("/FooxBar"), true).is_none());
    }

    #[test]
    fn test_duplicate_names_overwrite() {
        let template = PathTemplate::compile("/<:id>/<:id>").unwrap();
        let params = template.match_path(&segments("/first/second"), false).unwrap();
        assert_eq!(params.get("id"), Some("second"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_segment_count_must_match() {
        let template = PathTemplate::compile("/users/<:id>").unwrap();
        assert!(template.match_path(&segments("/users"), false).is_none());
        assert!(template.match_path(&segments("/users/1/posts"), false).is_none());
    }

    #[test]
    fn test_catch_all() {
        let template = PathTemplate::compile("*").unwrap();
        assert!(template.is_catch_all());
        assert!(template.match_path(&[], false).is_some());
        assert!(template.match_path(&segments("/a/b/c/d"), true).is_some());
        assert_eq!(PathTemplate::compile("/*").unwrap(), PathTemplate::CatchAll);
    }

    #[test]
    fn test_root_template() {
        let template = PathTemplate::compile("/").unwrap();
        assert_eq!(template, PathTemplate::Segments(vec![]));
        assert!(template.match_path(&[], false).is_some());
        assert!(template.match_path(&segments("/a"), false).is_none());
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(PathTemplate::compile(""), Err(RegistrationError::EmptyTemplate)));
        for bad in ["/a/<:id", "/<:>", "/<:a><:b>", "/a/*/b", "/<:a<:b>>"] {
            assert!(
                matches!(PathTemplate::compile(bad), Err(RegistrationError::MalformedTemplate { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_decoded_param() {
        let template = PathTemplate::compile("/files/<:name>").unwrap();
        let params = template.match_path(&segments("/files/my%20report.pdf"), false).unwrap();
        assert_eq!(params.get("name"), Some("my%20report.pdf"));
        assert_eq!(params.decoded("name").as_deref(), Some("my report.pdf"));
        assert_eq!(params.decoded("missing"), None);
    }

    #[test]
    fn test_param_names() {
        let t = SegmentTemplate::compile("<:y>-<:m>", "/<:y>-<:m>").unwrap();
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["y", "m"]);

        let path = PathTemplate::compile("/archive/<:y>-<:m>/<:slug>.html").unwrap();
        assert_eq!(path.param_names(), vec!["y", "m", "slug"]);
        assert!(PathTemplate::compile("*").unwrap().param_names().is_empty());
    }
}
