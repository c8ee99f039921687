use crate::route_tree::PathMatcher;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Trailing part of a mount pattern: optional slash followed by a boundary lookahead.
static MOUNT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\/)?\?(\(\?=\\/\|\$\))$|(\\/\?)?\$$").unwrap());

/// Capture group emitted for a named path parameter.
static PARAM_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\?:\(\[\^\\/\]\+\?\)\)").unwrap());

/// Characters that leave a pattern without a literal reading once escapes are removed.
const REGEX_META: &str = "^$()[]{}*+?|";

/// A compiled path template.
///
/// `opaque` templates contain at least one pattern segment that could not be turned back
/// into literal text. They never compare equal to a literal template and exporters keep
/// them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompiledPath {
    pub template: String,
    pub opaque: bool,
}

impl CompiledPath {
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Converts the matchers collected while descending the route tree into a template.
pub struct PathCompiler;

impl PathCompiler {
    /// Compile matchers in descent order.
    ///
    /// Segments are joined with `/`, runs of separators collapse into one, a trailing
    /// separator is dropped and `:param` syntax is kept as is. Never fails.
    pub fn compile<'a, I>(segments: I) -> CompiledPath
    where
        I: IntoIterator<Item = &'a PathMatcher>,
    {
        let mut parts: Vec<String> = Vec::new();
        let mut opaque = false;

        for segment in segments {
            match segment {
                PathMatcher::Literal(template) => Self::push_literal(&mut parts, template),
                PathMatcher::Pattern { source, keys } => match Self::recover_literal(source, keys) {
                    Some(literal) => Self::push_literal(&mut parts, &literal),
                    None => {
                        opaque = true;
                        parts.push(Self::opaque_marker(source));
                    }
                },
            }
        }

        CompiledPath {
            template: format!("/{}", parts.join("/")),
            opaque,
        }
    }

    /// Marker used for a pattern without a literal form
    pub fn opaque_marker(source: &str) -> String {
        format!("<regexp:{}>", source)
    }

    fn push_literal(parts: &mut Vec<String>, template: &str) {
        parts.extend(
            template
                .split('/')
                .filter(|part| !part.is_empty())
                .map(str::to_string),
        );
    }

    /// Try to read a mount or route pattern back as a literal template.
    ///
    /// Understands anchored patterns of the form `^\/users\/(?:([^\/]+?))\/?(?=\/|$)`,
    /// where each parameter group takes its name from `keys` in order.
    fn recover_literal(source: &str, keys: &[String]) -> Option<String> {
        let body = source.strip_prefix('^')?;
        let body = MOUNT_SUFFIX.replace(body, "");

        if PARAM_GROUP.find_iter(&body).count() != keys.len() {
            return None;
        }

        let mut names = keys.iter();
        let with_params = PARAM_GROUP.replace_all(&body, |_: &regex::Captures| {
            names
                .next()
                .map(|name| format!(":{}", name))
                .unwrap_or_default()
        });

        let mut literal = String::with_capacity(with_params.len());
        let mut chars = with_params.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(escaped @ ('/' | '.' | '-')) => literal.push(escaped),
                    _ => return None,
                }
            } else if REGEX_META.contains(c) {
                return None;
            } else {
                literal.push(c);
            }
        }

        Some(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> PathMatcher {
        PathMatcher::Literal(s.to_string())
    }

    fn pattern(source: &str, keys: &[&str]) -> PathMatcher {
        PathMatcher::Pattern {
            source: source.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_joins_prefix_and_parameter() {
        let path = PathCompiler::compile(&[lit("/api"), lit(":id")]);
        assert_eq!(path.template, "/api/:id");
        assert!(!path.opaque);
    }

    #[test]
    fn test_collapses_duplicate_separators() {
        let path = PathCompiler::compile(&[lit("/api/"), lit("/:id")]);
        assert_eq!(path.template, "/api/:id");
    }

    #[test]
    fn test_collapses_runs_inside_a_segment() {
        let path = PathCompiler::compile(&[lit("//v1///users//")]);
        assert_eq!(path.template, "/v1/users");
    }

    #[test]
    fn test_empty_input_is_root() {
        let path = PathCompiler::compile(&Vec::<PathMatcher>::new());
        assert_eq!(path.template, "/");
        let path = PathCompiler::compile(&[lit("/"), lit("")]);
        assert_eq!(path.template, "/");
    }

    #[test]
    fn test_recovers_mount_pattern() {
        let path = PathCompiler::compile(&[pattern(r"^\/api\/?(?=\/|$)", &[]), lit("/users")]);
        assert_eq!(path.template, "/api/users");
        assert!(!path.opaque);
    }

    #[test]
    fn test_recovers_fast_slash_pattern() {
        let path = PathCompiler::compile(&[pattern(r"^\/?(?=\/|$)", &[]), lit("/health")]);
        assert_eq!(path.template, "/health");
    }

    #[test]
    fn test_recovers_parameter_groups_from_keys() {
        let path = PathCompiler::compile(&[
            pattern(r"^\/orgs\/(?:([^\/]+?))\/?(?=\/|$)", &["orgId"]),
            lit("/members/:memberId"),
        ]);
        assert_eq!(path.template, "/orgs/:orgId/members/:memberId");
        assert!(!path.opaque);
    }

    #[test]
    fn test_unrecoverable_pattern_is_opaque() {
        let path = PathCompiler::compile(&[lit("/files"), pattern(r"^\/(\d+)\.json$", &[])]);
        assert!(path.opaque);
        assert_eq!(path.template, r"/files/<regexp:^\/(\d+)\.json$>");
    }

    #[test]
    fn test_key_count_mismatch_is_opaque() {
        let path = PathCompiler::compile(&[pattern(r"^\/a\/(?:([^\/]+?))\/?(?=\/|$)", &[])]);
        assert!(path.opaque);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let segments = vec![lit("/a"), pattern(r"^\/b\/?(?=\/|$)", &[]), lit(":c")];
        assert_eq!(PathCompiler::compile(&segments), PathCompiler::compile(&segments));
    }
}
