//! `.properties` files.
//!
//! Dotted keys nest: `greeting.morning=Hi` becomes
//! `greeting` (inner class) → `morning` (constant). A key that is both a
//! value and a prefix of other keys gets a `getValue()` on its class.

use crate::codegen::{ClassBuilder, ToJava};
use crate::diagnostic::{DiagnosticSink, Position};
use crate::fqn::{make_identifier, FqnCache, NodeRef};
use crate::manifold::{GenError, GenResult, TypeManifold};
use crate::model::SingleFileModel;
use crate::vfs::File;

/// Parsed properties: values keyed by sanitized dotted key.
#[derive(Debug)]
pub struct PropertySet {
    values: FqnCache<String>,
    decls: FqnCache<()>,
}

impl PropertySet {
    /// Parse properties text on behalf of `fqn`.
    pub fn parse(fqn: &str, text: &str) -> GenResult<Self> {
        let mut values = FqnCache::with_sanitizer(make_identifier);
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line.text);
            let key = unescape(key).map_err(|at| bad_escape(fqn, text, line.source_offset(at)))?;
            let value_start = line.text.len() - value.len();
            let value = unescape(value)
                .map_err(|at| bad_escape(fqn, text, line.source_offset(value_start + at)))?;
            if !key.is_empty() {
                values.add(&key, value);
            }
        }

        let mut decls = FqnCache::new();
        values.root().visit_depth_first(&mut |node| {
            if node.id() != values.root().id() && !node.is_leaf() {
                decls.add_name(&node.fqn());
            }
            true
        });
        Ok(Self { values, decls })
    }

    /// Value of a (sanitized) dotted key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Every key with a value.
    pub fn keys(&self) -> Vec<String> {
        self.values.entries().into_iter().map(|(key, _)| key).collect()
    }
}

fn bad_escape(fqn: &str, text: &str, offset: usize) -> GenError {
    GenError::malformed_at(fqn, "malformed \\uXXXX escape", Position::from_offset(text, offset))
}

/// A line after joining continuations.
struct LogicalLine {
    text: String,
    /// `(offset in text, offset in source)` where each physical piece starts.
    pieces: Vec<(usize, usize)>,
}

impl LogicalLine {
    /// Source byte offset of byte `at` of the joined text.
    fn source_offset(&self, at: usize) -> usize {
        let (logical, source) = self
            .pieces
            .iter()
            .rev()
            .find(|(logical, _)| *logical <= at)
            .copied()
            .unwrap_or((0, 0));
        source + (at - logical)
    }
}

/// Join continuation lines and drop comments.
fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<LogicalLine> = None;
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        let body = line.trim_start();
        let mut logical = match pending.take() {
            Some(logical) => logical,
            None if body.is_empty() || body.starts_with(['#', '!']) => continue,
            None => LogicalLine {
                text: String::new(),
                pieces: Vec::new(),
            },
        };
        logical.pieces.push((logical.text.len(), start + line.len() - body.len()));
        let slashes = body.len() - body.trim_end_matches('\\').len();
        if slashes % 2 == 1 {
            logical.text.push_str(&body[..body.len() - 1]);
            pending = Some(logical);
        } else {
            logical.text.push_str(body);
            out.push(logical);
        }
    }
    out.extend(pending);
    out
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\u{c}' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }
    let blank = [' ', '\t', '\u{c}'];
    let mut rest = line[key_end..].trim_start_matches(blank);
    if let Some(after) = rest.strip_prefix(['=', ':']) {
        rest = after.trim_start_matches(blank);
    }
    (&line[..key_end], rest)
}

/// Resolve escapes. On failure returns the byte index of the bad escape.
fn unescape(raw: &str) -> Result<String, usize> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, 't')) => out.push('\t'),
            Some((_, 'n')) => out.push('\n'),
            Some((_, 'r')) => out.push('\r'),
            Some((_, 'f')) => out.push('\u{c}'),
            Some((_, 'u')) => {
                let high = hex4(&mut chars).ok_or(i)?;
                let code = if (0xD800..0xDC00).contains(&high) {
                    let low = match (chars.next(), chars.next()) {
                        (Some((_, '\\')), Some((_, 'u'))) => hex4(&mut chars).ok_or(i)?,
                        _ => return Err(i),
                    };
                    0x10000 + ((high - 0xD800) << 10) + low.checked_sub(0xDC00).ok_or(i)?
                } else {
                    high
                };
                out.push(char::from_u32(code).ok_or(i)?);
            }
            Some((_, other)) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn hex4(chars: &mut impl Iterator<Item = (usize, char)>) -> Option<u32> {
    let mut code = 0;
    for _ in 0..4 {
        code = code * 16 + chars.next()?.1.to_digit(16)?;
    }
    Some(code)
}

/// Manifold for `.properties` resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertiesManifold;

impl TypeManifold for PropertiesManifold {
    type Artifact = PropertySet;

    fn name(&self) -> &'static str {
        "properties"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["properties"]
    }

    fn parse(&self, fqn: &str, file: &File) -> GenResult<PropertySet> {
        let text = file.read_to_string()?;
        PropertySet::parse(fqn, &text)
    }

    fn declarations<'a>(&self, artifact: &'a PropertySet) -> &'a FqnCache<()> {
        &artifact.decls
    }

    fn contribute(
        &self,
        fqn: &str,
        _existing: Option<&str>,
        model: &SingleFileModel<PropertySet>,
        artifact: &PropertySet,
        _sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        let class = build_class(super::resource_class(fqn, model), artifact.values.root(), true);
        Ok(super::unit(fqn).class(class).build())
    }
}

fn build_class(mut class: ClassBuilder, node: NodeRef<'_, String>, top_level: bool) -> ClassBuilder {
    for child in node.children() {
        if let (true, Some(value)) = (child.is_leaf(), child.payload()) {
            class = class.constant("String", child.name(), value);
        }
    }

    if !top_level {
        if let Some(value) = node.payload() {
            class = class.method("public static String getValue()", [format!("return {};", value.to_java())]);
        }
    }

    let cases: Vec<String> = node
        .children()
        .filter_map(|child| {
            let value = child.payload()?;
            Some(format!("    case {}: return {};", child.name().to_java(), value.to_java()))
        })
        .collect();
    if !cases.is_empty() {
        let mut body = vec!["switch (propertyName) {".to_string()];
        body.extend(cases);
        body.push("}".to_string());
        body.push("return null;".to_string());
        class = class.method("public static String getValueByName(String propertyName)", body);
    }

    for child in node.children().filter(|child| !child.is_leaf()) {
        class = class.inner(build_class(ClassBuilder::nested(child.name()), child, false));
    }
    class
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fqn::is_inner_type;

    #[test]
    fn test_separators_and_comments() {
        let text = "# comment\n! also\nplain=one\ncolon: two\nspaced   three\n  indented = four\n";
        let props = PropertySet::parse("ns.P", text).unwrap();
        assert_eq!(props.get("plain"), Some("one"));
        assert_eq!(props.get("colon"), Some("two"));
        assert_eq!(props.get("spaced"), Some("three"));
        assert_eq!(props.get("indented"), Some("four"));
        assert_eq!(props.keys().len(), 4);
    }

    #[test]
    fn test_continuation_and_escapes() {
        let text = "long=first \\\n    second\nesc=tab\\there\\u0041\nkey\\=x=y\nemoji=\\uD83D\\uDE00\n";
        let props = PropertySet::parse("ns.P", text).unwrap();
        assert_eq!(props.get("long"), Some("first second"));
        assert_eq!(props.get("esc"), Some("tab\thereA"));
        assert_eq!(props.get("key_x"), Some("y"));
        assert_eq!(props.get("emoji"), Some("\u{1F600}"));
    }

    #[test]
    fn test_bad_unicode_escape_is_positioned() {
        let text = "ok=1\nbad=\\u12G4\n";
        let err = PropertySet::parse("ns.P", text).unwrap_err();
        match err {
            GenError::Malformed { position: Some(pos), .. } => {
                assert_eq!(pos.line, 2);
                assert_eq!(pos.column, 5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_escape_after_continuation_points_at_its_line() {
        let text = "ok=1\nlong=a \\\n  \\u12G4\n";
        let err = PropertySet::parse("ns.P", text).unwrap_err();
        match err {
            GenError::Malformed { position: Some(pos), .. } => {
                assert_eq!(pos.line, 3);
                assert_eq!(pos.column, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nested_keys_become_declarations() {
        let text = "greeting=Hello\ngreeting.morning=Good morning\nmenu.file.open=Open\nclass=reserved\n";
        let props = PropertySet::parse("ns.P", text).unwrap();
        assert_eq!(props.get("class_"), Some("reserved"));
        assert!(is_inner_type(&props.decls, "", "greeting"));
        assert!(is_inner_type(&props.decls, "", "menu.file"));
        assert!(!is_inner_type(&props.decls, "", "menu.file.open"));
        assert!(!is_inner_type(&props.decls, "", "class_"));
    }

    #[test]
    fn test_class_shape() {
        let text = "title=Main\ngreeting=Hello\ngreeting.morning=Good morning\n";
        let props = PropertySet::parse("ns.P", text).unwrap();
        let code = build_class(ClassBuilder::new("P"), props.values.root(), true).build();

        let expected = r#"public class P {
    public static final String title = "Main";

    public static String getValueByName(String propertyName) {
        switch (propertyName) {
            case "title": return "Main";
            case "greeting": return "Hello";
        }
        return null;
    }

    public static class greeting {
        public static final String morning = "Good morning";

        public static String getValue() {
            return "Hello";
        }

        public static String getValueByName(String propertyName) {
            switch (propertyName) {
                case "morning": return "Good morning";
            }
            return null;
        }
    }
}
"#;
        assert_eq!(code, expected);
    }
}
