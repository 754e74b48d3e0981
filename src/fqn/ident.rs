//! Identifier sanitizing for generated type names.

/// Reserved words of the generated language.
const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

/// Whether `name` is a reserved word.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Turn an arbitrary resource name into a legal identifier segment.
///
/// - reserved words get a trailing `_`
/// - a leading digit is prefixed with `_`
/// - every other non-identifier character becomes `_`
///
/// ```
/// use typeforge::fqn::make_identifier;
///
/// assert_eq!(make_identifier("my-file"), "my_file");
/// assert_eq!(make_identifier("1st"), "_1st");
/// assert_eq!(make_identifier("class"), "class_");
/// ```
pub fn make_identifier(name: &str) -> String {
    if is_reserved(name) {
        return format!("{name}_");
    }
    let mut out = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
            out.push(c);
        } else if c == '_' || c == '$' || c.is_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Whether a dotted name's first segment is a non-negative integer.
///
/// Such names denote anonymous or synthetic nested constructs.
pub fn is_anonymous(relative: &str) -> bool {
    let first = relative.split('.').next().unwrap_or("");
    !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit())
}

/// Upper-case the first character.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
