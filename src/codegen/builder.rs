//! Java class source builders.
//!
//! Members render in insertion order, so the same sequence of builder calls
//! always yields the same text.

use std::fmt::Write;

use super::source::ToJava;

const INDENT: &str = "    ";

enum Member {
    Field(String),
    Method { signature: String, body: Vec<String> },
    Class(ClassBuilder),
}

/// Builder for a (possibly nested) Java class declaration.
///
/// # Example
///
/// ```
/// use typeforge::codegen::{ClassBuilder, CompilationUnit};
///
/// let code = CompilationUnit::new("ns")
///     .class(
///         ClassBuilder::new("Foo")
///             .constant("String", "NAME", "foo")
///             .inner(ClassBuilder::nested("Row").field("String", "id")),
///     )
///     .build();
/// assert!(code.contains("public static class Row {"));
/// ```
pub struct ClassBuilder {
    name: String,
    modifiers: &'static str,
    doc: Option<String>,
    members: Vec<Member>,
}

impl ClassBuilder {
    /// A top-level `public class`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: "public",
            doc: None,
            members: Vec::new(),
        }
    }

    /// A `public static` nested class.
    pub fn nested(name: impl Into<String>) -> Self {
        Self {
            modifiers: "public static",
            ..Self::new(name)
        }
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a doc comment.
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Add a `public static final` constant (value converted via `ToJava`).
    pub fn constant<V: ToJava + ?Sized>(self, ty: &str, name: &str, value: &V) -> Self {
        let literal = value.to_java();
        self.constant_raw(ty, name, literal)
    }

    /// Add a `public static final` constant with a raw initializer.
    pub fn constant_raw(mut self, ty: &str, name: &str, init: impl AsRef<str>) -> Self {
        self.members.push(Member::Field(format!(
            "public static final {ty} {name} = {};",
            init.as_ref()
        )));
        self
    }

    /// Add a `public final` instance field.
    pub fn field(mut self, ty: &str, name: &str) -> Self {
        self.members.push(Member::Field(format!("public final {ty} {name};")));
        self
    }

    /// Add a method; `body` lines are indented one level.
    pub fn method<I, S>(mut self, signature: impl Into<String>, body: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.push(Member::Method {
            signature: signature.into(),
            body: body.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a nested class.
    pub fn inner(mut self, class: ClassBuilder) -> Self {
        self.members.push(Member::Class(class));
        self
    }

    /// Add a nested class in place.
    pub fn push_inner(&mut self, class: ClassBuilder) {
        self.members.push(Member::Class(class));
    }

    /// Whether no member has been added.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn render(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        if let Some(doc) = &self.doc {
            let _ = writeln!(out, "{pad}/** {} */", doc.replace("*/", "* /"));
        }
        let _ = writeln!(out, "{pad}{} class {} {{", self.modifiers, self.name);

        let inner = INDENT.repeat(depth + 1);
        for (i, member) in self.members.iter().enumerate() {
            let separate = i > 0 && !matches!((&self.members[i - 1], member), (Member::Field(_), Member::Field(_)));
            if separate {
                out.push('\n');
            }
            match member {
                Member::Field(line) => {
                    let _ = writeln!(out, "{inner}{line}");
                }
                Member::Method { signature, body } => {
                    let _ = writeln!(out, "{inner}{signature} {{");
                    for line in body {
                        let _ = writeln!(out, "{inner}{INDENT}{line}");
                    }
                    let _ = writeln!(out, "{inner}}}");
                }
                Member::Class(class) => class.render(out, depth + 1),
            }
        }
        let _ = writeln!(out, "{pad}}}");
    }

    /// Render the class declaration alone.
    pub fn build(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, 0);
        out
    }
}

/// One generated source file: package, imports and a top-level class.
pub struct CompilationUnit {
    package: String,
    header: Option<String>,
    imports: Vec<String>,
    class: Option<ClassBuilder>,
}

impl CompilationUnit {
    /// Start a unit in `package` (empty for the default package).
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            header: None,
            imports: Vec::new(),
            class: None,
        }
    }

    /// Leading line comment, e.g. the resource the unit was generated from.
    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.header = Some(text.into());
        self
    }

    /// Add an import; duplicates are ignored.
    pub fn import(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !self.imports.contains(&path) {
            self.imports.push(path);
        }
        self
    }

    /// Set the top-level class.
    pub fn class(mut self, class: ClassBuilder) -> Self {
        self.class = Some(class);
        self
    }

    /// Render the unit.
    pub fn build(self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            let _ = writeln!(out, "// {header}");
        }
        if !self.package.is_empty() {
            let _ = writeln!(out, "package {};\n", self.package);
        }
        for import in &self.imports {
            let _ = writeln!(out, "import {import};");
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }
        if let Some(class) = &self.class {
            class.render(&mut out, 0);
        }
        out
    }
}

/// Format items as a Java array initializer.
///
/// - Empty: `{}`
/// - Otherwise: `{a, b, c}`
pub fn format_array(items: Vec<String>) -> String {
    format!("{{{}}}", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_formatting() {
        assert_eq!(format_array(vec![]), "{}");
        assert_eq!(format_array(vec!["a".into()]), "{a}");
        assert_eq!(format_array(vec!["a".into(), "b".into()]), "{a, b}");
    }

    #[test]
    fn test_class_layout() {
        let code = ClassBuilder::new("Foo")
            .doc("Generated")
            .constant("String", "NAME", "x")
            .constant_raw("int", "COUNT", "2")
            .method("public static String name()", ["return NAME;"])
            .inner(ClassBuilder::nested("Bar").field("String", "id"))
            .build();

        let expected = "\
/** Generated */
public class Foo {
    public static final String NAME = \"x\";
    public static final int COUNT = 2;

    public static String name() {
        return NAME;
    }

    public static class Bar {
        public final String id;
    }
}
";
        assert_eq!(code, expected);
    }

    #[test]
    fn test_compilation_unit() {
        let code = CompilationUnit::new("a.b")
            .header("from Foo.csv")
            .import("java.util.List")
            .import("java.util.List")
            .class(ClassBuilder::new("Foo"))
            .build();
        assert_eq!(
            code,
            "// from Foo.csv\npackage a.b;\n\nimport java.util.List;\n\npublic class Foo {\n}\n"
        );
    }

    #[test]
    fn test_default_package() {
        let code = CompilationUnit::new("").class(ClassBuilder::new("Top")).build();
        assert_eq!(code, "public class Top {\n}\n");
    }
}
