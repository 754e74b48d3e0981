//! `.json` files.
//!
//! The shape of the document is inferred from its values:
//!
//! ```text
//! {"name": "x", "address": {"city": "y"}, "tags": [{"id": 1}]}
//!   → class Foo { String name; Address address; List<TagsItem> tags;
//!                 class Address { String city; }
//!                 class TagsItem { long id; } }
//! ```

use serde_json::Value;

use crate::codegen::ClassBuilder;
use crate::diagnostic::{Diagnostic, DiagnosticSink, Position};
use crate::fqn::{capitalize, make_identifier, simple_name, FqnCache};
use crate::manifold::{GenError, GenResult, TypeManifold};
use crate::model::SingleFileModel;
use crate::vfs::File;

/// Inferred type of a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `null` or an empty array element; yields to any other shape.
    Null,
    /// JSON string.
    Text,
    /// JSON boolean.
    Boolean,
    /// Integral number.
    Integer,
    /// Non-integral number.
    Decimal,
    /// Values of incompatible shapes.
    Any,
    /// Array with a common element shape.
    List(Box<Shape>),
    /// Object, generated as a nested class.
    Object(ObjectShape),
}

/// A nested class inferred from one or more JSON objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    /// Class name, unique among its siblings and enclosing classes.
    pub class: String,
    /// Fields in the order their keys were first seen. serde_json yields the
    /// keys of each object sorted.
    pub fields: Vec<Field>,
}

/// One field of an [`ObjectShape`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Java identifier.
    pub name: String,
    /// JSON key the identifier was derived from.
    pub key: String,
    /// Merged shape of every value seen for the key.
    pub shape: Shape,
}

/// Parsed JSON document and its inferred shape.
#[derive(Debug)]
pub struct JsonDocument {
    root: Shape,
    decls: FqnCache<()>,
    warnings: Vec<Diagnostic>,
}

impl JsonDocument {
    /// Parse `text` as the resource behind `fqn`.
    pub fn parse(fqn: &str, text: &str) -> GenResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|err| {
            let position = Position::from_line_column(text, err.line(), err.column());
            GenError::malformed_at(fqn, err.to_string(), position)
        })?;

        let mut inference = Inference {
            fqn,
            warnings: Vec::new(),
        };
        let top = simple_name(fqn);
        let mut root = match &value {
            Value::Array(items) => Shape::List(Box::new(inference.elements(&format!("{top}Item"), items))),
            other => inference.infer(top, other),
        };
        name_classes(&mut root, top);

        let mut decls = FqnCache::new();
        declare(&root, "", true, &mut decls);
        Ok(Self {
            root,
            decls,
            warnings: inference.warnings,
        })
    }

    /// Inferred shape of the document root.
    pub fn root(&self) -> &Shape {
        &self.root
    }
}

struct Inference<'a> {
    fqn: &'a str,
    warnings: Vec<Diagnostic>,
}

impl Inference<'_> {
    fn infer(&mut self, class: &str, value: &Value) -> Shape {
        match value {
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Shape::Integer,
            Value::Number(_) => Shape::Decimal,
            Value::String(_) => Shape::Text,
            Value::Array(items) => Shape::List(Box::new(self.elements(&format!("{class}Item"), items))),
            Value::Object(map) => {
                let mut object = ObjectShape {
                    class: class.to_string(),
                    fields: Vec::new(),
                };
                for (key, value) in map {
                    let name = make_identifier(key);
                    let shape = self.infer(&capitalize(&name), value);
                    self.add_field(
                        &mut object,
                        Field {
                            name,
                            key: key.clone(),
                            shape,
                        },
                    );
                }
                Shape::Object(object)
            }
        }
    }

    fn elements(&mut self, class: &str, items: &[Value]) -> Shape {
        items.iter().fold(Shape::Null, |acc, item| {
            let shape = self.infer(class, item);
            self.merge(acc, shape)
        })
    }

    fn merge(&mut self, a: Shape, b: Shape) -> Shape {
        match (a, b) {
            (Shape::Null, other) | (other, Shape::Null) => other,
            (a, b) if a == b => a,
            (Shape::Integer | Shape::Decimal, Shape::Integer | Shape::Decimal) => Shape::Decimal,
            (Shape::List(a), Shape::List(b)) => Shape::List(Box::new(self.merge(*a, *b))),
            (Shape::Object(mut a), Shape::Object(b)) => {
                for field in b.fields {
                    self.add_field(&mut a, field);
                }
                Shape::Object(a)
            }
            _ => Shape::Any,
        }
    }

    fn add_field(&mut self, object: &mut ObjectShape, field: Field) {
        let Some(index) = object.fields.iter().position(|f| f.name == field.name) else {
            object.fields.push(field);
            return;
        };
        let existing = &mut object.fields[index];
        if existing.key == field.key {
            let prior = std::mem::replace(&mut existing.shape, Shape::Null);
            existing.shape = self.merge(prior, field.shape);
            return;
        }
        let message = format!(
            "keys `{}` and `{}` both map to `{}`; keeping `{}`",
            existing.key, field.key, field.name, existing.key
        );
        if !self.warnings.iter().any(|w| w.message == message) {
            self.warnings.push(Diagnostic::warning(self.fqn, message));
        }
    }
}

/// Rename nested classes that clash with a sibling or an enclosing class.
fn name_classes(root: &mut Shape, top: &str) {
    match root {
        Shape::Object(object) => name_nested(object, &mut Vec::new()),
        other => {
            if let Some(nested) = nested_object_mut(other) {
                nested.class = unique_class(&nested.class, &[top.to_string()], &[]);
                name_nested(nested, &mut vec![top.to_string()]);
            }
        }
    }
}

fn name_nested(object: &mut ObjectShape, enclosing: &mut Vec<String>) {
    enclosing.push(object.class.clone());
    let mut siblings = Vec::new();
    for field in &mut object.fields {
        if let Some(nested) = nested_object_mut(&mut field.shape) {
            nested.class = unique_class(&nested.class, enclosing, &siblings);
            siblings.push(nested.class.clone());
            name_nested(nested, enclosing);
        }
    }
    enclosing.pop();
}

fn unique_class(base: &str, enclosing: &[String], siblings: &[String]) -> String {
    let taken = |name: &String| enclosing.contains(name) || siblings.contains(name);
    let mut class = base.to_string();
    let mut n = 2;
    while taken(&class) {
        class = format!("{base}_{n}");
        n += 1;
    }
    class
}

fn declare(shape: &Shape, prefix: &str, top_level: bool, decls: &mut FqnCache<()>) {
    match shape {
        Shape::List(element) => declare(element, prefix, false, decls),
        Shape::Object(object) => {
            let path = if top_level {
                String::new()
            } else if prefix.is_empty() {
                object.class.clone()
            } else {
                format!("{prefix}.{}", object.class)
            };
            if !path.is_empty() {
                decls.add_name(&path);
            }
            for field in &object.fields {
                declare(&field.shape, &path, false, decls);
            }
        }
        _ => {}
    }
}

fn java_type(shape: &Shape, boxed: bool) -> String {
    match shape {
        Shape::Text => "String".to_string(),
        Shape::Boolean if boxed => "Boolean".to_string(),
        Shape::Boolean => "boolean".to_string(),
        Shape::Integer if boxed => "Long".to_string(),
        Shape::Integer => "long".to_string(),
        Shape::Decimal if boxed => "Double".to_string(),
        Shape::Decimal => "double".to_string(),
        Shape::Null | Shape::Any => "Object".to_string(),
        Shape::List(element) => format!("List<{}>", java_type(element, true)),
        Shape::Object(object) => object.class.clone(),
    }
}

fn uses_list(shape: &Shape) -> bool {
    match shape {
        Shape::List(_) => true,
        Shape::Object(object) => object.fields.iter().any(|field| uses_list(&field.shape)),
        _ => false,
    }
}

fn build_class(mut class: ClassBuilder, object: &ObjectShape) -> ClassBuilder {
    for field in &object.fields {
        class = class.field(&java_type(&field.shape, false), &field.name);
    }
    for field in &object.fields {
        if let Some(nested) = nested_object(&field.shape) {
            class = class.inner(build_class(ClassBuilder::nested(nested.class.as_str()), nested));
        }
    }
    class
}

fn nested_object(shape: &Shape) -> Option<&ObjectShape> {
    match shape {
        Shape::Object(object) => Some(object),
        Shape::List(element) => nested_object(element),
        _ => None,
    }
}

fn nested_object_mut(shape: &mut Shape) -> Option<&mut ObjectShape> {
    match shape {
        Shape::Object(object) => Some(object),
        Shape::List(element) => nested_object_mut(element),
        _ => None,
    }
}

/// Manifold for `.json` resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifold;

impl TypeManifold for JsonManifold {
    type Artifact = JsonDocument;

    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn parse(&self, fqn: &str, file: &File) -> GenResult<JsonDocument> {
        let text = file.read_to_string()?;
        JsonDocument::parse(fqn, &text)
    }

    fn declarations<'a>(&self, artifact: &'a JsonDocument) -> &'a FqnCache<()> {
        &artifact.decls
    }

    fn contribute(
        &self,
        fqn: &str,
        _existing: Option<&str>,
        model: &SingleFileModel<JsonDocument>,
        artifact: &JsonDocument,
        sink: &mut dyn DiagnosticSink,
    ) -> GenResult<String> {
        for warning in &artifact.warnings {
            sink.report(warning.clone());
        }

        let class = super::resource_class(fqn, model);
        let class = match &artifact.root {
            Shape::Object(object) => build_class(class, object),
            Shape::List(element) => {
                let class = class.field(&java_type(&artifact.root, false), "items");
                match nested_object(element) {
                    Some(nested) => class.inner(build_class(ClassBuilder::nested(nested.class.as_str()), nested)),
                    None => class,
                }
            }
            scalar => class.field(&java_type(scalar, false), "value"),
        };

        let mut unit = super::unit(fqn);
        if uses_list(&artifact.root) {
            unit = unit.import("java.util.List");
        }
        Ok(unit.class(class).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fqn::is_inner_type;

    #[test]
    fn test_object_shape() {
        let text = r#"{"name": "x", "age": 3, "score": 1.5, "ok": true, "address": {"city": "y"}}"#;
        let doc = JsonDocument::parse("ns.Person", text).unwrap();
        let Shape::Object(root) = doc.root() else {
            panic!("expected object");
        };
        let fields: Vec<_> = root.fields.iter().map(|f| f.name.as_str()).collect();
        // serde_json sorts keys.
        assert_eq!(fields, ["address", "age", "name", "ok", "score"]);
        assert!(is_inner_type(&doc.decls, "", "Address"));
        assert!(!is_inner_type(&doc.decls, "", "Name"));
    }

    #[test]
    fn test_arrays_of_objects_become_item_classes() {
        let text = r#"{"tags": [{"id": 1}, {"id": 2, "label": "b"}], "nums": [1, 2.5], "mixed": [1, "a"]}"#;
        let doc = JsonDocument::parse("ns.Foo", text).unwrap();
        let Shape::Object(root) = doc.root() else {
            panic!("expected object");
        };
        let Shape::List(tags) = field(root, "tags") else {
            panic!("expected list");
        };
        let Shape::Object(item) = tags.as_ref() else {
            panic!("expected object items");
        };
        assert_eq!(item.class, "TagsItem");
        assert_eq!(item.fields.len(), 2);
        assert_eq!(field(root, "nums"), &Shape::List(Box::new(Shape::Decimal)));
        assert_eq!(field(root, "mixed"), &Shape::List(Box::new(Shape::Any)));
        assert!(is_inner_type(&doc.decls, "", "TagsItem"));
    }

    #[test]
    fn test_top_level_array() {
        let doc = JsonDocument::parse("ns.Rows", r#"[{"a": {"b": 1}}]"#).unwrap();
        assert!(is_inner_type(&doc.decls, "", "RowsItem"));
        assert!(is_inner_type(&doc.decls, "", "RowsItem.A"));
    }

    #[test]
    fn test_syntax_error_position() {
        let err = JsonDocument::parse("ns.Bad", "{\n  \"a\": ,\n}").unwrap_err();
        match err {
            GenError::Malformed { position: Some(pos), .. } => assert_eq!(pos.line, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_colliding_keys_warn() {
        let doc = JsonDocument::parse("ns.C", r#"{"a-b": 1, "a_b": "x"}"#).unwrap();
        assert_eq!(doc.warnings.len(), 1);
        let Shape::Object(root) = doc.root() else {
            panic!("expected object");
        };
        assert_eq!(root.fields.len(), 1);
    }

    fn object(shape: &Shape) -> &ObjectShape {
        nested_object(shape).unwrap()
    }

    fn field<'a>(object: &'a ObjectShape, name: &str) -> &'a Shape {
        &object.fields.iter().find(|f| f.name == name).unwrap().shape
    }

    #[test]
    fn test_array_items_merge_nested_objects() {
        let doc = JsonDocument::parse("ns.Doc", r#"{"items": [{"o": {"a": 1}}, {"o": {"b": 2}}]}"#).unwrap();
        let item = object(field(object(doc.root()), "items"));
        let o = object(field(item, "o"));

        assert_eq!(o.class, "O");
        let names: Vec<_> = o.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(doc.warnings.is_empty());
        assert!(is_inner_type(&doc.decls, "", "ItemsItem.O"));
    }

    #[test]
    fn test_null_and_empty_yield_to_other_shapes() {
        let text = r#"{"rows": [{"v": null, "t": []}, {"v": "s", "t": [1]}, {"v": null}], "n": [null, 2]}"#;
        let doc = JsonDocument::parse("ns.Doc", text).unwrap();
        let root = object(doc.root());
        let row = object(field(root, "rows"));

        assert_eq!(field(row, "v"), &Shape::Text);
        assert_eq!(field(row, "t"), &Shape::List(Box::new(Shape::Integer)));
        assert_eq!(field(root, "n"), &Shape::List(Box::new(Shape::Integer)));
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_conflicting_scalars_widen() {
        let doc = JsonDocument::parse("ns.Doc", r#"[{"x": 1}, {"x": 1.5}, {"y": true}, {"y": "no"}]"#).unwrap();
        let item = object(doc.root());
        assert_eq!(field(item, "x"), &Shape::Decimal);
        assert_eq!(field(item, "y"), &Shape::Any);
    }

    #[test]
    fn test_nested_class_names_do_not_clash() {
        let doc = JsonDocument::parse("ns.Foo", r#"{"foo": {"foo": {"x": 1}}, "a": {"x": 1}, "A": {"y": 2}}"#).unwrap();
        let root = object(doc.root());

        assert_eq!(object(field(root, "A")).class, "A");
        assert_eq!(object(field(root, "a")).class, "A_2");
        let outer = object(field(root, "foo"));
        assert_eq!(outer.class, "Foo_2");
        assert_eq!(object(field(outer, "foo")).class, "Foo_3");
        assert!(is_inner_type(&doc.decls, "", "Foo_2.Foo_3"));

        let code = build_class(ClassBuilder::new("Foo"), root).build();
        assert!(code.contains("public final Foo_2 foo;"));
        assert!(!code.contains("public static class Foo {"));
    }

    #[test]
    fn test_generated_class() {
        let doc = JsonDocument::parse("ns.Foo", r#"{"id": 1, "child": {"tags": ["a"]}}"#).unwrap();
        let Shape::Object(root) = doc.root() else {
            panic!("expected object");
        };
        let code = build_class(ClassBuilder::new("Foo"), root).build();
        let expected = "\
public class Foo {
    public final Child child;
    public final long id;

    public static class Child {
        public final List<String> tags;
    }
}
";
        assert_eq!(code, expected);
        assert!(uses_list(doc.root()));
    }
}
