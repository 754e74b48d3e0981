//! Java source literals from Rust values.

/// Convert a Rust value to a Java source literal.
///
/// # Example
///
/// ```
/// use typeforge::codegen::ToJava;
///
/// assert_eq!("hello".to_java(), r#""hello""#);
/// assert_eq!(42i64.to_java(), "42L");
/// assert_eq!(true.to_java(), "true");
/// ```
pub trait ToJava {
    /// Generate the Java source representation.
    fn to_java(&self) -> String;
}

// ---------------------------------------------------------------------------
// Primitive implementations
// ---------------------------------------------------------------------------

impl ToJava for str {
    fn to_java(&self) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        for c in self.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }
}

impl ToJava for &str {
    fn to_java(&self) -> String {
        (*self).to_java()
    }
}

impl ToJava for String {
    fn to_java(&self) -> String {
        self.as_str().to_java()
    }
}

impl ToJava for i64 {
    fn to_java(&self) -> String {
        format!("{self}L")
    }
}

impl ToJava for f64 {
    fn to_java(&self) -> String {
        if self.is_nan() {
            "Double.NaN".to_string()
        } else if self.is_infinite() {
            let sign = if *self > 0.0 { "POSITIVE" } else { "NEGATIVE" };
            format!("Double.{sign}_INFINITY")
        } else {
            let text = self.to_string();
            if text.contains(['.', 'e', 'E']) {
                text
            } else {
                format!("{text}.0")
            }
        }
    }
}

impl ToJava for bool {
    fn to_java(&self) -> String {
        self.to_string()
    }
}

impl<T: ToJava> ToJava for Option<T> {
    fn to_java(&self) -> String {
        match self {
            Some(v) => v.to_java(),
            None => "null".to_string(),
        }
    }
}

impl<T: ToJava> ToJava for [T] {
    fn to_java(&self) -> String {
        let items: Vec<_> = self.iter().map(ToJava::to_java).collect();
        super::builder::format_array(items)
    }
}

impl<T: ToJava> ToJava for Vec<T> {
    fn to_java(&self) -> String {
        self.as_slice().to_java()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string() {
        assert_eq!("hello".to_java(), r#""hello""#);
        assert_eq!("with \"quotes\"".to_java(), r#""with \"quotes\"""#);
        assert_eq!("a\\b\nc".to_java(), r#""a\\b\nc""#);
        assert_eq!("\u{1}".to_java(), r#""\u0001""#);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(42i64.to_java(), "42L");
        assert_eq!(3.5f64.to_java(), "3.5");
        assert_eq!(2f64.to_java(), "2.0");
        assert_eq!(f64::NAN.to_java(), "Double.NaN");
        assert_eq!(f64::NEG_INFINITY.to_java(), "Double.NEGATIVE_INFINITY");
    }

    #[test]
    fn test_option() {
        assert_eq!(Some("hello").to_java(), r#""hello""#);
        assert_eq!(None::<String>.to_java(), "null");
    }

    #[test]
    fn test_array() {
        let items: Vec<&str> = vec!["a", "b"];
        assert_eq!(items.to_java(), r#"{"a", "b"}"#);
        let empty: Vec<&str> = vec![];
        assert_eq!(empty.to_java(), "{}");
    }
}
