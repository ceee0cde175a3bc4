use crate::parameters::{ParameterValue, Value};
use std::any::TypeId;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// How much of the path a wildcard captures.
pub enum WildcardScope {
    /// Exactly one path segment (`*`).
    One,
    /// The current and every remaining path segment (`**`).
    All,
}

impl fmt::Display for WildcardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WildcardScope::One => f.write_str("*"),
            WildcardScope::All => f.write_str("**"),
        }
    }
}

#[derive(Copy, Clone)]
/// The type a parameter segment is decoded into.
///
/// Two parameter types are equal if they decode into the same Rust type,
/// regardless of the name they were declared with.
///
/// # Examples
/// ```rust
/// # use waypoint::ParameterType;
/// assert_eq!(ParameterType::named("int"), Some(ParameterType::of::<i64>()));
/// assert_eq!(ParameterType::named("s"), Some(ParameterType::string()));
/// assert!(ParameterType::named("nope").is_none());
/// ```
pub struct ParameterType {
    label: &'static str,
    id: TypeId,
    decode: fn(&str) -> Option<Value>,
}

fn decode_as<T: ParameterValue>(raw: &str) -> Option<Value> {
    T::decode(raw).map(Value::new)
}

const TEMPLATE_NAMES: [&str; 8] = ["string", "int", "i32", "uint", "u32", "float", "double", "bool"];

impl ParameterType {
    /// The parameter type decoding into `T`.
    ///
    /// Types that route templates can name are labeled with that name, so
    /// they print back into a template that parses; any other type is
    /// labeled with its Rust type name.  See [`ParameterType::labeled`].
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::ParameterType;
    /// assert_eq!(ParameterType::of::<u64>().label(), "uint");
    /// ```
    pub fn of<T: ParameterValue>() -> Self {
        let id = TypeId::of::<T>();
        TEMPLATE_NAMES
            .iter()
            .filter_map(|name| ParameterType::named(name))
            .find(|ty| ty.id == id)
            .unwrap_or_else(|| ParameterType::labeled::<T>(std::any::type_name::<T>()))
    }

    /// The parameter type decoding into `T`, displayed with the given label.
    pub fn labeled<T: ParameterValue>(label: &'static str) -> Self {
        ParameterType {
            label,
            id: TypeId::of::<T>(),
            decode: decode_as::<T>,
        }
    }

    /// The string parameter type, which captures text verbatim.
    pub fn string() -> Self {
        ParameterType::labeled::<String>("string")
    }

    /// Looks up a parameter type by the name used in route templates.
    pub fn named(name: &str) -> Option<Self> {
        let ty = match name {
            "str" | "s" | "string" => ParameterType::string(),
            "int" | "i64" => ParameterType::labeled::<i64>("int"),
            "i32" => ParameterType::labeled::<i32>("i32"),
            "uint" | "u64" => ParameterType::labeled::<u64>("uint"),
            "u32" => ParameterType::labeled::<u32>("u32"),
            "float" | "f32" => ParameterType::labeled::<f32>("float"),
            "double" | "f64" => ParameterType::labeled::<f64>("double"),
            "bool" => ParameterType::labeled::<bool>("bool"),
            _ => return None,
        };
        Some(ty)
    }

    /// Whether this type captures text verbatim.
    pub fn is_string(&self) -> bool {
        self.id == TypeId::of::<String>()
    }

    /// Decodes a value of this type from the given text.
    pub fn decode(&self, raw: &str) -> Option<Value> {
        (self.decode)(raw)
    }

    /// The name this type was declared with.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl PartialEq for ParameterType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParameterType {}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParameterType").field(&self.label).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single compiled piece of a route template.
pub enum Segment {
    /// Must equal the text exactly.
    Literal(String),
    /// Captures the text under the name, decoded as the given type.
    Parameter(String, ParameterType),
    /// Captures into the wildcard list.
    Wildcard(WildcardScope),
    /// Separates the path segments from the query segments.
    QuerySeparator,
}

impl Segment {
    /// A literal segment.
    pub fn literal(value: impl Into<String>) -> Self {
        Segment::Literal(value.into())
    }

    /// A string parameter segment.
    pub fn parameter(name: impl Into<String>) -> Self {
        Segment::Parameter(name.into(), ParameterType::string())
    }

    /// A parameter segment decoded as `T`.
    pub fn typed<T: ParameterValue>(name: impl Into<String>) -> Self {
        Segment::Parameter(name.into(), ParameterType::of::<T>())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(value) => f.write_str(value),
            Segment::Parameter(name, ty) if ty.is_string() => write!(f, ":{}", name),
            Segment::Parameter(name, ty) => write!(f, ":{}:{}", name, ty.label()),
            Segment::Wildcard(scope) => write!(f, "{}", scope),
            Segment::QuerySeparator => f.write_str("?"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Segment::literal("a"), Segment::Literal("a".into()));
        assert_ne!(Segment::literal("a"), Segment::literal("b"));
        assert_eq!(Segment::parameter("id"), Segment::typed::<String>("id"));
        assert_ne!(Segment::parameter("id"), Segment::typed::<i64>("id"));
        assert_ne!(Segment::typed::<i64>("id"), Segment::typed::<i64>("other"));
        assert_eq!(
            Segment::Wildcard(WildcardScope::One),
            Segment::Wildcard(WildcardScope::One)
        );
        assert_ne!(
            Segment::Wildcard(WildcardScope::One),
            Segment::Wildcard(WildcardScope::All)
        );
    }

    #[test]
    fn test_decode() {
        let ty = ParameterType::named("int").unwrap();
        assert_eq!(ty.decode("-12").and_then(|v| v.cast::<i64>()), Some(-12));
        assert!(ty.decode("abc").is_none());
        assert!(ParameterType::named("uint").unwrap().decode("-1").is_none());
        assert!(ParameterType::string().decode("").is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(Segment::typed::<i64>("id").to_string(), ":id:int");
        assert_eq!(Segment::typed::<f64>("x").to_string(), ":x:double");
        assert_eq!(Segment::typed::<String>("name").to_string(), ":name");
        assert_eq!(
            Segment::Parameter("id".into(), ParameterType::named("int").unwrap()).to_string(),
            ":id:int"
        );
        assert_eq!(Segment::Wildcard(WildcardScope::All).to_string(), "**");
    }

    #[test]
    fn test_of_uses_template_names() {
        for name in TEMPLATE_NAMES {
            let ty = ParameterType::named(name).unwrap();
            assert_eq!(ty.label(), name);
        }
        assert_eq!(ParameterType::of::<bool>().label(), "bool");
        assert_eq!(ParameterType::of::<i32>(), ParameterType::named("i32").unwrap());
    }
}
