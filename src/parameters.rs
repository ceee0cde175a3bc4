use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A value that can be captured from a path or query and stored in
/// [`Parameters`].
///
/// A value must be decodable from the text of a URL, and must be able to
/// produce a canonical text form of itself.  The canonical form is what a
/// value is re-decoded from when it is read back as a different type.
///
/// This is implemented for [`String`], the integer and floating point
/// primitives, [`bool`], and [`Vec`]s of those (comma separated).
pub trait ParameterValue: Send + Sync + fmt::Debug + 'static {
    /// Attempts to decode the value from the given text.
    fn decode(raw: &str) -> Option<Self>
    where
        Self: Sized;

    /// The canonical text form of the value.
    fn encode(&self) -> String;

    /// Returns the value as [`Any`], for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts the value into JSON.  This defaults to the canonical text form.
    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.encode())
    }
}

macro_rules! parameter_value {
    ($($ty:ty => $json:ident),+ $(,)?) => {
        $(
            impl ParameterValue for $ty {
                fn decode(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }

                fn encode(&self) -> String {
                    self.to_string()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn to_json(&self) -> serde_json::Value {
                    serde_json::Value::$json((*self).into())
                }
            }
        )+
    };
}

parameter_value! {
    i8 => Number, i16 => Number, i32 => Number, i64 => Number,
    u8 => Number, u16 => Number, u32 => Number, u64 => Number,
    bool => Bool,
}

macro_rules! parameter_value_lossy {
    ($($ty:ty),+) => {
        $(
            impl ParameterValue for $ty {
                fn decode(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }

                fn encode(&self) -> String {
                    self.to_string()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn to_json(&self) -> serde_json::Value {
                    serde_json::json!(*self)
                }
            }
        )+
    };
}

parameter_value_lossy!(isize, usize, f32, f64);

impl ParameterValue for String {
    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }

    fn encode(&self) -> String {
        self.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: ParameterValue> ParameterValue for Vec<T> {
    fn decode(raw: &str) -> Option<Self> {
        Some(
            raw.split(',')
                .map(str::trim)
                .filter_map(T::decode)
                .collect(),
        )
    }

    fn encode(&self) -> String {
        self.iter()
            .map(ParameterValue::encode)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.iter().map(ParameterValue::to_json).collect())
    }
}

#[derive(Clone)]
/// A type-erased parameter value.
///
/// Reading the value as the type it was stored as returns a copy of it
/// directly; reading it as any other type re-decodes it from its canonical
/// text form.
///
/// # Examples
/// ```rust
/// # use waypoint::Value;
/// let value = Value::new(42i64);
/// assert_eq!(value.cast::<i64>(), Some(42));
/// assert_eq!(value.cast::<String>().as_deref(), Some("42"));
/// assert_eq!(value.cast::<u8>(), Some(42));
/// assert_eq!(value.cast::<bool>(), None);
/// ```
pub struct Value(Arc<dyn ParameterValue>);

impl Value {
    /// Wraps the given value.
    pub fn new<T: ParameterValue>(value: T) -> Self {
        Value(Arc::new(value))
    }

    /// Returns a reference to the stored value if it is of type `T`.
    pub fn downcast_ref<T: ParameterValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Reads the value as `T`.  This is a plain copy if the value was stored
    /// as `T`, and otherwise decodes `T` from [`Value::encode`].
    pub fn cast<T: ParameterValue + Clone>(&self) -> Option<T> {
        match self.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => T::decode(&self.encode()),
        }
    }

    /// The canonical text form of the value.
    pub fn encode(&self) -> String {
        self.0.encode()
    }

    /// The value as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        self.0.to_json()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Clone, Debug, Default)]
/// Values captured while matching a request.
///
/// This is a map of names to typed values, along with the (ordered) list of
/// wildcard captures.  Keys are unique; inserting a key again replaces the
/// previous value.
///
/// # Examples
/// ```rust
/// # use waypoint::Parameters;
/// let mut parameters = Parameters::new();
/// parameters.insert("id", 12i64);
/// parameters.insert("name", "jane".to_string());
/// assert_eq!(parameters.int("id"), Some(12));
/// assert_eq!(parameters.string("id").as_deref(), Some("12"));
/// assert_eq!(parameters.string("name").as_deref(), Some("jane"));
/// assert!(!parameters.bool("missing"));
/// ```
pub struct Parameters {
    storage: HashMap<String, Value>,
    wildcards: Vec<String>,
}

impl Parameters {
    /// Creates an empty set of parameters.
    pub fn new() -> Self {
        Parameters::default()
    }

    /// Retrieves the raw value stored under the name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.storage.get(name)
    }

    /// Retrieves the value stored under the name as `T`.  See
    /// [`Value::cast`].
    pub fn get_as<T: ParameterValue + Clone>(&self, name: &str) -> Option<T> {
        self.get(name)?.cast()
    }

    /// Stores the value under the name, replacing any previous value.
    pub fn insert<T: ParameterValue>(&mut self, name: impl Into<String>, value: T) {
        self.insert_value(name, Value::new(value));
    }

    /// Stores an already-wrapped value under the name.
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.storage.insert(name.into(), value);
    }

    /// Whether or not a value exists under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.storage.contains_key(name)
    }

    /// Reads the value as a string.
    pub fn string(&self, name: &str) -> Option<String> {
        self.get_as(name)
    }

    /// Reads the value as a signed integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get_as(name)
    }

    /// Reads the value as a single-precision float.
    pub fn float(&self, name: &str) -> Option<f32> {
        self.get_as(name)
    }

    /// Reads the value as a double-precision float.
    pub fn double(&self, name: &str) -> Option<f64> {
        self.get_as(name)
    }

    /// Reads the value as a boolean; a missing or non-boolean value is
    /// `false`.
    pub fn bool(&self, name: &str) -> bool {
        self.get_as(name).unwrap_or(false)
    }

    /// The wildcard captures, in the order they appeared in the URL.
    pub fn wildcards(&self) -> &[String] {
        &self.wildcards[..]
    }

    /// Appends a wildcard capture.
    pub fn push_wildcard(&mut self, value: impl Into<String>) {
        self.wildcards.push(value.into());
    }

    /// Combines two sets of parameters.  On a key conflict, the value in
    /// `self` is kept; wildcards from `self` come before those of `other`.
    ///
    /// # Examples
    /// ```rust
    /// # use waypoint::Parameters;
    /// let mut path = Parameters::new();
    /// path.insert("id", 1i64);
    /// path.push_wildcard("a");
    /// let mut query = Parameters::new();
    /// query.insert("id", 5i64);
    /// query.insert("page", 2i64);
    /// query.push_wildcard("b");
    ///
    /// let merged = path.merge(query);
    /// assert_eq!(merged.int("id"), Some(1));
    /// assert_eq!(merged.int("page"), Some(2));
    /// assert_eq!(merged.wildcards(), ["a", "b"]);
    /// ```
    #[must_use]
    pub fn merge(mut self, other: Parameters) -> Parameters {
        for (key, value) in other.storage {
            self.storage.entry(key).or_insert(value);
        }
        self.wildcards.extend(other.wildcards);
        self
    }

    /// The number of named values.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether there are no named values and no wildcards.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty() && self.wildcards.is_empty()
    }

    /// Iterates over the named values, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.storage.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The named values as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.storage
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, String)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, String)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        for (key, value) in iter {
            parameters.insert(key, value);
        }
        parameters
    }
}
