use serde_json::Value;

pub const TIMESTAMP_KEY: &str = "timestamp";
pub const TIME_KEY: &str = "time";
pub const TYPE_KEY: &str = "type";

/// keys pulled into the entry header instead of the payload
pub const HEADER_KEYS: [&str; 3] = [TIMESTAMP_KEY, TIME_KEY, TYPE_KEY];

/// A single JSON line, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    value: Value,
}

impl LogRecord {
    /// Parses one line. Anything that is not valid JSON yields `None` and is
    /// meant to be shown as a raw line.
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim())
            .ok()
            .map(|value| Self { value })
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Time shown in the entry header: `timestamp` whenever the key exists,
    /// `time` only when it does not. An empty `timestamp` shows as missing.
    pub fn header_timestamp(&self) -> Option<String> {
        header_text(
            self.value
                .get(TIMESTAMP_KEY)
                .or_else(|| self.value.get(TIME_KEY)),
        )
    }

    /// `timestamp`, or `time` when `timestamp` is absent or empty. Used for
    /// the time range of a whole file.
    pub fn timestamp(&self) -> Option<String> {
        header_text(self.value.get(TIMESTAMP_KEY))
            .or_else(|| header_text(self.value.get(TIME_KEY)))
    }

    pub fn kind(&self) -> Option<String> {
        header_text(self.value.get(TYPE_KEY))
    }

    /// True for objects carrying any header key, whatever its value.
    pub fn has_header_key(&self) -> bool {
        self.value
            .as_object()
            .is_some_and(|map| HEADER_KEYS.iter().any(|key| map.contains_key(*key)))
    }
}

// null, false, "" and 0 count as missing, like a falsy check
fn header_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}
