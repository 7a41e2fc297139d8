use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Kind of change a directive applies to its target file.
///
/// Values outside the five recognised kinds are kept as `Unsupported` so the
/// engine can reject that one directive instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    Replace,
    Append,
    Insert,
    InsertAfter,
    InsertBefore,
    Unsupported(String),
}

impl ChangeType {
    pub const SUPPORTED: [ChangeType; 5] = [
        ChangeType::Replace,
        ChangeType::Append,
        ChangeType::Insert,
        ChangeType::InsertAfter,
        ChangeType::InsertBefore,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Insert => "insert",
            Self::InsertAfter => "insert_after",
            Self::InsertBefore => "insert_before",
            Self::Unsupported(other) => other,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<String> for ChangeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "replace" => Self::Replace,
            "append" => Self::Append,
            "insert" => Self::Insert,
            "insert_after" => Self::InsertAfter,
            "insert_before" => Self::InsertBefore,
            _ => Self::Unsupported(s),
        }
    }
}

impl From<&str> for ChangeType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<ChangeType> for String {
    fn from(t: ChangeType) -> Self {
        match t {
            ChangeType::Unsupported(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction against a single named file, as received from the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDirective {
    pub file: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub content: String,
    /// 1-based line for `insert`. Absent, non-numeric or < 1 means line 1.
    #[serde(
        default,
        deserialize_with = "lenient_line_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_number: Option<i64>,
    /// Literal substring to locate for `insert_after`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,
    /// Literal substring to locate for `insert_before`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_before: Option<String>,
}

impl ChangeDirective {
    pub fn new(
        file: impl Into<String>,
        change_type: impl Into<ChangeType>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            change_type: change_type.into(),
            content: content.into(),
            line_number: None,
            insert_after: None,
            insert_before: None,
        }
    }

    pub fn replace(file: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(file, ChangeType::Replace, content)
    }

    pub fn append(file: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(file, ChangeType::Append, content)
    }

    pub fn insert(file: impl Into<String>, line_number: i64, content: impl Into<String>) -> Self {
        let mut d = Self::new(file, ChangeType::Insert, content);
        d.line_number = Some(line_number);
        d
    }

    pub fn insert_after(
        file: impl Into<String>,
        pattern: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut d = Self::new(file, ChangeType::InsertAfter, content);
        d.insert_after = Some(pattern.into());
        d
    }

    pub fn insert_before(
        file: impl Into<String>,
        pattern: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut d = Self::new(file, ChangeType::InsertBefore, content);
        d.insert_before = Some(pattern.into());
        d
    }
}

/// Accept integers, floats and numeric strings; anything else becomes `None`.
fn lenient_line_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}
