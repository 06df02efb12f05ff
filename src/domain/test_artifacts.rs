use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Verdict of the requirement validation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationVerdict {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Case category. Labels outside the known four are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCaseType {
    Positive,
    Negative,
    Edge,
    Boundary,
    Other(String),
}

impl TestCaseType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => TestCaseType::Positive,
            "negative" => TestCaseType::Negative,
            "edge" => TestCaseType::Edge,
            "boundary" => TestCaseType::Boundary,
            _ => TestCaseType::Other(raw.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            TestCaseType::Positive => "positive",
            TestCaseType::Negative => "negative",
            TestCaseType::Edge => "edge",
            TestCaseType::Boundary => "boundary",
            TestCaseType::Other(raw) => raw.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
    Other(String),
}

impl Priority {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Other(raw.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Other(raw) => raw.as_str(),
        }
    }
}

/// Same categories as [`TestCaseType`], written capitalised in the data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataCaseType {
    Positive,
    Negative,
    Edge,
    Boundary,
    Other(String),
}

impl DataCaseType {
    fn parse(raw: &str) -> Self {
        match TestCaseType::parse(raw) {
            TestCaseType::Positive => DataCaseType::Positive,
            TestCaseType::Negative => DataCaseType::Negative,
            TestCaseType::Edge => DataCaseType::Edge,
            TestCaseType::Boundary => DataCaseType::Boundary,
            TestCaseType::Other(raw) => DataCaseType::Other(raw),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            DataCaseType::Positive => "Positive",
            DataCaseType::Negative => "Negative",
            DataCaseType::Edge => "Edge",
            DataCaseType::Boundary => "Boundary",
            DataCaseType::Other(raw) => raw.as_str(),
        }
    }
}

macro_rules! label_serde {
    ($($label:ty),*) => {$(
        impl Serialize for $label {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $label {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                lenient::string(deserializer).map(|raw| Self::parse(&raw))
            }
        }

        impl Default for $label {
            fn default() -> Self {
                Self::Other(String::new())
            }
        }
    )*};
}

label_serde!(TestCaseType, Priority, DataCaseType);

/// One generated test case. Every field tolerates missing or oddly typed values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(rename = "type", default)]
    pub case_type: TestCaseType,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub preconditions: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub test_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub expected_result: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Test cases of one generation run, ids `1..=n` in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct TestCaseSet(Vec<TestCase>);

impl TestCaseSet {
    /// Builds the set from the elements of a parsed JSON array. Elements that
    /// are not objects are dropped.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::from_parsed(lenient::items(values, "test case"))
    }

    /// Wraps parsed cases, renumbering ids when they are not already `1..=n`.
    pub fn from_parsed(mut cases: Vec<TestCase>) -> Self {
        let contiguous = cases
            .iter()
            .enumerate()
            .all(|(index, case)| case.id as usize == index + 1);

        if !contiguous {
            tracing::warn!(
                "Generated test case ids are not contiguous from 1; renumbering {} cases",
                cases.len()
            );
            for (index, case) in cases.iter_mut().enumerate() {
                case.id = index as u32 + 1;
            }
        }

        Self(cases)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_of(&self, case_type: TestCaseType) -> usize {
        self.0.iter().filter(|case| case.case_type == case_type).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestDataCase {
    #[serde(rename = "type", default)]
    pub case_type: DataCaseType,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    /// Passed through as the model wrote it: usually a string, sometimes an object.
    #[serde(default)]
    pub sample_data: Value,
    #[serde(default, deserialize_with = "lenient::string")]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStoryGroup {
    #[serde(default, deserialize_with = "lenient::string")]
    pub user_story: String,
    #[serde(default, deserialize_with = "lenient::data_cases")]
    pub test_cases: Vec<TestDataCase>,
}

pub type TestDataSet = Vec<UserStoryGroup>;

/// Groups from the elements of a parsed JSON array. Elements that are not objects are dropped.
pub fn test_data_from_values(values: Vec<Value>) -> TestDataSet {
    lenient::items(values, "user story group")
}

mod lenient {
    use super::TestDataCase;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text(value: Value) -> String {
        match value {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Value::deserialize(deserializer).map(text)
    }

    pub(super) fn strings<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items.into_iter().map(text).collect(),
            Value::Null => Vec::new(),
            other => vec![text(other)],
        })
    }

    /// Numeric ids, or digits inside a string. Anything else becomes 0 and is renumbered.
    pub(super) fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .unwrap_or(0),
            Value::String(raw) => raw.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    pub(super) fn data_cases<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<TestDataCase>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(values) => items(values, "test data case"),
            _ => Vec::new(),
        })
    }

    pub(super) fn items<T: DeserializeOwned>(values: Vec<Value>, label: &str) -> Vec<T> {
        values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping {} #{}: {}", label, index + 1, e);
                    None
                }
            })
            .collect()
    }
}
