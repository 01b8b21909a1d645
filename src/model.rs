//! Types for comparison runs and their results.

use serde::{Deserialize, Deserializer, Serialize};

/// Operator-supplied inputs for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    /// Website to check (required)
    pub website_url: String,

    /// Design-tool document used as the visual reference
    pub design_reference_url: Option<String>,

    /// Free-text selector list, passed through to the service untouched
    pub selectors: Option<String>,
}

impl RunInput {
    pub fn new(website_url: impl Into<String>) -> Self {
        Self {
            website_url: website_url.into(),
            ..Default::default()
        }
    }

    pub fn design_reference(mut self, url: impl Into<String>) -> Self {
        self.design_reference_url = Some(url.into());
        self
    }

    pub fn selectors(mut self, selectors: impl Into<String>) -> Self {
        self.selectors = Some(selectors.into());
        self
    }

    /// Build the wire payload for `POST /run-test`.
    ///
    /// Blank optional fields become `null` rather than an empty string.
    pub fn to_request(&self) -> RunTestRequest {
        RunTestRequest {
            figma_url: non_blank(self.design_reference_url.as_deref()),
            website_url: self.website_url.clone(),
            selectors: non_blank(self.selectors.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Request body for `POST /run-test`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTestRequest {
    pub figma_url: Option<String>,
    pub website_url: String,
    pub selectors: Option<String>,
}

/// Request body for `POST /store-differences`
#[derive(Debug, Clone, Serialize)]
pub struct StoreDifferencesRequest<'a> {
    pub differences: &'a [Difference],
}

/// The service's verdict for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Elements found consistent with the reference, in service order
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched: Vec<String>,

    /// Elements with at least one stylistic mismatch
    #[serde(default, deserialize_with = "null_as_default")]
    pub differences: Vec<Difference>,

    /// Time the service spent on the comparison, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

impl ComparisonResult {
    /// True when there is nothing to show or export
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.differences.is_empty()
    }
}

/// A single element that does not match its reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub element: String,
    pub issue: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: Vec<PropertyDelta>,
}

/// One mismatched style property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDelta {
    pub property: String,
    pub expected: String,
    pub actual: String,
}

// Missing fields are handled by `#[serde(default)]`; this covers explicit nulls.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
