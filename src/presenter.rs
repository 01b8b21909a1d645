//! Read-only projection of a comparison result for display.

use std::fmt;

use serde::Serialize;

use crate::model::{ComparisonResult, Difference, PropertyDelta};

/// Grouped view of a result. Empty groups are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differences: Option<Vec<DifferenceView<'a>>>,
}

/// One difference with its optional per-property breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferenceView<'a> {
    pub element: &'a str,
    pub issue: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a [PropertyDelta]>,
}

fn non_empty<T>(items: &[T]) -> Option<&[T]> {
    (!items.is_empty()).then_some(items)
}

impl<'a> From<&'a Difference> for DifferenceView<'a> {
    fn from(diff: &'a Difference) -> Self {
        Self {
            element: &diff.element,
            issue: &diff.issue,
            details: non_empty(&diff.details),
        }
    }
}

impl<'a> From<&'a ComparisonResult> for ResultsView<'a> {
    fn from(result: &'a ComparisonResult) -> Self {
        Self {
            matched: non_empty(&result.matched),
            differences: non_empty(&result.differences)
                .map(|diffs| diffs.iter().map(DifferenceView::from).collect()),
        }
    }
}

impl ResultsView<'_> {
    pub fn is_empty(&self) -> bool {
        self.matched.is_none() && self.differences.is_none()
    }
}

impl fmt::Display for ResultsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Comparison Results:")?;

        if let Some(matched) = self.matched {
            writeln!(f, "✅ Matched Elements")?;
            for item in matched {
                writeln!(f, "  {}: All styles match! 🎉", item)?;
            }
        }

        if let Some(differences) = &self.differences {
            writeln!(f, "❌ Differences")?;
            for diff in differences {
                writeln!(f, "  {}: {}", diff.element, diff.issue)?;
                for d in diff.details.unwrap_or_default() {
                    writeln!(f, "    - {}: expected {}, got {}", d.property, d.expected, d.actual)?;
                }
            }
        }

        Ok(())
    }
}
