//! Consistency check between a footprint's declared carbon totals and the
//! contributions of its breakdown children.
//!
//! The check only reports. Nothing is recomputed and a record with issues is
//! still a valid record to store.

use crate::model::field_state::FieldState;
use crate::model::footprint::{ChildFootprint, Footprint};
use crate::model::quantity::Quantity;
use serde::Serialize;
use std::fmt;

/// Carbon totals that must add up across a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CarbonTotal {
    PcfExcludingBiogenic,
    PcfIncludingBiogenic,
    FossilGhgEmissions,
}

impl CarbonTotal {
    pub const ALL: [CarbonTotal; 3] = [
        CarbonTotal::PcfExcludingBiogenic,
        CarbonTotal::PcfIncludingBiogenic,
        CarbonTotal::FossilGhgEmissions,
    ];

    fn of_footprint(&self, fp: &Footprint) -> Option<Quantity> {
        match self {
            CarbonTotal::PcfExcludingBiogenic => fp.pcf_excluding_biogenic,
            CarbonTotal::PcfIncludingBiogenic => fp.pcf_including_biogenic,
            CarbonTotal::FossilGhgEmissions => fp.fossil_ghg_emissions,
        }
    }

    fn of_child<'a>(&self, child: &'a ChildFootprint) -> &'a FieldState<Quantity> {
        match self {
            CarbonTotal::PcfExcludingBiogenic => &child.pcf_excluding_biogenic,
            CarbonTotal::PcfIncludingBiogenic => &child.pcf_including_biogenic,
            CarbonTotal::FossilGhgEmissions => &child.fossil_ghg_emissions,
        }
    }
}

impl fmt::Display for CarbonTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CarbonTotal::PcfExcludingBiogenic => "pcfExcludingBiogenic",
            CarbonTotal::PcfIncludingBiogenic => "pcfIncludingBiogenic",
            CarbonTotal::FossilGhgEmissions => "fossilGhgEmissions",
        })
    }
}

/// A disagreement between a node and its children. `path` locates the parent
/// node, `$` being the footprint itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BreakdownIssue {
    #[serde(rename_all = "camelCase")]
    Mismatch {
        path: String,
        total: CarbonTotal,
        declared: Quantity,
        children_sum: Quantity,
    },
    /// Some children assert the total and others do not.
    #[serde(rename_all = "camelCase")]
    PartialCoverage {
        path: String,
        total: CarbonTotal,
        asserted: usize,
        children: usize,
    },
    /// The children's sum, or its distance to the declared value, does not
    /// fit a decimal.
    #[serde(rename_all = "camelCase")]
    Overflow { path: String, total: CarbonTotal },
}

impl fmt::Display for BreakdownIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakdownIssue::Mismatch {
                path,
                total,
                declared,
                children_sum,
            } => write!(
                f,
                "{path}: {total} declared as {declared} but breakdown sums to {children_sum}"
            ),
            BreakdownIssue::PartialCoverage {
                path,
                total,
                asserted,
                children,
            } => write!(
                f,
                "{path}: only {asserted} of {children} breakdown entries assert {total}"
            ),
            BreakdownIssue::Overflow { path, total } => {
                write!(f, "{path}: {total} breakdown sum is out of range")
            }
        }
    }
}

/// Checks every node of the footprint tree. Differences up to `tolerance`
/// (inclusive) are accepted.
pub fn check_breakdown(fp: &Footprint, tolerance: Quantity) -> Vec<BreakdownIssue> {
    let mut issues = Vec::new();
    let declared = CarbonTotal::ALL.map(|total| total.of_footprint(fp));
    check_node("$", declared, &fp.breakdown, tolerance, &mut issues);
    issues
}

fn check_node(
    path: &str,
    declared: [Option<Quantity>; 3],
    children: &[ChildFootprint],
    tolerance: Quantity,
    issues: &mut Vec<BreakdownIssue>,
) {
    if children.is_empty() {
        return;
    }

    for (total, declared) in CarbonTotal::ALL.into_iter().zip(declared) {
        let Some(declared) = declared else { continue };
        let asserted: Vec<&Quantity> = children
            .iter()
            .filter_map(|child| total.of_child(child).value())
            .collect();
        if asserted.is_empty() {
            continue;
        }
        if asserted.len() < children.len() {
            issues.push(BreakdownIssue::PartialCoverage {
                path: path.to_string(),
                total,
                asserted: asserted.len(),
                children: children.len(),
            });
        }
        let checked = Quantity::checked_sum(asserted).and_then(|children_sum| {
            children_sum
                .checked_sub(declared)
                .map(|difference| (children_sum, difference))
        });
        match checked {
            None => issues.push(BreakdownIssue::Overflow {
                path: path.to_string(),
                total,
            }),
            Some((children_sum, difference)) if difference.abs() > tolerance => {
                issues.push(BreakdownIssue::Mismatch {
                    path: path.to_string(),
                    total,
                    declared,
                    children_sum,
                })
            }
            Some(_) => {}
        }
    }

    for (idx, child) in children.iter().enumerate() {
        let child_path = format!("{path}.breakdown[{idx}]");
        let child_declared = CarbonTotal::ALL.map(|total| total.of_child(child).value().copied());
        check_node(&child_path, child_declared, &child.breakdown, tolerance, issues);
    }
}
