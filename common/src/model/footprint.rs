//! Product carbon footprint records and their breakdown tree.
//!
//! A [`Footprint`] is the full record as stored locally, whether it came from
//! a partner's GetFootprints action or was created by an operator. Its
//! `breakdown` is an ordered list of [`ChildFootprint`]s: sparse records in
//! which every field is a [`FieldState`], so that "not sent" and "sent as
//! null" stay distinguishable all the way to storage and back.
//!
//! Quantities are [`Quantity`] values (exact decimals, strings on the wire).

use crate::model::field_state::FieldState;
use crate::model::identifier::Identifier;
use crate::model::quantity::Quantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local storage key, assigned by the footprint store.
pub type FootprintId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FootprintStatus {
    Active,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityRating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<Quantity>,
    #[serde(rename = "technologicalDQR", default, skip_serializing_if = "Option::is_none")]
    pub technological_dqr: Option<Quantity>,
    #[serde(rename = "temporalDQR", default, skip_serializing_if = "Option::is_none")]
    pub temporal_dqr: Option<Quantity>,
    #[serde(rename = "geographicalDQR", default, skip_serializing_if = "Option::is_none")]
    pub geographical_dqr: Option<Quantity>,
    #[serde(rename = "completenessDQR", default, skip_serializing_if = "Option::is_none")]
    pub completeness_dqr: Option<Quantity>,
    #[serde(rename = "reliabilityDQR", default, skip_serializing_if = "Option::is_none")]
    pub reliability_dqr: Option<Quantity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assurance {
    pub assurance: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// A full footprint record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FootprintId>,
    pub data_id: String,
    pub version: u32,
    /// Assigned by the partner; `None` for locally created records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_footprint_id: Option<String>,
    /// Data source the record was fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<String>,
    pub status: FootprintStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_ids: Vec<Identifier>,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub product_ids: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_category_cpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name_company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitary_product_amount: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcf_excluding_biogenic: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcf_including_biogenic: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fossil_ghg_emissions: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biogenic_carbon_content: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fossil_carbon_content: Option<Quantity>,
    #[serde(default)]
    pub cross_sectoral_standards: Vec<String>,
    #[serde(default)]
    pub ipcc_characterization_factors_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality_rating: Option<DataQualityRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assurance: Option<Assurance>,
    #[serde(default)]
    pub breakdown: Vec<ChildFootprint>,
}

/// Sparse breakdown contribution. Absent fields assert nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildFootprint {
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub data_id: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub version: FieldState<u32>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub status: FieldState<FootprintStatus>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub validity_period_start: FieldState<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub validity_period_end: FieldState<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub company_name: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub company_ids: FieldState<Vec<Identifier>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub product_description: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub product_ids: FieldState<Vec<Identifier>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub comment: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub declared_unit: FieldState<String>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub unitary_product_amount: FieldState<Quantity>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub pcf_excluding_biogenic: FieldState<Quantity>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub pcf_including_biogenic: FieldState<Quantity>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub fossil_ghg_emissions: FieldState<Quantity>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub biogenic_carbon_content: FieldState<Quantity>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub cross_sectoral_standards: FieldState<Vec<String>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub ipcc_characterization_factors_sources: FieldState<Vec<String>>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub data_quality_rating: FieldState<DataQualityRating>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub assurance: FieldState<Assurance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<ChildFootprint>,
}

impl Footprint {
    pub fn is_external(&self) -> bool {
        self.product_footprint_id.is_some()
    }

    /// Deep copy for editing: the copy is a local draft with no store key,
    /// no origin and no partner-assigned id. The source record is untouched.
    pub fn duplicate_for_edit(&self) -> Footprint {
        Footprint {
            id: None,
            product_footprint_id: None,
            data_source_id: None,
            breakdown: self.breakdown.iter().map(ChildFootprint::duplicate).collect(),
            ..self.clone()
        }
    }

    /// Identifiers in `companyIds`/`productIds`, including those asserted by
    /// breakdown children, that do not match their scheme.
    pub fn invalid_identifiers(&self) -> Vec<&Identifier> {
        let mut invalid: Vec<&Identifier> = self
            .company_ids
            .iter()
            .chain(self.product_ids.iter())
            .filter(|id| !id.is_valid())
            .collect();
        for child in &self.breakdown {
            child.collect_invalid_identifiers(&mut invalid);
        }
        invalid
    }

    /// Structural problems that make the record unusable, in the order found.
    pub fn structural_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.data_id.trim().is_empty() {
            problems.push("dataId must not be empty".to_string());
        }
        if let (Some(start), Some(end)) = (self.validity_period_start, self.validity_period_end) {
            if start > end {
                problems.push(format!(
                    "validity period starts ({}) after it ends ({})",
                    start, end
                ));
            }
        }
        for id in self.invalid_identifiers() {
            problems.push(format!("invalid identifier {}", id));
        }
        problems
    }
}

impl ChildFootprint {
    fn duplicate(&self) -> ChildFootprint {
        ChildFootprint {
            breakdown: self.breakdown.iter().map(ChildFootprint::duplicate).collect(),
            ..self.clone()
        }
    }

    fn collect_invalid_identifiers<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        for ids in [self.company_ids.value(), self.product_ids.value()]
            .into_iter()
            .flatten()
        {
            out.extend(ids.iter().filter(|id| !id.is_valid()));
        }
        for child in &self.breakdown {
            child.collect_invalid_identifiers(out);
        }
    }
}
