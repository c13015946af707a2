//! Raw sub-results accumulated as stages resolve

use plu_core::{BranchInputs, ConversationBranch, LatLon};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Enrichment sub-results
///
/// Also used as the patch a stage fetch resolves with: every field a stage
/// did not produce is left `None`. Fields arrive in any order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentData {
    pub center: Option<LatLon>,
    pub insee_code: Option<String>,
    pub city_name: Option<String>,
    pub municipality: Option<String>,
    pub is_rnu: Option<bool>,
    pub has_analysis: Option<bool>,
    pub zone_code: Option<String>,
    pub zone_name: Option<String>,
    pub zoning_id: Option<String>,
    pub document_id: Option<String>,
    pub document_data: Option<Value>,
    pub source_plu_url: Option<String>,
    pub map_geometry: Option<Value>,
}

impl EnrichmentData {
    /// Merge a stage patch: new value wins, absent keeps the previous one.
    pub fn merge(&mut self, patch: EnrichmentData) {
        // Destructured so a new field cannot be forgotten here
        let EnrichmentData {
            center,
            insee_code,
            city_name,
            municipality,
            is_rnu,
            has_analysis,
            zone_code,
            zone_name,
            zoning_id,
            document_id,
            document_data,
            source_plu_url,
            map_geometry,
        } = patch;

        keep_if_absent(&mut self.center, center);
        keep_if_absent(&mut self.insee_code, insee_code);
        keep_if_absent(&mut self.city_name, city_name);
        keep_if_absent(&mut self.municipality, municipality);
        keep_if_absent(&mut self.is_rnu, is_rnu);
        keep_if_absent(&mut self.has_analysis, has_analysis);
        keep_if_absent(&mut self.zone_code, zone_code);
        keep_if_absent(&mut self.zone_name, zone_name);
        keep_if_absent(&mut self.zoning_id, zoning_id);
        keep_if_absent(&mut self.document_id, document_id);
        keep_if_absent(&mut self.document_data, document_data);
        keep_if_absent(&mut self.source_plu_url, source_plu_url);
        keep_if_absent(&mut self.map_geometry, map_geometry);
    }

    /// Classification flags as currently known
    #[inline]
    #[must_use]
    pub fn branch_inputs(&self) -> BranchInputs {
        BranchInputs {
            is_rnu: self.is_rnu,
            has_analysis: self.has_analysis,
        }
    }

    /// Branch, once classification is certain
    #[inline]
    #[must_use]
    pub fn branch(&self) -> Option<ConversationBranch> {
        self.branch_inputs().resolve()
    }
}

fn keep_if_absent<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
