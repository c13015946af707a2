//! Persisted document metadata, branch badges and duplicate hints

use crate::branch::ConversationBranch;
use crate::geometry::geometry_to_display_polygons;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inputs gathered once enrichment completes
#[derive(Debug, Clone, Copy)]
pub struct DocumentMetadataInput<'a> {
    pub branch: ConversationBranch,
    pub document_id: Option<&'a str>,
    pub zone_code: Option<&'a str>,
    pub zone_name: Option<&'a str>,
    pub city_name: Option<&'a str>,
    pub source_plu_url: Option<&'a str>,
    /// Raw zone geometry, only inspected for availability
    pub map_geometry: Option<&'a Value>,
    pub enriched_at: DateTime<Utc>,
}

/// Snapshot written to `document_metadata`
///
/// Immutable once written: a later write replaces it as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadataPayload {
    pub branch_type: ConversationBranch,
    pub document_id: Option<String>,
    pub zone_code: Option<String>,
    pub zone_name: Option<String>,
    pub city_name: Option<String>,
    pub source_plu_url: Option<String>,
    pub map_geometry_available: bool,
    pub enriched_at: DateTime<Utc>,
}

/// Shape enrichment results into the persisted payload.
///
/// Blank strings count as absent and serialize as `null`.
#[must_use]
pub fn build_document_metadata_payload(input: &DocumentMetadataInput<'_>) -> DocumentMetadataPayload {
    DocumentMetadataPayload {
        branch_type: input.branch,
        document_id: present(input.document_id),
        zone_code: present(input.zone_code),
        zone_name: present(input.zone_name),
        city_name: present(input.city_name),
        source_plu_url: present(input.source_plu_url),
        map_geometry_available: !geometry_to_display_polygons(input.map_geometry).is_empty(),
        enriched_at: input.enriched_at,
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Badge text for a branch
#[inline]
#[must_use]
pub fn format_branch_badge(branch: ConversationBranch) -> &'static str {
    branch.badge()
}

/// Warning shown when an address already has results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateHint {
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DuplicateHintInput<'a> {
    pub branch: ConversationBranch,
    pub zone_name: Option<&'a str>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

const DUPLICATE_HINT_TITLE: &str = "Analyse existante...";

/// Compose the duplicate hint relative to `now`.
#[must_use]
pub fn build_duplicate_hint_message(input: &DuplicateHintInput<'_>, now: DateTime<Utc>) -> DuplicateHint {
    let mut parts = vec![format_branch_badge(input.branch).to_string()];
    if let Some(zone) = present(input.zone_name) {
        parts.push(format!("Zone {zone}"));
    }
    if let Some(updated) = input.last_updated_at {
        parts.push(format!("mise à jour {}", format_relative_fr(updated, now)));
    }

    DuplicateHint {
        title: DUPLICATE_HINT_TITLE.to_string(),
        subtitle: parts.join(" · "),
    }
}

/// French relative phrase for `then` as seen from `now`.
///
/// Future instants are treated as now.
#[must_use]
pub fn format_relative_fr(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let (count, unit, plural) = match seconds {
        0..=59 => return "à l'instant".to_string(),
        60..=3_599 => (seconds / 60, "minute", "minutes"),
        3_600..=86_399 => (seconds / 3_600, "heure", "heures"),
        86_400..=2_591_999 => (seconds / 86_400, "jour", "jours"),
        _ => (seconds / 2_592_000, "mois", "mois"),
    };
    if count == 1 {
        format!("il y a 1 {unit}")
    } else {
        format!("il y a {count} {plural}")
    }
}
