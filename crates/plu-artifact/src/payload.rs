//! Typed artifact payloads
//!
//! Each payload type owns exactly one slot of [`ConversationArtifacts`].
//! The trait is sealed: the three slots are fixed.

use crate::kind::ArtifactKind;
use crate::state::ArtifactState;
use crate::store::ConversationArtifacts;
use plu_core::geometry::{build_bounds_from_polygons, geometry_to_display_polygons, LatLon, Ring};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// Trait for artifact payloads
///
/// # Contract
/// - `KIND` is unique per payload type
/// - `slot`/`slot_mut` always address the same field
pub trait ArtifactPayload:
    Clone + PartialEq + Debug + Serialize + Send + Sync + 'static + private::Sealed
{
    /// Which artifact this payload belongs to
    const KIND: ArtifactKind;

    /// Read this payload's slot
    fn slot(artifacts: &ConversationArtifacts) -> &ArtifactState<Self>;

    /// Mutate this payload's slot
    fn slot_mut(artifacts: &mut ConversationArtifacts) -> &mut ArtifactState<Self>;
}

#[doc(hidden)]
pub mod private {
    /// Sealed trait marker
    pub trait Sealed {}
}

/// Resolved zoning information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneData {
    pub zone_code: Option<String>,
    pub zone_name: Option<String>,
    pub city_name: Option<String>,
    pub insee_code: Option<String>,
}

/// Zone outline to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    /// Raw GeoJSON geometry
    pub geometry: Value,
    /// Address position, if geocoded
    pub center: Option<LatLon>,
}

impl MapData {
    /// Display rings in `[lat, lon]` order
    #[must_use]
    pub fn polygons(&self) -> Vec<Ring> {
        geometry_to_display_polygons(Some(&self.geometry))
    }

    /// Points to fit the view on, when a center is known
    #[must_use]
    pub fn bounds(&self) -> Option<Vec<LatLon>> {
        self.center
            .map(|center| build_bounds_from_polygons(&self.polygons(), center))
    }
}

/// Regulation document shown in the panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentData {
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub source_plu_url: Option<String>,
    /// Analysis body when an analysis exists, otherwise empty
    pub content: Option<String>,
    pub has_analysis: bool,
}

impl private::Sealed for ZoneData {}
impl private::Sealed for MapData {}
impl private::Sealed for DocumentData {}

impl ArtifactPayload for ZoneData {
    const KIND: ArtifactKind = ArtifactKind::Zone;

    fn slot(artifacts: &ConversationArtifacts) -> &ArtifactState<Self> {
        &artifacts.zone
    }

    fn slot_mut(artifacts: &mut ConversationArtifacts) -> &mut ArtifactState<Self> {
        &mut artifacts.zone
    }
}

impl ArtifactPayload for MapData {
    const KIND: ArtifactKind = ArtifactKind::Map;

    fn slot(artifacts: &ConversationArtifacts) -> &ArtifactState<Self> {
        &artifacts.map
    }

    fn slot_mut(artifacts: &mut ConversationArtifacts) -> &mut ArtifactState<Self> {
        &mut artifacts.map
    }
}

impl ArtifactPayload for DocumentData {
    const KIND: ArtifactKind = ArtifactKind::Document;

    fn slot(artifacts: &ConversationArtifacts) -> &ArtifactState<Self> {
        &artifacts.document
    }

    fn slot_mut(artifacts: &mut ConversationArtifacts) -> &mut ArtifactState<Self> {
        &mut artifacts.document
    }
}
