//! Artifact kinds, statuses and panel tabs

use serde::{Deserialize, Serialize};

/// The three enrichment outputs shown in the side panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Zone,
    Map,
    Document,
}

impl ArtifactKind {
    pub const ALL: [Self; 3] = [Self::Zone, Self::Map, Self::Document];

    /// Tab that displays this artifact. The zone has no view of its own and is
    /// shown on the map.
    #[inline]
    #[must_use]
    pub fn panel_tab(&self) -> PanelTab {
        match self {
            Self::Zone | Self::Map => PanelTab::Map,
            Self::Document => PanelTab::Document,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::Map => "map",
            Self::Document => "document",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Loading,
    Ready,
    Error,
}

/// Side panel tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelTab {
    #[default]
    Map,
    Document,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_opens_on_map_tab() {
        assert_eq!(ArtifactKind::Zone.panel_tab(), PanelTab::Map);
        assert_eq!(ArtifactKind::Map.panel_tab(), PanelTab::Map);
        assert_eq!(ArtifactKind::Document.panel_tab(), PanelTab::Document);
    }

    #[test]
    fn default_tab_is_map() {
        assert_eq!(PanelTab::default(), PanelTab::Map);
    }
}
