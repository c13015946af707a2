//! Conversation branch classification
//!
//! A conversation falls into exactly one of three branches, decided by two
//! flags coming out of enrichment. Precedence is RNU > analysis > source.
//!
//! The persisted column additionally carries `pending` while a freshly
//! created conversation has not been classified yet; see [`StoredBranch`].

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Terminal classification of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationBranch {
    /// Municipality falls under the national ruleset, no local plan to analyze
    Rnu,
    /// Local plan with a pre-computed analysis available
    NonRnuAnalysis,
    /// Local plan with only the source document available
    NonRnuSource,
}

impl ConversationBranch {
    /// All branches in precedence order
    pub const ALL: [Self; 3] = [Self::Rnu, Self::NonRnuAnalysis, Self::NonRnuSource];

    /// Wire name, as persisted in `branch_type`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rnu => "rnu",
            Self::NonRnuAnalysis => "non_rnu_analysis",
            Self::NonRnuSource => "non_rnu_source",
        }
    }

    /// Display badge for this branch
    #[inline]
    #[must_use]
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Rnu => "Branche RNU",
            Self::NonRnuAnalysis => "Branche Analyse disponible",
            Self::NonRnuSource => "Branche Document source",
        }
    }

    /// Check if this is the RNU branch
    #[inline]
    #[must_use]
    pub fn is_rnu(&self) -> bool {
        matches!(self, Self::Rnu)
    }
}

impl std::fmt::Display for ConversationBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationBranch {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rnu" => Ok(Self::Rnu),
            "non_rnu_analysis" => Ok(Self::NonRnuAnalysis),
            "non_rnu_source" => Ok(Self::NonRnuSource),
            other => Err(CoreError::UnknownBranch(other.to_string())),
        }
    }
}

/// Classify a conversation from its two flags.
///
/// Pure and total. RNU status dominates regardless of analysis availability.
/// Callers holding possibly-unknown flags go through [`BranchInputs::resolve`].
#[inline]
#[must_use]
pub fn determine_conversation_branch(is_rnu: bool, has_analysis: bool) -> ConversationBranch {
    if is_rnu {
        ConversationBranch::Rnu
    } else if has_analysis {
        ConversationBranch::NonRnuAnalysis
    } else {
        ConversationBranch::NonRnuSource
    }
}

/// Classification inputs as they are learned during enrichment
///
/// `None` means "not known yet" and is never coerced to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchInputs {
    /// Whether the municipality is under RNU
    pub is_rnu: Option<bool>,
    /// Whether an analysis exists for the zone
    pub has_analysis: Option<bool>,
}

impl BranchInputs {
    /// Both flags unknown
    #[inline]
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Both flags known
    #[inline]
    #[must_use]
    pub fn known(is_rnu: bool, has_analysis: bool) -> Self {
        Self {
            is_rnu: Some(is_rnu),
            has_analysis: Some(has_analysis),
        }
    }

    /// With RNU flag
    #[inline]
    #[must_use]
    pub fn with_is_rnu(mut self, is_rnu: bool) -> Self {
        self.is_rnu = Some(is_rnu);
        self
    }

    /// With analysis flag
    #[inline]
    #[must_use]
    pub fn with_has_analysis(mut self, has_analysis: bool) -> Self {
        self.has_analysis = Some(has_analysis);
        self
    }

    /// Branch, once classification is certain.
    ///
    /// A confirmed RNU municipality is enough on its own since RNU skips the
    /// analysis lookup. Otherwise both flags must be known.
    #[must_use]
    pub fn resolve(&self) -> Option<ConversationBranch> {
        match (self.is_rnu, self.has_analysis) {
            (Some(true), _) => Some(ConversationBranch::Rnu),
            (Some(false), Some(has_analysis)) => {
                Some(determine_conversation_branch(false, has_analysis))
            }
            _ => None,
        }
    }
}

/// Persisted `branch_type` column
///
/// `Pending` is a transient fourth state written for lightweight
/// conversations; it has no classifier counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredBranch {
    /// Not classified yet
    #[default]
    Pending,
    Rnu,
    NonRnuAnalysis,
    NonRnuSource,
}

impl StoredBranch {
    /// Terminal branch, `None` while pending
    #[inline]
    #[must_use]
    pub fn resolved(&self) -> Option<ConversationBranch> {
        match self {
            Self::Pending => None,
            Self::Rnu => Some(ConversationBranch::Rnu),
            Self::NonRnuAnalysis => Some(ConversationBranch::NonRnuAnalysis),
            Self::NonRnuSource => Some(ConversationBranch::NonRnuSource),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.resolved().map_or("pending", |b| b.as_str())
    }
}

impl From<ConversationBranch> for StoredBranch {
    fn from(branch: ConversationBranch) -> Self {
        match branch {
            ConversationBranch::Rnu => Self::Rnu,
            ConversationBranch::NonRnuAnalysis => Self::NonRnuAnalysis,
            ConversationBranch::NonRnuSource => Self::NonRnuSource,
        }
    }
}
