//! Typed policy records supplied by the policy-tracking collaborator.
//!
//! The upstream dataset is hand-curated, so almost everything is optional
//! free text; the retrieval subsystem only reads the `sources` fields to
//! find candidate URLs for the fallback path.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::RetrievalError;

/// Map from jurisdiction name to its tracked policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyRecords {
    pub jurisdictions: HashMap<String, JurisdictionPolicies>,
}

impl PolicyRecords {
    pub fn load(path: &Path) -> Result<Self, RetrievalError> {
        let contents = std::fs::read_to_string(path).map_err(RetrievalError::internal)?;
        serde_json::from_str(&contents).map_err(RetrievalError::internal)
    }

    pub fn jurisdiction(&self, name: &str) -> Option<&JurisdictionPolicies> {
        self.jurisdictions.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.jurisdictions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JurisdictionPolicies {
    #[serde(default)]
    pub policies: Vec<PolicyRecord>,
}

/// One tracked policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRecord {
    pub category: String,
    pub policy_name: Option<String>,
    pub summary: Option<String>,
    /// Free text that may embed one or more source URLs, or a sentinel
    /// such as "None found".
    pub sources: Option<String>,
    pub dates: Option<String>,
    /// Pass-through for fields this subsystem does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
