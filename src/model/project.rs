use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{VeilError, VeilResult};
use crate::model::entities::{MosaicRegion, TextOverlay};

/// The editable entity lists of one editing session, as exchanged in JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProject {
    #[serde(default)]
    pub regions: Vec<MosaicRegion>,
    #[serde(default, alias = "textOverlays")]
    pub texts: Vec<TextOverlay>,
}

impl EditProject {
    pub fn from_json_str(s: &str) -> VeilResult<Self> {
        serde_json::from_str(s).map_err(|e| VeilError::serde(format!("edit project: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> VeilResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read edit project '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Validate every entity and reject duplicate ids within each list.
    pub fn validate(&self) -> VeilResult<()> {
        let mut seen = std::collections::HashSet::new();
        for r in &self.regions {
            r.validate()?;
            if !seen.insert(r.id.as_str()) {
                return Err(VeilError::validation(format!(
                    "duplicate mosaic region id '{}'",
                    r.id
                )));
            }
        }
        seen.clear();
        for t in &self.texts {
            t.validate()?;
            if !seen.insert(t.id.as_str()) {
                return Err(VeilError::validation(format!(
                    "duplicate text overlay id '{}'",
                    t.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/project.rs"]
mod tests;
