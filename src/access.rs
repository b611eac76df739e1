//! Current-user context and capability checks
//!
//! Authorization is plain set membership against the capabilities granted
//! to the acting user.

use crate::error::{MshError, Result};
use crate::types::{Capability, OrgLayer, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// The user an operation runs on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: String,
    pub layer: Option<OrgLayer>,
    pub capabilities: BTreeSet<Capability>,
}

impl CurrentUser {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            id: UserId::new(id),
            display_name: display_name.into(),
            layer: None,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            layer: Some(user.layer),
            capabilities: user.capabilities.clone(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// `PermissionDenied` unless `capability` was granted
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            return Ok(());
        }
        warn!("{} lacks capability {}", self.id, capability);
        Err(MshError::PermissionDenied(format!(
            "{} requires the {} capability",
            self.id, capability
        )))
    }
}
