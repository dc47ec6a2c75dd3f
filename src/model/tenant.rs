use serde::{Deserialize, Serialize};

/// An onboarded tenant: the Entra tenant id that tokens are issued for,
/// and the set of downstream providers it's wired to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: String,
    pub display_name: String,
    #[serde(default)]
    pub allowed_audiences: Vec<String>,
    #[serde(default)]
    pub provider_ids: Vec<String>,
}

impl Tenant {
    pub fn owns_audience(&self, aud: &str) -> bool {
        self.allowed_audiences.iter().any(|a| a == aud)
    }
}
