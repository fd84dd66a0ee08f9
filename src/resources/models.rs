//! Resource group data models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tabled::Tabled;

/// ARM representation of a resource group
#[derive(Debug, Clone, Deserialize)]
pub struct ArmResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: ResourceGroupProperties,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// Resource group as shown to the user
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ResourceGroup {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "State")]
    pub provisioning_state: String,
    #[tabled(skip)]
    pub id: String,
    #[tabled(skip)]
    pub tags: HashMap<String, String>,
}

impl From<ArmResourceGroup> for ResourceGroup {
    fn from(rg: ArmResourceGroup) -> Self {
        Self {
            name: rg.name,
            location: rg.location,
            provisioning_state: rg
                .properties
                .provisioning_state
                .unwrap_or_else(|| "-".to_string()),
            id: rg.id,
            tags: rg.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_resource_group() {
        let body = json!({
            "id": "/subscriptions/sub/resourceGroups/MyResourceGroup",
            "name": "MyResourceGroup",
            "location": "centralus",
            "properties": {"provisioningState": "Succeeded"}
        });
        let rg: ResourceGroup = serde_json::from_value::<ArmResourceGroup>(body).unwrap().into();
        assert_eq!(rg.name, "MyResourceGroup");
        assert_eq!(rg.provisioning_state, "Succeeded");
        assert!(rg.tags.is_empty());
    }
}
