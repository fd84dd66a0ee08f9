use serde::{Deserialize, Serialize};
use tabled::Tabled;

fn display_option(opt: &Option<String>) -> String {
    opt.clone().unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlServerProperties {
    #[serde(default)]
    pub administrator_login: Option<String>,
    #[serde(default)]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// ARM representation of a logical SQL server
#[derive(Debug, Clone, Deserialize)]
pub struct ArmSqlServer {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub properties: SqlServerProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDatabaseProperties {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
}

/// ARM representation of a SQL database
#[derive(Debug, Clone, Deserialize)]
pub struct ArmSqlDatabase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: SqlDatabaseProperties,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SqlServer {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "FQDN", display_with = "display_option")]
    pub fqdn: Option<String>,
    #[tabled(rename = "State", display_with = "display_option")]
    pub state: Option<String>,
    #[tabled(skip)]
    pub id: String,
}

impl From<ArmSqlServer> for SqlServer {
    fn from(server: ArmSqlServer) -> Self {
        Self {
            name: server.name,
            location: server.location,
            fqdn: server.properties.fully_qualified_domain_name,
            state: server.properties.state,
            id: server.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SqlDatabase {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Status", display_with = "display_option")]
    pub status: Option<String>,
    #[tabled(skip)]
    pub id: String,
}

impl From<ArmSqlDatabase> for SqlDatabase {
    fn from(db: ArmSqlDatabase) -> Self {
        Self {
            name: db.name,
            status: db.properties.status,
            id: db.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_summary() {
        let server: ArmSqlServer = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/myserverab12cd",
            "name": "myserverab12cd",
            "location": "centralus",
            "properties": {
                "administratorLogin": "sqladmin",
                "fullyQualifiedDomainName": "myserverab12cd.database.windows.net",
                "state": "Ready",
                "version": "12.0"
            }
        }))
        .unwrap();

        let summary = SqlServer::from(server);
        assert_eq!(summary.fqdn.as_deref(), Some("myserverab12cd.database.windows.net"));
        assert_eq!(summary.state.as_deref(), Some("Ready"));
    }

    #[test]
    fn test_database_without_properties() {
        let db: ArmSqlDatabase = serde_json::from_value(json!({
            "id": "db-id",
            "name": "mydatabase"
        }))
        .unwrap();
        assert!(SqlDatabase::from(db).status.is_none());
    }
}
