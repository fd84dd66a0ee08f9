//! SQL server and database operations

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::models::{ArmSqlDatabase, ArmSqlServer};
use crate::arm::{ArmClient, ResourceRef};
use crate::config::SecretString;
use crate::error::Result;

pub const SQL_API_VERSION: &str = "2021-11-01";

const SERVER: &str = "SQL Server";
const DATABASE: &str = "SQL Database";

/// Trait for SQL operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlOperations: Send + Sync {
    async fn create_server(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        admin_login: &str,
        admin_password: SecretString,
    ) -> Result<ArmSqlServer>;

    async fn get_server(&self, resource_group: &str, name: &str) -> Result<ArmSqlServer>;

    async fn create_database(
        &self,
        resource_group: &str,
        server_name: &str,
        name: &str,
        location: &str,
    ) -> Result<ArmSqlDatabase>;

    async fn get_database(
        &self,
        resource_group: &str,
        server_name: &str,
        name: &str,
    ) -> Result<ArmSqlDatabase>;

    async fn delete_server(&self, resource_group: &str, name: &str) -> Result<()>;
}

/// ARM-backed SQL operations
pub struct AzureSqlOperations {
    arm: Arc<ArmClient>,
}

impl AzureSqlOperations {
    pub fn new(arm: Arc<ArmClient>) -> Self {
        Self { arm }
    }

    fn server_path(&self, resource_group: &str, name: &str) -> String {
        self.arm
            .resource_group_path(resource_group, &format!("Microsoft.Sql/servers/{}", name))
    }

    fn database_path(&self, resource_group: &str, server_name: &str, name: &str) -> String {
        format!("{}/databases/{}", self.server_path(resource_group, server_name), name)
    }
}

#[async_trait]
impl SqlOperations for AzureSqlOperations {
    async fn create_server(
        &self,
        resource_group: &str,
        name: &str,
        location: &str,
        admin_login: &str,
        admin_password: SecretString,
    ) -> Result<ArmSqlServer> {
        let body = json!({
            "location": location,
            "properties": {
                "administratorLogin": admin_login,
                "administratorLoginPassword": admin_password.as_str(),
                "version": "12.0"
            }
        });

        self.arm
            .put_and_wait(
                &self.server_path(resource_group, name),
                SQL_API_VERSION,
                &body,
                ResourceRef::new(SERVER, name),
            )
            .await
    }

    async fn get_server(&self, resource_group: &str, name: &str) -> Result<ArmSqlServer> {
        self.arm
            .get_json(
                &self.server_path(resource_group, name),
                SQL_API_VERSION,
                ResourceRef::new(SERVER, name),
            )
            .await
    }

    async fn create_database(
        &self,
        resource_group: &str,
        server_name: &str,
        name: &str,
        location: &str,
    ) -> Result<ArmSqlDatabase> {
        let body = json!({ "location": location });

        self.arm
            .put_and_wait(
                &self.database_path(resource_group, server_name, name),
                SQL_API_VERSION,
                &body,
                ResourceRef::new(DATABASE, name),
            )
            .await
    }

    async fn get_database(
        &self,
        resource_group: &str,
        server_name: &str,
        name: &str,
    ) -> Result<ArmSqlDatabase> {
        self.arm
            .get_json(
                &self.database_path(resource_group, server_name, name),
                SQL_API_VERSION,
                ResourceRef::new(DATABASE, name),
            )
            .await
    }

    async fn delete_server(&self, resource_group: &str, name: &str) -> Result<()> {
        self.arm
            .delete_and_wait(
                &self.server_path(resource_group, name),
                SQL_API_VERSION,
                ResourceRef::new(SERVER, name),
            )
            .await
    }
}
