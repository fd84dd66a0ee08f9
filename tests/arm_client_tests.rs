use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use azmanage::arm::{ArmClient, LroOptions, ResourceRef};
use azmanage::auth::provider::AzureAuthProvider;
use azmanage::network::{AzureNetworkOperations, NetworkOperations};
use azmanage::resources::{AzureResourceGroupOperations, ResourceGroupOperations};
use azmanage::storage::{AzureStorageOperations, StorageOperations};
use azmanage::utils::retry::RetryOptions;
use azmanage::AzmError;

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";

struct StaticTokenProvider;

#[async_trait]
impl AzureAuthProvider for StaticTokenProvider {
    async fn get_token(&self, _scopes: &[&str]) -> azmanage::Result<AccessToken> {
        Ok(AccessToken::new(
            "test-token".to_string(),
            OffsetDateTime::now_utc() + time::Duration::hours(1),
        ))
    }

    fn get_tenant_id(&self) -> Option<String> {
        None
    }

    fn get_client_id(&self) -> Option<String> {
        None
    }

    fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
        unreachable!("ArmClient only asks for tokens")
    }
}

fn fast_retries() -> RetryOptions {
    RetryOptions {
        max_retries: 2,
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn client_with(server: &MockServer, retry: RetryOptions, lro: LroOptions) -> Arc<ArmClient> {
    let client = ArmClient::new(Arc::new(StaticTokenProvider), SUBSCRIPTION.to_string(), &server.uri())
        .unwrap()
        .with_retry_options(retry)
        .with_lro_options(lro);
    Arc::new(client)
}

fn client(server: &MockServer) -> Arc<ArmClient> {
    client_with(
        server,
        fast_retries(),
        LroOptions {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        },
    )
}

fn public_ip_path() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/MyResourceGroup/providers/Microsoft.Network/publicIPAddresses/MyPublicIP"
    )
}

fn public_ip_body(state: &str) -> serde_json::Value {
    json!({
        "id": public_ip_path(),
        "name": "MyPublicIP",
        "location": "centralus",
        "properties": {
            "provisioningState": state,
            "publicIPAllocationMethod": "Dynamic"
        }
    })
}

#[tokio::test]
async fn test_requests_carry_bearer_token_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .and(query_param("api-version", "2023-09-01"))
        .and(header("authorization", "Bearer test-token"))
        .and(header_exists("x-ms-client-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .expect(1)
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let ip = ops.get_public_ip("MyResourceGroup", "MyPublicIP").await.unwrap();
    assert_eq!(ip.properties.allocation_method.as_deref(), Some("Dynamic"));
}

#[tokio::test]
async fn test_not_found_maps_to_resource_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "ResourceNotFound",
                "message": "The Resource 'Microsoft.Network/publicIPAddresses/MyPublicIP' was not found."
            }
        })))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let err = ops
        .get_public_ip("MyResourceGroup", "MyPublicIP")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Public IP address 'MyPublicIP' not found");
}

#[tokio::test]
async fn test_put_polls_async_operation_until_succeeded() {
    let server = MockServer::start().await;
    let monitor = format!("{}/operations/op-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", monitor.as_str())
                .set_body_json(public_ip_body("Updating")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .expect(1)
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let ip = ops
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap();
    assert_eq!(ip.properties.provisioning_state.as_deref(), Some("Succeeded"));
}

#[tokio::test]
async fn test_failed_async_operation_is_reported() {
    let server = MockServer::start().await;
    let monitor = format!("{}/operations/op-2", server.uri());

    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", monitor.as_str())
                .set_body_json(public_ip_body("Updating")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "PublicIPCountLimitReached", "message": "Cannot create more than 10 public IP addresses"}
        })))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let err = ops
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap_err();

    match err {
        AzmError::OperationFailed { status, message, .. } => {
            assert_eq!(status, "Failed");
            assert!(message.contains("PublicIPCountLimitReached"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    assert!(ops.get_public_ip("MyResourceGroup", "MyPublicIP").await.is_ok());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "InvalidParameter", "message": "bad request"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let err = ops
        .get_public_ip("MyResourceGroup", "MyPublicIP")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 400 (InvalidParameter)"));
}

#[tokio::test]
async fn test_resource_group_existence_uses_head() {
    let server = MockServer::start().await;
    let rg_path = format!("/subscriptions/{SUBSCRIPTION}/resourcegroups/MyResourceGroup");
    Mock::given(method("HEAD"))
        .and(path(rg_path.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(format!("/subscriptions/{SUBSCRIPTION}/resourcegroups/Missing")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ops = AzureResourceGroupOperations::new(client(&server));
    assert!(ops.exists("MyResourceGroup").await.unwrap());
    assert!(!ops.exists("Missing").await.unwrap());
}

#[tokio::test]
async fn test_storage_create_follows_location_header() {
    let server = MockServer::start().await;
    let account_path = format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/MyResourceGroup/providers/Microsoft.Storage/storageAccounts/mystorageacctabc123"
    );
    let poll = format!("{}/operations/sa-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(account_path.as_str()))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", poll.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/sa-1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/sa-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(account_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account_path,
            "name": "mystorageacctabc123",
            "location": "centralus",
            "kind": "StorageV2",
            "sku": {"name": "Standard_LRS"},
            "properties": {"provisioningState": "Succeeded"}
        })))
        .mount(&server)
        .await;

    let ops = AzureStorageOperations::new(client(&server));
    let account = ops
        .create_account(
            "MyResourceGroup",
            "mystorageacctabc123",
            "centralus",
            "Standard_LRS",
            "StorageV2",
        )
        .await
        .unwrap();
    assert_eq!(account.sku.name, "Standard_LRS");
}

#[tokio::test]
async fn test_list_follows_next_link() {
    let server = MockServer::start().await;
    let sizes_path = format!("/subscriptions/{SUBSCRIPTION}/providers/Microsoft.Compute/locations/centralus/vmSizes");

    Mock::given(method("GET"))
        .and(path(sizes_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "Standard_A1", "numberOfCores": 1, "memoryInMB": 1792, "maxDataDiskCount": 2}],
            "nextLink": format!("{}/page-2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "Standard_B1s", "numberOfCores": 1, "memoryInMB": 1024, "maxDataDiskCount": 2}]
        })))
        .mount(&server)
        .await;

    let arm = client(&server);
    let sizes: Vec<azmanage::compute::VmSize> = arm
        .list_json(&sizes_path, "2023-09-01", ResourceRef::new("VM sizes", "centralus"))
        .await
        .unwrap();
    let names: Vec<_> = sizes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Standard_A1", "Standard_B1s"]);
}

#[tokio::test]
async fn test_network_interface_reports_private_ip() {
    let server = MockServer::start().await;
    let nic_path = format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/MyResourceGroup/providers/Microsoft.Network/networkInterfaces/MyVMNIC"
    );
    Mock::given(method("GET"))
        .and(path(nic_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": nic_path,
            "name": "MyVMNIC",
            "location": "centralus",
            "properties": {
                "provisioningState": "Succeeded",
                "ipConfigurations": [
                    {"name": "MyVMNIC", "properties": {"privateIPAddress": "10.0.0.4"}}
                ]
            }
        })))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let nic = ops
        .get_network_interface("MyResourceGroup", "MyVMNIC")
        .await
        .unwrap();
    assert_eq!(
        nic.properties.ip_configurations[0].properties.private_ip_address.as_deref(),
        Some("10.0.0.4")
    );
}

#[tokio::test]
async fn test_put_without_monitor_polls_provisioning_state() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(public_ip_body("Updating")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Updating")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let ip = ops
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap();
    assert_eq!(ip.properties.provisioning_state.as_deref(), Some("Succeeded"));
}

#[tokio::test]
async fn test_failed_provisioning_state_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(public_ip_body("Updating")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Failed")))
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let err = ops
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap_err();

    match err {
        AzmError::OperationFailed { status, message, .. } => {
            assert_eq!(status, "Failed");
            assert!(message.contains("provisioningState is Failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_accepted_delete_waits_until_not_found() {
    let server = MockServer::start().await;
    let rg_path = format!("/subscriptions/{SUBSCRIPTION}/resourcegroups/OldGroup");

    Mock::given(method("DELETE"))
        .and(path(rg_path.as_str()))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rg_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": rg_path,
            "name": "OldGroup",
            "location": "centralus",
            "properties": {"provisioningState": "Deleting"}
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rg_path.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceGroupNotFound", "message": "Resource group 'OldGroup' could not be found."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ops = AzureResourceGroupOperations::new(client(&server));
    ops.delete("OldGroup").await.unwrap();
}

#[tokio::test]
async fn test_operation_that_never_finishes_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(public_ip_body("Updating")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Updating")))
        .mount(&server)
        .await;

    let arm = client_with(
        &server,
        fast_retries(),
        LroOptions {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_millis(100),
        },
    );
    let err = AzureNetworkOperations::new(arm)
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap_err();
    assert!(matches!(err, AzmError::Timeout(_)));
    assert!(err.to_string().contains("Public IP address 'MyPublicIP'"));
}

#[tokio::test]
async fn test_poll_interval_longer_than_timeout_still_polls() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(public_ip_body("Updating")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .mount(&server)
        .await;

    let arm = client_with(
        &server,
        fast_retries(),
        LroOptions {
            poll_interval: Duration::from_secs(60),
            timeout: Duration::from_millis(200),
        },
    );
    let ip = AzureNetworkOperations::new(arm)
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap();
    assert_eq!(ip.name, "MyPublicIP");
}

#[tokio::test]
async fn test_throttled_request_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({
                    "error": {"code": "TooManyRequests", "message": "Rate limit exceeded"}
                })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(public_ip_body("Succeeded")))
        .expect(1)
        .mount(&server)
        .await;

    // Backoff alone would wait far longer than the outer bound
    let arm = client_with(
        &server,
        RetryOptions {
            max_retries: 1,
            initial_interval: Duration::from_secs(60),
            max_interval: Duration::from_secs(60),
            multiplier: 1.0,
        },
        LroOptions::default(),
    );
    let ops = AzureNetworkOperations::new(arm);
    let ip = tokio::time::timeout(
        Duration::from_secs(10),
        ops.get_public_ip("MyResourceGroup", "MyPublicIP"),
    )
    .await
    .expect("Retry-After should replace the 60s backoff")
    .unwrap();
    assert_eq!(ip.name, "MyPublicIP");
}

#[tokio::test]
async fn test_conflict_with_any_code_is_resource_exists() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(public_ip_path()))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "InUseCannotUpdate", "message": "Public IP address is in use and cannot be updated."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ops = AzureNetworkOperations::new(client(&server));
    let err = ops
        .create_public_ip("MyResourceGroup", "MyPublicIP", "centralus", "Dynamic")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}
