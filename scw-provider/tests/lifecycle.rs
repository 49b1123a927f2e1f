//! Lifecycle tests for the Scaleway provider against a mocked API
//!
//! Each test drives ScwProvider through the Provider trait and checks the
//! tracked state it leaves behind.

use std::time::Duration;

use scw_core::differ::{Diff, diff};
use scw_core::provider::{ErrorKind, Provider};
use scw_core::resource::{Attributes, Resource, ResourceId, State, Value};
use scw_provider::{ScwConfig, ScwProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "11111111-2222-3333-4444-555555555555";
const PROJECT: &str = "6b5a0a1c-0c6e-4b8f-9d0a-2f4d7c0e9a10";
const OTHER_PROJECT: &str = "9e8d7c6b-5a4f-4e3d-8c2b-1a0f9e8d7c6b";
const ORGANIZATION: &str = "0c2f1e6a-7d3b-4a5e-8f9c-1b2a3c4d5e6f";
const SERVER_ID: &str = "a1b2c3d4-0000-4000-8000-000000000001";
const NETWORK_ID: &str = "a1b2c3d4-0000-4000-8000-000000000002";
const CLUSTER_ID: &str = "a1b2c3d4-0000-4000-8000-000000000003";
const GATEWAY_ID: &str = "a1b2c3d4-0000-4000-8000-000000000004";
const KAFKA_ID: &str = "a1b2c3d4-0000-4000-8000-000000000005";
const LB_ID: &str = "a1b2c3d4-0000-4000-8000-000000000006";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn provider(server: &MockServer) -> ScwProvider {
    let config = ScwConfig::default()
        .with_credentials("SCWXXXXXXXXXXXXXXXXX", SECRET)
        .with_default_project_id(PROJECT)
        .with_default_organization_id(ORGANIZATION)
        .with_api_url(server.uri())
        .with_wait_retry_interval(Duration::from_millis(1));
    ScwProvider::new(config).unwrap()
}

fn server_json(name: &str, state: &str) -> serde_json::Value {
    json!({
        "id": SERVER_ID,
        "name": name,
        "commercial_type": "DEV1-S",
        "state": state,
        "state_detail": "",
        "image": {"id": "7d4a3b82-69ad-4a58-8d3a-5e0e2c1c7c11", "name": "Ubuntu 22.04"},
        "tags": ["front"],
        "project": PROJECT,
        "organization": ORGANIZATION,
        "zone": "fr-par-1",
        "public_ip": null,
        "private_ip": "10.1.2.3",
        "enable_ipv6": false
    })
}

fn network_json() -> serde_json::Value {
    json!({
        "id": NETWORK_ID,
        "name": "main",
        "organization_id": ORGANIZATION,
        "project_id": PROJECT,
        "region": "fr-par",
        "tags": ["prod"],
        "subnets": [{"id": "b0000000-0000-4000-8000-000000000001", "subnet": "172.16.0.0/22"}],
        "vpc_id": "c0000000-0000-4000-8000-000000000001",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

fn cluster_json(status: &str) -> serde_json::Value {
    json!({
        "id": CLUSTER_ID,
        "name": "apps",
        "type": "kapsule",
        "status": status,
        "version": "1.28.4",
        "cni": "cilium",
        "region": "fr-par",
        "organization_id": ORGANIZATION,
        "project_id": PROJECT,
        "description": "",
        "tags": [],
        "cluster_url": "https://a1b2c3d4.api.k8s.fr-par.scw.cloud:6443",
        "wildcard_dns": "*.a1b2c3d4.nodes.k8s.fr-par.scw.cloud",
        "upgrade_available": false,
        "private_network_id": NETWORK_ID
    })
}

fn gateway_json(status: &str) -> serde_json::Value {
    json!({
        "id": GATEWAY_ID,
        "name": "edge",
        "organization_id": ORGANIZATION,
        "project_id": PROJECT,
        "type": {"name": "VPC-GW-S"},
        "status": status,
        "tags": [],
        "ip": {"id": "d0000000-0000-4000-8000-000000000001", "address": "51.15.0.1"},
        "upstream_dns_servers": [],
        "zone": "fr-par-1",
        "bastion_enabled": false,
        "bastion_port": 61000,
        "smtp_enabled": false
    })
}

fn kafka_json(status: &str) -> serde_json::Value {
    json!({
        "id": KAFKA_ID,
        "name": "events",
        "status": status,
        "version": "3.7.1",
        "node_amount": 1,
        "node_type": "BASIC-BASE-1",
        "volume": {"type": "sbs_5k", "size_bytes": 10_000_000_000u64},
        "endpoints": [{
            "dns_records": ["events.kafka.internal"],
            "port": 9092,
            "private_network": {"private_network_id": NETWORK_ID}
        }],
        "tags": [],
        "project_id": PROJECT,
        "organization_id": ORGANIZATION,
        "region": "fr-par",
        "created_at": "2024-01-01T00:00:00Z"
    })
}

fn lb_json(lb_type: &str, status: &str) -> serde_json::Value {
    json!({
        "id": LB_ID,
        "name": "front",
        "description": "",
        "status": status,
        "type": lb_type,
        "ip": [{"id": "e0000000-0000-4000-8000-000000000001", "ip_address": "51.15.0.2"}],
        "tags": ["web"],
        "ssl_compatibility_level": "ssl_compatibility_level_intermediate",
        "project_id": PROJECT,
        "organization_id": ORGANIZATION,
        "zone": "fr-par-1"
    })
}

#[tokio::test]
async fn private_network_create_then_read_is_stable() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vpc/v2/regions/fr-par/private-networks"))
        .and(body_partial_json(json!({"name": "main", "project_id": PROJECT})))
        .respond_with(ResponseTemplate::new(200).set_body_json(network_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/vpc/v2/regions/fr-par/private-networks/{}", NETWORK_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(network_json()))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("vpc_private_network", "main")
        .with_attribute("name", Value::string("main"))
        .with_attribute("tags", Value::string_list(["prod"]));
    let mut state = State::not_found(resource.id.clone());

    provider.create(&resource, &mut state).await.unwrap();
    assert!(state.exists);
    assert_eq!(
        state.identifier.as_deref(),
        Some(format!("fr-par/{}", NETWORK_ID).as_str())
    );
    assert_eq!(state.get_str("region"), Some("fr-par"));
    assert_eq!(
        state.get_str("vpc_id"),
        Some("fr-par/c0000000-0000-4000-8000-000000000001")
    );

    provider.read(&mut state).await.unwrap();
    let first = state.clone();
    provider.read(&mut state).await.unwrap();
    assert_eq!(state, first);

    let schema = provider.schemas().remove("vpc_private_network").unwrap();
    assert!(matches!(diff(&resource, &state, Some(&schema)), Diff::NoChange(_)));
}

#[tokio::test]
async fn cluster_create_resolves_minor_version_and_waits() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/k8s/v1/regions/fr-par/versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "versions": [{"name": "1.29.1"}, {"name": "1.28.4"}, {"name": "1.28.3"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/k8s/v1/regions/fr-par/clusters"))
        .and(body_partial_json(json!({"version": "1.28.4", "cni": "cilium"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(cluster_json("creating")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/k8s/v1/regions/fr-par/clusters/{}", CLUSTER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(cluster_json("creating")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/k8s/v1/regions/fr-par/clusters/{}", CLUSTER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(cluster_json("ready")))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("k8s_cluster", "apps")
        .with_attribute("name", Value::string("apps"))
        .with_attribute("version", Value::string("1.28"))
        .with_attribute("cni", Value::string("cilium"))
        .with_attribute(
            "private_network_id",
            Value::string(format!("fr-par/{}", NETWORK_ID)),
        );
    let mut state = State::not_found(resource.id.clone());

    provider.create(&resource, &mut state).await.unwrap();
    assert_eq!(state.get_str("status"), Some("ready"));
    assert_eq!(state.get_str("version"), Some("1.28.4"));
    assert_eq!(
        state.identifier.as_deref(),
        Some(format!("fr-par/{}", CLUSTER_ID).as_str())
    );

    let schema = provider.schemas().remove("k8s_cluster").unwrap();
    assert!(matches!(diff(&resource, &state, Some(&schema)), Diff::NoChange(_)));
}

#[tokio::test]
async fn server_create_powers_on_and_waits_until_running() {
    init_logger();
    let server = MockServer::start().await;
    let servers = "/instance/v1/zones/fr-par-1/servers";
    Mock::given(method("POST"))
        .and(path(servers))
        .and(body_partial_json(json!({"commercial_type": "DEV1-S", "project": PROJECT})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"server": server_json("web", "stopped")})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/{}/action", servers, SERVER_ID)))
        .and(body_partial_json(json!({"action": "poweron"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", servers, SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "stopped")})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", servers, SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "starting")})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", servers, SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "running")})),
        )
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("instance_server", "web")
        .with_attribute("name", Value::string("web"))
        .with_attribute("type", Value::string("dev1-s"))
        .with_attribute("image", Value::string("ubuntu_jammy"))
        .with_attribute("tags", Value::string_list(["front"]));
    let mut state = State::not_found(resource.id.clone());

    provider.create(&resource, &mut state).await.unwrap();
    assert_eq!(state.get_str("state"), Some("started"));
    assert_eq!(state.get_str("zone"), Some("fr-par-1"));
    assert_eq!(state.get_str("private_ip"), Some("10.1.2.3"));

    let schema = provider.schemas().remove("instance_server").unwrap();
    assert!(matches!(diff(&resource, &state, Some(&schema)), Diff::NoChange(_)));
}

#[tokio::test]
async fn failed_power_on_keeps_server_tracked_and_resumes() {
    init_logger();
    let server = MockServer::start().await;
    let servers = "/instance/v1/zones/fr-par-1/servers";
    Mock::given(method("POST"))
        .and(path(servers))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"server": server_json("web", "stopped")})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/{}/action", servers, SERVER_ID)))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal error",
            "type": "internal_error"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/{}/action", servers, SERVER_ID)))
        .and(body_partial_json(json!({"action": "poweron"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", servers, SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "stopped")})),
        )
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", servers, SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "running")})),
        )
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("instance_server", "web")
        .with_attribute("name", Value::string("web"))
        .with_attribute("type", Value::string("DEV1-S"))
        .with_attribute("image", Value::string("ubuntu_jammy"));
    let mut state = State::not_found(resource.id.clone());

    let err = provider.create(&resource, &mut state).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(!state.exists);
    let expected = format!("fr-par-1/{}", SERVER_ID);
    assert_eq!(state.identifier.as_deref(), Some(expected.as_str()));

    provider.create(&resource, &mut state).await.unwrap();
    assert!(state.exists);
    assert_eq!(state.identifier.as_deref(), Some(expected.as_str()));
    assert_eq!(state.get_str("state"), Some("started"));
}

#[tokio::test]
async fn read_of_vanished_server_clears_state() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/instance/v1/zones/fr-par-1/servers/{}", SERVER_ID)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "resource is not found",
            "type": "not_found",
            "resource": "instance_server",
            "resource_id": SERVER_ID
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let mut state = State::existing(
        ResourceId::new("instance_server", "web"),
        [("name".to_string(), Value::string("web"))].into(),
    )
    .with_identifier(format!("fr-par-1/{}", SERVER_ID));

    provider.read(&mut state).await.unwrap();
    assert!(!state.exists);
    assert!(state.identifier.is_none());
    assert!(state.attributes.is_empty());
}

#[tokio::test]
async fn import_of_missing_application_is_not_found() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/iam/v1alpha1/applications/e0000000-0000-4000-8000-000000000001"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let id = ResourceId::new("iam_application", "ci");
    let err = provider
        .import(&id, "e0000000-0000-4000-8000-000000000001")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.resource_id, Some(id));
}

#[tokio::test]
async fn import_with_malformed_identifier_is_rejected() {
    init_logger();
    let server = MockServer::start().await;
    let provider = provider(&server);

    let err = provider
        .import(&ResourceId::new("instance_server", "web"), SERVER_ID)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);
}

#[tokio::test]
async fn server_lookup_by_exact_name() {
    init_logger();
    let server = MockServer::start().await;
    let mut near_match = server_json("web-1", "running");
    near_match["id"] = json!("a1b2c3d4-0000-4000-8000-0000000000ff");
    Mock::given(method("GET"))
        .and(path("/instance/v1/zones/fr-par-1/servers"))
        .and(query_param("name", "web"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [near_match, server_json("web", "running")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/instance/v1/zones/fr-par-1/servers/{}", SERVER_ID)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"server": server_json("web", "running")})),
        )
        .mount(&server)
        .await;

    let provider = provider(&server);
    let data_source = Resource::new("instance_server", "web")
        .with_attribute("name", Value::string("web"))
        .with_read_only(true);

    let state = provider.lookup(&data_source).await.unwrap();
    let expected = format!("fr-par-1/{}", SERVER_ID);
    assert_eq!(state.identifier.as_deref(), Some(expected.as_str()));
    assert_eq!(state.get_str("server_id"), Some(expected.as_str()));
}

#[tokio::test]
async fn cluster_lookup_is_scoped_to_declared_project() {
    init_logger();
    let server = MockServer::start().await;
    let mut other = cluster_json("ready");
    other["id"] = json!("a1b2c3d4-0000-4000-8000-0000000000ee");
    other["project_id"] = json!(OTHER_PROJECT);
    Mock::given(method("GET"))
        .and(path("/k8s/v1/regions/fr-par/clusters"))
        .and(query_param("name", "apps"))
        .and(query_param("project_id", PROJECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clusters": [cluster_json("ready")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/k8s/v1/regions/fr-par/clusters"))
        .and(query_param("name", "apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clusters": [other, cluster_json("ready")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/k8s/v1/regions/fr-par/clusters/{}", CLUSTER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(cluster_json("ready")))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let unscoped = Resource::new("k8s_cluster", "apps")
        .with_attribute("name", Value::string("apps"))
        .with_read_only(true);
    let err = provider.lookup(&unscoped).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message.contains("more than one"));

    let scoped = unscoped.with_attribute("project_id", Value::string(PROJECT));
    let state = provider.lookup(&scoped).await.unwrap();
    let expected = format!("fr-par/{}", CLUSTER_ID);
    assert_eq!(state.get_str("cluster_id"), Some(expected.as_str()));
    assert_eq!(state.get_str("project_id"), Some(PROJECT));
}

#[tokio::test]
async fn failed_gateway_is_still_deleted() {
    init_logger();
    let server = MockServer::start().await;
    let gateway = format!("/vpc-gw/v1/zones/fr-par-1/gateways/{}", GATEWAY_ID);
    Mock::given(method("GET"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_json("failed")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"type": "not_found"})))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let mut state = State::existing(ResourceId::new("vpc_public_gateway", "edge"), Default::default())
        .with_identifier(format!("fr-par-1/{}", GATEWAY_ID));

    provider.delete(&mut state).await.unwrap();
    assert!(state.identifier.is_none());
}

#[tokio::test]
async fn gateway_delete_waits_until_gone() {
    init_logger();
    let server = MockServer::start().await;
    let gateway = format!("/vpc-gw/v1/zones/fr-par-1/gateways/{}", GATEWAY_ID);
    Mock::given(method("GET"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_json("running")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(gateway.as_str()))
        .and(query_param("cleanup_dhcp", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_json("deleting")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(gateway.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"type": "not_found"})))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let mut state = State::existing(ResourceId::new("vpc_public_gateway", "edge"), Default::default())
        .with_identifier(format!("fr-par-1/{}", GATEWAY_ID));

    provider.delete(&mut state).await.unwrap();
    assert!(!state.exists);
    assert!(state.identifier.is_none());
}

#[tokio::test]
async fn kafka_cluster_create_lookup_and_delete() {
    init_logger();
    let server = MockServer::start().await;
    let clusters = "/kafka/v1alpha1/regions/fr-par/clusters";
    let cluster = format!("{}/{}", clusters, KAFKA_ID);
    Mock::given(method("POST"))
        .and(path(clusters))
        .and(body_partial_json(json!({
            "user_name": "admin",
            "password": "Sup3r-s3cret!",
            "volume": {"size_bytes": 10_000_000_000u64},
            "endpoints": [{"private_network": {"private_network_id": NETWORK_ID}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(kafka_json("creating")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(cluster.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(kafka_json("creating")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(cluster.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(kafka_json("ready")))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(cluster.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"type": "not_found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(clusters))
        .and(query_param("name", "events"))
        .and(query_param("project_id", PROJECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clusters": [kafka_json("ready")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(cluster.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(kafka_json("deleting")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("kafka_cluster", "events")
        .with_attribute("name", Value::string("events"))
        .with_attribute("version", Value::string("3.7.1"))
        .with_attribute("node_amount", Value::Int(1))
        .with_attribute("node_type", Value::string("basic-base-1"))
        .with_attribute("volume_size_in_gb", Value::Int(10))
        .with_attribute("user_name", Value::string("admin"))
        .with_attribute("password", Value::string("Sup3r-s3cret!"))
        .with_attribute(
            "private_network_id",
            Value::string(format!("fr-par/{}", NETWORK_ID)),
        );
    let mut state = State::not_found(resource.id.clone());

    provider.create(&resource, &mut state).await.unwrap();
    assert!(state.exists);
    assert_eq!(state.get_str("status"), Some("ready"));
    assert_eq!(state.get("volume_size_in_gb"), Some(&Value::Int(10)));
    assert!(state.get("password").is_none());

    let schema = provider.schemas().remove("kafka_cluster").unwrap();
    assert!(matches!(diff(&resource, &state, Some(&schema)), Diff::NoChange(_)));

    let data_source = Resource::new("kafka_cluster", "events")
        .with_attribute("name", Value::string("events"))
        .with_attribute("project_id", Value::string(PROJECT))
        .with_read_only(true);
    let found = provider.lookup(&data_source).await.unwrap();
    let expected = format!("fr-par/{}", KAFKA_ID);
    assert_eq!(found.get_str("cluster_id"), Some(expected.as_str()));

    provider.delete(&mut state).await.unwrap();
    assert!(state.identifier.is_none());
}

#[tokio::test]
async fn lb_type_change_migrates_in_place() {
    init_logger();
    let server = MockServer::start().await;
    let lb = format!("/lb/v1/zones/fr-par-1/lbs/{}", LB_ID);
    Mock::given(method("GET"))
        .and(path(lb.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_json("LB-S", "ready")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(lb.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_json("LB-S", "migrating")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(lb.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_json("LB-GP-M", "ready")))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(lb.as_str()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"type": "not_found"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/migrate", lb)))
        .and(body_partial_json(json!({"type": "LB-GP-M"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_json("LB-S", "migrating")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(lb.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(lb_json("LB-S", "ready")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(lb.as_str()))
        .and(query_param("release_ip", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let resource = Resource::new("lb", "front")
        .with_attribute("name", Value::string("front"))
        .with_attribute("type", Value::string("LB-GP-M"))
        .with_attribute("tags", Value::string_list(["web"]));
    let mut state = provider
        .import(&resource.id, &format!("fr-par-1/{}", LB_ID))
        .await
        .unwrap();
    assert_eq!(state.get_str("type"), Some("LB-S"));

    let schema = provider.schemas().remove("lb").unwrap();
    let changed = match diff(&resource, &state, Some(&schema)) {
        Diff::Update { changed_attributes, .. } => changed_attributes,
        other => panic!("expected an in-place update, got {:?}", other),
    };
    assert_eq!(changed, vec!["type".to_string()]);

    provider.update(&resource, &changed, &mut state).await.unwrap();
    assert_eq!(state.get_str("type"), Some("LB-GP-M"));
    assert_eq!(state.get_str("ip_address"), Some("51.15.0.2"));

    provider.delete(&mut state).await.unwrap();
    assert!(state.identifier.is_none());
}

#[tokio::test]
async fn unsupported_types_are_validation_errors() {
    let server = MockServer::start().await;
    let provider = provider(&server);
    let mut state = State::not_found(ResourceId::new("instance_snapshot", "s"));
    let err = provider.read(&mut state).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(provider.resource_types().len(), 10);
}
