//! Provisioning integration tests
//!
//! - Dependency expansion idempotence and set-if-absent merges
//! - Resource kinds (admin account, data dir, ui)
//! - Port allocation against stored claims
//! - Unknown resource types

mod common;

use common::*;
use freeds_core::config::PortRange;
use freeds_core::types::ResourceSpec;
use freeds_core::{Error, PluginEnvironment};
use freeds_plugins::{get_free_port_number, PluginManifest, Provisioner};
use freeds_store::{MemoryStore, SecretStore};
use serde_json::{json, Value};
use std::sync::Arc;

fn provisioner(store: Arc<dyn SecretStore>, fixture: &PluginFixture) -> Provisioner {
    Provisioner::new(store, fixture.data_dir())
}

#[tokio::test]
async fn test_postgres_expansion_is_idempotent() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = manifest_named("airflow", &["postgres"]);

    provisioner.provision_all(&mut manifest).await.unwrap();
    provisioner.provision_all(&mut manifest).await.unwrap();

    let names: Vec<_> = manifest.resources().keys().cloned().collect();
    assert_eq!(names, vec!["airflow_pguser", "airflow_pgdb"]);
}

#[tokio::test]
async fn test_existing_implied_resource_keeps_custom_params() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = manifest_named("airflow", &["postgres"]);
    manifest.resources_mut().insert(
        "airflow_pguser".into(),
        ResourceSpec::new("PostgresUser", "custom user").with_param("login", "af"),
    );

    provisioner.provision_all(&mut manifest).await.unwrap();

    let user = &manifest.resources()["airflow_pguser"];
    assert_eq!(user.description, "custom user");
    assert_eq!(user.params["login"], "af");
    assert_eq!(manifest.resources().len(), 2);
}

#[tokio::test]
async fn test_unknown_type_leaves_config_untouched() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = PluginManifest::new("kafka");
    manifest
        .resources_mut()
        .insert("admin".into(), ResourceSpec::new("AdminAccount", ""));
    manifest
        .resources_mut()
        .insert("foo".into(), ResourceSpec::new("Nonexistent", ""));
    let before = manifest.config().clone();

    let err = provisioner.provision_all(&mut manifest).await.unwrap_err();

    match err {
        Error::UnknownResourceType {
            plugin,
            resource_type,
        } => {
            assert_eq!(plugin, "kafka");
            assert_eq!(resource_type, "Nonexistent");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(manifest.config(), &before);
}

#[tokio::test]
async fn test_admin_account() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = PluginManifest::new("superset");
    manifest
        .resources_mut()
        .insert("admin".into(), ResourceSpec::new("adminaccount", "Admin login"));

    provisioner.provision_all(&mut manifest).await.unwrap();

    assert_eq!(manifest.config()["admin_user"], "freeds");
    let password = manifest.config()["admin_password"].as_str().unwrap();
    assert_eq!(password.chars().count(), 10);
    assert!(password.chars().all(|c| c.is_ascii_graphic()));
}

#[tokio::test]
async fn test_data_dirs_are_created() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = PluginManifest::new("spark");
    manifest
        .resources_mut()
        .insert("data".into(), ResourceSpec::new("DataDir", ""));
    manifest.resources_mut().insert(
        "logs".into(),
        ResourceSpec::new("DataDir", "").with_param("name", "logs"),
    );

    provisioner.provision_all(&mut manifest).await.unwrap();
    // existing directories are not an error
    provisioner.provision_all(&mut manifest).await.unwrap();

    let base = fixture.data_dir().canonicalize().unwrap().join("spark");
    assert_eq!(
        manifest.config()["datadir"],
        Value::String(base.display().to_string())
    );
    assert_eq!(
        manifest.config()["datadir_logs"],
        Value::String(base.join("logs").display().to_string())
    );
    assert!(base.join("logs").is_dir());
}

#[tokio::test]
async fn test_data_dir_outside_data_root_is_rejected() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let outside = fixture.root().join("escaped");

    for name in [outside.display().to_string(), "../../dotescape".to_string()] {
        let mut manifest = PluginManifest::new("spark");
        manifest.resources_mut().insert(
            "data".into(),
            ResourceSpec::new("DataDir", "").with_param("name", name.clone()),
        );
        let before = manifest.config().clone();

        let err = provisioner.provision_all(&mut manifest).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "{name}: {err:?}");
        assert_eq!(manifest.config(), &before);
    }
    assert!(!outside.exists());
    assert!(!fixture.root().join("dotescape").exists());
    assert!(!fixture.data_dir().join("spark").exists());
}

#[tokio::test]
async fn test_free_port_skips_claimed_ports() {
    let store = MemoryStore::with_entries([ui_claim_entry("a", 8000), ui_claim_entry("b", 8001)]);
    let port = get_free_port_number(&store, PortRange::default())
        .await
        .unwrap();
    assert_eq!(port, 8002);
}

#[tokio::test]
async fn test_ui_allocates_distinct_ports_and_resolves_uri() {
    let fixture = PluginFixture::new();
    let store = Arc::new(MemoryStore::with_entries([ui_claim_entry("a", 8000)]));
    let provisioner = provisioner(as_store(&store), &fixture);

    let mut manifest = PluginManifest::new("kafka");
    manifest
        .config_mut()
        .insert("host".into(), json!("localhost"));
    manifest.resources_mut().insert(
        "web".into(),
        ResourceSpec::new("Ui", "Kafka ui")
            .with_param("uri", "http://${FDS_KAFKA_HOST}:${FDS_KAFKA_UI_PORT}/"),
    );
    manifest.resources_mut().insert(
        "admin".into(),
        ResourceSpec::new("Ui", "Admin ui")
            .with_param("name", "admin")
            .with_param("uri", "http://$FDS_KAFKA_HOST:${FDS_KAFKA_UI_PORT_ADMIN} $UNKNOWN"),
    );

    provisioner.provision_all(&mut manifest).await.unwrap();

    assert_eq!(manifest.config()["ui_port"], 8001);
    assert_eq!(manifest.config()["ui_port_admin"], 8002);
    assert_eq!(manifest.config()["ui_uri"], "http://localhost:8001/");
    assert_eq!(
        manifest.config()["ui_uri_admin"],
        "http://localhost:8002 $UNKNOWN"
    );
    assert_eq!(manifest.resources()["web"].params["number"], 8001);
    assert_eq!(
        manifest.claimed_ports().into_iter().collect::<Vec<_>>(),
        vec![8001, 8002]
    );

    // fixed ports survive re-provisioning
    provisioner.provision_all(&mut manifest).await.unwrap();
    assert_eq!(manifest.config()["ui_port"], 8001);
}

#[tokio::test]
async fn test_ui_known_port_is_used_verbatim() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = PluginManifest::new("spark");
    manifest.resources_mut().insert(
        "master".into(),
        ResourceSpec::new("Ui", "").with_param("known_port", "4040"),
    );

    provisioner.provision_all(&mut manifest).await.unwrap();

    assert_eq!(manifest.config()["ui_port"], 4040);
    assert!(!manifest.resources()["master"].params.contains_key("number"));
}

#[tokio::test]
async fn test_exhausted_port_range() {
    let fixture = PluginFixture::new();
    let store = Arc::new(MemoryStore::with_entries([ui_claim_entry("a", 8000)]));
    let provisioner =
        provisioner(as_store(&store), &fixture).with_port_range(PortRange::new(8000, 8000).unwrap());
    let mut manifest = PluginManifest::new("kafka");
    manifest
        .resources_mut()
        .insert("web".into(), ResourceSpec::new("Ui", ""));

    let err = provisioner.provision_all(&mut manifest).await.unwrap_err();
    assert!(matches!(err, Error::ResourceExhausted { .. }));
}

#[tokio::test]
async fn test_informational_resources_produce_nothing() {
    let fixture = PluginFixture::new();
    let provisioner = provisioner(as_store(&memory_store()), &fixture);
    let mut manifest = PluginManifest::new("minio");
    for (name, kind) in [
        ("broker", "KnownPort"),
        ("db", "PostgresDatabase"),
        ("store", "S3"),
        ("bucket", "S3Bucket"),
    ] {
        manifest
            .resources_mut()
            .insert(name.into(), ResourceSpec::new(kind, ""));
    }
    let before = manifest.config().clone();

    provisioner.provision_all(&mut manifest).await.unwrap();
    assert_eq!(manifest.config(), &before);
}

#[test]
fn test_environment_round_trip() {
    let mut manifest = PluginManifest::new("kafka");
    manifest.config_mut().clear();
    manifest
        .config_mut()
        .insert("broker_url".into(), json!("x"));

    let exported = manifest.export_environment();
    assert_eq!(
        exported.as_map().iter().collect::<Vec<_>>(),
        vec![(&"FDS_KAFKA_BROKER_URL".to_string(), &"x".to_string())]
    );

    let reimported = PluginEnvironment::from_vars(
        "FDS",
        exported
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .chain([("PATH".to_string(), "/usr/bin".to_string())]),
    );
    assert_eq!(reimported.get("kafka", "broker_url"), Some("x"));
    assert_eq!(reimported.len(), 1);
}
