use crdform::prelude::*;
use crdform::testkit::{assert_keys, TestKit, FIRST_ID};

use crdform::serde_json::{json, Value};

use std::io::Write;

const DATABASE: &str = "k8s_databases_schemahero_io_database_v1alpha4";
const CLUSTER_DEPLOYMENT: &str = "k8s_hive_openshift_io_clusterdeployment_v1";
const CERTIFICATE: &str = "k8s_cert_manager_io_certificate_v1";

fn setup() -> TestKit {
    std::env::set_var("RUST_LOG", "crdform=trace");
    let _ = env_logger::try_init();
    TestKit::new()
}

fn sqlite_db(name: &str) -> Value {
    json!({
        "metadata": {"name": name},
        "spec": {"connection": {"sqlite": {"dsn": "file:test.db"}}},
    })
}

fn cluster(spec_overrides: Value) -> Value {
    let mut spec = json!({
        "cluster_name": "hive-one",
        "base_domain": "example.com",
        "platform": {"aws": {"region": "us-east-1", "credentials_secret_ref": {"name": "aws-creds"}}},
    });
    if let (Some(spec), Some(overrides)) = (spec.as_object_mut(), spec_overrides.as_object()) {
        for (key, value) in overrides {
            spec.insert(key.clone(), value.clone());
        }
    }
    json!({
        "metadata": {"name": "hive-one", "namespace": "hive"},
        "spec": spec,
    })
}

#[test]
fn minimal_database_renders_exactly_the_given_fields() {
    let mut testkit = setup();
    let state = testkit.create_ok(DATABASE, &sqlite_db("db1"));
    assert_eq!(FIRST_ID, state.id);

    let rendered = testkit.rendered(DATABASE, ObjectIdRef::unnamespaced("db1")).unwrap();
    assert_eq!(
        json!({
            "apiVersion": "databases.schemahero.io/v1alpha4",
            "kind": "Database",
            "metadata": {"name": "db1"},
            "spec": {"connection": {"sqlite": {"dsn": "file:test.db"}}},
        }),
        rendered
    );
    assert_keys(&rendered, &["apiVersion", "kind", "metadata", "spec"]);
    assert_keys(&rendered["metadata"], &["name"]);
    assert!(!state.yaml.contains("null"));
    assert!(!state.yaml.contains("id:"));
}

#[test]
fn rendering_is_idempotent_after_reparse() {
    let mut testkit = setup();
    let state = testkit.create_ok(DATABASE, &sqlite_db("db1"));
    let reparsed = ResourceInstance::from_yaml(&state.yaml).unwrap();
    assert_eq!(state.instance, reparsed);
    assert_eq!(state.yaml, reparsed.to_yaml().unwrap());
}

#[test]
fn update_with_identical_content_changes_only_the_id() {
    let mut testkit = setup();
    let created = testkit.create_ok(DATABASE, &sqlite_db("db1"));
    let updated = testkit
        .update(DATABASE, ObjectIdRef::unnamespaced("db1"), &sqlite_db("db1"))
        .unwrap();
    assert_ne!(created.id, updated.id);
    assert!(updated.id > created.id);
    assert_eq!(created.yaml, updated.yaml);
    assert_eq!(created.instance, updated.instance);
}

#[test]
fn delete_always_succeeds_and_leaves_nothing_to_read() {
    let mut testkit = setup();
    testkit.create_ok(DATABASE, &sqlite_db("db1"));

    assert!(testkit.delete(DATABASE, ObjectIdRef::unnamespaced("db1")).is_some());
    assert!(testkit.read(DATABASE, ObjectIdRef::unnamespaced("db1")).is_none());

    // deleting again, or deleting something that never existed, is still fine
    assert!(testkit.delete(DATABASE, ObjectIdRef::unnamespaced("db1")).is_none());
    assert!(testkit.delete(DATABASE, ("nowhere", "nothing")).is_none());
    assert!(testkit.delete("k8s_unknown_type_v1", ("nowhere", "nothing")).is_none());
}

#[test]
fn read_returns_stored_state_unchanged() {
    let mut testkit = setup();
    let created = testkit.create_ok(CLUSTER_DEPLOYMENT, &cluster(json!({})));
    assert_eq!(Some(created.clone()), testkit.read(CLUSTER_DEPLOYMENT, ("hive", "hive-one")));
    assert_eq!(Some(created), testkit.read(CLUSTER_DEPLOYMENT, ("hive", "hive-one")));
}

#[test]
fn missing_required_fields_name_the_exact_path() {
    let mut testkit = setup();
    testkit.assert_rejected(
        CLUSTER_DEPLOYMENT,
        &json!({"metadata": {"name": "c1"}, "spec": {"base_domain": "example.com", "platform": {}}}),
        ErrorKind::MissingRequiredField,
        "spec.cluster_name",
    );
    testkit.assert_rejected(
        CLUSTER_DEPLOYMENT,
        &cluster(json!({"certificate_bundles": [
            {"name": "a", "certificate_secret_ref": {"name": "a"}},
            {"name": "b"},
        ]})),
        ErrorKind::MissingRequiredField,
        "spec.certificate_bundles[1].certificate_secret_ref",
    );
    testkit.assert_rejected(
        DATABASE,
        &json!({"spec": {}}),
        ErrorKind::MissingRequiredField,
        "metadata",
    );
}

#[test]
fn power_state_accepts_only_declared_values() {
    let mut testkit = setup();
    for allowed in &["", "Running", "Hibernating"] {
        let state = testkit.create_ok(CLUSTER_DEPLOYMENT, &cluster(json!({"power_state": allowed})));
        let rendered = state.rendered_value().unwrap();
        assert_eq!(json!(allowed), rendered["spec"]["powerState"]);
    }
    for rejected in &["running", "HIBERNATING", "Stopped", " "] {
        testkit.assert_rejected(
            CLUSTER_DEPLOYMENT,
            &cluster(json!({"power_state": rejected})),
            ErrorKind::SchemaViolation,
            "spec.power_state",
        );
    }
}

#[test]
fn hibernate_after_must_be_a_duration() {
    let mut testkit = setup();
    for allowed in &["5m", "1h30m", "90s", "1.5h"] {
        testkit.create_ok(CLUSTER_DEPLOYMENT, &cluster(json!({"hibernate_after": allowed})));
    }
    for rejected in &["5x", "5", "m5", "", "1h 30m"] {
        testkit.assert_rejected(
            CLUSTER_DEPLOYMENT,
            &cluster(json!({"hibernate_after": rejected})),
            ErrorKind::SchemaViolation,
            "spec.hibernate_after",
        );
    }
}

#[test]
fn azure_cloud_name_and_claimed_timestamp_are_validated() {
    let mut testkit = setup();
    let azure = |cloud_name: &str| {
        json!({"azure": {
            "base_domain_resource_group_name": "rg",
            "cloud_name": cloud_name,
            "region": "eastus",
            "credentials_secret_ref": {"name": "azure-creds"},
        }})
    };
    testkit.create_ok(CLUSTER_DEPLOYMENT, &cluster(json!({"platform": azure("AzureChinaCloud")})));
    testkit.assert_rejected(
        CLUSTER_DEPLOYMENT,
        &cluster(json!({"platform": azure("AzureMoonCloud")})),
        ErrorKind::SchemaViolation,
        "spec.platform.azure.cloud_name",
    );

    let pool_ref = |timestamp: &str| {
        json!({"cluster_pool_ref": {"namespace": "pools", "pool_name": "small", "claimed_timestamp": timestamp}})
    };
    testkit.create_ok(CLUSTER_DEPLOYMENT, &cluster(pool_ref("2021-03-04T05:06:07Z")));
    testkit.assert_rejected(
        CLUSTER_DEPLOYMENT,
        &cluster(pool_ref("yesterday")),
        ErrorKind::SchemaViolation,
        "spec.cluster_pool_ref.claimed_timestamp",
    );
}

#[test]
fn no_implicit_coercion_between_kinds() {
    let mut testkit = setup();
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "db1"}, "spec": {"deploy_seconds": "30"}}),
        ErrorKind::SchemaViolation,
        "spec.deploy_seconds",
    );
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "db1"}, "spec": {"immediate_deploy": "true"}}),
        ErrorKind::SchemaViolation,
        "spec.immediate_deploy",
    );
    testkit.assert_rejected(
        CERTIFICATE,
        &json!({"metadata": {"name": "web"}, "spec": {
            "secret_name": "web-tls",
            "issuer_ref": {"name": "letsencrypt"},
            "private_key": {"size": 2048.5},
        }}),
        ErrorKind::SchemaViolation,
        "spec.private_key.size",
    );
}

#[test]
fn references_are_rendered_with_crd_names() {
    let mut testkit = setup();
    let candidate = json!({
        "metadata": {"name": "pg", "namespace": "schemas"},
        "spec": {"connection": {"postgres": {
            "uri": {"value_from": {"secret_key_ref": {"name": "pg-creds", "key": "uri"}}},
            "schema": "public",
        }}},
    });
    testkit.create_ok(DATABASE, &candidate);
    let rendered = testkit.rendered(DATABASE, ("schemas", "pg")).unwrap();
    assert_eq!(
        json!({
            "uri": {"valueFrom": {"secretKeyRef": {"name": "pg-creds", "key": "uri"}}},
            "schema": "public",
        }),
        rendered["spec"]["connection"]["postgres"]
    );
}

#[test]
fn ambiguous_and_missing_references_are_rejected() {
    let mut testkit = setup();
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "pg"}, "spec": {"connection": {"postgres": {
            "uri": {
                "value": "postgres://localhost",
                "value_from": {"secret_key_ref": {"name": "pg-creds", "key": "uri"}},
            },
        }}}}),
        ErrorKind::AmbiguousSource,
        "spec.connection.postgres.uri",
    );
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "cass"}, "spec": {"connection": {"cassandra": {
            "hosts": ["10.0.0.1"],
            "keyspace": {},
        }}}}),
        ErrorKind::MissingRequiredValue,
        "spec.connection.cassandra.keyspace",
    );
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "pg"}, "spec": {"connection": {"postgres": {
            "uri": {"value_from": {"secret_key_ref": {"name": "pg-creds"}}},
        }}}}),
        ErrorKind::MissingRequiredField,
        "spec.connection.postgres.uri.value_from.secret_key_ref.key",
    );
}

#[test]
fn certificate_renders_lists_and_nested_objects_in_order() {
    let mut testkit = setup();
    let state = testkit.create_ok(
        CERTIFICATE,
        &json!({
            "metadata": {"name": "web", "namespace": "default", "labels": {"app": "web"}},
            "spec": {
                "secret_name": "web-tls",
                "issuer_ref": {"name": "letsencrypt", "kind": "ClusterIssuer"},
                "dns_names": ["example.com", "www.example.com"],
                "duration": "2160h",
                "usages": ["server auth", "digital signature"],
                "private_key": {"algorithm": "ECDSA", "size": 256},
                "is_ca": false,
            },
        }),
    );
    let rendered = state.rendered_value().unwrap();
    assert_keys(&rendered["metadata"], &["name", "namespace", "labels"]);
    assert_keys(
        &rendered["spec"],
        &["secretName", "issuerRef", "dnsNames", "duration", "isCA", "usages", "privateKey"],
    );
    assert_eq!(json!(false), rendered["spec"]["isCA"]);
}

#[test]
fn computed_attributes_cannot_be_supplied() {
    let mut testkit = setup();
    let mut candidate = sqlite_db("db1");
    candidate["id"] = json!(42);
    testkit.assert_rejected(DATABASE, &candidate, ErrorKind::SchemaViolation, "id");

    let mut candidate = sqlite_db("db1");
    candidate["yaml"] = json!("apiVersion: v1");
    testkit.assert_rejected(DATABASE, &candidate, ErrorKind::SchemaViolation, "yaml");
}

#[test]
fn unknown_attributes_are_rejected() {
    let mut testkit = setup();
    testkit.assert_rejected(
        DATABASE,
        &json!({"metadata": {"name": "db1"}, "spec": {"connection": {"sqlite": {"dsn": "x", "dns": "x"}}}}),
        ErrorKind::SchemaViolation,
        "spec.connection.sqlite.dns",
    );
}

#[test]
fn host_schema_describes_every_bundled_type() {
    let testkit = setup();
    let schemas = testkit.provider().schemas();
    assert_eq!(3, schemas.len());
    for schema in schemas.iter() {
        let names: Vec<&str> = schema.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(vec!["metadata", "spec", "id", "yaml"], names, "{}", schema.type_name);
        assert!(schema.attribute("id").unwrap().computed);
    }

    let cluster = testkit.provider().schema(CLUSTER_DEPLOYMENT).unwrap();
    let installed = cluster.attribute_at("spec.installed").unwrap();
    assert!(installed.optional && installed.computed);
    let power_state = cluster.attribute_at("spec.power_state").unwrap();
    assert_eq!(HostType::String, power_state.host_type);
    assert_eq!(1, power_state.validators.len());

    let uri = testkit
        .provider()
        .schema(DATABASE)
        .unwrap()
        .attribute_at("spec.connection.postgres.uri.value_from.vault.role")
        .cloned()
        .unwrap();
    assert!(uri.required);

    let json = cluster.to_json_pretty().unwrap();
    assert!(json.contains("\"type_name\": \"k8s_hive_openshift_io_clusterdeployment_v1\""));
}

#[test]
fn descriptors_from_a_directory_become_resource_types() {
    let _ = setup();
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("widget.yaml")).unwrap();
    file.write_all(
        br#"
apiVersion: example.com/v1beta1
kind: Widget
namespaced: false
spec:
  fields:
    - name: replicaCount
      type: int
      validators:
        - minimum: 1
        - maximum: 10
"#,
    )
    .unwrap();

    let config = ProviderConfig::new().with_schema_dir(dir.path()).unwrap();
    let mut testkit = TestKit::with_config(config);
    let type_name = "k8s_example_com_widget_v1beta1";
    assert_eq!(vec![type_name], testkit.provider().resource_types().collect::<Vec<_>>());

    let state = testkit.create_ok(
        type_name,
        &json!({"metadata": {"name": "w"}, "spec": {"replica_count": 3}}),
    );
    assert!(state.yaml.contains("replicaCount: 3"));
    testkit.assert_rejected(
        type_name,
        &json!({"metadata": {"name": "w2"}, "spec": {"replica_count": 11}}),
        ErrorKind::SchemaViolation,
        "spec.replica_count",
    );
    testkit.assert_rejected(
        type_name,
        &json!({"metadata": {"name": "w3", "namespace": "default"}}),
        ErrorKind::SchemaViolation,
        "metadata.namespace",
    );
}

#[test]
fn metrics_track_operations_per_type() {
    let mut testkit = setup();
    testkit.create_ok(DATABASE, &sqlite_db("db1"));
    testkit.create_ok(DATABASE, &sqlite_db("db2"));
    testkit.delete(DATABASE, ObjectIdRef::unnamespaced("db1"));

    let text = testkit.provider().metrics().encode_as_text().unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains(
        "instances{apiVersion=\"databases.schemahero.io/v1alpha4\",kind=\"Database\"} 1"
    ));
}
