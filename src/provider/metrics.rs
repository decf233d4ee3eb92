use crate::k8s_types::K8sType;

use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

use std::fmt::{self, Debug, Display};

const API_VERSION_AND_KIND: &[&str] = &["apiVersion", "kind"];
const API_VERSION_KIND_AND_OPERATION: &[&str] = &["apiVersion", "kind", "operation"];

/// The lifecycle operations, used as the value of the `operation` label
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Metrics {
    registry: Registry,
    lifecycle_operations: IntCounterVec,
    validation_failures: IntCounterVec,
    instances: IntGaugeVec,
}

impl Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Metrics")
    }
}

impl Default for Metrics {
    fn default() -> Metrics {
        Metrics::new()
    }
}

impl Metrics {
    pub fn new() -> Metrics {
        let registry = Registry::new();

        let operation_opts = Opts::new(
            "lifecycle_operations",
            "number of lifecycle operations invoked by the host, by resource type",
        )
        .variable_label("apiVersion")
        .variable_label("kind")
        .variable_label("operation");
        // creating and registering metrics can only fail on invalid or duplicate names
        let lifecycle_operations =
            IntCounterVec::new(operation_opts, API_VERSION_KIND_AND_OPERATION).unwrap();
        registry
            .register(Box::new(lifecycle_operations.clone()))
            .unwrap();

        let failure_opts = Opts::new(
            "validation_failures",
            "number of candidates that were rejected by validation",
        )
        .variable_label("apiVersion")
        .variable_label("kind");
        let validation_failures = IntCounterVec::new(failure_opts, API_VERSION_AND_KIND).unwrap();
        registry
            .register(Box::new(validation_failures.clone()))
            .unwrap();

        let instance_opts = Opts::new("instances", "number of instances currently held in state")
            .variable_label("apiVersion")
            .variable_label("kind");
        let instances = IntGaugeVec::new(instance_opts, API_VERSION_AND_KIND).unwrap();
        registry.register(Box::new(instances.clone())).unwrap();

        Metrics {
            registry,
            lifecycle_operations,
            validation_failures,
            instances,
        }
    }

    pub fn operation_invoked(&self, k8s_type: &K8sType, operation: Operation) {
        self.lifecycle_operations
            .with_label_values(&[k8s_type.api_version, k8s_type.kind, operation.as_str()])
            .inc();
    }

    pub fn validation_failed(&self, k8s_type: &K8sType) {
        self.validation_failures
            .with_label_values(&[k8s_type.api_version, k8s_type.kind])
            .inc();
    }

    pub fn set_instance_count(&self, k8s_type: &K8sType, count: usize) {
        self.instances
            .with_label_values(&[k8s_type.api_version, k8s_type.kind])
            .set(count as i64);
    }

    pub fn operation_count(&self, k8s_type: &K8sType, operation: Operation) -> i64 {
        self.lifecycle_operations
            .with_label_values(&[k8s_type.api_version, k8s_type.kind, operation.as_str()])
            .get()
    }

    pub fn validation_failure_count(&self, k8s_type: &K8sType) -> i64 {
        self.validation_failures
            .with_label_values(&[k8s_type.api_version, k8s_type.kind])
            .get()
    }

    pub fn encode_as_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::with_capacity(4096);
        encoder.encode(self.registry.gather().as_slice(), &mut buffer)?;
        Ok(buffer)
    }
}
