//! Helpers for testing resource types end to end. The `TestKit` plays the part of the host: it
//! owns a `Provider`, always issues ids from a sequence so they're predictable, and offers
//! assertions on the rendered yaml.
//!
//! This module is only available with the `testkit` feature. It doesn't install a logger, so
//! tests that want log output should call `env_logger::try_init()` themselves.
use crate::config::{IdStrategy, ProviderConfig};
use crate::error::{ErrorKind, ResourceError};
use crate::provider::Provider;
use crate::resource::{ObjectIdRef, ResourceState};

use serde_json::Value;

/// The first id issued by a `TestKit`
pub const FIRST_ID: i64 = 1;

#[derive(Debug)]
pub struct TestKit {
    provider: Provider,
}

impl Default for TestKit {
    fn default() -> TestKit {
        TestKit::new()
    }
}

impl TestKit {
    /// A test kit with all of the bundled CRDs
    pub fn new() -> TestKit {
        TestKit::with_config(ProviderConfig::new().with_builtin_crds())
    }

    /// A test kit using the given config. The id strategy is always replaced with a sequence
    /// starting at `FIRST_ID`.
    pub fn with_config(config: ProviderConfig) -> TestKit {
        let config = config.with_id_strategy(IdStrategy::Sequence { start: FIRST_ID });
        TestKit {
            provider: Provider::new(config),
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    pub fn create(&mut self, resource_type: &str, candidate: &Value) -> Result<ResourceState, ResourceError> {
        self.provider.create(resource_type, candidate)
    }

    pub fn update<'a>(
        &mut self,
        resource_type: &str,
        prior: impl Into<ObjectIdRef<'a>>,
        candidate: &Value,
    ) -> Result<ResourceState, ResourceError> {
        self.provider.update(resource_type, prior, candidate)
    }

    /// Reads the stored state, panicking if the resource type is unknown
    pub fn read<'a>(&self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<ResourceState> {
        match self.provider.read(resource_type, id) {
            Ok(state) => state,
            Err(err) => panic!("read of '{}' failed: {}", resource_type, err),
        }
    }

    pub fn delete<'a>(&mut self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<ResourceState> {
        self.provider.delete(resource_type, id)
    }

    /// Creates the resource, panicking with the error message if it fails
    pub fn create_ok(&mut self, resource_type: &str, candidate: &Value) -> ResourceState {
        match self.create(resource_type, candidate) {
            Ok(state) => state,
            Err(err) => panic!(
                "expected create of '{}' to succeed, but got: {}",
                resource_type, err
            ),
        }
    }

    /// Returns the stored yaml parsed back into a json value
    pub fn rendered<'a>(&self, resource_type: &str, id: impl Into<ObjectIdRef<'a>>) -> Option<Value> {
        self.read(resource_type, id).map(|state| {
            state
                .rendered_value()
                .unwrap_or_else(|err| panic!("stored yaml is invalid: {}\n{}", err, state.yaml))
        })
    }

    /// Asserts that creating the candidate fails with the given kind of error at the given path
    pub fn assert_rejected(
        &mut self,
        resource_type: &str,
        candidate: &Value,
        expected_kind: ErrorKind,
        expected_path: &str,
    ) {
        let count_before = self.provider.states(resource_type).count();
        match self.create(resource_type, candidate) {
            Ok(state) => panic!(
                "expected create to fail with {:?} at '{}', but it succeeded:\n{}",
                expected_kind, expected_path, state.yaml
            ),
            Err(err) => {
                assert_eq!(expected_kind, err.kind(), "unexpected error: {}", err);
                let actual_path = err
                    .as_validation()
                    .map(|e| e.path().to_string())
                    .unwrap_or_default();
                assert_eq!(expected_path, actual_path, "unexpected error: {}", err);
            }
        }
        assert_eq!(
            count_before,
            self.provider.states(resource_type).count(),
            "a rejected candidate must not change the stored state"
        );
    }
}

/// Asserts that the value is an object with exactly the given keys, in the given order
pub fn assert_keys(value: &Value, expected: &[&str]) {
    let actual: Vec<&str> = value
        .as_object()
        .unwrap_or_else(|| panic!("expected an object, got: {}", value))
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(expected, actual.as_slice(), "unexpected keys in: {}", value);
}
