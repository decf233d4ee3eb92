use std::collections::HashMap;
use std::fmt::{self, Display};
use std::hash::{self, Hash};

/// The constant `apiVersion` and `kind` that get stamped onto every instance of a CRD, along with
/// the plural name. We use `&'static str` for all of these so that it's easy to pass references
/// around without copying. The CRDs that are bundled with this crate are declared as statics in
/// the submodules here, and you can declare your own the same way:
///
/// ```no_run
/// use crdform::k8s_types::K8sType;
///
/// #[allow(non_upper_case_globals)]
/// pub static MyCrd: &K8sType = &K8sType {
///     api_version: "example.com/v1",
///     kind: "MyCrd",
///     plural_kind: "mycrds"
/// };
/// ```
///
/// Types that are only known at runtime, such as those loaded from descriptor files, are created
/// with `define_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K8sType {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub plural_kind: &'static str,
}

impl Hash for K8sType {
    fn hash<H: hash::Hasher>(&self, hasher: &mut H) {
        self.api_version.hash(hasher);
        self.kind.hash(hasher);
    }
}

/// Creates a `&'static K8sType` at runtime **by leaking memory**. This is totally fine, as long as it's only
/// done once while loading schemas, but you definitely want to avoid repeated calls to define the same type.
/// Prefer `lookup_or_define`, which returns the bundled static if there is one.
pub fn define_type(api_version: String, kind: String, plural_kind: String) -> &'static K8sType {
    fn leak_str(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    let k8s_type = K8sType {
        api_version: leak_str(api_version),
        kind: leak_str(kind),
        plural_kind: leak_str(plural_kind),
    };
    log::info!("Dynamically defining {:?}", k8s_type);
    Box::leak(Box::new(k8s_type))
}

/// Returns the bundled type with the given apiVersion and kind, if there is one
pub fn lookup(api_version: &str, kind: &str) -> Option<&'static K8sType> {
    bundled()
        .iter()
        .copied()
        .find(|t| t.api_version == api_version && t.kind == kind)
}

pub fn lookup_or_define(api_version: &str, kind: &str, plural_kind: &str) -> &'static K8sType {
    lookup(api_version, kind).unwrap_or_else(|| {
        define_type(
            api_version.to_owned(),
            kind.to_owned(),
            plural_kind.to_owned(),
        )
    })
}

impl K8sType {
    pub fn as_group_and_version(&self) -> (&str, &str) {
        match self.api_version.find('/') {
            Some(slash_idx) => (
                &self.api_version[..slash_idx],
                &self.api_version[(slash_idx + 1)..],
            ),
            None => ("", self.api_version),
        }
    }

    pub fn group(&self) -> &str {
        self.as_group_and_version().0
    }

    pub fn version(&self) -> &str {
        self.as_group_and_version().1
    }

    /// The name the host uses for resources of this type: the prefix, then the group with dots and
    /// dashes replaced by underscores, then the lowercased kind, then the version. For example,
    /// `k8s_cert_manager_io_certificate_v1`.
    pub fn resource_type_name(&self, prefix: &str) -> String {
        let (group, version) = self.as_group_and_version();
        let kind = self.kind.to_lowercase();
        if group.is_empty() {
            format!("{}_{}_{}", prefix, kind, version)
        } else {
            let group = group.replace(|c: char| c == '.' || c == '-', "_");
            format!("{}_{}_{}_{}", prefix, group, kind, version)
        }
    }
}

impl Display for K8sType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.plural_kind)
    }
}

/// The per-type constant table, keyed by resource type name. The provider consults this to find
/// the `apiVersion` and `kind` for a resource type name it's given by the host.
#[derive(Debug, Clone, Default)]
pub struct TypeTable(HashMap<String, &'static K8sType>);

impl TypeTable {
    pub fn new() -> TypeTable {
        TypeTable(HashMap::new())
    }

    /// Adds the type under its resource type name, returning the name. Returns the previously
    /// registered type if the name was already taken.
    pub fn insert(&mut self, prefix: &str, k8s_type: &'static K8sType) -> (String, Option<&'static K8sType>) {
        let name = k8s_type.resource_type_name(prefix);
        let previous = self.0.insert(name.clone(), k8s_type);
        (name, previous)
    }

    pub fn get(&self, resource_type: &str) -> Option<&'static K8sType> {
        self.0.get(resource_type).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

macro_rules! k8s_type {
    ($ref_name:ident, $api_version:expr, $kind:expr, $plural_kind:expr) => {
        #[allow(non_upper_case_globals)]
        pub static $ref_name: &crate::k8s_types::K8sType = &crate::k8s_types::K8sType {
            api_version: $api_version,
            kind: $kind,
            plural_kind: $plural_kind,
        };
    };
}

macro_rules! def_types {
    (@nogroupmod, $group:expr, [
        $( $version:ident => [
            $( $kind:ident ~ $plural_kind:ident ),*
        ]),*
    ]) => {
        $(
            pub mod $version {

                $(
                    k8s_type!($kind, concat!($group, "/", stringify!($version)), stringify!($kind), stringify!($plural_kind));
                )*
            }

        )*
    };
}

pub mod databases_schemahero_io {
    def_types! {
        @nogroupmod, "databases.schemahero.io", [
            v1alpha4 => [
                Database ~ databases
            ]
        ]
    }
}

pub mod hive_openshift_io {
    def_types! {
        @nogroupmod, "hive.openshift.io", [
            v1 => [
                ClusterDeployment ~ clusterdeployments
            ]
        ]
    }
}

pub mod cert_manager_io {
    def_types! {
        @nogroupmod, "cert-manager.io", [
            v1 => [
                Certificate ~ certificates
            ]
        ]
    }
}

/// every type declared above, so they can be found by `lookup`
fn bundled() -> [&'static K8sType; 3] {
    [
        databases_schemahero_io::v1alpha4::Database,
        hive_openshift_io::v1::ClusterDeployment,
        cert_manager_io::v1::Certificate,
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_group_and_version() {
        let t = hive_openshift_io::v1::ClusterDeployment;
        assert_eq!(("hive.openshift.io", "v1"), t.as_group_and_version());
        assert_eq!("ClusterDeployment", t.kind);
        assert_eq!("clusterdeployments", t.plural_kind);

        let core = K8sType {
            api_version: "v1",
            kind: "ConfigMap",
            plural_kind: "configmaps",
        };
        assert_eq!("", core.group());
        assert_eq!("v1", core.version());
        assert_eq!("k8s_configmap_v1", core.resource_type_name("k8s"));
    }

    #[test]
    fn resource_type_names_replace_dots_and_dashes() {
        assert_eq!(
            "k8s_cert_manager_io_certificate_v1",
            cert_manager_io::v1::Certificate.resource_type_name("k8s")
        );
        assert_eq!(
            "k8s_databases_schemahero_io_database_v1alpha4",
            databases_schemahero_io::v1alpha4::Database.resource_type_name("k8s")
        );
    }

    #[test]
    fn lookup_prefers_bundled_statics() {
        let found = lookup_or_define("cert-manager.io/v1", "Certificate", "certificates");
        assert!(std::ptr::eq(found, cert_manager_io::v1::Certificate));

        let defined = lookup_or_define("example.com/v1", "Widget", "widgets");
        assert_eq!("example.com/v1", defined.api_version);
        assert!(lookup("example.com/v1", "Widget").is_none());
    }

    #[test]
    fn type_table_reports_collisions() {
        let mut table = TypeTable::new();
        let (name, previous) = table.insert("k8s", hive_openshift_io::v1::ClusterDeployment);
        assert_eq!("k8s_hive_openshift_io_clusterdeployment_v1", name);
        assert!(previous.is_none());
        let (_, previous) = table.insert("k8s", hive_openshift_io::v1::ClusterDeployment);
        assert!(previous.is_some());
        assert_eq!(1, table.len());
        assert_eq!(Some(hive_openshift_io::v1::ClusterDeployment), table.get(name.as_str()));
    }
}
