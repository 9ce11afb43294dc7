//! Engine request and response records.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Deserialize a field that can be either a string or an integer (Unix timestamp).
/// Converts integers to string representation.
fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct StringOrInt;

    impl Visitor<'_> for StringOrInt {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or an integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrInt)
}

/// Engines emit `null` for empty lists; treat it as the default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Placeholder value for an exposed port; serializes as `{}`.
#[derive(Serialize)]
struct EmptyBinding {}

/// Exposed ports travel as `{"8080/tcp": {}}`: each port maps to an empty binding.
fn serialize_port_set<S>(ports: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let placeholders: BTreeMap<&str, EmptyBinding> = ports
        .iter()
        .map(|port| (port.as_str(), EmptyBinding {}))
        .collect();
    placeholders.serialize(serializer)
}

fn deserialize_port_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ports: Option<BTreeMap<String, IgnoredAny>> = Option::deserialize(deserializer)?;
    Ok(ports.map(|m| m.into_keys().collect()).unwrap_or_default())
}

/// Filter applied to an image listing.
///
/// Only `reference` filters are supported; each value must match an image
/// reference exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageFilter {
    references: Vec<String>,
}

impl ImageFilter {
    /// Filter matching exactly one image reference.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            references: vec![reference.into()],
        }
    }

    /// Reference values in this filter.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Number of filter values.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Whether the filter contains `key=value` exactly.
    pub fn exact_match(&self, key: &str, value: &str) -> bool {
        key == "reference" && self.references.iter().any(|r| r == value)
    }
}

/// Image summary from an image listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    /// Image ID.
    #[serde(alias = "ID", default)]
    pub id: String,

    /// Repository name (docker output).
    #[serde(default)]
    pub repository: String,

    /// Tag (docker output).
    #[serde(default)]
    pub tag: String,

    /// Fully qualified tags (podman output).
    #[serde(default, deserialize_with = "null_as_default")]
    pub repo_tags: Vec<String>,

    /// Creation time (string from docker, Unix timestamp from podman).
    #[serde(
        default,
        alias = "CreatedAt",
        deserialize_with = "deserialize_string_or_int"
    )]
    pub created: String,
}

/// Options for pulling an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Target platform (e.g. `linux/amd64`), engine default when unset.
    pub platform: Option<String>,
}

/// Configuration for creating a new container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    /// Docker/OCI image to use.
    #[serde(default)]
    pub image: String,

    /// Environment entries in `KEY=VALUE` form, in caller order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: Vec<String>,

    /// Exposed container ports (e.g. `8080/tcp`), deduplicated.
    #[serde(
        default,
        serialize_with = "serialize_port_set",
        deserialize_with = "deserialize_port_set"
    )]
    pub exposed_ports: BTreeSet<String>,
}

impl ContainerConfig {
    /// Create a new container config with the given image.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Append environment entries, keeping their order.
    pub fn envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Expose ports. Strings are kept as given; duplicates collapse.
    pub fn expose<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exposed_ports
            .extend(ports.into_iter().map(Into::into));
        self
    }
}

/// Host-side container settings. The default applies no policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Publish every exposed port to a random host port.
    pub publish_all_ports: bool,
    /// Let the engine remove the container once it exits.
    pub auto_remove: bool,
}

/// Network attachment for a new container. The default attaches nothing
/// beyond the engine's default network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkingConfig {
    /// Network to connect the container to.
    pub network: Option<String>,
    /// Aliases on that network.
    pub aliases: Vec<String>,
}

/// Options for starting a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Override the key sequence for detaching.
    pub detach_keys: Option<String>,
}

/// Options for removing a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Kill and remove a running container.
    pub force: bool,
    /// Remove anonymous volumes attached to the container.
    pub remove_volumes: bool,
}

/// Response of a successful create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerCreated {
    /// Engine-assigned container ID.
    pub id: String,
    /// Warnings reported by the engine.
    pub warnings: Vec<String>,
}

impl ContainerCreated {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            warnings: Vec::new(),
        }
    }
}

/// Network settings of an inspected container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Address on the default network.
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,
}

/// Container information from inspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    /// Container ID.
    #[serde(alias = "ID", default)]
    pub id: String,

    /// Container name as reported by the engine (may start with `/`).
    #[serde(default)]
    pub name: String,

    /// Configuration the container was created with.
    #[serde(default)]
    pub config: Option<ContainerConfig>,

    /// Absent until the container is attached to a network.
    #[serde(default)]
    pub network_settings: Option<NetworkSettings>,
}
