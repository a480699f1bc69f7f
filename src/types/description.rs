//! Server and scene descriptions
//!
//! Both are snapshots: the server description is read once after connect and
//! the data description set is fetched on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Four-part version number as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Version(pub [u8; 4]);

impl Version {
    /// Version with a zero revision component.
    pub const fn new(major: u8, minor: u8, build: u8) -> Self {
        Self([major, minor, build, 0])
    }
}

impl From<(u8, u8, u8)> for Version {
    fn from((major, minor, build): (u8, u8, u8)) -> Self {
        Self::new(major, minor, build)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, build, revision] = self.0;
        write!(f, "{major}.{minor}.{build}.{revision}")
    }
}

/// Server handshake result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerDescription {
    /// Whether a host answered the handshake
    pub host_present: bool,
    pub application_name: String,
    pub application_version: Version,
    pub protocol_version: Version,
}

impl ServerDescription {
    /// Description of a responding host.
    pub fn present(
        application_name: impl Into<String>,
        application_version: impl Into<Version>,
        protocol_version: impl Into<Version>,
    ) -> Self {
        Self {
            host_present: true,
            application_name: application_name.into(),
            application_version: application_version.into(),
            protocol_version: protocol_version.into(),
        }
    }

    /// Description reported when no host answered.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// One entry of a scene description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataDescription {
    MarkerSet { name: String, marker_count: usize },
    RigidBody { name: String, id: i32 },
}

impl DataDescription {
    pub fn name(&self) -> &str {
        match self {
            DataDescription::MarkerSet { name, .. } | DataDescription::RigidBody { name, .. } => {
                name
            }
        }
    }
}

/// Ordered scene description returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataDescriptionSet {
    descriptions: Vec<DataDescription>,
}

impl DataDescriptionSet {
    pub fn new(descriptions: Vec<DataDescription>) -> Self {
        Self { descriptions }
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataDescription> {
        self.descriptions.iter()
    }

    pub fn marker_set_count(&self) -> usize {
        self.iter().filter(|d| matches!(d, DataDescription::MarkerSet { .. })).count()
    }

    pub fn rigid_body_count(&self) -> usize {
        self.iter().filter(|d| matches!(d, DataDescription::RigidBody { .. })).count()
    }

    /// Name of the rigid body with the given streaming ID.
    pub fn rigid_body_name(&self, id: i32) -> Option<&str> {
        self.iter().find_map(|d| match d {
            DataDescription::RigidBody { name, id: rb_id } if *rb_id == id => Some(name.as_str()),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a DataDescriptionSet {
    type Item = &'a DataDescription;
    type IntoIter = std::slice::Iter<'a, DataDescription>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptions.iter()
    }
}

impl FromIterator<DataDescription> for DataDescriptionSet {
    fn from_iter<I: IntoIterator<Item = DataDescription>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_displays_all_components() {
        assert_eq!(Version::new(4, 1, 0).to_string(), "4.1.0.0");
        assert_eq!(Version([3, 0, 1, 2]).to_string(), "3.0.1.2");
        assert!(Version::new(4, 1, 0) > Version::new(3, 9, 9));
    }

    #[test]
    fn description_set_maps_ids_to_names() {
        let set: DataDescriptionSet = vec![
            DataDescription::MarkerSet { name: "all".into(), marker_count: 12 },
            DataDescription::RigidBody { name: "wand".into(), id: 1 },
            DataDescription::RigidBody { name: "drone".into(), id: 4 },
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 3);
        assert_eq!(set.marker_set_count(), 1);
        assert_eq!(set.rigid_body_count(), 2);
        assert_eq!(set.rigid_body_name(4), Some("drone"));
        assert_eq!(set.rigid_body_name(2), None);
    }

    #[test]
    fn absent_description_has_no_host() {
        let description = ServerDescription::absent();
        assert!(!description.host_present);
        assert!(description.application_name.is_empty());
    }
}
