//! Named shared resources that jobs declare they need.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A named capacity token, such as the disk or the database.
///
/// Resources carry no data of their own. Two resources are the same resource
/// iff their `id`s are equal; `name` is for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    id: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl Resource {
    /// Create an ad-hoc resource.
    pub fn new(id: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    const fn well_known(id: &'static str, name: &'static str) -> Self {
        Self {
            id: Cow::Borrowed(id),
            name: Cow::Borrowed(name),
        }
    }

    /// Processor time.
    #[must_use]
    pub const fn cpu() -> Self {
        Self::well_known("cpu", "CPU")
    }

    /// Local disk I/O.
    #[must_use]
    pub const fn disk() -> Self {
        Self::well_known("disk", "Disk")
    }

    /// The application database.
    #[must_use]
    pub const fn database() -> Self {
        Self::well_known("database", "Database")
    }

    /// Stable identifier used for equality.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_is_by_id() {
        let a = Resource::new("disk", "Primary disk");
        assert_eq!(a, Resource::disk());
        assert_ne!(Resource::disk(), Resource::cpu());

        let set: HashSet<Resource> = [a, Resource::disk(), Resource::database()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Resource::database().to_string(), "Database");
        assert_eq!(Resource::new("net", "Network").id(), "net");
    }

    #[test]
    fn test_serde_roundtrip_keeps_identity() {
        let json = serde_json::to_string(&Resource::cpu()).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Resource::cpu());
        assert_eq!(back.name(), "CPU");
    }
}
