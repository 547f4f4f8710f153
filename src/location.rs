//! Resource locations and the queries that resolve to them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Descriptor of where and how a single dependency is loaded.
///
/// Equality and hashing are structural over `primary_key`, `resource_type`
/// and `internal_id` only. The backend may hand out a fresh descriptor for
/// the same resource on every resolve, so `provider_id` and `dependencies`
/// never take part in identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceLocation {
    primary_key: String,
    resource_type: Option<String>,
    internal_id: String,
    #[serde(default)]
    provider_id: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl ResourceLocation {
    pub fn new(
        primary_key: impl Into<String>,
        resource_type: Option<&str>,
        internal_id: impl Into<String>,
    ) -> Self {
        Self {
            primary_key: primary_key.into(),
            resource_type: resource_type.map(str::to_string),
            internal_id: internal_id.into(),
            provider_id: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Structural identity check
    pub fn same_as(&self, other: &ResourceLocation) -> bool {
        self.primary_key == other.primary_key
            && self.resource_type == other.resource_type
            && self.internal_id == other.internal_id
    }
}

impl PartialEq for ResourceLocation {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ResourceLocation {}

impl Hash for ResourceLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.primary_key.hash(state);
        self.resource_type.hash(state);
        self.internal_id.hash(state);
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_type {
            Some(ty) => write!(f, "{} ({ty}) @ {}", self.primary_key, self.internal_id),
            None => write!(f, "{} @ {}", self.primary_key, self.internal_id),
        }
    }
}

/// GUID based reference to an addressable asset
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    pub guid: String,
    pub sub_object: Option<String>,
}

impl AssetReference {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            sub_object: None,
        }
    }

    pub fn with_sub_object(mut self, name: impl Into<String>) -> Self {
        self.sub_object = Some(name.into());
        self
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_object {
            Some(sub) => write!(f, "[{}]{sub}", self.guid),
            None => write!(f, "[{}]", self.guid),
        }
    }
}

/// Grouping tag that resolves to a set of resource locations
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetLabel(pub String);

impl AssetLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetLabel {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AssetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything the backend can resolve into resource locations
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocationQuery {
    Key(String),
    Reference(AssetReference),
    Label(AssetLabel),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Key(key) => write!(f, "key:{key}"),
            LocationQuery::Reference(reference) => write!(f, "reference:{reference}"),
            LocationQuery::Label(label) => write!(f, "label:{label}"),
        }
    }
}

impl From<&str> for LocationQuery {
    fn from(value: &str) -> Self {
        LocationQuery::Key(value.to_string())
    }
}

impl From<AssetReference> for LocationQuery {
    fn from(value: AssetReference) -> Self {
        LocationQuery::Reference(value)
    }
}

impl From<AssetLabel> for LocationQuery {
    fn from(value: AssetLabel) -> Self {
        LocationQuery::Label(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;

    #[test]
    fn test_structural_equality_ignores_provider() {
        let a = ResourceLocation::new("spriteA", Some("Sprite"), "Assets/a.png")
            .with_provider("BundledAssetProvider");
        let b = ResourceLocation::new("spriteA", Some("Sprite"), "Assets/a.png")
            .with_dependencies(vec!["bundle_ui".to_string()]);
        assert_eq!(a, b);
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_each_identity_field_matters() {
        let base = ResourceLocation::new("k", Some("Sprite"), "id");
        assert_ne!(base, ResourceLocation::new("k2", Some("Sprite"), "id"));
        assert_ne!(base, ResourceLocation::new("k", Some("Texture2D"), "id"));
        assert_ne!(base, ResourceLocation::new("k", None, "id"));
        assert_ne!(base, ResourceLocation::new("k", Some("Sprite"), "id2"));
    }

    #[test]
    fn test_hash_consistent_with_equality() {
        let mut set = AHashSet::new();
        set.insert(ResourceLocation::new("k", Some("Sprite"), "id").with_provider("p1"));
        set.insert(ResourceLocation::new("k", Some("Sprite"), "id").with_provider("p2"));
        set.insert(ResourceLocation::new("k", Some("Texture2D"), "id"));
        assert_eq!(set.len(), 2);
    }
}
