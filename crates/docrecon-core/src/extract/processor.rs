/// Identity of a Document AI processor, optionally pinned to one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorName {
    location: String,
    version_id: Option<String>,
    resource_name: String,
}

impl ProcessorName {
    /// Resolves the canonical resource name up front. An empty version id is
    /// treated as absent.
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        processor_id: impl Into<String>,
        version_id: Option<String>,
    ) -> Self {
        let project = project.into();
        let location = location.into();
        let processor_id = processor_id.into();
        let version_id = version_id.filter(|v| !v.trim().is_empty());

        let mut resource_name =
            format!("projects/{project}/locations/{location}/processors/{processor_id}");
        if let Some(ref version) = version_id {
            resource_name.push_str("/processorVersions/");
            resource_name.push_str(version);
        }

        Self {
            location,
            version_id,
            resource_name,
        }
    }

    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub const fn is_versioned(&self) -> bool {
        self.version_id.is_some()
    }
}

impl std::fmt::Display for ProcessorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.resource_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unversioned_name() {
        let name = ProcessorName::new("proj", "us", "abc123", None);
        assert_eq!(
            name.resource_name(),
            "projects/proj/locations/us/processors/abc123"
        );
        assert!(!name.is_versioned());
    }

    #[test]
    fn test_versioned_name() {
        let name = ProcessorName::new("proj", "eu", "abc123", Some("pretrained-v2".into()));
        assert_eq!(
            name.resource_name(),
            "projects/proj/locations/eu/processors/abc123/processorVersions/pretrained-v2"
        );
        assert_eq!(name.to_string(), name.resource_name());
    }

    #[test]
    fn test_blank_version_is_unversioned() {
        let name = ProcessorName::new("proj", "us", "abc123", Some("  ".into()));
        assert!(!name.is_versioned());
        assert!(!name.resource_name().contains("processorVersions"));
    }
}
