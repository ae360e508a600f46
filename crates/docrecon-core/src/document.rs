use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::{Error, Result};

fn gs_uri_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"^gs://([^/]+)/(.*)$").expect("static pattern"))
}

/// A `(bucket, path)` pair addressing one object in Cloud Storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub path: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// Parse a `gs://bucket/prefix` URI. The prefix may be empty.
    pub fn parse(uri: &str) -> Result<Self> {
        let captures = gs_uri_pattern()
            .captures(uri)
            .ok_or_else(|| Error::InvalidUri(uri.to_string()))?;

        Ok(Self::new(&captures[1], &captures[2]))
    }

    /// Bucket-only URIs such as `gs://bucket` are accepted as an empty prefix.
    pub fn parse_prefix(uri: &str) -> Result<Self> {
        match uri.strip_prefix("gs://") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => Ok(Self::new(rest, "")),
            _ => Self::parse(uri),
        }
    }

    #[must_use]
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.path)
    }

    /// Final path segment, used as the key for results and local copies.
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.path)
    }
}

#[must_use]
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Text after the last `.` of the base name, if any.
#[must_use]
pub fn extension(path: &str) -> Option<&str> {
    let name = base_name(path);
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// A source document copied into the local work directory.
#[derive(Debug, Clone)]
pub struct LocalDocument {
    pub source: ObjectLocation,
    pub path: PathBuf,
    pub mime_type: String,
}

impl LocalDocument {
    #[must_use]
    pub fn new(source: ObjectLocation, path: PathBuf, mime_type: String) -> Self {
        Self {
            source,
            path,
            mime_type,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.source.base_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri() {
        let loc = ObjectLocation::parse("gs://output/jobs/123/0").unwrap();
        assert_eq!(loc.bucket, "output");
        assert_eq!(loc.path, "jobs/123/0");
        assert_eq!(loc.uri(), "gs://output/jobs/123/0");
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            ObjectLocation::parse("s3://bucket/key"),
            Err(Error::InvalidUri(_))
        ));
        assert!(ObjectLocation::parse("gs://bucket-only").is_err());
    }

    #[test]
    fn test_parse_prefix_accepts_bare_bucket() {
        let loc = ObjectLocation::parse_prefix("gs://bucket-output").unwrap();
        assert_eq!(loc.bucket, "bucket-output");
        assert_eq!(loc.path, "");
    }

    #[test]
    fn test_base_name_and_extension() {
        assert_eq!(base_name("uploads/2024/invoice.pdf"), "invoice.pdf");
        assert_eq!(base_name("invoice.pdf"), "invoice.pdf");
        assert_eq!(extension("uploads/scan.tar.gz"), Some("gz"));
        assert_eq!(extension("dir.v2/README"), None);
    }
}
