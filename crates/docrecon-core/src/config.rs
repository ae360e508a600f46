use std::path::PathBuf;
use std::time::Duration;

use crate::extract::{BatchSettings, ExtractionMode, ProcessorName};
use crate::{Error, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-001";
pub const DEFAULT_FIRESTORE_DB: &str = "(default)";

/// Where reconciliation summaries are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStoreKind {
    Firestore { database: String },
    Sqlite(PathBuf),
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub region: String,
    pub processor_id: String,
    pub processor_version_id: Option<String>,
    pub temp_bucket: String,
    pub output_bucket: Option<String>,
    pub model_name: String,
    pub temperature: Option<f32>,
    pub extraction_mode: ExtractionMode,
    pub batch_timeout: Duration,
    pub batch_poll_interval: Duration,
    pub result_store: ResultStoreKind,
    pub work_dir: PathBuf,
    pub extract_prompt_file: Option<PathBuf>,
    pub compare_prompt_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| Error::Config(format!("{key} is not set")));

        let extraction_mode = match get("EXTRACTION_MODE") {
            Some(mode) => mode.parse()?,
            None => ExtractionMode::Online,
        };

        let output_bucket = get("OUTPUT_BUCKET");
        if extraction_mode == ExtractionMode::Batch && output_bucket.is_none() {
            return Err(Error::Config("OUTPUT_BUCKET is required for batch extraction".to_string()));
        }

        let firestore_db = get("FIREBASE_DB").unwrap_or_else(|| DEFAULT_FIRESTORE_DB.to_string());
        let result_store = match get("RESULT_STORE") {
            None => ResultStoreKind::Firestore { database: firestore_db },
            Some(value) => parse_result_store(&value, firestore_db)?,
        };

        let temperature = get("MODEL_TEMPERATURE")
            .map(|v| {
                v.parse::<f32>()
                    .map_err(|_| Error::Config(format!("MODEL_TEMPERATURE is not a number: {v}")))
            })
            .transpose()?;

        Ok(Self {
            project_id: require("GCP_PROJECT_ID")?,
            region: require("GCP_REGION")?,
            processor_id: require("PROCESSOR_ID")?,
            processor_version_id: get("PROCESSOR_VERSION_ID"),
            temp_bucket: require("TEMP_BUCKET")?,
            output_bucket,
            model_name: get("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            extraction_mode,
            batch_timeout: Duration::from_secs(parse_secs(get("BATCH_TIMEOUT_SECS"), "BATCH_TIMEOUT_SECS", 400)?),
            batch_poll_interval: Duration::from_secs(parse_secs(
                get("BATCH_POLL_INTERVAL_SECS"),
                "BATCH_POLL_INTERVAL_SECS",
                5,
            )?),
            result_store,
            work_dir: get("WORK_DIR").map_or_else(std::env::temp_dir, PathBuf::from),
            extract_prompt_file: get("EXTRACT_PROMPT_FILE").map(PathBuf::from),
            compare_prompt_file: get("COMPARE_PROMPT_FILE").map(PathBuf::from),
        })
    }

    /// Document AI multi-region: the region up to its first `-`
    /// (`us-central1` → `us`).
    #[must_use]
    pub fn location(&self) -> &str {
        self.region.split('-').next().unwrap_or(&self.region)
    }

    #[must_use]
    pub fn processor_name(&self) -> ProcessorName {
        ProcessorName::new(
            &self.project_id,
            self.location(),
            &self.processor_id,
            self.processor_version_id.clone(),
        )
    }

    pub fn batch_settings(&self) -> Result<BatchSettings> {
        let output = self
            .output_bucket
            .as_deref()
            .ok_or_else(|| Error::Config("OUTPUT_BUCKET is not set".to_string()))?;

        Ok(BatchSettings::new(format!("gs://{output}/"), format!("gs://{}/", self.temp_bucket))
            .with_timeout(self.batch_timeout)
            .with_poll_interval(self.batch_poll_interval))
    }
}

fn parse_result_store(value: &str, firestore_db: String) -> Result<ResultStoreKind> {
    if value.eq_ignore_ascii_case("firestore") {
        return Ok(ResultStoreKind::Firestore { database: firestore_db });
    }
    match value.strip_prefix("sqlite:") {
        Some(path) if !path.is_empty() => Ok(ResultStoreKind::Sqlite(PathBuf::from(path))),
        _ => Err(Error::Config(format!(
            "RESULT_STORE must be 'firestore' or 'sqlite:<path>', got '{value}'"
        ))),
    }
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64> {
    match value {
        None => Ok(default),
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(Error::Config(format!("{key} must be a positive number of seconds, got '{v}'"))),
        },
    }
}
