//! Processing engine contract
//!
//! The rule-discovery engine that actually assesses an experiment is an
//! external collaborator consumed through [`ExperimentEngine`]. The bundled
//! [`DefinitionEngine`] covers the part the daemon owns: parsing and
//! validating the descriptive header of an experiment definition file.

use std::path::Path;

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use tokio::fs;

use crate::progress::ExperimentReporter;

/// Descriptive metadata extracted from an experiment definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentDetails {
    pub title: String,
    pub tags: Vec<String>,
    pub category: String,
}

/// External processing engine contract
///
/// The engine calls `reporter.report_progress` zero or more times during
/// `process`; the driver turns a returned error into a Failure record and
/// reports success itself.
#[async_trait]
pub trait ExperimentEngine: Send + Sync {
    /// Parse an experiment definition file, returning its metadata
    async fn load(&self, path: &Path) -> Result<ExperimentDetails>;

    /// Run the experiment, pushing incremental updates through the reporter
    async fn process(&self, path: &Path, reporter: &ExperimentReporter) -> Result<()>;
}

/// Parsed shape of an experiment definition file
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Definition {
    title: String,
    tags: Vec<String>,
    category: String,
}

/// Engine that parses and validates experiment definitions
///
/// Assessment itself happens in a pluggable engine behind the same trait;
/// this one only checks that the definition is well-formed.
#[derive(Debug, Default)]
pub struct DefinitionEngine;

impl DefinitionEngine {
    pub fn new() -> Self {
        Self
    }

    async fn parse(&self, path: &Path) -> Result<Definition> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "json" => serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display())),
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
            }
            other => Err(eyre!("Unsupported experiment file extension: {:?}", other)),
        }
    }
}

#[async_trait]
impl ExperimentEngine for DefinitionEngine {
    async fn load(&self, path: &Path) -> Result<ExperimentDetails> {
        let definition = self.parse(path).await?;
        Ok(ExperimentDetails {
            title: definition.title,
            tags: definition.tags,
            category: definition.category,
        })
    }

    async fn process(&self, path: &Path, reporter: &ExperimentReporter) -> Result<()> {
        reporter.report_progress("Validating experiment definition", 0.0).await?;
        self.parse(path).await?;
        Ok(())
    }
}
