//! Device and project registry.
//!
//! The pipeline does not own device/project bookkeeping; it only needs to
//! resolve a recording's caller id to the analysis configuration of the
//! project the device is assigned to. The registry is a read-only YAML
//! snapshot of that chain, loaded once at startup.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A caller device as registered by the telephony side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Device identifier embedded in recording filenames
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Assigned project id, if any
    #[serde(default)]
    pub project: Option<String>,
}

/// A project owning devices and an analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Per-project analysis prompt material
    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,
}

/// Free-form prompt material guiding sale-outcome extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Ordered natural-language instructions
    pub instructions: Vec<String>,

    /// Required field name → description
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Output schema template shown to the model
    #[serde(default)]
    pub output_format: serde_json::Value,

    /// Worked example of a successful sale
    #[serde(default)]
    pub example_analysis: serde_json::Value,

    /// Worked example of a failed sale
    #[serde(default)]
    pub example_analysis_fail: serde_json::Value,
}

/// Raw registry file schema
#[derive(Debug, Clone, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    devices: Vec<Device>,
    #[serde(default)]
    projects: Vec<Project>,
}

/// In-memory registry with id-keyed lookup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: HashMap<String, Device>,
    projects: HashMap<String, Project>,
}

impl Registry {
    /// Load the registry from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry file: {}", path.display()))?;

        let file: RegistryFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse registry file: {}", path.display()))?;

        Ok(Self::from_parts(file.devices, file.projects))
    }

    /// Build a registry from already-loaded parts.
    pub fn from_parts(devices: Vec<Device>, projects: Vec<Project>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id.clone(), d)).collect(),
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.get(id)
    }

    /// Resolve caller id → device → project → analysis config.
    ///
    /// An unknown device id is NotFound; a device without a project, an
    /// unknown project, or a project without analysis material is a
    /// configuration error for the record being analyzed.
    pub fn analysis_config(&self, caller_id: &str) -> Result<&AnalysisConfig, PipelineError> {
        let device = self
            .devices
            .get(caller_id)
            .ok_or_else(|| PipelineError::NotFound(format!("device {}", caller_id)))?;

        let project_id = device.project.as_deref().ok_or_else(|| {
            PipelineError::Configuration(format!("device {} has no assigned project", caller_id))
        })?;

        let project = self.projects.get(project_id).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "device {} references unknown project {}",
                caller_id, project_id
            ))
        })?;

        project.analysis.as_ref().ok_or_else(|| {
            PipelineError::Configuration(format!(
                "project {} has no analysis configuration",
                project_id
            ))
        })
    }
}
