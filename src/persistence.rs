//! JSON persistence for solved instances.
//!
//! An export bundles the instance, the best solution, and its chart
//! projections into one camelCase JSON document that round-trips through
//! [`import_json`]. Imports re-validate the embedded instance so a
//! corrupted document cannot smuggle a cyclic graph back into the engine.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{ProblemInstance, Solution};
use crate::viz::{project, VisualizationData};

/// A persisted `{instance, solution, visualization}` bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionExport {
    /// The problem the solution was computed for.
    pub instance: ProblemInstance,
    /// The solution, including per-evaluation snapshots.
    pub solution: Solution,
    /// Chart-ready projections (recomputable; included for debugging).
    pub visualization: VisualizationData,
}

impl SolutionExport {
    /// Bundles an instance and solution, projecting the visualization.
    pub fn new(instance: ProblemInstance, solution: Solution) -> Self {
        let visualization = project(&instance, &solution);
        Self {
            instance,
            solution,
            visualization,
        }
    }
}

/// Serializes an export bundle to pretty-printed JSON.
pub fn export_json(export: &SolutionExport) -> EngineResult<String> {
    serde_json::to_string_pretty(export).map_err(|e| EngineError::Export(e.to_string()))
}

/// Parses and validates an export bundle from JSON.
pub fn import_json(json: &str) -> EngineResult<SolutionExport> {
    let export: SolutionExport =
        serde_json::from_str(json).map_err(|e| EngineError::Import(e.to_string()))?;
    if let Err(errors) = export.instance.validate() {
        let summary = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EngineError::Import(summary));
    }
    Ok(export)
}
