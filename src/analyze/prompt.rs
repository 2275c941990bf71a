//! System prompt construction for sale-outcome extraction.
//!
//! The prompt is assembled from the per-project analysis configuration:
//! instructions, output schema, field descriptions and two worked examples,
//! closing with the respond-only-with-JSON instruction.

use crate::domain::AnalysisConfig;

/// Build the system prompt from a project's analysis configuration.
pub fn build_system_prompt(config: &AnalysisConfig) -> String {
    let instructions = config.instructions.join("\n");
    let output_format =
        serde_json::to_string_pretty(&config.output_format).unwrap_or_else(|_| "{}".to_string());

    let fields = config
        .fields
        .iter()
        .map(|(key, description)| format!("- {}: {}", key, description))
        .collect::<Vec<_>>()
        .join("\n");

    let example = serde_json::to_string_pretty(&config.example_analysis)
        .unwrap_or_else(|_| "{}".to_string());
    let example_fail = serde_json::to_string_pretty(&config.example_analysis_fail)
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "{instructions}\n\n{output_format}\n\nCampos requeridos:\n{fields}\n\n\
         Ejemplos de análisis:\n\n\
         Ejemplo 1 (venta exitosa):\n{example}\n\n\
         Ejemplo 2 (venta fallida):\n{example_fail}\n\n\
         Responde ÚNICAMENTE con el JSON válido, sin texto adicional."
    )
}

/// Frame the transcript as the user message.
pub fn build_user_prompt(transcript: &str) -> String {
    format!(
        "Analiza la siguiente transcripción de llamada de ventas:\n\n{}",
        transcript
    )
}
