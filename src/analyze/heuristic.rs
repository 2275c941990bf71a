//! Deterministic lexical fallback for sale-outcome extraction.
//!
//! Scans the transcript for positive and negative indicator phrases and a
//! monetary amount, then decides by a fixed rule table. Used when no
//! language-model backend is configured or the configured one fails.

use async_trait::async_trait;
use regex_lite::Regex;

use crate::domain::Outcome;
use crate::error::PipelineError;

use super::AnalysisEngine;

const POSITIVE_INDICATORS: &[&str] = &[
    "sí", "si", "acepto", "perfecto", "de acuerdo", "está bien", "comprar", "pagar", "comprobante",
    "enviar", "confirmar",
];

const NEGATIVE_INDICATORS: &[&str] = &[
    "no",
    "no gracias",
    "no estoy interesado",
    "no me interesa",
    "no quiero",
    "no puedo",
    "no tengo",
    "no necesito",
];

const REASON_NOT_INTERESTED: &str = "El cliente no mostró interés en comprar.";
const REASON_NO_AMOUNT: &str = "No se mencionó un monto específico para la venta.";
const REASON_NO_SIGNAL: &str = "No se identificaron indicadores claros de una venta exitosa.";

/// Lexical outcome extractor with a fixed rule table.
pub struct HeuristicEngine {
    positive: Vec<String>,
    negative: Vec<String>,
    amount_pattern: Regex,
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new(
            POSITIVE_INDICATORS.iter().map(|s| s.to_string()).collect(),
            NEGATIVE_INDICATORS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl HeuristicEngine {
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        // A number optionally followed by a million/currency unit suffix
        let amount_pattern =
            Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:millones|millón|millon|pesos?|m)").unwrap();

        Self {
            positive,
            negative,
            amount_pattern,
        }
    }

    /// Extract an amount from the transcript, applying the million
    /// multiplier when the unit calls for one.
    fn extract_amount(&self, transcript: &str) -> Option<f64> {
        let captures = self.amount_pattern.captures(transcript)?;
        let full = captures.get(0)?.as_str().to_lowercase();
        let number: f64 = captures.get(1)?.as_str().parse().ok()?;

        let amount = if full.contains("millon") || full.contains("millón") {
            number * 1_000_000.0
        } else {
            number
        };

        Some(amount.round())
    }

    /// Run the rule table over a transcript. Pure and deterministic.
    pub fn analyze_text(&self, transcript: &str) -> Outcome {
        let lowered = transcript.to_lowercase();

        let has_positive = self.positive.iter().any(|p| lowered.contains(p.as_str()));
        let has_negative = self.negative.iter().any(|n| lowered.contains(n.as_str()));
        let amount = self.extract_amount(transcript);

        if has_negative && !has_positive {
            Outcome {
                success_sell: false,
                amount_to_pay: amount,
                reason_fail: Some(REASON_NOT_INTERESTED.to_string()),
            }
        } else if has_positive && amount.is_some() {
            Outcome {
                success_sell: true,
                amount_to_pay: amount,
                reason_fail: None,
            }
        } else if has_positive {
            Outcome {
                success_sell: false,
                amount_to_pay: None,
                reason_fail: Some(REASON_NO_AMOUNT.to_string()),
            }
        } else {
            Outcome {
                success_sell: false,
                amount_to_pay: None,
                reason_fail: Some(REASON_NO_SIGNAL.to_string()),
            }
        }
    }
}

#[async_trait]
impl AnalysisEngine for HeuristicEngine {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn analyze(
        &self,
        _system_prompt: &str,
        transcript: &str,
    ) -> Result<Outcome, PipelineError> {
        Ok(self.analyze_text(transcript))
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_without_positive_is_not_interested() {
        let engine = HeuristicEngine::default();
        let outcome = engine.analyze_text("La verdad no me interesa, gracias");

        assert!(!outcome.success_sell);
        assert_eq!(outcome.reason_fail.as_deref(), Some(REASON_NOT_INTERESTED));
    }

    #[test]
    fn test_positive_with_amount_is_success() {
        let engine = HeuristicEngine::default();
        let outcome = engine.analyze_text("Perfecto, acepto pagar 2 millones");

        assert!(outcome.success_sell);
        assert_eq!(outcome.amount_to_pay, Some(2_000_000.0));
        assert!(outcome.reason_fail.is_none());
    }

    #[test]
    fn test_positive_without_amount_fails_with_reason() {
        let engine = HeuristicEngine::default();
        let outcome = engine.analyze_text("De acuerdo, confirmar mañana");

        assert!(!outcome.success_sell);
        assert_eq!(outcome.amount_to_pay, None);
        assert_eq!(outcome.reason_fail.as_deref(), Some(REASON_NO_AMOUNT));
    }

    #[test]
    fn test_no_indicators_is_no_signal() {
        let engine = HeuristicEngine::default();
        let outcome = engine.analyze_text("buenos días, hablamos luego");

        assert!(!outcome.success_sell);
        assert_eq!(outcome.reason_fail.as_deref(), Some(REASON_NO_SIGNAL));
    }

    #[test]
    fn test_amount_units() {
        let engine = HeuristicEngine::default();

        assert_eq!(engine.extract_amount("son 500 pesos"), Some(500.0));
        assert_eq!(engine.extract_amount("1.5 millones"), Some(1_500_000.0));
        assert_eq!(engine.extract_amount("un millón"), None); // no digits
        assert_eq!(engine.extract_amount("nada de dinero"), None);
    }

    #[test]
    fn test_determinism() {
        let engine = HeuristicEngine::default();
        let transcript = "no gracias, no necesito nada";

        let first = engine.analyze_text(transcript);
        for _ in 0..10 {
            assert_eq!(engine.analyze_text(transcript), first);
        }
    }
}
