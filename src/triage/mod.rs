//! Alert-to-verdict pipeline: context building, model call, parsing and
//! rule-based fallback.

pub mod backend;
pub mod context;
pub mod parse;
pub mod prompt;
pub mod resolver;
pub mod rules;

pub use self::backend::{CompletionBackend, OllamaBackend};
pub use self::resolver::Resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures absorbed by the resolver before it falls back.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("inference endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference endpoint returned HTTP {0}")]
    Status(u16),

    #[error("model output is not a JSON object: {0}")]
    MalformedOutput(String),

    #[error("model output missing or invalid field '{0}'")]
    MissingField(&'static str),
}

/// Severity levels assigned to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criticality {
    #[serde(rename = "baixa")]
    Low,
    #[serde(rename = "média")]
    Medium,
    #[serde(rename = "alta")]
    High,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Low => "baixa",
            Criticality::Medium => "média",
            Criticality::High => "alta",
        }
    }

    /// Lenient parse of a model-supplied level: case and the accent on
    /// "média" are ignored, English names are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "baixa" | "low" => Some(Criticality::Low),
            "média" | "media" | "medium" => Some(Criticality::Medium),
            "alta" | "high" => Some(Criticality::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured triage output. All text fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    #[serde(rename = "tipo_ataque")]
    attack_type: String,
    #[serde(rename = "resumo")]
    summary: String,
    #[serde(rename = "criticidade")]
    criticality: Criticality,
    #[serde(rename = "acao_recomendada")]
    recommended_action: String,
}

impl Verdict {
    /// Returns `None` if any text field is blank.
    pub fn new(
        attack_type: impl Into<String>,
        summary: impl Into<String>,
        criticality: Criticality,
        recommended_action: impl Into<String>,
    ) -> Option<Self> {
        let attack_type = attack_type.into();
        let summary = summary.into();
        let recommended_action = recommended_action.into();
        if [&attack_type, &summary, &recommended_action]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return None;
        }
        Some(Self {
            attack_type,
            summary,
            criticality,
            recommended_action,
        })
    }

    pub fn attack_type(&self) -> &str {
        &self.attack_type
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn recommended_action(&self) -> &str {
        &self.recommended_action
    }
}

/// Which path of the resolver produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Model,
    Fallback,
    Noise,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictSource::Model => "model",
            VerdictSource::Fallback => "fallback",
            VerdictSource::Noise => "noise",
        }
    }
}

impl std::fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict together with how it was reached.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub verdict: Verdict,
    pub source: VerdictSource,
    /// Raw completion text, when the model answered at all.
    pub raw_response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_rejects_blank_fields() {
        assert!(Verdict::new("", "x", Criticality::Low, "y").is_none());
        assert!(Verdict::new("a", "  ", Criticality::Low, "y").is_none());
        assert!(Verdict::new("a", "x", Criticality::Low, "\n").is_none());
        assert!(Verdict::new("a", "x", Criticality::Low, "y").is_some());
    }

    #[test]
    fn test_verdict_serializes_wire_names() {
        let v = Verdict::new("port_scan", "scan", Criticality::Medium, "monitor").unwrap();
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["tipo_ataque"], "port_scan");
        assert_eq!(json["resumo"], "scan");
        assert_eq!(json["criticidade"], "média");
        assert_eq!(json["acao_recomendada"], "monitor");
    }

    #[test]
    fn test_criticality_parse_is_lenient() {
        assert_eq!(Criticality::parse("ALTA"), Some(Criticality::High));
        assert_eq!(Criticality::parse("media"), Some(Criticality::Medium));
        assert_eq!(Criticality::parse(" Média "), Some(Criticality::Medium));
        assert_eq!(Criticality::parse("low"), Some(Criticality::Low));
        assert_eq!(Criticality::parse("critical"), None);
        assert_eq!(Criticality::parse("baixa|média|alta"), None);
    }
}
