//! Best-effort extraction of a verdict from free model text.
//!
//! Two stages: [`extract_json_object`] strips markdown fences and finds the
//! first balanced `{...}` span, then [`parse_verdict`] does a strict JSON
//! parse and checks the four required fields.

use serde::Deserialize;
use serde_json::Value;

use super::{Criticality, TriageError, Verdict};

/// Locate the first balanced JSON object in `text`, ignoring braces inside
/// string literals. Markdown code fences are removed first.
pub fn extract_json_object(text: &str) -> Option<String> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let start = cleaned.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in cleaned[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(cleaned[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    tipo_ataque: Option<Value>,
    resumo: Option<Value>,
    criticidade: Option<Value>,
    acao_recomendada: Option<Value>,
}

/// Parse model output into a validated [`Verdict`].
pub fn parse_verdict(text: &str) -> Result<Verdict, TriageError> {
    let object = extract_json_object(text)
        .ok_or_else(|| TriageError::MalformedOutput("no JSON object found".to_string()))?;

    let raw: RawVerdict = serde_json::from_str(&object)
        .map_err(|e| TriageError::MalformedOutput(e.to_string()))?;

    let attack_type = required(raw.tipo_ataque, "tipo_ataque")?;
    let summary = required(raw.resumo, "resumo")?;
    let criticality = Criticality::parse(&required(raw.criticidade, "criticidade")?)
        .ok_or(TriageError::MissingField("criticidade"))?;
    let action = required(raw.acao_recomendada, "acao_recomendada")?;

    Verdict::new(attack_type, summary, criticality, action)
        .ok_or(TriageError::MalformedOutput("blank verdict field".to_string()))
}

fn required(value: Option<Value>, field: &'static str) -> Result<String, TriageError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(TriageError::MissingField(field)),
    }
}
