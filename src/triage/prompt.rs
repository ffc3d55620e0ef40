//! Instruction template sent to the local model.

use serde::Serialize;

const ROLE: &str = "Você é um analista SOC (Blue Team) especialista em segurança cibernética. \
Analise o seguinte alerta do Suricata IDS:";

const OUTPUT_CONTRACT: &str = r#"Responda apenas com um único objeto JSON válido, com exatamente estes campos:
{
  "tipo_ataque": "tipo da ameaça detectada (ex: port_scan, brute_force, sql_injection, xss)",
  "resumo": "descrição concisa do evento em até 2 frases",
  "criticidade": "baixa, média ou alta",
  "acao_recomendada": "ação prática para o SOC (ex: bloquear IP, revisar regra de firewall, investigar origem)"
}

Importante:
- NÃO inclua ```json nem qualquer texto fora do objeto JSON.
- Responda SOMENTE o objeto JSON puro.
- Seja objetivo e técnico."#;

/// Sampling options forwarded to the inference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 200,
        }
    }
}

/// Assemble the full prompt around an alert context.
pub fn build_prompt(context: &str) -> String {
    format!("{ROLE}\n\n{context}\n\n{OUTPUT_CONTRACT}\n")
}
