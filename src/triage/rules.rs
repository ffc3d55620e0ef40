//! Deterministic verdicts: the ICMP noise filter and keyword fallback.

use crate::alert::{Alert, UNKNOWN};

use super::{Criticality, Verdict};

struct KeywordRule {
    keywords: &'static [&'static str],
    attack_type: &'static str,
    criticality: Criticality,
    summary: &'static str,
    action: &'static str,
}

// Checked in order; first match wins.
const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["scan", "probe"],
        attack_type: "port_scan",
        criticality: Criticality::Medium,
        summary: "Possível port scan detectado de",
        action: "Monitorar IP origem e considerar bloqueio temporário",
    },
    KeywordRule {
        keywords: &["brute", "force"],
        attack_type: "brute_force",
        criticality: Criticality::High,
        summary: "Tentativa de força bruta detectada de",
        action: "Bloquear IP imediatamente e verificar logs de autenticação",
    },
    KeywordRule {
        keywords: &["sql"],
        attack_type: "sql_injection",
        criticality: Criticality::High,
        summary: "Possível SQL injection de",
        action: "Verificar aplicação web e bloquear IP",
    },
    KeywordRule {
        keywords: &["xss", "cross-site", "cross site"],
        attack_type: "xss",
        criticality: Criticality::High,
        summary: "Possível cross-site scripting de",
        action: "Revisar sanitização de entradas da aplicação web e bloquear IP",
    },
    KeywordRule {
        keywords: &["trojan", "malware"],
        attack_type: "malware",
        criticality: Criticality::High,
        summary: "Tráfego associado a malware envolvendo",
        action: "Isolar o host afetado e iniciar resposta a incidente",
    },
    KeywordRule {
        keywords: &["exploit"],
        attack_type: "exploit_attempt",
        criticality: Criticality::High,
        summary: "Tentativa de exploração detectada de",
        action: "Verificar patches do serviço alvo e bloquear IP",
    },
];

/// Short-circuit verdict for ICMP alerts, or `None` if the alert should
/// reach the model.
pub fn noise_verdict(alert: &Alert) -> Option<Verdict> {
    let signature = alert.resolved_signature();
    if !signature.to_lowercase().starts_with("icmp") {
        return None;
    }
    let src = alert.src_ip().unwrap_or_else(|| UNKNOWN.to_string());
    let dst = alert.dest_ip().unwrap_or_else(|| UNKNOWN.to_string());
    Some(Verdict {
        attack_type: "ICMP Echo (ignorado)".to_string(),
        summary: format!("Ignorado alerta ICMP de {} -> {}", src, dst),
        criticality: Criticality::Low,
        recommended_action: "Sem ação (ICMP comum)".to_string(),
    })
}

/// Rule-based verdict used whenever the model path fails.
pub fn fallback_verdict(alert: &Alert) -> Verdict {
    let signature = alert.resolved_signature().to_lowercase();
    let src_ip = alert.src_ip().unwrap_or_else(|| UNKNOWN.to_string());

    let matched = KEYWORD_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| signature.contains(k)));

    if let Some(rule) = matched {
        return Verdict {
            attack_type: rule.attack_type.to_string(),
            summary: format!("{} {}", rule.summary, src_ip),
            criticality: rule.criticality,
            recommended_action: rule.action.to_string(),
        };
    }

    let event_type = alert.event_type().unwrap_or_else(|| UNKNOWN.to_string());
    Verdict {
        summary: format!("Evento de segurança detectado: {} de {}", event_type, src_ip),
        attack_type: event_type,
        criticality: Criticality::Medium,
        recommended_action: "Investigar evento e tomar ação conforme política de segurança"
            .to_string(),
    }
}
