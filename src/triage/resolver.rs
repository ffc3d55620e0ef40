//! Verdict resolver: noise filter, model call, validation, fallback.
//!
//! Every path ends in a well-formed [`Verdict`]. Transport failures and
//! malformed model output are logged and replaced by the rule-based verdict
//! from [`rules::fallback_verdict`]; nothing is retried and nothing is
//! returned to the caller as an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::backend::CompletionBackend;
use super::context::build_context;
use super::parse::parse_verdict;
use super::prompt::build_prompt;
use super::{rules, Resolution, Verdict, VerdictSource};
use crate::alert::Alert;

/// Maximum number of characters of raw model output echoed into logs.
const LOG_PREVIEW_CHARS: usize = 100;

/// Stateless triage service. Cheap to clone; clones share the backend and
/// its HTTP connection pool.
#[derive(Clone)]
pub struct Resolver {
    backend: Arc<dyn CompletionBackend>,
}

impl Resolver {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Triage `alert`. Never fails.
    pub async fn analyze(&self, alert: &Alert) -> Verdict {
        self.resolve(alert).await.verdict
    }

    /// Triage `alert` and report which path produced the verdict.
    pub async fn resolve(&self, alert: &Alert) -> Resolution {
        let signature = alert.resolved_signature();

        if let Some(verdict) = rules::noise_verdict(alert) {
            debug!(%signature, "ICMP alert filtered before model call");
            return Resolution {
                verdict,
                source: VerdictSource::Noise,
                raw_response: None,
            };
        }

        let prompt = build_prompt(&build_context(alert));
        info!(model = self.backend.model_name(), %signature, "submitting alert to model");

        let raw = match self.backend.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%signature, error = %e, "model call failed, using fallback verdict");
                return Resolution {
                    verdict: rules::fallback_verdict(alert),
                    source: VerdictSource::Fallback,
                    raw_response: None,
                };
            }
        };

        let preview: String = raw.chars().take(LOG_PREVIEW_CHARS).collect();
        debug!(response = %preview, "model response received");

        match parse_verdict(&raw) {
            Ok(verdict) => Resolution {
                verdict,
                source: VerdictSource::Model,
                raw_response: Some(raw),
            },
            Err(e) => {
                warn!(%signature, error = %e, "model output rejected, using fallback verdict");
                Resolution {
                    verdict: rules::fallback_verdict(alert),
                    source: VerdictSource::Fallback,
                    raw_response: Some(raw),
                }
            }
        }
    }

    /// Advisory reachability check of the model endpoint.
    pub async fn check_model_health(&self) -> bool {
        self.backend.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::{Criticality, TriageError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend returning a canned reply and counting calls.
    struct Canned {
        reply: Mutex<Option<Result<String, TriageError>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl Canned {
        fn new(reply: Result<String, TriageError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait::async_trait]
    impl CompletionBackend for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, prompt: &str) -> Result<String, TriageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(TriageError::Status(503)))
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn alert(value: serde_json::Value) -> Alert {
        Alert::from_value(value).unwrap()
    }

    fn ssh_brute() -> Alert {
        alert(json!({
            "event_type": "alert",
            "src_ip": "203.0.113.7",
            "dest_ip": "10.0.0.2",
            "dest_port": 22,
            "proto": "TCP",
            "alert": { "signature": "SSH Brute Force Attempt", "severity": 1 }
        }))
    }

    #[tokio::test]
    async fn test_icmp_never_reaches_backend() {
        let backend = Canned::new(Ok("{}".to_string()));
        let resolver = Resolver::new(backend.clone());

        let res = resolver
            .resolve(&alert(json!({ "alert": { "signature": "ICMP Echo Request" } })))
            .await;

        assert_eq!(res.source, VerdictSource::Noise);
        assert_eq!(res.verdict.criticality(), Criticality::Low);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_model_output_is_accepted() {
        let backend = Canned::new(Ok(
            r#"{"tipo_ataque":"ssh_brute_force","resumo":"Várias tentativas de login SSH.","criticidade":"alta","acao_recomendada":"Bloquear 203.0.113.7"}"#.to_string(),
        ));
        let resolver = Resolver::new(backend.clone());

        let res = resolver.resolve(&ssh_brute()).await;
        assert_eq!(res.source, VerdictSource::Model);
        assert_eq!(res.verdict.attack_type(), "ssh_brute_force");
        assert!(res.raw_response.is_some());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Assinatura: SSH Brute Force Attempt"));
        assert!(prompt.contains("Porta destino: 22"));
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_rules() {
        let resolver = Resolver::new(Canned::new(Err(TriageError::Status(502))));

        let res = resolver.resolve(&ssh_brute()).await;
        assert_eq!(res.source, VerdictSource::Fallback);
        assert!(res.verdict.attack_type().contains("brute_force"));
        assert_eq!(res.verdict.criticality(), Criticality::High);
        assert!(res.raw_response.is_none());
    }

    #[tokio::test]
    async fn test_partial_model_output_falls_back() {
        let resolver = Resolver::new(Canned::new(Ok(
            r#"{"tipo_ataque":"sql_injection","resumo":"x","criticidade":"alta"}"#.to_string(),
        )));

        let res = resolver.resolve(&ssh_brute()).await;
        assert_eq!(res.source, VerdictSource::Fallback);
        assert_eq!(res.verdict.attack_type(), "brute_force");
        assert!(res.raw_response.is_some());
    }

    #[tokio::test]
    async fn test_prose_output_falls_back() {
        let resolver = Resolver::new(Canned::new(Ok("Não sei analisar.".to_string())));
        let verdict = resolver.analyze(&ssh_brute()).await;
        assert_eq!(verdict.attack_type(), "brute_force");
    }

    #[tokio::test]
    async fn test_totality_over_odd_inputs() {
        let inputs = [
            json!({}),
            json!({ "alert": null }),
            json!({ "alert": { "signature": "" } }),
            json!({ "event_type": "", "src_ip": 7 }),
            json!({ "signature": ["not", "a", "string"] }),
            json!({ "payload_printable": "x".repeat(10_000) }),
        ];

        for input in inputs {
            let resolver = Resolver::new(Canned::new(Err(TriageError::Status(500))));
            let v = resolver.analyze(&alert(input)).await;
            assert!(!v.attack_type().trim().is_empty());
            assert!(!v.summary().trim().is_empty());
            assert!(!v.recommended_action().trim().is_empty());
        }
    }

    #[tokio::test]
    async fn test_health_delegates_to_backend() {
        let resolver = Resolver::new(Canned::new(Ok(String::new())));
        assert!(resolver.check_model_health().await);
    }
}
