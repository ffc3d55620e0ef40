//! Bounded textual summary of an alert for the model prompt.

use crate::alert::Alert;

/// Maximum number of payload characters carried into the prompt.
pub const MAX_PAYLOAD_CHARS: usize = 200;

/// Render the triage-relevant fields of `alert`, one `label: value` line per
/// present field, in a fixed order. Returns an empty string when nothing of
/// interest is present.
pub fn build_context(alert: &Alert) -> String {
    let fields = [
        ("Tipo de evento", alert.event_type()),
        ("IP origem", alert.src_ip()),
        ("IP destino", alert.dest_ip()),
        ("Porta origem", alert.src_port()),
        ("Porta destino", alert.dest_port()),
        ("Protocolo", alert.proto()),
        ("Assinatura", alert.signature()),
        ("Categoria", alert.category()),
        ("Severidade", alert.severity()),
        ("Payload", alert.payload_printable().map(|p| truncate(&p))),
    ];

    fields
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(payload: &str) -> String {
    payload.chars().take(MAX_PAYLOAD_CHARS).collect()
}
