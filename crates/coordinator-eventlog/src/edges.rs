use serde::{Deserialize, Serialize};

use coordinator_core::constants::{EVENT_KIND_LIST, EVENT_KIND_POST};
use coordinator_core::event::{Event, ListBody};
use coordinator_core::types::{EventId, RefHash, Sats};

/// `(source_event_id, source_ref, target_ref, edge_sats, source_kind)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CitationEdge {
    pub source_event_id: EventId,
    pub source_ref: RefHash,
    pub target_ref: RefHash,
    pub edge_sats: Sats,
    pub source_kind: u8,
}

/// Extract `[ref:hex64]` mentions from a UTF-8 decode of an event's body,
/// plus the `items` array of a LIST payload. Targets are deduplicated;
/// `edge_sats` splits the event's `sats` evenly (floor) across all edges.
pub fn extract_edges(event_id: EventId, event: &Event) -> Vec<CitationEdge> {
    let mut targets: Vec<RefHash> = Vec::new();

    if let Ok(text) = std::str::from_utf8(&event.body) {
        for candidate in find_ref_mentions(text) {
            if !targets.contains(&candidate) {
                targets.push(candidate);
            }
        }
    }

    if event.kind == EVENT_KIND_LIST {
        if let Ok(list) = serde_json::from_slice::<ListBody>(&event.body) {
            for item in list.items {
                if let Ok(r) = RefHash::from_hex(&item) {
                    if !targets.contains(&r) {
                        targets.push(r);
                    }
                }
            }
        }
    }

    if targets.is_empty() {
        return Vec::new();
    }

    let edge_sats = event.sats / targets.len() as u64;
    targets
        .into_iter()
        .map(|target_ref| CitationEdge {
            source_event_id: event_id,
            source_ref: event.reference,
            target_ref,
            edge_sats,
            source_kind: event.kind,
        })
        .collect()
}

fn find_ref_mentions(text: &str) -> Vec<RefHash> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let needle = b"[ref:";
    let mut i = 0;
    while i + needle.len() < bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            let start = i + needle.len();
            if let Some(end_rel) = text[start..].find(']') {
                let candidate = &text[start..start + end_rel];
                if candidate.len() == 64 {
                    if let Ok(r) = RefHash::from_hex(candidate) {
                        out.push(r);
                    }
                }
                i = start + end_rel;
                continue;
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_core::constants::EVENT_VERSION;
    use coordinator_core::types::PubKey;

    fn event_with_body(body: &str, sats: u64, kind: u8) -> Event {
        Event {
            v: EVENT_VERSION,
            kind,
            from: PubKey::from_bytes([1u8; 32]),
            reference: RefHash::from_bytes([2u8; 32]),
            body: body.as_bytes().to_vec(),
            sats,
            ts: 0,
            sig: vec![],
            pow_nonce: None,
        }
    }

    #[test]
    fn extracts_single_mention() {
        let target = RefHash::from_bytes([7u8; 32]);
        let body = format!("see [ref:{}] for details", target.to_hex());
        let event = event_with_body(&body, 100, EVENT_KIND_POST);
        let edges = extract_edges(EventId::from_bytes([0u8; 32]), &event);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_ref, target);
        assert_eq!(edges[0].edge_sats, 100);
    }

    #[test]
    fn splits_sats_across_multiple_targets() {
        let a = RefHash::from_bytes([1u8; 32]);
        let b = RefHash::from_bytes([2u8; 32]);
        let body = format!("[ref:{}] and [ref:{}]", a.to_hex(), b.to_hex());
        let event = event_with_body(&body, 101, EVENT_KIND_POST);
        let edges = extract_edges(EventId::from_bytes([0u8; 32]), &event);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_sats, 50);
    }

    #[test]
    fn no_mentions_yields_no_edges() {
        let event = event_with_body("nothing to see here", 5, EVENT_KIND_POST);
        assert!(extract_edges(EventId::from_bytes([0u8; 32]), &event).is_empty());
    }
}
