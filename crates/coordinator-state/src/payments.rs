use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use coordinator_core::constants::PAYMENT_BINDING_TTL_SECS;
use coordinator_core::types::{EventId, PaymentHash, Sats};

/// A single event-hash-to-invoice binding, created by `POST /payreq`.
#[derive(Clone, Debug)]
pub struct PaymentBinding {
    pub event_hash: EventId,
    pub payment_hash: PaymentHash,
    pub bolt11: String,
    pub sats: Sats,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl PaymentBinding {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory, dual-indexed, time-bounded map from event-hash to Lightning
/// invoice. Never persisted to sled — bindings do not survive a restart,
/// by design: a client that loses a binding simply calls `/payreq` again.
#[derive(Default)]
pub struct PaymentBindingStore {
    by_event: Mutex<HashMap<EventId, PaymentHash>>,
    by_payment: Mutex<HashMap<PaymentHash, PaymentBinding>>,
}

impl PaymentBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &self,
        event_hash: EventId,
        payment_hash: PaymentHash,
        bolt11: String,
        sats: Sats,
    ) -> PaymentBinding {
        let now = Instant::now();
        let binding = PaymentBinding {
            event_hash,
            payment_hash,
            bolt11,
            sats,
            created_at: now,
            expires_at: now + Duration::from_secs(PAYMENT_BINDING_TTL_SECS),
        };
        self.by_event.lock().unwrap().insert(event_hash, payment_hash);
        self.by_payment
            .lock()
            .unwrap()
            .insert(payment_hash, binding.clone());
        binding
    }

    pub fn get_by_event_hash(&self, event_hash: EventId) -> Option<PaymentBinding> {
        let payment_hash = *self.by_event.lock().unwrap().get(&event_hash)?;
        let binding = self.by_payment.lock().unwrap().get(&payment_hash)?.clone();
        if binding.is_expired(Instant::now()) {
            None
        } else {
            Some(binding)
        }
    }

    pub fn get_by_payment_hash(&self, payment_hash: PaymentHash) -> Option<PaymentBinding> {
        let binding = self.by_payment.lock().unwrap().get(&payment_hash)?.clone();
        if binding.is_expired(Instant::now()) {
            None
        } else {
            Some(binding)
        }
    }

    /// Single-use consumption: removes both indexes.
    pub fn delete(&self, payment_hash: PaymentHash) {
        if let Some(binding) = self.by_payment.lock().unwrap().remove(&payment_hash) {
            self.by_event.lock().unwrap().remove(&binding.event_hash);
        }
    }

    /// Evict all expired entries. Intended to run on a slow background tick.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut by_payment = self.by_payment.lock().unwrap();
        let expired: Vec<PaymentHash> = by_payment
            .iter()
            .filter(|(_, b)| b.is_expired(now))
            .map(|(k, _)| *k)
            .collect();
        let mut by_event = self.by_event.lock().unwrap();
        for payment_hash in expired {
            if let Some(binding) = by_payment.remove(&payment_hash) {
                by_event.remove(&binding.event_hash);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_look_up_both_indexes() {
        let store = PaymentBindingStore::new();
        let event_hash = EventId::from_bytes([1u8; 32]);
        let payment_hash = PaymentHash::from_bytes([2u8; 32]);
        store.set(event_hash, payment_hash, "lnbc1...".into(), 500);

        assert!(store.get_by_event_hash(event_hash).is_some());
        assert!(store.get_by_payment_hash(payment_hash).is_some());
    }

    #[test]
    fn delete_removes_both_indexes() {
        let store = PaymentBindingStore::new();
        let event_hash = EventId::from_bytes([1u8; 32]);
        let payment_hash = PaymentHash::from_bytes([2u8; 32]);
        store.set(event_hash, payment_hash, "lnbc1...".into(), 500);
        store.delete(payment_hash);
        assert!(store.get_by_event_hash(event_hash).is_none());
        assert!(store.get_by_payment_hash(payment_hash).is_none());
    }

    #[test]
    fn missing_binding_is_none() {
        let store = PaymentBindingStore::new();
        assert!(store
            .get_by_event_hash(EventId::from_bytes([9u8; 32]))
            .is_none());
    }
}
