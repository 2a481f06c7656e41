//! In-process implementation of [`SecretStore`].
//!
//! Used by tests and headless development. Prompt behavior for
//! access-controlled entries is scriptable: outcomes can be queued ahead
//! of time, an artificial prompt latency can be injected, and every
//! prompt is counted, so callers can assert on exactly how many platform
//! prompts a flow would have raised.

use crate::error::{Result, SecretError};
use crate::{AccessPolicy, Credential, SecretStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of a simulated biometric-or-passcode prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user passed the check; the value is released.
    Allow,
    /// The user cancelled, failed the match, or has no enrollment.
    Deny,
}

struct StoredEntry {
    username: String,
    secret: String,
    policy: AccessPolicy,
}

/// In-memory secret store with scripted prompt outcomes.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    prompt_script: Mutex<VecDeque<PromptOutcome>>,
    prompt_delay: Mutex<Option<Duration>>,
    prompt_count: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store. Prompts allow by default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome for the next access-controlled read. Outcomes
    /// are consumed in order; an empty queue allows.
    pub fn script_prompt(&self, outcome: PromptOutcome) {
        self.prompt_script
            .lock()
            .expect("prompt script lock poisoned")
            .push_back(outcome);
    }

    /// Inject latency into every prompt, simulating the time a modal
    /// platform prompt stays open.
    pub fn set_prompt_delay(&self, delay: Duration) {
        *self.prompt_delay.lock().expect("prompt delay lock poisoned") = Some(delay);
    }

    /// Number of prompts raised so far.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompt_count.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> PromptOutcome {
        self.prompt_script
            .lock()
            .expect("prompt script lock poisoned")
            .pop_front()
            .unwrap_or(PromptOutcome::Allow)
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn has(&self, service: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .expect("entries lock poisoned")
            .contains_key(service))
    }

    async fn get(&self, service: &str, _policy: AccessPolicy) -> Result<Option<Credential>> {
        // Prompting follows the stored entry's policy, matching platform
        // behavior: a protected item prompts on every read, and a missing
        // item returns nothing without prompting.
        let (needs_prompt, cred) = {
            let entries = self.entries.lock().expect("entries lock poisoned");
            match entries.get(service) {
                None => return Ok(None),
                Some(entry) => (
                    entry.policy == AccessPolicy::BiometricOrPasscode,
                    Credential::new(entry.username.clone(), entry.secret.clone()),
                ),
            }
        };

        if needs_prompt {
            self.prompt_count.fetch_add(1, Ordering::SeqCst);
            let delay = *self.prompt_delay.lock().expect("prompt delay lock poisoned");
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.next_outcome() == PromptOutcome::Deny {
                return Err(SecretError::UnlockFailed(
                    "biometric prompt declined".to_string(),
                ));
            }
        }

        Ok(Some(cred))
    }

    async fn set(
        &self,
        service: &str,
        username: &str,
        secret: &str,
        policy: AccessPolicy,
    ) -> Result<()> {
        self.entries.lock().expect("entries lock poisoned").insert(
            service.to_string(),
            StoredEntry {
                username: username.to_string(),
                secret: secret.to_string(),
                policy,
            },
        );
        Ok(())
    }

    async fn delete(&self, service: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("entries lock poisoned")
            .remove(service);
        Ok(())
    }
}
