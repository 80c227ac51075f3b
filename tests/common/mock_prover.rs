// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mock prover adapter for testing

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tdfol::bridge::{AdapterKind, Capabilities, ProverAdapter, ProverDescriptor, RawOutput, Translation};
use tdfol::{Formula, ProofStatus, TdfolError};

/// What the mock does on its next invocation
#[derive(Debug, Clone)]
pub enum MockReply {
    Verdict(ProofStatus),
    Fail(String),
    RateLimited,
    Hang,
}

/// A scripted adapter; replies are consumed in order, the last one repeats
pub struct MockProver {
    pub name: String,
    pub kind: AdapterKind,
    pub capabilities: Capabilities,
    pub available: bool,
    pub lossy: bool,
    pub delay: Duration,
    /// Set to hang the availability probe
    pub probe_hangs: bool,
    probes: AtomicUsize,
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    pub last_input: Mutex<Option<String>>,
}

impl MockProver {
    pub fn new(name: &str, reply: MockReply) -> Self {
        MockProver {
            name: name.to_string(),
            kind: AdapterKind::Smt,
            capabilities: Capabilities::classical(),
            available: true,
            lossy: false,
            delay: Duration::ZERO,
            probe_hangs: false,
            probes: AtomicUsize::new(0),
            replies: Mutex::new(VecDeque::from([reply])),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn answering(name: &str, status: ProofStatus) -> Arc<Self> {
        Arc::new(Self::new(name, MockReply::Verdict(status)))
    }

    pub fn with_kind(mut self, kind: AdapterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn lossy(mut self) -> Self {
        self.lossy = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_hanging_probe(mut self) -> Self {
        self.probe_hangs = true;
        self
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn then(self, reply: MockReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            replies.pop_front().unwrap_or(MockReply::Verdict(ProofStatus::Unknown))
        } else {
            replies.front().cloned().unwrap_or(MockReply::Verdict(ProofStatus::Unknown))
        }
    }
}

#[async_trait]
impl ProverAdapter for MockProver {
    fn descriptor(&self) -> ProverDescriptor {
        ProverDescriptor {
            name: self.name.clone(),
            kind: self.kind,
            capabilities: self.capabilities,
            priority: self.kind.default_priority(),
            available: None,
        }
    }

    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_hangs {
            std::future::pending::<()>().await;
        }
        self.available
    }

    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
        let mut text = String::new();
        for axiom in axioms {
            text.push_str(&format!("axiom {}\n", axiom));
        }
        text.push_str(&format!("goal {}\n", goal));
        Ok(Translation {
            text,
            lossy: self.lossy,
        })
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock() = Some(input.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.next_reply() {
            MockReply::Verdict(status) => Ok(RawOutput {
                stdout: status.to_string(),
                exit_code: Some(0),
                ..RawOutput::default()
            }),
            MockReply::Fail(message) => Err(anyhow::anyhow!(message)),
            MockReply::RateLimited => Err(TdfolError::RateLimited { retry_after_ms: 250 }.into()),
            MockReply::Hang => {
                std::future::pending::<()>().await;
                Ok(RawOutput::default())
            }
        }
    }

    fn translate_out(&self, raw: &RawOutput, translation: &Translation) -> ProofStatus {
        let status = raw.stdout.parse().unwrap_or(ProofStatus::Unknown);
        // a countermodel of an abstracted problem says nothing
        if translation.lossy && status == ProofStatus::Disproved {
            ProofStatus::Unknown
        } else {
            status
        }
    }
}
