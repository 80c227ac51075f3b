// SPDX-License-Identifier: PMPL-1.0-or-later

//! External prover bridge
//!
//! Delegates problems the native prover cannot settle to external backends
//! (SMT solvers, first-order ATPs, Coq, an LLM endpoint). Each backend sits
//! behind a [`ProverAdapter`]; the [`ProverBridge`] picks capable adapters in
//! priority order, bounds every call with a timeout and records every
//! attempt. Failures never surface as errors, only as attempt records.

use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{Result, TdfolError};
use crate::formula::Formula;
use crate::prover::{ProofResult, ProofStatus, ProverAttempt};

pub mod coq;
pub(crate) mod encode;
#[cfg(feature = "llm")]
pub mod llm;
pub mod rate_limit;
pub mod smt;
pub mod tptp;

pub use rate_limit::{RateLimitConfig, TokenBucket};

/// Family of an external backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// SMT-LIB 2 solver (decidable fragments first)
    Smt,
    /// First-order ATP speaking TPTP
    Atp,
    /// Interactive prover driven by an automation tactic
    Interactive,
    /// OpenAI-compatible chat endpoint
    Llm,
}

impl AdapterKind {
    pub fn default_priority(&self) -> u32 {
        match self {
            AdapterKind::Smt => 10,
            AdapterKind::Atp => 20,
            AdapterKind::Interactive => 30,
            AdapterKind::Llm => 90,
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterKind::Smt => "smt",
            AdapterKind::Atp => "atp",
            AdapterKind::Interactive => "interactive",
            AdapterKind::Llm => "llm",
        };
        write!(f, "{}", s)
    }
}

/// What a backend can do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub propositional: bool,
    pub first_order: bool,
    pub quantifiers: bool,
    pub temporal: bool,
    pub deontic: bool,
    pub induction: bool,
    /// Answers are not backed by a checked proof
    pub heuristic: bool,
    /// Temporal and deontic subformulas are abstracted to fresh predicates
    pub abstracts_modalities: bool,
}

impl Capabilities {
    /// Classical first-order solver with modal abstraction
    pub fn classical() -> Self {
        Capabilities {
            propositional: true,
            first_order: true,
            quantifiers: true,
            abstracts_modalities: true,
            ..Capabilities::default()
        }
    }

    pub fn handles(&self, needs: &Requirements) -> bool {
        self.propositional
            && (!needs.first_order || self.first_order)
            && (!needs.quantifiers || self.quantifiers)
            && (!needs.temporal || self.temporal || self.abstracts_modalities)
            && (!needs.deontic || self.deontic || self.abstracts_modalities)
    }
}

/// Features a problem uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    pub first_order: bool,
    pub quantifiers: bool,
    pub temporal: bool,
    pub deontic: bool,
}

impl Requirements {
    pub fn of(goal: &Formula, axioms: &[Formula]) -> Self {
        std::iter::once(goal).chain(axioms).fold(Requirements::default(), |acc, f| Requirements {
            first_order: acc.first_order || f.is_first_order(),
            quantifiers: acc.quantifiers || f.has_quantifiers(),
            temporal: acc.temporal || f.is_temporal(),
            deontic: acc.deontic || f.is_deontic(),
        })
    }
}

/// Identity and standing of an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverDescriptor {
    pub name: String,
    pub kind: AdapterKind,
    pub capabilities: Capabilities,
    /// Lower runs first
    pub priority: u32,
    /// Result of the availability probe; `None` until probed
    #[serde(default)]
    pub available: Option<bool>,
}

/// Problem text in the backend's input language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Information was abstracted away, so a countermodel proves nothing
    pub lossy: bool,
}

/// What a backend printed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl From<std::process::Output> for RawOutput {
    fn from(output: std::process::Output) -> Self {
        RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    }
}

/// An external prover
#[async_trait]
pub trait ProverAdapter: Send + Sync {
    fn descriptor(&self) -> ProverDescriptor;

    /// Whether the backend can be reached at all
    async fn probe(&self) -> bool;

    /// Encode `axioms ⊢ goal` in the backend's language
    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation>;

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput>;

    /// Read the verdict from the backend's output
    fn translate_out(&self, raw: &RawOutput, translation: &Translation) -> ProofStatus;
}

/// Run an executable, feeding `stdin` when given
///
/// The child is killed when the returned future is dropped.
pub(crate) async fn run_process(
    executable: &Path,
    args: &[String],
    stdin: Option<&str>,
    cwd: Option<&Path>,
) -> anyhow::Result<RawOutput> {
    let mut cmd = Command::new(executable);
    cmd.args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", executable.display()))?;

    if let Some(input) = stdin {
        let mut pipe = child
            .stdin
            .take()
            .with_context(|| format!("failed to open stdin of {}", executable.display()))?;
        pipe.write_all(input.as_bytes()).await?;
        pipe.flush().await?;
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("failed to wait for {}", executable.display()))?;
    Ok(RawOutput::from(output))
}

/// One configured backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub name: String,
    pub kind: AdapterKind,
    /// Binary name or path; defaults to `name`
    #[serde(default)]
    pub executable: Option<String>,
    /// Extra arguments appended to the adapter's own
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fail construction when the backend is missing
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl AdapterConfig {
    pub fn new(name: impl Into<String>, kind: AdapterKind) -> Self {
        AdapterConfig {
            name: name.into(),
            kind,
            executable: None,
            args: Vec::new(),
            enabled: true,
            required: false,
            priority: None,
            timeout_ms: None,
        }
    }

    pub fn executable(&self) -> &str {
        self.executable.as_deref().unwrap_or(&self.name)
    }

    /// Backends tried when no adapter is configured explicitly
    pub fn defaults() -> Vec<AdapterConfig> {
        vec![
            AdapterConfig::new("z3", AdapterKind::Smt),
            AdapterConfig::new("cvc5", AdapterKind::Smt),
            AdapterConfig::new("vampire", AdapterKind::Atp),
            AdapterConfig::new("eprover", AdapterKind::Atp),
            AdapterConfig::new("coqc", AdapterKind::Interactive),
            AdapterConfig::new("llm", AdapterKind::Llm),
        ]
    }
}

/// Bridge-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enabled: bool,
    /// Per-call limit for adapters without their own
    pub timeout_ms: u64,
    /// Explicit adapters; empty means [`AdapterConfig::defaults`]
    pub adapters: Vec<AdapterConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            enabled: true,
            timeout_ms: 10_000,
            adapters: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(TdfolError::config("bridge.timeout_ms must be positive"));
        }
        for (i, a) in self.adapters.iter().enumerate() {
            if a.name.trim().is_empty() {
                return Err(TdfolError::config(format!("bridge.adapters[{}] has an empty name", i)));
            }
            if a.timeout_ms == Some(0) {
                return Err(TdfolError::config(format!("adapter {} has a zero timeout", a.name)));
            }
            if self.adapters[..i].iter().any(|b| b.name == a.name) {
                return Err(TdfolError::config(format!("adapter {} configured twice", a.name)));
            }
        }
        Ok(())
    }
}

/// OpenAI-compatible endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`; unset disables the adapter
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset; the
    /// environment is never read unless this is set
    pub api_key_env: Option<String>,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_key_env: None,
            max_tokens: 256,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| self.api_key_env.as_ref().and_then(|var| std::env::var(var).ok()))
    }
}

struct Registered {
    adapter: Arc<dyn ProverAdapter>,
    descriptor: ProverDescriptor,
    timeout: Duration,
    available: OnceCell<bool>,
}

impl Registered {
    /// Probe once; later calls, and callers racing the first, share its answer
    async fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.bounded_probe()).await
    }

    async fn bounded_probe(&self) -> bool {
        match tokio::time::timeout(self.timeout, self.adapter.probe()).await {
            Ok(available) => {
                debug!(adapter = %self.descriptor.name, available, "adapter probed");
                available
            }
            Err(_) => {
                warn!(
                    adapter = %self.descriptor.name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "availability probe timed out"
                );
                false
            }
        }
    }
}

/// Capability-aware dispatcher over external adapters
pub struct ProverBridge {
    adapters: Vec<Registered>,
    default_timeout: Duration,
}

impl ProverBridge {
    pub fn new(default_timeout: Duration) -> Self {
        ProverBridge {
            adapters: Vec::new(),
            default_timeout,
        }
    }

    /// Build adapters from configuration
    ///
    /// Adapters whose backend is missing are still registered and reported as
    /// unavailable at call time, unless marked `required`.
    pub fn from_config(config: &BridgeConfig, llm: &LlmConfig, bucket: Arc<TokenBucket>) -> Result<Self> {
        config.validate()?;
        let mut bridge = ProverBridge::new(Duration::from_millis(config.timeout_ms));
        let specs = if config.adapters.is_empty() {
            AdapterConfig::defaults()
        } else {
            config.adapters.clone()
        };
        for spec in specs.iter().filter(|s| s.enabled) {
            let timeout = Duration::from_millis(spec.timeout_ms.unwrap_or(config.timeout_ms));
            let adapter: Arc<dyn ProverAdapter> = match spec.kind {
                AdapterKind::Smt => Arc::new(smt::SmtAdapter::from_config(spec, timeout)),
                AdapterKind::Atp => Arc::new(tptp::TptpAdapter::from_config(spec, timeout)),
                AdapterKind::Interactive => Arc::new(coq::CoqAdapter::from_config(spec)),
                AdapterKind::Llm => match llm_adapter(spec, llm, &bucket)? {
                    Some(adapter) => adapter,
                    None => continue,
                },
            };
            if spec.required && spec.kind != AdapterKind::Llm && which::which(spec.executable()).is_err() {
                return Err(TdfolError::config(format!(
                    "required prover {} not found (looked for '{}')",
                    spec.name,
                    spec.executable()
                )));
            }
            bridge.register_with(adapter, spec.priority, Some(timeout));
        }
        info!(adapters = bridge.len(), "prover bridge configured");
        Ok(bridge)
    }

    pub fn register(&mut self, adapter: Arc<dyn ProverAdapter>) {
        self.register_with(adapter, None, None);
    }

    /// Register with an overriding priority and timeout
    pub fn register_with(&mut self, adapter: Arc<dyn ProverAdapter>, priority: Option<u32>, timeout: Option<Duration>) {
        let mut descriptor = adapter.descriptor();
        if let Some(p) = priority {
            descriptor.priority = p;
        }
        debug!(name = %descriptor.name, kind = %descriptor.kind, priority = descriptor.priority, "registering adapter");
        self.adapters.retain(|r| r.descriptor.name != descriptor.name);
        self.adapters.push(Registered {
            adapter,
            descriptor,
            timeout: timeout.unwrap_or(self.default_timeout),
            available: OnceCell::new(),
        });
        // stable: equal priorities keep registration order
        self.adapters.sort_by_key(|r| r.descriptor.priority);
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Probe every adapter not yet probed, each bounded by its timeout
    ///
    /// Returns the descriptors with availability filled in.
    pub async fn probe_all(&self) -> Vec<ProverDescriptor> {
        for registered in &self.adapters {
            registered.is_available().await;
        }
        let available = self.adapters.iter().filter(|r| r.available.get() == Some(&true)).count();
        info!(adapters = self.adapters.len(), available, "prover bridge probed");
        self.descriptors()
    }

    /// Descriptors in priority order, with probe results where known
    pub fn descriptors(&self) -> Vec<ProverDescriptor> {
        self.adapters
            .iter()
            .map(|r| ProverDescriptor {
                available: r.available.get().copied(),
                ..r.descriptor.clone()
            })
            .collect()
    }

    /// Try capable adapters in priority order, `preferred` first
    pub async fn prove_external(&self, goal: &Formula, axioms: &[Formula], preferred: Option<&str>) -> ProofResult {
        let span = info_span!("prove_external", goal = %goal, preferred = preferred.unwrap_or("-"));
        self.dispatch(goal, axioms, preferred).instrument(span).await
    }

    async fn dispatch(&self, goal: &Formula, axioms: &[Formula], preferred: Option<&str>) -> ProofResult {
        let start = Instant::now();
        let needs = Requirements::of(goal, axioms);
        let mut order: Vec<&Registered> = self.adapters.iter().collect();
        if let Some(name) = preferred {
            if let Some(pos) = order.iter().position(|r| r.descriptor.name == name) {
                let first = order.remove(pos);
                order.insert(0, first);
            } else {
                warn!(preferred = name, "preferred prover is not registered");
            }
        }

        let mut attempts: Vec<ProverAttempt> = Vec::new();
        for reg in order {
            let name = reg.descriptor.name.as_str();
            if !reg.descriptor.capabilities.handles(&needs) {
                debug!(adapter = name, "skipping adapter without the needed capabilities");
                if Some(name) == preferred {
                    attempts.push(
                        ProverAttempt::new(name, ProofStatus::Unsupported, 0).with_reason("missing capabilities"),
                    );
                }
                continue;
            }
            if !reg.is_available().await {
                debug!(adapter = name, "adapter unavailable");
                attempts.push(ProverAttempt::new(name, ProofStatus::ProverUnavailable, 0).with_reason("probe failed"));
                continue;
            }

            let t0 = Instant::now();
            let elapsed = |t0: Instant| t0.elapsed().as_millis() as u64;
            let translation = match reg.adapter.translate_in(goal, axioms) {
                Ok(t) => t,
                Err(e) => {
                    debug!(adapter = name, error = %e, "translation failed");
                    attempts.push(
                        ProverAttempt::new(name, ProofStatus::Unsupported, elapsed(t0)).with_reason(e.to_string()),
                    );
                    continue;
                }
            };

            let attempt = match tokio::time::timeout(reg.timeout, reg.adapter.invoke(&translation.text)).await {
                Err(_) => {
                    warn!(adapter = name, timeout_ms = reg.timeout.as_millis() as u64, "adapter timed out");
                    ProverAttempt::new(name, ProofStatus::Timeout, elapsed(t0))
                }
                Ok(Err(e)) => match e.downcast_ref::<TdfolError>() {
                    Some(TdfolError::RateLimited { retry_after_ms }) => {
                        warn!(adapter = name, retry_after_ms, "adapter rate limited");
                        ProverAttempt::new(name, ProofStatus::RateLimited, elapsed(t0))
                            .with_reason(format!("retry after {} ms", retry_after_ms))
                    }
                    _ => {
                        let detail = format!("{:#}", e);
                        warn!(adapter = name, error = %detail, "adapter failed");
                        ProverAttempt::new(name, ProofStatus::Unknown, elapsed(t0)).with_reason(detail)
                    }
                },
                Ok(Ok(raw)) => {
                    let status = reg.adapter.translate_out(&raw, &translation);
                    debug!(adapter = name, %status, lossy = translation.lossy, "adapter answered");
                    ProverAttempt::new(name, status, elapsed(t0))
                }
            };

            let status = attempt.status;
            attempts.push(attempt);
            if status.is_conclusive() {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                info!(adapter = name, %status, elapsed_ms, "external prover settled the goal");
                return ProofResult {
                    status,
                    certificate: None,
                    prover: name.to_string(),
                    elapsed_ms,
                    attempts,
                    message: Some(format!("{} by {}", status, name)),
                };
            }
        }

        let status = final_status(&attempts);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(%status, tried = attempts.len(), "no external prover settled the goal");
        ProofResult {
            status,
            certificate: None,
            prover: "bridge".to_string(),
            elapsed_ms,
            message: Some(format!("{} adapter attempt(s), none conclusive", attempts.len())),
            attempts,
        }
    }
}

/// Status when no adapter was conclusive
///
/// An adapter that actually ran outranks rate limiting, which outranks
/// unsupported input, which outranks missing backends.
fn final_status(attempts: &[ProverAttempt]) -> ProofStatus {
    let any = |s: ProofStatus| attempts.iter().any(|a| a.status == s);
    if any(ProofStatus::Unknown) {
        ProofStatus::Unknown
    } else if any(ProofStatus::Timeout) {
        ProofStatus::Timeout
    } else if any(ProofStatus::RateLimited) {
        ProofStatus::RateLimited
    } else if any(ProofStatus::Unsupported) {
        ProofStatus::Unsupported
    } else {
        ProofStatus::ProverUnavailable
    }
}

#[cfg(feature = "llm")]
fn llm_adapter(
    spec: &AdapterConfig,
    llm: &LlmConfig,
    bucket: &Arc<TokenBucket>,
) -> Result<Option<Arc<dyn ProverAdapter>>> {
    if llm.endpoint.is_none() {
        if spec.required {
            return Err(TdfolError::config("required LLM prover has no llm.endpoint"));
        }
        return Ok(None);
    }
    let adapter = llm::LlmAdapter::new(&spec.name, llm.clone(), Arc::clone(bucket))
        .map_err(|e| TdfolError::config(format!("cannot build LLM adapter: {:#}", e)))?;
    Ok(Some(Arc::new(adapter)))
}

#[cfg(not(feature = "llm"))]
fn llm_adapter(
    spec: &AdapterConfig,
    _llm: &LlmConfig,
    _bucket: &Arc<TokenBucket>,
) -> Result<Option<Arc<dyn ProverAdapter>>> {
    if spec.required {
        return Err(TdfolError::config("LLM prover required but the `llm` feature is disabled"));
    }
    Ok(None)
}

/// Resolve an adapter's executable, falling back to the configured string
pub(crate) fn resolve_executable(spec: &AdapterConfig) -> PathBuf {
    which::which(spec.executable()).unwrap_or_else(|_| PathBuf::from(spec.executable()))
}
