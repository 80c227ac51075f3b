// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proving pipeline
//!
//! consistency check -> cache lookup (coalesced) -> native search -> external
//! bridge when the native result is inconclusive. Only conclusive results are
//! cached unless the cache is configured otherwise.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::bridge::{ProverBridge, ProverDescriptor, TokenBucket};
use crate::cache::{CacheStats, ProofCache};
use crate::config::TdfolConfig;
use crate::conflict::{Conflict, ConflictDetector};
use crate::error::{Result, TdfolError};
use crate::formula::Formula;
use crate::parser::Parser;
use crate::prover::{NativeProver, ProofResult, ProverBudget};

/// Parser, native prover, cache, bridge and conflict detector wired together
pub struct TdfolEngine {
    config: TdfolConfig,
    parser: Parser,
    prover: NativeProver,
    cache: Arc<ProofCache>,
    bridge: Option<Arc<ProverBridge>>,
    detector: ConflictDetector,
}

/// Builder for engines with injected collaborators
#[derive(Default)]
pub struct TdfolEngineBuilder {
    config: Option<TdfolConfig>,
    cache: Option<Arc<ProofCache>>,
    bridge: Option<ProverBridge>,
    bucket: Option<Arc<TokenBucket>>,
}

impl TdfolEngineBuilder {
    pub fn config(mut self, config: TdfolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a cache between engines
    pub fn cache(mut self, cache: Arc<ProofCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use this bridge instead of building one from `[bridge]`
    pub fn bridge(mut self, bridge: ProverBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Share the LLM token bucket
    pub fn token_bucket(mut self, bucket: Arc<TokenBucket>) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Inside a tokio runtime, adapter availability is checked in the background
    pub fn build(self) -> Result<TdfolEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache = match self.cache {
            Some(cache) => cache,
            None => Arc::new(ProofCache::new(config.cache.clone())?),
        };
        let bridge = match self.bridge {
            Some(bridge) => Some(bridge),
            None if config.bridge.enabled => {
                let bucket = self
                    .bucket
                    .unwrap_or_else(|| Arc::new(TokenBucket::from_config(&config.rate_limit)));
                Some(ProverBridge::from_config(&config.bridge, &config.llm, bucket)?)
            }
            None => None,
        };

        info!(
            bridge = bridge.as_ref().map_or(0, ProverBridge::len),
            cache_capacity = cache.config().capacity,
            check_consistency = config.check_consistency,
            "engine ready"
        );
        let bridge = bridge.map(Arc::new);
        if let (Some(bridge), Ok(handle)) = (&bridge, tokio::runtime::Handle::try_current()) {
            let bridge = Arc::clone(bridge);
            handle.spawn(async move {
                bridge.probe_all().await;
            });
        }
        Ok(TdfolEngine {
            parser: Parser::with_config(config.parser.clone()),
            prover: NativeProver::tdfol(config.prover.clone()),
            cache,
            bridge,
            detector: ConflictDetector::default(),
            config,
        })
    }
}

impl TdfolEngine {
    pub fn new(config: TdfolConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> TdfolEngineBuilder {
        TdfolEngineBuilder::default()
    }

    pub fn config(&self) -> &TdfolConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ProofCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn bridge(&self) -> Option<&ProverBridge> {
        self.bridge.as_deref()
    }

    /// Backend descriptors once every adapter's availability is known
    ///
    /// Shares the answer with the check started by `build`; empty without a bridge.
    pub async fn bridge_status(&self) -> Vec<ProverDescriptor> {
        match &self.bridge {
            Some(bridge) => bridge.probe_all().await,
            None => Vec::new(),
        }
    }

    pub fn parse(&self, text: &str) -> Result<Formula> {
        self.parser.parse(text)
    }

    /// Deontic conflicts among `axioms`
    pub fn conflicts(&self, axioms: &[Formula]) -> Vec<Conflict> {
        self.detector.detect(axioms)
    }

    /// Fails with every detected conflict, regardless of `check_consistency`
    pub fn check_consistency(&self, axioms: &[Formula]) -> Result<()> {
        let conflicts = self.conflicts(axioms);
        if conflicts.is_empty() {
            Ok(())
        } else {
            warn!(conflicts = conflicts.len(), "axioms are inconsistent");
            Err(TdfolError::InconsistentAxioms(conflicts))
        }
    }

    pub async fn prove(&self, goal: &Formula, axioms: &[Formula]) -> Result<ProofResult> {
        self.prove_with_budget(goal, axioms, &self.config.prover).await
    }

    /// Prove with a budget other than the configured one
    ///
    /// The cache key ignores the budget, so a conclusive answer found under
    /// any budget is reused.
    pub async fn prove_with_budget(
        &self,
        goal: &Formula,
        axioms: &[Formula],
        budget: &ProverBudget,
    ) -> Result<ProofResult> {
        let span = info_span!("prove", goal = %goal, axioms = axioms.len());
        async {
            if self.config.check_consistency {
                self.check_consistency(axioms)?;
            }
            self.cache
                .get_or_compute(goal, axioms, || self.solve(goal, axioms, budget.clone()))
                .await
        }
        .instrument(span)
        .await
    }

    /// Parse goal and axioms, then prove
    pub async fn prove_text<S: AsRef<str>>(&self, goal: &str, axioms: &[S]) -> Result<ProofResult> {
        let goal = self.parser.parse(goal)?;
        let axioms = self.parser.parse_all(axioms)?;
        self.prove(&goal, &axioms).await
    }

    async fn solve(&self, goal: &Formula, axioms: &[Formula], budget: ProverBudget) -> Result<ProofResult> {
        let start = Instant::now();
        let prover = self.prover.clone();
        let (g, a) = (goal.clone(), axioms.to_vec());
        let native = tokio::task::spawn_blocking(move || prover.prove_with_budget(&g, &a, &budget))
            .await
            .map_err(|e| TdfolError::Io(std::io::Error::other(format!("native search aborted: {}", e))))?;

        if !native.status.should_escalate() {
            return Ok(native);
        }
        let Some(bridge) = &self.bridge else {
            debug!(status = %native.status, "no bridge configured");
            return Ok(native);
        };

        debug!(status = %native.status, "escalating to external provers");
        let external = bridge.prove_external(goal, axioms, None).await;
        Ok(merge(native, external, start.elapsed().as_millis() as u64))
    }
}

/// External answer when conclusive, native otherwise; attempts from both
fn merge(native: ProofResult, external: ProofResult, elapsed_ms: u64) -> ProofResult {
    let mut attempts = native.attempts.clone();
    attempts.extend(external.attempts.iter().cloned());
    let winner = if external.status.is_conclusive() { external } else { native };
    ProofResult {
        attempts,
        elapsed_ms,
        ..winner
    }
}
