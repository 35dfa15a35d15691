//! Per-run orchestration: screening, ladder, validation, inference or
//! fallback, for every input URL.
//!
//! URLs run through an order-preserving bounded pool, so the report lists
//! results in input order however the work interleaves. A URL's failure
//! never affects its neighbours; only cancellation stops the run.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ExtractionError, Result};
use crate::fallback::FallbackSynthesizer;
use crate::inference::{AzureOpenAI, InferenceEngine};
use crate::ladder::{LadderOutcome, StrategyLadder};
use crate::progress::{estimate_remaining, Phase, ProgressEvent, ProgressSink};
use crate::rate_limit::SharedRateLimiter;
use crate::security::{ModelCredentials, SecretString, UrlValidator};
use crate::types::config::ExtractionConfig;
use crate::types::module::{ModuleSet, Provenance, QualityTier, StructuringPath};
use crate::types::report::{ExtractionReport, SkipReason, UrlResult};
use crate::types::request::ExtractionRequest;
use crate::validator::{ContentValidator, QualityAssessment};

/// Runs the full pipeline over a list of URLs.
pub struct Orchestrator {
    config: Arc<ExtractionConfig>,
    ladder: StrategyLadder,
    engine: Option<InferenceEngine>,
    synthesizer: FallbackSynthesizer,
    validator: ContentValidator,
    url_validator: UrlValidator,
}

/// Emits events and keeps the finished count for time estimates.
struct Tracker<'a> {
    sink: &'a dyn ProgressSink,
    start: Instant,
    total: usize,
    finished: AtomicUsize,
}

impl Tracker<'_> {
    fn emit(&self, request: &ExtractionRequest, phase: Phase) {
        if phase.is_terminal() {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        let elapsed = self.start.elapsed();
        let finished = self.finished.load(Ordering::SeqCst);
        self.sink.on_event(&ProgressEvent {
            url_index: request.index(),
            url: request.url().to_string(),
            phase,
            elapsed,
            estimated_remaining: estimate_remaining(elapsed, finished, self.total),
        });
    }
}

impl Orchestrator {
    /// Assemble an orchestrator from prepared parts.
    ///
    /// Without an engine every URL goes through the fallback synthesizer.
    pub fn new(config: ExtractionConfig, ladder: StrategyLadder, engine: Option<InferenceEngine>) -> Result<Self> {
        if config.workers == 0 {
            return Err(ExtractionError::Config("worker pool width must be at least 1".into()));
        }
        let validator = ContentValidator::new(config.quality.clone());
        let synthesizer = FallbackSynthesizer::new(config.fallback.clone());
        Ok(Self {
            config: Arc::new(config),
            ladder,
            engine,
            synthesizer,
            validator,
            url_validator: UrlValidator::new(),
        })
    }

    /// The production pipeline: standard ladder plus Azure OpenAI.
    ///
    /// One rate limiter is shared by the model and the managed scraping
    /// service.
    pub fn standard(
        config: ExtractionConfig,
        credentials: Option<ModelCredentials>,
        firecrawl_key: Option<SecretString>,
        chromium: Option<PathBuf>,
    ) -> Result<Self> {
        let limiter = SharedRateLimiter::new(&config.rate_limit);
        let ladder = StrategyLadder::standard(&config, limiter.clone(), firecrawl_key, chromium)
            .map_err(|e| ExtractionError::Config(format!("fetch strategies: {}", e)))?;

        let engine = match credentials {
            Some(credentials) => {
                let model = AzureOpenAI::new(credentials)
                    .map_err(|e| ExtractionError::Config(format!("model client: {}", e)))?;
                Some(InferenceEngine::new(Arc::new(model), config.inference.clone(), limiter))
            }
            None => None,
        };

        Self::new(config, ladder, engine)
    }

    /// Replace the URL screening rules.
    pub fn with_url_validator(mut self, url_validator: UrlValidator) -> Self {
        self.url_validator = url_validator;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process every URL and build the report.
    ///
    /// On cancellation the report holds the completed prefix of the input
    /// and is flagged `cancelled`.
    pub async fn run(&self, urls: &[String], cancel: &CancellationToken, progress: &dyn ProgressSink) -> ExtractionReport {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let tracker = Tracker {
            sink: progress,
            start: Instant::now(),
            total: urls.len(),
            finished: AtomicUsize::new(0),
        };

        info!(run_id = %run_id, urls = urls.len(), workers = self.config.workers, "Extraction run started");

        let tracker = &tracker;
        let mut results_stream = stream::iter(urls.iter().enumerate())
            .map(|(index, url)| {
                let request = ExtractionRequest::new(index, url.trim(), Arc::clone(&self.config));
                async move { self.process(request, cancel, tracker).await }
            })
            .buffered(self.config.workers.max(1));

        let mut results = Vec::with_capacity(urls.len());
        while let Some(result) = results_stream.next().await {
            match result {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(run_id = %run_id, completed = results.len(), error = %e, "Extraction run stopped");
                    break;
                }
            }
        }
        drop(results_stream);

        let cancelled = results.len() < urls.len();
        let report = ExtractionReport::new(run_id, started_at, results, cancelled);
        info!(
            run_id = %run_id,
            extracted = report.extracted(),
            inferred = report.inferred(),
            fallback = report.fallback(),
            skipped = report.skipped(),
            cancelled,
            elapsed_ms = tracker.start.elapsed().as_millis() as u64,
            "Extraction run finished"
        );
        report
    }

    /// One URL's pipeline. Only cancellation is an error.
    async fn process(
        &self,
        request: ExtractionRequest,
        cancel: &CancellationToken,
        tracker: &Tracker<'_>,
    ) -> Result<UrlResult> {
        check(cancel)?;
        tracker.emit(&request, Phase::Screening);
        if let Err(reason) = self.url_validator.screen(request.url()) {
            info!(url = %request.url(), reason = %reason, "URL skipped at screening");
            return Ok(self.skip(&request, reason, tracker));
        }

        tracker.emit(&request, Phase::Fetching);
        let outcome = self.ladder.run(request.url(), cancel).await?;

        check(cancel)?;
        tracker.emit(&request, Phase::Validating);
        let assessment = self.validator.assess(outcome.text());
        debug!(
            url = %request.url(),
            tier = %assessment.tier,
            chars = assessment.chars,
            boilerplate = assessment.boilerplate_ratio,
            rejection = assessment.rejection.map(|r| r.as_str()),
            "Content assessed"
        );

        if outcome.is_no_content() {
            return self.no_content(&request, cancel, tracker);
        }

        if assessment.tier.allows_inference() {
            if let Some(engine) = &self.engine {
                check(cancel)?;
                tracker.emit(&request, Phase::Inferring);
                match engine.infer(request.url(), outcome.text(), cancel).await {
                    Ok(success) => {
                        let provenance = provenance(&outcome, StructuringPath::Inference, &assessment)
                            .with_inference_attempts(success.attempts);
                        return Ok(self.complete(&request, ModuleSet::new(success.modules, provenance), tracker));
                    }
                    Err(failure) if failure.cancelled => return Err(ExtractionError::Cancelled),
                    Err(failure) => {
                        warn!(
                            url = %request.url(),
                            attempts = failure.attempts,
                            error = %failure.error,
                            "Inference failed, using fallback"
                        );
                        return self.fallback(&request, &outcome, &assessment, failure.attempts, cancel, tracker);
                    }
                }
            }
        }

        self.fallback(&request, &outcome, &assessment, 0, cancel, tracker)
    }

    fn fallback(
        &self,
        request: &ExtractionRequest,
        outcome: &LadderOutcome,
        assessment: &QualityAssessment,
        inference_attempts: u32,
        cancel: &CancellationToken,
        tracker: &Tracker<'_>,
    ) -> Result<UrlResult> {
        check(cancel)?;
        tracker.emit(request, Phase::Synthesizing);
        let synthesis = self.synthesizer.synthesize(request.url(), outcome.text());
        let provenance = provenance(outcome, StructuringPath::Fallback, assessment)
            .with_inference_attempts(inference_attempts)
            .with_synthetic(synthesis.synthetic);
        Ok(self.complete(request, ModuleSet::new(synthesis.modules, provenance), tracker))
    }

    /// Every strategy came back empty: placeholder or skip.
    fn no_content(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
        tracker: &Tracker<'_>,
    ) -> Result<UrlResult> {
        check(cancel)?;
        tracker.emit(request, Phase::Synthesizing);
        let synthesis = self.synthesizer.placeholder(request.url());
        if !synthesis.informative && request.config().skip_uninformative {
            info!(url = %request.url(), "No content and no URL hints, skipping");
            return Ok(self.skip(request, SkipReason::NoContent, tracker));
        }

        let provenance =
            Provenance::new(None, StructuringPath::Fallback, QualityTier::Reject).with_synthetic(true);
        Ok(self.complete(request, ModuleSet::new(synthesis.modules, provenance), tracker))
    }

    fn complete(&self, request: &ExtractionRequest, modules: ModuleSet, tracker: &Tracker<'_>) -> UrlResult {
        info!(
            url = %request.url(),
            path = ?modules.provenance.path,
            strategy = modules.provenance.strategy.map(|s| s.as_str()),
            tier = %modules.provenance.tier,
            modules = modules.len(),
            synthetic = modules.is_synthetic(),
            "URL complete"
        );
        tracker.emit(request, Phase::Complete);
        UrlResult::Extracted {
            index: request.index(),
            url: request.url().to_string(),
            modules,
        }
    }

    fn skip(&self, request: &ExtractionRequest, reason: SkipReason, tracker: &Tracker<'_>) -> UrlResult {
        tracker.emit(request, Phase::Skipped);
        UrlResult::Skipped {
            index: request.index(),
            url: request.url().to_string(),
            reason,
        }
    }
}

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ExtractionError::Cancelled)
    } else {
        Ok(())
    }
}

fn provenance(outcome: &LadderOutcome, path: StructuringPath, assessment: &QualityAssessment) -> Provenance {
    Provenance::new(outcome.strategy(), path, assessment.tier).with_source_chars(assessment.chars)
}
