//! End-to-end scenarios for the extraction pipeline.
//!
//! Every scenario runs the real orchestrator, ladder, validator, engine and
//! synthesizer with scripted strategies and a scripted model, so no network
//! or model access is needed.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use module_extraction::{
    testing::{FetchScript, RecordingProgress, ScriptedModel, ScriptedStrategy},
    ContentValidator, ExtractionConfig, FallbackSynthesizer, FetchStrategy, InferenceEngine, InferenceError,
    NoProgress, Orchestrator, Phase, QualityThresholds, RetryPolicy, SharedRateLimiter, SkipReason,
    StrategyKind, StrategyLadder, StructuringPath, UrlResult,
};
use tokio_util::sync::CancellationToken;

const WELCOME: &str = r#"{"modules": [{"module": "Welcome", "description": "Introduction to the product",
    "submodules": [{"name": "Install", "description": "Installing the product"},
                   {"name": "Usage", "description": "Using the product"}]}]}"#;

const GUIDE: &str = "# Billing\n\nManage invoices and payment methods for your organization.\n\n\
                     ## Invoices\n\nDownload monthly statements.\n\n## Payment Methods\n\nAdd or remove cards.";

/// Config with short pages allowed and no waits.
fn config() -> ExtractionConfig {
    ExtractionConfig::default()
        .with_workers(3)
        .with_retry(RetryPolicy::default().without_backoff())
        .with_quality(QualityThresholds {
            min_chars: 10,
            ..QualityThresholds::default()
        })
}

fn build(config: ExtractionConfig, strategies: Vec<ScriptedStrategy>, model: Option<Arc<ScriptedModel>>) -> Orchestrator {
    let ladder = StrategyLadder::new(
        strategies
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn FetchStrategy>)
            .collect(),
        ContentValidator::new(config.quality.clone()),
    );
    let engine = model.map(|m| InferenceEngine::new(m, config.inference.clone(), SharedRateLimiter::unlimited()));
    Orchestrator::new(config, ladder, engine).unwrap()
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

#[tokio::test]
async fn test_short_page_with_successful_inference() {
    let model = Arc::new(ScriptedModel::always(Ok(WELCOME.into())));
    let orchestrator = build(
        config(),
        vec![ScriptedStrategy::new(StrategyKind::Plain).with_default(FetchScript::text("Welcome. See Install, Usage."))],
        Some(model.clone()),
    );

    let report = orchestrator
        .run(&urls(&["https://docs.example.com/"]), &CancellationToken::new(), &NoProgress)
        .await;

    let set = report.results[0].module_set().unwrap();
    assert_eq!(set.modules.len(), 1);
    assert_eq!(set.modules[0].name, "Welcome");
    let names: Vec<_> = set.modules[0].submodules.keys().cloned().collect();
    assert_eq!(names, vec!["Install", "Usage"]);
    assert_eq!(set.provenance.path, StructuringPath::Inference);
    assert_eq!(model.calls(), 1);

    let output = report.to_output_json();
    assert_eq!(output[0]["module"], "Welcome");
    assert_eq!(output[0]["Submodules"]["Usage"], "Using the product");
}

#[tokio::test]
async fn test_all_strategies_empty_never_crashes() {
    let model = Arc::new(ScriptedModel::always(Ok(WELCOME.into())));
    let orchestrator = build(
        config(),
        vec![
            ScriptedStrategy::new(StrategyKind::Plain),
            ScriptedStrategy::new(StrategyKind::StealthSession).with_default(FetchScript::Blocked),
            ScriptedStrategy::new(StrategyKind::Rendered).with_default(FetchScript::Timeout),
            ScriptedStrategy::new(StrategyKind::ManagedService).with_default(FetchScript::error("not configured")),
        ],
        Some(model.clone()),
    );

    let report = orchestrator
        .run(
            &urls(&["https://www.example.com/", "https://support.example.com/"]),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    assert_eq!(report.len(), 2);
    for result in &report.results {
        match result {
            UrlResult::Skipped { reason, .. } => assert_eq!(*reason, SkipReason::NoContent),
            UrlResult::Extracted { modules, .. } => {
                assert!(modules.is_synthetic());
                assert_eq!(modules.modules.len(), 1);
                assert!(modules.modules[0].synthetic);
                assert!(modules.is_well_formed());
            }
        }
    }
    assert!(report.results[0].is_skipped());
    assert!(!report.results[1].is_skipped());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_placeholder_kept_when_skipping_disabled() {
    let orchestrator = build(
        config().with_skip_uninformative(false),
        vec![ScriptedStrategy::new(StrategyKind::Plain)],
        None,
    );

    let report = orchestrator
        .run(&urls(&["https://www.example.com/"]), &CancellationToken::new(), &NoProgress)
        .await;

    let set = report.results[0].module_set().unwrap();
    assert!(set.is_synthetic());
    assert_eq!(set.modules[0].name, "example.com Documentation");
}

#[tokio::test]
async fn test_unreachable_known_site_gets_curated_placeholder() {
    let orchestrator = build(
        config(),
        vec![ScriptedStrategy::new(StrategyKind::Plain).with_default(FetchScript::Blocked)],
        None,
    );

    let report = orchestrator
        .run(
            &urls(&["https://support.discord.com/hc/en-us", "https://www.instagram.com/"]),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    let discord = report.results[0].module_set().unwrap();
    assert!(discord.is_synthetic());
    assert!(discord.modules[0].submodules.contains_key("Voice & Video"));

    let instagram = report.results[1].module_set().unwrap();
    assert!(instagram.modules[0].submodules.contains_key("Safety & Privacy"));
}

#[tokio::test]
async fn test_malformed_twice_then_success() {
    let model = Arc::new(ScriptedModel::new(vec![
        Ok("Sure! Here are the modules you asked for.".into()),
        Ok("```json\n{\"modules\": [{\"module\": \"Welcome\"}]}\n```".into()),
        Ok(WELCOME.into()),
    ]));
    let orchestrator = build(
        config(),
        vec![ScriptedStrategy::new(StrategyKind::Plain).with_default(FetchScript::text("Welcome. See Install, Usage."))],
        Some(model.clone()),
    );

    let report = orchestrator
        .run(&urls(&["https://docs.example.com/"]), &CancellationToken::new(), &NoProgress)
        .await;

    let set = report.results[0].module_set().unwrap();
    assert_eq!(model.calls(), 3);
    assert_eq!(set.provenance.inference_attempts, 3);
    assert_eq!(set.provenance.path, StructuringPath::Inference);
    assert_eq!(set.modules[0].name, "Welcome");
}

#[tokio::test]
async fn test_quota_exhaustion_falls_back() {
    let config = config();
    let model = Arc::new(ScriptedModel::always(Err(InferenceError::QuotaExceeded(
        "429 Too Many Requests".into(),
    ))));
    let orchestrator = build(
        config.clone(),
        vec![ScriptedStrategy::new(StrategyKind::Plain).with_default(FetchScript::text(GUIDE))],
        Some(model.clone()),
    );

    let report = orchestrator
        .run(&urls(&["https://docs.example.com/billing"]), &CancellationToken::new(), &NoProgress)
        .await;

    let set = report.results[0].module_set().unwrap();
    let expected = FallbackSynthesizer::new(config.fallback.clone()).synthesize("https://docs.example.com/billing", GUIDE);

    assert!(set.is_fallback());
    assert!(!set.is_synthetic());
    assert_eq!(set.modules, expected.modules);
    assert!(model.calls() <= 1 + config.inference.retry.quota_retry_limit() as usize);
    assert_eq!(set.modules[0].name, "Billing");
}

#[tokio::test]
async fn test_later_strategies_not_invoked_after_acceptable_text() {
    let plain = ScriptedStrategy::new(StrategyKind::Plain).with_default(FetchScript::Blocked);
    let stealth = ScriptedStrategy::new(StrategyKind::StealthSession).with_default(FetchScript::text(GUIDE));
    let rendered = ScriptedStrategy::new(StrategyKind::Rendered).with_default(FetchScript::text(GUIDE));
    let rendered_calls = rendered.call_counter();

    let orchestrator = build(config(), vec![plain, stealth, rendered], None);
    let report = orchestrator
        .run(
            &urls(&["https://docs.example.com/a", "https://docs.example.com/b"]),
            &CancellationToken::new(),
            &NoProgress,
        )
        .await;

    assert_eq!(rendered_calls.load(Ordering::SeqCst), 0);
    for set in report.module_sets() {
        assert_eq!(set.provenance.strategy, Some(StrategyKind::StealthSession));
    }
}

#[tokio::test]
async fn test_results_keep_input_order() {
    let list = urls(&[
        "https://docs.example.com/slow",
        "not a url",
        "https://docs.example.com/fast",
        "https://docs.example.com/medium",
    ]);
    let strategy = ScriptedStrategy::new(StrategyKind::Plain)
        .on(&list[0], FetchScript::delayed(Duration::from_millis(80), FetchScript::text(GUIDE)))
        .on(&list[2], FetchScript::text(GUIDE))
        .on(&list[3], FetchScript::delayed(Duration::from_millis(30), FetchScript::text(GUIDE)));

    let report = build(config().with_workers(4), vec![strategy], None)
        .run(&list, &CancellationToken::new(), &NoProgress)
        .await;

    assert!(!report.cancelled);
    assert_eq!(report.len(), list.len());
    for (i, result) in report.results.iter().enumerate() {
        assert_eq!(result.index(), i);
        assert_eq!(result.url(), list[i]);
    }
    assert!(report.results[1].is_skipped());
}

#[tokio::test]
async fn test_cancellation_returns_completed_prefix() {
    let list = urls(&[
        "https://docs.example.com/one",
        "https://docs.example.com/two",
        "https://docs.example.com/three",
    ]);
    let strategy = ScriptedStrategy::new(StrategyKind::Plain)
        .with_default(FetchScript::delayed(Duration::from_secs(10), FetchScript::text(GUIDE)))
        .on(&list[0], FetchScript::text(GUIDE));

    let orchestrator = build(config().with_workers(1), vec![strategy], None);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let progress = RecordingProgress::new();
    let report = orchestrator.run(&list, &cancel, &progress).await;

    assert!(report.cancelled);
    assert_eq!(report.len(), 1);
    assert_eq!(report.results[0].url(), list[0]);
    assert_eq!(progress.phases_for(0).last(), Some(&Phase::Complete));
    assert!(!progress.phases_for(1).contains(&Phase::Complete));
}

#[tokio::test]
async fn test_every_module_set_is_well_formed() {
    let pages = [
        GUIDE,
        "Quick reference\n- Shortcuts: Keyboard shortcuts for the editor\n- Themes\n- Plugins - Extend the editor",
        "The sync engine keeps every replica consistent. Conflicts are resolved by the latest write. \
         Offline edits are queued until the device reconnects.",
        "Welcome. See Install, Usage.",
        "Just a moment... Checking your browser before accessing this site.",
    ];
    let list: Vec<String> = (0..pages.len()).map(|i| format!("https://docs.example.com/page{i}")).collect();
    let mut strategy = ScriptedStrategy::new(StrategyKind::Plain);
    for (url, page) in list.iter().zip(pages) {
        strategy = strategy.on(url, FetchScript::text(page));
    }

    let model = Arc::new(ScriptedModel::new(vec![
        Ok(WELCOME.into()),
        Err(InferenceError::Provider("500 upstream".into())),
        Ok("{\"modules\": []}".into()),
    ]));
    let report = build(config().with_workers(1), vec![strategy], Some(model))
        .run(&list, &CancellationToken::new(), &NoProgress)
        .await;

    assert_eq!(report.len(), pages.len());
    for set in report.module_sets() {
        assert!(set.is_well_formed(), "malformed set: {:?}", set);
    }
}
