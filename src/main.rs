//! clip_capture: グローバルホットキーで選択テキストを取り込み、取り込み API へ送るデーモン。
//! `listen`（既定）/ `once` / `check` の各コマンドを提供します。
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;

use clip_capture::application::{
    CaptureEngine, CaptureReport, CaptureService, CaptureTimings, Dispatcher,
};
use clip_capture::cli::{Cli, Cmd};
use clip_capture::domain::AttemptOutcome;
use clip_capture::error::{CaptureError, Result};
use clip_capture::infrastructure::clipboard::{ClipboardBackend, select_backend};
use clip_capture::infrastructure::external::HttpIngestClient;
use clip_capture::infrastructure::external::accessibility_sys::{
    accessibility_status, warn_if_untrusted,
};
use clip_capture::infrastructure::external::default_strategies;
use clip_capture::shortcut::{HotkeyEvent, HotkeyService};
use clip_capture::utils::config::EnvConfig;
use clip_capture::utils::env::load_env;
use clip_capture::utils::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "clip_capture exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = EnvConfig::from_env()?;
    cli.apply_overrides(&mut config)?;

    match cli.command() {
        Cmd::Listen => listen(config).await,
        Cmd::Once { delay_ms, no_send } => once(config, delay_ms, no_send).await,
        Cmd::Check => check(config).await,
    }
}

// ────────────────────────────────────────────────────────────

fn build_engine(config: &EnvConfig) -> Result<Arc<CaptureEngine>> {
    let backend: Arc<dyn ClipboardBackend> = Arc::from(select_backend(config)?);
    let engine = CaptureEngine::new(backend, default_strategies())
        .with_poll_interval(config.poll_interval)
        .with_frontmost_app_logging(true);
    Ok(Arc::new(engine))
}

fn build_dispatcher(config: &EnvConfig) -> Result<Arc<Dispatcher>> {
    let client = HttpIngestClient::new(config)?;
    Ok(Arc::new(
        Dispatcher::new(Arc::new(client)).with_max_text_bytes(config.max_text_bytes),
    ))
}

fn timings(config: &EnvConfig) -> CaptureTimings {
    CaptureTimings {
        settle_delay: config.settle_delay,
        attempt_timeout: config.attempt_timeout,
    }
}

// ────────────────────────────────────────────────────────────

async fn listen(config: EnvConfig) -> Result<()> {
    let combo = config.hotkey_combo()?;
    warn_if_untrusted();

    let service = Arc::new(CaptureService::new(
        build_engine(&config)?,
        build_dispatcher(&config)?,
        timings(&config),
    ));
    let _worker = service.spawn_worker()?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut hotkeys = HotkeyService::new();
    hotkeys.start(combo.clone(), config.release_settle, tx)?;
    tracing::info!(hotkey = %combo, ingest_url = %config.ingest_url(), "clip_capture is running");

    let result = tokio::select! {
        _ = async {
            while let Some(event) = rx.recv().await {
                match event {
                    HotkeyEvent::Triggered => {
                        service.trigger();
                    }
                }
            }
        } => Ok(()),
        exit = hotkeys.wait_for_exit() => match exit {
            Err(e) => Err(e),
            Ok(()) => Err(CaptureError::HotkeyListenerFailed(
                "key listener stopped unexpectedly".to_string(),
            )),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    };

    hotkeys.stop().await?;
    result
}

async fn once(config: EnvConfig, delay_ms: u64, no_send: bool) -> Result<()> {
    let engine = build_engine(&config)?;
    println!(
        "Capturing in {delay_ms} ms using `{}` backend; focus the target application and select text.",
        engine.backend().name()
    );
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let timings = timings(&config);
    let capture_engine = engine.clone();
    let report = tokio::task::spawn_blocking(move || {
        capture_engine.capture_with_report(timings.settle_delay, timings.attempt_timeout)
    })
    .await
    .map_err(|e| CaptureError::SystemError(format!("capture task failed: {e}")))?;

    print_report(&report);

    if !no_send {
        let outcome = build_dispatcher(&config)?.send(&report.result).await;
        println!("dispatch:  {outcome:?}");
    }
    Ok(())
}

fn print_report(report: &CaptureReport) {
    println!("attempts:");
    for attempt in &report.attempts {
        let outcome = match &attempt.outcome {
            AttemptOutcome::Changed => "changed".to_string(),
            AttemptOutcome::Unchanged => "unchanged".to_string(),
            AttemptOutcome::Errored(reason) => format!("errored: {reason}"),
        };
        println!(
            "  {:<20} {:>5} ms  {outcome}",
            attempt.strategy,
            attempt.elapsed.as_millis()
        );
    }
    println!(
        "snapshot:  {}",
        if report.snapshot_taken { "taken" } else { "failed" }
    );
    println!(
        "restore:   {}",
        if report.restored { "ok" } else { "failed" }
    );
    println!(
        "result:    changed={} ({} ms)",
        report.result.changed,
        report.elapsed.as_millis()
    );
    if report.result.changed {
        println!("text:\n{}", report.result.text);
    }
}

async fn check(config: EnvConfig) -> Result<()> {
    println!("hotkey:        {}", config.hotkey_combo()?);

    let backend = select_backend(&config)?;
    println!(
        "clipboard:     {} ({})",
        backend.name(),
        if backend.is_full_fidelity() {
            "full fidelity"
        } else {
            "text only"
        }
    );
    println!("accessibility: {}", accessibility_status().as_str());

    let client = HttpIngestClient::new(&config)?;
    match client.health_check().await {
        Ok(status) => {
            println!("ingestion:     {} -> HTTP {status}", config.health_url());
            Ok(())
        }
        Err(e) => {
            println!("ingestion:     {} unreachable ({e})", config.health_url());
            Err(e)
        }
    }
}
