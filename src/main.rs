use std::sync::Arc;

use emotion_organizer::channels::open_source;
use emotion_organizer::classifier::create_classifier;
use emotion_organizer::config::{AppConfig, ClassifierBackend};
use emotion_organizer::error;
use emotion_organizer::pipeline::{Organizer, PipelineRunner};
use emotion_organizer::report::{JsonFileReporter, LogReporter, SharedReport, report_routes};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export EMO_SOURCE_PATH=./inbox.json   # or a directory of .eml files");
        std::process::exit(1);
    });

    eprintln!("📬 Email Emotion Organizer v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Source: {}", config.source_path.display());
    match config.classifier.backend {
        ClassifierBackend::Lexicon => eprintln!("   Classifier: lexicon"),
        ClassifierBackend::Ollama => eprintln!(
            "   Classifier: ollama ({} @ {})",
            config.classifier.ollama_model, config.classifier.ollama_url
        ),
    }
    eprintln!(
        "   Workers: {}, retries: {}, min confidence: {}",
        config.organizer.worker_count,
        config.organizer.max_retries,
        config.organizer.min_confidence
    );
    if let Some(path) = &config.output_path {
        eprintln!("   Report file: {}", path.display());
    }

    // ── Pipeline ─────────────────────────────────────────────────────────
    let shared = SharedReport::new();
    let runner = build_runner(&config, &shared)?;

    // Ctrl-C stops dispatch; in-flight messages still settle
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, cancelling");
                cancel.cancel();
            }
        });
    }

    // ── HTTP ─────────────────────────────────────────────────────────────
    let server = match config.http_port {
        Some(port) => {
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            eprintln!("   Report API: http://0.0.0.0:{}/api/report", port);
            let app = report_routes(shared.clone());
            let shutdown = cancel.clone();
            Some(tokio::spawn(async move {
                tracing::info!(port, "Report server started");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
            }))
        }
        None => None,
    };
    eprintln!();

    let report = runner.run_until(&cancel).await?;

    eprintln!(
        "\nOrganized {} messages ({} failed, {} skipped){}",
        report.total_messages,
        report.failures.len(),
        report.skipped.len(),
        if report.cancelled { " [cancelled]" } else { "" }
    );
    for (bucket, ids) in report.buckets.buckets() {
        eprintln!("   {:<13} {}", bucket, ids.len());
    }
    if report.buckets.is_empty() {
        eprintln!("   (no messages)");
    }

    if let Some(server) = server {
        if !cancel.is_cancelled() {
            eprintln!("\nServing the report until Ctrl-C.");
        }
        server.await??;
    }

    Ok(())
}

/// Wire source, classifier, and reporters from config.
fn build_runner(config: &AppConfig, shared: &SharedReport) -> error::Result<PipelineRunner> {
    let source = open_source(&config.source_path)?;
    let classifier = create_classifier(&config.classifier)?;
    let organizer = Organizer::new(classifier, &config.organizer)?;

    let mut runner = PipelineRunner::new(source, organizer)
        .with_reporter(Arc::new(LogReporter))
        .with_reporter(Arc::new(shared.clone()));
    if let Some(path) = &config.output_path {
        runner = runner.with_reporter(Arc::new(JsonFileReporter::new(path)));
    }
    Ok(runner)
}
