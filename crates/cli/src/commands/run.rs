//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::load_blueprint;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides, then re-check the result
    if let Some(line_delay) = args.line_delay {
        info!(line_delay, "Overriding camera line delay from CLI");
        blueprint.camera.line_delay_s = line_delay;
    }
    if let Some(kernel) = args.kernel {
        info!(kernel = ?kernel, "Overriding warp kernel from CLI");
        blueprint.kernel.kind = kernel.into();
    }
    config_loader::validate(&blueprint).context("Invalid CLI override")?;

    info!(
        line_delay = blueprint.camera.line_delay_s,
        zoom = blueprint.camera.zoom,
        decay = blueprint.filter.decay,
        tick_hz = blueprint.scheduler.tick_hz,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_stabilized = stats.frames_stabilized,
        frames_discarded = stats.frames_discarded,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Virtual Gimbal finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::StabilizerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Camera:");
    println!("  Line delay: {} s", blueprint.camera.line_delay_s);
    println!("  Zoom: {}", blueprint.camera.zoom);
    println!("  Max queued frames: {}", blueprint.camera.max_queued_frames);

    println!("\nFilter:");
    println!("  Decay: {}", blueprint.filter.decay);

    println!("\nScheduler:");
    println!("  Tick rate: {} Hz", blueprint.scheduler.tick_hz);
    println!("  History capacity: {}", blueprint.scheduler.history_capacity);
    println!("  Kernel: {:?}", blueprint.kernel.kind);

    let sources = &blueprint.sources;
    println!("\nSources:");
    println!("  {} (gyro, {} Hz)", sources.imu.id, sources.imu.frequency_hz);
    println!(
        "  {} (camera, {} Hz, {}x{})",
        sources.camera.id, sources.camera.frequency_hz, sources.camera.width, sources.camera.height
    );

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
