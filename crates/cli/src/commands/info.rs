//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::StabilizerBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    camera: CameraInfo,
    filter: FilterInfo,
    scheduler: SchedulerInfo,
    kernel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<SourcesInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct CameraInfo {
    line_delay_s: f64,
    readout_direction: &'static str,
    zoom: f64,
    max_queued_frames: usize,
}

#[derive(Serialize)]
struct FilterInfo {
    decay: f64,
}

#[derive(Serialize)]
struct SchedulerInfo {
    tick_hz: f64,
    history_capacity: usize,
    publish_statistics: bool,
    statistics_interval_ms: u64,
}

#[derive(Serialize)]
struct SourcesInfo {
    channel_capacity: usize,
    drop_policy: String,
    imu: ImuInfo,
    camera: CameraSourceInfo,
}

#[derive(Serialize)]
struct ImuInfo {
    id: String,
    frequency_hz: f64,
    pan_rate_rad_s: f64,
    shake_amplitude_rad_s: f64,
    shake_frequency_hz: f64,
    latency_ms: u64,
}

#[derive(Serialize)]
struct CameraSourceInfo {
    id: String,
    frequency_hz: f64,
    width: u32,
    height: u32,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn readout_direction(line_delay: f64) -> &'static str {
    if line_delay > 0.0 {
        "top-to-bottom"
    } else if line_delay < 0.0 {
        "bottom-to-top"
    } else {
        "global"
    }
}

fn build_config_info(blueprint: &StabilizerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sources = args.sources.then(|| {
        let s = &blueprint.sources;
        let calibration = s.camera.calibration();
        SourcesInfo {
            channel_capacity: s.channel_capacity,
            drop_policy: format!("{:?}", s.drop_policy),
            imu: ImuInfo {
                id: s.imu.id.clone(),
                frequency_hz: s.imu.frequency_hz,
                pan_rate_rad_s: s.imu.pan_rate_rad_s,
                shake_amplitude_rad_s: s.imu.shake_amplitude_rad_s,
                shake_frequency_hz: s.imu.shake_frequency_hz,
                latency_ms: s.imu.latency_ms,
            },
            camera: CameraSourceInfo {
                id: s.camera.id.clone(),
                frequency_hz: s.camera.frequency_hz,
                width: calibration.width,
                height: calibration.height,
                fx: calibration.intrinsics.fx,
                fy: calibration.intrinsics.fy,
                cx: calibration.intrinsics.cx,
                cy: calibration.intrinsics.cy,
            },
        }
    });

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        camera: CameraInfo {
            line_delay_s: blueprint.camera.line_delay_s,
            readout_direction: readout_direction(blueprint.camera.line_delay_s),
            zoom: blueprint.camera.zoom,
            max_queued_frames: blueprint.camera.max_queued_frames,
        },
        filter: FilterInfo {
            decay: blueprint.filter.decay,
        },
        scheduler: SchedulerInfo {
            tick_hz: blueprint.scheduler.tick_hz,
            history_capacity: blueprint.scheduler.history_capacity,
            publish_statistics: blueprint.scheduler.publish_statistics,
            statistics_interval_ms: blueprint.scheduler.statistics_interval_ms,
        },
        kernel: format!("{:?}", blueprint.kernel.kind),
        sources,
        sinks,
    }
}

fn print_config_info(blueprint: &StabilizerBlueprint, args: &InfoArgs) {
    println!("=== Virtual Gimbal Configuration ===\n");

    let camera = &blueprint.camera;
    println!("Camera");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Line delay: {} s ({})",
        camera.line_delay_s,
        readout_direction(camera.line_delay_s)
    );
    println!("   ├─ Zoom: {}", camera.zoom);
    println!("   └─ Max queued frames: {}", camera.max_queued_frames);

    println!("\nFilter");
    println!("   └─ Decay: {}", blueprint.filter.decay);

    let scheduler = &blueprint.scheduler;
    println!("\nScheduler");
    println!("   ├─ Tick rate: {} Hz", scheduler.tick_hz);
    println!("   ├─ History capacity: {}", scheduler.history_capacity);
    if scheduler.publish_statistics {
        println!(
            "   ├─ Statistics: every {} ms",
            scheduler.statistics_interval_ms
        );
    } else {
        println!("   ├─ Statistics: disabled");
    }
    println!("   └─ Kernel: {:?}", blueprint.kernel.kind);

    let sources = &blueprint.sources;
    if args.sources {
        let calibration = sources.camera.calibration();
        println!("\nSources");
        println!(
            "   ├─ Channel: {} events ({:?})",
            sources.channel_capacity, sources.drop_policy
        );
        println!(
            "   ├─ {} (gyro, {} Hz, latency {} ms)",
            sources.imu.id, sources.imu.frequency_hz, sources.imu.latency_ms
        );
        println!(
            "   │     pan {} rad/s, shake {} rad/s @ {} Hz",
            sources.imu.pan_rate_rad_s,
            sources.imu.shake_amplitude_rad_s,
            sources.imu.shake_frequency_hz
        );
        println!(
            "   └─ {} (camera, {} Hz, {}x{})",
            sources.camera.id, sources.camera.frequency_hz, calibration.width, calibration.height
        );
        println!(
            "         fx={} fy={} cx={} cy={}",
            calibration.intrinsics.fx,
            calibration.intrinsics.fy,
            calibration.intrinsics.cx,
            calibration.intrinsics.cy
        );
    } else {
        println!("\nSources");
        println!("   └─ {} + {}", sources.imu.id, sources.camera.id);
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({})", blueprint.sinks.len());
        if args.sinks {
            for (i, sink) in blueprint.sinks.iter().enumerate() {
                let prefix = if i == blueprint.sinks.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {} ({:?}, queue {})",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity
                );
            }
        }
    }

    println!();
}
