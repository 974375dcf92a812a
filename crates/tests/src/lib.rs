//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 稳像器 -> kernel -> sink 的完整链路
//! - 模拟源实时驱动测试
//! - 时钟跳变与过期帧处理

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::StabilizerConfig::default();
    }
}

/// Deterministic offline driver shared by the e2e tests
#[cfg(test)]
mod sim {
    use contracts::{CameraFrame, StabilizerBlueprint, StabilizerOutput};
    use ingestion::{synthetic_image, MockImuSource};
    use stabilizer::Stabilizer;

    pub const CONFIG: &str = r#"
        [camera]
        line_delay_s = 0.0001
        zoom = 0.95

        [filter]
        decay = 0.99

        [scheduler]
        tick_hz = 100.0

        [kernel]
        kind = "cpu"

        [sources.imu]
        frequency_hz = 1000.0
        shake_amplitude_rad_s = 0.5
        shake_frequency_hz = 4.0

        [sources.camera]
        frequency_hz = 30.0
        width = 32
        height = 16
    "#;

    /// First camera frame lands after the first integrated gyro sample
    pub const FRAME_OFFSET: f64 = 0.01;

    pub fn blueprint() -> StabilizerBlueprint {
        config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    pub fn camera_frame(blueprint: &StabilizerBlueprint, timestamp: f64, seq: u64) -> CameraFrame {
        let camera = &blueprint.sources.camera;
        CameraFrame {
            timestamp,
            seq: Some(seq),
            image: synthetic_image(camera.width, camera.height, seq),
            calibration: camera.calibration(),
        }
    }

    /// Replays `duration` seconds of mock gyro and camera data tick by tick
    pub fn run(
        blueprint: &StabilizerBlueprint,
        duration: f64,
    ) -> (Stabilizer, Vec<StabilizerOutput>) {
        let mut stabilizer = Stabilizer::new(blueprint.to_stabilizer_config());
        let mut kernel = dewarp::create_kernel(blueprint.kernel.kind);
        let mut outputs = Vec::new();

        let imu = &blueprint.sources.imu;
        let imu_period = 1.0 / imu.frequency_hz;
        let frame_period = 1.0 / blueprint.sources.camera.frequency_hz;
        let tick_period = blueprint.tick_period_secs();

        let mut imu_seq = 0u64;
        let mut frame_seq = 0u64;
        let mut now = 0.0;
        while now <= duration {
            while imu_seq as f64 * imu_period <= now {
                let sample = MockImuSource::sample_at(imu, imu_seq as f64 * imu_period, imu_seq);
                if let Some(update) = stabilizer.on_imu(&sample) {
                    outputs.push(StabilizerOutput::Orientation(update));
                }
                imu_seq += 1;
            }
            while FRAME_OFFSET + frame_seq as f64 * frame_period <= now {
                let timestamp = FRAME_OFFSET + frame_seq as f64 * frame_period;
                let frame = camera_frame(blueprint, timestamp, frame_seq);
                stabilizer.on_frame(frame).unwrap();
                frame_seq += 1;
            }

            let report = stabilizer.tick(kernel.as_mut());
            outputs.extend(report.stabilized.into_iter().map(StabilizerOutput::Frame));
            now += tick_period;
        }

        (stabilizer, outputs)
    }

    pub fn frames(outputs: &[StabilizerOutput]) -> Vec<&contracts::StabilizedFrame> {
        outputs
            .iter()
            .filter_map(|output| match output {
                StabilizerOutput::Frame(frame) => Some(frame),
                StabilizerOutput::Orientation(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{KernelKind, SinkConfig, SinkType, StabilizerOutput};
    use dispatcher::create_dispatcher;
    use ingestion::{synthetic_image, IngestionPipeline, InboundEvent};
    use stabilizer::Stabilizer;
    use tokio::sync::mpsc;

    use crate::sim;

    /// Config -> Stabilizer -> CPU kernel, one second of replayed data
    #[test]
    fn test_offline_replay_stabilizes_frames() {
        let blueprint = sim::blueprint();
        let (stabilizer, outputs) = sim::run(&blueprint, 1.0);
        let frames = sim::frames(&outputs);

        // 30 frames fall inside the first second; the newest one may still wait
        assert!(frames.len() >= 29, "only {} frames stabilized", frames.len());
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.frame_id, i as u64);
            assert_eq!(frame.image.width, 32);
            assert_eq!(frame.image.height, 16);
            assert_eq!(frame.meta.rows, 16);
            assert_eq!(frame.meta.kernel, "cpu");
            assert!((frame.meta.frame_end - frame.meta.frame_begin - 0.0015).abs() < 1e-9);
        }
        assert!(frames.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        // Shake makes raw and filtered orientation diverge
        assert!(frames.iter().any(|f| f.meta.correction_angle > 1e-4));

        // The first sample only seeds the tracker
        let updates = outputs.len() - frames.len();
        assert!(updates >= 990);

        let buffers = stabilizer.buffer_stats();
        assert_eq!(buffers.imu_resets, 0);
        assert_eq!(buffers.frames_dropped, 0);
        // history is trimmed up to the last stabilized frame
        assert!(buffers.raw_history_len < 100);
    }

    #[test]
    fn test_passthrough_kernel_keeps_source_image() {
        let mut blueprint = sim::blueprint();
        blueprint.kernel.kind = KernelKind::Passthrough;

        let (_, outputs) = sim::run(&blueprint, 0.2);
        let frames = sim::frames(&outputs);
        assert!(!frames.is_empty());

        let first = frames[0];
        assert_eq!(first.timestamp, sim::FRAME_OFFSET);
        assert_eq!(first.meta.kernel, "passthrough");
        assert_eq!(first.image.data, synthetic_image(32, 16, 0).data);
    }

    #[test]
    fn test_clock_jump_and_stale_frames() {
        let blueprint = sim::blueprint();
        let imu = &blueprint.sources.imu;
        let mut stabilizer = Stabilizer::new(blueprint.to_stabilizer_config());
        let mut kernel = dewarp::create_kernel(blueprint.kernel.kind);

        for i in 0..=200u64 {
            let t = 0.1 + i as f64 * 0.001;
            stabilizer.on_imu(&ingestion::MockImuSource::sample_at(imu, t, i));
        }

        // Readout starts before the oldest orientation
        stabilizer
            .on_frame(sim::camera_frame(&blueprint, 0.05, 0))
            .unwrap();
        let report = stabilizer.tick(kernel.as_mut());
        assert_eq!(report.stats.frames_discarded, 1);
        assert!(report.stabilized.is_empty());

        // Gyro clock restarts from zero
        assert!(stabilizer
            .on_imu(&ingestion::MockImuSource::sample_at(imu, 0.0, 0))
            .is_none());
        let buffers = stabilizer.buffer_stats();
        assert_eq!(buffers.imu_resets, 1);
        assert_eq!(buffers.raw_history_len, 0);
        assert_eq!(buffers.filtered_history_len, 0);

        for i in 1..=100u64 {
            let t = i as f64 * 0.001;
            assert!(stabilizer
                .on_imu(&ingestion::MockImuSource::sample_at(imu, t, i))
                .is_some());
        }

        stabilizer
            .on_frame(sim::camera_frame(&blueprint, 0.06, 1))
            .unwrap();
        let report = stabilizer.tick(kernel.as_mut());
        assert_eq!(report.stats.frames_discarded, 0);
        assert_eq!(report.stabilized.len(), 1);
        assert_eq!(report.stabilized[0].frame_id, 0);
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let blueprint = sim::blueprint();
        let mut stabilizer = Stabilizer::new(blueprint.to_stabilizer_config());
        stabilizer
            .on_frame(sim::camera_frame(&blueprint, 0.0, 0))
            .unwrap();

        // Geometry is fixed by the first calibration
        let mut frame = sim::camera_frame(&blueprint, 0.1, 1);
        frame.image = synthetic_image(16, 16, 1);
        frame.calibration.width = 16;
        assert!(stabilizer.on_frame(frame).is_err());
        assert_eq!(stabilizer.pending_frames(), 1);
    }

    /// Replayed outputs -> Dispatcher -> FileSink
    #[tokio::test]
    async fn test_outputs_reach_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = sim::blueprint();
        let (_, outputs) = sim::run(&blueprint, 0.3);
        let frame_count = sim::frames(&outputs).len();
        let update_count = outputs.len() - frame_count;
        assert!(frame_count > 0);

        let mut params = HashMap::new();
        params.insert(
            "base_path".to_string(),
            dir.path().to_string_lossy().to_string(),
        );
        let sink_configs = vec![
            SinkConfig {
                name: "disk".to_string(),
                sink_type: SinkType::File,
                queue_capacity: outputs.len() + 1,
                params,
            },
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: outputs.len() + 1,
                params: HashMap::new(),
            },
        ];

        let (tx, rx) = mpsc::channel::<StabilizerOutput>(outputs.len() + 1);
        let dispatcher = create_dispatcher(sink_configs, rx).await.unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);
        let handle = dispatcher.spawn();

        for output in outputs {
            tx.send(output).await.unwrap();
        }
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("dispatcher did not drain")
            .unwrap();

        for id in 0..frame_count {
            assert!(dir.path().join(format!("frames/{id}.png")).exists());
            assert!(dir.path().join(format!("meta/{id}.json")).exists());
        }

        let csv = std::fs::read_to_string(dir.path().join("orientation.csv")).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("timestamp,raw_w"));
        assert_eq!(lines.count(), update_count);

        let meta: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("meta/0.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta["kernel"], "cpu");
        assert_eq!(meta["rows"], 16);
    }

    /// Live mock sources -> ingestion channel -> Stabilizer
    #[tokio::test]
    async fn test_live_mock_sources() {
        let mut blueprint = sim::blueprint();
        blueprint.sources.imu.frequency_hz = 500.0;
        blueprint.sources.camera.frequency_hz = 50.0;

        let mut ingestion =
            IngestionPipeline::with_mock_sources(&blueprint.sources, std::time::Instant::now())
                .unwrap();
        let rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut stabilizer = Stabilizer::new(blueprint.to_stabilizer_config());
        let mut kernel = dewarp::create_kernel(blueprint.kernel.kind);
        let target = 3;

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            let mut stabilized = 0;
            let mut updates = 0;
            while stabilized < target {
                match rx.recv().await {
                    Ok(InboundEvent::Imu(sample)) => {
                        updates += stabilizer.on_imu(&sample).is_some() as usize;
                    }
                    Ok(InboundEvent::Frame(frame)) => {
                        stabilizer.on_frame(frame).unwrap();
                    }
                    Err(_) => break,
                }
                stabilized += stabilizer.tick(kernel.as_mut()).stabilized.len();
            }
            (stabilized, updates)
        })
        .await;

        ingestion.stop_all();
        let snapshot = ingestion.metrics().snapshot();

        let (stabilized, updates) = result.expect("pipeline timed out");
        assert!(stabilized >= target);
        assert!(updates > 0);
        assert!(snapshot.imu_received > 0);
        assert!(snapshot.frames_received >= target as u64);
    }
}
