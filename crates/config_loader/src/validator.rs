//! 配置校验模块
//!
//! 校验规则：
//! - line_delay_s 有限，zoom > 0
//! - 0 < decay <= 1
//! - tick_hz > 0，history_capacity >= 2
//! - 输入源频率 > 0，图像尺寸非零
//! - sink 名称非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, SinkType, StabilizerBlueprint};

/// 校验 StabilizerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    validate_camera(blueprint)?;
    validate_filter(blueprint)?;
    validate_scheduler(blueprint)?;
    validate_sources(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be > 0, got {value}"),
        ))
    }
}

/// 校验相机配置
fn validate_camera(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    let camera = &blueprint.camera;

    if !camera.line_delay_s.is_finite() {
        return Err(ContractError::config_validation(
            "camera.line_delay_s",
            format!("must be finite, got {}", camera.line_delay_s),
        ));
    }
    positive("camera.zoom", camera.zoom)?;

    if camera.max_queued_frames == 0 {
        return Err(ContractError::config_validation(
            "camera.max_queued_frames",
            "must be at least 1",
        ));
    }
    Ok(())
}

/// 校验滤波器衰减系数
fn validate_filter(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    let decay = blueprint.filter.decay;
    if !(decay > 0.0 && decay <= 1.0) {
        return Err(ContractError::config_validation(
            "filter.decay",
            format!("must be in (0, 1], got {decay}"),
        ));
    }
    Ok(())
}

/// 校验调度配置
fn validate_scheduler(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    let scheduler = &blueprint.scheduler;

    positive("scheduler.tick_hz", scheduler.tick_hz)?;

    // 插值至少需要两个样本
    if scheduler.history_capacity < 2 {
        return Err(ContractError::config_validation(
            "scheduler.history_capacity",
            format!("must be >= 2, got {}", scheduler.history_capacity),
        ));
    }

    if scheduler.publish_statistics && scheduler.statistics_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "scheduler.statistics_interval_ms",
            "must be > 0 when publish_statistics is enabled",
        ));
    }
    Ok(())
}

/// 校验输入源
fn validate_sources(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    let sources = &blueprint.sources;

    if sources.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "sources.channel_capacity",
            "must be at least 1",
        ));
    }

    let imu = &sources.imu;
    let camera = &sources.camera;

    if imu.id.is_empty() || camera.id.is_empty() {
        return Err(ContractError::config_validation(
            "sources.*.id",
            "source id cannot be empty",
        ));
    }
    if imu.id == camera.id {
        return Err(ContractError::config_validation(
            "sources.camera.id",
            format!("duplicate source_id '{}'", camera.id),
        ));
    }

    positive("sources.imu.frequency_hz", imu.frequency_hz)?;
    positive("sources.camera.frequency_hz", camera.frequency_hz)?;

    if !(imu.pan_rate_rad_s.is_finite()
        && imu.shake_amplitude_rad_s.is_finite()
        && imu.shake_frequency_hz.is_finite())
    {
        return Err(ContractError::config_validation(
            "sources.imu",
            "motion parameters must be finite",
        ));
    }

    if camera.width == 0 || camera.height == 0 {
        return Err(ContractError::config_validation(
            "sources.camera.width / sources.camera.height",
            format!("image size {}x{} is empty", camera.width, camera.height),
        ));
    }
    if let Some(fx) = camera.fx {
        positive("sources.camera.fx", fx)?;
    }
    if let Some(fy) = camera.fy {
        positive("sources.camera.fy", fy)?;
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &StabilizerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "must be at least 1",
            ));
        }
        if sink.sink_type == SinkType::File
            && sink.params.get("base_path").is_some_and(|p| p.is_empty())
        {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.base_path", sink.name),
                "base_path cannot be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CameraSettings, ConfigVersion, FilterSettings, KernelSettings, SchedulerSettings,
        SinkConfig, SourcesConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> StabilizerBlueprint {
        StabilizerBlueprint {
            version: ConfigVersion::V1,
            camera: CameraSettings {
                line_delay_s: 3e-5,
                zoom: 1.0,
                max_queued_frames: 8,
            },
            filter: FilterSettings::default(),
            scheduler: SchedulerSettings::default(),
            kernel: KernelSettings::default(),
            sources: SourcesConfig::default(),
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: Default::default(),
            }],
        }
    }

    fn error_text(bp: &StabilizerBlueprint) -> String {
        validate(bp).unwrap_err().to_string()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_negative_line_delay_is_valid() {
        let mut bp = minimal_blueprint();
        bp.camera.line_delay_s = -3e-5;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_non_finite_line_delay() {
        let mut bp = minimal_blueprint();
        bp.camera.line_delay_s = f64::NAN;
        let err = error_text(&bp);
        assert!(err.contains("camera.line_delay_s"), "got: {err}");
    }

    #[test]
    fn test_invalid_zoom() {
        let mut bp = minimal_blueprint();
        bp.camera.zoom = 0.0;
        let err = error_text(&bp);
        assert!(err.contains("camera.zoom"), "got: {err}");
    }

    #[test]
    fn test_decay_range() {
        let mut bp = minimal_blueprint();
        bp.filter.decay = 1.0;
        assert!(validate(&bp).is_ok());

        bp.filter.decay = 1.01;
        let err = error_text(&bp);
        assert!(err.contains("(0, 1]"), "got: {err}");

        bp.filter.decay = 0.0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_history_capacity_too_small() {
        let mut bp = minimal_blueprint();
        bp.scheduler.history_capacity = 1;
        let err = error_text(&bp);
        assert!(err.contains("history_capacity"), "got: {err}");
    }

    #[test]
    fn test_statistics_interval_required() {
        let mut bp = minimal_blueprint();
        bp.scheduler.publish_statistics = true;
        bp.scheduler.statistics_interval_ms = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_invalid_source_frequency() {
        let mut bp = minimal_blueprint();
        bp.sources.imu.frequency_hz = -5.0;
        let err = error_text(&bp);
        assert!(err.contains("must be > 0"), "got: {err}");
    }

    #[test]
    fn test_duplicate_source_id() {
        let mut bp = minimal_blueprint();
        bp.sources.camera.id = bp.sources.imu.id.clone();
        let err = error_text(&bp);
        assert!(err.contains("duplicate source_id"), "got: {err}");
    }

    #[test]
    fn test_empty_camera_size() {
        let mut bp = minimal_blueprint();
        bp.sources.camera.height = 0;
        let err = error_text(&bp);
        assert!(err.contains("is empty"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        let err = error_text(&bp);
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        let err = error_text(&bp);
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_empty_file_sink_path() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(SinkConfig {
            name: "disk".into(),
            sink_type: SinkType::File,
            queue_capacity: 10,
            params: HashMap::from([("base_path".to_string(), String::new())]),
        });
        let err = error_text(&bp);
        assert!(err.contains("base_path"), "got: {err}");
    }
}
