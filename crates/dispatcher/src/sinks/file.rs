//! FileSink - writes stabilized frames and orientation events to disk
//!
//! Layout under `base_path`:
//! - `frames/{frame_id}.png`
//! - `meta/{frame_id}.json`
//! - `orientation.csv`

use contracts::{
    ContractError, DataSink, ImageData, ImageFormat, OrientationUpdate, StabilizedFrame,
};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;

const ORIENTATION_HEADER: &str =
    "timestamp,raw_w,raw_x,raw_y,raw_z,filtered_w,filtered_x,filtered_y,filtered_z";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,

    /// Write PNG images (metadata is always written)
    pub save_images: bool,
}

impl FileSinkConfig {
    /// Read `base_path` and `save_images` from the sink's params table
    pub fn from_params(sink: &str, params: &HashMap<String, String>) -> Result<Self, DispatcherError> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let save_images = match params.get("save_images") {
            None => true,
            Some(value) => value
                .parse::<bool>()
                .map_err(|_| DispatcherError::InvalidParam {
                    sink: sink.to_string(),
                    key: "save_images",
                    value: value.clone(),
                })?,
        };

        Ok(Self {
            base_path,
            save_images,
        })
    }
}

/// Sink that writes outputs to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    frames_dir: PathBuf,
    meta_dir: PathBuf,
    orientation: BufWriter<File>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        let frames_dir = config.base_path.join("frames");
        let meta_dir = config.base_path.join("meta");
        fs::create_dir_all(&frames_dir)?;
        fs::create_dir_all(&meta_dir)?;

        let mut orientation = BufWriter::new(File::create(
            config.base_path.join("orientation.csv"),
        )?);
        writeln!(orientation, "{ORIENTATION_HEADER}")?;

        Ok(Self {
            name: name.into(),
            config,
            frames_dir,
            meta_dir,
            orientation,
        })
    }

    /// Build from a `[[sinks]]` params table, creating the output layout
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)?;
        let path = config.base_path.clone();
        Self::new(name.clone(), config).map_err(|source| DispatcherError::OutputDir {
            sink: name,
            path,
            source,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn write_frame_to_disk(&self, frame: &StabilizedFrame) -> std::io::Result<()> {
        let frame_id = frame.frame_id;

        let meta_path = self.meta_dir.join(format!("{}.json", frame_id));
        let meta_file = File::create(meta_path)?;
        serde_json::to_writer_pretty(meta_file, &frame.meta)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if self.config.save_images {
            let path = self.frames_dir.join(format!("{}.png", frame_id));
            save_image(path, &frame.image)?;
        }
        Ok(())
    }

    fn persist_frame(&self, frame: &StabilizedFrame) -> Result<(), ContractError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, frame_id = frame.frame_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    fn append_orientation(&mut self, update: &OrientationUpdate) -> std::io::Result<()> {
        let r = &update.raw.orientation;
        let f = &update.filtered.orientation;
        writeln!(
            self.orientation,
            "{},{},{},{},{},{},{},{},{}",
            update.raw.timestamp, r.w, r.x, r.y, r.z, f.w, f.x, f.y, f.z
        )
    }
}

fn save_image(path: PathBuf, image: &ImageData) -> std::io::Result<()> {
    let save = |data: &[u8], color: image::ColorType| {
        image::save_buffer(&path, data, image.width, image.height, color)
            .map_err(std::io::Error::other)
    };

    match image.format {
        ImageFormat::Gray8 => save(&image.data, image::ColorType::L8),
        ImageFormat::Rgb8 => save(&image.data, image::ColorType::Rgb8),
        ImageFormat::Rgba8 => save(&image.data, image::ColorType::Rgba8),
        ImageFormat::Bgra8 => {
            // Convert BGRA to RGBA
            let mut rgba_data = image.data.to_vec();
            for chunk in rgba_data.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }
            save(&rgba_data, image::ColorType::Rgba8)
        }
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    async fn write(&mut self, frame: &StabilizedFrame) -> Result<(), ContractError> {
        self.persist_frame(frame)
    }

    async fn write_orientation(
        &mut self,
        update: &OrientationUpdate,
    ) -> Result<(), ContractError> {
        self.append_orientation(update)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.orientation
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.orientation
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, path = %self.config.base_path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::{frame, orientation};
    use contracts::StabilizerOutput;
    use tempfile::tempdir;

    fn config(dir: &Path) -> FileSinkConfig {
        FileSinkConfig {
            base_path: dir.to_path_buf(),
            save_images: true,
        }
    }

    #[tokio::test]
    async fn test_file_sink_write_frame() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("test_file", config(dir.path())).unwrap();

        let StabilizerOutput::Frame(f) = frame(7) else {
            unreachable!()
        };
        sink.write(&f).await.unwrap();
        sink.flush().await.unwrap();

        assert!(dir.path().join("frames/7.png").exists());
        let meta = fs::read_to_string(dir.path().join("meta/7.json")).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["rows"], 2);
        assert_eq!(meta["kernel"], "cpu");
    }

    #[tokio::test]
    async fn test_file_sink_orientation_csv() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("test_file", config(dir.path())).unwrap();

        for t in [0.1, 0.2] {
            let StabilizerOutput::Orientation(o) = orientation(t) else {
                unreachable!()
            };
            sink.write_orientation(&o).await.unwrap();
        }
        sink.close().await.unwrap();

        let csv = fs::read_to_string(dir.path().join("orientation.csv")).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ORIENTATION_HEADER);
        assert_eq!(lines[1], "0.1,1,0,0,0,1,0,0,0");
    }

    #[test]
    fn test_config_from_params() {
        let params = HashMap::from([
            ("base_path".to_string(), "/tmp/out".to_string()),
            ("save_images".to_string(), "false".to_string()),
        ]);
        let config = FileSinkConfig::from_params("disk", &params).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/tmp/out"));
        assert!(!config.save_images);

        let config = FileSinkConfig::from_params("disk", &HashMap::new()).unwrap();
        assert_eq!(config.base_path, PathBuf::from("./output"));
        assert!(config.save_images);
    }

    #[test]
    fn test_bad_save_images_value_rejected() {
        let params = HashMap::from([("save_images".to_string(), "maybe".to_string())]);
        let err = FileSinkConfig::from_params("disk", &params).unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::InvalidParam { key: "save_images", .. }
        ));
        assert!(err.to_string().contains("\"maybe\""));
    }

    #[test]
    fn test_unwritable_base_path_reports_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let params = HashMap::from([(
            "base_path".to_string(),
            blocker.display().to_string(),
        )]);
        let Err(err) = FileSink::from_params("disk", &params) else {
            panic!("expected output dir error");
        };
        match err {
            DispatcherError::OutputDir { sink, path, .. } => {
                assert_eq!(sink, "disk");
                assert_eq!(path, blocker);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_bgra_image() {
        let dir = tempdir().unwrap();
        let image = ImageData {
            width: 1,
            height: 1,
            format: ImageFormat::Bgra8,
            data: bytes::Bytes::from_static(&[10, 20, 30, 255]),
        };
        let path = dir.path().join("px.png");
        save_image(path.clone(), &image).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 20, 10, 255]);
    }
}
