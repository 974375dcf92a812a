//! # Ingestion Pipeline
//!
//! Inbound stream ingestion.
//!
//! Responsibilities:
//! - Register gyro and camera sources (mock or transport-backed)
//! - Merge them into one arrival-ordered `InboundEvent` stream
//! - Backpressure management and drop policy
//! - Send to the scheduler via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::time::Instant;
//! use ingestion::IngestionPipeline;
//!
//! let mut pipeline = IngestionPipeline::with_mock_sources(&blueprint.sources, Instant::now())?;
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//!
//! while let Ok(event) = rx.try_recv() {
//!     // hand to the stabilizer
//! }
//! ```

mod adapter;
mod adapters;
mod config;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;

// Re-exports
pub use adapter::SourceAdapter;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::InboundEvent;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericSourceAdapter;
pub use mock::{angular_velocity, synthetic_image, MockCameraSource, MockImuSource};
pub use pipeline::IngestionPipeline;
