//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_channel::{bounded, Receiver, Sender};
use contracts::{InboundEvent, InboundSource, SourcesConfig};
use tracing::{debug, info, instrument};

use crate::adapter::SourceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::generic_adapter::GenericSourceAdapter;
use crate::mock::{MockCameraSource, MockImuSource};

/// Ingestion Pipeline
///
/// Merges gyro and camera sources into one arrival-ordered event stream.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, Box<dyn SourceAdapter>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Event sender (shared by all adapters)
    tx: Sender<InboundEvent>,

    /// Kept for `DropOldest` eviction even after the receiver is taken
    evict: Receiver<InboundEvent>,

    /// Event receiver
    rx: Option<Receiver<InboundEvent>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            evict: rx.clone(),
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Pipeline with the mock gyro and mock camera from config registered
    ///
    /// Both sources stamp samples against the same `epoch`.
    pub fn with_mock_sources(config: &SourcesConfig, epoch: Instant) -> Result<Self> {
        let mut pipeline = Self::with_config(BackpressureConfig::from(config));
        pipeline.register_source(
            Box::new(MockImuSource::new(config.imu.clone(), epoch)?),
            None,
        )?;
        pipeline.register_source(
            Box::new(MockCameraSource::new(config.camera.clone(), epoch)?),
            None,
        )?;
        Ok(pipeline)
    }

    /// Register inbound source
    ///
    /// # Arguments
    /// * `source` - Data source implementing `InboundSource` trait
    /// * `config` - Optional backpressure configuration
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source_id = %source.source_id(), kind = source.kind().as_str())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn InboundSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        let source_id = source.source_id().to_string();
        if self.adapters.contains_key(&source_id) {
            return Err(IngestionError::DuplicateSource { source_id });
        }

        let adapter = GenericSourceAdapter::new(
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source_id = %source_id, "registered source");
        self.adapters.insert(source_id, Box::new(adapter));
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all source adapters");
        for (source_id, adapter) in &self.adapters {
            self.start_adapter(source_id, adapter.as_ref());
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all source adapters");
        for (source_id, adapter) in &self.adapters {
            self.stop_adapter(source_id, adapter.as_ref());
        }
    }

    /// Start one registered source
    pub fn start_source(&self, source_id: &str) -> Result<()> {
        let adapter = self.adapter(source_id)?;
        self.start_adapter(source_id, adapter);
        Ok(())
    }

    /// Stop one registered source
    pub fn stop_source(&self, source_id: &str) -> Result<()> {
        let adapter = self.adapter(source_id)?;
        self.stop_adapter(source_id, adapter);
        Ok(())
    }

    fn adapter(&self, source_id: &str) -> Result<&dyn SourceAdapter> {
        self.adapters
            .get(source_id)
            .map(|a| a.as_ref())
            .ok_or_else(|| IngestionError::UnknownSource {
                source_id: source_id.to_string(),
            })
    }

    fn start_adapter(&self, source_id: &str, adapter: &dyn SourceAdapter) {
        if !adapter.is_listening() {
            debug!(source_id = %source_id, "starting adapter");
            adapter.start(self.tx.clone(), self.evict.clone(), self.metrics.clone());
        }
    }

    fn stop_adapter(&self, source_id: &str, adapter: &dyn SourceAdapter) {
        if adapter.is_listening() {
            debug!(source_id = %source_id, "stopping adapter");
            adapter.stop();
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<InboundEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Check if specified source is listening
    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
