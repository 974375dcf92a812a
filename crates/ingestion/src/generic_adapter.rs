//! 通用输入源适配器
//!
//! 基于 `InboundSource` trait 的统一适配器实现。
//! 允许 IngestionPipeline 以统一方式处理模拟源与真实传输源。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{InboundCallback, InboundEvent, InboundSource, SourceKind};
use tracing::{debug, trace};

use crate::adapter::SourceAdapter;
use crate::adapters::common::send_event;
use crate::config::{BackpressureConfig, IngestionMetrics};

/// 通用输入源适配器
///
/// 将 `InboundSource` trait 适配为 `SourceAdapter`。
pub struct GenericSourceAdapter {
    source_id: String,
    source: Box<dyn InboundSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericSourceAdapter {
    /// 创建新的通用适配器
    pub fn new(source: Box<dyn InboundSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id: source.source_id().to_string(),
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SourceAdapter for GenericSourceAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    fn start(
        &self,
        tx: Sender<InboundEvent>,
        evict: Receiver<InboundEvent>,
        metrics: Arc<IngestionMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source_id = %source_id, kind = self.kind().as_str(), "starting source adapter");

        let callback: InboundCallback = Arc::new(move |event| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received(event.kind());
            trace!(source_id = %source_id, timestamp = event.timestamp(), "adapter received event");
            send_event(&tx, &evict, event, &metrics, &source_id, drop_policy);
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, "stopping source adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
