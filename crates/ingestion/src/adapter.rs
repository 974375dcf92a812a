//! 输入源适配器 trait

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{InboundEvent, SourceKind};

use crate::config::IngestionMetrics;

/// 输入源适配器 trait
///
/// 负责：
/// 1. 注册输入源回调
/// 2. 统计接收数量
/// 3. 发送到共享通道（处理背压）
pub trait SourceAdapter: Send + Sync {
    /// 获取输入源 ID
    fn source_id(&self) -> &str;

    /// 获取数据流类型
    fn kind(&self) -> SourceKind;

    /// 启动数据采集
    ///
    /// # Arguments
    /// * `tx` - 事件发送通道
    /// * `evict` - 同一通道的接收端，`DropOldest` 用它弹出最旧事件
    /// * `metrics` - 共享的 ingestion 指标
    fn start(
        &self,
        tx: Sender<InboundEvent>,
        evict: Receiver<InboundEvent>,
        metrics: Arc<IngestionMetrics>,
    );

    /// 停止数据采集
    fn stop(&self);

    /// 检查是否正在监听
    fn is_listening(&self) -> bool;
}
