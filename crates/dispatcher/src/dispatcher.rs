//! Fan-out of stabilizer outputs to the configured sinks.
//!
//! Every sink owns a bounded queue ([`SinkHandle`]); the fan-out loop only
//! ever `try_send`s so a stalled disk never backs up into the scheduler.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SinkConfig, SinkType, StabilizerOutput};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

#[instrument(
    name = "dispatcher_open_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => SinkHandle::spawn(
            FileSink::from_params(&config.name, &config.params)?,
            config.queue_capacity,
        ),
    };
    debug!(queue_capacity = config.queue_capacity, "Sink opened");
    Ok(handle)
}

pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<StabilizerOutput>,
}

impl Dispatcher {
    /// Open every configured sink. Fails on the first sink that cannot be set up.
    pub fn from_configs(
        configs: &[SinkConfig],
        input_rx: mpsc::Receiver<StabilizerOutput>,
    ) -> Result<Self, DispatcherError> {
        let handles = configs.iter().map(open_sink).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { handles, input_rx })
    }

    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<StabilizerOutput>) -> Self {
        Self { handles, input_rx }
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Drain `input_rx` until every sender is gone, then close the sinks.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) {
        info!("Dispatcher started");

        let (mut frames, mut orientations) = (0u64, 0u64);
        while let Some(output) = self.input_rx.recv().await {
            match output {
                StabilizerOutput::Frame(_) => {
                    frames += 1;
                    if frames.is_multiple_of(100) {
                        debug!(frames, "Dispatcher progress");
                    }
                }
                StabilizerOutput::Orientation(_) => orientations += 1,
            }
            self.fan_out(output);
        }

        info!(frames, orientations, "Input closed, draining sinks");
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = handle.metrics().clone();
            handle.shutdown().await;
            info!(sink = %name, stats = %metrics.snapshot(), "Sink closed");
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The last sink takes ownership, the rest get clones
    fn fan_out(&self, output: StabilizerOutput) {
        let Some((last, rest)) = self.handles.split_last() else {
            return;
        };
        for handle in rest {
            handle.try_send(output.clone());
        }
        last.try_send(output);
    }
}

pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<StabilizerOutput>,
) -> Result<Dispatcher, DispatcherError> {
    Dispatcher::from_configs(&sink_configs, input_rx)
}
