//! Duplex pipeline wiring: source → packet channel → sink, acks back
//! through the ack channel.

use crate::sink::Sink;
use crate::source::Source;
use linksim_channel::{
    AckChannel, AckChannelConfig, ChannelStats, PacketChannel, PacketChannelConfig,
};
use linksim_kernel::Simulator;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

/// Parameters for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Packets queued at the source.
    pub packets: u64,
    /// Size of each packet in bytes.
    pub packet_size: usize,
    /// Data-channel parameters.
    pub data: PacketChannelConfig,
    /// Ack-channel parameters.
    pub ack: AckChannelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            packets: 32,
            packet_size: 1500,
            data: PacketChannelConfig::default(),
            ack: AckChannelConfig::default(),
        }
    }
}

/// What happened during a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Packets the source surrendered to the data channel.
    pub pushed: u64,
    /// Packets that reached the sink.
    pub delivered: u64,
    /// Acks that made it back to the source.
    pub acked: u64,
    /// Data-channel datapath counters.
    pub data_stats: ChannelStats,
    /// Ack-channel datapath counters.
    pub ack_stats: ChannelStats,
    /// Readiness polls the data channel issued.
    pub polls: u64,
    /// Simulated time when the run ended.
    pub final_time: Duration,
}

impl PipelineReport {
    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("=== Pipeline Report ===");
        println!("Pushed:          {}", self.pushed);
        println!("Delivered:       {}", self.delivered);
        println!("Acked:           {}", self.acked);
        println!(
            "Data loss rate:  {:.3} ({} / {})",
            self.data_stats.loss_rate(),
            self.data_stats.packets_lost,
            self.data_stats.packets_in
        );
        println!(
            "Ack loss rate:   {:.3} ({} / {})",
            self.ack_stats.loss_rate(),
            self.ack_stats.packets_lost,
            self.ack_stats.packets_in
        );
        println!("Polls issued:    {}", self.polls);
        println!("Final time:      {:.3}s", self.final_time.as_secs_f64());
    }
}

/// A fully wired duplex link simulation.
///
/// Construction wires the components; nothing moves until
/// [`run`](Self::run) starts the data channel's poll loop and drives the
/// event queue.
pub struct Pipeline {
    sim: Simulator,
    source: Rc<RefCell<Source>>,
    sink: Rc<RefCell<Sink>>,
    data_channel: Rc<RefCell<PacketChannel>>,
    ack_channel: Rc<RefCell<AckChannel>>,
}

impl Pipeline {
    /// Build and wire the pipeline.
    pub fn new(config: PipelineConfig) -> Self {
        let sim = Simulator::new();
        let source = Source::new(&sim, config.packets, config.packet_size);
        let sink = Sink::new(&sim);
        let data_channel = PacketChannel::with_parameters(&sim, config.data);
        let ack_channel = AckChannel::with_parameters(&sim, config.ack);

        // Downstream data path.
        source
            .borrow_mut()
            .output
            .forward(&data_channel, PacketChannel::handle_input);
        data_channel
            .borrow_mut()
            .output
            .forward(&sink, Sink::handle_packet);

        // Pull control loop.
        {
            let mut channel = data_channel.borrow_mut();
            channel.get_nof_inputs.forward(&source, Source::publish_ready);
            channel.input_request.forward(&source, Source::handle_request);
        }
        source
            .borrow_mut()
            .nof_ready
            .forward(&data_channel, PacketChannel::handle_nof_inputs);

        // Upstream ack path.
        sink.borrow_mut()
            .ack_out
            .forward(&ack_channel, AckChannel::handle_input);
        ack_channel
            .borrow_mut()
            .output
            .forward(&source, Source::handle_ack);

        info!(
            packets = config.packets,
            packet_size = config.packet_size,
            "pipeline wired"
        );

        Self {
            sim,
            source,
            sink,
            data_channel,
            ack_channel,
        }
    }

    /// Poll for `duration`, then let in-flight traffic drain, and report.
    pub fn run(&self, duration: Duration) -> PipelineReport {
        self.data_channel.borrow().start.fire(true, Duration::ZERO);
        self.data_channel.borrow().start.fire(false, duration);
        self.sim.start();

        let report = self.report();
        info!(
            pushed = report.pushed,
            delivered = report.delivered,
            acked = report.acked,
            final_time = ?report.final_time,
            "pipeline run complete"
        );
        report
    }

    /// Snapshot the counters without running anything.
    pub fn report(&self) -> PipelineReport {
        PipelineReport {
            pushed: self.source.borrow().pushed(),
            delivered: self.sink.borrow().delivered(),
            acked: self.source.borrow().acked().len() as u64,
            data_stats: self.data_channel.borrow().stats(),
            ack_stats: self.ack_channel.borrow().stats(),
            polls: self.data_channel.borrow().pull_stats().polls_issued,
            final_time: self.sim.now(),
        }
    }

    /// The scheduler driving this pipeline.
    pub fn sim(&self) -> &Simulator {
        &self.sim
    }

    /// The packet producer.
    pub fn source(&self) -> &Rc<RefCell<Source>> {
        &self.source
    }

    /// The packet consumer.
    pub fn sink(&self) -> &Rc<RefCell<Sink>> {
        &self.sink
    }

    /// The lossy data channel.
    pub fn data_channel(&self) -> &Rc<RefCell<PacketChannel>> {
        &self.data_channel
    }

    /// The lossy ack channel.
    pub fn ack_channel(&self) -> &Rc<RefCell<AckChannel>> {
        &self.ack_channel
    }
}
