//! The agent: startup sequence and the cooperative tick loop.
//!
//! ```text
//!  pins ──► InputMonitor ──► Event ──► TimestampResolver ──┬──► LogStore        (durable)
//!                 │                                        └──► ForwardingChannel (best effort)
//!                 └──► BulkClearTrigger ──► LogStore::remove_all ──► [Clear] event
//!
//!  listener ──► retrieval::serve_request ──► LogStore (list / read / delete)
//! ```
//!
//! Everything runs on the caller's thread. [`Agent::tick`] should be called
//! every [`AgentConfig::tick_interval_ms`]; [`Agent::serve`] between ticks
//! whenever the host wants to answer HTTP. Because each append is a complete
//! open/write/close inside one call, a request served between ticks never
//! sees a half-written line.

use crate::boot::{BootRecorder, ResetSource};
use crate::clock::{ClockProvider, TimestampResolver};
use crate::config::{AgentConfig, ConfigError, MAX_LINES};
use crate::event::Event;
use crate::forward::{ChannelClient, Delivery, ForwardingChannel, LinkEvent};
use crate::input::{InputMonitor, InputPins};
use crate::logbook::{ClearReport, LogError, LogFileName, LogStore};
use crate::network::application::http::Status;
use crate::network::error::Error as NetError;
use crate::network::{Bind, Close, Connectivity};
use crate::retrieval::{self, Health};
use crate::storage::FileStore;
use crate::trigger::BulkClearTrigger;

/// Failures surfaced by the agent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// The store could not be mounted. Logging is disabled; input
    /// monitoring and forwarding continue.
    Storage(LogError),
    /// Accepting or answering an HTTP request failed.
    Network(NetError),
}

impl core::fmt::Display for AgentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AgentError::Config(e) => write!(f, "config: {}", e),
            AgentError::Storage(e) => write!(f, "storage: {}", e),
            AgentError::Network(e) => write!(f, "network: {}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AgentError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            AgentError::Config(e) => defmt::write!(f, "Config({})", e),
            AgentError::Storage(e) => defmt::write!(f, "Storage({})", e),
            AgentError::Network(e) => defmt::write!(f, "Network({})", e),
        }
    }
}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        AgentError::Config(e)
    }
}

/// The hardware and transport the agent runs on.
#[derive(Debug)]
pub struct Parts<P, K, S, C, N> {
    /// Input pins.
    pub pins: P,
    /// Wall clock.
    pub clock: K,
    /// Persistent store, not yet mounted.
    pub store: S,
    /// Publish/subscribe client.
    pub channel: C,
    /// Network join state.
    pub network: N,
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// The event as logged, timestamp attached.
    pub event: Event,
    /// File written, or why not.
    pub stored: Result<LogFileName, LogError>,
    /// Whether the forwarded copy went out.
    pub delivery: Delivery,
}

/// Summary of one [`Agent::tick`], for hosts that surface diagnostics
/// without a defmt transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Channel state change, if any.
    pub link: LinkEvent,
    /// Presses detected this tick.
    pub presses: usize,
    /// Events durably appended.
    pub stored: usize,
    /// Most recent append failure this tick.
    pub store_error: Option<LogError>,
    /// Events forwarded.
    pub forwarded: usize,
    /// Events not forwarded.
    pub dropped: usize,
    /// Outcome of a bulk clear, if the combination fired.
    pub clear: Option<Result<ClearReport, LogError>>,
}

impl TickReport {
    fn new(link: LinkEvent) -> Self {
        Self {
            link,
            presses: 0,
            stored: 0,
            store_error: None,
            forwarded: 0,
            dropped: 0,
            clear: None,
        }
    }

    fn count(&mut self, dispatch: &Dispatch) {
        match dispatch.stored {
            Ok(_) => self.stored += 1,
            Err(e) => self.store_error = Some(e),
        }
        match dispatch.delivery {
            Delivery::Sent => self.forwarded += 1,
            Delivery::Dropped => self.dropped += 1,
        }
    }
}

/// Event-capture agent.
pub struct Agent<P, K, S, C, N> {
    pins: P,
    monitor: InputMonitor<MAX_LINES>,
    resolver: TimestampResolver<K>,
    log: LogStore<S>,
    channel: ForwardingChannel<C>,
    network: N,
    trigger: BulkClearTrigger,
    clear_labels: (&'static str, &'static str),
    boot: BootRecorder,
    clock_ok: bool,
}

impl<P, K, S, C, N> core::fmt::Debug for Agent<P, K, S, C, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Agent")
            .field("lines", &self.monitor.lines().len())
            .field("mounted", &self.log.is_mounted())
            .field("clock_ok", &self.clock_ok)
            .finish()
    }
}

impl<P, K, S, C, N> Agent<P, K, S, C, N>
where
    P: InputPins,
    K: ClockProvider,
    S: FileStore,
    C: ChannelClient,
    N: Connectivity,
{
    /// Assemble an agent. Nothing touches the hardware until
    /// [`start`](Self::start).
    pub fn new(config: &AgentConfig<'static>, parts: Parts<P, K, S, C, N>) -> Result<Self, AgentError> {
        config.validate()?;
        let (first, second) = config.clear_pair;
        let label = |id| config.label_of(id).ok_or(ConfigError::UnknownClearLine(id));
        let clear_labels = (label(first)?, label(second)?);

        Ok(Self {
            pins: parts.pins,
            monitor: InputMonitor::new(&config.input_lines()),
            resolver: TimestampResolver::new(parts.clock, config.clock_wait_ms),
            log: LogStore::new(parts.store),
            channel: ForwardingChannel::new(
                parts.channel,
                config.topic,
                config.reconnect_interval_ms,
            ),
            network: parts.network,
            trigger: BulkClearTrigger::new(first, second, config.clear_interval_ms),
            clear_labels,
            boot: BootRecorder::new(),
            clock_ok: false,
        })
    }

    /// Startup: mount the store, make a first channel attempt, record the
    /// boot.
    ///
    /// A mount failure is returned and the boot record is skipped, but the
    /// agent stays usable: [`tick`](Self::tick) keeps monitoring inputs and
    /// forwarding, with each append reporting [`LogError::NotMounted`].
    pub fn start<R: ResetSource>(
        &mut self,
        reset: &mut R,
        now_ms: u64,
    ) -> Result<Option<Dispatch>, AgentError> {
        self.log.mount().map_err(AgentError::Storage)?;
        self.channel.tick(now_ms, &self.network);
        Ok(self
            .boot
            .record(reset)
            .map(|event| self.dispatch(event)))
    }

    /// One scheduler iteration.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::new(self.channel.tick(now_ms, &self.network));

        for event in self.monitor.poll(&mut self.pins) {
            report.presses += 1;
            let dispatch = self.dispatch(event);
            report.count(&dispatch);
        }

        if self.trigger.poll(now_ms, &self.monitor) {
            let (first, second) = self.clear_labels;
            info!("clear combination {}+{} held", first, second);
            let cleared = self.log.remove_all();
            if let Err(e) = &cleared {
                error!("bulk clear failed: {}", e);
            }
            report.clear = Some(cleared);
            let dispatch = self.dispatch(Event::combo_clear(first, second));
            report.count(&dispatch);
        }

        report
    }

    /// Timestamp an event, append it, forward it.
    ///
    /// The store and the channel are independent: a failed append does not
    /// stop the publish, and a dead channel never delays the append.
    pub fn dispatch(&mut self, event: Event) -> Dispatch {
        let time = self.resolver.resolve();
        self.clock_ok = time.is_valid();
        let event = event.at(time);

        let (stored, delivery) = match event.line() {
            Ok(line) => {
                let stored = self.log.append(&time, &line);
                (stored, self.channel.publish(line.as_bytes()))
            }
            Err(_) => (Err(LogError::Write), Delivery::Dropped),
        };
        if let Err(e) = stored {
            warn!("event from {} not stored: {}", event.source, e);
        }

        Dispatch {
            event,
            stored,
            delivery,
        }
    }

    /// Answer at most one pending HTTP request.
    ///
    /// Returns `Ok(None)` when nobody is waiting.
    pub fn serve<B>(&mut self, listener: &mut B) -> Result<Option<Status>, AgentError>
    where
        B: Bind,
        B::Error: Into<NetError>,
    {
        let Some(mut connection) = listener.accept().map_err(|e| {
            let e: NetError = e.into();
            warn!("http accept failed: {}", e);
            AgentError::Network(e)
        })?
        else {
            return Ok(None);
        };
        let health = self.health();
        let served = retrieval::serve_request(&mut self.log, health, &mut connection);
        let _ = connection.close();
        match served {
            Ok(status) => {
                debug!("http {}", status.code());
                Ok(Some(status))
            }
            Err(e) => {
                warn!("http request failed: {}", e);
                Err(AgentError::Network(e))
            }
        }
    }

    /// Current health flags.
    pub fn health(&self) -> Health {
        Health {
            channel: self.channel.is_connected(),
            clock: self.clock_ok,
        }
    }

    /// The log store.
    pub fn log(&self) -> &LogStore<S> {
        &self.log
    }

    /// The log store, mutably.
    pub fn log_mut(&mut self) -> &mut LogStore<S> {
        &mut self.log
    }

    /// The forwarding channel.
    pub fn channel(&self) -> &ForwardingChannel<C> {
        &self.channel
    }

    /// The forwarding channel, mutably.
    pub fn channel_mut(&mut self) -> &mut ForwardingChannel<C> {
        &mut self.channel
    }

    /// The input pins.
    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    /// The clock.
    pub fn clock_mut(&mut self) -> &mut K {
        self.resolver.clock_mut()
    }

    /// The connectivity provider.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }
}
