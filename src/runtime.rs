// Session lifecycle: Constructed -> Initialized -> Running -> Stopped
//
// Zenoh callbacks feed the bridge, a blocking task runs the poll loop and an
// async forwarder owns the publishers. Every subscription and publication is
// kept as a BusHandle so teardown is one loop over the list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};
use zenoh::Session;
use zenoh::pubsub::{Publisher, Subscriber};

use crate::attitude::QuaternionError;
use crate::bridge::{BridgeError, StateBridge};
use crate::config::Settings;
use crate::framing::DeviceFramer;
use crate::grammar::TextGrammar;
use crate::link::SerialLink;
use crate::messages::{Inbound, Outbound};
use crate::telemetry::Publication;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Initialized,
    Running,
    Stopped,
}

/// A declared subscription or publication
pub enum BusHandle {
    Subscriber(Inbound, Subscriber<()>),
    Publisher(Outbound, Publisher<'static>),
}

impl BusHandle {
    fn describe(&self) -> String {
        match self {
            BusHandle::Subscriber(channel, _) => format!("subscriber {}", channel.topic()),
            BusHandle::Publisher(channel, _) => format!("publisher {}", channel.topic()),
        }
    }

    async fn release(self) -> zenoh::Result<()> {
        match self {
            BusHandle::Subscriber(_, subscriber) => subscriber.undeclare().await,
            BusHandle::Publisher(_, publisher) => publisher.undeclare().await,
        }
    }
}

fn bus_error(e: zenoh::Error) -> BridgeError {
    BridgeError::Bus(e.to_string())
}

pub struct Runtime {
    rate_hz: u32,
    phase: Phase,
    bridge: Arc<StateBridge>,
    handles: Vec<BusHandle>,
    poll_task: Option<JoinHandle<()>>,
    forwarder: Option<JoinHandle<Vec<BusHandle>>>,
}

impl Runtime {
    pub fn new(rate_hz: u32, bridge: StateBridge) -> Self {
        Self {
            rate_hz,
            phase: Phase::Constructed,
            bridge: Arc::new(bridge),
            handles: Vec::new(),
            poll_task: None,
            forwarder: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bridge(&self) -> &Arc<StateBridge> {
        &self.bridge
    }

    /// Bring up the link. Failure here aborts the session.
    pub fn initialize(&mut self) -> Result<(), BridgeError> {
        if self.phase != Phase::Constructed {
            return Err(BridgeError::Lifecycle("initialize called twice"));
        }
        self.bridge.initialize()?;
        self.phase = Phase::Initialized;
        info!("Link up, poll rate {}Hz", self.rate_hz);
        Ok(())
    }

    /// Declare publishers and subscribers, then launch the poll loop
    pub async fn start(&mut self, session: &Session) -> Result<(), BridgeError> {
        if self.phase != Phase::Initialized {
            return Err(BridgeError::Lifecycle("start requires an initialized, never started runtime"));
        }
        if !self.bridge.run_state().begin() {
            return Err(BridgeError::Lifecycle("session already ended"));
        }
        self.phase = Phase::Running;

        info!("Setting up publishers and subscribers...");
        let mut publishers = HashMap::with_capacity(Outbound::ALL.len());
        for channel in Outbound::ALL {
            let publisher = session
                .declare_publisher(channel.topic())
                .await
                .map_err(bus_error)?;
            publishers.insert(channel, publisher);
        }

        for channel in Inbound::ALL {
            let bridge = Arc::clone(&self.bridge);
            let subscriber = session
                .declare_subscriber(channel.topic())
                .callback(move |sample| {
                    let payload = sample.payload().to_bytes();
                    match channel.decode(&payload) {
                        Ok(message) => bridge.dispatch(message),
                        Err(e) => warn!("Ignoring message on {}: {}", channel.topic(), e),
                    }
                })
                .await
                .map_err(bus_error)?;
            self.handles.push(BusHandle::Subscriber(channel, subscriber));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.forwarder = Some(tokio::spawn(forward(rx, publishers)));

        let bridge = Arc::clone(&self.bridge);
        let rate_hz = self.rate_hz;
        self.poll_task = Some(tokio::task::spawn_blocking(move || {
            bridge.run_poll_loop(rate_hz, &tx)
        }));

        info!(
            "Bridge started: {} subscriptions, {} telemetry channels",
            Inbound::ALL.len(),
            Outbound::ALL.len()
        );
        Ok(())
    }

    /// Resolves once the session has ended (terminator command or stop)
    pub async fn ended(&self) {
        let mut check = interval(Duration::from_millis(100));
        loop {
            check.tick().await;
            if self.bridge.run_state().has_ended() {
                return;
            }
        }
    }

    /// Tear everything down. Safe to call in any phase and more than once.
    pub async fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            debug!("Runtime already stopped");
            return;
        }
        info!("Stopping bridge...");
        self.bridge.run_state().end();

        if let Some(task) = self.poll_task.take() {
            if let Err(e) = task.await {
                warn!("Poll loop did not finish cleanly: {}", e);
            }
        }
        // The poll loop owned the only sender, so the forwarder drains and returns
        if let Some(forwarder) = self.forwarder.take() {
            match forwarder.await {
                Ok(publishers) => self.handles.extend(publishers),
                Err(e) => warn!("Telemetry forwarder did not finish cleanly: {}", e),
            }
        }

        for handle in self.handles.drain(..) {
            let name = handle.describe();
            if let Err(e) = handle.release().await {
                warn!("Failed to release {}: {}", name, e);
            }
        }

        self.bridge.shutdown();
        self.phase = Phase::Stopped;
        info!("Bridge stopped");
    }
}

/// Publish everything the poll loop emits, then hand the publishers back
async fn forward(
    mut rx: UnboundedReceiver<Publication>,
    publishers: HashMap<Outbound, Publisher<'static>>,
) -> Vec<BusHandle> {
    while let Some(publication) = rx.recv().await {
        let Some(publisher) = publishers.get(&publication.channel) else {
            continue;
        };
        let payload = match serde_json::to_string(&publication.value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize {:?}: {}", publication.channel, e);
                continue;
            }
        };
        if let Err(e) = publisher.put(payload).await {
            warn!("Failed to publish on {}: {}", publication.channel.topic(), e);
        }
    }

    publishers
        .into_iter()
        .map(|(channel, publisher)| BusHandle::Publisher(channel, publisher))
        .collect()
}

/// Run one bridge session against the serial link until Ctrl-C or `end`
pub async fn run(
    settings: Settings,
    session_name: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let framer = DeviceFramer::create(&settings.log_dir, session_name)?;
    let bridge = StateBridge::new(
        Box::new(SerialLink::new(&settings.port, settings.baud)),
        Box::new(framer),
        Box::new(TextGrammar),
        Box::new(QuaternionError),
    );

    let mut runtime = Runtime::new(settings.rate, bridge);
    runtime.initialize()?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    if let Err(e) = runtime.start(&session).await {
        runtime.stop().await;
        return Err(e.into());
    }
    info!("Session '{}' running", session_name);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown signal received");
        }
        _ = runtime.ended() => info!("Session ended by command"),
    }

    runtime.stop().await;
    session.close().await?;
    Ok(())
}
