// Teleop loop: read one byte -> decode -> scale -> publish if non-zero
//
// The loop runs until the console read fails or the shutdown future fires.
// Signals are only observed here (tokio flags them); the terminal is
// restored in ordinary context by run() before it returns.

use std::future::Future;
use std::io::{self, Read};

use crossterm::tty::IsTty;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, TeleopConfig};
use crate::keys::KeyDecoder;
use crate::publisher::{CommandPublisher, CommandSink, PublishError, ZenohSink};
use crate::terminal::{ConsoleInput, TerminalModeGuard};

#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open zenoh session: {0}")]
    Session(#[source] zenoh::Error),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("Standard input is not a terminal")]
    NotATerminal,

    #[error("Failed to configure terminal: {0}")]
    Terminal(#[source] io::Error),

    #[error("read(): {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl TeleopError {
    /// Process exit status for this fault
    pub fn exit_code(&self) -> i32 {
        match self {
            TeleopError::Config(_) => 2,
            _ => 1,
        }
    }
}

enum LoopState {
    Running,
    Terminating(Result<(), TeleopError>),
}

pub struct TeleopLoop<R, S> {
    // Taken while a read is in flight on the blocking pool
    input: Option<R>,
    decoder: KeyDecoder,
    publisher: CommandPublisher<S>,
}

impl<R, S> TeleopLoop<R, S>
where
    R: Read + Send + 'static,
    S: CommandSink,
{
    pub fn new(input: R, publisher: CommandPublisher<S>) -> Self {
        Self {
            input: Some(input),
            decoder: KeyDecoder::new(),
            publisher,
        }
    }

    /// Run until `shutdown` completes (Ok) or a read/publish fault (Err)
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), TeleopError> {
        tokio::pin!(shutdown);

        let mut state = LoopState::Running;
        loop {
            state = match state {
                LoopState::Running => self.step(shutdown.as_mut()).await,
                LoopState::Terminating(outcome) => return outcome,
            };
        }
    }

    async fn step(&mut self, shutdown: std::pin::Pin<&mut impl Future<Output = ()>>) -> LoopState {
        let byte = tokio::select! {
            biased;
            () = shutdown => {
                info!("Shutdown requested");
                return LoopState::Terminating(Ok(()));
            }
            read = self.next_byte() => match read {
                Ok(byte) => byte,
                Err(e) => return LoopState::Terminating(Err(TeleopError::Read(e))),
            },
        };

        let intent = self.decoder.decode_byte(byte);
        debug!("value: 0x{:02X} -> {:?}", byte, intent);

        match self.publisher.publish_if_changed(intent).await {
            Ok(_) => LoopState::Running,
            Err(e) => LoopState::Terminating(Err(e.into())),
        }
    }

    // The read blocks; run it off the async thread so shutdown can win
    async fn next_byte(&mut self) -> io::Result<u8> {
        let mut input = self
            .input
            .take()
            .ok_or_else(|| io::Error::other("console input lost by an abandoned read"))?;

        let (input, byte) = tokio::task::spawn_blocking(move || {
            let byte = read_byte(&mut input);
            (input, byte)
        })
        .await
        .map_err(io::Error::other)?;

        self.input = Some(input);
        byte
    }

    pub fn publisher(&self) -> &CommandPublisher<S> {
        &self.publisher
    }
}

/// Blocking single-byte read. End of input counts as a fault.
pub fn read_byte(input: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "console input closed",
                ));
            }
            Ok(_) => return Ok(buf[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Interrupt and terminate handlers, registered as soon as this is created
pub struct ShutdownSignal {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolves on the first SIGINT or SIGTERM
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => debug!("SIGINT received"),
            _ = self.terminate.recv() => debug!("SIGTERM received"),
        }
    }
}

/// Full teleop session: transport, signals, raw console, loop, restore
pub async fn run(config: TeleopConfig) -> Result<(), TeleopError> {
    let zenoh_config = config.zenoh_config()?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh_config)
        .await
        .map_err(TeleopError::Session)?;

    let sink = ZenohSink::declare(&session, config.topic()).await?;
    info!(
        "Publishing to: {} (key expr {})",
        config.topic(),
        sink.key_expr()
    );
    let scale = config.scale();
    info!(
        "Scale: linear={} angular={}",
        scale.linear_scale, scale.angular_scale
    );

    let mut shutdown = ShutdownSignal::install().map_err(TeleopError::Signal)?;

    let console = ConsoleInput::stdin();
    if !console.is_tty() {
        return Err(TeleopError::NotATerminal);
    }
    let guard = TerminalModeGuard::acquire(&console).map_err(TeleopError::Terminal)?;

    info!("Reading from keyboard");
    info!("---------------------------");
    info!("Use arrow keys to move the robot. Ctrl-C to quit.");

    let teleop = TeleopLoop::new(console, CommandPublisher::new(sink, scale));
    let outcome = teleop.run(shutdown.recv()).await;

    if let Err(e) = guard.release() {
        warn!("Failed to restore terminal: {}", e);
    }
    outcome
}
