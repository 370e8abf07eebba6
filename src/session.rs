//! Live gpsd watch session.
//!
//! `Session::connect` opens the TCP connection and enables JSON streaming;
//! `Session::watch` is the blocking watch loop that dispatches each incoming
//! report to its registered callback until the termination signal fires.
//! Registration happens before the watch task launches and is never mutated
//! afterwards, so the registration set needs no locking.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::report::{self, Report, ReportKind};

/// Command enabling JSON report streaming on a fresh gpsd connection.
const WATCH_ENABLE: &[u8] = b"?WATCH={\"class\":\"WATCH\",\"enable\":true,\"json\":true}\n";

/// Callback invoked with each report of the registered kind.
pub type ReportHandler = Box<dyn Fn(&Report) + Send>;

/// Registration set mapping report kinds to callbacks, plus the tag-match
/// dispatch step. Kept separate from the socket so scripted reports can be
/// fed through it directly in tests.
#[derive(Default)]
pub struct Dispatch {
    handlers: HashMap<ReportKind, ReportHandler>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback for one report kind. At most one callback per
    /// kind; a second registration for the same kind replaces the first.
    pub fn register(&mut self, kind: ReportKind, handler: ReportHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Dispatches a report to the callback registered for its kind.
    /// Returns false if no callback is registered for that kind.
    pub fn dispatch(&self, report: &Report) -> bool {
        match self.handlers.get(&report.kind()) {
            Some(handler) => {
                handler(report);
                true
            }
            None => false,
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// One live connection to the positioning daemon. Created on start,
/// consumed by the watch loop, gone after stop.
pub struct Session {
    reader: BufReader<TcpStream>,
    dispatch: Dispatch,
}

impl Session {
    /// Connects to gpsd at `address` and enables JSON streaming.
    ///
    /// Failure here is synchronous and fatal for this start attempt; the
    /// caller may retry with a fresh `connect`.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .with_context(|| format!("connecting to gpsd at {address} timed out"))?
            .with_context(|| format!("connecting to gpsd at {address}"))?;

        stream
            .write_all(WATCH_ENABLE)
            .await
            .context("sending WATCH command")?;

        info!(address, "connected to gpsd");

        Ok(Self {
            reader: BufReader::new(stream),
            dispatch: Dispatch::new(),
        })
    }

    /// Registers the callback for one report kind.
    pub fn register(&mut self, kind: ReportKind, handler: ReportHandler) {
        self.dispatch.register(kind, handler);
    }

    /// The registration set, for bulk callback wiring before watch.
    pub fn dispatch_mut(&mut self) -> &mut Dispatch {
        &mut self.dispatch
    }

    /// Runs the watch loop: reads daemon events and dispatches each to its
    /// registered callback, one report at a time in arrival order.
    ///
    /// Returns only once `cancel` fires. A read error or EOF is logged and
    /// the loop then parks on the termination signal; watch-loop failures
    /// after a successful connect are never surfaced to the caller.
    pub async fn watch(self, cancel: CancellationToken) {
        let Session { reader, dispatch } = self;
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("termination signal received, watch loop exiting");
                    return;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match report::parse_line(&line) {
                        Some(report) => {
                            let kind = report.kind();
                            if dispatch.dispatch(&report) {
                                trace!(%kind, "report dispatched");
                            } else {
                                trace!(%kind, "no callback registered, report dropped");
                            }
                        }
                        None => trace!(line = %line, "ignoring non-report line"),
                    },
                    Ok(None) => {
                        warn!("gpsd closed the connection, waiting for shutdown");
                        cancel.cancelled().await;
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "gpsd read failed, waiting for shutdown");
                        cancel.cancelled().await;
                        return;
                    }
                }
            }
        }
    }
}
