//! Collector lifecycle: connect, subscribe, watch, stop.
//!
//! The collector owns exactly one session at a time. `start` connects and
//! launches the background watch task; `stop` sends the termination signal
//! and waits for that task to exit, so no sink write can happen after stop
//! returns.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::mapper::{self, MetricRecord};
use crate::report::{Report, ReportKind};
use crate::session::{Dispatch, Session};
use crate::sink::Sink;

/// Writes one record to the sink. Write failures are the sink's own
/// problem; they are logged and never propagate into the watch loop.
fn forward(sink: &Arc<dyn Sink>, record: MetricRecord) {
    if let Err(e) = sink.write(record.name, &record.fields, &[]) {
        warn!(sink = sink.name(), metric = record.name, error = %e, "sink write failed");
    }
}

/// Registers one callback per enabled report kind.
///
/// The satellite-count and dilution-of-precision emissions share the SKY
/// registration point: the callback is registered if either flag is set,
/// and each emission checks its own flag before writing.
pub fn register_callbacks(dispatch: &mut Dispatch, cfg: &Config, sink: &Arc<dyn Sink>) {
    if cfg.gather_satcount || cfg.gather_sky {
        let sink = Arc::clone(sink);
        let gather_satcount = cfg.gather_satcount;
        let gather_sky = cfg.gather_sky;
        dispatch.register(
            ReportKind::Sky,
            Box::new(move |report| {
                let Report::Sky(sky) = report else { return };
                if gather_satcount {
                    forward(&sink, mapper::satcount_record(sky));
                }
                if gather_sky {
                    forward(&sink, mapper::sky_record(sky));
                }
            }),
        );
    }

    if cfg.gather_tpv {
        let sink = Arc::clone(sink);
        dispatch.register(
            ReportKind::Tpv,
            Box::new(move |report| {
                let Report::Tpv(tpv) = report else { return };
                forward(&sink, mapper::tpv_record(tpv));
            }),
        );
    }

    if cfg.gather_gst {
        let sink = Arc::clone(sink);
        dispatch.register(
            ReportKind::Gst,
            Box::new(move |report| {
                let Report::Gst(gst) = report else { return };
                forward(&sink, mapper::gst_record(gst));
            }),
        );
    }

    if cfg.gather_att {
        let sink = Arc::clone(sink);
        dispatch.register(
            ReportKind::Att,
            Box::new(move |report| {
                let Report::Att(att) = report else { return };
                forward(&sink, mapper::att_record(att));
            }),
        );
    }

    if cfg.gather_pps {
        let sink = Arc::clone(sink);
        dispatch.register(
            ReportKind::Pps,
            Box::new(move |report| {
                let Report::Pps(pps) = report else { return };
                forward(&sink, mapper::pps_record(pps));
            }),
        );
    }
}

/// Collector orchestrates the session lifecycle:
/// Idle -> Connecting -> Watching -> Stopping -> Stopped.
pub struct Collector {
    cfg: Config,
    sink: Arc<dyn Sink>,
    cancel: CancellationToken,
    watch_task: Option<tokio::task::JoinHandle<()>>,
}

impl Collector {
    pub fn new(cfg: Config, sink: Arc<dyn Sink>) -> Self {
        Self {
            cfg,
            sink,
            cancel: CancellationToken::new(),
            watch_task: None,
        }
    }

    /// Connects to gpsd, registers callbacks for the enabled report kinds,
    /// and launches the background watch task.
    ///
    /// A connection failure is returned immediately and leaves the
    /// collector un-started; `start` may then be called again. Calling
    /// `start` while a session is already watching is a precondition
    /// violation.
    pub async fn start(&mut self) -> Result<()> {
        assert!(
            self.watch_task.is_none(),
            "start called while a session is active"
        );

        let mut session = Session::connect(&self.cfg.url, self.cfg.connect_timeout)
            .await
            .context("establishing gpsd session")?;

        register_callbacks(session.dispatch_mut(), &self.cfg, &self.sink);
        info!(
            url = %self.cfg.url,
            callbacks = session.dispatch_mut().len(),
            "callbacks registered, starting watch task",
        );

        // Fresh single-use termination signal for this session.
        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();
        self.watch_task = Some(tokio::spawn(session.watch(cancel)));

        Ok(())
    }

    /// Sends the termination signal and waits until the watch task has
    /// fully exited. No sink write happens after this returns.
    ///
    /// There is no timeout: stop blocks until the watch loop observes the
    /// signal. Calling stop without a prior successful start is a
    /// precondition violation and panics.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        let task = self
            .watch_task
            .take()
            .expect("stop called without a prior successful start");
        if let Err(e) = task.await {
            warn!(error = %e, "watch task join failed");
        }

        info!("gpsd watch stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::FieldValue;
    use crate::report::{AttReport, GstReport, PpsReport, Satellite, SkyReport, TpvReport};
    use crate::sink::MemorySink;

    fn sky_report() -> Report {
        Report::Sky(SkyReport {
            device: "GPS1".to_string(),
            satellites: vec![
                Satellite {
                    used: true,
                    ..Satellite::default()
                },
                Satellite::default(),
            ],
            ..SkyReport::default()
        })
    }

    fn wired(cfg: &Config) -> (Dispatch, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let sink_dyn: Arc<dyn Sink> = Arc::clone(&sink) as Arc<dyn Sink>;
        let mut dispatch = Dispatch::new();
        register_callbacks(&mut dispatch, cfg, &sink_dyn);
        (dispatch, sink)
    }

    #[test]
    fn test_sky_both_flags_emit_two_records() {
        let cfg = Config {
            gather_satcount: true,
            gather_sky: true,
            ..Config::default()
        };
        let (dispatch, sink) = wired(&cfg);

        dispatch.dispatch(&sky_report());

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "gpsd_satcount");
        assert_eq!(records[1].name, "gpsd_sky");
    }

    #[test]
    fn test_sky_single_flag_emits_one_record() {
        for (satcount, sky, expected) in [(true, false, "gpsd_satcount"), (false, true, "gpsd_sky")]
        {
            let cfg = Config {
                gather_satcount: satcount,
                gather_sky: sky,
                ..Config::default()
            };
            let (dispatch, sink) = wired(&cfg);

            dispatch.dispatch(&sky_report());

            let records = sink.records();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].name, expected);
        }
    }

    #[test]
    fn test_sky_no_flags_registers_nothing() {
        let cfg = Config {
            gather_satcount: false,
            gather_sky: false,
            ..Config::default()
        };
        let (dispatch, sink) = wired(&cfg);

        assert!(dispatch.is_empty());
        dispatch.dispatch(&sky_report());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_all_kinds_registered_when_enabled() {
        let cfg = Config {
            gather_satcount: true,
            gather_sky: true,
            gather_tpv: true,
            gather_gst: true,
            gather_att: true,
            gather_pps: true,
            ..Config::default()
        };
        let (dispatch, sink) = wired(&cfg);
        // SKY shares one registration point for two emissions.
        assert_eq!(dispatch.len(), 5);

        dispatch.dispatch(&sky_report());
        dispatch.dispatch(&Report::Tpv(TpvReport::default()));
        dispatch.dispatch(&Report::Gst(GstReport::default()));
        dispatch.dispatch(&Report::Att(AttReport::default()));
        dispatch.dispatch(&Report::Pps(PpsReport::default()));

        let names: Vec<String> = sink.records().into_iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "gpsd_satcount",
                "gpsd_sky",
                "gpsd_tpv",
                "gpsd_gst",
                "gpsd_att",
                "gpsd_pps",
            ],
        );
    }

    #[test]
    fn test_disabled_kinds_are_not_registered() {
        let cfg = Config::default(); // satcount only
        let (dispatch, sink) = wired(&cfg);
        assert_eq!(dispatch.len(), 1);

        assert!(!dispatch.dispatch(&Report::Tpv(TpvReport::default())));
        assert!(!dispatch.dispatch(&Report::Pps(PpsReport::default())));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_records_forwarded_in_dispatch_order() {
        let cfg = Config {
            gather_satcount: false,
            gather_tpv: true,
            ..Config::default()
        };
        let (dispatch, sink) = wired(&cfg);

        for mode in 0..4 {
            dispatch.dispatch(&Report::Tpv(TpvReport {
                mode,
                ..TpvReport::default()
            }));
        }

        let records = sink.records();
        assert_eq!(records.len(), 4);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.field("mode"), Some(&FieldValue::Integer(i as i64)));
        }
    }

    #[test]
    fn test_sink_write_failure_does_not_stop_dispatch() {
        struct FailingSink;

        impl Sink for FailingSink {
            fn name(&self) -> &str {
                "failing"
            }

            fn write(
                &self,
                _name: &str,
                _fields: &[(&'static str, FieldValue)],
                _tags: &[(String, String)],
            ) -> anyhow::Result<()> {
                anyhow::bail!("sink unavailable")
            }
        }

        let cfg = Config {
            gather_tpv: true,
            ..Config::default()
        };
        let sink: Arc<dyn Sink> = Arc::new(FailingSink);
        let mut dispatch = Dispatch::new();
        register_callbacks(&mut dispatch, &cfg, &sink);

        // Both dispatches run to completion despite write failures.
        assert!(dispatch.dispatch(&Report::Tpv(TpvReport::default())));
        assert!(dispatch.dispatch(&Report::Tpv(TpvReport::default())));
    }
}
