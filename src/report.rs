use std::time::SystemTime;

use serde::Deserialize;

/// ReportKind classifies the gpsd report events this collector understands.
/// The discriminants match the `class` tag on the gpsd JSON wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Sky,
    Tpv,
    Gst,
    Att,
    Pps,
}

/// All report kinds, in registration order.
pub const ALL_KINDS: [ReportKind; 5] = [
    ReportKind::Sky,
    ReportKind::Tpv,
    ReportKind::Gst,
    ReportKind::Att,
    ReportKind::Pps,
];

impl ReportKind {
    /// Returns the gpsd wire class tag for this kind.
    pub const fn class(self) -> &'static str {
        match self {
            Self::Sky => "SKY",
            Self::Tpv => "TPV",
            Self::Gst => "GST",
            Self::Att => "ATT",
            Self::Pps => "PPS",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.class())
    }
}

/// One parsed report event from the daemon, tagged by kind.
///
/// Reports are produced upstream, dispatched to at most one callback, and
/// never retained past that callback invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "class")]
pub enum Report {
    #[serde(rename = "SKY")]
    Sky(SkyReport),
    #[serde(rename = "TPV")]
    Tpv(TpvReport),
    #[serde(rename = "GST")]
    Gst(GstReport),
    #[serde(rename = "ATT")]
    Att(AttReport),
    #[serde(rename = "PPS")]
    Pps(PpsReport),
}

impl Report {
    /// Returns the kind tag used for callback dispatch.
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Sky(_) => ReportKind::Sky,
            Self::Tpv(_) => ReportKind::Tpv,
            Self::Gst(_) => ReportKind::Gst,
            Self::Att(_) => ReportKind::Att,
            Self::Pps(_) => ReportKind::Pps,
        }
    }
}

/// Parses one line of the gpsd JSON stream into a report.
///
/// gpsd interleaves non-report classes (VERSION, DEVICES, WATCH, ...) into
/// the same stream; those, and anything malformed, yield `None`.
pub fn parse_line(line: &str) -> Option<Report> {
    serde_json::from_str(line).ok()
}

/// A single satellite entry inside a SKY report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Satellite {
    #[serde(rename = "PRN", default)]
    pub prn: i64,
    #[serde(default)]
    pub az: f64,
    #[serde(default)]
    pub el: f64,
    #[serde(default)]
    pub ss: f64,
    #[serde(default)]
    pub used: bool,
}

/// Satellite sky view: the visible constellation plus dilution of precision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkyReport {
    #[serde(default)]
    pub device: String,
    #[serde(default, with = "humantime_serde")]
    pub time: Option<SystemTime>,
    #[serde(default)]
    pub xdop: f64,
    #[serde(default)]
    pub ydop: f64,
    #[serde(default)]
    pub vdop: f64,
    #[serde(default)]
    pub tdop: f64,
    #[serde(default)]
    pub hdop: f64,
    #[serde(default)]
    pub pdop: f64,
    #[serde(default)]
    pub gdop: f64,
    #[serde(default)]
    pub satellites: Vec<Satellite>,
}

/// Time-position-velocity fix with per-axis error estimates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TpvReport {
    #[serde(default)]
    pub device: String,
    #[serde(default, with = "humantime_serde")]
    pub time: Option<SystemTime>,
    /// Fix mode: 0 unknown, 1 no fix, 2 2D, 3 3D.
    #[serde(default)]
    pub mode: i64,
    #[serde(default)]
    pub ept: f64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
    #[serde(default)]
    pub epx: f64,
    #[serde(default)]
    pub epy: f64,
    #[serde(default)]
    pub epv: f64,
    #[serde(default)]
    pub track: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub climb: f64,
    #[serde(default)]
    pub epd: f64,
    #[serde(default)]
    pub eps: f64,
    #[serde(default)]
    pub epc: f64,
}

/// Pseudorange noise statistics: error ellipse and position residuals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GstReport {
    #[serde(default)]
    pub device: String,
    #[serde(default, with = "humantime_serde")]
    pub time: Option<SystemTime>,
    #[serde(default)]
    pub rms: f64,
    #[serde(default)]
    pub major: f64,
    #[serde(default)]
    pub minor: f64,
    #[serde(default)]
    pub orient: f64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub alt: f64,
}

/// Vehicle attitude from magnetometer / accelerometer / gyro equipped devices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttReport {
    #[serde(default)]
    pub device: String,
    #[serde(default, with = "humantime_serde")]
    pub time: Option<SystemTime>,
    #[serde(default)]
    pub heading: f64,
    #[serde(rename = "mag_st", default)]
    pub mag_st: String,
    #[serde(default)]
    pub pitch: f64,
    #[serde(rename = "pitch_st", default)]
    pub pitch_st: String,
    #[serde(default)]
    pub yaw: f64,
    #[serde(rename = "yaw_st", default)]
    pub yaw_st: String,
    #[serde(default)]
    pub roll: f64,
    #[serde(rename = "roll_st", default)]
    pub roll_st: String,
    #[serde(default)]
    pub dip: f64,
    #[serde(rename = "mag_len", default)]
    pub mag_len: f64,
    #[serde(rename = "mag_x", default)]
    pub mag_x: f64,
    #[serde(rename = "mag_y", default)]
    pub mag_y: f64,
    #[serde(rename = "mag_z", default)]
    pub mag_z: f64,
    #[serde(rename = "acc_len", default)]
    pub acc_len: f64,
    #[serde(rename = "acc_x", default)]
    pub acc_x: f64,
    #[serde(rename = "acc_y", default)]
    pub acc_y: f64,
    #[serde(rename = "acc_z", default)]
    pub acc_z: f64,
    #[serde(rename = "gyro_x", default)]
    pub gyro_x: f64,
    #[serde(rename = "gyro_y", default)]
    pub gyro_y: f64,
    #[serde(default)]
    pub depth: f64,
    #[serde(rename = "temp", default)]
    pub temperature: f64,
}

/// Pulse-per-second timing edge. Carries no report timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PpsReport {
    #[serde(default)]
    pub device: String,
    #[serde(rename = "real_sec", default)]
    pub real_sec: i64,
    #[serde(rename = "real_musec", default)]
    pub real_musec: i64,
    #[serde(rename = "clock_sec", default)]
    pub clock_sec: i64,
    #[serde(rename = "clock_musec", default)]
    pub clock_musec: i64,
}
