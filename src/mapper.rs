//! Pure report-to-record field mapping.
//!
//! Each function translates one typed report into a flat metric record.
//! Mapping never fails: absent data degrades to an empty string or zero
//! sentinel and the record is still emitted. The metric names and field
//! keys produced here are a fixed compatibility contract with downstream
//! consumers and must not change.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::report::{AttReport, GstReport, PpsReport, SkyReport, TpvReport};

/// Base measurement name shared by all emitted records.
pub const MEASUREMENT: &str = "gpsd";

/// The six record emissions this collector can produce. SKY reports feed
/// two of them; every other report kind feeds exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    SatCount,
    Sky,
    Tpv,
    Gst,
    Att,
    Pps,
}

impl Emission {
    /// Returns the full metric name: base measurement plus kind suffix.
    pub const fn metric_name(self) -> &'static str {
        match self {
            Self::SatCount => "gpsd_satcount",
            Self::Sky => "gpsd_sky",
            Self::Tpv => "gpsd_tpv",
            Self::Gst => "gpsd_gst",
            Self::Att => "gpsd_att",
            Self::Pps => "gpsd_pps",
        }
    }
}

/// A single field value. Strings stay strings across the sink boundary;
/// `report_time` in particular is rendered as text to preserve exact
/// nanosecond precision.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// One flat metric record: a name plus an ordered field list.
///
/// Field order is fixed per emission so that mapping the same report twice
/// yields identical records.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: &'static str,
    pub fields: Vec<(&'static str, FieldValue)>,
}

/// Renders an optional report timestamp as base-10 nanoseconds since epoch.
/// An unset timestamp yields the empty string.
fn report_time(time: Option<SystemTime>) -> FieldValue {
    let rendered = match time {
        Some(t) => t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().to_string())
            .unwrap_or_default(),
        None => String::new(),
    };
    FieldValue::Text(rendered)
}

/// Maps a SKY report to the satellite-count record: satellites visible in
/// this report and how many of them are flagged as used in the fix.
pub fn satcount_record(sky: &SkyReport) -> MetricRecord {
    let used = sky.satellites.iter().filter(|sat| sat.used).count() as i64;
    let visible = sky.satellites.len() as i64;

    MetricRecord {
        name: Emission::SatCount.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(sky.device.clone())),
            ("report_time", report_time(sky.time)),
            ("visible", FieldValue::Integer(visible)),
            ("used", FieldValue::Integer(used)),
        ],
    }
}

/// Maps a SKY report to the dilution-of-precision record.
///
/// The capitalized field keys are inherited contract; downstream dashboards
/// key on them as-is.
pub fn sky_record(sky: &SkyReport) -> MetricRecord {
    MetricRecord {
        name: Emission::Sky.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(sky.device.clone())),
            ("report_time", report_time(sky.time)),
            ("Xdop", FieldValue::Float(sky.xdop)),
            ("Ydop", FieldValue::Float(sky.ydop)),
            ("Vdop", FieldValue::Float(sky.vdop)),
            ("Tdop", FieldValue::Float(sky.tdop)),
            ("Hdop", FieldValue::Float(sky.hdop)),
            ("Pdop", FieldValue::Float(sky.pdop)),
            ("Gdop", FieldValue::Float(sky.gdop)),
        ],
    }
}

/// Maps a TPV report to the time-position-velocity record.
pub fn tpv_record(tpv: &TpvReport) -> MetricRecord {
    MetricRecord {
        name: Emission::Tpv.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(tpv.device.clone())),
            ("report_time", report_time(tpv.time)),
            ("mode", FieldValue::Integer(tpv.mode)),
            ("ept", FieldValue::Float(tpv.ept)),
            ("lat", FieldValue::Float(tpv.lat)),
            ("lon", FieldValue::Float(tpv.lon)),
            ("alt", FieldValue::Float(tpv.alt)),
            ("epx", FieldValue::Float(tpv.epx)),
            ("epy", FieldValue::Float(tpv.epy)),
            ("epv", FieldValue::Float(tpv.epv)),
            ("track", FieldValue::Float(tpv.track)),
            ("speed", FieldValue::Float(tpv.speed)),
            ("climb", FieldValue::Float(tpv.climb)),
            ("epd", FieldValue::Float(tpv.epd)),
            ("eps", FieldValue::Float(tpv.eps)),
            ("epc", FieldValue::Float(tpv.epc)),
        ],
    }
}

/// Maps a GST report to the pseudorange-statistics record.
pub fn gst_record(gst: &GstReport) -> MetricRecord {
    MetricRecord {
        name: Emission::Gst.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(gst.device.clone())),
            ("report_time", report_time(gst.time)),
            ("rms", FieldValue::Float(gst.rms)),
            ("major", FieldValue::Float(gst.major)),
            ("minor", FieldValue::Float(gst.minor)),
            ("orient", FieldValue::Float(gst.orient)),
            ("lat", FieldValue::Float(gst.lat)),
            ("lon", FieldValue::Float(gst.lon)),
            ("alt", FieldValue::Float(gst.alt)),
        ],
    }
}

/// Maps an ATT report to the attitude record.
pub fn att_record(att: &AttReport) -> MetricRecord {
    MetricRecord {
        name: Emission::Att.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(att.device.clone())),
            ("report_time", report_time(att.time)),
            ("heading", FieldValue::Float(att.heading)),
            ("magst", FieldValue::Text(att.mag_st.clone())),
            ("pitch", FieldValue::Float(att.pitch)),
            ("pitchst", FieldValue::Text(att.pitch_st.clone())),
            ("yaw", FieldValue::Float(att.yaw)),
            ("yawst", FieldValue::Text(att.yaw_st.clone())),
            ("roll", FieldValue::Float(att.roll)),
            ("rollst", FieldValue::Text(att.roll_st.clone())),
            ("dip", FieldValue::Float(att.dip)),
            ("maglen", FieldValue::Float(att.mag_len)),
            ("magx", FieldValue::Float(att.mag_x)),
            ("magy", FieldValue::Float(att.mag_y)),
            ("magz", FieldValue::Float(att.mag_z)),
            ("acclen", FieldValue::Float(att.acc_len)),
            ("accx", FieldValue::Float(att.acc_x)),
            ("accy", FieldValue::Float(att.acc_y)),
            ("accz", FieldValue::Float(att.acc_z)),
            ("gyrox", FieldValue::Float(att.gyro_x)),
            ("gyroy", FieldValue::Float(att.gyro_y)),
            ("depth", FieldValue::Float(att.depth)),
            ("temperature", FieldValue::Float(att.temperature)),
        ],
    }
}

/// Maps a PPS report to the pulse-per-second record. PPS records carry no
/// `report_time` field at all.
pub fn pps_record(pps: &PpsReport) -> MetricRecord {
    MetricRecord {
        name: Emission::Pps.metric_name(),
        fields: vec![
            ("device", FieldValue::Text(pps.device.clone())),
            ("realsec", FieldValue::Integer(pps.real_sec)),
            ("realmusec", FieldValue::Integer(pps.real_musec)),
            ("clocksec", FieldValue::Integer(pps.clock_sec)),
            ("clockmusec", FieldValue::Integer(pps.clock_musec)),
        ],
    }
}
