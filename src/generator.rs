//! generator.rs
//! Trace-driven event generation (§4.2): reads a CSV traffic trace and
//! expands each row into zero or more synthetic [`Event`]s with speeds
//! sampled around the row's average.

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::PipelineError;
use crate::model::Event;

/// 15-minute trace interval, in seconds.
pub const INTERVAL_SECS: i64 = 900;

/// Standard deviation of the per-event speed sample around the row's
/// average speed.
const SPEED_STDDEV: f64 = 7.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    pub sensor_id: i64,
    pub timestamp: i64,
    pub scans: u32,
    pub avg_speed: f64,
    pub devices: u32,
}

impl TraceRow {
    /// Parses one CSV record using the column layout in §6: 0 = sensor_id,
    /// 2..7 = year/month/day/hour/minute, 7 = scans, 8 = avg_speed,
    /// 11 = devices. A malformed row is a fatal error (§4.2): generator
    /// input is assumed trustworthy, unlike downstream wire traffic.
    pub fn parse(record: &csv::StringRecord) -> Result<Self, PipelineError> {
        let field = |idx: usize| -> Result<&str, PipelineError> {
            record.get(idx).ok_or_else(|| {
                PipelineError::fatal(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("trace row missing column {idx}"),
                ))
            })
        };

        let parse_int = |s: &str, what: &str| -> Result<i64, PipelineError> {
            s.parse::<i64>().map_err(|_| {
                PipelineError::fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid {what}: {s:?}")))
            })
        };

        let sensor_id = parse_int(field(0)?, "sensor_id")?;
        let year = parse_int(field(2)?, "year")?;
        let month = parse_int(field(3)?, "month")?;
        let day = parse_int(field(4)?, "day")?;
        let hour = parse_int(field(5)?, "hour")?;
        let minute = parse_int(field(6)?, "minute")?;
        let scans_raw = field(7)?.replace(',', "");
        let scans = scans_raw.parse::<u32>().map_err(|_| {
            PipelineError::fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid scans: {scans_raw:?}")))
        })?;
        let avg_speed_raw = field(8)?.replace(',', ".");
        let avg_speed = avg_speed_raw.parse::<f64>().map_err(|_| {
            PipelineError::fatal(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid avg_speed: {avg_speed_raw:?}"),
            ))
        })?;
        let devices = parse_int(field(11)?, "devices")? as u32;

        let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(|| {
            PipelineError::fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid calendar date"))
        })?;
        let naive_dt = date
            .and_hms_opt(hour as u32, minute as u32, 0)
            .ok_or_else(|| PipelineError::fatal(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid time of day")))?;
        let timestamp = naive_dt.and_utc().timestamp();

        Ok(TraceRow {
            sensor_id,
            timestamp,
            scans,
            avg_speed,
            devices,
        })
    }

    /// `max(1, ceil(scans / devices))`, or `1` if there are no devices.
    pub fn occurrences(&self) -> u32 {
        if self.devices == 0 {
            1
        } else {
            (self.scans.div_ceil(self.devices)).max(1)
        }
    }
}

/// Expands one trace row into its synthetic events, drawing speeds from
/// `Normal(avg_speed, SPEED_STDDEV^2)`. `next_event_id` is consumed
/// monotonically across the whole generator run and advanced in place.
pub fn expand_row<R: Rng>(row: &TraceRow, next_event_id: &mut u64, rng: &mut R) -> Vec<Event> {
    let occurrences = row.occurrences();
    let normal = Normal::new(row.avg_speed, SPEED_STDDEV).expect("stddev is a fixed positive constant");

    (0..occurrences)
        .map(|n| {
            let speed = normal.sample(rng);
            let offset = (n as i64 * INTERVAL_SECS) / occurrences as i64;
            let event = Event::new(row.sensor_id, *next_event_id, speed, row.timestamp + offset);
            *next_event_id += 1;
            event
        })
        .collect()
}
