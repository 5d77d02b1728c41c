//! GNSS fix extraction from `AT+CGNSINF` replies.
//!
//! ```text
//! +CGNSINF: 1,1,20220212223745.000,-23.550000,-46.633300,591.395,0.00,,0,,1.0,1.4,0.9,,10,,3.6,4.0
//!           | | |                  |          |
//!           | | UTC date & time    latitude   longitude
//!           | fix status
//!           GNSS run status
//! ```

use heapless::String;
use serde::Serialize;

use crate::response::{info_line, Fields};

pub const GNSS_INFO_PREFIX: &str = "+CGNSINF:";

/// Run status reported while the GNSS engine is powered
pub const GNSS_RUNNING: &str = "1";
/// Fix status reported once a position is known
pub const FIX_VALID: &str = "1";

/// Length of the `yyyyMMddhhmmss.sss` UTC field of a synchronized receiver
pub const TIMESTAMP_LEN: usize = 18;

const RUN_STATUS: usize = 0;
const FIX_STATUS: usize = 1;
const UTC_TIME: usize = 2;
const LATITUDE: usize = 3;
const LONGITUDE: usize = 4;

/// Longest latitude/longitude field kept
pub const COORDINATE_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fix {
    pub year: String<4>,
    pub month: String<2>,
    pub day: String<2>,
    /// `hhmmss`
    pub time: String<6>,
    /// Decimal degrees, as reported
    pub latitude: String<COORDINATE_LEN>,
    /// Decimal degrees, as reported
    pub longitude: String<COORDINATE_LEN>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixOutcome {
    Valid(Fix),
    /// GNSS is running but has not synchronized its time yet
    Acquiring,
    /// Not a GNSS info reply, GNSS is not running, or it has no position
    NotApplicable,
}

/// Parse a GNSS info reply. `line` may be a whole response frame, the
/// `+CGNSINF:` line is looked up within it.
pub fn parse_fix(line: &str) -> FixOutcome {
    let Some(body) = info_line(line, GNSS_INFO_PREFIX) else {
        return FixOutcome::NotApplicable;
    };

    let fields = Fields::new(body);
    if fields.get(RUN_STATUS).map(str::trim) != Some(GNSS_RUNNING) {
        return FixOutcome::NotApplicable;
    }

    let timestamp = fields.get(UTC_TIME).unwrap_or_default();
    if timestamp.len() != TIMESTAMP_LEN {
        return FixOutcome::Acquiring;
    }

    // Time synchronized, but no position yet
    if fields.get(FIX_STATUS).map(str::trim) != Some(FIX_VALID) {
        return FixOutcome::NotApplicable;
    }

    decode(
        timestamp,
        fields.get(LATITUDE).unwrap_or_default(),
        fields.get(LONGITUDE).unwrap_or_default(),
    )
    .map_or(FixOutcome::Acquiring, FixOutcome::Valid)
}

fn decode(timestamp: &str, latitude: &str, longitude: &str) -> Option<Fix> {
    let digits = timestamp.get(0..14)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(Fix {
        year: String::try_from(&digits[0..4]).ok()?,
        month: String::try_from(&digits[4..6]).ok()?,
        day: String::try_from(&digits[6..8]).ok()?,
        time: String::try_from(&digits[8..14]).ok()?,
        latitude: String::try_from(latitude).ok()?,
        longitude: String::try_from(longitude).ok()?,
    })
}
