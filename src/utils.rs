/// Unit conversions and time helpers shared by the pipeline
use time::{format_description, OffsetDateTime};

/// Round to one decimal place, halves away from zero
pub fn round10(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert degrees Fahrenheit to degrees Celsius, one decimal place
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    round10((fahrenheit - 32.0) / 1.8)
}

/// Convert miles per hour to metres per second, one decimal place
pub fn mph_to_ms(mph: f64) -> f64 {
    round10(mph * 0.44704)
}

/// Convert inches to millimetres, one decimal place
pub fn inches_to_mm(inches: f64) -> f64 {
    round10(inches * 25.4)
}

/// Current wall clock time as epoch seconds
pub fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Format an epoch timestamp for human-readable logging
///
/// Produces DD.MM.YYYY - HH:MM:SS (UTC). Falls back to the raw number if the
/// timestamp is out of range or formatting fails.
pub fn format_epoch(epoch: i64) -> String {
    let dt = match OffsetDateTime::from_unix_timestamp(epoch) {
        Ok(dt) => dt,
        Err(_) => return epoch.to_string(),
    };
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}
