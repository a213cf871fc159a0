use serde::Deserialize;

/// Station pressure reported until the pressure transducer delivers a reading
pub const PLACEHOLDER_PRESSURE_HPA: f64 = 998.3;

/// One decoded line from the RF decoder.
///
/// Every member is optional: a missing key means "not in this transmission",
/// which is different from a key that is present with a zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordFields {
    pub sequence_num: Option<i64>,
    pub message_type: Option<i64>,
    pub sensor_id: Option<i64>,
    pub battery: Option<String>,
    #[serde(rename = "temperature_F")]
    pub temperature_f: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub wind_dir_deg: Option<f64>,
    pub rainfall_accumulation_inch: Option<f64>,
}

impl RecordFields {
    /// True when none of the recognised keys were present
    pub fn is_empty(&self) -> bool {
        *self == RecordFields::default()
    }
}

/// Map the decoder's battery text onto the two-level score of the hub protocol
pub fn battery_score(battery: &str) -> f64 {
    if battery == "OK" {
        3.0
    } else {
        2.0
    }
}

/// Running temperature/humidity/pressure record
#[derive(Debug, Clone, PartialEq)]
pub struct AirObservation {
    pub sensor_id: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub battery: f64,
    pub time: i64,
    pub interval: i64,
}

impl AirObservation {
    pub fn new(now: i64) -> Self {
        AirObservation {
            sensor_id: 0,
            temperature: 0.0,
            humidity: 0.0,
            pressure: PLACEHOLDER_PRESSURE_HPA,
            battery: 0.0,
            time: now,
            interval: 0,
        }
    }
}

/// Running wind/rain/light record
#[derive(Debug, Clone, PartialEq)]
pub struct SkyObservation {
    pub sensor_id: i64,
    pub wind_speed: f64,
    pub gust_speed: f64,
    pub wind_direction: f64,
    pub rainfall: f64,
    pub illuminance: f64,
    /// 0 = none, 1 = rain
    pub precip_type: u8,
    pub battery: f64,
    pub time: i64,
    pub interval: i64,
}

impl SkyObservation {
    pub fn new(now: i64) -> Self {
        SkyObservation {
            sensor_id: 0,
            wind_speed: 0.0,
            gust_speed: 0.0,
            wind_direction: 0.0,
            rainfall: 0.0,
            illuminance: 0.0,
            precip_type: 0,
            battery: 0.0,
            time: now,
            interval: 0,
        }
    }
}

/// The two running records, owned by the main loop and lent to the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    pub air: AirObservation,
    pub sky: SkyObservation,
}

impl Observations {
    pub fn new(now: i64) -> Self {
        Observations {
            air: AirObservation::new(now),
            sky: SkyObservation::new(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_only_present_keys() {
        let fields: RecordFields =
            serde_json::from_str(r#"{"message_type":56,"humidity":0,"model":"Acurite-5n1"}"#)
                .unwrap();

        assert_eq!(fields.message_type, Some(56));
        assert_eq!(fields.humidity, Some(0.0));
        assert_eq!(fields.temperature_f, None);
        assert!(!fields.is_empty());
    }

    #[test]
    fn unrecognised_object_is_empty() {
        let fields: RecordFields = serde_json::from_str(r#"{"model":"x","id":3}"#).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn battery_text_maps_to_two_levels() {
        assert_eq!(battery_score("OK"), 3.0);
        assert_eq!(battery_score("LOW"), 2.0);
        assert_eq!(battery_score(""), 2.0);
    }

    #[test]
    fn fresh_records_start_at_process_time() {
        let obs = Observations::new(1_700_000_000);
        assert_eq!(obs.air.time, 1_700_000_000);
        assert_eq!(obs.sky.time, 1_700_000_000);
        assert_eq!(obs.air.pressure, PLACEHOLDER_PRESSURE_HPA);
        assert_eq!(obs.sky.precip_type, 0);
    }
}
