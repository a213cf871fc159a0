/// Hub UDP observation packets
///
/// Observations travel as a single positional array inside `obs`. Values have
/// no names, so the order below is the protocol. Channels the RF station does
/// not have are sent as literal zeros.
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{AirObservation, SkyObservation};

pub const SERIAL_PREFIX: &str = "ACU-";
pub const HUB_SERIAL: &str = "5n1";
pub const FIRMWARE_REVISION: u32 = 17;
pub const AIR_TYPE: &str = "obs_air";
pub const SKY_TYPE: &str = "obs_sky";

/// Whole numbers go out without a fraction (`53`, not `53.0`), as hub
/// firmware prints them
fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationPacket {
    pub serial_number: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub hub_sn: &'static str,
    pub obs: Vec<Vec<Value>>,
    pub firmware_revision: u32,
}

impl ObservationPacket {
    fn new(sensor_id: i64, kind: &'static str, values: Vec<Value>) -> Self {
        ObservationPacket {
            serial_number: format!("{}{}", SERIAL_PREFIX, sensor_id),
            kind,
            hub_sn: HUB_SERIAL,
            obs: vec![values],
            firmware_revision: FIRMWARE_REVISION,
        }
    }

    pub fn air(air: &AirObservation) -> Self {
        Self::new(
            air.sensor_id,
            AIR_TYPE,
            vec![
                json!(air.time),
                number(air.pressure),
                number(air.temperature),
                number(air.humidity),
                json!(0), // lightning strike count
                json!(0), // lightning strike average distance
                number(air.battery),
                json!(air.interval),
            ],
        )
    }

    pub fn sky(sky: &SkyObservation) -> Self {
        Self::new(
            sky.sensor_id,
            SKY_TYPE,
            vec![
                json!(sky.time),
                number(sky.illuminance),
                json!(0), // UV
                number(sky.rainfall),
                json!(0), // wind lull
                number(sky.wind_speed),
                number(sky.gust_speed),
                number(sky.wind_direction),
                number(sky.battery),
                json!(sky.interval),
                json!(0), // solar radiation
                json!(0), // local day rain
                json!(sky.precip_type),
                json!(0), // wind sample interval
            ],
        )
    }

    /// Pretty-printed JSON text as put on the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
