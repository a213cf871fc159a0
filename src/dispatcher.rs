/// Routing of decoded RF records to the air and sky paths
use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use thiserror::Error;

use crate::accumulator::{merge_air, merge_sky};
use crate::broadcast::ObservationPacket;
use crate::bus::{BusProvider, TransducerDriver};
use crate::models::{Observations, RecordFields};

/// Message carrying temperature and humidity
pub const AIR_MESSAGE_TYPE: i64 = 56;
/// Message carrying wind direction and rainfall
pub const SKY_MESSAGE_TYPE: i64 = 49;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("record has no recognised fields")]
    Empty,
}

/// Decode one line of RF decoder output.
///
/// Leading whitespace and a trailing carriage return are ignored.
pub fn decode_record(line: &str) -> Result<RecordFields, RecordError> {
    let fields: RecordFields = serde_json::from_str(line.trim())?;
    if fields.is_empty() {
        return Err(RecordError::Empty);
    }
    Ok(fields)
}

/// Which path a record takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Air,
    Sky,
    Unknown(i64),
}

impl Route {
    pub fn classify(message_type: i64) -> Self {
        match message_type {
            AIR_MESSAGE_TYPE => Route::Air,
            SKY_MESSAGE_TYPE => Route::Sky,
            other => Route::Unknown(other),
        }
    }
}

/// Local transducers to consult on each path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Augmentation {
    pub pressure: bool,
    pub light: bool,
}

pub struct Dispatcher<B, D> {
    transducers: TransducerDriver<B, D>,
    augmentation: Augmentation,
}

impl<B: BusProvider, D: DelayNs> Dispatcher<B, D> {
    pub fn new(transducers: TransducerDriver<B, D>, augmentation: Augmentation) -> Self {
        Dispatcher {
            transducers,
            augmentation,
        }
    }

    /// Decode and dispatch one input line
    pub fn handle_line(
        &mut self,
        observations: &mut Observations,
        line: &str,
        now: i64,
    ) -> Option<ObservationPacket> {
        if line.trim().is_empty() {
            return None;
        }

        match decode_record(line) {
            Ok(fields) => self.dispatch(observations, &fields, now),
            Err(e) => {
                warn!("Skipping record: {}", e);
                None
            }
        }
    }

    /// Merge a decoded record into the matching running observation and
    /// build the packet to publish.
    ///
    /// Returns `None` for repeated transmissions, records without a message
    /// type and unknown message types; those leave all state untouched.
    pub fn dispatch(
        &mut self,
        observations: &mut Observations,
        fields: &RecordFields,
        now: i64,
    ) -> Option<ObservationPacket> {
        // The station sends every message several times; only the first counts
        if matches!(fields.sequence_num, Some(sequence) if sequence != 0) {
            return None;
        }

        let message_type = match fields.message_type {
            Some(message_type) => message_type,
            None => {
                debug!("Record without message_type: {:?}", fields);
                return None;
            }
        };

        match Route::classify(message_type) {
            Route::Air => {
                debug!("type: {} (air)", message_type);
                merge_air(&mut observations.air, fields, now);
                if self.augmentation.pressure {
                    self.update_pressure(observations);
                }
                Some(ObservationPacket::air(&observations.air))
            }
            Route::Sky => {
                debug!("type: {} (sky)", message_type);
                merge_sky(&mut observations.sky, fields, now);
                if self.augmentation.light {
                    self.update_illuminance(observations);
                }
                Some(ObservationPacket::sky(&observations.sky))
            }
            Route::Unknown(other) => {
                warn!("Ignoring message type {}: {:?}", other, fields);
                None
            }
        }
    }

    fn update_pressure(&mut self, observations: &mut Observations) {
        match self.transducers.read_pressure() {
            Ok(reading) => observations.air.pressure = reading.pressure_hpa,
            Err(e) => warn!(
                "Pressure read failed, keeping {:.1} hPa: {}",
                observations.air.pressure, e
            ),
        }
    }

    fn update_illuminance(&mut self, observations: &mut Observations) {
        match self.transducers.read_illuminance() {
            Ok(lux) => observations.sky.illuminance = lux,
            Err(e) => warn!(
                "Illuminance read failed, keeping {} lux: {}",
                observations.sky.illuminance, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::bmp280::{self, tests::DATASHEET_BLOCK, tests::DATASHEET_DATA};
    use crate::bus::fake::{FakeBus, NoDelay};
    use crate::bus::tsl2561;
    use crate::models::PLACEHOLDER_PRESSURE_HPA;
    use serde_json::json;

    const START: i64 = 1_700_000_000;

    fn dispatcher(bus: &FakeBus, augmentation: Augmentation) -> Dispatcher<FakeBus, NoDelay> {
        let driver = TransducerDriver::new(
            bus.clone(),
            NoDelay::default(),
            bmp280::DEFAULT_ADDRESS,
            tsl2561::DEFAULT_ADDRESS,
        );
        Dispatcher::new(driver, augmentation)
    }

    #[test]
    fn air_record_end_to_end() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(&bus, Augmentation::default());
        let mut observations = Observations::new(START);

        let line = r#"{"time":"2023-11-14 22:13:20","model":"Acurite-5n1","message_type":56,"sequence_num":0,"sensor_id":12,"battery":"OK","wind_speed_mph":3.193,"temperature_F":54.5,"humidity":53}"#;
        let packet = dispatcher
            .handle_line(&mut observations, line, START + 18)
            .unwrap();

        assert_eq!(packet.serial_number, "ACU-12");
        assert_eq!(packet.kind, "obs_air");
        let values = &packet.obs[0];
        assert_eq!(values[0], json!(START + 18));
        assert_eq!(values[1], json!(PLACEHOLDER_PRESSURE_HPA));
        assert_eq!(values[2], json!(12.5));
        assert_eq!(values[3], json!(53));
        assert_eq!(values[6], json!(3));
        assert_eq!(values[7], json!(18));
        // no bus traffic when no transducer is enabled
        assert_eq!(bus.opens(), 0);
    }

    #[test]
    fn sky_record_routes_to_sky() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(&bus, Augmentation::default());
        let mut observations = Observations::new(START);
        let before_air = observations.air.clone();

        let line = r#"{"message_type":49,"sensor_id":3,"battery":"OK","wind_speed_mph":10.0,"wind_dir_deg":292.5,"rainfall_accumulation_inch":0.02}"#;
        let packet = dispatcher
            .handle_line(&mut observations, line, START + 1)
            .unwrap();

        assert_eq!(packet.kind, "obs_sky");
        assert_eq!(observations.sky.wind_speed, 4.5);
        assert_eq!(observations.sky.gust_speed, 4.5);
        assert_eq!(observations.sky.wind_direction, 292.5);
        assert_eq!(observations.sky.rainfall, 0.5);
        assert_eq!(observations.sky.precip_type, 1);
        assert_eq!(observations.air, before_air);
    }

    #[test]
    fn repeated_transmission_is_ignored() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(
            &bus,
            Augmentation {
                pressure: true,
                light: true,
            },
        );
        let mut observations = Observations::new(START);
        let before = observations.clone();

        for line in [
            r#"{"message_type":56,"sequence_num":1,"temperature_F":80.0}"#,
            r#"{"message_type":49,"sequence_num":2,"wind_speed_mph":20.0}"#,
        ] {
            assert!(dispatcher
                .handle_line(&mut observations, line, START + 5)
                .is_none());
        }
        assert_eq!(observations, before);
        assert_eq!(bus.opens(), 0);
    }

    #[test]
    fn unknown_message_type_is_ignored() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(&bus, Augmentation::default());
        let mut observations = Observations::new(START);
        let before = observations.clone();

        let packet = dispatcher.handle_line(
            &mut observations,
            r#"{"message_type":99,"temperature_F":80.0}"#,
            START + 5,
        );

        assert!(packet.is_none());
        assert_eq!(observations, before);
    }

    #[test]
    fn malformed_and_blank_lines_are_skipped() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(&bus, Augmentation::default());
        let mut observations = Observations::new(START);
        let before = observations.clone();

        for line in [
            "",
            "   \r",
            "not json",
            r#"{"message_type":56,"#,
            r#"{"model":"other"}"#,
            r#"{"temperature_F":70.0}"#,
            r#"{"message_type":56,"temperature_F":"hot"}"#,
        ] {
            assert!(dispatcher
                .handle_line(&mut observations, line, START + 5)
                .is_none());
        }
        assert_eq!(observations, before);
    }

    #[test]
    fn tolerates_leading_whitespace_and_carriage_return() {
        let bus = FakeBus::default();
        let mut dispatcher = dispatcher(&bus, Augmentation::default());
        let mut observations = Observations::new(START);

        let packet = dispatcher.handle_line(
            &mut observations,
            "  \t{\"message_type\":56,\"humidity\":40}\r",
            START + 1,
        );
        assert!(packet.is_some());
        assert_eq!(observations.air.humidity, 40.0);
    }

    #[test]
    fn decode_record_distinguishes_failures() {
        assert!(matches!(decode_record("{]"), Err(RecordError::Parse(_))));
        assert!(matches!(decode_record("{}"), Err(RecordError::Empty)));
        assert!(decode_record(r#"{"sequence_num":0}"#).is_ok());
    }

    #[test]
    fn air_path_reads_pressure_transducer() {
        let bus = FakeBus::default();
        bus.set_register(bmp280::DEFAULT_ADDRESS, bmp280::REG_CALIBRATION, &DATASHEET_BLOCK);
        bus.set_register(bmp280::DEFAULT_ADDRESS, bmp280::REG_DATA, &DATASHEET_DATA);
        let mut dispatcher = dispatcher(
            &bus,
            Augmentation {
                pressure: true,
                light: false,
            },
        );
        let mut observations = Observations::new(START);

        dispatcher
            .handle_line(&mut observations, r#"{"message_type":56}"#, START + 1)
            .unwrap();

        assert!((observations.air.pressure - 1006.5).abs() < 0.1);
    }

    #[test]
    fn failed_pressure_read_keeps_previous_value() {
        let bus = FakeBus::default();
        bus.set_fail_open(true);
        let mut dispatcher = dispatcher(
            &bus,
            Augmentation {
                pressure: true,
                light: false,
            },
        );
        let mut observations = Observations::new(START);

        let packet = dispatcher
            .handle_line(&mut observations, r#"{"message_type":56}"#, START + 1)
            .unwrap();

        assert_eq!(observations.air.pressure, PLACEHOLDER_PRESSURE_HPA);
        assert_eq!(packet.obs[0][1], json!(PLACEHOLDER_PRESSURE_HPA));
    }

    #[test]
    fn sky_path_reads_light_transducer() {
        let bus = FakeBus::default();
        bus.set_register(
            tsl2561::DEFAULT_ADDRESS,
            tsl2561::REG_DATA,
            &[0x02, 0x03, 0x10, 0x00],
        );
        let mut dispatcher = dispatcher(
            &bus,
            Augmentation {
                pressure: false,
                light: true,
            },
        );
        let mut observations = Observations::new(START);

        let packet = dispatcher
            .handle_line(&mut observations, r#"{"message_type":49}"#, START + 1)
            .unwrap();
        assert_eq!(packet.obs[0][1], json!(754));

        // contention on the next record leaves the last value in place
        bus.set_fail_open(true);
        dispatcher
            .handle_line(&mut observations, r#"{"message_type":49}"#, START + 2)
            .unwrap();
        assert_eq!(observations.sky.illuminance, 754.0);
    }
}
