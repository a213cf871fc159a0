/// Merging of partial RF records into the running air and sky observations
///
/// The outdoor unit spreads its readings over several message types, so each
/// record only carries some of the fields. Present fields overwrite the
/// running value; absent fields keep the last known value.
use crate::models::{battery_score, AirObservation, RecordFields, SkyObservation};
use crate::utils::{fahrenheit_to_celsius, inches_to_mm, mph_to_ms};

/// Advance the update time, never backwards if the wall clock steps back
fn stamp(time: &mut i64, interval: &mut i64, now: i64) {
    let now = now.max(*time);
    *interval = now - *time;
    *time = now;
}

/// Merge an air-type record into the running air observation
///
/// Pressure is left alone; it belongs to the pressure transducer.
pub fn merge_air(running: &mut AirObservation, fields: &RecordFields, now: i64) {
    if let Some(sensor_id) = fields.sensor_id {
        running.sensor_id = sensor_id;
    }
    if let Some(battery) = &fields.battery {
        running.battery = battery_score(battery);
    }
    if let Some(temperature_f) = fields.temperature_f {
        running.temperature = fahrenheit_to_celsius(temperature_f);
    }
    if let Some(humidity) = fields.humidity {
        running.humidity = humidity;
    }

    stamp(&mut running.time, &mut running.interval, now);
}

/// Merge a sky-type record into the running sky observation
pub fn merge_sky(running: &mut SkyObservation, fields: &RecordFields, now: i64) {
    if let Some(sensor_id) = fields.sensor_id {
        running.sensor_id = sensor_id;
    }
    if let Some(battery) = &fields.battery {
        running.battery = battery_score(battery);
    }
    if let Some(wind_speed_mph) = fields.wind_speed_mph {
        running.wind_speed = mph_to_ms(wind_speed_mph);
        // Gust is the running maximum for the lifetime of the process
        if running.wind_speed > running.gust_speed {
            running.gust_speed = running.wind_speed;
        }
    }
    if let Some(wind_dir_deg) = fields.wind_dir_deg {
        running.wind_direction = wind_dir_deg;
    }
    if let Some(rainfall_inch) = fields.rainfall_accumulation_inch {
        running.rainfall = inches_to_mm(rainfall_inch);
        if running.rainfall > 0.0 {
            running.precip_type = 1;
        }
    }

    stamp(&mut running.time, &mut running.interval, now);
}
