/// Local transducers on the I2C bus: BMP280 pressure and TSL2561 light
///
/// Every read is a self-contained bus session. The device node is opened,
/// the registers are exchanged and the handle is dropped, so other processes
/// can use the bus between records. Failures are reported to the caller,
/// which keeps the previous value.
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use linux_embedded_hal::I2cdev;
use log::debug;
use std::path::PathBuf;
use thiserror::Error;

pub mod bmp280;
pub mod tsl2561;

use bmp280::{CalibrationCoefficients, PressureReading, RawSample};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("cannot open {path}: {details}")]
    Open { path: String, details: String },

    #[error("{operation} failed: {details}")]
    Transfer {
        operation: &'static str,
        details: String,
    },

    #[error("calibration unavailable: {0}")]
    Calibration(String),

    #[error("compensation failed: {0}")]
    Compensation(String),
}

fn transfer_error<E: embedded_hal::i2c::Error>(operation: &'static str, e: E) -> BusError {
    BusError::Transfer {
        operation,
        details: format!("{:?}", e.kind()),
    }
}

/// Hands out a fresh bus handle for a single operation
pub trait BusProvider {
    type Device: I2c;

    fn open(&self) -> Result<Self::Device, BusError>;
}

/// `/dev/i2c-N` character device
#[derive(Debug, Clone)]
pub struct LinuxI2cBus {
    path: PathBuf,
}

impl LinuxI2cBus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LinuxI2cBus { path: path.into() }
    }
}

impl BusProvider for LinuxI2cBus {
    type Device = I2cdev;

    fn open(&self) -> Result<I2cdev, BusError> {
        I2cdev::new(&self.path).map_err(|e| BusError::Open {
            path: self.path.display().to_string(),
            details: e.to_string(),
        })
    }
}

/// One-shot readings from the local transducers.
///
/// Owns the BMP280 calibration cache: it is filled by the first successful
/// calibration read and reused for the lifetime of the driver.
pub struct TransducerDriver<B, D> {
    bus: B,
    delay: D,
    pressure_address: u8,
    light_address: u8,
    calibration: Option<CalibrationCoefficients>,
}

impl<B: BusProvider, D: DelayNs> TransducerDriver<B, D> {
    pub fn new(bus: B, delay: D, pressure_address: u8, light_address: u8) -> Self {
        TransducerDriver {
            bus,
            delay,
            pressure_address,
            light_address,
            calibration: None,
        }
    }

    #[cfg(test)]
    pub fn calibration(&self) -> Option<&CalibrationCoefficients> {
        self.calibration.as_ref()
    }

    /// Visible light estimate in lux from a single TSL2561 integration
    pub fn read_illuminance(&mut self) -> Result<f64, BusError> {
        let address = self.light_address;
        let mut device = self.bus.open()?;

        device
            .write(address, &[tsl2561::REG_CONTROL, tsl2561::POWER_ON])
            .map_err(|e| transfer_error("light power on", e))?;
        device
            .write(address, &[tsl2561::REG_TIMING, tsl2561::INTEGRATE_402MS])
            .map_err(|e| transfer_error("light integration select", e))?;

        self.delay.delay_ms(tsl2561::INTEGRATION_PERIOD_MS);

        let mut data = [0u8; tsl2561::DATA_LEN];
        device
            .write_read(address, &[tsl2561::REG_DATA], &mut data)
            .map_err(|e| transfer_error("light channel read", e))?;

        let lux = tsl2561::visible_lux(&data);
        debug!("TSL2561: channels {:?} -> {} lux", data, lux);
        Ok(lux)
    }

    /// Station pressure from a single BMP280 conversion.
    ///
    /// Reads the calibration block first if it is not cached yet; when that
    /// fails no measurement is attempted.
    pub fn read_pressure(&mut self) -> Result<PressureReading, BusError> {
        let calibration = self.ensure_calibration()?;
        let address = self.pressure_address;
        let mut device = self.bus.open()?;

        device
            .write(address, &[bmp280::REG_CTRL_MEAS, bmp280::CTRL_MEAS_NORMAL_X1])
            .map_err(|e| transfer_error("pressure mode select", e))?;
        device
            .write(address, &[bmp280::REG_CONFIG, bmp280::CONFIG_STANDBY_1000MS])
            .map_err(|e| transfer_error("pressure standby select", e))?;

        self.delay.delay_ms(bmp280::SAMPLING_PERIOD_MS);

        let mut data = [0u8; bmp280::DATA_LEN];
        device
            .write_read(address, &[bmp280::REG_DATA], &mut data)
            .map_err(|e| transfer_error("pressure data read", e))?;

        let raw = RawSample::from_bytes(&data);
        let reading = bmp280::compensate(&calibration, raw)?;
        debug!(
            "BMP280: raw {:?} -> {:.2} hPa, {:.2}°C",
            raw, reading.pressure_hpa, reading.temperature_c
        );
        Ok(reading)
    }

    fn ensure_calibration(&mut self) -> Result<CalibrationCoefficients, BusError> {
        if let Some(calibration) = self.calibration {
            return Ok(calibration);
        }

        let mut device = self
            .bus
            .open()
            .map_err(|e| BusError::Calibration(e.to_string()))?;
        let mut block = [0u8; bmp280::CALIBRATION_LEN];
        device
            .write_read(self.pressure_address, &[bmp280::REG_CALIBRATION], &mut block)
            .map_err(|e| BusError::Calibration(format!("{:?}", e.kind())))?;

        let calibration = CalibrationCoefficients::from_bytes(&block);
        debug!("BMP280: calibration loaded {:?}", calibration);
        self.calibration = Some(calibration);
        Ok(calibration)
    }
}
