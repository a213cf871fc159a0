/// BMP280 pressure transducer: factory calibration and compensation math
///
/// The transducer reports 20-bit uncompensated temperature and pressure
/// counts. Converting them into physical units needs the 12 trimming
/// coefficients burned into the device at manufacture time. The formula is
/// the floating-point variant from the BMP280 datasheet (section 8.1).
use super::BusError;

pub const DEFAULT_ADDRESS: u8 = 0x76;

/// First register of the 24-byte calibration block (dig_T1 LSB)
pub const REG_CALIBRATION: u8 = 0x88;
pub const CALIBRATION_LEN: usize = 24;

/// ctrl_meas: normal mode, x1 temperature and pressure oversampling
pub const REG_CTRL_MEAS: u8 = 0xF4;
pub const CTRL_MEAS_NORMAL_X1: u8 = 0x27;

/// config: 1000 ms standby between conversions, filter off
pub const REG_CONFIG: u8 = 0xF5;
pub const CONFIG_STANDBY_1000MS: u8 = 0xA0;

/// press_msb .. temp_xlsb, followed by two unused bytes
pub const REG_DATA: u8 = 0xF7;
pub const DATA_LEN: usize = 8;

/// Time given to the transducer to complete a conversion
pub const SAMPLING_PERIOD_MS: u32 = 1000;

/// Factory trimming parameters (dig_T1..dig_T3, dig_P1..dig_P9)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationCoefficients {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    pub p5: f64,
    pub p6: f64,
    pub p7: f64,
    pub p8: f64,
    pub p9: f64,
}

impl CalibrationCoefficients {
    /// Decode the calibration block.
    ///
    /// All words are little-endian. dig_T1 and dig_P1 are unsigned, the other
    /// ten are two's complement.
    pub fn from_bytes(block: &[u8; CALIBRATION_LEN]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([block[i], block[i + 1]]) as f64;
        let signed = |i: usize| i16::from_le_bytes([block[i], block[i + 1]]) as f64;

        CalibrationCoefficients {
            t1: unsigned(0),
            t2: signed(2),
            t3: signed(4),
            p1: unsigned(6),
            p2: signed(8),
            p3: signed(10),
            p4: signed(12),
            p5: signed(14),
            p6: signed(16),
            p7: signed(18),
            p8: signed(20),
            p9: signed(22),
        }
    }
}

/// Uncompensated 20-bit conversion results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub pressure: u32,
    pub temperature: u32,
}

impl RawSample {
    /// Split the data registers into the two 20-bit counts.
    ///
    /// Each value spans msb, lsb and the top nibble of xlsb.
    pub fn from_bytes(data: &[u8; DATA_LEN]) -> Self {
        let assemble = |msb: u8, lsb: u8, xlsb: u8| {
            ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
        };

        RawSample {
            pressure: assemble(data[0], data[1], data[2]),
            temperature: assemble(data[3], data[4], data[5]),
        }
    }
}

/// Compensated reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    /// Station pressure, hPa
    pub pressure_hpa: f64,
    /// Die temperature of the transducer, °C
    pub temperature_c: f64,
}

/// Apply the datasheet compensation to a raw sample.
///
/// Returns station pressure; no sea-level reduction is done. A zero divisor
/// (blank or corrupt dig_P1) or a non-finite intermediate is an error.
pub fn compensate(
    cal: &CalibrationCoefficients,
    raw: RawSample,
) -> Result<PressureReading, BusError> {
    let adc_t = raw.temperature as f64;
    let adc_p = raw.pressure as f64;

    let var1 = (adc_t / 16384.0 - cal.t1 / 1024.0) * cal.t2;
    let var2 = (adc_t / 131072.0 - cal.t1 / 8192.0).powi(2) * cal.t3;
    let t_fine = var1 + var2;

    let var1 = t_fine / 2.0 - 64000.0;
    let var2 = var1 * var1 * cal.p6 / 32768.0 + var1 * cal.p5 * 2.0;
    let var2 = var2 / 4.0 + cal.p4 * 65536.0;
    let var1 = (cal.p3 * var1 * var1 / 524288.0 + cal.p2 * var1) / 524288.0;
    let var1 = (1.0 + var1 / 32768.0) * cal.p1;

    if var1 == 0.0 {
        return Err(BusError::Compensation(
            "pressure divisor is zero, calibration looks blank".to_string(),
        ));
    }

    let p = (1048576.0 - adc_p - var2 / 4096.0) * 6250.0 / var1;
    let pascal = p + (cal.p9 * p * p / 2147483648.0 + p * cal.p8 / 32768.0 + cal.p7) / 16.0;
    let pressure_hpa = pascal / 100.0;

    if !pressure_hpa.is_finite() {
        return Err(BusError::Compensation(format!(
            "non-finite pressure from raw sample {:?}",
            raw
        )));
    }

    Ok(PressureReading {
        pressure_hpa,
        temperature_c: t_fine / 5120.0,
    })
}
