/// TSL2561 light-to-digital converter registers and count decoding
pub const DEFAULT_ADDRESS: u8 = 0x39;

// Every register access carries the command bit
const COMMAND: u8 = 0x80;

/// Control register, power up
pub const REG_CONTROL: u8 = COMMAND;
pub const POWER_ON: u8 = 0x03;

/// Timing register, 402 ms integration at 1x gain
pub const REG_TIMING: u8 = COMMAND | 0x01;
pub const INTEGRATE_402MS: u8 = 0x02;

/// DATA0LOW, read as DATA0LOW DATA0HIGH DATA1LOW DATA1HIGH
pub const REG_DATA: u8 = COMMAND | 0x0C;
pub const DATA_LEN: usize = 4;

/// Wait after selecting the integration time, rounded up to a full second
pub const INTEGRATION_PERIOD_MS: u32 = 1000;

/// Visible light estimate from the two channel counts.
///
/// Channel 0 sees the full spectrum and channel 1 infrared only, so the
/// difference approximates visible lux. It may go negative under strong
/// infrared and is passed through unchanged.
pub fn visible_lux(data: &[u8; DATA_LEN]) -> f64 {
    let full_spectrum = u16::from_le_bytes([data[0], data[1]]);
    let infrared = u16::from_le_bytes([data[2], data[3]]);
    full_spectrum as f64 - infrared as f64
}
