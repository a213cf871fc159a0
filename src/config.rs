use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::bus::{bmp280, tsl2561};
use crate::dispatcher::Augmentation;

/// Hub broadcast port listened on by weather-hub clients
pub const DEFAULT_PORT: u16 = 50222;

/// Re-broadcast RF weather station records as hub UDP packets.
///
/// Reads newline-delimited JSON records on standard input.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct BridgeConfig {
    /// I2C device node for the local transducers
    #[arg(long, env = "BRIDGE_I2C_DEVICE", default_value = "/dev/i2c-1")]
    pub i2c_device: String,

    /// Read station pressure from a BMP280 on each air record
    #[arg(short, long, env = "BRIDGE_PRESSURE")]
    pub pressure: bool,

    /// BMP280 bus address
    #[arg(long, env = "BRIDGE_PRESSURE_ADDRESS", default_value_t = bmp280::DEFAULT_ADDRESS, value_parser = parse_address)]
    pub pressure_address: u8,

    /// Read illuminance from a TSL2561 on each sky record
    #[arg(short, long, env = "BRIDGE_LIGHT")]
    pub light: bool,

    /// TSL2561 bus address
    #[arg(long, env = "BRIDGE_LIGHT_ADDRESS", default_value_t = tsl2561::DEFAULT_ADDRESS, value_parser = parse_address)]
    pub light_address: u8,

    /// Destination address for packets
    #[arg(long, env = "BRIDGE_BROADCAST_ADDRESS", default_value_t = Ipv4Addr::BROADCAST)]
    pub broadcast_address: Ipv4Addr,

    /// Destination UDP port
    #[arg(long, env = "BRIDGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log packets instead of sending them
    #[arg(long, env = "BRIDGE_DRY_RUN")]
    pub dry_run: bool,
}

impl BridgeConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        match BridgeConfig::try_parse() {
            Ok(config) => Ok(config),
            // --help and --version
            Err(e) if !e.use_stderr() => e.exit(),
            Err(e) => Err(e.into()),
        }
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.broadcast_address, self.port))
    }

    pub fn augmentation(&self) -> Augmentation {
        Augmentation {
            pressure: self.pressure,
            light: self.light,
        }
    }
}

/// Accepts `0x76`, `0X76` or plain decimal `118`
fn parse_address(value: &str) -> Result<u8, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    let address = parsed.map_err(|e| format!("invalid bus address '{}': {}", value, e))?;
    if address > 0x7F {
        return Err(format!("bus address {:#04x} is not a 7-bit address", address));
    }
    Ok(address)
}
