mod accumulator;
mod broadcast;
mod bus;
mod config;
mod dispatcher;
mod models;
mod utils;

use embedded_hal::delay::DelayNs;
use linux_embedded_hal::Delay;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use broadcast::{broadcast_packet, ObservationPacket};
use bus::{BusProvider, LinuxI2cBus, TransducerDriver};
use config::BridgeConfig;
use dispatcher::Dispatcher;
use models::Observations;
use utils::{format_epoch, now_epoch};

async fn publish(packet: &ObservationPacket, config: &BridgeConfig) {
    if config.dry_run {
        match packet.to_json() {
            Ok(text) => info!("{}", text),
            Err(e) => error!("Failed to render packet: {}", e),
        }
        return;
    }

    match broadcast_packet(packet, config.target()).await {
        Ok(_) => debug!(
            "Broadcast {} from {} to {}",
            packet.kind,
            packet.serial_number,
            config.target()
        ),
        Err(e) => error!("Failed to broadcast {}: {}", packet.kind, e),
    }
}

/// Feed every line of `reader` through the dispatcher until end of input.
///
/// Lines that are not UTF-8 are skipped like any other malformed record.
/// Returns the number of packets published.
async fn process_records<R, B, D>(
    mut reader: R,
    dispatcher: &mut Dispatcher<B, D>,
    observations: &mut Observations,
    config: &BridgeConfig,
) -> Result<usize, std::io::Error>
where
    R: AsyncBufRead + Unpin,
    B: BusProvider,
    D: DelayNs,
{
    let mut published = 0;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping record that is not UTF-8: {}", e);
                continue;
            }
        };

        // Bus sessions sleep for whole conversion periods
        let packet = tokio::task::block_in_place(|| {
            dispatcher.handle_line(observations, line, now_epoch())
        });

        if let Some(packet) = packet {
            publish(&packet, config).await;
            published += 1;
        }
    }

    Ok(published)
}

async fn main_loop(config: BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let transducers = TransducerDriver::new(
        LinuxI2cBus::new(&config.i2c_device),
        Delay,
        config.pressure_address,
        config.light_address,
    );
    let mut dispatcher = Dispatcher::new(transducers, config.augmentation());

    let start_time = now_epoch();
    let mut observations = Observations::new(start_time);
    info!(
        "Listening for RF records on stdin since {}",
        format_epoch(start_time)
    );

    let published = process_records(
        BufReader::new(tokio::io::stdin()),
        &mut dispatcher,
        &mut observations,
        &config,
    )
    .await?;

    info!("End of input after {} packets", published);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match BridgeConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!(
        "Broadcasting to {}{}, pressure transducer: {}, light transducer: {}, bus: {}",
        config.target(),
        if config.dry_run { " (dry run)" } else { "" },
        if config.pressure { "on" } else { "off" },
        if config.light { "on" } else { "off" },
        config.i2c_device
    );

    // Run main loop until stdin closes or Ctrl+C
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
            // The stdin reader blocks a runtime thread until the next line,
            // so runtime shutdown would wait for the decoder
            std::process::exit(0);
        }
    }

    Ok(())
}
