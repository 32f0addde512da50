use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use buspirate_eeprom::config::I2cConfig;
use buspirate_eeprom::transfer::TransferRequest;
use buspirate_eeprom::{i2c_eeprom, logging, session};
use clap::{CommandFactory, Parser};
use log::{info, warn, LevelFilter};

/// Dump a 24xx I2C EEPROM through a Bus Pirate.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// File the dump is written to
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Number of bytes to read
    #[arg(short, long)]
    size: usize,

    /// Bus Pirate serial port, autodetected when omitted
    #[arg(short, long, env = "BUSPIRATE_PORT")]
    device: Option<String>,

    /// Serial port baud rate
    #[arg(short = 'S', long, default_value_t = 115_200)]
    serial_speed: u32,

    /// Bytes read per addressed block
    #[arg(short, long, default_value = "256")]
    block_size: NonZeroUsize,
}

/// `None` when no arguments were given at all; only the usage line is printed then.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() <= 1 {
        return Ok(None);
    }
    Cli::try_parse_from(args).map(Some)
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            println!("{}", Cli::command().render_usage());
            return Ok(());
        }
        Err(e) => e.exit(),
    };
    logging::initialize_logger(LevelFilter::Info);

    let file = File::create(&cli.output)
        .with_context(|| format!("Could not create {}", cli.output.display()))?;

    let bp = session::connect(cli.device.as_deref(), cli.serial_speed)
        .context("Could not open the Bus Pirate")?;
    let mut bp =
        session::start_i2c(bp, &I2cConfig::default()).context("Could not set up I2C mode")?;

    let request = TransferRequest::new(cli.size, cli.block_size);
    let result = i2c_eeprom::dump(&mut bp, &request, BufWriter::new(file));

    if !session::teardown(bp).is_reset() {
        warn!("The Bus Pirate may still be in binary mode; power-cycle it before using its terminal");
    }

    let written = result.context("Dump failed")?;
    info!("Wrote {written} bytes to {}", cli.output.display());
    Ok(())
}
