use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use buspirate_eeprom::command::Command;
use buspirate_eeprom::config::{SpiConfig, SpiOptions, DEFAULT_FILL};
use buspirate_eeprom::confirm::Interactive;
use buspirate_eeprom::spi_eeprom::{self, Outcome};
use buspirate_eeprom::util::{HexEcho, StdDelay};
use buspirate_eeprom::{logging, modes, session, BusPirate};
use clap::{ArgGroup, Parser};
use log::{info, warn, LevelFilter};

/// Parse a byte given in hex (`0x..`) or decimal.
fn parse_byte(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {e}"))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {e}"))
    }
}

/// Read, write, erase or identify a 25xx SPI EEPROM through a Bus Pirate.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("command").args(["read", "write", "erase", "id"])))]
struct Cli {
    /// Read the chip into FILE. Without any command the chip is read to stdout as hex
    #[arg(short, long, value_name = "FILE")]
    read: Option<PathBuf>,

    /// Write FILE to the start of the chip
    #[arg(short, long, value_name = "FILE")]
    write: Option<PathBuf>,

    /// Fill the first SIZE bytes of the chip
    #[arg(short, long)]
    erase: bool,

    /// Print the status register
    #[arg(short, long)]
    id: bool,

    /// Number of bytes to read or erase
    #[arg(short, long, default_value_t = 16)]
    size: usize,

    /// Bus Pirate serial port, autodetected when omitted
    #[arg(short, long, env = "BUSPIRATE_PORT")]
    device: Option<String>,

    /// Serial port baud rate
    #[arg(short = 'S', long, default_value_t = 115_200)]
    serial_speed: u32,

    /// Echo every block read as a hex line
    #[arg(short, long)]
    verbose: bool,

    /// Byte written by --erase
    #[arg(long, value_parser = parse_byte, default_value_t = DEFAULT_FILL)]
    fill: u8,

    /// Write-cycle time waited after each page, in milliseconds
    #[arg(long, default_value_t = 5)]
    write_delay_ms: u64,
}

/// A command with its files already opened.
enum Job {
    Read(Box<dyn Write>),
    Write(File),
    Erase,
    Identify,
}

impl Job {
    fn prepare(command: Command, verbose: bool) -> anyhow::Result<Self> {
        Ok(match command {
            Command::Read { output: Some(path) } => {
                let file = File::create(&path)
                    .with_context(|| format!("Could not create {}", path.display()))?;
                let file = BufWriter::new(file);
                if verbose {
                    Job::Read(Box::new(HexEcho::new(file, io::stdout())))
                } else {
                    Job::Read(Box::new(file))
                }
            }
            Command::Read { output: None } => {
                Job::Read(Box::new(HexEcho::new(io::sink(), io::stdout())))
            }
            Command::Write { input } => Job::Write(
                File::open(&input)
                    .with_context(|| format!("Could not open {}", input.display()))?,
            ),
            Command::Erase => Job::Erase,
            Command::Identify => Job::Identify,
        })
    }

    fn run(self, bp: &mut BusPirate<modes::Spi>, size: usize, options: &SpiOptions) -> anyhow::Result<()> {
        match self {
            Job::Read(sink) => spi_eeprom::read(bp, size, sink).context("Read failed")?,
            Job::Write(source) => report(
                spi_eeprom::write(bp, source, &mut Interactive, &mut StdDelay, options)
                    .context("Write failed")?,
            ),
            Job::Erase => report(
                spi_eeprom::erase(bp, size, &mut Interactive, &mut StdDelay, options)
                    .context("Erase failed")?,
            ),
            Job::Identify => {
                let status = spi_eeprom::identify(bp).context("Identify failed")?;
                println!("{status}");
            }
        }
        Ok(())
    }
}

fn report(outcome: Outcome) {
    if let Outcome::Completed { pages } = outcome {
        info!("Done, {pages} pages written");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize_logger(LevelFilter::Info);

    let command = Command::select(cli.read, cli.write, cli.erase, cli.id)?;
    let job = Job::prepare(command, cli.verbose)?;
    let options = SpiOptions::builder()
        .fill(cli.fill)
        .write_cycle(Duration::from_millis(cli.write_delay_ms))
        .build();

    let bp = session::connect(cli.device.as_deref(), cli.serial_speed)
        .context("Could not open the Bus Pirate")?;
    let mut bp =
        session::start_spi(bp, &SpiConfig::default()).context("Could not set up SPI mode")?;

    let result = job.run(&mut bp, cli.size, &options);

    if !session::teardown_spi(bp).is_reset() {
        warn!("The Bus Pirate may still be in binary mode; power-cycle it before using its terminal");
    }
    result
}
