//! Serial port access and Bus Pirate port detection.

use std::io::{Read, Write};
use std::time::Duration;

use log::debug;
use serialport::{available_ports, ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};

use crate::Error;

/// Timeout used until a bus mode applies its own.
pub const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// FTDI FT232R, the USB-serial bridge on the Bus Pirate v3.
const FT232R: (u16, u16) = (0x0403, 0x6001);

/// Byte stream the Bus Pirate is reached over.
pub trait Port: Read + Write {
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error>;

    /// Drop anything sitting in the receive buffer.
    fn discard_input(&mut self) -> Result<(), Error>;
}

impl Port for Box<dyn SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        SerialPort::set_timeout(self.as_mut(), timeout)?;
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), Error> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

pub fn open(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, Error> {
    debug!("Opening {path} at {baud_rate} baud");
    Ok(serialport::new(path, baud_rate)
        .timeout(OPEN_TIMEOUT)
        .open()?)
}

/// Pick the serial port to use: the explicit one if given, otherwise autodetect.
pub fn resolve(device: Option<&str>) -> Result<String, Error> {
    match device {
        Some(device) if !device.is_empty() => Ok(device.to_owned()),
        _ => detect(available_ports()?),
    }
}

fn detect(ports: Vec<SerialPortInfo>) -> Result<String, Error> {
    let usb_ports: Vec<_> = ports
        .into_iter()
        .filter(|info| matches!(info.port_type, SerialPortType::UsbPort(..)))
        .collect();

    let bridge = usb_ports.iter().find(|info| match &info.port_type {
        SerialPortType::UsbPort(usb) => (usb.vid, usb.pid) == FT232R,
        _ => false,
    });

    match (bridge, usb_ports.as_slice()) {
        (Some(info), _) | (None, [info]) => {
            debug!("Detected serial port {}", info.port_name);
            Ok(info.port_name.clone())
        }
        _ => Err(Error::NoSerialPort),
    }
}
