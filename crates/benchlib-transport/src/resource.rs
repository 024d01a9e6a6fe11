//! VISA-style resource locators.
//!
//! Instruments are addressed with the strings VISA tools print:
//! `TCPIP0::192.168.1.50::INSTR` for a LAN instrument's SCPI socket,
//! `TCPIP::10.0.0.7::5025::SOCKET` for an explicit port, `ASRL3::INSTR`
//! for a serial port. A bare `host:port` or device path is accepted too.
//! GPIB and USB-TMC locators are recognised so they can be rejected with
//! a clear error.

use std::fmt;
use std::str::FromStr;

use benchlib_core::{Error, Result};

/// Port of the raw SCPI socket on LAN instruments.
pub const SCPI_SOCKET_PORT: u16 = 5025;

/// A parsed resource locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceAddress {
    /// Raw SCPI over TCP.
    Tcp { host: String, port: u16 },
    /// Serial port by device path or COM name.
    Serial { port: String },
}

impl ResourceAddress {
    /// Parse `locator`.
    ///
    /// ```
    /// use benchlib_transport::ResourceAddress;
    ///
    /// let addr = ResourceAddress::parse("TCPIP0::192.168.1.50::INSTR").unwrap();
    /// assert_eq!(addr, ResourceAddress::Tcp { host: "192.168.1.50".into(), port: 5025 });
    /// ```
    pub fn parse(locator: &str) -> Result<Self> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidParameter("empty resource locator".into()));
        }

        let parts: Vec<&str> = trimmed.split("::").collect();
        let head = parts[0].to_ascii_uppercase();

        if parts.len() > 1 {
            if head.starts_with("TCPIP") {
                return parse_tcpip(trimmed, &parts);
            }
            if head.starts_with("ASRL") {
                return parse_asrl(trimmed, &parts);
            }
            if head.starts_with("GPIB") || head.starts_with("USB") || head.starts_with("VXI") {
                return Err(Error::Unsupported(format!(
                    "{trimmed}: only TCPIP and ASRL resources can be opened without a VISA library"
                )));
            }
            return Err(invalid(trimmed, "unknown interface type"));
        }

        if is_device_path(trimmed) {
            return Ok(ResourceAddress::Serial {
                port: trimmed.to_string(),
            });
        }

        if let Some((host, port)) = trimmed.rsplit_once(':') {
            let port = port
                .parse()
                .map_err(|_| invalid(trimmed, "port is not a number"))?;
            if host.is_empty() {
                return Err(invalid(trimmed, "missing host"));
            }
            return Ok(ResourceAddress::Tcp {
                host: host.to_string(),
                port,
            });
        }

        Err(invalid(trimmed, "not a VISA locator, host:port or device path"))
    }

    /// `host:port` for TCP addresses.
    pub fn socket_addr(&self) -> Option<String> {
        match self {
            ResourceAddress::Tcp { host, port } => Some(format!("{host}:{port}")),
            ResourceAddress::Serial { .. } => None,
        }
    }
}

impl FromStr for ResourceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceAddress::parse(s)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceAddress::Tcp { host, port } if *port == SCPI_SOCKET_PORT => {
                write!(f, "TCPIP::{host}::INSTR")
            }
            ResourceAddress::Tcp { host, port } => write!(f, "TCPIP::{host}::{port}::SOCKET"),
            ResourceAddress::Serial { port } => write!(f, "ASRL{port}::INSTR"),
        }
    }
}

fn parse_tcpip(locator: &str, parts: &[&str]) -> Result<ResourceAddress> {
    check_board(locator, parts[0], "TCPIP")?;
    match parts {
        [_, host, suffix] if suffix.eq_ignore_ascii_case("INSTR") && !host.is_empty() => {
            Ok(ResourceAddress::Tcp {
                host: host.to_string(),
                port: SCPI_SOCKET_PORT,
            })
        }
        [_, host, port, suffix] if suffix.eq_ignore_ascii_case("SOCKET") && !host.is_empty() => {
            let port = port
                .parse()
                .map_err(|_| invalid(locator, "port is not a number"))?;
            Ok(ResourceAddress::Tcp {
                host: host.to_string(),
                port,
            })
        }
        _ => Err(invalid(
            locator,
            "expected TCPIP::<host>::INSTR or TCPIP::<host>::<port>::SOCKET",
        )),
    }
}

fn parse_asrl(locator: &str, parts: &[&str]) -> Result<ResourceAddress> {
    match parts {
        [head, suffix] if suffix.eq_ignore_ascii_case("INSTR") => {
            let port = &head[4..];
            if port.is_empty() {
                return Err(invalid(locator, "missing serial port"));
            }
            let port = match port.parse::<u32>() {
                Ok(n) => serial_port_for_number(n),
                Err(_) => port.to_string(),
            };
            Ok(ResourceAddress::Serial { port })
        }
        _ => Err(invalid(locator, "expected ASRL<port>::INSTR")),
    }
}

/// `TCPIP` may carry a board number: `TCPIP0`, `TCPIP1`.
fn check_board(locator: &str, head: &str, interface: &str) -> Result<()> {
    let board = &head[interface.len()..];
    if board.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid(locator, "bad board number"))
    }
}

#[cfg(windows)]
fn serial_port_for_number(n: u32) -> String {
    format!("COM{n}")
}

#[cfg(not(windows))]
fn serial_port_for_number(n: u32) -> String {
    format!("/dev/ttyS{}", n.saturating_sub(1))
}

fn is_device_path(s: &str) -> bool {
    s.starts_with("/dev/")
        || (s.len() > 3
            && s[..3].eq_ignore_ascii_case("COM")
            && s[3..].chars().all(|c| c.is_ascii_digit()))
}

fn invalid(locator: &str, reason: &str) -> Error {
    Error::InvalidParameter(format!("bad resource locator {locator:?}: {reason}"))
}
