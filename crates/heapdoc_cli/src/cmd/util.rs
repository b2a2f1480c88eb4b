use std::io::Write;

use heapdoc::inspect::{InspectError, Result};
use serde::Serialize;

/// Parse decimal or `0x`-prefixed hex address literal.
pub(crate) fn parse_address(value: &str) -> Result<u64> {
	let value = value.trim();
	let parsed = if let Some(stripped) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		u64::from_str_radix(&stripped.replace('_', ""), 16)
	} else {
		value.parse::<u64>()
	};

	parsed.map_err(|_| InspectError::InvalidAddressLiteral { value: value.to_owned() })
}

/// Render an address as fixed-width hex.
pub(crate) fn addr_hex(value: u64) -> String {
	format!("0x{value:016x}")
}

/// Write `payload` to stdout as pretty JSON.
pub(crate) fn emit_json<T: Serialize>(payload: &T) -> Result<()> {
	let mut stdout = std::io::stdout().lock();
	serde_json::to_writer_pretty(&mut stdout, payload)?;
	writeln!(stdout)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use heapdoc::inspect::InspectError;

	use super::{addr_hex, parse_address};

	#[test]
	fn parses_hex_and_decimal_addresses() {
		assert_eq!(parse_address("0x1000").expect("hex"), 0x1000);
		assert_eq!(parse_address("0X7ff0_0000").expect("hex with separators"), 0x7ff0_0000);
		assert_eq!(parse_address("4096").expect("decimal"), 4096);
	}

	#[test]
	fn rejects_malformed_addresses() {
		for literal in ["", "0x", "0xZZ", "-1", "12ab"] {
			assert!(
				matches!(parse_address(literal), Err(InspectError::InvalidAddressLiteral { .. })),
				"{literal:?} should be rejected"
			);
		}
	}

	#[test]
	fn renders_fixed_width_hex() {
		assert_eq!(addr_hex(0x1000), "0x0000000000001000");
	}
}
