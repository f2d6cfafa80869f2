use thiserror::Error;

use crate::scan::render::{self, COMMAND};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("{}", render::usage())]
    MissingAddress,
    #[error("Unknown command: /{0}")]
    Unknown(String),
}

/// Extract the target address from `/uniquecontracts <address>`.
///
/// A bare address is accepted as shorthand. Anything after the first
/// argument is ignored; a `@botname` suffix on the command is tolerated.
pub fn parse_scan_command(text: &str) -> Result<String, CommandError> {
    let mut parts = text.split_whitespace();
    let Some(first) = parts.next() else {
        return Err(CommandError::MissingAddress);
    };

    let Some(command) = first.strip_prefix('/') else {
        return Ok(first.to_string());
    };
    let name = command.split('@').next().unwrap_or_default();
    if !name.eq_ignore_ascii_case(COMMAND) {
        return Err(CommandError::Unknown(name.to_string()));
    }

    parts
        .next()
        .map(str::to_string)
        .ok_or(CommandError::MissingAddress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_address() {
        assert_eq!(
            parse_scan_command("/uniquecontracts 0xAbC"),
            Ok("0xAbC".to_string())
        );
        assert_eq!(
            parse_scan_command("  /uniquecontracts@scanbot   0x1 extra "),
            Ok("0x1".to_string())
        );
    }

    #[test]
    fn bare_address_is_accepted() {
        assert_eq!(parse_scan_command("0xdef"), Ok("0xdef".to_string()));
    }

    #[test]
    fn missing_address_yields_usage() {
        let err = parse_scan_command("/uniquecontracts").unwrap_err();
        assert_eq!(err, CommandError::MissingAddress);
        assert_eq!(err.to_string(), "Provide address: /uniquecontracts <address>");
        assert_eq!(parse_scan_command("   "), Err(CommandError::MissingAddress));
    }

    #[test]
    fn other_commands_are_rejected() {
        assert_eq!(
            parse_scan_command("/balance 0x1"),
            Err(CommandError::Unknown("balance".to_string()))
        );
    }
}
