pub mod cleanup;
pub mod config;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

pub use config::BridgeConfig;

/// Build the command line definition.
///
/// `-h` selects the broker host, so clap's short help flag is disabled and
/// only `--help` remains.
pub fn build_command() -> Command {
    Command::new("co2mon-bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Publish MT8057 CO2 monitor readings to MQTT")
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .help("Print help")
                .action(ArgAction::Help),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .short('h')
                .help("MQTT broker host [default: 127.0.0.1]")
                .value_name("HOST"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("MQTT broker port [default: 1883]")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("no-decode")
                .long("no-decode")
                .short('n')
                .help("Do not deobfuscate device reports (plaintext firmware)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("MQTT client id (random when omitted)")
                .value_name("ID"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Log publications instead of connecting to a broker")
                .action(ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

/// Merge defaults, the optional config file and command line flags.
pub fn resolve_config(matches: &ArgMatches) -> Result<BridgeConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };

    if let Some(host) = matches.get_one::<String>("host") {
        config.broker_host = host.clone();
    }
    if let Some(port) = matches.get_one::<String>("port") {
        match parse_port(port) {
            Some(port) => config.broker_port = port,
            None => log::warn!("Cannot convert -p argument to integer, ignored"),
        }
    }
    if matches.get_flag("no-decode") {
        config.decode_data = false;
    }
    if let Some(id) = matches.get_one::<String>("client-id") {
        config.client_id = Some(id.clone());
    }
    if matches.get_flag("dry-run") {
        config.dry_run = true;
    }

    Ok(config)
}

/// Parse a port number the way C's `strtol(.., 0)` reads it: `0x` prefix is
/// hexadecimal, a leading `0` is octal, anything else decimal.
pub fn parse_port(value: &str) -> Option<u16> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        return u16::from_str_radix(hex, 16).ok();
    }
    match value.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => u16::from_str_radix(octal, 8).ok(),
        _ => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> BridgeConfig {
        let matches = build_command()
            .try_get_matches_from(std::iter::once("co2mon-bridge").chain(args.iter().copied()))
            .unwrap();
        resolve_config(&matches).unwrap()
    }

    #[test]
    fn test_defaults_without_flags() {
        assert_eq!(resolve(&[]), BridgeConfig::default());
    }

    #[test]
    fn test_short_flags() {
        let config = resolve(&["-h", "10.0.0.2", "-p", "8883", "-n"]);
        assert_eq!(config.broker_host, "10.0.0.2");
        assert_eq!(config.broker_port, 8883);
        assert!(!config.decode_data);
    }

    #[test]
    fn test_bad_port_ignored() {
        let config = resolve(&["-p", "eighty"]);
        assert_eq!(config.broker_port, 1883);
    }

    #[test]
    fn test_parse_port_forms() {
        assert_eq!(parse_port("1883"), Some(1883));
        assert_eq!(parse_port("0x75b"), Some(1883));
        assert_eq!(parse_port("03533"), Some(1883));
        assert_eq!(parse_port("010"), Some(8));
        assert_eq!(parse_port("0"), Some(0));
        assert_eq!(parse_port("09"), None);
        assert_eq!(parse_port("70000"), None);
        assert_eq!(parse_port(""), None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("co2mon-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "broker_host = \"from-file\"\nbroker_port = 1999\n").unwrap();
        let path_str = path.to_string_lossy().into_owned();

        let config = resolve(&["-c", &path_str, "-p", "2000"]);
        assert_eq!(config.broker_host, "from-file");
        assert_eq!(config.broker_port, 2000);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_help_long_flag_only() {
        let err = build_command()
            .try_get_matches_from(["co2mon-bridge", "--help"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
