use std::path::PathBuf;

use clap::Parser;
use shipwright_deploy::primitives::Address;
use tracing::level_filters::LevelFilter;

/// Which lifecycle operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    /// Deploy the contract with its constructor.
    Direct,
    /// Deploy the contract behind a new ERC-1967 proxy and initialize it.
    Proxy,
    /// Deploy a new implementation and repoint an existing proxy.
    Upgrade,
}

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(
    author,
    version,
    about = "Deploy, verify and upgrade smart contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SHIPWRIGHT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the configuration file.
    #[arg(short, long, alias = "conf", env = "SHIPWRIGHT_CONFIG", default_value = "Shipwright.toml")]
    pub config: PathBuf,

    /// Name of the `[networks.<name>]` section to deploy to.
    #[arg(short, long, env = "SHIPWRIGHT_NETWORK", default_value = "localhost")]
    pub network: String,

    /// The operation to perform.
    #[arg(short, long, env = "SHIPWRIGHT_MODE", default_value_t = Mode::Direct)]
    pub mode: Mode,

    /// Contract to deploy. Overrides `contract.name`.
    #[arg(long, env = "SHIPWRIGHT_CONTRACT")]
    pub contract: Option<String>,

    /// Fully qualified artifact name (`contracts/X.sol:X`). Overrides `contract.artifact`.
    #[arg(long, env = "SHIPWRIGHT_ARTIFACT")]
    pub artifact: Option<String>,

    /// Comma separated constructor (or initializer) arguments. Overrides `contract.args`.
    #[arg(long, value_delimiter = ',')]
    pub args: Vec<String>,

    /// The proxy to upgrade. Required with `--mode upgrade`.
    #[arg(long, env = "SHIPWRIGHT_PROXY")]
    pub proxy: Option<Address>,

    /// An implementation left deployed by an interrupted upgrade.
    ///
    /// With `--mode upgrade`, skips the deployment and only repoints the proxy to it.
    #[arg(long, requires = "proxy")]
    pub implementation: Option<Address>,

    /// Seconds to wait before submitting the source for verification.
    /// Overrides `verification_delay_secs`.
    #[arg(long, env = "SHIPWRIGHT_VERIFICATION_DELAY")]
    pub verification_delay: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("direct".parse::<Mode>().unwrap(), Mode::Direct);
        assert_eq!("upgrade".parse::<Mode>().unwrap(), Mode::Upgrade);
        assert!("redeploy".parse::<Mode>().is_err());
        assert_eq!(Mode::Proxy.to_string(), "proxy");
    }

    #[test]
    fn test_upgrade_arguments() {
        let cli = Cli::try_parse_from([
            "shipwright",
            "--network",
            "sepolia",
            "--mode",
            "upgrade",
            "--contract",
            "PredictionMarketV2",
            "--proxy",
            "0xd0D5e3DB44DE05E9F294BB0a3bEEaF030DE24Ada",
        ])
        .unwrap();

        assert_eq!(cli.network, "sepolia");
        assert_eq!(cli.mode, Mode::Upgrade);
        assert_eq!(cli.contract.as_deref(), Some("PredictionMarketV2"));
        assert!(cli.proxy.is_some());
        assert!(cli.implementation.is_none());
    }

    #[test]
    fn test_comma_separated_args() {
        let cli = Cli::try_parse_from([
            "shipwright",
            "--args",
            "0xd0D5e3DB44DE05E9F294BB0a3bEEaF030DE24Ada,0x024D3242650d6c7b0ee6DE408E33E803dbfb00Ea",
        ])
        .unwrap();

        assert_eq!(cli.args.len(), 2);
        assert_eq!(cli.mode, Mode::Direct);
    }

    #[test]
    fn test_implementation_requires_proxy() {
        assert!(
            Cli::try_parse_from([
                "shipwright",
                "--implementation",
                "0x024D3242650d6c7b0ee6DE408E33E803dbfb00Ea",
            ])
            .is_err()
        );
    }
}
