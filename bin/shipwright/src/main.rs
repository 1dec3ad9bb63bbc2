//! shipwright is a CLI tool to deploy, verify and upgrade smart contracts.

mod cli;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Mode};
use settings::{NetworkSettings, Settings};
use shipwright_deploy::{
    AddressStore, ArtifactRegistry, ConstructorArg, DEFAULT_INITIALIZER, DEFAULT_PROXY_CONTRACT,
    DeployError, DeployMode, DeploymentConfig, DeploymentRecord, EtherscanVerifier,
    FileAddressStore, NetworkContext, Orchestrator, ProxyHandle, RpcBackend, RunOutcome,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let settings = Settings::load(&cli.config)?;
    let network = settings.network(&cli.network)?;

    let from = match network.from {
        Some(from) => from,
        None => RpcBackend::default_account(&network.rpc_url).await?,
    };
    let backend = RpcBackend::new(network.rpc_url.clone(), from)?;
    let chain_id = backend
        .chain_id()
        .await
        .with_context(|| format!("Failed to reach {}", network.rpc_url))?;

    let context = match network.ephemeral {
        Some(is_ephemeral) => NetworkContext::new(chain_id, is_ephemeral),
        None => NetworkContext::from_chain_id(chain_id),
    };

    let config = deployment_config(&cli, &settings, context)?;

    tracing::info!(
        network = %cli.network,
        chain_id,
        ephemeral = context.is_ephemeral,
        from = %from,
        contract = %config.contract_name,
        mode = %cli.mode,
        "Starting run..."
    );

    let orchestrator = Orchestrator::new(
        ArtifactRegistry::new(&settings.artifacts_dir),
        backend,
        verifier(&network)?,
        FileAddressStore::new(&settings.deployments_dir),
    );

    match orchestrator.run(&config).await {
        Ok(RunOutcome::Deployed(record)) => print_record(&record),
        Ok(RunOutcome::Upgraded(handle)) => {
            let record = orchestrator.store().get(chain_id)?;
            print_upgrade(&handle, record.as_ref());
        }
        Err(err) => {
            if let DeployError::PartialUpgrade {
                proxy,
                implementation,
                ..
            } = &err
            {
                tracing::error!(
                    proxy = %proxy,
                    implementation = %implementation,
                    "Upgrade interrupted. Resume with: shipwright --network {} --mode upgrade --contract {} --proxy {proxy} --implementation {implementation}",
                    cli.network,
                    config.contract_name,
                );
            }
            return Err(err.into());
        }
    }

    Ok(())
}

/// Merge command line overrides into the settings file.
fn deployment_config(
    cli: &Cli,
    settings: &Settings,
    network: NetworkContext,
) -> Result<DeploymentConfig> {
    let contract = settings.contract.as_ref();

    let contract_name = cli
        .contract
        .clone()
        .or_else(|| contract.map(|c| c.name.clone()))
        .context("No contract to deploy: pass --contract or set `contract.name`")?;

    let constructor_args = if cli.args.is_empty() {
        contract.map(|c| c.args.clone()).unwrap_or_default()
    } else {
        cli.args.iter().map(|arg| ConstructorArg::from(arg.as_str())).collect()
    };

    let mode = match cli.mode {
        Mode::Direct => DeployMode::Direct,
        Mode::Proxy => DeployMode::Proxy {
            proxy_contract: contract
                .and_then(|c| c.proxy_contract.clone())
                .unwrap_or_else(|| DEFAULT_PROXY_CONTRACT.to_string()),
            initializer: contract
                .and_then(|c| c.initializer.clone())
                .unwrap_or_else(|| DEFAULT_INITIALIZER.to_string()),
        },
        Mode::Upgrade => DeployMode::Upgrade {
            proxy_address: cli
                .proxy
                .context("--proxy is required with --mode upgrade")?,
            resume_implementation: cli.implementation,
        },
    };

    let mut builder = DeploymentConfig::builder(contract_name, network)
        .constructor_args(constructor_args)
        .verification_delay_secs(
            cli.verification_delay
                .unwrap_or(settings.verification_delay_secs),
        )
        .mode(mode);

    // Only use the configured artifact when deploying the configured contract.
    let artifact = cli.artifact.clone().or_else(|| {
        contract
            .filter(|c| cli.contract.is_none() || cli.contract.as_deref() == Some(c.name.as_str()))
            .and_then(|c| c.artifact.clone())
    });
    if let Some(artifact) = artifact {
        builder = builder.artifact_path(artifact);
    }

    Ok(builder.build())
}

fn verifier(network: &NetworkSettings) -> Result<Option<EtherscanVerifier>> {
    match (&network.explorer_api_url, &network.explorer_api_key) {
        (Some(url), Some(key)) => Ok(Some(EtherscanVerifier::new(url.clone(), key.clone())?)),
        _ => Ok(None),
    }
}

fn print_record(record: &DeploymentRecord) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Contract".to_string(), record.contract_name.clone()]);
    table.add_row(vec!["Network".to_string(), record.network_id.to_string()]);
    table.add_row(vec!["Address".to_string(), record.address.to_string()]);
    if let Some(implementation) = record.implementation_address {
        table.add_row(vec!["Implementation".to_string(), implementation.to_string()]);
    }
    table.add_row(vec![
        "Arguments".to_string(),
        record
            .constructor_args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    ]);
    table.add_row(vec!["Verified".to_string(), record.verified.to_string()]);

    println!("{table}");
}

fn print_upgrade(handle: &ProxyHandle, record: Option<&DeploymentRecord>) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Proxy".to_string(), handle.address.to_string()]);
    table.add_row(vec![
        "Implementation".to_string(),
        handle.implementation_address.to_string(),
    ]);
    if let Some(record) = record {
        table.add_row(vec!["Contract".to_string(), record.contract_name.clone()]);
        table.add_row(vec!["Verified".to_string(), record.verified.to_string()]);
    }

    println!("{table}");
}
