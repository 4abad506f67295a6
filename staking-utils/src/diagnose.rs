use staking_evm_client::{Address, RouterClient};
use tracing::warn;

use crate::Config;

/// Prints the live router fee and, for every adapter in App.toml,
/// whether the router actually whitelists it. Configuration that the
/// chain disagrees with is the usual cause of rejected stakes.
pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = RouterClient::connect(
        &config.rpc_http_url,
        &config.relayer_private_key,
        &config.router_address,
    )
    .await?;

    let fee_basis_points = client.fee_basis_points().await?;
    println!("router: {}", client.router_address());
    println!("relayer: {}", client.relayer_address());
    println!("feeBasisPoints: {fee_basis_points}");

    for adapter in &config.adapters {
        let address = match adapter.adapter_address.parse::<Address>() {
            Ok(address) => address,
            Err(error) => {
                warn!(
                    "Adapter {} has unparseable address {}: {error}",
                    adapter.protocol, adapter.adapter_address
                );
                println!("{}: INVALID ADDRESS", adapter.protocol);
                continue;
            }
        };
        if address.is_zero() {
            println!("{}: not deployed (zero address)", adapter.protocol);
            continue;
        }
        match client.is_adapter_supported(address).await {
            Ok(true) => println!("{}: whitelisted ({address})", adapter.protocol),
            Ok(false) => println!("{}: NOT WHITELISTED ({address})", adapter.protocol),
            Err(error) => println!("{}: check failed ({error})", adapter.protocol),
        }
    }

    Ok(())
}
