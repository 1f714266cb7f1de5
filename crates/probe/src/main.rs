//! etcdkit-probe: connectivity check for an etcd node or cluster.
//!
//! Loads config, writes the probe key through a failover-capable
//! `ClusterClient`, reads it back and prints what the cluster returned.

use etcdkit_client::{CallContext, ClientError, ClusterClient, KeyValueRecord, KvTransport};
use etcdkit_common::{Endpoint, DEFAULT_PORT};
use etcdkit_config::{ClientConfig, ProbeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    etcdkit_metrics::init_tracing();

    // Load config: first CLI arg is the YAML config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "etcdkit.yaml".to_string());

    let config = match etcdkit_config::load_from_file(std::path::Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "failed to load config from {}: {}, using http://localhost:{}",
                config_path,
                e,
                DEFAULT_PORT
            );
            ClientConfig::single(Endpoint::http("localhost", DEFAULT_PORT)?)
        }
    };

    tracing::info!(
        "probing {} endpoint(s), {:?} per attempt",
        config.endpoints.len(),
        config.timeout()
    );
    let client = etcdkit_net::build_client(&config)?;

    let result = probe(&client, &config.probe).await;
    client.close().await;

    if config.print_metrics {
        print!("{}", etcdkit_metrics::encode_metrics());
    }

    if let Err(e) = result {
        tracing::error!("probe failed: {}", e);
        return Err(e.into());
    }

    println!("etcd probe finished!");
    Ok(())
}

async fn probe<T: KvTransport>(
    client: &ClusterClient<T>,
    probe: &ProbeConfig,
) -> Result<(), ClientError> {
    client
        .put_with(
            &call_context(probe),
            probe.key.as_bytes(),
            probe.value.as_bytes(),
        )
        .await?;
    println!("Successfully put key '{}'", probe.key);
    tracing::debug!(endpoint = %client.preferred_endpoint(), "put acknowledged");

    let found = client
        .get_with(&call_context(probe), probe.key.as_bytes())
        .await?;
    match found {
        Some(record) => println!("{}", format_record(&record)),
        None => println!("No key found"),
    }
    Ok(())
}

/// A fresh deadline per call, like a per-request context.
fn call_context(probe: &ProbeConfig) -> CallContext {
    match probe.call_deadline() {
        Some(deadline) => CallContext::background().with_timeout(deadline),
        None => CallContext::background(),
    }
}

fn format_record(record: &KeyValueRecord) -> String {
    format!(
        "Key: {}, Value: {}",
        String::from_utf8_lossy(&record.key),
        String::from_utf8_lossy(&record.value)
    )
}
