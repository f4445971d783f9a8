//! `learningctl` -- command-line access to the learning API.
//!
//! Reads the tenant settings from the environment (a `.env` file is
//! honoured), see [`learningctl::config`] for the variables.
//!
//! ```text
//! learningctl auth             check the credentials and show the token lifetime
//! learningctl get <endpoint>   print the JSON returned by an endpoint
//! learningctl summary          record counts for the known endpoints
//! learningctl explore          probe candidate endpoints for data
//! ```

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use learningctl::api::odata;
use learningctl::explorer;
use learningctl::{ApiClient, ClientSettings, Credentials, Environment};

const USAGE: &str = "usage: learningctl <auth | get <endpoint> | summary | explore>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "learningctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let credentials = Credentials::from_env().context("loading credentials")?;
    let settings = ClientSettings::from_env().context("loading client settings")?;
    let environment = Environment::from_env().context("loading environment")?;
    let client = ApiClient::new(credentials, settings)
        .context("building HTTP client")?
        .with_environment(environment);

    tracing::info!(
        environment = %client.environment(),
        base_url = %client.credentials().base_url(),
        "Using tenant"
    );

    match command.as_str() {
        "auth" => auth(&client).await,
        "get" => {
            let Some(endpoint) = args.get(1) else {
                bail!(USAGE);
            };
            get(&client, endpoint).await
        }
        "summary" => summary(&client).await,
        "explore" => explore(&client).await,
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }
}

async fn auth(client: &ApiClient) -> anyhow::Result<()> {
    let token = client.authenticate().await?;
    println!("Authenticated against {}", client.environment());
    println!("Token expires at {}", token.expires_at());
    Ok(())
}

async fn get(client: &ApiClient, endpoint: &str) -> anyhow::Result<()> {
    let payload = client.get(endpoint).await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn summary(client: &ApiClient) -> anyhow::Result<()> {
    // Fail fast on bad credentials rather than once per endpoint.
    client.authenticate().await?;

    for (name, endpoint) in odata::KNOWN_ENDPOINTS {
        match client.get(endpoint).await {
            Ok(payload) => match odata::collection(&payload) {
                Some(records) => println!("{name:<18} {:>6} records", records.len()),
                None => println!("{name:<18}      - (single entity)"),
            },
            Err(error) => println!("{name:<18}      ! {error}"),
        }
    }

    if let Some(remaining) = client.token_remaining().await {
        println!("Token: {} min remaining", remaining.num_minutes());
    }
    Ok(())
}

async fn explore(client: &ApiClient) -> anyhow::Result<()> {
    client.authenticate().await?;

    // We try three sets in turn: the brute-force grid, endpoints known from
    // vendor examples, and endpoints scoped to our own user.
    let mut candidates =
        explorer::candidate_endpoints(&explorer::DEFAULT_BASE_PATHS, &explorer::DEFAULT_RESOURCES);
    candidates.extend(explorer::KNOWN_ENDPOINTS.iter().map(|endpoint| endpoint.to_string()));
    candidates.extend(explorer::user_endpoints(client.credentials().user_id()));
    println!("Probing {} candidate endpoints...", candidates.len());

    let probes = explorer::explore(client, candidates.as_slice()).await;
    let found: Vec<_> = probes.iter().filter(|probe| probe.found_data()).collect();

    if found.is_empty() {
        println!("No data found in any endpoint tested");
    } else {
        for probe in found {
            println!("{probe}");
        }
    }
    Ok(())
}
