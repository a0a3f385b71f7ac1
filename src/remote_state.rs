use anyhow::Context;
use smartlight_rs::RemoteStateClient;
use smartlight_rs::config::{ENDPOINT_ENV, LightConfig};

const USAGE: &str = "usage: remote-state read | remote-state write <token>";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = LightConfig::load(None).context("loading configuration")?;
    let client = RemoteStateClient::with_timeout(&config.endpoint, config.timeout())
        .context("building HTTP client")?;

    println!("Remote: {} (override with {})", client.endpoint(), ENDPOINT_ENV);

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["read"] => {
            let state = client.read().context("reading remote state")?;
            println!("{}", state);
        }
        ["write", token] => {
            let ack = client
                .write(token)
                .with_context(|| format!("writing remote state {token:?}"))?;
            println!("{}", ack);
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
