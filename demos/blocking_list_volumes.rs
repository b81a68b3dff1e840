//! List volumes with direct authentication.
//!
//! Run:
//! `OS_USERNAME=demo OS_PASSWORD=<password> OS_TENANT_NAME=demo \
//!  OS_AUTH_URL=http://keystone:5000/v2.0 cargo run --example blocking_list_volumes`
//!
//! Optional env vars:
//! - `OS_VOLUME_API_VERSION` (defaults to `2`)
//! - `RUST_LOG=cinder_client=debug` to see redacted request/response logs

use cinder_client::{Credentials, HttpOptions, Method, RequestOptions, VersionedClient};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(error) => {
            eprintln!("{error}; set the OS_* variables before running this example.");
            std::process::exit(2);
        }
    };

    let version = std::env::var("OS_VOLUME_API_VERSION").unwrap_or_else(|_| "2".to_owned());
    let options = HttpOptions::default().with_http_log_debug(true);
    let mut client = VersionedClient::from_credentials(&version, credentials, options)?;

    let (_, volumes) = client.request("/volumes/detail", Method::GET, RequestOptions::new())?;
    println!("{}", serde_json::to_string_pretty(&volumes)?);
    Ok(())
}
