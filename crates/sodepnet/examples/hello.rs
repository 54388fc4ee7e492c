//! Sends one "hello" request to a SODEP server and prints the reply.
//!
//! ```text
//! cargo run -p sodepnet --example hello -- [host] [port]
//! ```

use std::time::Duration;

use anyhow::Context;
use sodepnet::Client;
use sodepnet::Message;
use sodepnet::Value;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = match args.next() {
        Some(port) => port.parse().context("port must be a number")?,
        None => 8001,
    };

    let mut client = Client::connect(&host, port, Duration::from_secs(10))?;
    let reply = client.call(&Message::new(1, "/", "operation", Value::new("hello")))?;

    match reply.into_result() {
        Ok(payload) => println!("reply: {:?}", payload),
        Err(fault) => println!("fault: {}", fault),
    }

    client.close()?;
    Ok(())
}
