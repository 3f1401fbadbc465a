use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use anchor_auth::{KeyPurpose, SIGNATURE_HEADER, derive_key, signature_hex};

/// Produce an X-Anchor-Signature value for a request body.
///
/// Derives the signing key from the master secret exactly the way the
/// verifying side does, so the printed signature is accepted as-is.
#[derive(Parser)]
struct Args {
    /// Master secret the signing key is derived from.
    #[clap(long, env = "ANCHOR_KEY", hide_env_values = true)]
    secret: String,
    /// Body file to sign; "-" reads stdin.
    #[clap(long, default_value = "-")]
    body: PathBuf,
    /// Print a full header line instead of the bare hex value.
    #[clap(long)]
    header: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let body = read_body(&args.body)?;

    let key = derive_key(args.secret.as_bytes(), KeyPurpose::RequestAuth.context());
    let signature = signature_hex(&key, &body);

    if args.header {
        println!("{SIGNATURE_HEADER}: {signature}");
    } else {
        println!("{signature}");
    }
    Ok(())
}

fn read_body(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("reading body from stdin")?;
        Ok(body)
    } else {
        std::fs::read(path).with_context(|| format!("reading body from {}", path.display()))
    }
}
