//! Dumps the v1 API description so client generators can run without a live
//! server.
//!
//! Run with: cargo run --bin openapi-export -- --output docs/api.json --compact

use std::{fs, path::PathBuf};

use anyhow::Context;
use bookstore_api::openapi::ApiDocV1;
use clap::Parser;
use utoipa::OpenApi;

#[derive(Debug, Parser)]
#[command(name = "openapi-export", about = "Write the bookstore OpenAPI document to disk")]
struct Args {
    /// Destination file; parent directories are created as needed
    #[arg(long, short, default_value = "openapi/bookstore-api.v1.json")]
    output: PathBuf,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let document = ApiDocV1::openapi();
    let rendered = if args.compact {
        serde_json::to_string(&document)
    } else {
        serde_json::to_string_pretty(&document)
    }
    .context("serializing the API document")?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&args.output, &rendered)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "{} paths exported to {}",
        document.paths.paths.len(),
        args.output.display()
    );
    Ok(())
}
