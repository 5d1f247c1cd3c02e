//! Line-oriented JSON driver.
//!
//! Reads one request per line on stdin and writes one response per line on
//! stdout. Tracing goes to stderr so it never interleaves with responses.
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tactics_runtime::{Request, Runtime, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env()?;
    let runtime = Runtime::from_config(&config)?;
    let handle = runtime.handle();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let greeting = handle.status().await?;
    write_line(&mut stdout, &serde_json::to_string(&greeting)?).await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let shutting_down = serde_json::from_str::<Request>(&line)
            .is_ok_and(|request| request.cmd.as_deref() == Some("shutdown"));
        let response = handle.request_json(line).await?;
        write_line(&mut stdout, &serde_json::to_string(&response)?).await?;
        if shutting_down {
            break;
        }
    }

    drop(handle);
    runtime.shutdown().await?;
    Ok(())
}

async fn write_line(out: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
