use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use console_guide::config::{DriverConfig, GuideConfig, LoggingConfig};
use console_guide::debug::{ConsoleReply, DebugConsole, debug_routes};
use console_guide::dispatcher::{GuideDeps, GuideEngine, resolve_catalog};
use console_guide::host::SimulatedHost;
use console_guide::logging::init_logging;
use console_guide::store::FileStorage;
use console_guide::telemetry::FileExporter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging = init_logging(&LoggingConfig::from_env())?;

    let config = GuideConfig::from_env();
    let driver = DriverConfig::from_env();

    eprintln!("🧭 Console Guide v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   State: {}", driver.state_dir.display());
    eprintln!("   Exports: {}", config.telemetry.export_dir.display());
    if let Some(path) = &logging.log_file_path {
        eprintln!("   Log: {}", path.display());
    }
    if let Some(port) = driver.debug_port {
        eprintln!("   Debug API: http://0.0.0.0:{}/api/guide/progress", port);
    }
    eprintln!("   Type `help` for commands, `quit` to exit.\n");

    // ── Engine ───────────────────────────────────────────────────────────
    let storage = Arc::new(FileStorage::open(&driver.state_dir).await?);
    let catalog = resolve_catalog(&config).await?;
    let host = Arc::new(SimulatedHost::from_catalog(&driver.start_url, &catalog));
    let deps = GuideDeps {
        host,
        storage,
        exporter: Arc::new(FileExporter::new(config.telemetry.export_dir.clone())),
    };
    let engine = GuideEngine::new(config, catalog, deps).await;
    engine.start();

    let console = DebugConsole::new(Arc::clone(&engine));

    // ── Debug HTTP ───────────────────────────────────────────────────────
    if let Some(port) = driver.debug_port {
        let app = debug_routes(console.clone());
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Debug server error: {}", e);
            }
        });
    }

    // ── Console ──────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        match line {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    eprint!("> ");
                    continue;
                }
                match console.execute(&line).await {
                    ConsoleReply::Output(out) => println!("{}\n", out),
                    ConsoleReply::Quit => break,
                }
                eprint!("> ");
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        }
    }

    engine.shutdown();
    Ok(())
}
