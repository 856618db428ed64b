//! `conduit` – runs the demo component system.
//!
//! 1. Loads `~/.conduit/config.toml` (or `CONDUIT_CONFIG`), writing the
//!    defaults on first run.
//! 2. Builds the `Motor` / `Controller` demo, prints its graph and interface
//!    descriptions.
//! 3. Runs it for `demo.run_secs` seconds (forever when `0`) under the
//!    heartbeat supervisor.
//! 4. Intercepts **Ctrl-C** to kill every component and exit cleanly.
//!
//! `conduit --describe` prints the system description as JSON and exits
//! without starting anything.

mod config;
mod demo;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use colored::Colorize;
use conduit_middleware::LifecycleTopic;
use conduit_runtime::{ComponentManager, init_tracing, supervise};
use conduit_types::LifecyclePayload;
use tracing::{error, warn};

/// How often the supervisor polls the watchdog.
const SUPERVISOR_PERIOD: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    let _telemetry = init_tracing("conduit");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {e}", "Error saving config".red()),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let manager = Arc::new(ComponentManager::new(cfg.manager.clone()));
    let mut alerts = manager.subscribe_to(LifecycleTopic::Alerts);

    let handles = match demo::build(&manager, &cfg.demo) {
        Ok(handles) => handles,
        Err(e) => {
            println!("{}: {e}", "Failed to build demo".red().bold());
            std::process::exit(1);
        }
    };

    if std::env::args().any(|arg| arg == "--describe") {
        match serde_json::to_string_pretty(&manager.description()) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("{}: {e}", "Failed to describe system".red()),
        }
        return;
    }

    println!();
    println!("{}", "  System graph".bold().cyan());
    for line in manager.graph_format().lines() {
        println!("    {}", line.dimmed());
    }
    println!();
    for name in manager.names_of_components() {
        if let Some(component) = manager.component(&name) {
            println!("{}", component.description());
        }
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let ctrlc_manager = Arc::clone(&manager);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – killing all components …".yellow().bold());
        if let Err(e) = ctrlc_manager.kill_all() {
            error!(error = %e, "kill on Ctrl-C did not complete");
        }
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not stop the demo cleanly");
    }

    if let Err(e) = manager.create_all().and_then(|()| manager.start_all()) {
        println!("{}: {e}", "Failed to start demo".red().bold());
        let _ = manager.kill_all();
        let _ = manager.cleanup();
        std::process::exit(1);
    }
    println!(
        "\n  {} demo running{}\n",
        "▶".green().bold(),
        if cfg.demo.run_secs == 0 {
            " (Ctrl-C to stop)".to_string()
        } else {
            format!(" for {}s", cfg.demo.run_secs)
        }
    );

    let supervisor = tokio::spawn(supervise(Arc::clone(&manager), SUPERVISOR_PERIOD));

    if cfg.demo.run_secs > 0 {
        tokio::time::sleep(Duration::from_secs(cfg.demo.run_secs)).await;
        let killer = Arc::clone(&manager);
        match tokio::task::spawn_blocking(move || killer.kill_all()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "kill did not complete"),
            Err(e) => error!(error = %e, "kill task failed"),
        }
    }

    let missed = supervisor.await.unwrap_or_else(|e| {
        error!(error = %e, "supervisor task failed");
        Vec::new()
    });
    if let Err(e) = manager.cleanup() {
        error!(error = %e, "cleanup reported an error");
    }

    print_summary(&handles, &missed, &mut alerts);
}

fn print_summary(
    handles: &demo::DemoHandles,
    missed: &[String],
    alerts: &mut conduit_middleware::LifecycleReceiver,
) {
    let state = *handles
        .motor
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let mut overflows = 0;
    let mut faults = Vec::new();
    while let Some(event) = alerts.try_recv() {
        match event.payload {
            LifecyclePayload::MailboxOverflow { dropped, .. } => overflows += dropped,
            LifecyclePayload::CycleFault { message } => faults.push(format!("{}: {message}", event.component)),
            _ => {}
        }
    }

    println!();
    println!("{}", "  Summary".bold().cyan());
    println!("    final speed      {:.2}", state.speed);
    println!("    distance         {:.3}", state.distance);
    println!(
        "    speed events     {}",
        handles.speed_events.load(Ordering::Relaxed)
    );
    println!("    dropped commands {overflows}");
    if missed.is_empty() {
        println!("    heartbeats       {}", "ok".green());
    } else {
        println!("    heartbeats       {} {}", "missed by".yellow(), missed.join(", "));
    }
    for fault in faults {
        println!("    {} {fault}", "fault".red().bold());
    }
    println!();
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "conduit".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Component system demo");
    println!();
}
