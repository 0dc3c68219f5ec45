use clap::Parser;
use rsp_ma_bot::utils::{logger, validation::Validate};
use rsp_ma_bot::{
    build_dry_run_engine, build_engine, once_exit_code, CliArgs, CycleOutcome, Settings,
};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Unable to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }

    tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };
    args.apply(&mut settings);

    logger::init_logger(&settings.logging.level, settings.log_format(), args.verbose);

    if args.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let validation = if args.dry_run {
        settings
            .validate_settings()
            .and_then(|_| settings.validate_alpaca_credentials())
    } else {
        settings.validate()
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!(
        "MA bot starting. Symbol='{}', sheet='{}', tab='{}', cell='{}', window={}, interval={}s{}",
        settings.alpaca.symbol,
        settings
            .sheets
            .sheet_id
            .as_deref()
            .unwrap_or(&settings.sheets.sheet_name),
        settings.sheets.tab_name,
        settings.sheets.target_cell,
        settings.strategy.ma_window,
        settings.schedule.refresh_interval_seconds,
        if args.dry_run { " (dry run)" } else { "" }
    );

    let engine = if args.dry_run {
        build_dry_run_engine(settings)
    } else {
        build_engine(settings)
    };
    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(
                "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    if !args.once {
        let cycles = engine.run(shutdown_signal()).await;
        tracing::info!("MA bot stopped after {} cycles", cycles);
        return Ok(());
    }

    let outcome = engine.run_once().await;
    match &outcome {
        Ok(CycleOutcome::Updated(report)) => {
            println!(
                "{} {} vs {}-day MA {:.4} ({:+.2}%) => {}",
                report.signal.symbol,
                report.signal.last_price,
                report.signal.window,
                report.signal.ma_value,
                report.signal.diff_pct,
                report.signal.label
            );
        }
        Ok(CycleOutcome::Skipped { reason }) => {
            eprintln!("⚠️  Cycle skipped: {}", reason);
        }
        Err(e) => {
            tracing::error!(
                "❌ Update cycle failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
        }
    }

    let exit_code = once_exit_code(&outcome);
    if exit_code > 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
