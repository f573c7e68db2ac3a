//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::memory_adapter::{InMemoryLedgerStore, InMemoryTradeHistory, ReplayFeed};
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::config_validation::validate_trader_config;
use crate::domain::error::TraderError;
use crate::domain::position_manager::{Collaborators, CycleOutcome, PositionManager};
use crate::domain::strategy::TraderConfig;
use crate::domain::trade::{TradeRecord, TradeSummary};
use crate::ports::ledger_port::LedgerStore;
use crate::ports::trade_history_port::TradeHistory;

#[derive(Parser, Debug)]
#[command(name = "autotrader", about = "Single-asset indicator-driven trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the polling decision loop
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Run exactly one decision cycle
    Cycle {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show position, balance and trade summary
    Status {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Import minute bars from a CSV file
    Ingest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay a CSV bar file through the engine with paper fills
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run { config, cycles } => run_loop(&config, cycles),
        Command::Cycle { config } => run_single_cycle(&config),
        Command::Status { config } => run_status(&config),
        Command::Ingest { config, csv } => run_ingest(&config, &csv),
        Command::Validate { config } => run_validate(&config),
        Command::Simulate { config, csv } => run_simulate(&config, &csv),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<(FileConfigAdapter, TraderConfig), TraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = TraderConfig::from_config(&adapter)?;
    Ok((adapter, config))
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    validate_trader_config(&adapter)?;
    eprintln!("Configuration is valid: {}", config_path.display());
    Ok(())
}

fn print_summary(records: &[TradeRecord]) {
    let summary = TradeSummary::from_records(records);
    println!("Buys:             {}", summary.buys);
    println!("Sells:            {}", summary.sells);
    println!(
        "Win Rate:         {:.1}% ({} wins, {} losses)",
        summary.win_rate * 100.0,
        summary.wins,
        summary.losses
    );
    println!("Average ROI:      {:.3}%", summary.average_roi * 100.0);
    println!("Compounded ROI:   {:.3}%", summary.compounded_roi * 100.0);
}

fn describe(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::InsufficientData { bars, minimum } => {
            format!("insufficient data ({bars}/{minimum} bars)")
        }
        CycleOutcome::NoSignal { score } => format!("no entry (score {score})"),
        CycleOutcome::Vetoed => "entry vetoed by cooldown".to_string(),
        CycleOutcome::Skipped {
            required,
            available,
        } => format!("entry skipped: need {required:.2}, have {available:.2}"),
        CycleOutcome::Entered {
            record,
            score,
            ratio,
        } => format!(
            "bought {:.8} @ {:.2} (score {score}, ratio {ratio})",
            record.amount, record.price
        ),
        CycleOutcome::Held { roi } => format!("holding (roi {:.3}%)", roi * 100.0),
        CycleOutcome::Exited { record, reason } => format!(
            "sold {:.8} @ {:.2} ({reason}, roi {:.3}%)",
            record.amount,
            record.price,
            record.roi.unwrap_or(0.0) * 100.0
        ),
        CycleOutcome::Refused => "sell refused: no holding".to_string(),
    }
}

fn run_simulate(config_path: &Path, csv_path: &Path) -> Result<(), TraderError> {
    let (_, mut config) = load_config(config_path)?;
    config.live_mode = false;

    let series = CsvAdapter::new(csv_path.to_path_buf()).read_bars()?;
    eprintln!("Replaying {} bars from {}", series.len(), csv_path.display());

    let feed = ReplayFeed::new(series, 0);
    let broker = PaperBroker::new(&feed);
    let history = InMemoryTradeHistory::new();
    let ledger = InMemoryLedgerStore::new(config.initial_seed);
    let notifier = LogNotifier::with_prefix("simulate");
    let manager = PositionManager::new(
        &config,
        Collaborators {
            feed: &feed,
            executor: &broker,
            history: &history,
            ledger: &ledger,
            notifier: &notifier,
        },
    );

    let mut failures = 0;
    while feed.advance() {
        let Some(now) = feed.current().map(|b| b.timestamp) else {
            break;
        };
        match manager.run_cycle(now) {
            Ok(outcome @ (CycleOutcome::Entered { .. } | CycleOutcome::Exited { .. })) => {
                eprintln!("{now}  {}", describe(&outcome));
            }
            Ok(_) => {}
            Err(e) => {
                failures += 1;
                log::error!("{now}: cycle failed: {e}");
            }
        }
    }

    let records = history.records()?;
    println!("\n=== Simulation Results ===");
    println!("Cycles:           {}", feed.revealed());
    println!("Failed cycles:    {failures}");
    println!("Initial Balance:  {:.2}", config.initial_seed);
    println!("Final Balance:    {:.2}", ledger.load()?);
    println!("Holding:          {:.8}", manager.holding()?);
    print_summary(&records);
    Ok(())
}

#[cfg(feature = "sqlite")]
mod live {
    use super::*;
    use crate::adapters::json_ledger_adapter::JsonLedgerAdapter;
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::position_manager::PositionState;
    use crate::domain::session::Session;
    use crate::ports::config_port::ConfigPort;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    pub fn open_sqlite(adapter: &dyn ConfigPort) -> Result<SqliteAdapter, TraderError> {
        let db = SqliteAdapter::from_config(adapter)?;
        db.initialize_schema()?;
        Ok(db)
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// Wire the persistent collaborators and hand a manager to `f`.
    fn with_manager<T>(
        config_path: &Path,
        f: impl FnOnce(&TraderConfig, PositionManager<'_>, &SqliteAdapter) -> Result<T, TraderError>,
    ) -> Result<T, TraderError> {
        let (adapter, config) = load_config(config_path)?;
        let db = open_sqlite(&adapter)?;
        let ledger = JsonLedgerAdapter::open(&config.ledger_path, config.initial_seed)?;
        let broker = PaperBroker::new(&db);
        let notifier = LogNotifier::new();
        let manager = PositionManager::new(
            &config,
            Collaborators {
                feed: &db,
                executor: &broker,
                history: &db,
                ledger: &ledger,
                notifier: &notifier,
            },
        );
        f(&config, manager, &db)
    }

    pub fn run_loop(config_path: &Path, cycles: Option<usize>) -> Result<(), TraderError> {
        with_manager(config_path, |config, manager, _| {
            let mode = if config.live_mode { "live" } else { "simulated" };
            eprintln!(
                "Starting {mode} session: every {}s, {} bar window",
                config.interval.as_secs(),
                config.window
            );
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                log::info!("shutdown requested, finishing the current cycle");
                flag.store(true, Ordering::SeqCst);
            })
            .map_err(|e| TraderError::Io(std::io::Error::other(e.to_string())))?;

            let session = Session::new(manager, config.interval, shutdown);
            let report = session.run(cycles, now);
            eprintln!(
                "Session ended: {} cycles, {} failed, {} entries, {} exits",
                report.cycles, report.failures, report.entries, report.exits
            );
            match session.manager().halted() {
                Some(reason) => Err(TraderError::Unreconciled { reason }),
                None => Ok(()),
            }
        })
    }

    pub fn run_single_cycle(config_path: &Path) -> Result<(), TraderError> {
        with_manager(config_path, |_, manager, _| {
            manager.reconcile()?;
            let outcome = manager.run_cycle(now())?;
            println!("{}", describe(&outcome));
            Ok(())
        })
    }

    pub fn run_status(config_path: &Path) -> Result<(), TraderError> {
        with_manager(config_path, |config, manager, db| {
            let balance = manager.reconcile()?;
            let state = manager.state()?;
            let records = db.records()?;

            println!("=== Status ===");
            match db.bar_range()? {
                Some((first, last, count)) => {
                    println!("Bars:             {count} ({first} to {last})")
                }
                None => println!("Bars:             none"),
            }
            match state {
                PositionState::Flat => println!("Position:         flat"),
                PositionState::Open {
                    entry_price,
                    amount,
                } => println!("Position:         open {amount:.8} @ {entry_price:.2}"),
            }
            println!("Holding:          {:.8}", manager.holding()?);
            println!("Balance:          {balance:.2}");
            println!(
                "Mode:             {}",
                if config.live_mode { "live" } else { "simulated" }
            );
            print_summary(&records);
            Ok(())
        })
    }

    pub fn run_ingest(config_path: &Path, csv_path: &Path) -> Result<(), TraderError> {
        let adapter = FileConfigAdapter::from_file(config_path)?;
        let db = open_sqlite(&adapter)?;
        let series = CsvAdapter::new(csv_path.to_path_buf()).read_bars()?;
        let inserted = db.insert_bars(series.bars())?;
        eprintln!(
            "Imported {inserted} new bars ({} already present) from {}",
            series.len() - inserted,
            csv_path.display()
        );
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
use live::{run_ingest, run_loop, run_single_cycle, run_status};

#[cfg(not(feature = "sqlite"))]
fn sqlite_required() -> Result<(), TraderError> {
    Err(TraderError::Database {
        reason: "sqlite feature is required for this command".to_string(),
    })
}

#[cfg(not(feature = "sqlite"))]
fn run_loop(_: &Path, _: Option<usize>) -> Result<(), TraderError> {
    sqlite_required()
}

#[cfg(not(feature = "sqlite"))]
fn run_single_cycle(_: &Path) -> Result<(), TraderError> {
    sqlite_required()
}

#[cfg(not(feature = "sqlite"))]
fn run_status(_: &Path) -> Result<(), TraderError> {
    sqlite_required()
}

#[cfg(not(feature = "sqlite"))]
fn run_ingest(_: &Path, _: &Path) -> Result<(), TraderError> {
    sqlite_required()
}
