//! Presence Sim CLI
//!
//! Runs the presence engine against an in-memory page.

use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver, Sender};
use presence_sim::{
    config::Config, host::TargetElement, Host, Orchestrator, SimulatedHost, WakeLockBehavior,
    PANIC_CHORD, SESSION_NOTICE, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "presence-sim")]
#[command(version = VERSION)]
#[command(about = "Background presence simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session against a simulated page
    Run {
        /// Maximum length of the simulated text field
        #[arg(long)]
        capacity: Option<usize>,

        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration: Option<u64>,

        /// How the simulated wake lock API behaves (grant, reject or unsupported)
        #[arg(long, default_value = "grant")]
        wake: String,

        /// Do not maintain the wake lock while active
        #[arg(long)]
        no_wake_lock: bool,
    },

    /// Show the panic-exit chord
    Chord,

    /// Display the session notice
    Notice,

    /// Show configuration
    Config {
        /// Overwrite the configuration file with defaults
        #[arg(long)]
        reset: bool,
    },
}

/// State changes forwarded from engine observers to the print loop.
enum StateEvent {
    Active(bool),
    Wake(bool),
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            capacity,
            duration,
            wake,
            no_wake_lock,
        } => {
            cmd_run(capacity, duration, &wake, no_wake_lock);
        }
        Commands::Chord => {
            println!("{PANIC_CHORD}");
        }
        Commands::Notice => {
            println!("{SESSION_NOTICE}");
        }
        Commands::Config { reset } => {
            cmd_config(reset);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("presence_sim=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn parse_wake_behavior(s: &str) -> Option<WakeLockBehavior> {
    match s.trim().to_lowercase().as_str() {
        "grant" => Some(WakeLockBehavior::Grant),
        "reject" => Some(WakeLockBehavior::Reject),
        "unsupported" => Some(WakeLockBehavior::Unsupported),
        _ => None,
    }
}

fn cmd_run(capacity: Option<usize>, duration: Option<u64>, wake: &str, no_wake_lock: bool) {
    println!("Presence Sim v{VERSION}");
    println!("{SESSION_NOTICE}");

    let Some(behavior) = parse_wake_behavior(wake) else {
        eprintln!("Error: --wake must be one of grant, reject, unsupported");
        std::process::exit(1);
    };

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config, using defaults: {e}");
            Config::default()
        }
    };
    if no_wake_lock {
        config.keep_awake = false;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
        eprintln!("Warning: Could not install Ctrl+C handler: {e}");
    }

    runtime.block_on(async move {
        let page = SimulatedHost::new(behavior);
        let field = page.create_text_field(capacity);

        let engine = match Orchestrator::new(Host::from_shared(Arc::new(page)), config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Error creating engine: {e}");
                return;
            }
        };

        let (tx, rx): (Sender<StateEvent>, Receiver<StateEvent>) = unbounded();
        let active_tx = tx.clone();
        let _active = engine.subscribe_active(move |active| {
            let _ = active_tx.send(StateEvent::Active(*active));
        });
        let _wake = engine.subscribe_wake(move |held| {
            let _ = tx.send(StateEvent::Wake(*held));
        });

        engine.activate(field.clone());
        println!("Press Ctrl+C to stop");
        println!();

        let started = Instant::now();
        let deadline = duration.map(Duration::from_secs);
        let mut last_report = Instant::now();

        while running.load(Ordering::SeqCst) {
            while let Ok(event) = rx.try_recv() {
                match event {
                    StateEvent::Active(active) => println!("[state] active: {active}"),
                    StateEvent::Wake(held) => println!("[state] wake lock held: {held}"),
                }
            }

            if deadline.is_some_and(|d| started.elapsed() >= d) {
                break;
            }

            if last_report.elapsed() >= Duration::from_secs(1) {
                let value = field.value();
                let tail: String = value
                    .chars()
                    .rev()
                    .take(40)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                println!("[field] {} chars | ...{tail}", value.chars().count());
                last_report = Instant::now();
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        println!();
        println!("Stopping...");
        engine.shutdown().await;

        while let Ok(event) = rx.try_recv() {
            match event {
                StateEvent::Active(active) => println!("[state] active: {active}"),
                StateEvent::Wake(held) => println!("[state] wake lock held: {held}"),
            }
        }

        println!();
        println!("{}", engine.activity_log().summary());
    });
}

fn cmd_config(reset: bool) {
    let config = if reset {
        let config = Config::default();
        if let Err(e) = config.save() {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
        config
    } else {
        match Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                std::process::exit(1);
            }
        }
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
