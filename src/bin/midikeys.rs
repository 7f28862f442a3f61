// Midikeys CLI
// Listens on a MIDI input port and fires mapped keystrokes

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;

use midikeys_core::input::{list_input_devices, select_device, MidiSource};
use midikeys_core::{
    Classified, Dispatcher, EventClassifier, MappingTable, PulseScheduler, RotaryTracker, Settings,
    UinputSink,
};

/// MIDI control surface to keystroke daemon
#[derive(Parser, Debug)]
#[command(name = "midikeys")]
#[command(version)]
#[command(about = "Translate MIDI control events into keystrokes", long_about = None)]
struct Args {
    /// MIDI input port index or name substring (defaults to the first port)
    port: Option<String>,

    /// Path to the mappings CSV
    #[arg(short, long, value_name = "CSV", default_value = "mappings.csv")]
    mappings: PathBuf,

    /// TOML settings file (defaults to ~/.config/midikeys/settings.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Scheduler tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Jog state timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Samples per direction before a jog pulse fires
    #[arg(long)]
    threshold: Option<u32>,

    /// EMA smoothing factor (0..1)
    #[arg(long)]
    alpha: Option<f32>,

    /// Normalized deadzone (0..1)
    #[arg(long)]
    deadzone: Option<f32>,

    /// Nonlinear response curve power
    #[arg(long)]
    power: Option<f32>,

    /// Max pulses per second at full jog deflection
    #[arg(long)]
    max_rate: Option<f32>,

    /// Do not send keypresses; log the resolved actions instead
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let context = portmidi::PortMidi::new()
        .map_err(|e| anyhow::anyhow!("failed to initialize MIDI backend: {:?}", e))?;

    if args.list_ports {
        return list_ports(&context);
    }

    let settings = resolve_settings(&args)?;
    let overrides = settings
        .override_channels()
        .context("invalid override-channel configuration")?;

    let table = MappingTable::load(&args.mappings);
    if table.is_empty() {
        log::warn!("no mappings loaded; only override-channel jogs will fire");
    }

    let device = select_device(&context, args.port.as_deref())?;
    log::info!("listening on MIDI port '{}'", device.name());
    let source = MidiSource::open(&context, device)?;

    let dispatcher = if settings.dry_run {
        log::info!("dry-run mode: actions will be logged, not injected");
        Dispatcher::dry_run()
    } else {
        let sink = UinputSink::new()
            .context("failed to create virtual keyboard (is /dev/uinput accessible?)")?;
        Dispatcher::new(Box::new(sink))
    };
    let dispatcher = Arc::new(Mutex::new(dispatcher));

    let tracker = Arc::new(RotaryTracker::new(settings.rotary_params()));
    let running = Arc::new(AtomicBool::new(true));
    install_signal_handler(running.clone())?;

    let scheduler = PulseScheduler::new(
        tracker.clone(),
        dispatcher.clone(),
        settings.tick_interval(),
        running.clone(),
    );
    let scheduler_handle = scheduler.spawn().context("failed to start pulse scheduler")?;

    let classifier = EventClassifier::new(Arc::new(table), overrides);
    run_ingestion(source, classifier, &tracker, &dispatcher, &running);

    // Let the scheduler convert what is still buffered, then stop it.
    drain_rotary_state(
        &tracker,
        &running,
        settings.tick_interval(),
        Duration::from_millis(settings.idle_timeout_ms),
    );
    running.store(false, Ordering::SeqCst);
    let _ = scheduler_handle.join();

    log::info!("midikeys stopped");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn list_ports(context: &portmidi::PortMidi) -> anyhow::Result<()> {
    let devices = list_input_devices(context)?;
    if devices.is_empty() {
        println!("No MIDI input ports found");
        return Ok(());
    }
    println!("Available MIDI inputs:");
    for device in &devices {
        println!("  {}: {}", device.index, device.name);
    }
    Ok(())
}

/// Settings precedence: built-in defaults, then the TOML file, then CLI
/// flags.
fn resolve_settings(args: &Args) -> anyhow::Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load_default().context("failed to load settings")?,
    };

    if let Some(interval) = args.interval {
        settings.tick_interval_ms = interval;
    }
    if let Some(timeout) = args.timeout {
        settings.idle_timeout_ms = timeout;
    }
    if let Some(threshold) = args.threshold {
        settings.pulse_threshold = threshold;
    }
    if let Some(alpha) = args.alpha {
        settings.alpha = alpha;
    }
    if let Some(deadzone) = args.deadzone {
        settings.deadzone = deadzone;
    }
    if let Some(power) = args.power {
        settings.power = power;
    }
    if let Some(max_rate) = args.max_rate {
        settings.max_rate = max_rate;
    }
    if args.dry_run {
        settings.dry_run = true;
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn install_signal_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handler")?;
    thread::spawn(move || {
        for signal in &mut signals {
            match signal {
                SIGINT | SIGTERM => {
                    log::info!("received signal, shutting down gracefully");
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                _ => {}
            }
        }
    });
    Ok(())
}

/// The event-ingestion loop: poll the port, classify, hand off. Ends on
/// shutdown or when the source becomes unavailable.
fn run_ingestion(
    mut source: MidiSource<'_>,
    mut classifier: EventClassifier,
    tracker: &RotaryTracker,
    dispatcher: &Mutex<Dispatcher>,
    running: &AtomicBool,
) {
    const IDLE_SLEEP: Duration = Duration::from_millis(2);

    log::info!("midikeys is running. Press Ctrl+C to exit.");
    while running.load(Ordering::SeqCst) {
        let events = match source.poll_events() {
            Ok(events) => events,
            Err(e) => {
                log::error!("MIDI source unavailable: {}", e);
                break;
            }
        };
        if events.is_empty() {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        let now = Instant::now();
        for event in events {
            log::debug!("event {:?}", event);
            match classifier.classify(&event) {
                Classified::Press(combo) => dispatcher.lock().dispatch(&combo),
                Classified::Rotary {
                    identity,
                    value,
                    policy,
                    pair,
                } => tracker.record_sample(identity, value, policy, &pair, now),
                Classified::Discard => {}
            }
        }
    }
}

/// After ingestion ends, keep the scheduler alive until the remaining
/// rotary state has fired or timed out.
fn drain_rotary_state(
    tracker: &RotaryTracker,
    running: &AtomicBool,
    tick: Duration,
    idle_timeout: Duration,
) {
    if tracker.active_controls() == 0 {
        return;
    }
    log::info!("draining remaining rotary state");
    let deadline = Instant::now() + idle_timeout + tick * 2;
    while running.load(Ordering::SeqCst)
        && tracker.active_controls() > 0
        && Instant::now() < deadline
    {
        thread::sleep(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["midikeys"]);
        assert_eq!(args.port, None);
        assert_eq!(args.mappings, PathBuf::from("mappings.csv"));
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert!(!args.list_ports);
        assert_eq!(args.interval, None);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "midikeys",
            "MT Pro",
            "--mappings",
            "/tmp/test.csv",
            "--max-rate",
            "40.0",
            "--dry-run",
            "--verbose",
        ]);
        assert_eq!(args.port.as_deref(), Some("MT Pro"));
        assert_eq!(args.mappings, PathBuf::from("/tmp/test.csv"));
        assert_eq!(args.max_rate, Some(40.0));
        assert!(args.dry_run);
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_overrides_settings() {
        let args = Args::parse_from([
            "midikeys",
            "--interval",
            "20",
            "--timeout",
            "500",
            "--threshold",
            "10",
            "--alpha",
            "0.5",
        ]);
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.tick_interval_ms, 20);
        assert_eq!(settings.idle_timeout_ms, 500);
        assert_eq!(settings.pulse_threshold, 10);
        assert_eq!(settings.alpha, 0.5);
        // Untouched values keep their defaults.
        assert_eq!(settings.power, 1.3);
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        let args = Args::parse_from(["midikeys", "--alpha", "1.5"]);
        assert!(resolve_settings(&args).is_err());
    }
}
