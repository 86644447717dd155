//! SafeWalk host companion
//!
//! Thread-based driver for the proximity engine using std::sync::mpsc
//! channels. Reads NDJSON commands from stdin, answers nearby lookups from
//! saved search responses and writes NDJSON messages to stdout. Logs go to
//! stderr (`RUST_LOG`).

mod providers;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use anyhow::{anyhow, Context};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};

use safewalk::bridge::{encode_message, parse_command, LineReader};
use safewalk::defaults::{self, DEFAULT_MAP_CENTER, SEARCH_RADIUS_DEG, WIDE_SEARCH_RADIUS_DEG};
use safewalk::dialer::place_call;
use safewalk::geo::Coordinate;
use safewalk::hotspot::{AlertPolicy, GeofenceTracker, Hotspot, MAX_HOTSPOTS};
use safewalk::nearby::{Category, RankedResult, DEFAULT_MAX_RESULTS};
use safewalk::protocol::{
    parse_hotspot_config, AppMessage, MsgBuffer, UiCommand, HOTSPOT_ALERT_TEXT, MAX_MSG_LEN,
    VERSION,
};
use safewalk::provider::{AlertSink, LocationProvider, Permission};
use safewalk::session::{LookupError, LookupOutcome, NearbyLookup};

use providers::{FileSearch, LogAlertSink, LogDialer, StartLocation};

type HotspotList = heapless::Vec<Hotspot, MAX_HOTSPOTS>;

#[derive(Debug, Parser)]
#[command(name = "safewalk-host", version, about = "Drive the SafeWalk proximity engine over NDJSON")]
struct Args {
    /// Hotspot configuration file ({"hotspots":[{"lat","lng","radius"}]}).
    /// Defaults to the reference hotspots.
    #[arg(long)]
    hotspots: Option<PathBuf>,

    /// Directory of saved search responses named <term>.json
    #[arg(long, default_value = "places")]
    places_dir: PathBuf,

    #[arg(long, value_enum, default_value = "per-entry")]
    alert_policy: PolicyArg,

    /// Cap on ranked results per lookup (1 to 15)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_RESULTS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=DEFAULT_MAX_RESULTS as u64)
    )]
    max_results: usize,

    /// Search a ~3 km viewbox instead of ~2 km
    #[arg(long)]
    wide: bool,

    /// Start position latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Start position longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// One alert when a hotspot is entered
    PerEntry,
    /// One alert per matched hotspot on every fix
    PerMatch,
}

impl From<PolicyArg> for AlertPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::PerEntry => AlertPolicy::PerEntry,
            PolicyArg::PerMatch => AlertPolicy::PerMatch,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("SafeWalk host v{} starting", VERSION);

    let hotspots = load_hotspots(args.hotspots.as_deref())?;
    log::info!("Hotspots loaded: {}", hotspots.len());

    let start = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng).context("invalid start position")?),
        _ => None,
    };
    let (lat, lng) = DEFAULT_MAP_CENTER;
    let default_center = Coordinate::new(lat, lng).context("default map center")?;

    let lookup = NearbyLookup::new()
        .with_max_results(args.max_results)
        .with_radius_deg(if args.wide {
            WIDE_SEARCH_RADIUS_DEG
        } else {
            SEARCH_RADIUS_DEG
        });

    let mut engine = Engine {
        hotspots,
        tracker: GeofenceTracker::new(args.alert_policy.into()),
        lookup,
        search: FileSearch::new(args.places_dir),
        dialer: LogDialer,
        alerts: LogAlertSink,
    };
    let mut location = StartLocation::new(start);

    // ── Channels ─────────────────────────────────────────────────────

    let (cmd_tx, cmd_rx) = mpsc::sync_channel::<UiCommand>(4);
    let (output_tx, output_rx) = mpsc::sync_channel::<MsgBuffer>(32);

    // ── Output thread ────────────────────────────────────────────────

    let output = thread::Builder::new()
        .name("output".into())
        .spawn(move || output_thread(output_rx))?;

    // ── Engine thread ────────────────────────────────────────────────

    let engine_output_tx = output_tx.clone();
    let engine_thread = thread::Builder::new().name("engine".into()).spawn(move || {
        engine.announce(start.unwrap_or(default_center), &engine_output_tx);

        match location.request_permission() {
            Permission::Granted => match location.current_fix() {
                Ok(fix) => engine.handle(UiCommand::Fix { coordinate: fix }, &engine_output_tx),
                Err(e) => log::warn!("No start fix: {:#}", e),
            },
            Permission::Denied => log::info!("No start position; waiting for fixes on stdin"),
        }

        while let Ok(cmd) = cmd_rx.recv() {
            engine.handle(cmd, &engine_output_tx);
        }
    })?;

    // ── Command reader (main thread) ─────────────────────────────────

    read_commands(io::stdin().lock(), &cmd_tx, &output_tx)?;
    drop(cmd_tx);
    drop(output_tx);

    engine_thread
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    output
        .join()
        .map_err(|_| anyhow!("output thread panicked"))?
        .context("writing to stdout")?;

    log::info!("Input closed, exiting");
    Ok(())
}

fn load_hotspots(path: Option<&Path>) -> anyhow::Result<HotspotList> {
    let Some(path) = path else {
        let reference = defaults::reference_hotspots().context("reference hotspots")?;
        return HotspotList::from_slice(&reference)
            .map_err(|_| anyhow!("reference hotspots exceed {}", MAX_HOTSPOTS));
    };

    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let config =
        parse_hotspot_config(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config.hotspots)
}

// ── Command reader ───────────────────────────────────────────────────

fn read_commands(
    input: impl Read,
    cmd_tx: &SyncSender<UiCommand>,
    output_tx: &SyncSender<MsgBuffer>,
) -> anyhow::Result<()> {
    let mut reader = LineReader::new();

    for byte in input.bytes() {
        let byte = byte.context("reading stdin")?;
        let Some(line) = reader.feed(byte) else {
            continue;
        };

        match parse_command(line) {
            Ok(cmd) => {
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Rejected command: {}", e);
                let reason = e.to_string();
                send(
                    output_tx,
                    &AppMessage::Error {
                        reason: &reason,
                        emergency: None,
                    },
                );
            }
        }
    }

    Ok(())
}

// ── Engine ───────────────────────────────────────────────────────────

struct Engine {
    hotspots: HotspotList,
    tracker: GeofenceTracker,
    lookup: NearbyLookup,
    search: FileSearch,
    dialer: LogDialer,
    alerts: LogAlertSink,
}

impl Engine {
    /// Announce the map center and the configured hotspots.
    fn announce(&self, center: Coordinate, out: &SyncSender<MsgBuffer>) {
        send(
            out,
            &AppMessage::Ready {
                version: VERSION,
                center,
                hotspots: self.hotspots.len(),
            },
        );
        for (index, hotspot) in self.hotspots.iter().enumerate() {
            send(out, &AppMessage::Hotspot { index, hotspot });
        }
    }

    fn handle(&mut self, cmd: UiCommand, out: &SyncSender<MsgBuffer>) {
        match cmd {
            UiCommand::Fix { coordinate } => {
                self.lookup.update_fix(coordinate);
                for event in self.tracker.update(&coordinate, &self.hotspots) {
                    self.alerts.hotspot_alert(&event);
                    send(
                        out,
                        &AppMessage::HotspotAlert {
                            hotspot: event.hotspot,
                            distance_m: event.distance_m.round() as u32,
                            message: HOTSPOT_ALERT_TEXT,
                        },
                    );
                }
            }
            UiCommand::Nearby { category } => {
                let result = self.lookup.select_category(category, &mut self.search);
                self.report_lookup(category, result, out);
            }
            UiCommand::Clear => {
                let category = self.lookup.active_category();
                self.lookup.clear();
                send(out, &AppMessage::Cleared { category });
            }
            UiCommand::Call { number } => {
                let outcome = place_call(&mut self.dialer, &number);
                send(
                    out,
                    &AppMessage::Call {
                        number: &number,
                        outcome: outcome.as_str(),
                    },
                );
            }
        }
    }

    fn report_lookup(
        &self,
        category: Category,
        result: Result<LookupOutcome, LookupError<anyhow::Error>>,
        out: &SyncSender<MsgBuffer>,
    ) {
        match result {
            Ok(LookupOutcome::Results(ranked)) => {
                let count = self
                    .lookup
                    .results()
                    .iter()
                    .filter(|r| send_place(r, out))
                    .count();
                if count < ranked {
                    log::warn!("{} of {} {} rows dropped", ranked - count, ranked, category.as_str());
                }
                if count == 0 {
                    send(
                        out,
                        &AppMessage::NoResults {
                            category,
                            emergency: category.emergency_number(),
                        },
                    );
                } else {
                    send(out, &AppMessage::NearbyDone { category, count });
                }
            }
            Ok(LookupOutcome::Empty { emergency }) => {
                send(out, &AppMessage::NoResults { category, emergency });
            }
            Ok(LookupOutcome::Cleared) => {
                send(
                    out,
                    &AppMessage::Cleared {
                        category: Some(category),
                    },
                );
            }
            Err(LookupError::NoLocationFix) => {
                send(
                    out,
                    &AppMessage::Error {
                        reason: "no location fix",
                        emergency: None,
                    },
                );
            }
            Err(LookupError::Search(e)) => {
                log::error!("{} search failed: {:#}", category.as_str(), e);
                send(
                    out,
                    &AppMessage::Error {
                        reason: "nearby search failed",
                        emergency: Some(category.emergency_number()),
                    },
                );
            }
        }
    }
}

/// Returns whether the row was sent.
fn send_place(r: &RankedResult, out: &SyncSender<MsgBuffer>) -> bool {
    let c = &r.candidate;
    let id = c.display_id();
    let distance = r.distance_label();
    send(
        out,
        &AppMessage::Place {
            id: &id,
            category: c.category,
            name: &c.name,
            address: &c.address,
            lat: c.coordinate.latitude(),
            lng: c.coordinate.longitude(),
            distance_m: r.distance_m.round() as u32,
            distance: &distance,
            phone: c.category.emergency_number(),
        },
    )
}

fn send(out: &SyncSender<MsgBuffer>, msg: &AppMessage) -> bool {
    match encode_message(msg) {
        Some(buf) => out.send(buf).is_ok(),
        None => {
            log::warn!("Message exceeds {} bytes, dropped", MAX_MSG_LEN);
            false
        }
    }
}

// ── Output thread ────────────────────────────────────────────────────

fn output_thread(output_rx: Receiver<MsgBuffer>) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    while let Ok(msg) = output_rx.recv() {
        stdout.write_all(&msg)?;
        stdout.flush()?;
    }
    Ok(())
}
