//! Wi-Fi setup tool for the DYMO LabelManager Wireless PnP
//!
//! Switches the printer's radio on, lists the networks it can see and
//! submits the chosen one together with its password, all over USB.

mod console;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};

use dymo_device::{CancelToken, Error, LabelManager, Session, SessionConfig, hex_separated};
use dymo_usb::UsbTransport;

use console::{Console, Credentials, NetworkChoice, mac_address, write_networks};

#[derive(Parser)]
#[command(name = "dymo-wifi")]
#[command(about = "Configure Wi-Fi on a DYMO LabelManager Wireless PnP")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pause between two status queries, in milliseconds
    #[arg(long, env = "DYMO_WIFI_POLL_MS", default_value = "1000", global = true)]
    poll_ms: u64,

    /// Give up on any single wait after this many seconds (0 waits forever)
    #[arg(long, env = "DYMO_WIFI_MAX_WAIT_SECS", global = true)]
    max_wait_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start Wi-Fi, scan and join a network
    Configure {
        /// Network to join: number from the scan list, or ESSID
        #[arg(short, long)]
        network: Option<String>,
        /// Credentials file (ESSID on line 1, password on line 2)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show system and network status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Start Wi-Fi and list the networks in range
    Scan {
        #[arg(long)]
        json: bool,
    },
    /// Switch the radio on or off
    Wifi {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Show the MAC address of the Wi-Fi interface
    Mac,
    /// Query an object and hex dump the raw reply
    Dump {
        /// Object id, decimal or 0x prefixed hex
        #[arg(value_parser = parse_object_id)]
        object: u8,
        /// Send the 57 byte zero fill some objects expect
        #[arg(long)]
        fill: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Commands {
    fn is_json(&self) -> bool {
        matches!(self, Commands::Status { json: true } | Commands::Scan { json: true })
    }
}

fn parse_object_id(arg: &str) -> Result<u8, String> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => arg.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid object id {arg:?}: {e}"))
}

fn session_config(cli: &Cli) -> SessionConfig {
    let config = SessionConfig {
        poll_interval: Duration::from_millis(cli.poll_ms),
        ..SessionConfig::default()
    };
    match cli.max_wait_secs {
        Some(0) => config.with_max_wait(None),
        Some(secs) => config.with_max_wait(Some(Duration::from_secs(secs))),
        None => config,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "warn" }),
    )
    .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nerror: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    ctrlc::set_handler(move || {
        if trip.is_cancelled() {
            std::process::exit(130);
        }
        warn!("interrupted, stopping after the current exchange (press again to quit now)");
        trip.cancel();
    })?;

    let config = session_config(&cli);
    debug!("session config: {config:?}");

    let transport = UsbTransport::open().map_err(Error::from)?;
    let serial = transport.serial_number().unwrap_or("unknown").to_string();
    if cli.command.is_json() {
        info!("connected to LabelManager (serial no. {serial})");
    } else {
        println!("Connected to LabelManager (serial no. {serial})");
    }

    let device = LabelManager::new(transport).with_cancel(cancel);
    let mut session = Session::new(device, config);

    match cli.command {
        Commands::Configure { network, file } => configure(&mut session, network, file),
        Commands::Status { json } => status(&mut session, json),
        Commands::Scan { json } => scan(&mut session, json),
        Commands::Wifi { state } => {
            let enable = matches!(state, Switch::On);
            session.device().set_wifi_enabled(enable)?;
            println!("Wi-Fi switched {}", if enable { "on" } else { "off" });
            Ok(())
        }
        Commands::Mac => {
            let mac = session.device().interface_mac()?;
            println!("MAC-Address: {}", mac_address(&mac));
            Ok(())
        }
        Commands::Dump { object, fill } => dump(&mut session, object, fill),
    }
}

fn configure(
    session: &mut Session<UsbTransport>,
    network: Option<String>,
    file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = file.as_deref().map(Credentials::read).transpose()?;
    let choice = match (network, &credentials) {
        (Some(network), _) => Some(NetworkChoice::parse(&network)),
        (None, Some(credentials)) => Some(NetworkChoice::Essid(credentials.essid.clone())),
        (None, None) => None,
    };
    let mut console = Console::stdin(io::stdout())
        .with_choice(choice)
        .with_password(credentials.map(|c| c.password));

    let system = session.device().system_status()?;
    debug!("system status:\n{system}");

    session.bring_up_radio(&mut console)?;
    let mac = session.device().interface_mac()?;
    println!("MAC-Address: {}\n", mac_address(&mac));

    let status = session.configure(&mut console)?;
    debug!("network status:\n{status}");
    Ok(())
}

fn status(session: &mut Session<UsbTransport>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let system = session.device().system_status()?;
    let network = session.device().network_status()?;

    if json {
        let report = serde_json::json!({ "system": system, "network": network });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("System status:\n{system}\n\nNetwork status:\n{network}");
    }
    Ok(())
}

fn scan(session: &mut Session<UsbTransport>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Progress goes to stderr so stdout stays clean for --json
    let mut console = Console::stdin(io::stderr());
    session.bring_up_radio(&mut console)?;
    let networks = session.scan(&mut console)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&networks)?);
    } else if networks.is_empty() {
        println!("No networks found");
    } else {
        write_networks(&mut io::stdout().lock(), &networks)?;
    }
    Ok(())
}

fn dump(session: &mut Session<UsbTransport>, object: u8, fill: bool) -> Result<(), Box<dyn std::error::Error>> {
    let response = session.device().query_object(object, fill)?;
    println!(
        "object 0x{object:02x} -> response 0x{:02x}, length {}, status {}",
        response.response_id, response.declared_length, response.status
    );
    for (row, chunk) in response.body.chunks(16).enumerate() {
        println!("{:04x}  {}", row * 16, hex_separated(chunk, " "));
    }
    Ok(())
}
