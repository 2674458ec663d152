//! Lightstrand - socket-addressed lights over lighting bridges
//!
//! Main entry point for the Lightstrand CLI.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Input};
use hue::{Controller, Light, LightId, MemoryBridge};
use lightstrand::config::{validate_config_result, BridgeConfig, StrandConfig};
use lightstrand::multi::{Aggregate, Member, MultiController};
use lightstrand::strand::{LightStrand, SocketOracle};
use lightstrand::StrandError;
use std::process;
use std::sync::Arc;

/// Lightstrand - address bridge lights by socket position
#[derive(Parser, Debug)]
#[command(name = "lightstrand")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/lightstrand/config.yaml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize Lightstrand configuration
    Init,

    /// List the lights of every bridge (bridge ids)
    Lights,

    /// List lights found by the last search on every bridge
    NewLights,

    /// Start a search for new lights on every bridge
    Search,

    /// Interactively map a bridge's unmapped lights to sockets
    Map {
        /// Bridge name from the config
        #[arg(short, long)]
        bridge: String,

        /// Use an in-memory bridge instead of the real one
        #[arg(long)]
        simulate: bool,
    },

    /// Manage bridges
    #[command(subcommand)]
    Bridge(BridgeCommands),
}

#[derive(Subcommand, Debug)]
enum BridgeCommands {
    /// Add a bridge
    Add {
        /// Bridge name (e.g., porch)
        name: String,

        /// Bridge host or base URL
        address: String,

        /// Authorized username, or $VAR to read it from the environment
        username: String,

        /// Number of sockets in the strand behind this bridge
        #[arg(short, long)]
        sockets: u32,
    },

    /// List all bridges
    List,

    /// Remove a bridge
    Remove {
        /// Bridge name to remove
        name: String,
    },
}

/// Asks on the terminal which socket is lit
struct PromptOracle {
    length: u32,
}

#[async_trait]
impl SocketOracle for PromptOracle {
    async fn which_socket(&mut self, light: &LightId) -> String {
        let prompt = format!(
            "Light {} is red. Which socket is it in (1-{})?",
            light, self.length
        );
        tokio::task::spawn_blocking(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .unwrap_or_default()
        })
        .await
        .unwrap_or_default()
    }
}

fn main() {
    // Initialize logging
    if let Err(e) = lightstrand::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("Error: {}", e);
        if e.is_controller_failure() {
            eprintln!();
            eprintln!("Check that the bridge is reachable and the username is authorized.");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> lightstrand::Result<()> {
    if let Commands::Init = cli.command {
        return handle_init_command(&cli.config);
    }

    if let Commands::Bridge(ref bridge_cmd) = cli.command {
        return handle_bridge_command(bridge_cmd, &cli.config);
    }

    let config = load_config(&cli.config)?;
    validate_config_result(&config)?;
    tracing::info!(bridges = config.bridges.len(), "Configuration loaded");

    match cli.command {
        Commands::Lights => {
            let aggregator = connect_all(&config)?;
            let lights = aggregator.get_lights().await;
            println!("Found {} lights:", lights.value.len());
            println!();
            for light in &lights.value {
                print_light(light);
            }
            report_failures(lights)?;
        }

        Commands::NewLights => {
            let aggregator = connect_all(&config)?;
            let new_lights = aggregator.get_new_lights().await;
            println!(
                "New lights: {} (last scan: {})",
                new_lights.value.lights.len(),
                new_lights.value.last_scan
            );
            println!();
            for light in &new_lights.value.lights {
                print_light(light);
            }
            report_failures(new_lights)?;
        }

        Commands::Search => {
            let aggregator = connect_all(&config)?;
            let searched = aggregator.search_for_new_lights().await;
            let started = aggregator.member_names().len() - searched.failures.len();
            println!("Search started on {} bridge(s)", started);
            report_failures(searched)?;
        }

        Commands::Map { bridge, simulate } => {
            let bridge_config = config.get_bridge(&bridge).ok_or_else(|| {
                StrandError::Config(format!(
                    "Unknown bridge '{}'. Known bridges: {}",
                    bridge,
                    config.bridge_names().join(", ")
                ))
            })?;

            let controller: Arc<dyn Controller> = if simulate {
                Arc::new(MemoryBridge::with_lights(
                    (1..=bridge_config.sockets).map(|n| format!("sim-{}", n)),
                ))
            } else {
                Arc::new(bridge_config.connect()?)
            };

            let strand = LightStrand::new(bridge_config.sockets, controller)
                .with_signals(config.signals.clone());

            println!(
                "Mapping '{}' ({} sockets). Each unmapped light turns red in turn.",
                bridge_config.name, bridge_config.sockets
            );
            let report = strand
                .map_unmapped_lights(PromptOracle {
                    length: bridge_config.sockets,
                })
                .await?;

            println!();
            println!("Mapped {} light(s):", report.len());
            for (socket, light) in strand.identity_map().await.iter() {
                println!("  socket {:>3} → light {}", socket, light);
            }
        }

        Commands::Init | Commands::Bridge(_) => unreachable!("handled above"),
    }

    Ok(())
}

fn load_config(path: &Option<String>) -> lightstrand::Result<StrandConfig> {
    if let Some(config_path) = path {
        return StrandConfig::load(config_path);
    }

    match StrandConfig::load_default() {
        Ok(config) => Ok(config),
        Err(StrandError::Config(msg)) if msg.contains("Config file not found") => {
            Err(StrandError::Config(
                "No configuration found. Run 'lightstrand init' first to create one.\n\n\
                 Then add bridges with:\n  \
                 lightstrand bridge add <name> <address> <username> --sockets <n>"
                    .to_string(),
            ))
        }
        Err(e) => Err(e),
    }
}

/// One pass-through member per configured bridge
fn connect_all(config: &StrandConfig) -> lightstrand::Result<MultiController> {
    let mut members = Vec::with_capacity(config.bridges.len());
    for bridge in &config.bridges {
        members.push(Member::passthrough(
            bridge.name.clone(),
            Arc::new(bridge.connect()?),
        ));
    }
    Ok(MultiController::new(
        members,
        config.aggregator.to_aggregator_config(),
    ))
}

/// Partial results were already printed; any missing bridge still fails the command
fn report_failures<T>(aggregate: Aggregate<T>) -> lightstrand::Result<()> {
    if aggregate.timed_out() {
        tracing::warn!("Some bridges did not answer in time");
    }
    aggregate.into_result()?;
    Ok(())
}

fn print_light(light: &Light) {
    let state = match light.state {
        Some(ref state) => match (state.on, state.brightness) {
            (Some(true), Some(bri)) => format!("on  bri {:>3}", bri),
            (Some(true), None) => "on".to_string(),
            (Some(false), _) => "off".to_string(),
            (None, _) => "-".to_string(),
        },
        None => "-".to_string(),
    };
    println!("  {:>6}  {:<12}  {}", light.id, state, light.name);
}

fn handle_init_command(config_path: &Option<String>) -> lightstrand::Result<()> {
    let path = config_path
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(StrandConfig::default_path);

    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    let config = StrandConfig::new();
    match config_path {
        Some(_) => config.save(&path)?,
        None => config.save_default()?,
    }
    println!("Created configuration at {}", path.display());
    println!();
    println!("Add a bridge with:");
    println!("  lightstrand bridge add <name> <address> <username> --sockets <n>");
    Ok(())
}

fn handle_bridge_command(
    cmd: &BridgeCommands,
    config_path: &Option<String>,
) -> lightstrand::Result<()> {
    let path = config_path
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(StrandConfig::default_path);
    let mut config = if path.exists() {
        StrandConfig::load(&path)?
    } else {
        StrandConfig::new()
    };

    match cmd {
        BridgeCommands::Add {
            name,
            address,
            username,
            sockets,
        } => {
            if config.get_bridge(name).is_some() {
                return Err(StrandError::Config(format!(
                    "Bridge '{}' already exists",
                    name
                )));
            }
            config.add_bridge(BridgeConfig::new(
                name.clone(),
                address.clone(),
                username.clone(),
                *sockets,
            ));
            validate_config_result(&config)?;
            config.save(&path)?;
            println!("Added bridge '{}' ({} sockets)", name, sockets);
        }

        BridgeCommands::List => {
            println!("Bridges ({}):", config.bridges.len());
            let mut first_socket: u64 = 1;
            for bridge in &config.bridges {
                println!(
                    "  {:<12} {:<24} sockets {}-{}",
                    bridge.name,
                    bridge.address,
                    first_socket,
                    first_socket + u64::from(bridge.sockets.saturating_sub(1))
                );
                first_socket += u64::from(bridge.sockets);
            }
        }

        BridgeCommands::Remove { name } => {
            if config.remove_bridge(name).is_none() {
                return Err(StrandError::Config(format!("Unknown bridge '{}'", name)));
            }
            config.save(&path)?;
            println!("Removed bridge '{}'", name);
        }
    }

    Ok(())
}
