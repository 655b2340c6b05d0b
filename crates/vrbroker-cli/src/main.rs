//! Command-line interface for the vrbroker runtime interface broker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use vrbroker_core::config::BrokerConfig;
use vrbroker_core::error::{description_for_code, symbol_for_code};
use vrbroker_core::api;
use vrbroker_core::hooks::TracingHooks;
use vrbroker_core::interfaces::{fn_table_name, InterfaceName};
use vrbroker_core::paths::{FilePathRegistry, PathRegistry};
use vrbroker_core::{ApplicationType, Broker, Capability};

/// vrbroker - Locate and probe an installed VR runtime.
#[derive(Parser, Debug)]
#[command(name = "vrbroker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Path registry file to use instead of the platform default.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether a runtime is installed.
    Installed,
    /// Print the installed runtime directory.
    RuntimePath,
    /// Inspect or edit the path registry.
    Paths {
        #[command(subcommand)]
        paths_cmd: PathsCommand,
    },
    /// Ask the runtime whether a headset is present.
    Present,
    /// Initialize the runtime, check interfaces, and shut it down again.
    Probe {
        /// Application type to initialize as.
        #[arg(long, default_value = "utility")]
        app_type: ApplicationType,
        /// Interface version to check. May be repeated; defaults to every
        /// known capability interface.
        #[arg(short, long = "interface")]
        interfaces: Vec<String>,
    },
    /// Describe an init error code.
    Error {
        /// Numeric error code.
        #[arg(allow_negative_numbers = true)]
        code: i32,
    },
}

/// Path registry subcommands.
#[derive(Subcommand, Debug)]
enum PathsCommand {
    /// Show the effective install paths.
    Show,
    /// Register a runtime directory.
    SetRuntime {
        /// Runtime installation directory.
        #[arg(required = true)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = BrokerConfig::from_env();
    if let Some(registry) = &args.registry {
        config = config.with_registry_file(registry);
    }
    tracing::debug!(registry = ?config.resolved_registry_file(), "Using path registry");

    match args.command {
        Command::Installed => run_installed(&config, args.json),
        Command::RuntimePath => run_runtime_path(&config, args.json),
        Command::Paths { paths_cmd } => run_paths_cmd(&config, paths_cmd, args.json),
        Command::Present => run_present(&config, args.json),
        Command::Probe {
            app_type,
            interfaces,
        } => run_probe(&config, app_type, interfaces, args.json),
        Command::Error { code } => run_error(code, args.json),
    }
}

fn init_logging(verbose: bool) {
    // Check if JSON logging is requested
    let json_logging = std::env::var("VRBROKER_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose {
        "vrbroker=debug,vrbroker_core=debug"
    } else {
        "vrbroker=info,vrbroker_core=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // Logs go to stderr so stdout stays parseable.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn run_installed(config: &BrokerConfig, json: bool) -> Result<()> {
    let broker = Broker::from_config(config);
    let installed = broker.is_runtime_installed();

    if json {
        print_json(&serde_json::json!({ "installed": installed }))?;
    } else {
        println!("Runtime installed: {}", yes_no(installed));
    }
    Ok(())
}

fn run_runtime_path(config: &BrokerConfig, json: bool) -> Result<()> {
    let broker = Broker::from_config(config);

    match broker.runtime_path() {
        Some(path) => {
            if json {
                print_json(&serde_json::json!({ "runtime": path }))?;
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        None => {
            eprintln!("No runtime installed");
            std::process::exit(1);
        }
    }
}

#[derive(Serialize)]
struct PathsReport {
    registry: Option<PathBuf>,
    runtime: Option<PathBuf>,
    config: Option<PathBuf>,
    log: Option<PathBuf>,
}

fn run_paths_cmd(config: &BrokerConfig, cmd: PathsCommand, json: bool) -> Result<()> {
    let registry = FilePathRegistry::from_config(config);

    match cmd {
        PathsCommand::Show => {
            let Some(paths) = registry.read_paths() else {
                match registry.file() {
                    Some(file) => eprintln!("Path registry not found: {}", file.display()),
                    None => eprintln!("Path registry not found"),
                }
                std::process::exit(1);
            };

            let report = PathsReport {
                registry: registry.file().map(PathBuf::from),
                runtime: paths.runtime,
                config: paths.config,
                log: paths.log,
            };

            if json {
                print_json(&report)?;
            } else {
                let show = |path: &Option<PathBuf>| {
                    path.as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "-".to_string())
                };
                println!("Registry:  {}", show(&report.registry));
                println!("Runtime:   {}", show(&report.runtime));
                println!("Config:    {}", show(&report.config));
                println!("Log:       {}", show(&report.log));
            }
            Ok(())
        }
        PathsCommand::SetRuntime { dir } => {
            if !dir.is_dir() {
                anyhow::bail!("Runtime directory does not exist: {}", dir.display());
            }
            let dir = dir
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", dir.display()))?;

            registry
                .set_runtime(&dir)
                .context("Failed to write path registry")?;

            if json {
                print_json(&serde_json::json!({
                    "registry": registry.file(),
                    "runtime": dir,
                }))?;
            } else {
                println!("Registered runtime: {}", dir.display());
            }
            Ok(())
        }
    }
}

fn run_present(config: &BrokerConfig, json: bool) -> Result<()> {
    let broker = Broker::from_config(config);
    let present = broker.is_hmd_present();

    if json {
        print_json(&serde_json::json!({ "present": present }))?;
    } else {
        println!("HMD present: {}", yes_no(present));
    }
    Ok(())
}

#[derive(Serialize)]
struct InterfaceReport {
    name: String,
    valid: bool,
    /// Validity of the derived `FnTable:` binding; absent for derived names.
    fn_table_valid: Option<bool>,
    address: Option<String>,
}

#[derive(Serialize)]
struct ProbeReport {
    app_type: String,
    token: u32,
    module: Option<PathBuf>,
    interfaces: Vec<InterfaceReport>,
}

fn run_probe(
    config: &BrokerConfig,
    app_type: ApplicationType,
    interfaces: Vec<String>,
    json: bool,
) -> Result<()> {
    let broker = Broker::builder()
        .path_registry(FilePathRegistry::from_config(config))
        .hooks(Arc::new(TracingHooks))
        .build();
    if Broker::install_global(broker).is_err() {
        anyhow::bail!("Process-wide broker already initialized");
    }

    let token = match api::init(app_type, None) {
        Ok(token) => token,
        Err(e) => {
            if json {
                print_json(&serde_json::json!({
                    "error": e.code(),
                    "symbol": e.symbol(),
                    "description": e.description(),
                }))?;
            } else {
                println!("Init failed: {}", e.symbol());
                println!("{}", e.description());
            }
            std::process::exit(1);
        }
    };

    let names = if interfaces.is_empty() {
        Capability::ALL
            .iter()
            .map(|capability| capability.version().to_string())
            .collect()
    } else {
        interfaces
    };

    let report = ProbeReport {
        app_type: app_type.to_string(),
        token: token.value(),
        module: Broker::global().loaded_module_path(),
        interfaces: names
            .into_iter()
            .map(|name| {
                let valid = api::is_interface_version_valid(&name);
                let fn_table_valid = match InterfaceName::parse(&name).underlying() {
                    Some(_) => None,
                    None => Some(api::is_interface_version_valid(&fn_table_name(&name))),
                };
                let address = api::get_generic_interface(&name)
                    .ok()
                    .map(|handle| format!("{:#x}", handle.addr()));
                InterfaceReport {
                    name,
                    valid,
                    fn_table_valid,
                    address,
                }
            })
            .collect(),
    };

    api::shutdown();

    if json {
        print_json(&report)?;
    } else {
        println!("Init token:  {}", report.token);
        println!("App type:    {}", report.app_type);
        if let Some(module) = &report.module {
            println!("Module:      {}", module.display());
        }
        println!();
        for interface in &report.interfaces {
            let address = interface.address.as_deref().unwrap_or("-");
            let fn_table = interface.fn_table_valid.map_or("-", yes_no);
            println!(
                "  {:<32} {:<4} fn-table: {:<4} {}",
                interface.name,
                yes_no(interface.valid),
                fn_table,
                address
            );
        }
    }
    Ok(())
}

fn run_error(code: i32, json: bool) -> Result<()> {
    let symbol = symbol_for_code(code);
    let description = description_for_code(code);

    if json {
        print_json(&serde_json::json!({
            "code": code,
            "symbol": symbol,
            "description": description,
        }))?;
    } else {
        println!("{}", symbol);
        println!("{}", description);
    }
    Ok(())
}
