//! flowclass: CLI tool for checking rule files and classifying single flows.

use clap::{Parser, Subcommand};
use flowclass::{
    protocols, ClassificationEngine, ClassificationRequest, EngineConfig, FileRuleProvider,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flowclass")]
#[command(author = "flowclass developers")]
#[command(version = "0.1.0")]
#[command(about = "Classify network flows with priority-ordered application rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a rule file and report invalid rules and tree statistics
    Check {
        /// YAML or JSON rule file
        #[arg(short, long)]
        rules: PathBuf,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Classify a single flow
    Classify {
        /// YAML or JSON rule file
        #[arg(short, long)]
        rules: PathBuf,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Protocol number or keyword
        #[arg(short, long)]
        protocol: Option<String>,

        #[arg(long)]
        src_addr: Option<IpAddr>,

        #[arg(long)]
        src_port: Option<u16>,

        #[arg(long)]
        dst_addr: Option<IpAddr>,

        #[arg(long)]
        dst_port: Option<u16>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Check { rules, config } => check(&rules, config.as_deref()),
        Commands::Classify {
            rules,
            config,
            protocol,
            src_addr,
            src_port,
            dst_addr,
            dst_port,
        } => build_request(protocol.as_deref(), src_addr, src_port, dst_addr, dst_port)
            .and_then(|request| classify(&rules, config.as_deref(), &request)),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_engine(
    rules: &Path,
    config: Option<&Path>,
) -> Result<ClassificationEngine, Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = ClassificationEngine::new(FileRuleProvider::new(rules), config);
    engine.reload()?;
    Ok(engine)
}

fn check(rules: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(rules, config)?;

    let invalid = engine.invalid_rules();
    if invalid.is_empty() {
        println!("All rules valid");
    } else {
        println!("{} invalid rules:", invalid.len());
        for rule in &invalid {
            println!("  {}", rule);
        }
    }
    println!("{}", engine.tree_info());
    Ok(())
}

fn build_request(
    protocol: Option<&str>,
    src_addr: Option<IpAddr>,
    src_port: Option<u16>,
    dst_addr: Option<IpAddr>,
    dst_port: Option<u16>,
) -> Result<ClassificationRequest, Box<dyn std::error::Error>> {
    let mut request = ClassificationRequest::new();
    if let Some(protocol) = protocol {
        let decimal = protocols::resolve(protocol)
            .ok_or_else(|| format!("unknown protocol: {}", protocol))?;
        request = request.with_protocol(decimal);
    }
    if let Some(addr) = src_addr {
        request = request.with_src_address(addr);
    }
    if let Some(port) = src_port {
        request = request.with_src_port(port);
    }
    if let Some(addr) = dst_addr {
        request = request.with_dst_address(addr);
    }
    if let Some(port) = dst_port {
        request = request.with_dst_port(port);
    }
    Ok(request)
}

fn classify(
    rules: &Path,
    config: Option<&Path>,
    request: &ClassificationRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(rules, config)?;
    match engine.classify(request) {
        Some(name) => println!("{}", name),
        None => println!("<unclassified>"),
    }
    Ok(())
}
