// Copyright (c) 2025 - Cowboy AI, Inc.
//! vSensor Quickstart Generator
//!
//! Reads a deployment property set and prints the resource graph for the
//! deployment runtime on stdout. Logs go to stderr.
//!
//! Run with: cargo run --bin vsensor-quickstart
//!
//! Environment:
//! 1. QUICKSTART_PROPERTIES - path to the property set (`.yaml`, `.yml` or `.json`)
//! 2. QUICKSTART_DEPLOYMENT - deployment name
//! 3. QUICKSTART_PROJECT - project id
//! 4. QUICKSTART_FORMAT - `yaml` (default) or `json`

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vsensor_quickstart::{deployment, Environment, GlobalProperties};

/// Manifest output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => bail!("Unsupported QUICKSTART_FORMAT '{other}', expected yaml or json"),
        }
    }
}

/// Configuration for one generator run
#[derive(Debug, Clone)]
struct GeneratorConfig {
    /// Property set file
    properties: PathBuf,
    /// Deployment name
    deployment: String,
    /// Enclosing project id
    project: String,
    /// Manifest format
    format: OutputFormat,
}

impl GeneratorConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let properties = std::env::var("QUICKSTART_PROPERTIES")
            .context("QUICKSTART_PROPERTIES not set. Point it at the deployment property file")?;

        let deployment =
            std::env::var("QUICKSTART_DEPLOYMENT").context("QUICKSTART_DEPLOYMENT not set")?;

        let project = std::env::var("QUICKSTART_PROJECT").context("QUICKSTART_PROJECT not set")?;

        let format = match std::env::var("QUICKSTART_FORMAT") {
            Ok(value) => OutputFormat::parse(&value)?,
            Err(_) => OutputFormat::Yaml,
        };

        Ok(Self {
            properties: PathBuf::from(properties),
            deployment,
            project,
            format,
        })
    }
}

fn load_properties(path: &Path) -> Result<GlobalProperties> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read property set {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let props = if is_json {
        GlobalProperties::from_json_str(&text)
    } else {
        GlobalProperties::from_yaml_str(&text)
    };
    props.with_context(|| format!("Failed to parse property set {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = GeneratorConfig::from_env()?;
    info!(
        deployment = %config.deployment,
        project = %config.project,
        properties = %config.properties.display(),
        "configuration loaded"
    );

    let props = load_properties(&config.properties)?;
    let env = Environment::new(config.deployment.clone(), config.project.clone());
    let graph = deployment::generate(&env, &props).context("Failed to generate deployment")?;

    let audit = graph.audit();
    if !audit.is_clean() {
        warn!("{audit}");
    }

    let manifest = match config.format {
        OutputFormat::Yaml => graph.to_yaml().context("Failed to render YAML manifest")?,
        OutputFormat::Json => graph
            .to_json_pretty()
            .context("Failed to render JSON manifest")?,
    };
    println!("{manifest}");

    info!(nodes = graph.nodes().len(), "manifest written");
    Ok(())
}
