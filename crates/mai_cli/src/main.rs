//! MAI CLI - Maya ASCII import driver.
//!
//! Imports a `.ma` file into an in-memory scene and reports what was built.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mai_core::{DiagnosticKind, ImportCommand, ImportConfig, ImportReport, MemoryScene, SceneBackend};

#[derive(Parser)]
#[command(name = "mai")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a .ma file into an empty scene
    Import {
        /// Input scene file
        file: PathBuf,

        /// JSON file overriding the import configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the import report as JSON
        #[arg(long)]
        json: bool,

        /// Undo the import afterwards and check nothing is left behind
        #[arg(long)]
        undo: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    match cli.command {
        Commands::Import {
            file,
            config,
            json,
            undo,
        } => import(file, config, json, undo),
    }
}

fn import(file: PathBuf, config: Option<PathBuf>, json: bool, undo: bool) -> Result<()> {
    let config = match config {
        Some(path) => ImportConfig::from_json_file(&path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ImportConfig::default(),
    };

    let mut scene = MemoryScene::with_defaults();
    let baseline = scene.node_count();
    let mut command = ImportCommand::new(&file, config);
    let report = command
        .execute(&mut scene)
        .with_context(|| format!("importing {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&scene, &report);
    }

    if undo {
        command.undo(&mut scene)?;
        let leftovers: Vec<&str> = report
            .transaction
            .node_names()
            .filter(|name| scene.exists(name))
            .collect();
        if !leftovers.is_empty() {
            anyhow::bail!("undo left {} nodes behind: {}", leftovers.len(), leftovers.join(", "));
        }
        log::info!("Undo restored the scene to {} nodes (was {})", scene.node_count(), baseline);
    }

    Ok(())
}

fn print_summary(scene: &MemoryScene, report: &ImportReport) {
    let transaction = &report.transaction;
    println!("Meshes ({}):", transaction.meshes.len());
    for name in &transaction.meshes {
        match scene.mesh(name) {
            Some(mesh) => println!(
                "  {:<24} {:>6} verts {:>6} faces  {} uv sets  size {:.3}",
                name,
                mesh.vertex_count(),
                mesh.face_count(),
                mesh.uv_sets.len(),
                mesh.size()
            ),
            None => println!("  {}", name),
        }
    }
    println!("Transforms:     {}", transaction.transforms.len());
    println!("Shaders:        {}", transaction.shaders.join(", "));
    println!("Shading groups: {}", transaction.shading_groups.join(", "));
    println!("Other nodes:    {}", transaction.others.len());
    println!("Connections:    {}", transaction.connections.len());

    if !report.diagnostics.is_empty() {
        println!(
            "Diagnostics ({}: {} format, {} skipped, {} already connected, {} missing, {} backend):",
            report.diagnostics.len(),
            count(report, DiagnosticKind::Format),
            count(report, DiagnosticKind::Skipped),
            count(report, DiagnosticKind::AlreadyConnected),
            count(report, DiagnosticKind::MissingNode),
            count(report, DiagnosticKind::Backend)
        );
        for diagnostic in &report.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}

fn count(report: &ImportReport, kind: DiagnosticKind) -> usize {
    report.diagnostics.iter().filter(|d| d.kind == kind).count()
}
