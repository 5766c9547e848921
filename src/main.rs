mod config;
mod services;
mod store;

use std::sync::Arc;

use canvas::arrange::ArrangeError;
use canvas::camera::Viewport;
use canvas::doc::{AttributeEdit, DocStore, Level, ParseAttributeError};
use canvas::engine::{Action, Engine};
use canvas::geom::{Bounds, bounds};
use canvas::surface::HeadlessSurface;
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;

use crate::config::{ConfigError, EditorConfig};
use crate::services::persistence::PersistenceBridge;
use crate::store::{BulkUpdateResult, FeatureStore, HttpFeatureStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("feature store: {0}")]
    Store(#[from] StoreError),
    #[error("arrange: {0}")]
    Arrange(#[from] ArrangeError),
    #[error("no node with id `{0}`")]
    UnknownNode(String),
    #[error("invalid edit: {0}")]
    InvalidEdit(#[from] ParseAttributeError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("background write panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "floorplan", about = "Factory floor-plan editor host")]
struct Cli {
    /// Overrides `FLOORPLAN_API_BASE` from the environment config.
    #[arg(long, env = "FLOORPLAN_API_BASE")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hierarchy with capacities.
    Tree,
    /// Write the plan as exchange GeoJSON to stdout.
    Export,
    /// Lay out checked nodes inside the viewport and save their new positions.
    Arrange {
        #[arg(long, default_value = "vrsta")]
        level: Level,
        /// Node ids to check; descendants are checked with them.
        #[arg(long = "check", required = true)]
        check: Vec<String>,
        #[arg(long, default_value_t = 1280.0)]
        width_px: f64,
        #[arg(long, default_value_t = 720.0)]
        height_px: f64,
    },
    /// Edit one attribute of a node.
    Set { id: String, field: String, value: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "floorplan failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = EditorConfig::from_env()?;
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base.trim_end_matches('/').to_owned();
    }

    let store = Arc::new(HttpFeatureStore::from_config(&config)?);
    let bridge = PersistenceBridge::new(Arc::clone(&store));

    let mut engine = Engine::new(HeadlessSurface::new());
    engine.install_basemap(&config.basemap());
    let features = store.load_geojson().await?;
    engine.load_store_features(&features);
    tracing::info!(nodes = engine.core.doc.len(), api_base = %config.api_base, "plan loaded");

    match cli.command {
        Command::Tree => print!("{}", render_tree(&engine.core.doc)),
        Command::Export => println!("{}", serde_json::to_string_pretty(&engine.core.export())?),
        Command::Arrange { level, check, width_px, height_px } => {
            let world = plan_bounds(&engine.core.doc).unwrap_or_else(|| Viewport::default().world_bounds());
            engine.set_viewport(Viewport {
                width_px,
                height_px,
                west: world.min_x,
                south: world.min_y,
                east: world.max_x,
                north: world.max_y,
            });
            engine.set_display_level(level);
            for id in &check {
                if engine.core.node(id).is_none() {
                    return Err(CliError::UnknownNode(id.clone()));
                }
                engine.set_checked(id, true);
            }
            let actions = engine.bring_checked_into_view()?;
            let reports = persist(&bridge, actions).await?;
            println!("{}", serde_json::to_string_pretty(&engine.core.export())?);
            eprintln!("{}", bulk_summary(&reports));
        }
        Command::Set { id, field, value } => {
            if engine.core.node(&id).is_none() {
                return Err(CliError::UnknownNode(id));
            }
            let edit = AttributeEdit::parse(&field, &value)?;
            let field = edit.field();
            let actions = engine.set_attribute(&id, edit);
            persist(&bridge, actions).await?;
            println!("{id}.{field}: {}", bridge.flash_color(&id, field).await);
        }
    }
    Ok(())
}

/// Hand persisting actions to the bridge and wait for their writes. Returns
/// the bulk reports in action order.
async fn persist<S: FeatureStore + 'static>(
    bridge: &PersistenceBridge<S>,
    actions: Vec<Action>,
) -> Result<Vec<BulkUpdateResult>, CliError> {
    let handles: Vec<JoinHandle<Option<BulkUpdateResult>>> = actions.into_iter().filter_map(|a| bridge.handle(a)).collect();
    let mut reports = Vec::new();
    for handle in handles {
        reports.extend(handle.await?);
    }
    Ok(reports)
}

/// `updated N, failed [ids]` across every bulk report.
fn bulk_summary(reports: &[BulkUpdateResult]) -> String {
    let updated: usize = reports.iter().map(|r| r.updated_count).sum();
    let failed: Vec<i64> = reports.iter().flat_map(|r| r.failed_ids.iter().copied()).collect();
    if failed.is_empty() {
        format!("updated {updated}")
    } else {
        format!("updated {updated}, failed {failed:?}")
    }
}

/// One line per node, children indented under their parent.
fn render_tree(doc: &DocStore) -> String {
    fn walk(doc: &DocStore, id: &str, depth: usize, lines: &mut Vec<String>) {
        let Some(node) = doc.get(id) else { return };
        let capacity = match (node.taken_capacity, node.max_capacity) {
            (None, None) => String::new(),
            (taken, max) => format!(" {}/{}", count(taken), count(max)),
        };
        lines.push(format!("{:indent$}{} [{}]{capacity}", "", node.name, node.level, indent = depth * 2));
        for child in &node.children {
            walk(doc, child, depth + 1, lines);
        }
    }

    fn count(value: Option<i64>) -> String {
        value.map_or_else(|| "-".to_owned(), |v| v.to_string())
    }

    let mut lines = Vec::new();
    for root in doc.roots() {
        walk(doc, &root.id, 0, &mut lines);
    }
    lines.iter().map(|l| format!("{l}\n")).collect()
}

/// Box around every node in the plan.
fn plan_bounds(doc: &DocStore) -> Option<Bounds> {
    doc.iter().filter_map(|n| bounds(&n.polygon)).reduce(|a, b| Bounds {
        min_x: a.min_x.min(b.min_x),
        min_y: a.min_y.min(b.min_y),
        max_x: a.max_x.max(b.max_x),
        max_y: a.max_y.max(b.max_y),
    })
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
