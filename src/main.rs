mod app;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use annotate_graph::{Document, EditorSettings};
use app::AnnotateApp;

/// Annotate images with labelled regions and the relations between them
#[derive(Parser, Debug)]
#[command(name = "annotate-graph")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image to open
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Annotation file to load (its image is looked up next to it)
    #[arg(long, value_name = "PATH", conflicts_with = "image")]
    json: Option<PathBuf>,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `annotate_graph=trace`
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    let settings_path = args.settings.unwrap_or_else(EditorSettings::default_path);
    let settings = EditorSettings::load_or_default(&settings_path);

    let mut app = AnnotateApp::new(Document::new(settings));
    if let Some(json) = &args.json {
        app.load_json_path(json);
    } else if let Some(image) = &args.image {
        app.open_image_path(image);
    }

    let title = app::title_for(args.image.as_deref().or(args.json.as_deref()));
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
        .map_err(|e| anyhow::anyhow!("failed to run eframe: {e}"))
}
