use clap::Parser;
use snapyforms_widget::{
    ApiClient, FormDefinition, FormWidget, WidgetConfig, WidgetError, WidgetOptions,
    DEFAULT_API_URL,
};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "snapyforms-preview")]
#[command(version)]
#[command(about = "Check SnapyForms form definitions and preview the widget markup", long_about = None)]
struct Cli {
    /// Form definition JSON files to check
    files: Vec<PathBuf>,

    /// Print the rendered widget HTML
    #[arg(long)]
    html: bool,

    /// Fetch this published form instead of reading files
    #[arg(long, env = "SNAPYFORMS_FORM_ID")]
    form_id: Option<String>,

    /// API key for the published form
    #[arg(long, env = "SNAPYFORMS_API_KEY")]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, env = "SNAPYFORMS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Page path the display rules are evaluated against
    #[arg(long, default_value = "/")]
    path: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.files.is_empty() && cli.form_id.is_none() {
        eprintln!("Usage: snapyforms-preview <definition.json>... [--html] [--path /page]");
        eprintln!("       snapyforms-preview --form-id <id> --api-key <key> [--html] [--path /page]");
        process::exit(1);
    }

    let mut exit_code = 0;

    for file in &cli.files {
        match preview_file(file, &cli) {
            Ok(widget) => {
                println!(
                    "✓ {} is valid ({} fields, {} on {})",
                    file.display(),
                    widget.definition().fields.len(),
                    visibility(&widget),
                    cli.path
                );
                if cli.html {
                    println!("{}", widget.to_html());
                }
            }
            Err(e) => {
                eprintln!("✗ {} has errors:", file.display());
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    if let Some(form_id) = cli.form_id.as_deref() {
        match preview_remote(form_id, &cli).await {
            Ok(widget) => {
                println!(
                    "✓ form {} loaded ({} fields, {} on {})",
                    form_id,
                    widget.definition().fields.len(),
                    visibility(&widget),
                    cli.path
                );
                if cli.html {
                    println!("{}", widget.to_html());
                }
            }
            Err(e) => {
                eprintln!("✗ form {} could not be loaded:", form_id);
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn preview_file(path: &PathBuf, cli: &Cli) -> Result<FormWidget, WidgetError> {
    let content = fs::read_to_string(path)
        .map_err(|e| WidgetError::Load {
            reason: format!("Failed to read file: {}", e),
        })?;
    let definition = FormDefinition::from_json(&content)?;
    let config = WidgetConfig::new("preview", "preview")?;
    Ok(FormWidget::mount(
        config,
        definition,
        &cli.path,
        WidgetOptions::default(),
    ))
}

async fn preview_remote(form_id: &str, cli: &Cli) -> Result<FormWidget, WidgetError> {
    let api_key = cli.api_key.clone().unwrap_or_default();
    let config = WidgetConfig::new(form_id, api_key)?.with_api_url(cli.api_url.clone())?;
    let client = ApiClient::new(config);
    FormWidget::load(&client, &cli.path, WidgetOptions::default()).await
}

fn visibility(widget: &FormWidget) -> &'static str {
    if widget.is_removed() {
        "hidden"
    } else {
        "shown"
    }
}

fn print_error(error: &WidgetError) {
    match error {
        WidgetError::Deserialization(msg) => {
            eprintln!("  Deserialization error:");
            eprintln!("    {}", msg);
        }
        WidgetError::DuplicateFieldId { id } => {
            eprintln!("  Duplicate field id '{}'", id);
            eprintln!("    Field ids must be unique within a form");
        }
        WidgetError::InvalidDefinition(msg) => {
            eprintln!("  Invalid definition:");
            eprintln!("    {}", msg);
        }
        WidgetError::Config(msg) => {
            eprintln!("  Configuration error:");
            eprintln!("    {}", msg);
        }
        e => {
            eprintln!("  {}", e);
        }
    }
}
