//! # tagpress CLI
//!
//! Usage:
//!   tagpress generate stock.xlsx -o labels/
//!   tagpress generate stock.json --config label.json --grid-fields 4
//!   tagpress scan 'https://labels.example/tag?d=%7B...%7D'

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use tagpress::code::QrCodeGenerator;
use tagpress::font::FontContext;
use tagpress::ingest;
use tagpress::model::DisplayMode;
use tagpress::viewer::ScanView;
use tagpress::{DocumentAssembler, LabelAssets, LayoutConfig, TagError};

#[derive(Parser)]
#[command(name = "tagpress")]
#[command(version)]
#[command(about = "Turn spreadsheet rows into 6x4 inch pallet tag PDFs", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one PDF with a label per row
    Generate {
        /// Spreadsheet (.xlsx, .xls, .ods) or JSON cell matrix
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory (the file is named after the input)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Layout configuration (camelCase JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Which corner regions to draw
        #[arg(long, value_enum)]
        display: Option<Display>,

        /// Render the last N fields in a two-column grid
        #[arg(long, value_name = "N")]
        grid_fields: Option<usize>,

        /// Origin of the scan viewer encoded in each code
        #[arg(long, env = "TAGPRESS_BASE_URL")]
        base_url: Option<String>,

        /// Logo image: file path, data URI or base64
        #[arg(long, value_name = "SRC")]
        logo: Option<String>,

        /// Title text
        #[arg(long)]
        title: Option<String>,

        /// Footer text
        #[arg(long)]
        footer: Option<String>,
    },
    /// Decode a scanned code and print the tag
    Scan {
        /// Scanned URL, bare `d` value or raw JSON
        #[arg(value_name = "PAYLOAD")]
        input: String,

        /// Heading shown above the fields
        #[arg(long, default_value = "PALLET TAG")]
        title: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Display {
    /// Logo only
    Logo,
    /// Code only
    Code,
    /// Logo and code
    Both,
}

impl From<Display> for DisplayMode {
    fn from(d: Display) -> Self {
        match d {
            Display::Logo => DisplayMode::LogoOnly,
            Display::Code => DisplayMode::CodeOnly,
            Display::Both => DisplayMode::Both,
        }
    }
}

/// Flag overrides applied on top of the config file.
struct Overrides {
    display: Option<Display>,
    grid_fields: Option<usize>,
    base_url: Option<String>,
    title: Option<String>,
    footer: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Generate {
            input,
            output,
            config,
            display,
            grid_fields,
            base_url,
            logo,
            title,
            footer,
        } => {
            let overrides = Overrides {
                display,
                grid_fields,
                base_url,
                title,
                footer,
            };
            run_generate(&input, output.as_deref(), config.as_deref(), overrides, logo.as_deref())
        }
        Commands::Scan { input, title } => {
            let view = ScanView::from_scan(&input, &title);
            println!("{}", view);
            if view.is_valid() {
                Ok(())
            } else {
                process::exit(2);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<LayoutConfig, TagError> {
    let mut config: LayoutConfig = match path {
        Some(p) => serde_json::from_str(&fs::read_to_string(p)?)?,
        None => LayoutConfig::default(),
    };
    if let Some(d) = overrides.display {
        config.display_mode = d.into();
    }
    if let Some(n) = overrides.grid_fields {
        config.grid.field_count = n;
    }
    if let Some(url) = overrides.base_url {
        config.base_url = url;
    }
    if let Some(t) = overrides.title {
        config.title.text = t;
    }
    if let Some(f) = overrides.footer {
        config.footer.text = f;
    }
    config.validate()?;
    Ok(config)
}

fn run_generate(
    input: &Path,
    output_dir: Option<&Path>,
    config_path: Option<&Path>,
    overrides: Overrides,
    logo: Option<&str>,
) -> Result<(), TagError> {
    let config = load_config(config_path, overrides)?;
    let table = ingest::load_table(input)?;
    if table.is_empty() {
        eprintln!("✗ No rows to generate in {}", input.display());
        return Ok(());
    }

    let font_context = FontContext::new();
    let codes = QrCodeGenerator::new();
    let assets = LabelAssets::load(logo);
    let document = DocumentAssembler::new(&config, &font_context, &codes).build(
        &table,
        &assets,
        input.file_name().and_then(|n| n.to_str()),
    );

    let dir = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            dir.to_path_buf()
        }
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    if let Some(path) = document.save(&dir, &font_context)? {
        eprintln!(
            "✓ {} label page(s) for {} row(s) written to {}",
            document.page_count(),
            table.rows.len(),
            path.display()
        );
    }
    Ok(())
}
