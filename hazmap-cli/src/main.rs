use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Hazard exposure analysis CLI tool
#[derive(Parser)]
#[command(name = "hazmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing <layer>.geojson files
    #[arg(short, long, env = "HAZMAP_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// PROJ.4 definition of the metric CRS (default: UTM zone 45N)
    #[arg(long, env = "HAZMAP_METRIC_PROJ", global = true)]
    metric_proj: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List layer files and their feature counts
    List,

    /// Display information about one layer
    Info {
        /// Layer name (e.g., rivers, settlements)
        layer: String,
    },

    /// Find the feature nearest to a coordinate
    Nearest {
        /// Layer to search: road, settlement, river, local_unit or district
        #[arg(long)]
        layer: String,

        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Find the nearest feature for every row of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Layer to search
        #[arg(long)]
        layer: String,

        /// Output file (defaults to <input>_nearest.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column name for longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,
    },

    /// Run a flash-flood warning and write the result as JSON
    Flood {
        /// Base river buffer in meters
        #[arg(long, default_value = "500")]
        buffer: f64,

        /// Simulated rainfall: low, medium or high
        #[arg(long, default_value = "medium")]
        rainfall: String,

        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print vulnerability profiles of administrative units
    Profile {
        /// local_unit or district
        #[arg(long, default_value = "local_unit")]
        unit_type: String,

        /// Comma-separated unit ids
        #[arg(long)]
        fids: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = commands::StoreSource {
        data_dir: cli.data_dir,
        metric_proj: cli.metric_proj,
    };

    match cli.command {
        Commands::List => commands::list::run(&source),
        Commands::Info { layer } => commands::info::run(&source, &layer),
        Commands::Nearest {
            layer,
            lat,
            lon,
            json,
        } => commands::nearest::run(&source, &layer, lat, lon, json),
        Commands::Batch {
            input,
            layer,
            output,
            lat_col,
            lon_col,
        } => commands::batch::run(&source, &layer, input, output, &lat_col, &lon_col),
        Commands::Flood {
            buffer,
            rainfall,
            output,
        } => commands::flood::run(&source, buffer, &rainfall, output),
        Commands::Profile { unit_type, fids } => commands::profile::run(&source, &unit_type, &fids),
    }
}
