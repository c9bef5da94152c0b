//! Command-line interface for the Helmet scenario utilities.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use helmet_core::Error;
use helmet_core::export::{export_scenario, write_extra_links, write_extra_nodes};
use helmet_core::height::{HeightConfig, WcsClient, add_height_data};
use helmet_core::loading::read_scenario;
use helmet_core::zonedata::{
    AreaChanges, RecalcMode, RecalcOptions, Sij2023, read_zonedata, recalculate_zonedata,
};

#[derive(Parser)]
#[command(name = "helmet-utils")]
#[command(about = "Batch utilities for Helmet model scenarios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Operations on an exported EMME scenario folder
    #[command(subcommand)]
    Network(NetworkCommand),
    /// Operations on a zone data folder
    #[command(subcommand)]
    Zonedata(ZonedataCommand),
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// Fetch terrain heights for every node and write gradient attributes
    AddHeight(AddHeightArgs),
}

#[derive(Args)]
struct AddHeightArgs {
    /// Scenario folder with the exported text files
    scenario_folder: PathBuf,

    /// API key for the elevation model service
    #[arg(long, env = "MML_API_KEY")]
    api_key: String,

    /// Worker count for the coverage requests (2 or 4)
    #[arg(long, default_value_t = 2)]
    processors: usize,

    /// Where to write the updated scenario (defaults to the input folder)
    #[arg(long)]
    output_folder: Option<PathBuf>,

    /// CSV of manual node elevations applied after sampling
    #[arg(long)]
    elevation_fixes: Option<PathBuf>,

    /// Fail instead of defaulting nodes when requests keep failing
    #[arg(long)]
    strict: bool,

    /// Rewrite every scenario file, not just the attribute tables
    #[arg(long)]
    full: bool,
}

#[derive(Subcommand)]
enum ZonedataCommand {
    /// Recalculate a zone data folder for a changed zone set
    Recalculate(RecalculateArgs),
}

#[derive(Args)]
struct RecalculateArgs {
    /// Folder with the .lnd/.pop/.wrk/.edu/.bks tables
    zonedata_folder: PathBuf,

    /// Zone polygons as GeoJSON
    #[arg(long)]
    zones: PathBuf,

    /// Corine land-cover GeoTIFF
    #[arg(long)]
    landcover: PathBuf,

    /// Corine delivery year, selects the class grouping
    #[arg(long, default_value_t = 2023)]
    year: i32,

    /// Output folder for the recalculated tables
    #[arg(long, default_value = "zonedata_recalculated")]
    output_folder: PathBuf,

    /// Split zones around centroids added to this scenario folder
    #[arg(long)]
    split_by_network: Option<PathBuf>,

    /// JSON map of already-split zones: {"parent": [child, ...]}
    #[arg(long)]
    area_changes: Option<PathBuf>,
}

fn read_area_changes(path: &PathBuf) -> Result<AreaChanges, Error> {
    let content = fs::read_to_string(path)?;
    let raw: BTreeMap<String, Vec<i32>> = serde_json::from_str(&content)?;
    let mut changes = AreaChanges::new();
    for (parent, children) in raw {
        let parent = parent
            .parse()
            .map_err(|_| Error::InvalidData(format!("bad zone id '{parent}' in area changes")))?;
        changes.insert(
            Sij2023(parent),
            children.into_iter().map(Sij2023).collect(),
        );
    }
    Ok(changes)
}

fn add_height(args: AddHeightArgs) -> Result<(), Error> {
    let mut scenario = read_scenario(&args.scenario_folder)?;
    let mut config = HeightConfig::new(&args.api_key);
    config.workers = args.processors;
    config.strict = args.strict;
    config.elevation_fixes = args.elevation_fixes;
    let client = WcsClient::new(
        &config.endpoint,
        &config.api_key,
        config.timeout,
        config.max_retries,
        config.retry_delay,
    )?;

    let report = add_height_data(&mut scenario, &client, &config)?;
    info!("height data added: {report}");

    let out_dir = args
        .output_folder
        .unwrap_or_else(|| args.scenario_folder.clone());
    let written = if args.full {
        export_scenario(&scenario, &out_dir)?
    } else {
        fs::create_dir_all(&out_dir)?;
        vec![
            write_extra_links(&scenario.network, &scenario.meta, &out_dir)?,
            write_extra_nodes(&scenario.network, &scenario.meta, &out_dir)?,
        ]
    };
    info!("wrote {} scenario files to {}", written.len(), out_dir.display());
    Ok(())
}

fn recalculate(args: RecalculateArgs) -> Result<(), Error> {
    let mode = match (args.split_by_network, args.area_changes) {
        (Some(_), Some(_)) => {
            return Err(Error::ConflictingOptions(
                "--split-by-network and --area-changes cannot be used together".to_string(),
            ));
        }
        (Some(scenario_dir), None) => RecalcMode::SplitByNetwork { scenario_dir },
        (None, Some(path)) => RecalcMode::AreaChanges(read_area_changes(&path)?),
        (None, None) => RecalcMode::LanduseOnly,
    };

    let data = read_zonedata(&args.zonedata_folder, &args.zones, &args.landcover)?;
    let options = RecalcOptions {
        year: args.year,
        output: args.output_folder,
        mode,
    };
    let written = recalculate_zonedata(&data, &options)?;
    for path in written {
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn run() -> Result<(), Error> {
    match Cli::parse().command {
        Command::Network(NetworkCommand::AddHeight(args)) => add_height(args),
        Command::Zonedata(ZonedataCommand::Recalculate(args)) => recalculate(args),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}
