use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use solar_exposure::io::{self, SkyMatrixTool, StlFormat, WeatherData};
use solar_exposure::sim::exposure::{
    CliOverrides, DliClass, ExposureConfig, ExposureSimulation, SamplePoint, SkyDome,
    TregenzaScheme, class_range,
};
use solar_exposure::{Mesh, Vector};

/// Solar exposure and Daily Light Integral of surfaces under a Tregenza sky.
#[derive(Parser, Debug)]
#[command(name = "solar-exposure", version, about)]
struct Cli {
    /// Log level (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the sky dome directions and patch weights as JSON.
    SkyDome {
        /// Append the ground directions.
        #[arg(long)]
        ground: bool,
        /// Output JSON file (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write the patch geometry as an ASCII STL file.
        #[arg(long)]
        stl: Option<PathBuf>,
    },
    /// Split a .wea file into 12 monthly .wea files.
    SplitWeather {
        weather: PathBuf,
        /// Output directory (defaults to the weather file's directory).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Convert an EPW weather file to Radiance .wea format.
    Epw2wea { epw: PathBuf, wea: PathBuf },
    /// Run the exposure simulation.
    Run(RunArgs),
    /// Classify DLI values, or print the DLI range of a class range.
    Classify {
        /// DLI values (mol/m²/day).
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,
        /// Print the DLI range covered by classes MIN..=MAX instead.
        #[arg(long, num_args = 2, value_names = ["MIN_CLASS", "MAX_CLASS"])]
        range: Option<Vec<u8>>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Sample points JSON file.
    #[arg(long, required_unless_present = "analysis")]
    points: Option<PathBuf>,
    /// Analysis surface STL; one sample per face, merged into the context.
    #[arg(long)]
    analysis: Option<PathBuf>,
    /// Context geometry STL files.
    #[arg(long)]
    context: Vec<PathBuf>,
    /// Weather file in .wea format.
    #[arg(long)]
    weather: PathBuf,
    /// Results JSON file.
    #[arg(long)]
    output: PathBuf,
    /// Config JSON file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for monthly weather files.
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Cover transmittance (0.0 - 1.0).
    #[arg(long)]
    transmittance: Option<f64>,
    /// Worker threads.
    #[arg(long)]
    threads: Option<usize>,
    /// Also simulate each month.
    #[arg(long)]
    monthly: bool,
    /// Ignore ground-reflected radiation.
    #[arg(long)]
    no_ground: bool,
    /// Sky-matrix program.
    #[arg(long)]
    tool: Option<String>,
    /// Sky-matrix timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Serialize)]
struct DomeDirection {
    index: usize,
    row: usize,
    weight: f64,
    direction: Vector,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Command::Run(args) => Some(load_config(args, cli.log_level.clone())?),
        _ => None,
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    match cli.command {
        Command::SkyDome { ground, output, stl } => sky_dome(ground, output.as_deref(), stl.as_deref()),
        Command::SplitWeather { weather, out_dir } => {
            let dir = match out_dir {
                Some(dir) => dir,
                None => weather.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            let paths = io::write_monthly(&weather, &dir)?;
            for path in paths {
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::Epw2wea { epw, wea } => {
            let data = WeatherData::from_epw_file(&epw)?;
            data.write_wea(&wea)?;
            tracing::info!(hours = data.num_hours(), wea = %wea.display(), "wrote WEA file");
            Ok(())
        }
        Command::Run(args) => {
            let config = config.context("Run configuration missing")?;
            run(&args, config)
        }
        Command::Classify { values, range } => classify(&values, range.as_deref()),
    }
}

fn load_config(args: &RunArgs, log_level: Option<String>) -> Result<ExposureConfig> {
    let mut config = match &args.config {
        Some(path) => ExposureConfig::load(path)?,
        None => ExposureConfig::default(),
    };
    config.apply_cli_overrides(&CliOverrides {
        transmittance: args.transmittance,
        threads: args.threads,
        monthly: args.monthly.then_some(true),
        no_ground: args.no_ground,
        tool_program: args.tool.clone(),
        timeout_secs: args.timeout,
        log_level,
    });
    Ok(config)
}

fn sky_dome(ground: bool, output: Option<&Path>, stl: Option<&Path>) -> Result<()> {
    let scheme = TregenzaScheme::new();
    let dome = SkyDome::generate(&scheme, ground);
    let directions: Vec<DomeDirection> = dome
        .directions()
        .iter()
        .enumerate()
        .map(|(index, &direction)| {
            let row = dome.row_of(index).unwrap_or_default();
            DomeDirection {
                index,
                row,
                weight: scheme.row_weights()[row],
                direction,
            }
        })
        .collect();

    match output {
        Some(path) => io::scene::write_json(path, &directions)?,
        None => println!("{}", serde_json::to_string_pretty(&directions)?),
    }
    if let Some(path) = stl {
        io::write_stl(path, dome.mesh(), "sky_dome", StlFormat::Ascii)?;
    }
    Ok(())
}

fn run(args: &RunArgs, config: ExposureConfig) -> Result<()> {
    let mut meshes: Vec<Mesh> = Vec::new();
    let mut points: Vec<SamplePoint> = Vec::new();

    if let Some(path) = &args.points {
        points.extend(io::read_points(path)?);
    }
    if let Some(path) = &args.analysis {
        let analysis = io::read_stl(path)?;
        points.extend(SamplePoint::from_mesh_faces(&analysis));
        meshes.push(analysis);
    }
    for path in &args.context {
        meshes.push(io::read_stl(path)?);
    }
    if points.is_empty() {
        bail!("No sample points given");
    }

    let tool = SkyMatrixTool::new(config.tool.clone());
    let mut sim = ExposureSimulation::new(config)?;
    if let Some(dir) = &args.work_dir {
        sim = sim.with_work_dir(dir);
    }

    let mesh_refs: Vec<&Mesh> = meshes.iter().collect();
    let scene = sim.context_mesh(&mesh_refs)?;
    let result = sim
        .run(&points, &scene, &args.weather, &tool)
        .with_context(|| format!("Simulation failed for {}", args.weather.display()))?;

    io::write_result(&args.output, &result)?;
    if let Some(annual) = result.annual() {
        tracing::info!(
            points = annual.len(),
            mean_dli = annual.mean_dli(),
            output = %args.output.display(),
            "results written"
        );
    }
    Ok(())
}

fn classify(values: &[f64], range: Option<&[u8]>) -> Result<()> {
    if let Some(range) = range {
        let [min, max] = range else {
            bail!("--range expects two classes");
        };
        let (lo, hi) = class_range(DliClass::try_from(*min)?, DliClass::try_from(*max)?)?;
        println!("{lo} {hi}");
        return Ok(());
    }
    for value in values {
        println!("{value} {}", DliClass::classify(*value));
    }
    Ok(())
}
