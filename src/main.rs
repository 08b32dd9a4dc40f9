use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use galaxy_encounter::{load_scenario, Trajectory};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Frame {
    /// Positions relative to the central galaxy
    Origin,
    /// Positions relative to the centre of mass of both galaxies
    Com,
}

/// Run a galaxy encounter scenario and write the trajectory as CSV
#[derive(Parser, Debug)]
#[command(name = "galaxy-encounter", version)]
struct Args {
    /// Scenario file (YAML)
    scenario: PathBuf,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Reference frame for positions
    #[arg(long, value_enum, default_value = "origin")]
    frame: Frame,
}

fn write_csv(out: &mut impl Write, trajectory: &Trajectory) -> io::Result<()> {
    write!(out, "t,s_x,s_y,s_vx,s_vy")?;
    for n in 1..=trajectory.star_count() {
        write!(out, ",star{n}_x,star{n}_y,star{n}_vx,star{n}_vy")?;
    }
    writeln!(out)?;

    for (t, row) in trajectory.times().iter().zip(trajectory.rows()) {
        write!(out, "{t}")?;
        for value in row {
            write!(out, ",{value}")?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_scenario(&args.scenario)
        .with_context(|| format!("failed to load {}", args.scenario.display()))?;
    let scenario = config.build().context("invalid scenario")?;

    info!(
        "running {} stars, M = {:e}, S = {:e}, {} samples to t = {}",
        scenario.initial.star_count(),
        scenario.model.masses.central,
        scenario.model.masses.disruptor,
        scenario.grid.len(),
        scenario.grid.max_time()
    );

    let mut trajectory = scenario.run().context("simulation failed")?;
    if args.frame == Frame::Com {
        trajectory = trajectory.relative_to_center_of_mass(&scenario.model.masses);
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
            write_csv(&mut BufWriter::new(file), &trajectory)?;
            info!("wrote {} samples to {}", trajectory.len(), path.display());
        }
        None => write_csv(&mut BufWriter::new(io::stdout().lock()), &trajectory)?,
    }

    Ok(())
}
