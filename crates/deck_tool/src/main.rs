//! deck-tool: resolve a transport geometry deck and report the model.

mod reader;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use deck_geom::resolve::{Resolver, ResolveOptions};

#[derive(Parser, Debug)]
#[command(name = "deck-tool", about = "Resolve an MCNP/PHITS-style geometry deck")]
struct Args {
  /// Input deck file.
  input: std::path::PathBuf,

  /// Worker threads for FILL expansion (0 = all cores).
  #[arg(long, default_value_t = 0)]
  threads: usize,

  /// Abort bounding-box computations after this many seconds.
  #[arg(long)]
  timeout_secs: Option<u64>,

  /// Apply strict user-input naming rules.
  #[arg(long)]
  strict: bool,

  /// Print every resolved surface as a card.
  #[arg(long)]
  dump_surfaces: bool,

  /// Raise log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

impl Args {
  /// Default log level from the -v count; RUST_LOG still overrides.
  fn log_level(&self) -> &'static str {
    match self.verbose {
      0 => "warn",
      1 => "info",
      2 => "debug",
      _ => "trace",
    }
  }
}

fn main() -> ExitCode {
  let args = Args::parse();
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level())),
    )
    .with_writer(std::io::stderr)
    .init();
  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("error: {err:#}");
      let code = err
        .downcast_ref::<deck_geom::Error>()
        .map(|e| e.exit_code())
        .unwrap_or(1);
      ExitCode::from(code as u8)
    }
  }
}

fn run(args: &Args) -> anyhow::Result<()> {
  let content = std::fs::read_to_string(&args.input)
    .with_context(|| format!("reading {}", args.input.display()))?;
  let file_name = args.input.display().to_string();
  let input = reader::read_deck(&file_name, &content);

  tracing::debug!(
    cells = input.cell_cards.len(),
    surfaces = input.surface_cards.len(),
    data = input.data_cards.len(),
    "deck sections"
  );

  let resolver = Resolver::new(ResolveOptions {
    threads: args.threads,
    strict_names: args.strict,
  });

  // Arm the timeout flag from a watchdog thread; the resolution polls
  // it inside the bounding-box loops.
  if let Some(secs) = args.timeout_secs {
    let flag = resolver.timeout_flag();
    std::thread::spawn(move || {
      std::thread::sleep(std::time::Duration::from_secs(secs));
      flag.store(true, std::sync::atomic::Ordering::Relaxed);
    });
  }

  let model = resolver.resolve(input)?;

  println!(
    "resolved {} cells over {} surfaces",
    model.cells.len(),
    model.surfaces.len()
  );
  for cell in &model.cells {
    let material = if cell.material == "0" {
      "void".to_string()
    } else {
      match cell.density {
        Some(d) => format!("{} (rho {})", cell.material, d),
        None => cell.material.clone(),
      }
    };
    println!("  {:<24} {:<18} bb {}", cell.name, material, cell.bounding_box);
  }
  if args.dump_surfaces {
    for surface in model.surfaces.front_surfaces() {
      println!("  surface {}", surface.to_input_string());
    }
  }
  Ok(())
}
