//! Headless terrarium runner: load a save, run it, write the result.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use terrarium::config::SimConfig;
use terrarium::error::SimError;
use terrarium::World;

struct Args {
    save: PathBuf,
    ticks: u64,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <save.txt> [ticks] [out.txt] [--config cfg.json]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  save.txt   World to load");
    eprintln!("  ticks      Number of steps to run (default: 600)");
    eprintln!("  out.txt    Where to write the result (default: overwrite save.txt)");
    eprintln!("  --config   JSON tuning file (seed, cloud_line_y, game_speed)");
    process::exit(1);
}

fn parse_args() -> Args {
    let mut raw = std::env::args();
    let program = raw.next().unwrap_or_else(|| "terrarium".into());
    let mut positional = Vec::new();
    let mut config = None;
    while let Some(arg) = raw.next() {
        if arg == "--config" {
            let Some(path) = raw.next() else {
                usage(&program);
            };
            config = Some(PathBuf::from(path));
        } else if arg == "-h" || arg == "--help" {
            usage(&program);
        } else {
            positional.push(arg);
        }
    }

    let mut positional = positional.into_iter();
    let Some(save) = positional.next() else {
        usage(&program);
    };
    let ticks = match positional.next() {
        Some(n) => n.parse().unwrap_or_else(|_| {
            eprintln!("ticks must be a non-negative integer, got {n:?}");
            process::exit(1);
        }),
        None => 600,
    };
    Args {
        save: PathBuf::from(save),
        ticks,
        out: positional.next().map(PathBuf::from),
        config,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_totals(label: &str, world: &World) {
    println!(
        "{label}: tick {}, {} elements, wetness {:.4}, nutrient {:.4}",
        world.tick(),
        world.population(),
        world.total_wetness(),
        world.total_nutrient()
    );
}

fn run(args: &Args, config: SimConfig) -> Result<(), SimError> {
    let mut world = World::new(config)?;
    world.load(&args.save)?;
    let (width, height) = world.dimensions();
    println!("Grid: {width}x{height}");
    print_totals("Before", &world);

    let start = Instant::now();
    for _ in 0..args.ticks {
        world.step();
    }
    let elapsed = start.elapsed();
    print_totals("After", &world);
    println!(
        "Ran {} ticks in {:.2?} ({:.3} ms/tick)",
        args.ticks,
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / args.ticks.max(1) as f64
    );

    let out = args.out.as_ref().unwrap_or(&args.save);
    world.save(out)?;
    println!("Saved to {}", out.display());
    Ok(())
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    let args = parse_args();

    let config = load_config(args.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("Error reading config: {e}");
        process::exit(1);
    });

    if let Err(e) = run(&args, config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
