use std::env;
use std::process;

use bff_soup::metrics::{higher_order_entropy, instruction_fraction};
use bff_soup::{Config, Simulation, SoupError, TracerSimulation};
use log::info;

const USAGE: &str = "\
bff-soup - evolve a soup of two-head tape programs

USAGE:
    bff-soup [OPTIONS]

OPTIONS:
    -c, --config <FILE>       Load a YAML config (flags below override it)
        --generate-config [FILE]  Write a default config template and exit
        --tracer              Run the lineage-tracing variant
        --seed <N>            Random seed
        --epochs <N>          Number of epochs to run
        --width <N>           Grid width
        --height <N>          Grid height
        --program-size <N>    Bytes per program
        --mutation-rate <F>   Mutation probability
        --radius <N>          Neighborhood radius (Manhattan)
        --max-steps <N>       Interpreter step budget per pair
        --eval-interval <N>   Epochs between status lines
    -h, --help                Show this help
";

fn parse_args() -> Config {
    let argv: Vec<String> = env::args().collect();

    // First pass: config file and one-shot commands.
    let mut config = Config::default();
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= argv.len() {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }
                match Config::from_yaml(&argv[i]) {
                    Ok(loaded) => {
                        println!("Loaded config from: {}", argv[i]);
                        config = loaded;
                    }
                    Err(e) => {
                        eprintln!("Error loading config file '{}': {}", argv[i], e);
                        process::exit(1);
                    }
                }
            }
            "--generate-config" => {
                let path = if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                    argv[i + 1].clone()
                } else {
                    "config.yaml".to_string()
                };
                match Config::write_template(&path) {
                    Ok(()) => {
                        println!("Generated config template: {}", path);
                        process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("Error writing config template: {}", e);
                        process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                print!("{}", USAGE);
                process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    // Second pass: flags override config file values.
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" | "-c" => {
                i += 1; // already handled
            }
            "--tracer" => config.tracer = true,
            "--seed" => config.random_seed = take_value(&argv, &mut i),
            "--epochs" => config.epochs = take_value(&argv, &mut i),
            "--width" => config.grid_width = take_value(&argv, &mut i),
            "--height" => config.grid_height = take_value(&argv, &mut i),
            "--program-size" => config.program_size = take_value(&argv, &mut i),
            "--mutation-rate" => config.mutation_rate = take_value(&argv, &mut i),
            "--radius" => config.neighbor_radius = take_value(&argv, &mut i),
            "--max-steps" => config.max_steps = take_value(&argv, &mut i),
            "--eval-interval" => config.eval_interval = take_value(&argv, &mut i),
            other => {
                eprintln!("Unknown option: {}\n\n{}", other, USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    config
}

/// Consume and parse the value following `argv[*i]`, exiting with a
/// message on missing or malformed input.
fn take_value<T: std::str::FromStr>(argv: &[String], i: &mut usize) -> T {
    let flag = argv[*i].clone();
    *i += 1;
    if *i >= argv.len() {
        eprintln!("{} requires a value", flag);
        process::exit(1);
    }
    match argv[*i].parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid value '{}' for {}", argv[*i], flag);
            process::exit(1);
        }
    }
}

fn print_banner(config: &Config) {
    println!("Starting soup simulation with:");
    println!(
        "  Grid size: {}x{} ({} programs)",
        config.grid_width,
        config.grid_height,
        config.grid_width * config.grid_height
    );
    println!("  Program size: {}", config.program_size);
    println!("  Mutation rate: {}", config.mutation_rate);
    println!("  Neighborhood radius: {}", config.neighbor_radius);
    println!("  Epochs: {}", config.epochs);
    if config.tracer {
        println!("  Lineage tracing: on");
    }
    println!();
}

fn run_plain(config: &Config) -> Result<(), SoupError> {
    let mut sim = Simulation::new(
        config.grid_width,
        config.grid_height,
        config.program_size,
        config.params(),
    )?;

    let eval_interval = config.eval_interval.max(1);
    for _ in 0..config.epochs {
        let stats = sim.run_epoch();
        if stats.epoch % eval_interval == 0 {
            let hoe = higher_order_entropy(sim.soup());
            println!("Epoch: {}", stats.epoch);
            println!(
                "\tHigher Order Entropy={:.3},\tAvg Iters={:.3},\tAvg Skips={:.3},\tFinished Ratio={:.3},\tTerminated Ratio={:.3}",
                hoe,
                stats.mean_iterations,
                stats.mean_skipped,
                stats.finished_fraction,
                stats.terminated_fraction
            );
        }
    }

    println!("\nInstruction fraction: {:.3}", instruction_fraction(sim.soup()));
    if config.num_print_programs > 0 {
        println!("Sample programs:");
        for idx in 0..config.num_print_programs.min(sim.grid().len()) {
            println!("{:4}: {}", idx, sim.grid().program_string(idx));
        }
    }
    Ok(())
}

fn run_tracer(config: &Config) -> Result<(), SoupError> {
    let mut sim = TracerSimulation::new(
        config.grid_width,
        config.grid_height,
        config.program_size,
        config.params(),
    )?;

    let eval_interval = config.eval_interval.max(1);
    for _ in 0..config.epochs {
        let stats = sim.run_epoch();
        if stats.epoch % eval_interval == 0 {
            let hoe = higher_order_entropy(&sim.soup_bytes());
            println!("Epoch: {}", stats.epoch);
            println!(
                "\tHigher Order Entropy={:.3},\tAvg Iters={:.3},\tAvg Skips={:.3},\tFinished Ratio={:.3},\tTerminated Ratio={:.3}",
                hoe,
                stats.mean_iterations,
                stats.mean_skipped,
                stats.finished_fraction,
                stats.terminated_fraction
            );
        }
    }

    println!("\nInstruction fraction: {:.3}", instruction_fraction(&sim.soup_bytes()));

    // Lineage summary: how much of the soup still descends from epoch 0.
    let total = sim.grid().len() * sim.grid().program_size();
    let ancient = sim.grid().snapshot().filter(|c| c.origin_epoch == 0).count();
    println!(
        "Tokens still carrying epoch-0 lineage: {}/{} ({:.1}%)",
        ancient,
        total,
        ancient as f64 / total as f64 * 100.0
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let config = parse_args();
    if let Err(e) = config.validate() {
        eprintln!("Config validation error: {}", e);
        process::exit(1);
    }

    print_banner(&config);
    info!("running {} epochs", config.epochs);

    let result = if config.tracer { run_tracer(&config) } else { run_plain(&config) };
    if let Err(e) = result {
        eprintln!("Simulation error: {}", e);
        process::exit(1);
    }

    println!("\nSimulation complete!");
}
