// demos/simulate.rs
// Run with:
//   cargo run --example simulate --features system-simulator -- [config.toml]
//
// Runs one closed-loop simulation on a worker thread while the main thread
// polls the progress gauge, then prints the trace as CSV.

use std::path::Path;
use std::thread;
use std::time::Duration;

use thermo_loop::config::{SimConfig, load_from_file};
use thermo_loop::systems::sdk::{CancelToken, ProgressGauge};
use thermo_loop::systems::simulator::Simulation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => load_from_file(Path::new(&path))?,
        None => SimConfig::default(),
    };
    let sim = Simulation::from_config(cfg)?;

    let cancel = CancelToken::new();
    let gauge = ProgressGauge::new();
    let worker = {
        let (cancel, gauge) = (cancel.clone(), gauge.clone());
        thread::spawn(move || sim.run(&cancel, &gauge))
    };

    while !worker.is_finished() {
        eprint!("\rsimulating… {:>3}%", gauge.get());
        thread::sleep(Duration::from_millis(50));
    }
    eprintln!("\rsimulating… {:>3}%", gauge.get());

    let out = worker.join().map_err(|_| "simulation thread panicked")??;
    eprintln!("{:?}", out.obs);

    println!("time_h,room_c,ambient_c,reference_c,measured_c,heater");
    for row in out.theta.rows() {
        println!(
            "{:.4},{:.3},{:.3},{:.2},{:.3},{}",
            row.time,
            row.room,
            row.ambient,
            row.reference,
            row.measured,
            u8::from(row.heater.is_on())
        );
    }
    Ok(())
}
