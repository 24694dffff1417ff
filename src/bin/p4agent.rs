use p4agent::app::run_cli;
use p4agent::shared::logging::init_logging;

fn run() -> Result<(), String> {
    init_logging("info");
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
