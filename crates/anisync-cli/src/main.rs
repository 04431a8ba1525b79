mod cli;

use anisync_core::interrupt;

fn main() {
    if let Err(e) = cli::run() {
        if e.downcast_ref::<interrupt::InterruptedError>().is_some() {
            std::process::exit(130);
        }
        // The navigator already told the user which step is missing.
        if e.downcast_ref::<cli::SetupRequired>().is_some() {
            std::process::exit(2);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
