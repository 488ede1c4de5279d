//! `loopback-demo-daemon`: the same process contract as `loopbackd`, but
//! linked against `loopback-demo-counter` so its `demo:Counter` factory is
//! actually registered. Used by the workspace's integration tests and by
//! anyone trying the service end to end without writing their own
//! `RemoteObject`.

use loopback_daemon::{ArgsOutcome, VERSION_STRING};

// Referencing the crate ensures its `register_factory!` submission actually
// links into this binary; `inventory` collects at link time, so an unused
// library dependency would otherwise be eligible for the linker to drop.
use loopback_demo_counter as _;

#[tokio::main]
async fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();

    let args = match loopback_daemon::args_parse(&raw) {
        Ok(ArgsOutcome::Run(args)) => args,
        Ok(ArgsOutcome::PrintVersion) => {
            println!("{VERSION_STRING}");
            return;
        }
        Ok(ArgsOutcome::PrintHelp) => {
            println!("{VERSION_STRING} (demo:Counter)");
            return;
        }
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    if let Err(e) = loopback_daemon::run(args).await {
        eprintln!("loopback-demo-daemon: startup failed: {e}");
        std::process::exit(1);
    }
}
