//! `loopbackd`: the detached process entrypoint (§6 "Daemon process
//! invocation"). Parses the five-flag contract, hands off to
//! [`loopback_daemon::run`], and maps startup failure onto a non-zero exit
//! code without panicking. This process is spawned headless, stdio
//! discarded, so there is no terminal on the other end to read a panic
//! backtrace from.

use loopback_daemon::{ArgsOutcome, VERSION_STRING};

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
            print_help();
            return;
        }
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Usage: loopbackd --name <str> --factory-file <path> --idle-ttl <secs> --serializer <codec> --scope user");
            std::process::exit(2);
        }
    };

    if let Err(e) = loopback_daemon::run(args).await {
        eprintln!("loopbackd: startup failed: {e}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("{VERSION_STRING}");
    println!();
    println!("Background process holding one named singleton object, serving method");
    println!("calls to short-lived clients over a loopback TCP connection.");
    println!();
    println!("loopbackd is spawned by a client coordinator and should not be invoked");
    println!("directly in ordinary use.");
    println!();
    println!("OPTIONS:");
    println!("    --name <str>            Service name (runtime directory key)");
    println!("    --factory-file <path>   Path to the encoded factory payload");
    println!("    --idle-ttl <secs>       Idle shutdown timeout, in seconds");
    println!("    --serializer <codec>    Wire codec name (only \"json\" is implemented)");
    println!("    --scope <scope>         Must be \"user\"");
    println!("    -h, --help              Print this help and exit");
    println!("    -V, --version           Print the version and exit");
}
