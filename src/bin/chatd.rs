//! `chatd` -- standalone broadcast chat server.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use sysprog_lab::chat::Server;

#[derive(Parser, Debug)]
#[command(name = "chatd", about = "Non-blocking broadcast chat server")]
struct Args {
    /// Port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = 7878)]
    port: u16,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut server = Server::new();
    if let Err(e) = server.listen(args.port) {
        error!("failed to listen on port {}: {e}", args.port);
        return ExitCode::FAILURE;
    }
    info!("listening on port {}", args.port);

    loop {
        match server.update(-1) {
            Ok(()) => {
                while let Some(msg) = server.pop_next() {
                    info!("peer {} says: {}", msg.author, msg.body);
                }
            }
            Err(e) => {
                error!("server loop error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
