//! `chat` -- interactive chat client.

use std::io::Read;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use log::error;

use sysprog_lab::chat::{ChatError, Client};

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Interactive chat client")]
struct Args {
    /// Display name announced in prompts.
    #[arg(short = 'n', long = "name", default_value = "anonymous")]
    name: String,
    /// Server address, e.g. 127.0.0.1:7878.
    address: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut client = Client::new(args.name);
    if let Err(e) = client.connect(&args.address) {
        error!("failed to connect to {}: {e}", args.address);
        return ExitCode::FAILURE;
    }

    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        while let Ok(chunk) = rx.try_recv() {
            client.feed(&chunk);
        }

        match client.update(50) {
            Ok(()) => {
                while let Some(msg) = client.pop_next() {
                    println!("{msg}");
                }
            }
            Err(ChatError::Timeout) => {}
            Err(e) => {
                error!("client loop error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
