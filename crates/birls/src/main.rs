//! birls entry point: CLI parsing, logging setup, transport selection,
//! and the top-level run loop. Mirrors `perl-dap`'s `main.rs` shape:
//! clap derive args, `tracing_subscriber` initialized to stderr, a
//! `DapServer`-style server struct driven from `run()`/`run_socket()`.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
mod dispatch;
mod remote_client;

use std::io::{self, BufReader};
use std::net::TcpListener;

use clap::Parser;
use dispatch::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// Language server backend for the BIR-derived binary listing format.
#[derive(Parser, Debug)]
#[command(name = "birls", version, about, long_about = None)]
struct Args {
    /// Use TCP for transport instead of stdio.
    #[arg(long, conflicts_with = "stdio")]
    tcp: bool,

    /// Use stdio for transport (default).
    #[arg(long, default_value_t = true)]
    stdio: bool,

    /// Host to bind when `--tcp` is set.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind when `--tcp` is set.
    #[arg(long, default_value_t = 3036)]
    port: u16,

    /// Treat the client filesystem as inaccessible even under stdio,
    /// forcing the `getBirFile`/`pushBirFile` remote round trip.
    #[arg(long)]
    force_remote: bool,

    /// Disables the rewrite pipeline; `did_save` always reports K6.
    #[arg(long)]
    no_rewrite: bool,

    /// Increases log verbosity; repeatable (`-v`, `-vv`).
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    tracing::info!("birls: language server starting");

    let rewriting_enabled = !args.no_rewrite;

    let outcome = if args.tcp {
        run_tcp(&args.host, args.port, rewriting_enabled, args.force_remote)
    } else if args.stdio {
        run_stdio(rewriting_enabled, args.force_remote)
    } else {
        // Unreachable: `tcp` and `stdio` are mutually exclusive and `stdio`
        // defaults to true, so clap never produces neither. Kept as a
        // defensive fallback to stdio rather than a silent panic, mirroring
        // the original CLI's behavior for an unrecognized transport.
        tracing::warn!("no transport selected, defaulting to stdio");
        run_stdio(rewriting_enabled, args.force_remote)
    };

    match outcome {
        Ok(()) => {
            tracing::info!("birls: shutting down cleanly");
            Ok(())
        }
        Err(err) if is_interrupt(&err) => {
            tracing::info!("birls: interrupted");
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>().is_some_and(|io_err| io_err.kind() == io::ErrorKind::Interrupted)
}

fn run_stdio(rewriting_enabled: bool, force_remote: bool) -> anyhow::Result<()> {
    install_sigint_handler();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut server = Server::new(BufReader::new(stdin.lock()), stdout.lock(), rewriting_enabled, force_remote, "127.0.0.1".to_string());
    server.run()?;
    Ok(())
}

fn run_tcp(host: &str, port: u16, rewriting_enabled: bool, force_remote: bool) -> anyhow::Result<()> {
    install_sigint_handler();
    let listener = TcpListener::bind((host, port))?;
    tracing::info!(%host, %port, "birls: listening on TCP");
    let (stream, peer_addr) = listener.accept()?;
    tracing::info!(%peer_addr, "birls: client connected");
    let reader = stream.try_clone()?;
    let mut server = Server::new(BufReader::new(reader), stream, rewriting_enabled, force_remote, peer_addr.ip().to_string());
    server.run()?;
    Ok(())
}

#[cfg(unix)]
fn install_sigint_handler() {
    use nix::sys::signal::{self, SigHandler, Signal};

    // SAFETY: the handler only sets an atomic flag; it performs no
    // allocation or non-async-signal-safe work.
    unsafe {
        if let Err(err) = signal::signal(Signal::SIGINT, SigHandler::Handler(handle_sigint)) {
            tracing::warn!(%err, "failed to install SIGINT handler");
        }
    }
}

#[cfg(unix)]
extern "C" fn handle_sigint(_: i32) {
    std::process::exit(1);
}

#[cfg(not(unix))]
fn install_sigint_handler() {}
