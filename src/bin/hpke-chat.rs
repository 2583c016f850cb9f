//! hpke-chat - one HPKE handshake, one message each way

use std::io::{self, BufRead, Write};

use clap::Parser;
use hpke_chat::{handshake, transport, ChannelConfig, Role, DEFAULT_HOST, DEFAULT_PORT};
use tracing::error;
use tracing_subscriber::filter::{Builder, LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hpke-chat")]
#[command(about = "Exchange one HPKE-sealed message with a peer")]
#[command(version)]
struct Args {
    /// `server` to listen as the responder; anything else connects as the initiator
    #[arg(default_value = "client")]
    role: String,

    /// Host the initiator connects to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// TCP port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

fn main() {
    // Logs go to stderr; stdout carries the conversation
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let role = Role::from_arg(&args.role);
    let config = ChannelConfig::default()
        .with_host(args.host)
        .with_port(args.port);

    let stream = match role {
        Role::Responder => transport::accept(&config)?,
        Role::Initiator => transport::connect(&config)?,
    };

    let channel = handshake(role, stream, &config)?;
    channel.chat(prompt, |pt| {
        println!("Received message: {}", String::from_utf8_lossy(pt));
    })?;

    Ok(())
}

/// `RUST_LOG` when set, `info` otherwise
fn log_filter() -> EnvFilter {
    filter_builder().from_env_lossy()
}

fn filter_builder() -> Builder {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into())
}

/// Read one line from stdin, newline included
fn prompt() -> io::Result<Vec<u8>> {
    print!("Enter message: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives_override_default() {
        let filter = filter_builder().parse_lossy("debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = filter_builder().parse_lossy("hpke_chat=trace");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        let filter = filter_builder().parse_lossy("");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_role_argument_defaults_to_initiator() {
        let args = Args::parse_from(["hpke-chat"]);
        assert_eq!(Role::from_arg(&args.role), Role::Initiator);
        assert_eq!(args.port, DEFAULT_PORT);

        let args = Args::parse_from(["hpke-chat", "server", "--port", "5000"]);
        assert_eq!(Role::from_arg(&args.role), Role::Responder);
        assert_eq!(args.port, 5000);
    }
}
