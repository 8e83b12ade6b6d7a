//! Subcommand implementations

use crate::args::{Commands, Link};
use pktbench_capture::{list_interfaces, PcapSniffer};
use pktbench_core::{Error, Result, Sniffer};
use pktbench_packet::{parse, parse_ether, Dispatch, Layers};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Run one subcommand, writing its report to stdout
pub fn run(command: &Commands) -> Result<()> {
    match command {
        Commands::Decode { hex, link } => {
            println!("{}", decode(hex, *link)?);
        }
        Commands::Diff {
            expected,
            received,
            link,
        } => {
            print!("{}", diff(expected, received, *link)?);
        }
        Commands::Interfaces => {
            for iface in list_interfaces()? {
                println!("{}", iface);
            }
        }
        Commands::Sniff {
            interface,
            count,
            filter,
            timeout,
        } => sniff(interface, *count, filter.as_deref(), Duration::from_secs(*timeout))?,
    }
    Ok(())
}

/// Decode hex text, ignoring whitespace and a leading `0x`
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.split_whitespace().collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    hex::decode(digits).map_err(|e| Error::invalid_parameter("hex", e.to_string()))
}

/// Parse a hex frame starting at `link`
pub fn decode(text: &str, link: Link) -> Result<Layers> {
    parse(&Dispatch::standard(), link.parser(), &decode_hex(text)?)
}

/// Diff report for two hex frames; a single line when they match
pub fn diff(expected: &str, received: &str, link: Link) -> Result<String> {
    let expected = decode(expected, link)?;
    let received = decode(received, link)?;
    if expected.matches(&received) {
        return Ok("frames match\n".to_string());
    }
    Ok(expected.diff(&received))
}

fn sniff(interface: &str, count: Option<usize>, filter: Option<&str>, timeout: Duration) -> Result<()> {
    let mut sniffer = PcapSniffer::open(interface)?;
    if let Some(filter) = filter {
        sniffer.set_filter(filter)?;
    }

    let dispatch = Dispatch::standard();
    let mut seen = 0;
    for frame in sniffer.frames(Instant::now() + timeout) {
        let frame = frame?;
        match parse(&dispatch, parse_ether, frame.data()) {
            Ok(layers) => println!("{}", layers),
            Err(e) => warn!(error = %e, len = frame.len(), "unparsable frame"),
        }
        seen += 1;
        if count.map_or(false, |count| seen >= count) {
            break;
        }
    }

    info!(frames = seen, stats = %sniffer.stats(), "capture finished");
    Ok(())
}
