//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use pktbench_packet::{parse_ether, parse_ipv4, LayerParser};

#[derive(Parser, Debug)]
#[command(name = "pktbench")]
#[command(version, about = "Packet-level protocol conformance test bench", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a hex-encoded frame and print its layers
    Decode {
        /// Frame bytes as hex (whitespace and a leading 0x are ignored)
        #[arg(value_name = "HEX")]
        hex: String,

        /// Outermost layer of the frame
        #[arg(long, value_enum, default_value_t = Link::Ether)]
        link: Link,
    },

    /// Show how a received frame differs from an expected one
    Diff {
        /// Expected frame as hex
        #[arg(value_name = "EXPECTED")]
        expected: String,

        /// Received frame as hex
        #[arg(value_name = "RECEIVED")]
        received: String,

        /// Outermost layer of both frames
        #[arg(long, value_enum, default_value_t = Link::Ether)]
        link: Link,
    },

    /// List available network interfaces
    Interfaces,

    /// Capture frames and print their layers
    Sniff {
        /// Network interface to capture on
        #[arg(short = 'I', long)]
        interface: String,

        /// Stop after this many frames
        #[arg(short = 'c', long)]
        count: Option<usize>,

        /// BPF filter expression
        #[arg(short = 'f', long, value_name = "BPF")]
        filter: Option<String>,

        /// Stop after this many seconds
        #[arg(short = 't', long, value_name = "SECONDS", default_value = "10")]
        timeout: u64,
    },
}

/// Outermost layer of a hex frame
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Ethernet II
    Ether,
    /// Raw IPv4, no link-layer header
    Ipv4,
}

impl Link {
    pub fn parser(self) -> LayerParser {
        match self {
            Link::Ether => parse_ether,
            Link::Ipv4 => parse_ipv4,
        }
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log level for the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
