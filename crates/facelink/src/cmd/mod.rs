use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod dump;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a single packet and print its header and payload.
    Decode(DecodeArgs),
    /// Decode every packet in a captured byte stream.
    Dump(DumpArgs),
    /// Build a packet and write its wire bytes.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Dump(args) => dump::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Packet file to read ("-" for stdin).
    #[arg(default_value = "-")]
    pub input: PathBuf,
    /// Input is hex text rather than raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Captured stream to read ("-" for stdin).
    #[arg(default_value = "-")]
    pub input: PathBuf,
    /// Stop after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit non-zero if any packet was rejected.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Write wire bytes to this file instead of stdout.
    #[arg(long, short = 'o', global = true)]
    pub out: Option<PathBuf>,
    /// Emit hex text instead of raw bytes.
    #[arg(long, global = true)]
    pub hex: bool,
    /// Advisory sequence number.
    #[arg(long, default_value = "0", value_parser = parse_u16, global = true)]
    pub seq: u16,
    #[command(subcommand)]
    pub packet: EncodePacket,
}

#[derive(Subcommand, Debug)]
pub enum EncodePacket {
    /// Display frame (128x32 RGB888).
    Frame(PixelArgs),
    /// LED strip frame.
    Led(PixelArgs),
    /// Device information.
    Info(InfoArgs),
    /// Command with optional data bytes.
    Cmd(CmdArgs),
}

#[derive(Args, Debug)]
pub struct PixelArgs {
    /// Frame identifier.
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub frame_id: u16,
    /// Raw RGB888 pixel file.
    #[arg(long, conflicts_with = "fill")]
    pub pixels: Option<PathBuf>,
    /// Fill every pixel with one colour, as R,G,B.
    #[arg(long, value_parser = parse_rgb, conflicts_with = "pixels")]
    pub fill: Option<[u8; 3]>,
    /// Pixel count for --fill (defaults to the display canvas).
    #[arg(long)]
    pub count: Option<usize>,
    /// Send pixels uncompressed even when RLE would be smaller.
    #[arg(long)]
    pub no_compress: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Firmware version (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u16)]
    pub fw_version: u16,
    /// Brightness, 0-255.
    #[arg(long)]
    pub brightness: u8,
}

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Command id (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u8)]
    pub id: u8,
    /// Command data as hex.
    #[arg(long, value_parser = parse_hex, default_value = "")]
    pub data: HexBytes,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Bytes parsed from hex text.
#[derive(Debug, Clone, Default)]
pub struct HexBytes(pub Vec<u8>);

/// Read all of `path`, or stdin for "-".
pub fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    let mut data = Vec::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_end(&mut data)
            .map_err(|err| io_error("failed reading stdin", err))?;
    } else {
        data = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    }
    Ok(data)
}

pub fn parse_hex(input: &str) -> Result<HexBytes, String> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|_| "invalid hex text".to_string())?;
            u8::from_str_radix(text, 16).map_err(|_| format!("invalid hex byte {text:?}"))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    parse_number(input).and_then(|n| u16::try_from(n).map_err(|_| format!("{input} exceeds 65535")))
}

pub fn parse_u8(input: &str) -> Result<u8, String> {
    parse_number(input).and_then(|n| u8::try_from(n).map_err(|_| format!("{input} exceeds 255")))
}

fn parse_number(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

pub fn parse_rgb(input: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = input.split(',').collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got {input:?}"));
    };
    Ok([parse_u8(r)?, parse_u8(g)?, parse_u8(b)?])
}

pub fn usage(message: impl Into<String>) -> CliError {
    CliError::new(USAGE, message)
}
