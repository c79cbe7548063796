use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use facelink_proto::{Packet, Payload};
use serde::Serialize;

/// Longest opaque payload shown in full; longer ones are cut with an ellipsis.
const PREVIEW_BYTES: usize = 32;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    packet_type: &'static str,
    version: u8,
    seq: u16,
    length: u16,
    crc8: String,
    payload: PayloadOutput,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PayloadOutput {
    Cmd {
        cmd_id: Option<u8>,
        data: String,
    },
    Frame {
        frame_id: u16,
        flags: u8,
        compressed: bool,
        pixel_count: usize,
        complete: bool,
    },
    Info {
        fw_version: u16,
        brightness: u8,
    },
    Led {
        size: usize,
        data: String,
    },
}

impl PacketOutput {
    fn from_packet(packet: &Packet) -> Self {
        let payload = match &packet.payload {
            Payload::Cmd(_) => {
                let (cmd_id, data) = packet
                    .payload
                    .command()
                    .map_or((None, &[][..]), |(id, data)| (Some(id), data));
                PayloadOutput::Cmd {
                    cmd_id,
                    data: hex_preview(data),
                }
            }
            Payload::Frame(frame) => PayloadOutput::Frame {
                frame_id: frame.frame_id,
                flags: frame.flags.bits(),
                compressed: frame.flags.is_compressed(),
                pixel_count: frame.pixel_count(),
                complete: frame.is_complete(),
            },
            Payload::Info(info) => PayloadOutput::Info {
                fw_version: info.fw_version,
                brightness: info.brightness,
            },
            Payload::Led(bytes) => PayloadOutput::Led {
                size: bytes.len(),
                data: hex_preview(bytes),
            },
        };

        Self {
            packet_type: packet.packet_type().name(),
            version: packet.header.version,
            seq: packet.header.seq,
            length: packet.header.length,
            crc8: format!("{:#04x}", packet.header.crc8),
            payload,
        }
    }
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput::from_packet(packet);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SEQ", "LEN", "DETAIL"])
                .add_row(vec![
                    packet.packet_type().name().to_string(),
                    packet.header.seq.to_string(),
                    packet.header.length.to_string(),
                    detail(packet),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} seq={} len={} {}",
                packet.packet_type().name(),
                packet.header.seq,
                packet.header.length,
                detail(packet)
            );
        }
        OutputFormat::Raw => {
            let _ = print_raw(payload_bytes(packet));
        }
    }
}

pub fn print_raw(data: &[u8]) -> io::Result<()> {
    write_raw(&mut io::stdout().lock(), data)
}

fn write_raw(out: &mut impl Write, data: &[u8]) -> io::Result<()> {
    out.write_all(data)?;
    out.flush()
}

/// Payload bytes as a consumer sees them: expanded pixels for frames.
fn payload_bytes(packet: &Packet) -> &[u8] {
    match &packet.payload {
        Payload::Cmd(bytes) | Payload::Led(bytes) => &bytes[..],
        Payload::Frame(frame) => &frame.pixels[..],
        Payload::Info(_) => &[],
    }
}

fn detail(packet: &Packet) -> String {
    match &packet.payload {
        Payload::Cmd(bytes) => match packet.payload.command() {
            Some((id, data)) => format!("cmd_id={id:#04x} data={}", hex_preview(data)),
            None => format!("empty command ({} bytes)", bytes.len()),
        },
        Payload::Frame(frame) => format!(
            "frame_id={} compressed={} pixels={}{}",
            frame.frame_id,
            frame.flags.is_compressed(),
            frame.pixel_count(),
            if frame.is_complete() { "" } else { " (partial)" }
        ),
        Payload::Info(info) => format!(
            "fw_version={:#06x} brightness={}",
            info.fw_version, info.brightness
        ),
        Payload::Led(bytes) => format!("size={} data={}", bytes.len(), hex_preview(bytes)),
    }
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_preview(data: &[u8]) -> String {
    if data.len() <= PREVIEW_BYTES {
        to_hex(data)
    } else {
        format!("{}...", to_hex(&data[..PREVIEW_BYTES]))
    }
}
