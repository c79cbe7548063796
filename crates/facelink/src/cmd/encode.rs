use std::fs;

use facelink_proto::{build_cmd, build_frame, build_info, build_led_strip_frame, CANVAS_PIXELS};
use tracing::info;

use crate::cmd::{read_input, usage, EncodeArgs, EncodePacket, PixelArgs};
use crate::exit::{io_error, proto_error, CliResult, SUCCESS};
use crate::output::{print_raw, to_hex};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let seq = args.seq;
    let wire = match &args.packet {
        EncodePacket::Frame(pixels) => {
            let data = resolve_pixels(pixels, CANVAS_PIXELS)?;
            build_frame(pixels.frame_id, &data, seq, !pixels.no_compress)
        }
        EncodePacket::Led(pixels) => {
            let data = resolve_pixels(pixels, CANVAS_PIXELS)?;
            build_led_strip_frame(pixels.frame_id, &data, seq, !pixels.no_compress)
        }
        EncodePacket::Info(info) => build_info(info.fw_version, info.brightness, seq),
        EncodePacket::Cmd(cmd) => build_cmd(cmd.id, &cmd.data.0, seq),
    }
    .map_err(|err| proto_error("encode failed", err))?;

    info!(bytes = wire.len(), seq, "packet encoded");

    let rendered: Vec<u8> = if args.hex {
        format!("{}\n", to_hex(&wire)).into_bytes()
    } else {
        wire.to_vec()
    };

    match &args.out {
        Some(path) => fs::write(path, &rendered)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?,
        None => print_raw(&rendered).map_err(|err| io_error("failed writing stdout", err))?,
    }

    Ok(SUCCESS)
}

fn resolve_pixels(args: &PixelArgs, default_count: usize) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.pixels {
        let data = read_input(path)?;
        if data.len() % 3 != 0 {
            return Err(usage(format!(
                "pixel file holds {} bytes, not a whole number of RGB pixels",
                data.len()
            )));
        }
        return Ok(data);
    }

    let rgb = args.fill.unwrap_or([0, 0, 0]);
    let count = args.count.unwrap_or(default_count);
    Ok(rgb.repeat(count))
}
