use facelink_proto::parse_packet;
use tracing::debug;

use crate::cmd::{parse_hex, read_input, usage, DecodeArgs};
use crate::exit::{proto_error, CliResult, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut data = read_input(&args.input)?;
    if args.hex {
        let text = String::from_utf8(data).map_err(|_| usage("--hex input is not text"))?;
        data = parse_hex(&text).map_err(usage)?.0;
    }
    debug!(bytes = data.len(), "decoding packet");

    let packet = parse_packet(&data).map_err(|err| proto_error("decode failed", err))?;
    if data.len() > packet.wire_size() {
        debug!(
            trailing = data.len() - packet.wire_size(),
            "ignoring bytes after packet"
        );
    }

    print_packet(&packet, format);
    Ok(SUCCESS)
}
