use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use facelink_proto::PacketReader;
use tracing::{info, warn};

use crate::cmd::DumpArgs;
use crate::exit::{io_error, proto_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = if args.input == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&args.input)
            .map_err(|err| io_error(&format!("failed opening {}", args.input.display()), err))?;
        Box::new(BufReader::new(file))
    };

    let mut printed = 0usize;
    let mut rejected = 0usize;

    let mut packets = PacketReader::new(source);
    while !limit_reached(args.count, printed) {
        let Some(result) = packets.next() else {
            break;
        };
        match result {
            Ok(packet) => {
                print_packet(&packet, format);
                printed = printed.saturating_add(1);
            }
            Err(err @ facelink_proto::ProtoError::Io(_)) => {
                return Err(proto_error("read failed", err));
            }
            Err(err) => {
                warn!(error = %err, "dropping packet");
                rejected = rejected.saturating_add(1);
            }
        }
    }

    info!(printed, rejected, "dump finished");

    if args.strict && rejected > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{rejected} packet(s) rejected"),
        ));
    }
    Ok(SUCCESS)
}

fn limit_reached(count: Option<usize>, printed: usize) -> bool {
    count.is_some_and(|count| printed >= count)
}
