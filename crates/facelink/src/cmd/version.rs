use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("facelink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: facelink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "protocol_version: {:#04x}",
        facelink_proto::PROTOCOL_VERSION
    );
    println!(
        "canvas: {}x{}",
        facelink_proto::CANVAS_WIDTH,
        facelink_proto::CANVAS_HEIGHT
    );
    println!(
        "target: {}",
        option_env!("FACELINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
