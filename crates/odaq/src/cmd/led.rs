use serde::Serialize;

use crate::cmd::LedArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct LedOutput {
    led: odaq_device::LedColor,
}

pub fn run(args: LedArgs, format: OutputFormat) -> CliResult<i32> {
    let mut daq = args.port.open()?;
    let led = daq
        .set_led(args.color)
        .map_err(|err| device_error("set_led failed", err))?;

    match format {
        OutputFormat::Json => print_json(&LedOutput { led }),
        _ => println!("led: {led}"),
    }
    Ok(SUCCESS)
}
