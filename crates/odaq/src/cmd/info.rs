use odaq_device::DeviceInfo;
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_json, print_pretty, print_table, OutputFormat};

#[derive(Serialize)]
struct InfoOutput<'a> {
    port: &'a str,
    #[serde(flatten)]
    info: DeviceInfo,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut daq = args.port.open()?;
    let info = daq.get_info().map_err(|err| device_error("get_info failed", err))?;

    let out = InfoOutput {
        port: &args.port.port,
        info,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["PORT", "HARDWARE", "FIRMWARE", "DEVICE ID"],
            [[
                out.port.to_string(),
                info.hardware_version.to_string(),
                info.firmware_version.to_string(),
                info.device_id.to_string(),
            ]],
        ),
        OutputFormat::Pretty => print_pretty(
            "Device Info",
            &[
                ("Port", out.port.to_string()),
                ("Hardware version", info.hardware_version.to_string()),
                ("Firmware version", info.firmware_version.to_string()),
                ("Device id", info.device_id.to_string()),
            ],
        ),
        OutputFormat::Raw => println!("{}", info.device_id),
    }
    Ok(SUCCESS)
}
