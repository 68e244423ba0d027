use odaq_device::Calibration;
use serde::Serialize;

use crate::cmd::CalArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct CalOutput {
    calibration: Vec<Calibration>,
}

pub fn run(args: CalArgs, format: OutputFormat) -> CliResult<i32> {
    let mut daq = args.port.open()?;
    let calibration = daq.get_cal().map_err(|err| device_error("get_cal failed", err))?;

    match format {
        OutputFormat::Json => print_json(&CalOutput { calibration }),
        OutputFormat::Table => print_table(
            &["GAIN ID", "GAIN", "OFFSET"],
            calibration.iter().map(|cal| {
                [
                    cal.gain_id.to_string(),
                    cal.gain.to_string(),
                    cal.offset.to_string(),
                ]
            }),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for cal in &calibration {
                println!("gain_id={} gain={} offset={}", cal.gain_id, cal.gain, cal.offset);
            }
        }
    }
    Ok(SUCCESS)
}
