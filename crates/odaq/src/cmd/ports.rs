use odaq_transport::SerialTransport;
use serde::Serialize;

use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct PortsOutput {
    ports: Vec<String>,
}

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let ports = SerialTransport::available_ports()
        .map_err(|err| transport_error("port enumeration failed", err))?;

    match format {
        OutputFormat::Json => print_json(&PortsOutput { ports }),
        OutputFormat::Table => print_table(&["PORT"], ports.into_iter().map(|p| [p])),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for port in ports {
                println!("{port}");
            }
        }
    }
    Ok(SUCCESS)
}
