use odaq_frame::{
    append_event, read_event, DecodeEvent, DecoderConfig, FrameDecoder, SessionConfig,
    StreamFrame, StreamSession, StreamStatus, DELIMITER,
};
use odaq_transport::{SerialConfig, SerialTransport, Transport};
use tracing::{debug, info};

use crate::command::{id, Command};
use crate::error::{DeviceError, Result};
use crate::field::{FieldKind, Fields};
use crate::mode::{ChannelMode, LedColor};
use crate::transceiver::{response_len, CommandTransceiver};
use crate::types::{
    AdcConfig, AdcReading, Calibration, Capture, ChannelConfig, ChannelSetup, DeviceInfo,
    ExternalSetup, PioState, PwmConfig, SignalLoad, StreamSetup, CALIBRATION_SLOTS,
};

use crate::field::FieldKind::{I16, I8, U16, U32, U8};

const CALIBRATION_LAYOUT: &[FieldKind] = &[U8, U16, I16];

/// Highest stream channel number.
pub const MAX_CHANNEL: u8 = 4;
/// Highest PIO line number.
pub const MAX_PIO: u8 = 6;
/// DAC output limit in millivolts, exclusive on both sides.
pub const DAC_LIMIT_MV: i32 = 4096;

/// An openDAQ device on a [`Transport`].
///
/// Commands and the data stream share one link. Commands are synchronous
/// exchanges; stream data is pulled with [`get_stream`](Self::get_stream) or a
/// [`StreamSession`] once the device has been told to [`start`](Self::start).
#[derive(Debug)]
pub struct Daq<T> {
    transceiver: CommandTransceiver<T>,
    decoder: FrameDecoder,
}

impl Daq<SerialTransport> {
    /// Open a serial port and wrap it.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let transport = SerialTransport::open(config)?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport> Daq<T> {
    pub fn new(transport: T) -> Self {
        Self::with_decoder_config(transport, DecoderConfig::default())
    }

    /// Wrap a transport, decoding [`get_stream`](Self::get_stream) frames
    /// with `config`.
    pub fn with_decoder_config(transport: T, config: DecoderConfig) -> Self {
        Self {
            transceiver: CommandTransceiver::new(transport),
            decoder: FrameDecoder::with_config(config),
        }
    }

    /// Exchange an arbitrary command.
    pub fn send(&mut self, command: &Command, layout: &[FieldKind]) -> Result<Fields> {
        self.transceiver.send(command, layout)
    }

    /// Hardware and firmware versions and the device id.
    pub fn get_info(&mut self) -> Result<DeviceInfo> {
        let fields = self.send(&Command::new(id::GET_INFO), &[I8, I8, U32])?;
        let info = DeviceInfo {
            hardware_version: fields.i8(0)?,
            firmware_version: fields.i8(1)?,
            device_id: fields.u32(2)?,
        };
        info!(
            hw = info.hardware_version,
            fw = info.firmware_version,
            id = info.device_id,
            "device identified"
        );
        Ok(info)
    }

    /// Single reading with the current ADC configuration.
    pub fn read_adc(&mut self) -> Result<i16> {
        self.send(&Command::new(id::READ_ADC), &[I16])?.i16(0)
    }

    /// Select the ADC inputs and take a reading.
    pub fn conf_adc(&mut self, config: &AdcConfig) -> Result<AdcReading> {
        let cmd = Command::new(id::CONF_ADC)
            .u8(config.pinput)
            .u8(config.ninput)
            .u8(config.gain)
            .u8(config.nsamples);
        let fields = self.send(&cmd, &[I16, U8, U8, U8, U8])?;
        Ok(AdcReading {
            value: fields.i16(0)?,
            config: AdcConfig {
                pinput: fields.u8(1)?,
                ninput: fields.u8(2)?,
                gain: fields.u8(3)?,
                nsamples: fields.u8(4)?,
            },
        })
    }

    /// Turn response checksums on or off in the firmware.
    pub fn enable_crc(&mut self, on: bool) -> Result<bool> {
        let fields = self.send(&Command::new(id::ENABLE_CRC).u8(u8::from(on)), &[U8])?;
        Ok(fields.u8(0)? != 0)
    }

    pub fn set_led(&mut self, color: LedColor) -> Result<LedColor> {
        let code = self
            .send(&Command::new(id::SET_LED).u8(color.code()), &[U8])?
            .u8(0)?;
        LedColor::from_code(code)
            .ok_or_else(|| DeviceError::InvalidResponse(format!("LED color code {code}")))
    }

    /// Drive the analog output, in volts. Returns the programmed millivolts.
    pub fn set_dac(&mut self, volts: f64) -> Result<i16> {
        let millivolts = dac_millivolts(volts)?;
        self.send(&Command::new(id::SET_DAC).i16(millivolts), &[I16])?
            .i16(0)
    }

    /// Set the digital port direction mask (1 = output).
    pub fn set_port_dir(&mut self, mask: u8) -> Result<u8> {
        self.send(&Command::new(id::SET_PORT_DIR).u8(mask), &[U8])?
            .u8(0)
    }

    /// Write the digital port.
    pub fn set_port(&mut self, value: u8) -> Result<u8> {
        self.send(&Command::new(id::SET_PORT).u8(value), &[U8])?
            .u8(0)
    }

    /// Configure one PIO line as output (`true`) or input.
    pub fn set_pio_dir(&mut self, number: u8, output: bool) -> Result<PioState> {
        check_range("PIO", number, 1, MAX_PIO)?;
        let cmd = Command::new(id::SET_PIO_DIR).u8(number).u8(u8::from(output));
        self.pio_exchange(&cmd)
    }

    /// Drive one PIO line.
    pub fn set_pio(&mut self, number: u8, value: bool) -> Result<PioState> {
        check_range("PIO", number, 1, MAX_PIO)?;
        let cmd = Command::new(id::SET_PIO).u8(number).u8(u8::from(value));
        self.pio_exchange(&cmd)
    }

    fn pio_exchange(&mut self, cmd: &Command) -> Result<PioState> {
        let fields = self.send(cmd, &[U8, U8])?;
        Ok(PioState {
            number: fields.u8(0)?,
            value: fields.u8(1)?,
        })
    }

    /// Start the edge counter.
    pub fn init_counter(&mut self, edge: u8) -> Result<u8> {
        self.send(&Command::new(id::INIT_COUNTER).u8(edge), &[U8])?
            .u8(0)
    }

    /// Read the edge counter, optionally resetting it.
    pub fn get_counter(&mut self, reset: bool) -> Result<u16> {
        self.send(&Command::new(id::GET_COUNTER).u8(u8::from(reset)), &[U16])?
            .u16(0)
    }

    /// Start period capture with a reference period in microseconds.
    pub fn init_capture(&mut self, period: u16) -> Result<u16> {
        self.send(&Command::new(id::INIT_CAPTURE).u16(period), &[U16])?
            .u16(0)
    }

    pub fn stop_capture(&mut self) -> Result<()> {
        self.send(&Command::new(id::STOP_CAPTURE), &[])?;
        Ok(())
    }

    /// Read the captured period. `mode` selects low, high or full cycle.
    pub fn get_capture(&mut self, mode: u8) -> Result<Capture> {
        let fields = self.send(&Command::new(id::GET_CAPTURE).u8(mode), &[U8, U16])?;
        Ok(Capture {
            mode: fields.u8(0)?,
            period: fields.u16(1)?,
        })
    }

    pub fn init_encoder(&mut self, resolution: u8) -> Result<u8> {
        self.send(&Command::new(id::INIT_ENCODER).u8(resolution), &[U8])?
            .u8(0)
    }

    pub fn stop_encoder(&mut self) -> Result<()> {
        self.send(&Command::new(id::STOP_ENCODER), &[])?;
        Ok(())
    }

    /// Current encoder position.
    pub fn get_encoder(&mut self) -> Result<u16> {
        self.send(&Command::new(id::GET_ENCODER), &[U16])?.u16(0)
    }

    /// Start PWM output. `duty` is in 1/1023 steps, `period` in microseconds.
    pub fn init_pwm(&mut self, duty: u16, period: u16) -> Result<PwmConfig> {
        let cmd = Command::new(id::INIT_PWM).u16(duty).u16(period);
        let fields = self.send(&cmd, &[U16, U16])?;
        Ok(PwmConfig {
            duty: fields.u16(0)?,
            period: fields.u16(1)?,
        })
    }

    pub fn stop_pwm(&mut self) -> Result<()> {
        self.send(&Command::new(id::STOP_PWM), &[])?;
        Ok(())
    }

    /// Read one calibration slot.
    pub fn get_calibration(&mut self, gain_id: u8) -> Result<Calibration> {
        let fields = self.send(&Command::new(id::GET_CALIB).u8(gain_id), CALIBRATION_LAYOUT)?;
        calibration_from(&fields)
    }

    /// Write one calibration slot.
    pub fn set_calibration(&mut self, calibration: &Calibration) -> Result<Calibration> {
        let cmd = Command::new(id::SET_CALIB)
            .u8(calibration.gain_id)
            .u16(calibration.gain)
            .i16(calibration.offset);
        let fields = self.send(&cmd, CALIBRATION_LAYOUT)?;
        calibration_from(&fields)
    }

    /// Read every calibration slot.
    pub fn get_cal(&mut self) -> Result<Vec<Calibration>> {
        (0..CALIBRATION_SLOTS)
            .map(|gain_id| self.get_calibration(gain_id))
            .collect()
    }

    /// Write a full calibration table, one slot at a time.
    pub fn set_cal(&mut self, table: &[Calibration]) -> Result<Vec<Calibration>> {
        if table.len() > usize::from(CALIBRATION_SLOTS) {
            return Err(DeviceError::invalid(format!(
                "calibration table has {} entries, device keeps {CALIBRATION_SLOTS}",
                table.len()
            )));
        }
        table.iter().map(|cal| self.set_calibration(cal)).collect()
    }

    /// Configure a stream channel.
    pub fn conf_channel(&mut self, config: &ChannelConfig) -> Result<ChannelConfig> {
        check_channel(config.number)?;
        let cmd = Command::new(id::CONF_CHANNEL)
            .u8(config.number)
            .u8(config.mode.code())
            .u8(config.pinput)
            .u8(config.ninput)
            .u8(config.gain)
            .u8(config.nsamples);
        let fields = self.send(&cmd, &[U8; 6])?;
        let code = fields.u8(1)?;
        let mode = ChannelMode::from_code(code)
            .ok_or_else(|| DeviceError::InvalidResponse(format!("channel mode code {code}")))?;
        Ok(ChannelConfig {
            number: fields.u8(0)?,
            mode,
            pinput: fields.u8(2)?,
            ninput: fields.u8(3)?,
            gain: fields.u8(4)?,
            nsamples: fields.u8(5)?,
        })
    }

    /// Set how many points a channel acquires.
    pub fn setup_channel(&mut self, number: u8, npoints: u16, continuous: bool) -> Result<ChannelSetup> {
        check_channel(number)?;
        let cmd = Command::new(id::SETUP_CHANNEL)
            .u8(number)
            .u16(npoints)
            .u8(u8::from(continuous));
        let fields = self.send(&cmd, &[U8, U16, U8])?;
        Ok(ChannelSetup {
            number: fields.u8(0)?,
            npoints: fields.u16(1)?,
            continuous: fields.u8(2)? != 0,
        })
    }

    pub fn destroy_channel(&mut self, number: u8) -> Result<u8> {
        check_channel(number)?;
        self.send(&Command::new(id::DESTROY_CHANNEL).u8(number), &[U8])?
            .u8(0)
    }

    /// Create a periodic stream on `number`, sampling every `period` ms.
    pub fn create_stream(&mut self, number: u8, period: u16) -> Result<StreamSetup> {
        check_channel(number)?;
        if period == 0 {
            return Err(DeviceError::invalid("stream period must be at least 1 ms"));
        }
        let cmd = Command::new(id::CREATE_STREAM).u8(number).u16(period);
        let fields = self.send(&cmd, &[U8, U16])?;
        Ok(StreamSetup {
            number: fields.u8(0)?,
            period: fields.u16(1)?,
        })
    }

    /// Create a burst stream. Only one burst may exist at a time.
    pub fn create_burst(&mut self, period: u16) -> Result<u16> {
        self.send(&Command::new(id::CREATE_BURST).u16(period), &[U16])?
            .u16(0)
    }

    /// Create a stream triggered by an external edge.
    pub fn create_external(&mut self, number: u8, edge: u8) -> Result<ExternalSetup> {
        check_channel(number)?;
        let cmd = Command::new(id::CREATE_EXTERNAL).u8(number).u8(edge);
        let fields = self.send(&cmd, &[U8, U8])?;
        Ok(ExternalSetup {
            number: fields.u8(0)?,
            edge: fields.u8(1)?,
        })
    }

    /// Load a signal for analog output streams.
    ///
    /// The length byte carries the sample count, not the parameter byte count.
    pub fn load_signal(&mut self, samples: &[i16], offset: i16) -> Result<SignalLoad> {
        let count = u8::try_from(samples.len()).map_err(|_| {
            DeviceError::invalid(format!("signal has {} samples, at most 255 fit", samples.len()))
        })?;
        let cmd = samples
            .iter()
            .fold(Command::new(id::LOAD_SIGNAL).declared_len(count).i16(offset), |cmd, &s| cmd.i16(s));
        let fields = self.send(&cmd, &[U8, I16])?;
        Ok(SignalLoad {
            count: fields.u8(0)?,
            offset: fields.i16(1)?,
        })
    }

    /// Start every configured stream.
    pub fn start(&mut self) -> Result<()> {
        self.decoder.reset();
        self.send(&Command::new(id::START), &[])?;
        info!("acquisition started");
        Ok(())
    }

    /// Stop every stream and read the acknowledgement.
    ///
    /// Frames still in flight make the acknowledgement unreadable; use
    /// [`stop_streaming`](Self::stop_streaming) while data is flowing.
    pub fn stop(&mut self) -> Result<()> {
        self.send(&Command::new(id::STOP), &[])?;
        info!("acquisition stopped");
        Ok(())
    }

    /// Stop every stream while data is flowing.
    ///
    /// Writes the stop command without waiting, then collects the frames that
    /// were already on the wire with [`flush_stream`](Self::flush_stream).
    pub fn stop_streaming(&mut self) -> Result<Vec<StreamFrame>> {
        self.transceiver.get_mut().write_all(&Command::new(id::STOP).packet()?)?;
        let frames = self.flush_stream()?;
        info!(drained = frames.len(), "acquisition stopped");
        Ok(frames)
    }

    /// Read one stream event and append it to the caller's sequences.
    ///
    /// Frames append their samples to `data` and their channel id to
    /// `channels`. A byte outside any frame is appended to `data` and a stop
    /// appends the stopped channel to `channels`. A partial frame is kept
    /// across calls.
    pub fn get_stream(&mut self, data: &mut Vec<i16>, channels: &mut Vec<u8>) -> Result<StreamStatus> {
        let event = read_event(self.transceiver.get_mut(), &mut self.decoder)?;
        Ok(append_event(event, data, channels))
    }

    /// Borrow the link for a stream session with default configuration.
    pub fn stream_session(&mut self) -> StreamSession<&mut T> {
        self.stream_session_with(SessionConfig::default())
    }

    /// Borrow the link for a stream session.
    ///
    /// The session decodes with its own state; any partial frame held for
    /// [`get_stream`](Self::get_stream) is discarded.
    pub fn stream_session_with(&mut self, config: SessionConfig) -> StreamSession<&mut T> {
        self.decoder.reset();
        StreamSession::with_config(self.transceiver.get_mut(), config)
    }

    /// Drop unread input and any partial stream frame.
    pub fn flush(&mut self) -> Result<()> {
        self.decoder.reset();
        self.transceiver.get_mut().clear_input()?;
        Ok(())
    }

    /// Drain the stream after a stop command was written.
    ///
    /// Frames that arrive before the stop acknowledgement are returned,
    /// except those failing their stream checksum. The first byte outside a
    /// frame starts the 4-byte acknowledgement, which must arrive complete.
    /// If the link goes quiet first there is no acknowledgement to read.
    pub fn flush_stream(&mut self) -> Result<Vec<StreamFrame>> {
        let mut frames = Vec::new();
        let transport = self.transceiver.get_mut();
        self.decoder.reset();

        loop {
            let Some(byte) = transport.read_byte()? else {
                if self.decoder.in_frame() {
                    debug!("link idle inside a frame while draining");
                    self.decoder.reset();
                }
                return Ok(frames);
            };

            if !self.decoder.in_frame() && byte != DELIMITER {
                let expected = response_len(&[]);
                let tail = transport.read_up_to(expected - 1)?;
                if tail.len() + 1 < expected {
                    return Err(DeviceError::Length {
                        expected,
                        actual: tail.len() + 1,
                    });
                }
                debug!(frames = frames.len(), "stop acknowledged");
                return Ok(frames);
            }

            match self.decoder.push(byte) {
                Some(DecodeEvent::Frame(frame)) if frame.checksum_ok => frames.push(frame),
                Some(DecodeEvent::Frame(frame)) => {
                    debug!(channel = frame.channel(), "skipping frame with bad checksum");
                }
                Some(DecodeEvent::Stop { channel }) => debug!(channel, "channel stopped while draining"),
                Some(DecodeEvent::Stray(_)) | None => {}
            }
        }
    }

    /// Borrow the stream decoder used by [`get_stream`](Self::get_stream).
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.transceiver.get_ref()
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        self.transceiver.get_mut()
    }

    /// Consume the device and return the transport.
    pub fn into_inner(self) -> T {
        self.transceiver.into_inner()
    }
}

/// Convert a DAC voltage to the millivolts the firmware expects.
pub fn dac_millivolts(volts: f64) -> Result<i16> {
    let millivolts = (volts * 1000.0).round();
    if !millivolts.is_finite() || millivolts <= -f64::from(DAC_LIMIT_MV) || millivolts >= f64::from(DAC_LIMIT_MV) {
        return Err(DeviceError::invalid(format!(
            "DAC output {volts} V is outside ±{} V",
            f64::from(DAC_LIMIT_MV) / 1000.0
        )));
    }
    Ok(millivolts as i16)
}

fn check_channel(number: u8) -> Result<()> {
    check_range("channel", number, 1, MAX_CHANNEL)
}

fn check_range(what: &str, value: u8, min: u8, max: u8) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DeviceError::invalid(format!(
            "{what} number {value} is outside {min}..={max}"
        )))
    }
}

fn calibration_from(fields: &Fields) -> Result<Calibration> {
    Ok(Calibration {
        gain_id: fields.u8(0)?,
        gain: fields.u16(1)?,
        offset: fields.i16(2)?,
    })
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use odaq_frame::{encode_stop_frame, encode_stream_frame};
    use odaq_transport::MemoryTransport;

    use super::*;
    use crate::transceiver::encode_response;

    fn daq_replying(responses: &[Vec<u8>]) -> Daq<MemoryTransport> {
        let mut link = MemoryTransport::new();
        for response in responses {
            link.queue_response(response.clone());
        }
        Daq::new(link)
    }

    #[test]
    fn get_info_decodes_versions_and_id() {
        let mut daq = daq_replying(&[encode_response(
            id::GET_INFO,
            &[0x01, 0x66, 0x00, 0x00, 0x04, 0xD2],
        )]);
        let info = daq.get_info().unwrap();

        assert_eq!(
            info,
            DeviceInfo {
                hardware_version: 1,
                firmware_version: 102,
                device_id: 1234,
            }
        );
        assert_eq!(daq.get_ref().written(), &[0x00, 39, 39, 0]);
    }

    #[test]
    fn set_led_round_trip() {
        let mut daq = daq_replying(&[encode_response(id::SET_LED, &[2])]);
        assert_eq!(daq.set_led(LedColor::Red).unwrap(), LedColor::Red);
        assert_eq!(daq.get_ref().written(), &[0x00, 21, 18, 1, 2]);
    }

    #[test]
    fn set_dac_sends_millivolts() {
        let mut daq = daq_replying(&[encode_response(id::SET_DAC, &[0xFC, 0x18])]);
        assert_eq!(daq.set_dac(-1.0).unwrap(), -1000);
        assert_eq!(&daq.get_ref().written()[2..], &[13, 2, 0xFC, 0x18]);
    }

    #[test]
    fn dac_range_is_exclusive() {
        assert_eq!(dac_millivolts(4.095).unwrap(), 4095);
        assert_eq!(dac_millivolts(-4.095).unwrap(), -4095);
        assert_eq!(dac_millivolts(0.0012).unwrap(), 1);
        assert!(dac_millivolts(4.096).is_err());
        assert!(dac_millivolts(-4.096).is_err());
        assert!(dac_millivolts(f64::NAN).is_err());
    }

    #[test]
    fn out_of_range_arguments_send_nothing() {
        let mut daq = Daq::new(MemoryTransport::new());

        assert!(matches!(daq.set_dac(5.0), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.set_pio(0, true), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.set_pio_dir(7, true), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.create_stream(5, 100), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.create_stream(1, 0), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.destroy_channel(0), Err(DeviceError::InvalidArgument(_))));
        assert!(matches!(daq.load_signal(&[0; 256], 0), Err(DeviceError::InvalidArgument(_))));
        assert!(daq.get_ref().written().is_empty());
    }

    #[test]
    fn conf_channel_echo_is_typed() {
        let mut daq = daq_replying(&[encode_response(id::CONF_CHANNEL, &[1, 0, 8, 0, 1, 1])]);
        let config = ChannelConfig::new(1, ChannelMode::AnalogInput, 8);

        assert_eq!(daq.conf_channel(&config).unwrap(), config);
        assert_eq!(&daq.get_ref().written()[2..], &[22, 6, 1, 0, 8, 0, 1, 1]);
    }

    #[test]
    fn conf_channel_rejects_unknown_mode_echo() {
        let mut daq = daq_replying(&[encode_response(id::CONF_CHANNEL, &[1, 9, 8, 0, 1, 1])]);
        let err = daq
            .conf_channel(&ChannelConfig::new(1, ChannelMode::AnalogInput, 8))
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidResponse(_)));
    }

    #[test]
    fn load_signal_declares_sample_count() {
        let mut daq = daq_replying(&[encode_response(id::LOAD_SIGNAL, &[3, 0x00, 0x0A])]);
        let ack = daq.load_signal(&[100, -100, 0], 10).unwrap();

        assert_eq!(ack, SignalLoad { count: 3, offset: 10 });
        let written = daq.get_ref().written();
        assert_eq!(written[2], id::LOAD_SIGNAL);
        assert_eq!(written[3], 3);
        assert_eq!(written.len(), 4 + 2 + 6);
    }

    #[test]
    fn calibration_table_reads_every_slot() {
        let responses: Vec<Vec<u8>> = (0..CALIBRATION_SLOTS)
            .map(|slot| encode_response(id::GET_CALIB, &[slot, 0x03, 0xE8, 0xFF, 0xFE]))
            .collect();
        let mut daq = daq_replying(&responses);

        let table = daq.get_cal().unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(
            table[4],
            Calibration {
                gain_id: 4,
                gain: 1000,
                offset: -2,
            }
        );
        assert_eq!(daq.get_ref().writes(), 5);
    }

    #[test]
    fn set_cal_rejects_oversized_table() {
        let mut daq = Daq::new(MemoryTransport::new());
        let cal = Calibration {
            gain_id: 0,
            gain: 1,
            offset: 0,
        };
        assert!(daq.set_cal(&[cal; 6]).is_err());
    }

    #[test]
    fn get_stream_resumes_partial_frames() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[10, -10], &mut wire).unwrap();
        let (first, second) = wire.split_at(4);
        let mut daq = Daq::new(MemoryTransport::with_inbound(first));
        let (mut data, mut channels) = (Vec::new(), Vec::new());

        assert_eq!(daq.get_stream(&mut data, &mut channels).unwrap(), StreamStatus::Idle);
        assert!(daq.decoder().in_frame());

        daq.get_mut().feed(second);
        assert_eq!(daq.get_stream(&mut data, &mut channels).unwrap(), StreamStatus::Frame);
        assert_eq!(data, vec![10, -10]);
        assert_eq!(channels, vec![0]);
    }

    #[test]
    fn session_borrows_link() {
        let mut wire = BytesMut::new();
        encode_stream_frame(1, &[1, 2], &mut wire).unwrap();
        encode_stop_frame(1, &mut wire);
        let mut daq = Daq::new(MemoryTransport::with_inbound(&wire));

        {
            let mut session = daq.stream_session();
            session.poll_until_idle().unwrap();
            assert_eq!(session.channel_samples(1), vec![1, 2]);
            assert!(session.is_stopped(1));
        }
        assert_eq!(daq.get_ref().pending_inbound(), 0);
    }

    #[test]
    fn stop_streaming_drains_frames_then_ack() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[5], &mut wire).unwrap();
        encode_stream_frame(0, &[6], &mut wire).unwrap();
        let mut link = MemoryTransport::with_inbound(&wire);
        link.queue_response(encode_response(id::STOP, &[]));
        let mut daq = Daq::new(link);

        let frames = daq.stop_streaming().unwrap();
        let samples: Vec<i16> = frames.iter().flat_map(|f| f.samples.clone()).collect();
        assert_eq!(samples, vec![5, 6]);
        assert_eq!(daq.get_ref().pending_inbound(), 0);
        assert_eq!(&daq.get_ref().written()[2..], &[80, 0]);
    }

    #[test]
    fn flush_stream_skips_bad_checksum() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[5], &mut wire).unwrap();
        wire[1] ^= 0x01;
        encode_stream_frame(2, &[7], &mut wire).unwrap();
        wire.extend_from_slice(&encode_response(id::STOP, &[]));
        let mut daq = Daq::new(MemoryTransport::with_inbound(&wire));

        let frames = daq.flush_stream().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].channel(), 2);
    }

    #[test]
    fn flush_stream_short_ack_is_length_error() {
        let mut wire = BytesMut::new();
        encode_stream_frame(0, &[5], &mut wire).unwrap();
        wire.extend_from_slice(&[0x00, 0x50]);
        let mut daq = Daq::new(MemoryTransport::with_inbound(&wire));

        let err = daq.flush_stream().unwrap_err();
        assert!(matches!(err, DeviceError::Length { expected: 4, actual: 2 }));
    }

    #[test]
    fn flush_stream_on_quiet_link_returns_nothing() {
        let mut daq = Daq::new(MemoryTransport::new());
        assert!(daq.flush_stream().unwrap().is_empty());
    }

    #[test]
    fn flush_clears_input_and_decoder() {
        let mut daq = Daq::new(MemoryTransport::with_inbound(&[0x7E, 0x00]));
        let (mut data, mut channels) = (Vec::new(), Vec::new());
        daq.get_stream(&mut data, &mut channels).unwrap();
        assert!(daq.decoder().in_frame());

        daq.flush().unwrap();
        assert!(!daq.decoder().in_frame());
        assert_eq!(daq.get_ref().pending_inbound(), 0);
    }
}
