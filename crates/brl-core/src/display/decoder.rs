//! Protocol decoders: packets in, commands out.
//!
//! The current and legacy protocols share everything except how a packet
//! turns into key transitions, so both run through [`ChordDecoder`] and only
//! differ in their [`ChordRules::interpret`].  The HID protocol reports
//! single key transitions and has its own decoder in [`super::hid`].

use std::time::Duration;

use tracing::{debug, error};

use super::hid::HidDecoder;
use super::link::Link;
use super::{DisplayError, IDENTIFY_PROBES, IDENTIFY_TIMEOUT};
use crate::command::{Command, CommandCode};
use crate::domain::chord::{ChordEvent, KeyState};
use crate::domain::geometry::Geometry;
use crate::domain::model::DeviceModel;
use crate::keymap::bindings::help_page;
use crate::protocol::framer::{read_packet, CurrentRules, FrameRules, Framer, LegacyRules};
use crate::protocol::packets::{
    function_packet, identification, parameter_packet, CellConfiguration, CurrentPacket,
    FRONT_KEYS_PROG, FUNCTION_DISPLAY_PARAMETERS, FUNCTION_EXTENDED_STATUS, FUNCTION_IDENTIFY,
    PARAMETER_FRONT_KEYS,
};
use crate::protocol::variant::ProtocolVariant;
use crate::transport::Transport;

/// What one packet meant to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PacketEvent {
    /// The pressed-key mask changed; run the chord state machine.
    KeysChanged,
    CellsReconfigured(CellConfiguration),
    ParametersReconfigured(Option<u8>),
    Identified(u8),
    /// Nothing to do (already logged where relevant).
    Ignored,
}

/// Framing plus the packet → key-mask translation of one chorded protocol.
pub(crate) trait ChordRules: FrameRules + Default {
    fn interpret(packet: &[u8], keys: &mut KeyState, geometry: &Geometry) -> PacketEvent;
}

/// Looks up a model identifier reported by the display.
pub(crate) fn model_for(identifier: u8) -> Result<&'static DeviceModel, DisplayError> {
    DeviceModel::lookup(identifier).ok_or_else(|| {
        error!("detected unknown Alva model with ID {identifier:02X} (hex)");
        DisplayError::UnknownModel(identifier)
    })
}

/// Decoder for the protocols whose key packets carry press/release states
/// that combine into chords.
#[derive(Debug)]
pub(crate) struct ChordDecoder<R> {
    framer: Framer<R>,
    keys: KeyState,
}

impl<R: ChordRules> ChordDecoder<R> {
    pub fn new() -> Self {
        Self { framer: Framer::new(R::default()), keys: KeyState::default() }
    }

    /// Asks the display who it is.
    pub fn identify(
        &mut self,
        transport: &mut dyn Transport,
        write_delay: &mut Duration,
    ) -> Result<&'static DeviceModel, DisplayError> {
        let request = function_packet(FUNCTION_IDENTIFY);

        for probe in 1..=IDENTIFY_PROBES {
            debug!(probe, "requesting identification");
            transport.write_packet(&request, write_delay)?;

            while transport.await_input(IDENTIFY_TIMEOUT)? {
                let Some(packet) = read_packet(&mut self.framer, transport)? else {
                    continue;
                };
                if let Some(identifier) = identification(&packet) {
                    return model_for(identifier);
                }
            }
        }

        Err(DisplayError::NoResponse)
    }

    /// Queries the real geometry of configurable models and enables the
    /// display-parameter notices.
    pub fn configure(&mut self, link: &mut Link) -> Result<(), DisplayError> {
        if !link.model.is_configurable() {
            return Ok(());
        }

        link.write(&function_packet(FUNCTION_EXTENDED_STATUS))?;
        while link.transport.await_input(IDENTIFY_TIMEOUT)? {
            let Some(packet) = read_packet(&mut self.framer, link.transport.as_mut())? else {
                continue;
            };
            if let CurrentPacket::CellsReconfigured(configuration) = CurrentPacket::classify(&packet) {
                link.apply_cell_configuration(configuration, true);
                break;
            }
        }

        link.write(&function_packet(FUNCTION_DISPLAY_PARAMETERS))
    }

    /// Handles at most one packet.  `Ok(None)` means no command is ready.
    pub fn read_command(&mut self, link: &mut Link) -> Result<Option<Command>, DisplayError> {
        let Some(packet) = read_packet(&mut self.framer, link.transport.as_mut())? else {
            return Ok(None);
        };

        match R::interpret(&packet, &mut self.keys, &link.geometry) {
            PacketEvent::KeysChanged => Ok(Some(self.resolve_chord(link))),
            PacketEvent::CellsReconfigured(configuration) => {
                link.apply_cell_configuration(configuration, false);
                link.rewrite_required = true;
                Ok(None)
            }
            PacketEvent::ParametersReconfigured(Some(front_keys)) if front_keys & FRONT_KEYS_PROG != 0 => {
                let adjusted = front_keys & !FRONT_KEYS_PROG;
                debug!("front keys {front_keys:02X} -> {adjusted:02X}");
                link.write(&parameter_packet(PARAMETER_FRONT_KEYS, adjusted))?;
                Ok(None)
            }
            PacketEvent::ParametersReconfigured(_) | PacketEvent::Ignored => Ok(None),
            PacketEvent::Identified(identifier) => {
                let model = model_for(identifier)?;
                link.set_default_configuration(model);
                self.configure(link)?;
                link.resize_required = true;
                Ok(None)
            }
        }
    }

    fn resolve_chord(&mut self, link: &mut Link) -> Command {
        let page = help_page(link.geometry.help_page);
        let column = self.keys.routing_column;

        let command = match self.keys.update() {
            ChordEvent::Pressed(chord) => page
                .on_press(chord)
                .map_or(Command::NOOP, |binding| binding.resolve(column))
                .with_flags(Command::FLG_REPEAT_INITIAL | Command::FLG_REPEAT_DELAY),
            ChordEvent::Released(chord) => match page.on_release(chord) {
                Some(binding) => {
                    if binding.forces_rewrite() {
                        link.rewrite_required = true;
                    }
                    binding.resolve(column)
                }
                None => Command::NOOP,
            },
            ChordEvent::Unchanged => Command::NOOP,
        };

        if command.is(CommandCode::RestartBrl) {
            self.keys.reset();
        }
        command
    }

    pub fn reset_keys(&mut self) {
        self.keys.reset();
        self.framer.reset();
    }
}

/// The decoder matching the link's protocol variant.
#[derive(Debug)]
pub(crate) enum ProtocolDecoder {
    Current(ChordDecoder<CurrentRules>),
    Legacy(ChordDecoder<LegacyRules>),
    Hid(HidDecoder),
}

impl ProtocolDecoder {
    pub fn new(variant: ProtocolVariant) -> Self {
        match variant {
            ProtocolVariant::Current => ProtocolDecoder::Current(ChordDecoder::new()),
            ProtocolVariant::Legacy => ProtocolDecoder::Legacy(ChordDecoder::new()),
            ProtocolVariant::Hid => ProtocolDecoder::Hid(HidDecoder::new()),
        }
    }

    /// Determines the model.  HID displays never identify themselves, so
    /// their model must come from the USB channel.
    pub fn identify(
        &mut self,
        transport: &mut dyn Transport,
        write_delay: &mut Duration,
        fixed_model: Option<&'static DeviceModel>,
    ) -> Result<&'static DeviceModel, DisplayError> {
        if let Some(model) = fixed_model {
            return Ok(model);
        }
        match self {
            ProtocolDecoder::Current(decoder) => decoder.identify(transport, write_delay),
            ProtocolDecoder::Legacy(decoder) => decoder.identify(transport, write_delay),
            ProtocolDecoder::Hid(_) => Err(DisplayError::NoResponse),
        }
    }

    pub fn configure(&mut self, link: &mut Link) -> Result<(), DisplayError> {
        match self {
            ProtocolDecoder::Current(decoder) => decoder.configure(link),
            ProtocolDecoder::Legacy(decoder) => decoder.configure(link),
            ProtocolDecoder::Hid(decoder) => decoder.configure(link),
        }
    }

    pub fn read_command(&mut self, link: &mut Link) -> Result<Option<Command>, DisplayError> {
        match self {
            ProtocolDecoder::Current(decoder) => decoder.read_command(link),
            ProtocolDecoder::Legacy(decoder) => decoder.read_command(link),
            ProtocolDecoder::Hid(decoder) => decoder.read_command(link),
        }
    }

    pub fn reset_keys(&mut self) {
        match self {
            ProtocolDecoder::Current(decoder) => decoder.reset_keys(),
            ProtocolDecoder::Legacy(decoder) => decoder.reset_keys(),
            ProtocolDecoder::Hid(decoder) => decoder.reset_keys(),
        }
    }
}
