//! BC6xx HID decoder.
//!
//! Each input report carries a single key transition.  The decoder keeps
//! the set of held keys (`pressed`) and the chord that is still eligible to
//! fire (`active`): a press makes the whole held set eligible, and the
//! first release (or a routing press) consumes it.

use tracing::warn;

use super::link::Link;
use super::DisplayError;
use crate::command::Command;
use crate::keymap::bindings::help_page;
use crate::keymap::raw::hid_key;
use crate::keymap::{Key, KeyMask};
use crate::protocol::framer::{read_packet, Framer, HidRules};
use crate::protocol::packets::{
    hid_columns, HidReport, FEATURE_CONFIGURATION, HID_GROUP_ROUTING, HID_GROUP_SYSTEM,
    HID_KEY_RECONFIGURED, HID_ROUTING_SECONDARY,
};

/// Size of the buffer for feature report 5.
const FEATURE_REPORT_SIZE: usize = 0x20;

#[derive(Debug)]
pub(crate) struct HidDecoder {
    framer: Framer<HidRules>,
    pressed: KeyMask,
    active: KeyMask,
}

impl HidDecoder {
    pub fn new() -> Self {
        Self { framer: Framer::new(HidRules), pressed: KeyMask::EMPTY, active: KeyMask::EMPTY }
    }

    /// Reads the text column count from feature report 5.
    pub fn configure(&mut self, link: &mut Link) -> Result<(), DisplayError> {
        self.read_configuration(link, true)
    }

    fn read_configuration(&mut self, link: &mut Link, autodetecting: bool) -> Result<(), DisplayError> {
        let mut report = [0u8; FEATURE_REPORT_SIZE];
        report[0] = FEATURE_CONFIGURATION;
        let length = link.transport.get_feature_report(FEATURE_CONFIGURATION, &mut report)?;

        let status_cells = link.geometry.status_cells;
        match hid_columns(&report[..length]) {
            Some(columns) => link.update_configuration(autodetecting, columns, status_cells),
            None => warn!(length, "short configuration report"),
        }
        Ok(())
    }

    /// Reads reports until one yields a command or the input runs dry.
    pub fn read_command(&mut self, link: &mut Link) -> Result<Option<Command>, DisplayError> {
        loop {
            let Some(packet) = read_packet(&mut self.framer, link.transport.as_mut())? else {
                return Ok(None);
            };
            let Some(report) = HidReport::parse(&packet) else {
                continue;
            };

            if report.group == HID_GROUP_SYSTEM && report.key == HID_KEY_RECONFIGURED {
                self.read_configuration(link, false)?;
                continue;
            }

            if let Some(key) = hid_key(report.group, report.key) {
                return Ok(self.operating_key(link, key, report.release));
            }

            if report.group == HID_GROUP_ROUTING {
                let secondary = report.key & HID_ROUTING_SECONDARY != 0;
                let column = report.key & !HID_ROUTING_SECONDARY;
                if column < link.geometry.text_columns {
                    return Ok(self.routing_key(link, column, secondary, report.release));
                }
            }

            warn!("unknown key: group={:02X} key={:02X}", report.group, report.key);
        }
    }

    fn operating_key(&mut self, link: &Link, key: Key, release: bool) -> Option<Command> {
        let page = help_page(link.geometry.help_page);

        if release {
            let command = page.on_release(self.active).map(|binding| binding.resolve(0));
            self.pressed.remove(key);
            self.active = KeyMask::EMPTY;
            command
        } else {
            self.pressed.insert(key);
            self.active = self.pressed;
            Some(match page.on_press(self.active) {
                Some(binding) => binding.resolve(0).with_flags(Command::FLG_REPEAT_DELAY),
                None => Command::NOOP,
            })
        }
    }

    fn routing_key(&mut self, link: &Link, column: u8, secondary: bool, release: bool) -> Option<Command> {
        let command = if release {
            None
        } else {
            let page = help_page(link.geometry.help_page);
            Some(
                page.on_routing(self.active, secondary)
                    .map_or(Command::NOOP, |binding| binding.resolve(column)),
            )
        };
        self.active = KeyMask::EMPTY;
        command
    }

    pub fn reset_keys(&mut self) {
        self.pressed = KeyMask::EMPTY;
        self.active = KeyMask::EMPTY;
        self.framer.reset();
    }
}
