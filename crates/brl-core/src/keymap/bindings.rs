//! Chord → command tables ("help pages").
//!
//! Each [`DeviceModel`](crate::DeviceModel) names the help page its front
//! panel uses:
//!
//! | Page | Models                      | Tables used                          |
//! |------|-----------------------------|--------------------------------------|
//! | 0    | ABT 3xx, Delphi             | press, release                       |
//! | 1    | Satellite, Braille System   | press, release                       |
//! | 2    | BC640, BC680 (HID)          | operating keys, routing rows         |
//!
//! On pages 0 and 1 the routing rows are ordinary keys (`Routing1`,
//! `Routing2`) inside the chord and the column comes from the last routing
//! press.  On page 2 the routing key is not part of the chord; the chord
//! held at that moment selects the block command from a routing table.

use super::{Key, KeyMask};
use crate::command::{BlockCommand, Command, CommandCode};

/// What a bound chord produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Command(CommandCode),
    /// A command that also forces the whole display to be rewritten.
    CommandWithRewrite(CommandCode),
    /// A block command completed with the routing column.
    Block(BlockCommand),
}

impl Binding {
    /// Encodes the binding, using `column` for block commands.
    pub fn resolve(self, column: u8) -> Command {
        match self {
            Binding::Command(code) | Binding::CommandWithRewrite(code) => Command::simple(code),
            Binding::Block(block) => Command::block(block, column),
        }
    }

    pub fn forces_rewrite(self) -> bool {
        matches!(self, Binding::CommandWithRewrite(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub chord: KeyMask,
    pub binding: Binding,
}

const fn cmd(keys: &[Key], code: CommandCode) -> KeyBinding {
    KeyBinding { chord: KeyMask::of(keys), binding: Binding::Command(code) }
}

const fn blk(keys: &[Key], block: BlockCommand) -> KeyBinding {
    KeyBinding { chord: KeyMask::of(keys), binding: Binding::Block(block) }
}

/// The command tables of one help page.
#[derive(Debug)]
pub struct HelpPage {
    pub number: u8,
    press: &'static [KeyBinding],
    release: &'static [KeyBinding],
    primary_routing: &'static [KeyBinding],
    secondary_routing: &'static [KeyBinding],
}

impl HelpPage {
    /// Binding for a chord that just reached a new maximum.
    pub fn on_press(&self, chord: KeyMask) -> Option<Binding> {
        find(self.press, chord)
    }

    /// Binding for a chord whose keys are being let go.
    pub fn on_release(&self, chord: KeyMask) -> Option<Binding> {
        find(self.release, chord)
    }

    /// Binding for a routing key pressed while `chord` is held (page 2).
    pub fn on_routing(&self, chord: KeyMask, secondary: bool) -> Option<Binding> {
        let table = if secondary { self.secondary_routing } else { self.primary_routing };
        find(table, chord)
    }

    pub(crate) fn tables(&self) -> [&'static [KeyBinding]; 4] {
        [self.press, self.release, self.primary_routing, self.secondary_routing]
    }
}

fn find(table: &[KeyBinding], chord: KeyMask) -> Option<Binding> {
    table.iter().find(|entry| entry.chord == chord).map(|entry| entry.binding)
}

/// Returns the help page with the given number; unknown numbers fall back
/// to page 0.
pub fn help_page(number: u8) -> &'static HelpPage {
    match number {
        1 => &PAGE_1,
        2 => &PAGE_2,
        _ => &PAGE_0,
    }
}

use BlockCommand as B;
use CommandCode as C;
use Key as K;

// ── Page 0: ABT and Delphi ────────────────────────────────────────────────────

// PROG+HOME+ROUTING1 and HOME+CURSOR+ROUTING1 are bound on release only.
// Some units send a bogus routing press before the real one when two front
// keys are held; resolving these on release lets the real column win.
static PAGE_0_PRESS: [KeyBinding; 34] = [
    cmd(&[K::Home, K::Up], C::Top),
    cmd(&[K::Home, K::Down], C::Bot),
    cmd(&[K::Up], C::LnUp),
    cmd(&[K::Cursor, K::Up], C::AttrUp),
    cmd(&[K::Down], C::LnDn),
    cmd(&[K::Cursor, K::Down], C::AttrDn),
    cmd(&[K::Left], C::FWinLt),
    cmd(&[K::Home, K::Left], C::LnBeg),
    cmd(&[K::Cursor, K::Left], C::HWinLt),
    cmd(&[K::Prog, K::Left], C::ChrLt),
    cmd(&[K::Right], C::FWinRt),
    cmd(&[K::Home, K::Right], C::LnEnd),
    cmd(&[K::Prog, K::Right], C::ChrRt),
    cmd(&[K::Cursor, K::Right], C::HWinRt),
    cmd(&[K::Home, K::Cursor, K::Up], C::PrDifLn),
    cmd(&[K::Home, K::Cursor, K::Down], C::NxDifLn),
    cmd(&[K::Home, K::Cursor, K::Left], C::Mute),
    cmd(&[K::Home, K::Cursor, K::Right], C::SayLine),
    cmd(&[K::Prog, K::Down], C::Freeze),
    cmd(&[K::Prog, K::Up], C::Info),
    cmd(&[K::Prog, K::Cursor, K::Left], C::Back),
    cmd(&[K::Status1A], C::CapBlink),
    cmd(&[K::Status1B], C::CsrVis),
    cmd(&[K::Status1C], C::CsrBlink),
    cmd(&[K::Cursor, K::Status1A], C::SixDots),
    cmd(&[K::Cursor, K::Status1B], C::CsrSize),
    cmd(&[K::Cursor, K::Status1C], C::SlideWin),
    cmd(&[K::Prog, K::Home, K::Up], C::PrPrompt),
    cmd(&[K::Prog, K::Home, K::Left], C::RestartSpeech),
    cmd(&[K::Prog, K::Home, K::Right], C::SayBelow),
    blk(&[K::Routing1], B::Route),
    blk(&[K::Prog, K::Routing1], B::CutBegin),
    blk(&[K::Home, K::Routing1], B::CutRect),
    cmd(&[K::Prog, K::Home, K::Down], C::Paste),
];

static PAGE_0_RELEASE: [KeyBinding; 8] = [
    cmd(&[K::Home], C::TopLeft),
    KeyBinding { chord: KeyMask::of(&[K::Cursor]), binding: Binding::CommandWithRewrite(C::Return) },
    cmd(&[K::Prog], C::Help),
    cmd(&[K::Prog, K::Home], C::DispMd),
    cmd(&[K::Home, K::Cursor], C::CsrTrk),
    cmd(&[K::Prog, K::Cursor], C::PrefMenu),
    blk(&[K::Prog, K::Home, K::Routing1], B::DescChar),
    blk(&[K::Home, K::Cursor, K::Routing1], B::SetLeft),
];

// ── Page 1: Satellite and Braille System ──────────────────────────────────────

static PAGE_1_PRESS: [KeyBinding; 60] = [
    cmd(&[K::Up], C::LnUp),
    cmd(&[K::Down], C::LnDn),
    cmd(&[K::Home, K::Up], C::TopLeft),
    cmd(&[K::Home, K::Down], C::BotLeft),
    cmd(&[K::Cursor, K::Up], C::Top),
    cmd(&[K::Cursor, K::Down], C::Bot),
    cmd(&[K::BrailleF1, K::Up], C::PrDifLn),
    cmd(&[K::BrailleF1, K::Down], C::NxDifLn),
    cmd(&[K::BrailleF2, K::Up], C::AttrUp),
    cmd(&[K::BrailleF2, K::Down], C::AttrDn),
    cmd(&[K::Left], C::FWinLt),
    cmd(&[K::Right], C::FWinRt),
    cmd(&[K::Tumbler2A], C::LnBeg),
    cmd(&[K::Home, K::Left], C::LnBeg),
    cmd(&[K::Tumbler2B], C::LnEnd),
    cmd(&[K::Home, K::Right], C::LnEnd),
    cmd(&[K::Cursor, K::Left], C::FWinLtSkip),
    cmd(&[K::Cursor, K::Right], C::FWinRtSkip),
    cmd(&[K::Tumbler1A], C::ChrLt),
    cmd(&[K::BrailleF1, K::Left], C::ChrLt),
    cmd(&[K::Tumbler1B], C::ChrRt),
    cmd(&[K::BrailleF1, K::Right], C::ChrRt),
    cmd(&[K::BrailleF2, K::Left], C::HWinLt),
    cmd(&[K::BrailleF2, K::Right], C::HWinRt),
    blk(&[K::Routing2], B::DescChar),
    blk(&[K::Routing1], B::Route),
    blk(&[K::BrailleF1, K::Routing2], B::CutAppend),
    blk(&[K::BrailleF1, K::Routing1], B::CutBegin),
    blk(&[K::BrailleF2, K::Routing2], B::CutLine),
    blk(&[K::BrailleF2, K::Routing1], B::CutRect),
    blk(&[K::Home, K::Routing2], B::SetMark),
    blk(&[K::Home, K::Routing1], B::GotoMark),
    blk(&[K::Cursor, K::Routing2], B::PrIndent),
    blk(&[K::Cursor, K::Routing1], B::NxIndent),
    cmd(&[K::Status1A], C::CsrVis),
    cmd(&[K::Status2A], C::SkpIdLns),
    cmd(&[K::Status1B], C::AttrVis),
    cmd(&[K::Status2B], C::DispMd),
    cmd(&[K::Status1C], C::CapBlink),
    cmd(&[K::Status2C], C::SkpBlnkWins),
    cmd(&[K::BrailleLeft], C::PrefMenu),
    cmd(&[K::BrailleRight], C::Info),
    cmd(&[K::BrailleF1, K::BrailleLeft], C::Freeze),
    cmd(&[K::BrailleF1, K::BrailleRight], C::SixDots),
    cmd(&[K::BrailleF2, K::BrailleLeft], C::Paste),
    cmd(&[K::BrailleF2, K::BrailleRight], C::CsrJmpVert),
    cmd(&[K::BrailleUp], C::PrPrompt),
    cmd(&[K::BrailleDown], C::NxPrompt),
    cmd(&[K::BrailleF1, K::BrailleUp], C::PrPgrph),
    cmd(&[K::BrailleF1, K::BrailleDown], C::NxPgrph),
    cmd(&[K::BrailleF2, K::BrailleUp], C::PrSearch),
    cmd(&[K::BrailleF2, K::BrailleDown], C::NxSearch),
    cmd(&[K::SpeechLeft], C::Mute),
    cmd(&[K::SpeechRight], C::SayLine),
    cmd(&[K::SpeechUp], C::SayAbove),
    cmd(&[K::SpeechDown], C::SayBelow),
    cmd(&[K::SpeechF2, K::SpeechLeft], C::SaySlower),
    cmd(&[K::SpeechF2, K::SpeechRight], C::SayFaster),
    cmd(&[K::SpeechF2, K::SpeechDown], C::SaySofter),
    cmd(&[K::SpeechF2, K::SpeechUp], C::SayLouder),
];

static PAGE_1_RELEASE: [KeyBinding; 9] = [
    cmd(&[K::Home], C::Back),
    cmd(&[K::Cursor], C::Home),
    cmd(&[K::Home, K::Cursor], C::CsrTrk),
    cmd(&[K::BrailleF1], C::Help),
    cmd(&[K::BrailleF2], C::Learn),
    cmd(&[K::BrailleF1, K::BrailleF2], C::RestartBrl),
    cmd(&[K::SpeechF1], C::SpkHome),
    cmd(&[K::SpeechF2], C::AutoSpeak),
    cmd(&[K::SpeechF1, K::SpeechF2], C::RestartSpeech),
];

// ── Page 2: BC640 / BC680 ─────────────────────────────────────────────────────

static PAGE_2_OPERATING: [KeyBinding; 42] = [
    cmd(&[K::SmartpadF1], C::Help),
    cmd(&[K::SmartpadF2], C::Learn),
    cmd(&[K::SmartpadF3], C::Info),
    cmd(&[K::SmartpadF4], C::PrefMenu),
    cmd(&[K::SmartpadLeft], C::SixDots),
    cmd(&[K::SmartpadRight], C::CsrTrk),
    cmd(&[K::SmartpadUp], C::Freeze),
    cmd(&[K::SmartpadDown], C::DispMd),
    cmd(&[K::SmartpadEnter], C::Paste),
    cmd(&[K::Thumb3], C::Home),
    cmd(&[K::Thumb2], C::LnUp),
    cmd(&[K::Thumb4], C::LnDn),
    cmd(&[K::Thumb1], C::FWinLt),
    cmd(&[K::Thumb5], C::FWinRt),
    cmd(&[K::Thumb3, K::Thumb2], C::PrDifLn),
    cmd(&[K::Thumb3, K::Thumb4], C::NxDifLn),
    cmd(&[K::Thumb3, K::Thumb1], C::FWinLtSkip),
    cmd(&[K::Thumb3, K::Thumb5], C::FWinRtSkip),
    cmd(&[K::SmartpadF1, K::Thumb3], C::Back),
    cmd(&[K::SmartpadF1, K::Thumb2], C::AttrUp),
    cmd(&[K::SmartpadF1, K::Thumb4], C::AttrDn),
    cmd(&[K::SmartpadF1, K::Thumb1], C::TopLeft),
    cmd(&[K::SmartpadF1, K::Thumb5], C::BotLeft),
    cmd(&[K::SmartpadF4, K::Thumb3], C::CsrJmpVert),
    cmd(&[K::SmartpadF4, K::Thumb2], C::PrPgrph),
    cmd(&[K::SmartpadF4, K::Thumb4], C::NxPgrph),
    cmd(&[K::SmartpadF4, K::Thumb1], C::PrPrompt),
    cmd(&[K::SmartpadF4, K::Thumb5], C::NxPrompt),
    cmd(&[K::ETouch1], C::LnBeg),
    cmd(&[K::ETouch2], C::ChrLt),
    cmd(&[K::ETouch3], C::LnEnd),
    cmd(&[K::ETouch4], C::ChrRt),
    cmd(&[K::SmartpadF1, K::SmartpadLeft], C::SaySlower),
    cmd(&[K::SmartpadF1, K::SmartpadRight], C::SayFaster),
    cmd(&[K::SmartpadF1, K::SmartpadDown], C::SaySofter),
    cmd(&[K::SmartpadF1, K::SmartpadUp], C::SayLouder),
    cmd(&[K::SmartpadF1, K::SmartpadEnter], C::AutoSpeak),
    cmd(&[K::SmartpadF4, K::SmartpadLeft], C::Mute),
    cmd(&[K::SmartpadF4, K::SmartpadRight], C::SayLine),
    cmd(&[K::SmartpadF4, K::SmartpadUp], C::SayAbove),
    cmd(&[K::SmartpadF4, K::SmartpadDown], C::SayBelow),
    cmd(&[K::SmartpadF4, K::SmartpadEnter], C::SpkHome),
];

static PAGE_2_PRIMARY_ROUTING: [KeyBinding; 10] = [
    blk(&[], B::Route),
    blk(&[K::SmartpadF1], B::CutBegin),
    blk(&[K::SmartpadF2], B::CutAppend),
    blk(&[K::SmartpadF3], B::CutLine),
    blk(&[K::SmartpadF4], B::CutRect),
    blk(&[K::SmartpadLeft], B::PrIndent),
    blk(&[K::SmartpadRight], B::NxIndent),
    blk(&[K::SmartpadUp], B::PrDifChar),
    blk(&[K::SmartpadDown], B::NxDifChar),
    blk(&[K::SmartpadEnter], B::SetLeft),
];

static PAGE_2_SECONDARY_ROUTING: [KeyBinding; 1] = [blk(&[], B::DescChar)];

static PAGE_0: HelpPage = HelpPage {
    number: 0,
    press: &PAGE_0_PRESS,
    release: &PAGE_0_RELEASE,
    primary_routing: &[],
    secondary_routing: &[],
};

static PAGE_1: HelpPage = HelpPage {
    number: 1,
    press: &PAGE_1_PRESS,
    release: &PAGE_1_RELEASE,
    primary_routing: &[],
    secondary_routing: &[],
};

static PAGE_2: HelpPage = HelpPage {
    number: 2,
    press: &PAGE_2_OPERATING,
    release: &PAGE_2_OPERATING,
    primary_routing: &PAGE_2_PRIMARY_ROUTING,
    secondary_routing: &PAGE_2_SECONDARY_ROUTING,
};

// ── Tests ─────────────────────────────────────────────────────────────────────
