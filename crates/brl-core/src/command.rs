//! Command encoding shared with the command-consumption layer.
//!
//! A [`Command`] is a 32-bit value laid out as:
//!
//! ```text
//! [flags:8][block:8][argument:8]   (bits 23..16, 15..8, 7..0)
//! ```
//!
//! Simple commands ([`CommandCode`]) have a zero block byte.  Block
//! commands ([`BlockCommand`]) carry a base in the block byte and a column
//! index in the argument byte, so a routing key over column `n` produces
//! `BlockCommand::Route as u32 + n`.  This additive encoding is part of the
//! external contract and must not change.

use serde::{Deserialize, Serialize};

/// Commands that take no argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum CommandCode {
    Noop = 0x00,
    LnUp = 0x01,
    LnDn = 0x02,
    PrDifLn = 0x05,
    NxDifLn = 0x06,
    AttrUp = 0x07,
    AttrDn = 0x08,
    Top = 0x09,
    Bot = 0x0A,
    TopLeft = 0x0B,
    BotLeft = 0x0C,
    PrPgrph = 0x0D,
    NxPgrph = 0x0E,
    PrPrompt = 0x0F,
    NxPrompt = 0x10,
    PrSearch = 0x11,
    NxSearch = 0x12,
    ChrLt = 0x13,
    ChrRt = 0x14,
    HWinLt = 0x15,
    HWinRt = 0x16,
    FWinLt = 0x17,
    FWinRt = 0x18,
    FWinLtSkip = 0x19,
    FWinRtSkip = 0x1A,
    LnBeg = 0x1B,
    LnEnd = 0x1C,
    Home = 0x1D,
    Back = 0x1E,
    Return = 0x1F,
    Freeze = 0x20,
    DispMd = 0x21,
    SixDots = 0x22,
    SlideWin = 0x23,
    SkpIdLns = 0x24,
    SkpBlnkWins = 0x25,
    CsrVis = 0x26,
    CsrTrk = 0x28,
    CsrSize = 0x29,
    CsrBlink = 0x2A,
    AttrVis = 0x2B,
    CapBlink = 0x2D,
    AutoSpeak = 0x30,
    Help = 0x31,
    Info = 0x32,
    Learn = 0x33,
    PrefMenu = 0x34,
    SayLine = 0x3C,
    SayAbove = 0x3D,
    SayBelow = 0x3E,
    Mute = 0x3F,
    SpkHome = 0x40,
    SaySlower = 0x45,
    SayFaster = 0x46,
    SaySofter = 0x47,
    SayLouder = 0x48,
    CsrJmpVert = 0x4D,
    Paste = 0x4E,
    RestartBrl = 0x4F,
    RestartSpeech = 0x50,
}

/// Commands whose low byte is a column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum BlockCommand {
    Route = 0x0100,
    CutBegin = 0x0200,
    CutAppend = 0x0300,
    CutRect = 0x0400,
    CutLine = 0x0500,
    PrIndent = 0x0700,
    NxIndent = 0x0800,
    DescChar = 0x0900,
    SetLeft = 0x0A00,
    SetMark = 0x0B00,
    GotoMark = 0x0C00,
    PrDifChar = 0x0E00,
    NxDifChar = 0x0F00,
}

impl BlockCommand {
    const ALL: [BlockCommand; 13] = [
        BlockCommand::Route,
        BlockCommand::CutBegin,
        BlockCommand::CutAppend,
        BlockCommand::CutRect,
        BlockCommand::CutLine,
        BlockCommand::PrIndent,
        BlockCommand::NxIndent,
        BlockCommand::DescChar,
        BlockCommand::SetLeft,
        BlockCommand::SetMark,
        BlockCommand::GotoMark,
        BlockCommand::PrDifChar,
        BlockCommand::NxDifChar,
    ];

    /// Returns the block command whose base equals `base`, if any.
    pub fn from_base(base: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|block| *block as u32 == base)
    }
}

/// An encoded command as delivered to the command-consumption layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command(pub u32);

impl Command {
    /// The command may auto-repeat after the initial delay.
    pub const FLG_REPEAT_DELAY: u32 = 0x40_0000;
    /// The command should be issued once immediately before repeating.
    pub const FLG_REPEAT_INITIAL: u32 = 0x80_0000;

    const FLAGS_MASK: u32 = 0xFF_0000;
    const BLOCK_MASK: u32 = 0x00_FF00;
    const ARGUMENT_MASK: u32 = 0x00_00FF;

    pub const NOOP: Command = Command(CommandCode::Noop as u32);
    pub const RESTART_BRL: Command = Command(CommandCode::RestartBrl as u32);
    pub const RESTART_SPEECH: Command = Command(CommandCode::RestartSpeech as u32);

    /// Encodes an argument-less command.
    pub const fn simple(code: CommandCode) -> Self {
        Self(code as u32)
    }

    /// Encodes a block command aimed at `column`.
    pub const fn block(block: BlockCommand, column: u8) -> Self {
        Self(block as u32 + column as u32)
    }

    /// Returns this command with `flags` OR-ed in.
    #[must_use]
    pub const fn with_flags(self, flags: u32) -> Self {
        Self(self.0 | (flags & Self::FLAGS_MASK))
    }

    /// The flag bits (`FLG_*`).
    pub const fn flags(self) -> u32 {
        self.0 & Self::FLAGS_MASK
    }

    /// The command with every flag bit cleared.
    #[must_use]
    pub const fn without_flags(self) -> Self {
        Self(self.0 & !Self::FLAGS_MASK)
    }

    /// The block command this value belongs to, or `None` for simple commands.
    pub fn block_command(self) -> Option<BlockCommand> {
        match self.0 & Self::BLOCK_MASK {
            0 => None,
            base => BlockCommand::from_base(base),
        }
    }

    /// The argument byte (the column index for block commands).
    pub const fn argument(self) -> u8 {
        (self.0 & Self::ARGUMENT_MASK) as u8
    }

    /// `true` when the command (ignoring flags) equals `code`.
    pub fn is(self, code: CommandCode) -> bool {
        self.without_flags().0 == code as u32
    }
}

impl From<CommandCode> for Command {
    fn from(code: CommandCode) -> Self {
        Self::simple(code)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
