use std::fmt;

/// Errors surfaced by the emulation core.
///
/// Everything here is fatal to the stepping loop: the console stops and the
/// host observes the error instead of a silently corrupted framebuffer. The
/// one deliberate exception is genuinely-open-bus address space, which reads
/// as zero and never errors.
#[derive(Debug)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte iNES header.
    TooShort { actual: usize },
    /// Magic number ("NES<EOF>") is missing; the file is not an iNES image.
    InvalidFormat,
    /// A ROM section (trainer/PRG/CHR) is shorter than the header advertises.
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The cartridge requests a mapper the core has no implementation for.
    UnsupportedMapper { mapper: u16 },
    /// The CPU fetched one of the genuinely-undefined 6502 opcodes.
    IllegalOpcode { opcode: u8, pc: u16 },
    /// A bus access fell through every decode branch. Indicates a core or
    /// mapper bug rather than anything a game can cause.
    InvalidAddress { addr: u16 },
    /// A CHR write was attempted against a CHR-ROM cartridge.
    ReadOnlyMemory { addr: u16 },
    /// An operation that needs a cartridge ran without one inserted.
    NoCartridge,
    /// A save-state snapshot does not match the loaded cartridge/board.
    StateMismatch,
    /// Wrapper for I/O errors raised while reading ROMs from disk.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => {
                write!(f, "header expected 16 bytes, got {actual}")
            }
            Self::InvalidFormat => write!(f, "missing NES magic bytes"),
            Self::SectionTooShort {
                section,
                expected,
                actual,
            } => write!(
                f,
                "{section} section expected {expected} bytes, got {actual}"
            ),
            Self::UnsupportedMapper { mapper } => {
                write!(f, "mapper {mapper} is not supported")
            }
            Self::IllegalOpcode { opcode, pc } => {
                write!(f, "illegal opcode {opcode:#04X} fetched at {pc:#06X}")
            }
            Self::InvalidAddress { addr } => {
                write!(f, "bus access to undecoded address {addr:#06X}")
            }
            Self::ReadOnlyMemory { addr } => {
                write!(f, "write to CHR ROM at {addr:#06X}")
            }
            Self::NoCartridge => write!(f, "no cartridge inserted"),
            Self::StateMismatch => {
                write!(f, "save state does not match the loaded cartridge")
            }
            Self::Io(err) => write!(f, "i/o error while reading cartridge: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
