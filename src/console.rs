use crate::consts::{CONSOLE_MAX_FIELDS, CONSOLE_MAX_LINE_LENGTH};
use crate::types::DmxAddress;

pub const ERROR_MESSAGE: &str = "\r\nError. Type 'help'.\r\n";
pub const READY_MESSAGE: &str = "\r\nReady.\r\n";
pub const NO_DEVICE_MESSAGE: &str = "\r\nNo Device Found.\r\n";
pub const DEVICE_LIMIT_MESSAGE: &str = "\r\nDevice limit reached.\r\n";
pub const WELCOME_MESSAGE: &str = "\r\nWelcome.\r\nFor cmd type 'help'.\r\n";
pub const HELP_MESSAGE: &str = "\r\nCmds are case insensitive.\r\nAdr:1 to 512; data:0 to 255\r\n---------------------------\r\nset Adr data\r\nget Adr\r\nmax Adr\r\non\r\noff\r\npoll\r\nclear\r\n";

const BACKSPACE: u8 = 0x08;
const CARRIAGE_RETURN: u8 = b'\r';

/// One complete console line, lower case.
pub type ConsoleLine = heapless::String<CONSOLE_MAX_LINE_LENGTH>;

/// Reasons for rejecting a console line. All of them are answered with [ERROR_MESSAGE].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    /// A letter directly follows a digit or the other way around.
    InvalidSequence,
    /// The line has more fields than any command takes.
    TooManyFields,
    /// The first field isn't a known command.
    UnknownCommand,
    /// The command is known but got the wrong amount of arguments.
    WrongArgumentCount,
    /// An argument isn't a number.
    NotANumber,
    /// A numeric argument is out of range.
    OutOfRange,
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let error_message = match self {
            ConsoleError::InvalidSequence => "letters and digits have to be separated",
            ConsoleError::TooManyFields => "too many fields",
            ConsoleError::UnknownCommand => "unknown command",
            ConsoleError::WrongArgumentCount => "wrong amount of arguments",
            ConsoleError::NotANumber => "argument is not a number",
            ConsoleError::OutOfRange => "argument out of range",
        };

        write!(f, "{}", error_message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConsoleError {}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Set the value of a channel.
    Set { address: DmxAddress, value: u8 },
    /// Print the value of a channel.
    Get(DmxAddress),
    /// Stream only the channels up to this address.
    Max(DmxAddress),
    /// Start streaming.
    On,
    /// Stop streaming.
    Off,
    /// Run a discovery after the current frame.
    Poll,
    /// Set all channels to zero.
    Clear,
    Help,
}

/// Collects received characters into lines.
#[derive(Debug, Default)]
pub struct LineEditor {
    line: ConsoleLine,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received character. Returns the line once it was terminated by a carriage
    /// return or reached the maximum length.
    pub fn push(&mut self, byte: u8) -> Option<ConsoleLine> {
        match byte {
            BACKSPACE => {
                self.line.pop();
            },
            CARRIAGE_RETURN => return Some(core::mem::take(&mut self.line)),
            32..=126 => {
                // can't fail, a full line is handed out right away
                let _ = self.line.push(byte.to_ascii_lowercase() as char);
                if self.line.len() == CONSOLE_MAX_LINE_LENGTH {
                    return Some(core::mem::take(&mut self.line));
                }
            },
            _ => {},
        }

        None
    }

    /// The characters of the unfinished line.
    pub fn pending(&self) -> &str {
        &self.line
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum FieldKind {
    Alphabetic,
    Numeric,
}

#[derive(Debug, Copy, Clone)]
struct Field<'a> {
    kind: FieldKind,
    text: &'a str,
}

fn tokenize(line: &str) -> Result<heapless::Vec<Field<'_>, CONSOLE_MAX_FIELDS>, ConsoleError> {
    let mut fields = heapless::Vec::new();
    let mut current: Option<(FieldKind, usize)> = None;

    for (position, character) in line.char_indices() {
        let kind = if character.is_ascii_alphabetic() {
            FieldKind::Alphabetic
        } else if character.is_ascii_digit() {
            FieldKind::Numeric
        } else {
            if let Some((kind, start)) = current.take() {
                fields
                    .push(Field {
                        kind,
                        text: &line[start..position],
                    })
                    .or(Err(ConsoleError::TooManyFields))?;
            }
            continue;
        };

        match current {
            None => current = Some((kind, position)),
            Some((current_kind, _)) if current_kind != kind => {
                return Err(ConsoleError::InvalidSequence);
            },
            Some(_) => {},
        }
    }

    if let Some((kind, start)) = current {
        fields
            .push(Field {
                kind,
                text: &line[start..],
            })
            .or(Err(ConsoleError::TooManyFields))?;
    }

    Ok(fields)
}

fn parse_number(field: &Field, max: u32) -> Result<u32, ConsoleError> {
    if field.kind != FieldKind::Numeric {
        return Err(ConsoleError::NotANumber);
    }

    let number: u32 = field.text.parse().or(Err(ConsoleError::OutOfRange))?;
    if number > max {
        return Err(ConsoleError::OutOfRange);
    }

    Ok(number)
}

fn parse_address(field: &Field) -> Result<DmxAddress, ConsoleError> {
    let number = parse_number(field, u16::MAX as u32)?;

    DmxAddress::new(number as u16).or(Err(ConsoleError::OutOfRange))
}

/// Parses one console line.
///
/// Fields are runs of letters or runs of digits, everything else separates them. The
/// command has to match the whole first field and take exactly the given arguments.
pub fn parse_command(line: &str) -> Result<Command, ConsoleError> {
    let fields = tokenize(line)?;

    let verb = match fields.first() {
        Some(field) if field.kind == FieldKind::Alphabetic => field.text,
        _ => return Err(ConsoleError::UnknownCommand),
    };

    let argument_count = match verb {
        "set" => 2,
        "get" | "max" => 1,
        "on" | "off" | "poll" | "clear" | "help" => 0,
        _ => return Err(ConsoleError::UnknownCommand),
    };

    if fields.len() != argument_count + 1 {
        return Err(ConsoleError::WrongArgumentCount);
    }

    Ok(match verb {
        "set" => Command::Set {
            address: parse_address(&fields[1])?,
            value: parse_number(&fields[2], u8::MAX as u32)? as u8,
        },
        "get" => Command::Get(parse_address(&fields[1])?),
        "max" => Command::Max(parse_address(&fields[1])?),
        "on" => Command::On,
        "off" => Command::Off,
        "poll" => Command::Poll,
        "clear" => Command::Clear,
        _ => Command::Help,
    })
}
