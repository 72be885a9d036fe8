//! Command arguments.
//!
//! The capture command takes a small flag table:
//!
//! | Flag | Long form | Value | Default |
//! |---|---|---|---|
//! | `-f` | `-filename` | string (required) | |
//! | `-sf` | `-startFrame` | time | `0` |
//! | `-ef` | `-endFrame` | time | `1` |
//! | `-is` | `-imageSize` | two unsigned integers | no override |
//! | `-uo` | `-useOIIO` | boolean | `false` (native writer) |
//!
//! [`CommandArguments::parse`] turns command tokens into named arguments and
//! [`CommandArguments::resolve`] validates them into a [`CaptureConfig`].
//! Resolution has no side effects; the only hard failure is a missing
//! filename.

use crate::configuration::{CaptureConfig, WriterBackend};
use crate::error::PlayblastError;
use crate::time::{MAX_FRAME_SPAN, Time};

/// Value shape a flag accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    /// One string value.
    String,
    /// One time value.
    Time,
    /// Two unsigned integers.
    UnsignedPair,
    /// An optional boolean value; a bare flag means `true`.
    Boolean,
}

/// One entry of the command syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Short form, e.g. `-f`.
    pub short: &'static str,
    /// Long form, e.g. `-filename`.
    pub long: &'static str,
    /// Value shape.
    pub kind: ArgumentKind,
}

/// `-f` / `-filename`.
pub const FILENAME_FLAG: FlagSpec = FlagSpec {
    short: "-f",
    long: "-filename",
    kind: ArgumentKind::String,
};

/// `-sf` / `-startFrame`.
pub const START_FRAME_FLAG: FlagSpec = FlagSpec {
    short: "-sf",
    long: "-startFrame",
    kind: ArgumentKind::Time,
};

/// `-ef` / `-endFrame`.
pub const END_FRAME_FLAG: FlagSpec = FlagSpec {
    short: "-ef",
    long: "-endFrame",
    kind: ArgumentKind::Time,
};

/// `-is` / `-imageSize`.
pub const IMAGE_SIZE_FLAG: FlagSpec = FlagSpec {
    short: "-is",
    long: "-imageSize",
    kind: ArgumentKind::UnsignedPair,
};

/// `-uo` / `-useOIIO`.
pub const USE_EXTERNAL_WRITER_FLAG: FlagSpec = FlagSpec {
    short: "-uo",
    long: "-useOIIO",
    kind: ArgumentKind::Boolean,
};

/// The full command syntax.
pub const SYNTAX: [FlagSpec; 5] = [
    FILENAME_FLAG,
    START_FRAME_FLAG,
    END_FRAME_FLAG,
    IMAGE_SIZE_FLAG,
    USE_EXTERNAL_WRITER_FLAG,
];

/// Named arguments of one command invocation.
///
/// Fields left `None` take their defaults during [`resolve`](Self::resolve).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArguments {
    /// Output path stem (`-f`).
    pub filename: Option<String>,
    /// First frame (`-sf`).
    pub start_frame: Option<Time>,
    /// Last frame, inclusive (`-ef`).
    pub end_frame: Option<Time>,
    /// Output size override (`-is`).
    pub image_size: Option<(u32, u32)>,
    /// Writer selection (`-uo`).
    pub use_external_writer: Option<bool>,
}

impl CommandArguments {
    /// Parse command tokens such as `["-f", "out", "-sf", "1", "-ef", "3"]`.
    ///
    /// A flag given more than once keeps its last value.
    ///
    /// # Errors
    ///
    /// Returns [`PlayblastError::UnknownFlag`] for tokens outside the
    /// syntax, [`PlayblastError::MissingFlagValue`] when a value is
    /// missing, and [`PlayblastError::InvalidArgument`] when a value does
    /// not parse.
    pub fn parse<I, S>(tokens: I) -> Result<Self, PlayblastError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(|t| t.as_ref().to_string()).collect();
        let mut arguments = CommandArguments::default();
        let mut index = 0;

        while index < tokens.len() {
            let flag = tokens[index].as_str();
            let spec = SYNTAX
                .iter()
                .find(|spec| spec.short == flag || spec.long == flag)
                .ok_or_else(|| PlayblastError::UnknownFlag(flag.to_string()))?;
            index += 1;

            match spec.kind {
                ArgumentKind::String => {
                    let value = take_value(&tokens, &mut index, flag)?;
                    arguments.filename = Some(value.to_string());
                }
                ArgumentKind::Time => {
                    let value = take_value(&tokens, &mut index, flag)?;
                    let time = value
                        .parse::<Time>()
                        .map_err(|reason| invalid(flag, value, reason))?;
                    if *spec == START_FRAME_FLAG {
                        arguments.start_frame = Some(time);
                    } else {
                        arguments.end_frame = Some(time);
                    }
                }
                ArgumentKind::UnsignedPair => {
                    let width = parse_unsigned(flag, take_value(&tokens, &mut index, flag)?)?;
                    let height = parse_unsigned(flag, take_value(&tokens, &mut index, flag)?)?;
                    arguments.image_size = Some((width, height));
                }
                ArgumentKind::Boolean => {
                    let explicit = tokens.get(index).and_then(|value| parse_boolean(value));
                    if explicit.is_some() {
                        index += 1;
                    }
                    arguments.use_external_writer = Some(explicit.unwrap_or(true));
                }
            }
        }

        Ok(arguments)
    }

    /// Validate the arguments into a capture configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlayblastError::MissingRequiredArgument`] if no filename
    /// was given, and [`PlayblastError::InvalidArgument`] for an end frame
    /// more than 2^53 frames after the start.
    pub fn resolve(self) -> Result<CaptureConfig, PlayblastError> {
        let filename = self
            .filename
            .ok_or(PlayblastError::MissingRequiredArgument(FILENAME_FLAG.long))?;

        let start = self.start_frame.unwrap_or(Time::new(0.0));
        let end = self.end_frame.unwrap_or(Time::new(1.0));
        if end.value() - start.value() > MAX_FRAME_SPAN {
            return Err(invalid(
                END_FRAME_FLAG.long,
                &end.to_string(),
                format!("range from {start} spans more than {MAX_FRAME_SPAN} frames"),
            ));
        }

        let mut config = CaptureConfig::new(filename)
            .with_frame_range(start, end)
            .with_writer(match self.use_external_writer {
                Some(true) => WriterBackend::External,
                _ => WriterBackend::Native,
            });
        if let Some((width, height)) = self.image_size {
            config = config.with_image_size(width, height);
        }
        Ok(config)
    }
}

fn take_value<'t>(tokens: &'t [String], index: &mut usize, flag: &str) -> Result<&'t str, PlayblastError> {
    let value = tokens
        .get(*index)
        .ok_or_else(|| PlayblastError::MissingFlagValue {
            flag: flag.to_string(),
        })?;
    *index += 1;
    Ok(value.as_str())
}

fn parse_unsigned(flag: &str, value: &str) -> Result<u32, PlayblastError> {
    value
        .parse::<u32>()
        .map_err(|error| invalid(flag, value, error.to_string()))
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(flag: &str, value: &str, reason: impl Into<String>) -> PlayblastError {
    PlayblastError::InvalidArgument {
        flag: flag.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandArguments, parse_boolean};

    #[test]
    fn boolean_aliases() {
        assert_eq!(parse_boolean("TRUE"), Some(true));
        assert_eq!(parse_boolean("off"), Some(false));
        assert_eq!(parse_boolean("-f"), None);
    }

    #[test]
    fn bare_boolean_flag_does_not_consume_next_flag() {
        let arguments = CommandArguments::parse(["-uo", "-f", "out"]).unwrap();
        assert_eq!(arguments.use_external_writer, Some(true));
        assert_eq!(arguments.filename.as_deref(), Some("out"));
    }

    #[test]
    fn last_value_wins() {
        let arguments = CommandArguments::parse(["-f", "a", "-filename", "b"]).unwrap();
        assert_eq!(arguments.filename.as_deref(), Some("b"));
    }
}
