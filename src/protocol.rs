//! Wire grammar shared by the operator remote and the platform.
//!
//! Every message is a single UTF-8 text frame `<channel>,<value>` where
//! `value` is a decimal integer. There is no framing, no sequence number and
//! no acknowledgement: ordering and delivery come from the transport.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

pub const DELIMITER: char = ',';

/// Largest magnitude carried by a continuous channel.
pub const POSITION_MAX: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "Move")]
    Move,
    #[serde(rename = "head")]
    Head,
    #[serde(rename = "left_front_foot")]
    LeftFrontFoot,
    #[serde(rename = "left_hind_foot")]
    LeftHindFoot,
    #[serde(rename = "right_front_foot")]
    RightFrontFoot,
    #[serde(rename = "right_hind_foot")]
    RightHindFoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Discrete,
    Continuous,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Move,
        Channel::Head,
        Channel::LeftFrontFoot,
        Channel::LeftHindFoot,
        Channel::RightFrontFoot,
        Channel::RightHindFoot,
    ];

    /// Continuous channels, in replay order.
    pub const CONTINUOUS: [Channel; 5] = [
        Channel::Head,
        Channel::LeftFrontFoot,
        Channel::LeftHindFoot,
        Channel::RightFrontFoot,
        Channel::RightHindFoot,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Head => "head",
            Self::LeftFrontFoot => "left_front_foot",
            Self::LeftHindFoot => "left_hind_foot",
            Self::RightFrontFoot => "right_front_foot",
            Self::RightHindFoot => "right_hind_foot",
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Move => ChannelKind::Discrete,
            _ => ChannelKind::Continuous,
        }
    }

    /// Highest value the channel accepts.
    pub fn max_value(&self) -> u8 {
        match self.kind() {
            ChannelKind::Discrete => MoveCode::Center.code(),
            ChannelKind::Continuous => POSITION_MAX,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| CommandError::UnrecognizedChannel(name.to_string()))
    }
}

/// Discrete motion codes carried on [`Channel::Move`].
///
/// `Stop` is sent on every release. `Center` is the press-in-place code of
/// the pad's middle button; whether the platform treats it like `Stop` is
/// left to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveCode {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
    Center,
}

impl MoveCode {
    pub fn code(&self) -> u8 {
        match self {
            Self::Stop => 0,
            Self::Forward => 1,
            Self::Backward => 2,
            Self::Left => 3,
            Self::Right => 4,
            Self::Center => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stop),
            1 => Some(Self::Forward),
            2 => Some(Self::Backward),
            3 => Some(Self::Left),
            4 => Some(Self::Right),
            5 => Some(Self::Center),
            _ => None,
        }
    }
}

/// A self-contained (channel, value) pair. The value is always within the
/// channel's domain; the only ways in are the checked constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    channel: Channel,
    value: u8,
}

impl Command {
    pub fn new(channel: Channel, value: i64) -> Result<Self, CommandError> {
        match u8::try_from(value) {
            Ok(v) if v <= channel.max_value() => Ok(Command { channel, value: v }),
            _ => Err(CommandError::ValueOutOfRange {
                channel: channel.name().to_string(),
                value,
            }),
        }
    }

    pub fn drive(code: MoveCode) -> Self {
        Command {
            channel: Channel::Move,
            value: code.code(),
        }
    }

    /// Position command for a continuous channel. Returns `None` for
    /// [`Channel::Move`].
    pub fn position(channel: Channel, value: u8) -> Option<Self> {
        match channel.kind() {
            ChannelKind::Continuous => Some(Command { channel, value }),
            ChannelKind::Discrete => None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Motion code when this is a `Move` command.
    pub fn move_code(&self) -> Option<MoveCode> {
        match self.channel {
            Channel::Move => MoveCode::from_code(self.value),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.channel.name(), DELIMITER, self.value)
    }
}

pub fn encode(command: &Command) -> String {
    command.to_string()
}

/// Encodes a command given by name, rejecting names outside the vocabulary
/// and values outside the channel's domain.
pub fn encode_raw(name: &str, value: i64) -> Result<String, CommandError> {
    let channel: Channel = name.parse()?;
    Ok(encode(&Command::new(channel, value)?))
}

/// Splits on the first delimiter. The grammar is checked before the
/// vocabulary, so an unknown name with a bad value is reported as malformed.
pub fn decode(message: &str) -> Result<Command, CommandError> {
    let (name, raw_value) = message
        .split_once(DELIMITER)
        .ok_or_else(|| CommandError::Malformed(message.to_string()))?;

    let value: i64 = raw_value
        .parse()
        .map_err(|_| CommandError::Malformed(message.to_string()))?;

    let channel: Channel = name.parse()?;
    Command::new(channel, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_name_and_decimal_value() {
        assert_eq!(encode(&Command::drive(MoveCode::Forward)), "Move,1");
        let head = Command::position(Channel::Head, 200).unwrap();
        assert_eq!(encode(&head), "head,200");
    }

    #[test]
    fn round_trips_whole_vocabulary() {
        for channel in Channel::ALL {
            for value in 0..=channel.max_value() {
                let command = Command::new(channel, value as i64).unwrap();
                assert_eq!(decode(&encode(&command)), Ok(command));
            }
        }
    }

    #[test]
    fn rejects_missing_delimiter() {
        assert!(matches!(decode("Move1"), Err(CommandError::Malformed(_))));
        assert!(matches!(decode(""), Err(CommandError::Malformed(_))));
    }

    #[test]
    fn rejects_non_integer_or_empty_value() {
        for msg in ["head,", "head,abc", "head,1.5", "head, 12", "Move,1,2"] {
            assert!(
                matches!(decode(msg), Err(CommandError::Malformed(_))),
                "{msg} should be malformed"
            );
        }
    }

    #[test]
    fn unknown_channel_is_not_malformed() {
        assert_eq!(
            decode("tail,3"),
            Err(CommandError::UnrecognizedChannel("tail".to_string()))
        );
        // names are case sensitive
        assert!(matches!(decode("move,1"), Err(CommandError::UnrecognizedChannel(_))));
    }

    #[test]
    fn rejects_values_outside_channel_domain() {
        assert!(matches!(decode("Move,6"), Err(CommandError::ValueOutOfRange { .. })));
        assert!(matches!(decode("head,256"), Err(CommandError::ValueOutOfRange { .. })));
        assert!(matches!(decode("head,-1"), Err(CommandError::ValueOutOfRange { .. })));
    }

    #[test]
    fn encode_raw_rejects_unknown_names() {
        assert_eq!(encode_raw("right_hind_foot", 7).unwrap(), "right_hind_foot,7");
        assert!(matches!(
            encode_raw("head,1", 3),
            Err(CommandError::UnrecognizedChannel(_))
        ));
    }

    #[test]
    fn stop_and_center_stay_distinct() {
        assert_ne!(MoveCode::Stop.code(), MoveCode::Center.code());
        assert_eq!(decode("Move,5").unwrap().move_code(), Some(MoveCode::Center));
        assert_eq!(decode("Move,0").unwrap().move_code(), Some(MoveCode::Stop));
        assert_eq!(decode("head,0").unwrap().move_code(), None);
    }

    #[test]
    fn constructor_guards_the_value_domain() {
        assert!(matches!(
            Command::new(Channel::Move, 200),
            Err(CommandError::ValueOutOfRange { .. })
        ));
        assert!(Command::new(Channel::Head, 256).is_err());
        let head = Command::new(Channel::Head, 255).unwrap();
        assert_eq!(
            serde_json::to_value(head).unwrap(),
            serde_json::json!({ "channel": "head", "value": 255 })
        );
    }

    #[test]
    fn position_refuses_move_channel() {
        assert!(Command::position(Channel::Move, 1).is_none());
    }
}
