//! Parser for the textual control commands the voice and gesture layers
//! hand the engine.
//!
//! Commands are case-insensitive words separated by whitespace:
//!
//! ```text
//! obstacles on|off        refresh distance <m>     refresh time <s>
//! samples more|fewer      spread wider|narrower    spotlight on|off
//! proximity on|off        clear obstacles          clear text
//! tolerance <n>           locate text              read text
//! single shot             count icons              stop
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1, u32 as parse_u32},
    combinator::{all_consuming, map, value},
    error::Error,
    number::complete::double,
    sequence::{delimited, preceded, separated_pair, terminated},
    Finish, IResult,
};
use std::{fmt, str::FromStr};

/// Every control the engine accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Turn obstacle mode (the refresh scheduler) on or off
    Obstacles(bool),
    /// Regenerate every so many meters walked
    RefreshDistance(f64),
    /// Regenerate every so many seconds
    RefreshTime(f64),
    /// Double the probes per pass
    MoreSamples,
    /// Halve the probes per pass
    FewerSamples,
    /// Widen the probe cone
    WiderSpread,
    /// Narrow the probe cone
    NarrowerSpread,
    #[allow(missing_docs)]
    Spotlight(bool),
    /// Logarithmic (on) or linear (off) volume falloff
    Proximity(bool),
    #[allow(missing_docs)]
    ClearObstacles,
    #[allow(missing_docs)]
    ClearText,
    /// Set the dedup similarity tolerance
    Tolerance(usize),
    /// Start an OCR capture pass
    LocateText,
    /// Read the text regions in view aloud
    ReadText,
    /// Place one beacon straight ahead
    SingleShot,
    /// Say how many annotations are live
    CountIcons,
    /// Stop speaking
    Stop,
}

/// A command that did not parse, with nom's view of where it went wrong.
#[derive(Debug, PartialEq)]
pub struct CommandError(pub Error<String>);

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unrecognized command at '{}' ({:?})",
            self.0.input, self.0.code
        )
    }
}

impl std::error::Error for CommandError {}

fn on_off(s: &str) -> IResult<&str, bool> {
    alt((value(true, tag_no_case("on")), value(false, tag_no_case("off"))))(s)
}

/// A keyword that must be followed by more input.
fn word<'a>(w: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(w), multispace1)
}

fn keyword_switch<'a>(w: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, bool> {
    preceded(word(w), on_off)
}

fn parse_switches(s: &str) -> IResult<&str, ControlCommand> {
    alt((
        map(keyword_switch("obstacles"), ControlCommand::Obstacles),
        map(keyword_switch("spotlight"), ControlCommand::Spotlight),
        map(keyword_switch("proximity"), ControlCommand::Proximity),
    ))(s)
}

fn parse_refresh(s: &str) -> IResult<&str, ControlCommand> {
    preceded(
        word("refresh"),
        alt((
            map(preceded(word("distance"), double), ControlCommand::RefreshDistance),
            map(preceded(word("time"), double), ControlCommand::RefreshTime),
        )),
    )(s)
}

fn two_words<'a>(
    first: &'static str,
    second: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, (&'a str, &'a str)> {
    separated_pair(tag_no_case(first), multispace1, tag_no_case(second))
}

fn parse_tuning(s: &str) -> IResult<&str, ControlCommand> {
    alt((
        value(ControlCommand::MoreSamples, two_words("samples", "more")),
        value(ControlCommand::FewerSamples, two_words("samples", "fewer")),
        value(ControlCommand::WiderSpread, two_words("spread", "wider")),
        value(ControlCommand::NarrowerSpread, two_words("spread", "narrower")),
        map(preceded(word("tolerance"), parse_u32), |n| {
            ControlCommand::Tolerance(n as usize)
        }),
    ))(s)
}

fn parse_actions(s: &str) -> IResult<&str, ControlCommand> {
    alt((
        value(ControlCommand::ClearObstacles, two_words("clear", "obstacles")),
        value(ControlCommand::ClearText, two_words("clear", "text")),
        value(ControlCommand::LocateText, two_words("locate", "text")),
        value(ControlCommand::ReadText, two_words("read", "text")),
        value(ControlCommand::SingleShot, two_words("single", "shot")),
        value(ControlCommand::CountIcons, two_words("count", "icons")),
        value(ControlCommand::Stop, tag_no_case("stop")),
    ))(s)
}

fn parse_command(s: &str) -> IResult<&str, ControlCommand> {
    all_consuming(delimited(
        multispace0,
        alt((parse_switches, parse_refresh, parse_tuning, parse_actions)),
        multispace0,
    ))(s)
}

impl FromStr for ControlCommand {
    type Err = CommandError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_command(s).finish() {
            Ok((_remaining, command)) => Ok(command),
            Err(Error { input, code }) => Err(CommandError(Error {
                input: input.to_string(),
                code,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches() {
        assert_eq!("obstacles on".parse(), Ok(ControlCommand::Obstacles(true)));
        assert_eq!("Obstacles OFF".parse(), Ok(ControlCommand::Obstacles(false)));
        assert_eq!("spotlight   on".parse(), Ok(ControlCommand::Spotlight(true)));
        assert_eq!("proximity off".parse(), Ok(ControlCommand::Proximity(false)));
    }

    #[test]
    fn refresh_takes_a_number() {
        assert_eq!("refresh distance 2".parse(), Ok(ControlCommand::RefreshDistance(2.0)));
        assert_eq!("REFRESH TIME 8.5".parse(), Ok(ControlCommand::RefreshTime(8.5)));
        assert!("refresh distance".parse::<ControlCommand>().is_err());
        assert!("refresh sometimes 3".parse::<ControlCommand>().is_err());
    }

    #[test]
    fn tuning_and_actions() {
        assert_eq!("samples more".parse(), Ok(ControlCommand::MoreSamples));
        assert_eq!("spread narrower".parse(), Ok(ControlCommand::NarrowerSpread));
        assert_eq!("tolerance 3".parse(), Ok(ControlCommand::Tolerance(3)));
        assert_eq!("clear text".parse(), Ok(ControlCommand::ClearText));
        assert_eq!("  locate text \n".parse(), Ok(ControlCommand::LocateText));
        assert_eq!("single shot".parse(), Ok(ControlCommand::SingleShot));
        assert_eq!("count icons".parse(), Ok(ControlCommand::CountIcons));
        assert_eq!("stop".parse(), Ok(ControlCommand::Stop));
    }

    #[test]
    fn junk_is_rejected_with_context() {
        let err = "obstacles maybe".parse::<ControlCommand>().unwrap_err();
        assert!(err.to_string().contains("unrecognized command"));
        assert!("stop now".parse::<ControlCommand>().is_err());
        assert!("".parse::<ControlCommand>().is_err());
    }

    #[test]
    fn parse_errors_move_into_engine_errors() {
        let err = "spread sideways".parse::<ControlCommand>().unwrap_err();
        assert_eq!(err, "spread sideways".parse::<ControlCommand>().unwrap_err());
        let engine_err = crate::error::EngineError::from(err);
        assert!(engine_err.to_string().starts_with("command error: unrecognized command"));
    }
}
