//! Line commands read from stdin and queued track arguments

use crate::error::{DaemonError, Result};
use cadence_core::MediaId;
use cadence_playback::MediaEntity;
use std::str::FromStr;

/// One operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Play the queue entry at the index, or the current one
    Play(Option<usize>),
    Pause,
    Resume,
    /// Seek to an absolute position in seconds
    Seek(u64),
    /// Skip ahead; `None` uses the configured step
    Forward(Option<u32>),
    /// Skip back; `None` uses the configured step
    Replay(Option<u32>),
    Next,
    Previous,
    Speed(f32),
    Volume(f32),
    /// Flip the favorite status of the current track
    Favorite,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = DaemonError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| DaemonError::Command("empty line".to_string()))?;
        let arg = words.next();
        if let Some(extra) = words.next() {
            return Err(DaemonError::Command(format!("unexpected argument '{extra}'")));
        }

        let command = match name.to_ascii_lowercase().as_str() {
            "play" | "p" => Command::Play(arg.map(parse_number).transpose()?),
            "pause" => Command::Pause,
            "resume" | "r" => Command::Resume,
            "seek" => Command::Seek(parse_number(required(name, arg)?)?),
            "fwd" | "forward" | "f" => Command::Forward(arg.map(parse_number).transpose()?),
            "replay" | "back" | "b" => Command::Replay(arg.map(parse_number).transpose()?),
            "next" | "n" => Command::Next,
            "prev" | "previous" => Command::Previous,
            "speed" => Command::Speed(parse_number(required(name, arg)?)?),
            "volume" | "vol" => Command::Volume(parse_number(required(name, arg)?)?),
            "fav" | "favorite" => Command::Favorite,
            "status" | "s" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(DaemonError::Command(format!("unknown command '{other}'"))),
        };

        // Commands without arguments reject stray ones
        let takes_arg = matches!(
            command,
            Command::Play(_)
                | Command::Seek(_)
                | Command::Forward(_)
                | Command::Replay(_)
                | Command::Speed(_)
                | Command::Volume(_)
        );
        if !takes_arg {
            if let Some(arg) = arg {
                return Err(DaemonError::Command(format!(
                    "'{name}' takes no argument, got '{arg}'"
                )));
            }
        }
        Ok(command)
    }
}

pub const HELP: &str = "\
commands:
  play [index]     play the current or given queue entry
  pause | resume
  seek <seconds>   jump to a position
  fwd [seconds]    skip ahead
  replay [seconds] skip back
  next | prev
  speed <factor>   e.g. 1.5
  volume <0..1>
  fav              toggle favorite for the current track
  status | help | quit";

fn required<'a>(name: &str, arg: Option<&'a str>) -> Result<&'a str> {
    arg.ok_or_else(|| DaemonError::Command(format!("'{name}' needs an argument")))
}

fn parse_number<T: FromStr>(text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| DaemonError::Command(format!("'{text}' is not a valid number")))
}

/// Parse a queued track argument: `MEDIA_ID[@seconds]`
///
/// The media id must name a playable leaf, e.g. `ALBUMS/42|7`. Only a
/// numeric `@` suffix after the leaf is read as a length, so category
/// values may contain `@`.
pub fn parse_track(arg: &str, default_seconds: u64) -> Result<MediaEntity> {
    let (id_text, seconds) = match split_length(arg) {
        Some((id, seconds)) => {
            let seconds = seconds
                .parse::<u64>()
                .map_err(|_| DaemonError::Track(format!("bad length in '{arg}'")))?;
            (id, seconds)
        }
        None => (arg, default_seconds),
    };

    let media_id = MediaId::from_str(id_text)?;
    let id = media_id
        .leaf()
        .ok_or_else(|| DaemonError::Track(format!("'{id_text}' does not name a track")))?;

    Ok(MediaEntity {
        id,
        is_podcast: media_id.is_podcast(),
        media_id: media_id.parent(),
        title: format!("Track {id}"),
        artist: String::new(),
        album: String::new(),
        duration_ms: seconds.saturating_mul(1_000),
    })
}

/// Split `MEDIA_ID@digits` when the digits follow the leaf
fn split_length(arg: &str) -> Option<(&str, &str)> {
    let (id, suffix) = arg.rsplit_once('@')?;
    let is_length = !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit());
    (is_length && id.contains('|')).then_some((id, suffix))
}
