//! Typed console commands
//!
//! One line of input is one command. Playback commands map onto the same
//! [`ControlEvent`]s the chat layer would produce.

use crate::error::{ConsoleError, Result};
use discodj_core::LoopMode;
use discodj_playback::{ControlEvent, EnqueuePosition};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Control(ControlEvent),
    /// Press a button on the live panel
    Press(String),
    SavePlaylist(String),
    LoadPlaylist(String),
    DeletePlaylist(String),
    ListPlaylists,
    /// Simulate the number of people left in the voice channel
    Listeners(usize),
    /// Let the current track run out now
    Finish,
    /// Delete the live panel message
    DeletePanel,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
play <query>          queue at the end (playnext / playtop queue in front)
pause | resume | toggle | skip | prev | stop | leave | join
seek <83|1:23|1:02:03> volume <0-200>   loop <off|one|all>
shuffle | clear | queue | page <next|prev>
jump <n> | remove <n> | move <from> <to>
filter <bassboost|nightcore|vaporwave|8d|off>
autoplay <on|off>     djonly <on|off>
press <button id>     listeners <n>     finish     deletepanel
save <name> | load <name> | delete <name> | playlists
status | help | quit";

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    let control = |event: ControlEvent| -> Result<Option<Command>> { Ok(Some(Command::Control(event))) };
    match verb.to_ascii_lowercase().as_str() {
        "play" | "p" => control(ControlEvent::Play {
            query: required(rest, "play <query>")?,
            position: EnqueuePosition::End,
        }),
        "playnext" => control(ControlEvent::Play {
            query: required(rest, "playnext <query>")?,
            position: EnqueuePosition::Next,
        }),
        "playtop" => control(ControlEvent::Play {
            query: required(rest, "playtop <query>")?,
            position: EnqueuePosition::Top,
        }),
        "join" => control(ControlEvent::Join),
        "queue" | "q" => control(ControlEvent::ShowQueue),
        "skip" | "s" => control(ControlEvent::Skip),
        "prev" | "previous" | "back" => control(ControlEvent::Previous),
        "stop" => control(ControlEvent::Stop),
        "leave" => control(ControlEvent::Leave),
        "pause" => control(ControlEvent::Pause),
        "resume" => control(ControlEvent::Resume),
        "toggle" => control(ControlEvent::TogglePause),
        "volume" | "vol" => {
            let percent = rest
                .trim_end_matches('%')
                .parse::<i64>()
                .map_err(|_| ConsoleError::usage("usage: volume <0-200>"))?;
            control(ControlEvent::Volume(percent))
        }
        "seek" => control(ControlEvent::Seek(required(rest, "seek <timestamp>")?)),
        "shuffle" => control(ControlEvent::Shuffle),
        "loop" => {
            let mode = rest.parse::<LoopMode>().map_err(ConsoleError::Usage)?;
            control(ControlEvent::Loop(mode))
        }
        "autoplay" => control(ControlEvent::Autoplay(on_off(rest, "autoplay <on|off>")?)),
        "djonly" => control(ControlEvent::DjOnly(on_off(rest, "djonly <on|off>")?)),
        "filter" => control(ControlEvent::Filter(Some(rest.to_string()).filter(|f| !f.is_empty()))),
        "jump" => control(ControlEvent::Jump(position(rest, "jump <n>")?)),
        "remove" | "rm" => control(ControlEvent::Remove(position(rest, "remove <n>")?)),
        "move" | "mv" => {
            let usage = "move <from> <to>";
            let mut parts = rest.split_whitespace();
            let from = position(parts.next().unwrap_or_default(), usage)?;
            let to = position(parts.next().unwrap_or_default(), usage)?;
            if parts.next().is_some() {
                return Err(ConsoleError::usage(format!("usage: {}", usage)));
            }
            control(ControlEvent::Move { from, to })
        }
        "clear" => control(ControlEvent::Clear),
        "page" => match rest.to_ascii_lowercase().as_str() {
            "next" | "+" => control(ControlEvent::PageNext),
            "prev" | "-" => control(ControlEvent::PagePrev),
            _ => Err(ConsoleError::usage("usage: page <next|prev>")),
        },
        "press" => Ok(Some(Command::Press(required(rest, "press <button id>")?))),
        "save" => Ok(Some(Command::SavePlaylist(required(rest, "save <name>")?))),
        "load" => Ok(Some(Command::LoadPlaylist(required(rest, "load <name>")?))),
        "delete" => Ok(Some(Command::DeletePlaylist(required(rest, "delete <name>")?))),
        "playlists" => Ok(Some(Command::ListPlaylists)),
        "listeners" => {
            let count = rest
                .parse::<usize>()
                .map_err(|_| ConsoleError::usage("usage: listeners <n>"))?;
            Ok(Some(Command::Listeners(count)))
        }
        "finish" => Ok(Some(Command::Finish)),
        "deletepanel" => Ok(Some(Command::DeletePanel)),
        "status" => Ok(Some(Command::Status)),
        "help" | "?" => Ok(Some(Command::Help)),
        "quit" | "exit" => Ok(Some(Command::Quit)),
        other => Err(ConsoleError::usage(format!("unknown command '{}' (try help)", other))),
    }
}

fn required(rest: &str, usage: &str) -> Result<String> {
    if rest.is_empty() {
        return Err(ConsoleError::usage(format!("usage: {}", usage)));
    }
    Ok(rest.to_string())
}

fn position(raw: &str, usage: &str) -> Result<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConsoleError::usage(format!("usage: {} (positions start at 1)", usage)))
}

fn on_off(raw: &str, usage: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(ConsoleError::usage(format!("usage: {}", usage))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn play_variants_pick_their_position() {
        assert_eq!(
            parse("play  never gonna give you up "),
            Command::Control(ControlEvent::Play {
                query: "never gonna give you up".into(),
                position: EnqueuePosition::End,
            })
        );
        assert!(matches!(
            parse("playtop x"),
            Command::Control(ControlEvent::Play { position: EnqueuePosition::Top, .. })
        ));
        assert!(parse_line("play").is_err());
    }

    #[test]
    fn arguments_are_validated() {
        assert_eq!(parse("volume 150%"), Command::Control(ControlEvent::Volume(150)));
        assert_eq!(parse("loop ALL"), Command::Control(ControlEvent::Loop(LoopMode::All)));
        assert_eq!(parse("move 3 1"), Command::Control(ControlEvent::Move { from: 3, to: 1 }));
        assert_eq!(parse("filter"), Command::Control(ControlEvent::Filter(None)));
        assert!(parse_line("loop sometimes").is_err());
        assert!(parse_line("remove 0").is_err());
        assert!(parse_line("move 1").is_err());
        assert!(parse_line("autoplay maybe").is_err());
    }

    #[test]
    fn console_only_commands() {
        assert_eq!(parse("listeners 0"), Command::Listeners(0));
        assert_eq!(parse("press music:skip"), Command::Press("music:skip".into()));
        assert_eq!(parse("save road trip"), Command::SavePlaylist("road trip".into()));
        assert_eq!(parse("EXIT"), Command::Quit);
        assert!(parse_line("   ").unwrap().is_none());
        assert!(matches!(parse_line("dance"), Err(ConsoleError::Usage(_))));
    }
}
