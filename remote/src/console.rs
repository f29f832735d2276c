//! Line-oriented operator frontend on stdin.
//!
//! ```text
//! press up | release up | leave up | cancel up | tap up
//! set head 200
//! connect
//! quit
//! ```

use std::io::{self, BufRead};
use std::sync::mpsc::Sender;

use anyhow::{anyhow, bail, Context, Result};
use irmp_link::{Button, ControlEvent, SessionEvent, Slider, Touch};
use tracing::{info, warn};

pub fn parse_line(line: &str) -> Result<Vec<SessionEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Vec::new());
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let events = match words.as_slice() {
        ["connect"] => vec![SessionEvent::Connect],
        ["quit"] | ["exit"] => vec![SessionEvent::Shutdown],
        ["press", name] => vec![touch(name, Touch::Start)?],
        ["release", name] => vec![touch(name, Touch::End)?],
        ["leave", name] => vec![touch(name, Touch::Leave)?],
        ["cancel", name] => vec![touch(name, Touch::Cancel)?],
        ["tap", name] => vec![touch(name, Touch::Start)?, touch(name, Touch::End)?],
        ["set", name, value] => {
            let slider = Slider::from_name(name).ok_or_else(|| anyhow!("unknown slider {name:?}"))?;
            let value: u8 = value
                .parse()
                .with_context(|| format!("slider value {value:?} is not in 0-255"))?;
            vec![SessionEvent::Input(ControlEvent::Slider(slider, value))]
        }
        _ => bail!("unrecognized input {line:?}"),
    };
    Ok(events)
}

fn touch(name: &str, phase: Touch) -> Result<SessionEvent> {
    let button = Button::from_name(name).ok_or_else(|| anyhow!("unknown button {name:?}"))?;
    Ok(SessionEvent::Input(ControlEvent::Button(button, phase)))
}

/// Feeds stdin into the session until EOF or `quit`.
pub fn console_thread(events: Sender<SessionEvent>) {
    info!(
        "Console ready: press|release|leave|cancel|tap <button>, \
         set <slider> <value>, connect, quit"
    );

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("stdin error: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(parsed) => {
                for event in parsed {
                    let quit = event == SessionEvent::Shutdown;
                    if events.send(event).is_err() || quit {
                        return;
                    }
                }
            }
            Err(e) => warn!("{:#}", e),
        }
    }

    let _ = events.send(SessionEvent::Shutdown);
}
