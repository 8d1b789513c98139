//! Terminal-backed presenter for the daemon.
//!
//! Prompts are printed to the controlling terminal and answered with one
//! line of input. Only the prompt currently shown by the scheduler reads
//! input; everything else waits its turn, exactly like the modal dialogs
//! this stands in for.

use std::io::BufRead;

use tokio::sync::mpsc;

use promptd::{Presenter, PromptPath, PromptReply, PromptSurface, ResponseChannel, ResponseEncoding, Slot};

enum Command {
    Show {
        headline: String,
        channel: ResponseChannel,
        mask: bool,
    },
    Hide {
        path: PromptPath,
    },
}

pub struct TerminalPresenter {
    control: mpsc::UnboundedSender<Command>,
}

impl TerminalPresenter {
    /// Start the input router and the blocking stdin reader thread.
    pub fn spawn() -> Self {
        let (control, commands) = mpsc::unbounded_channel();
        let (line_tx, lines) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        tokio::spawn(route(commands, lines));
        Self { control }
    }
}

impl Presenter for TerminalPresenter {
    fn materialize(&self, slot: &Slot, replies: ResponseChannel) -> Box<dyn PromptSurface> {
        let mask = slot.spec().encoding == ResponseEncoding::OptionMask;
        Box::new(TerminalSurface {
            headline: headline(slot),
            mask,
            channel: replies,
            control: self.control.clone(),
        })
    }
}

struct TerminalSurface {
    headline: String,
    mask: bool,
    channel: ResponseChannel,
    control: mpsc::UnboundedSender<Command>,
}

impl PromptSurface for TerminalSurface {
    fn show(&mut self) {
        let _ = self.control.send(Command::Show {
            headline: self.headline.clone(),
            channel: self.channel.clone(),
            mask: self.mask,
        });
    }

    fn hide(&mut self) {
        let _ = self.control.send(Command::Hide {
            path: self.channel.path().clone(),
        });
    }
}

/// Routes stdin lines to whichever prompt is currently shown.
async fn route(
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut lines: mpsc::UnboundedReceiver<String>,
) {
    let mut focus: Option<(ResponseChannel, bool)> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Show { headline, channel, mask }) => {
                    println!();
                    println!("{headline}");
                    if mask {
                        println!("  [1 = first option, 2 = second, 12 = both, 0 = neither, n = decline]");
                    } else {
                        println!("  [y = accept, n = decline, empty = dismiss]");
                    }
                    focus = Some((channel, mask));
                }
                Some(Command::Hide { path }) => {
                    if focus.as_ref().is_some_and(|(channel, _)| *channel.path() == path) {
                        focus = None;
                    }
                }
                None => break,
            },

            line = lines.recv() => match line {
                Some(line) => {
                    let Some((channel, mask)) = focus.as_ref() else {
                        continue;
                    };
                    match parse_reply(line.trim(), *mask) {
                        Some(reply) => {
                            channel.submit(reply);
                            focus = None;
                        }
                        None => println!("  unrecognized answer: {line:?}"),
                    }
                }
                None => break,
            },
        }
    }
}

fn parse_reply(input: &str, mask: bool) -> Option<PromptReply> {
    if mask {
        return match input {
            "12" | "21" => Some(PromptReply::Options {
                first: true,
                second: true,
            }),
            "1" => Some(PromptReply::Options {
                first: true,
                second: false,
            }),
            "2" => Some(PromptReply::Options {
                first: false,
                second: true,
            }),
            "0" => Some(PromptReply::Options {
                first: false,
                second: false,
            }),
            "n" | "no" => Some(PromptReply::Declined),
            "" => Some(PromptReply::Dismissed),
            _ => None,
        };
    }
    match input {
        "y" | "yes" => Some(PromptReply::Accepted),
        "n" | "no" => Some(PromptReply::Declined),
        "" => Some(PromptReply::Dismissed),
        _ => None,
    }
}

fn headline(slot: &Slot) -> String {
    let requester = slot
        .request_args()
        .first()
        .and_then(|v| v.as_str())
        .unwrap_or("another application");
    let service = slot
        .request_args()
        .get(1)
        .and_then(|v| v.as_str())
        .unwrap_or("a location service");

    match slot.spec().kind.as_str() {
        "disclaimer" => "Location data may be shared with network services. Continue?".to_string(),
        "enable_gps" => "Allow the device to use GPS positioning?".to_string(),
        "enable_network" => "Allow the device to use network positioning?".to_string(),
        "enable_positioning" => {
            "Choose positioning methods (1 = GPS, 2 = network):".to_string()
        }
        "enable_agnss" => "Allow assisted GNSS data downloads?".to_string(),
        "bt_disconnected" => "Positioning accessory disconnected. Acknowledge?".to_string(),
        "bt_disabled" => "Bluetooth is disabled; positioning accessory unavailable. Acknowledge?"
            .to_string(),
        "location_verification" => {
            format!("Allow {requester} to verify your location via {service}?")
        }
        "location_information" => format!("{requester} located you via {service}."),
        "location_timeout" => format!("Location request from {requester} timed out."),
        "location_expired" => format!("Location authorization for {requester} expired."),
        "location_default_supl" => {
            format!("Use {service} as the default assisted-positioning server for {requester}?")
        }
        kind => format!("{kind} requests a response."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_answers() {
        assert_eq!(parse_reply("y", false), Some(PromptReply::Accepted));
        assert_eq!(parse_reply("no", false), Some(PromptReply::Declined));
        assert_eq!(parse_reply("", false), Some(PromptReply::Dismissed));
        assert_eq!(parse_reply("maybe", false), None);
    }

    #[test]
    fn mask_answers() {
        assert_eq!(
            parse_reply("12", true),
            Some(PromptReply::Options {
                first: true,
                second: true
            })
        );
        assert_eq!(
            parse_reply("2", true),
            Some(PromptReply::Options {
                first: false,
                second: true
            })
        );
        assert_eq!(
            parse_reply("0", true),
            Some(PromptReply::Options {
                first: false,
                second: false
            })
        );
        assert_eq!(parse_reply("n", true), Some(PromptReply::Declined));
        assert_eq!(parse_reply("3", true), None);
    }
}
