//! Debug console command language.

use crate::progress::VisibilityChange;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Status,
    /// Simulate a click on a step in the guide panel.
    Click { step: u32 },
    Trigger { step: u32, feature: String },
    /// The user acted on a feature target outside the guide.
    Manual { feature: String },
    Complete { step: u32 },
    Error { step: u32 },
    Dismiss,
    Panel(VisibilityChange),
    Diagnose,
    Export,
    DiagnoseExport,
    CollectStart,
    CollectStop,
    Restart,
    Quit,
    /// Known command, bad arguments.
    Usage(&'static str),
    Unknown(String),
}

pub const HELP: &str = "\
help                      this text
status                    progress, tooltip and manual triggers
click <step>              select a step as if clicked in the guide
trigger <step> <feature>  trigger a feature from the guide
manual <feature>          record a direct action on a feature target
complete <step>           mark a step completed
error <step>              flag a step as broken
dismiss                   dismiss the current tooltip
panel show|hide|toggle    guide panel visibility
content show|hide         guide content visibility
diagnose                  quick diagnostic
export                    export telemetry logs
diagnose-export           diagnose, then export
collect start|stop        telemetry collection window
restart                   restart the tour
quit                      exit";

/// Parses console input into commands.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(line: &str) -> ConsoleCommand {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();
        let mut words = lower.split_whitespace();
        let Some(head) = words.next() else {
            return ConsoleCommand::Help;
        };
        let args: Vec<&str> = words.collect();

        match (head, args.as_slice()) {
            ("help" | "?", _) => ConsoleCommand::Help,
            ("status", []) => ConsoleCommand::Status,
            ("diagnose", []) => ConsoleCommand::Diagnose,
            ("export", []) => ConsoleCommand::Export,
            ("diagnose-export", []) => ConsoleCommand::DiagnoseExport,
            ("restart", []) => ConsoleCommand::Restart,
            ("dismiss", []) => ConsoleCommand::Dismiss,
            ("quit" | "exit", []) => ConsoleCommand::Quit,

            ("click", [n]) => parse_step(n)
                .map(|step| ConsoleCommand::Click { step })
                .unwrap_or(ConsoleCommand::Usage("click <step>")),
            ("complete", [n]) => parse_step(n)
                .map(|step| ConsoleCommand::Complete { step })
                .unwrap_or(ConsoleCommand::Usage("complete <step>")),
            ("error", [n]) => parse_step(n)
                .map(|step| ConsoleCommand::Error { step })
                .unwrap_or(ConsoleCommand::Usage("error <step>")),
            // Feature ids keep their original case.
            ("trigger", [n, _]) => match (parse_step(n), original_word(trimmed, 2)) {
                (Some(step), Some(feature)) => ConsoleCommand::Trigger { step, feature },
                _ => ConsoleCommand::Usage("trigger <step> <feature>"),
            },
            ("manual", [_]) => match original_word(trimmed, 1) {
                Some(feature) => ConsoleCommand::Manual { feature },
                None => ConsoleCommand::Usage("manual <feature>"),
            },

            ("collect", ["start"]) => ConsoleCommand::CollectStart,
            ("collect", ["stop"]) => ConsoleCommand::CollectStop,
            ("panel", ["show"]) => ConsoleCommand::Panel(VisibilityChange::ShowPanel),
            ("panel", ["hide"]) => ConsoleCommand::Panel(VisibilityChange::HidePanel),
            ("panel", ["toggle"]) => ConsoleCommand::Panel(VisibilityChange::TogglePanel),
            ("content", ["show"]) => ConsoleCommand::Panel(VisibilityChange::ShowContent),
            ("content", ["hide"]) => ConsoleCommand::Panel(VisibilityChange::HideContent),

            ("click", _) => ConsoleCommand::Usage("click <step>"),
            ("complete", _) => ConsoleCommand::Usage("complete <step>"),
            ("error", _) => ConsoleCommand::Usage("error <step>"),
            ("trigger", _) => ConsoleCommand::Usage("trigger <step> <feature>"),
            ("manual", _) => ConsoleCommand::Usage("manual <feature>"),
            ("collect", _) => ConsoleCommand::Usage("collect start|stop"),
            ("panel", _) => ConsoleCommand::Usage("panel show|hide|toggle"),
            ("content", _) => ConsoleCommand::Usage("content show|hide"),
            _ => ConsoleCommand::Unknown(trimmed.to_string()),
        }
    }
}

fn parse_step(word: &str) -> Option<u32> {
    word.parse().ok()
}

fn original_word(line: &str, index: usize) -> Option<String> {
    line.split_whitespace().nth(index).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_commands() {
        assert_eq!(CommandParser::parse("click 3"), ConsoleCommand::Click { step: 3 });
        assert_eq!(CommandParser::parse("  COMPLETE 2 "), ConsoleCommand::Complete { step: 2 });
        assert_eq!(CommandParser::parse("click three"), ConsoleCommand::Usage("click <step>"));
        assert_eq!(CommandParser::parse("click"), ConsoleCommand::Usage("click <step>"));
    }

    #[test]
    fn trigger_keeps_feature_case() {
        assert_eq!(
            CommandParser::parse("trigger 1 New-Connection"),
            ConsoleCommand::Trigger {
                step: 1,
                feature: "New-Connection".to_string()
            }
        );
    }

    #[test]
    fn parses_subcommands_and_fallbacks() {
        assert_eq!(CommandParser::parse("collect start"), ConsoleCommand::CollectStart);
        assert_eq!(
            CommandParser::parse("panel toggle"),
            ConsoleCommand::Panel(VisibilityChange::TogglePanel)
        );
        assert_eq!(CommandParser::parse(""), ConsoleCommand::Help);
        assert_eq!(
            CommandParser::parse("frobnicate"),
            ConsoleCommand::Unknown("frobnicate".to_string())
        );
    }
}
