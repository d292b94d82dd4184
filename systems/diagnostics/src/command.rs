use clap::{error::ErrorKind, Parser, Subcommand};

/// Commands understood by the diagnostics shell.
#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum ShellCommand {
    /// Rotates the robot in place
    Rotate {
        /// Angular velocity in rad/s, positive is counter-clockwise
        #[arg(allow_negative_numbers = true)]
        velocity: f32,
    },
    /// Moves the robot forward, back, left or right
    Move {
        /// One of forward, back, left, right
        direction: String,
        /// Speed as a percentage of the robot's maximum
        #[arg(allow_negative_numbers = true)]
        speed: f32,
    },
    /// Chips the ball with the chipper
    Chip {
        /// Distance to the first bounce in metres
        #[arg(default_value_t = 1.0, allow_negative_numbers = true)]
        distance: f32,
    },
    /// Kicks the ball with the kicker
    Kick {
        /// Ball speed in m/s
        #[arg(default_value_t = 2.0, allow_negative_numbers = true)]
        speed: f32,
    },
    /// Spins the dribbler
    Dribble {
        /// Roller velocity in rad/s
        #[arg(allow_negative_numbers = true)]
        velocity: f32,
    },
    /// Halts every actuator
    Stop,
    /// Shows live robot statistics
    Stats {
        /// Stop after this many frames instead of waiting for Enter
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Shows values held by the robot's key-value store
    #[command(alias = "redis")]
    Config {
        /// Stop after this many frames instead of waiting for Enter
        #[arg(long)]
        frames: Option<usize>,
    },
    /// Restarts the robot's control loop service
    Restart,
    /// Leaves the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Parser)]
#[command(name = "shell", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

/// Result of interpreting one line typed into the shell.
#[derive(Debug)]
pub enum ParsedLine {
    /// The line was blank.
    Empty,
    /// The line named a command.
    Command(ShellCommand),
    /// The line asked for help; the rendered text should be shown as-is.
    Help(String),
    /// The line could not be parsed; the rendered usage error should be shown.
    Invalid(String),
}

/// Parses a single shell line into a command.
#[must_use]
pub fn parse_line(line: &str) -> ParsedLine {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return ParsedLine::Empty;
    }

    match ShellLine::try_parse_from(words) {
        Ok(parsed) => ParsedLine::Command(parsed.command),
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::DisplayVersion => ParsedLine::Help(error.render().to_string()),
            _ => ParsedLine::Invalid(error.render().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> ShellCommand {
        match parse_line(line) {
            ParsedLine::Command(command) => command,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_empty() {
        assert!(matches!(parse_line("   "), ParsedLine::Empty));
    }

    #[test]
    fn optional_arguments_use_defaults() {
        assert_eq!(command("chip"), ShellCommand::Chip { distance: 1.0 });
        assert_eq!(command("kick"), ShellCommand::Kick { speed: 2.0 });
        assert_eq!(command("kick 4.5"), ShellCommand::Kick { speed: 4.5 });
    }

    #[test]
    fn negative_velocities_are_values_not_flags() {
        assert_eq!(command("rotate -2.5"), ShellCommand::Rotate { velocity: -2.5 });
    }

    #[test]
    fn move_keeps_raw_direction() {
        assert_eq!(
            command("move Forward 30"),
            ShellCommand::Move {
                direction: "Forward".to_owned(),
                speed: 30.0,
            }
        );
    }

    #[test]
    fn aliases_resolve_to_commands() {
        assert_eq!(command("redis"), ShellCommand::Config { frames: None });
        assert_eq!(command("exit"), ShellCommand::Quit);
        assert_eq!(
            command("stats --frames 3"),
            ShellCommand::Stats { frames: Some(3) }
        );
    }

    #[test]
    fn help_is_rendered_rather_than_rejected() {
        match parse_line("help") {
            ParsedLine::Help(text) => assert!(text.contains("rotate")),
            other => panic!("expected help output, got {other:?}"),
        }
    }

    #[test]
    fn unknown_commands_and_bad_numbers_are_invalid() {
        assert!(matches!(parse_line("teleport"), ParsedLine::Invalid(_)));
        assert!(matches!(parse_line("kick fast"), ParsedLine::Invalid(_)));
        assert!(matches!(parse_line("dribble"), ParsedLine::Invalid(_)));
    }
}
