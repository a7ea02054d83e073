//! Line-based session scripts for headless runs.

use std::fmt;
use std::time::Duration;

use player_core::model::ScreenPosition;
use services::ReplayTarget;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Next,
    Previous,
    GoTo(ScreenPosition),
    Play,
    Alert(f64),
    End,
    Retry,
    Replay(ReplayTarget),
    Wait(Duration),
}

#[derive(Debug, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse one action per line. Blank lines and `#` comments are skipped.
///
/// Screens are numbered from 1, replay targets from 0.
pub fn parse(source: &str) -> Result<Vec<Action>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                return None;
            }
            Some(parse_line(line).map_err(|message| ScriptError { line: i + 1, message }))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Action, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["next"] => Ok(Action::Next),
        ["previous" | "back"] => Ok(Action::Previous),
        ["play"] => Ok(Action::Play),
        ["end"] => Ok(Action::End),
        ["retry"] => Ok(Action::Retry),
        ["alert", time] => number(time).map(Action::Alert),
        ["wait", secs] => {
            let secs = number(secs)?;
            Duration::try_from_secs_f64(secs)
                .map(Action::Wait)
                .map_err(|err| format!("wait of {secs} seconds is out of range: {err}"))
        }
        ["goto", "welcome"] => Ok(Action::GoTo(ScreenPosition::Welcome)),
        ["goto", "finish"] => Ok(Action::GoTo(ScreenPosition::Finish)),
        ["goto", n] => match n.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Action::GoTo(ScreenPosition::Screen(n - 1))),
            _ => Err(format!("expected welcome, finish or a screen number, got {n:?}")),
        },
        ["replay", kind, n] => {
            let index = n
                .parse::<usize>()
                .map_err(|_| format!("expected a segment index, got {n:?}"))?;
            match *kind {
                "unmarked" => Ok(Action::Replay(ReplayTarget::Unmarked(index))),
                "correct" => Ok(Action::Replay(ReplayTarget::Correct(index))),
                other => Err(format!("expected unmarked or correct, got {other:?}")),
            }
        }
        _ => Err(format!("unknown action {line:?}")),
    }
}

fn number(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(format!("expected a non-negative number, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_session() {
        let script = "\
            # first screen\n\
            next\n\
            alert 3.5\n\
            end   # evaluate\n\
            \n\
            replay unmarked 0\n\
            goto 2\n\
            wait 1.5\n";
        assert_eq!(
            parse(script).unwrap(),
            vec![
                Action::Next,
                Action::Alert(3.5),
                Action::End,
                Action::Replay(ReplayTarget::Unmarked(0)),
                Action::GoTo(ScreenPosition::Screen(1)),
                Action::Wait(Duration::from_millis(1500)),
            ]
        );
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse("next\ngoto 0\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(parse("alert -1").is_err());
        assert!(parse("replay both 1").is_err());

        let err = parse("wait 2\nwait 1e300\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("out of range"));
    }
}
