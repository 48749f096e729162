//! Scenario file parsing.
//!
//! Plain-text format: the first non-empty line lists resource ids,
//! comma-separated; every further non-empty line is either
//! `time,process,resource` (request) or `time,process` (finish).
//!
//! ```text
//! r1,r2
//! 0,p1,r1
//! 1,p2,r2
//! 2,p1,r2
//! 3,p2,r1
//! ```

use gridlock_types::{Event, Scenario};

/// Parses scenario text. Structural errors carry the offending 1-based
/// line number; the core never sees malformed events.
pub fn parse_scenario(text: &str) -> Result<Scenario, String> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, header) = lines.next().ok_or("scenario file is empty")?;
    let resources: Vec<String> = header
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect();
    if resources.is_empty() {
        return Err("scenario file declares no resources".to_string());
    }

    let mut events = Vec::new();
    for (lineno, line) in lines {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [time, process, resource] => {
                events.push(Event::request(parse_time(time, lineno)?, *process, *resource));
            }
            [time, process] => {
                events.push(Event::finish(parse_time(time, lineno)?, *process));
            }
            _ => {
                return Err(format!(
                    "line {lineno}: expected `time,process[,resource]`, got {line:?}"
                ));
            }
        }
    }

    Ok(Scenario { resources, events })
}

fn parse_time(raw: &str, lineno: usize) -> Result<u64, String> {
    raw.parse()
        .map_err(|_| format!("line {lineno}: invalid time {raw:?}"))
}
