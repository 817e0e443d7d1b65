//! Id list composition for chained commands
//!
//! `cpt broken | cpt delete` works because mutation commands append every
//! line piped into them to the ids given on the command line.

use std::io::{self, BufRead, IsTerminal};

/// Explicit ids followed by one id per non-empty upstream line
pub fn compose_ids<R: BufRead>(explicit: Vec<String>, upstream: Option<R>) -> io::Result<Vec<String>> {
    let mut ids = explicit;

    if let Some(reader) = upstream {
        for line in reader.lines() {
            let line = line?;
            let id = line.strip_suffix('\r').unwrap_or(&line);
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
    }

    Ok(ids)
}

/// Explicit ids plus the lines of standard input when it is not a terminal
pub fn read_piped_ids(explicit: Vec<String>) -> io::Result<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(explicit);
    }
    compose_ids(explicit, Some(stdin.lock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_upstream_lines_are_appended_in_order() {
        let piped = Cursor::new("wf-3\nwf-1\n");
        let composed = compose_ids(ids(&["wf-9"]), Some(piped)).unwrap();
        assert_eq!(composed, ids(&["wf-9", "wf-3", "wf-1"]));
    }

    #[test]
    fn test_no_upstream_keeps_explicit_ids() {
        let composed = compose_ids::<Cursor<&str>>(ids(&["a", "b"]), None).unwrap();
        assert_eq!(composed, ids(&["a", "b"]));
    }

    #[test]
    fn test_carriage_returns_and_blank_lines_are_dropped() {
        let piped = Cursor::new("a\r\n\nb\r\n\n");
        let composed = compose_ids(Vec::new(), Some(piped)).unwrap();
        assert_eq!(composed, ids(&["a", "b"]));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let piped = Cursor::new("a\na");
        let composed = compose_ids(ids(&["a"]), Some(piped)).unwrap();
        assert_eq!(composed, ids(&["a", "a", "a"]));
    }
}
