use std::io::{BufRead, Write};

use crate::error::CliError;

/// Asks whether to perform `count` operations.
///
/// An empty line or an answer starting with `y` confirms. Only the line
/// ending is stripped, so leading or lone whitespace declines. End of input
/// declines.
pub(crate) fn confirm<In, Out>(
    input: &mut In,
    out: &mut Out,
    count: usize,
) -> Result<bool, CliError>
where
    In: BufRead + ?Sized,
    Out: Write + ?Sized,
{
    write!(out, "Perform {count} operations? (Y/n): ")?;
    out.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer).map_err(CliError::Input)? == 0 {
        writeln!(out)?;
        return Ok(false);
    }
    Ok(is_yes(answer.trim_end_matches(['\r', '\n'])))
}

fn is_yes(answer: &str) -> bool {
    answer.is_empty() || answer.starts_with(['Y', 'y'])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn ask(answer: &str) -> (bool, String) {
        let mut input = Cursor::new(answer.as_bytes().to_vec());
        let mut out = Vec::new();
        let confirmed = confirm(&mut input, &mut out, 3).expect("prompt");
        (confirmed, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn enter_confirms() {
        let (confirmed, out) = ask("\n");
        assert!(confirmed);
        assert_eq!(out, "Perform 3 operations? (Y/n): ");
    }

    #[test]
    fn answers_starting_with_y_confirm() {
        assert!(ask("yes\n").0);
        assert!(ask("Y\n").0);
        assert!(ask("yes\r\n").0);
        assert!(ask("\r\n").0);
    }

    #[test]
    fn whitespace_before_or_instead_of_an_answer_declines() {
        assert!(!ask(" y\n").0);
        assert!(!ask("   \n").0);
        assert!(!ask("\t\n").0);
    }

    #[test]
    fn other_answers_decline() {
        assert!(!ask("n\n").0);
        assert!(!ask("nope\n").0);
        assert!(!ask("sure\n").0);
    }

    #[test]
    fn end_of_input_declines() {
        let (confirmed, out) = ask("");
        assert!(!confirmed);
        assert!(out.ends_with('\n'));
    }
}
