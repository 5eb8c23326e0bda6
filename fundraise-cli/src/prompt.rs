use anyhow::Context;
use fundraise_contract_clients::FundraiseError;
use std::io::{self, BufRead, Write};

/// Ask before submitting a transaction. Anything but "y"/"yes" declines.
pub fn confirm(question: &str, assume_yes: bool) -> Result<(), FundraiseError> {
    if assume_yes {
        return Ok(());
    }
    let stdin = io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut io::stderr())
}

fn confirm_with<R: BufRead, W: Write>(
    question: &str,
    input: &mut R,
    output: &mut W,
) -> Result<(), FundraiseError> {
    write!(output, "{question} [y/N] ").context("failed to write prompt")?;
    output.flush().context("failed to write prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;

    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(FundraiseError::UserRejected(
            "transaction declined at the confirmation prompt".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> Result<(), FundraiseError> {
        let mut output = Vec::new();
        let result = confirm_with("Send?", &mut text.as_bytes(), &mut output);
        assert_eq!(String::from_utf8(output).unwrap(), "Send? [y/N] ");
        result
    }

    #[test]
    fn test_yes_answers() {
        assert!(answer("y\n").is_ok());
        assert!(answer("YES\n").is_ok());
    }

    #[test]
    fn test_anything_else_is_rejection() {
        for text in ["\n", "n\n", "nope\n", ""] {
            assert!(matches!(answer(text), Err(FundraiseError::UserRejected(_))));
        }
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        assert!(confirm("Send?", true).is_ok());
    }
}
