use std::io::{BufRead, Write};

use crate::error::{DatasetError, Result};

pub const NAME_PROMPT: &str = "Enter the person's name: ";
pub const EMPTY_NAME_MESSAGE: &str = "Name cannot be empty. Please try again.";

/// Longest accepted name in bytes. Photo names add role, ordinal, timestamp
/// and suffix to it and must stay under the 255-byte file name limit.
pub const MAX_NAME_BYTES: usize = 200;

/// Trims the name and replaces whitespace and path separators with `_` so it
/// is safe to use as a directory and file name component.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

fn read_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    let n = input.read_line(&mut line).map_err(DatasetError::Console)?;
    if n == 0 {
        return Err(DatasetError::InputClosed);
    }
    Ok(line)
}

/// Asks for the subject name until a non-blank one is entered.
pub fn prompt_subject_name<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    loop {
        write!(output, "{}", NAME_PROMPT).map_err(DatasetError::Console)?;
        output.flush().map_err(DatasetError::Console)?;

        let name = normalize_name(&read_line(input)?);
        if name.is_empty() || name.chars().all(|c| c == '_' || c == '.') {
            writeln!(output, "{}", EMPTY_NAME_MESSAGE).map_err(DatasetError::Console)?;
            continue;
        }
        if name.len() > MAX_NAME_BYTES {
            writeln!(
                output,
                "Name is too long ({} bytes, at most {}). Please try again.",
                name.len(), MAX_NAME_BYTES
            )
            .map_err(DatasetError::Console)?;
            continue;
        }

        writeln!(output, "Name set to: {}", name).map_err(DatasetError::Console)?;
        return Ok(name);
    }
}

/// Yes/no question; only `y` or `yes` (any case) counts as yes.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    write!(output, "{} (y/n): ", question).map_err(DatasetError::Console)?;
    output.flush().map_err(DatasetError::Console)?;

    let answer = read_line(input)?.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Blocks until the user presses ENTER.
pub fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<()> {
    write!(output, "{}", message).map_err(DatasetError::Console)?;
    output.flush().map_err(DatasetError::Console)?;
    read_line(input).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[test]
    fn blank_names_are_reprompted() {
        let mut input = Cursor::new("\n   \nAna\n");
        let mut output = Vec::new();

        let name = prompt_subject_name(&mut input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(text.matches(NAME_PROMPT).count(), 3);
        assert_eq!(text.matches(EMPTY_NAME_MESSAGE).count(), 2);
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut input = Cursor::new("  \n");
        let mut output = Vec::new();

        let err = prompt_subject_name(&mut input, &mut output).unwrap_err();
        assert!(matches!(err, DatasetError::InputClosed));
    }

    #[rstest]
    #[case::plain("Ana", "Ana")]
    #[case::padded("  Ana  ", "Ana")]
    #[case::spaces("Ana  Maria Lopez", "Ana_Maria_Lopez")]
    #[case::separators("../etc/passwd", ".._etc_passwd")]
    #[case::accents("José", "José")]
    fn names_are_normalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(raw), expected);
    }

    #[test]
    fn overlong_names_are_reprompted() {
        let long = "a".repeat(240);
        let mut input = Cursor::new(format!("{}\nAna\n", long));
        let mut output = Vec::new();

        let name = prompt_subject_name(&mut input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(name, "Ana");
        assert_eq!(text.matches(NAME_PROMPT).count(), 2);
        assert!(text.contains("too long"));
    }

    #[test]
    fn longest_accepted_name_still_saves_a_photo() {
        use crate::naming::{unique_photo_path, PhotoRole};
        use chrono::Local;

        let name = "é".repeat(MAX_NAME_BYTES / 2);
        let mut input = Cursor::new(format!("{}\n", name));
        let mut output = Vec::new();
        let name = prompt_subject_name(&mut input, &mut output).unwrap();
        assert_eq!(name.len(), MAX_NAME_BYTES);

        let dir = tempfile::tempdir().unwrap();
        let path = unique_photo_path(dir.path(), &name, PhotoRole::Frontal, 12, &Local::now());
        std::fs::write(&path, b"").unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn dot_only_names_are_rejected() {
        let mut input = Cursor::new("..\nBo\n");
        let mut output = Vec::new();
        assert_eq!(prompt_subject_name(&mut input, &mut output).unwrap(), "Bo");
    }

    #[rstest]
    #[case::yes("y\n", true)]
    #[case::yes_word("YES\n", true)]
    #[case::no("n\n", false)]
    #[case::empty("\n", false)]
    fn confirm_accepts_only_yes(#[case] answer: &str, #[case] expected: bool) {
        let mut input = Cursor::new(answer);
        let mut output = Vec::new();
        assert_eq!(confirm(&mut input, &mut output, "Continue anyway?").unwrap(), expected);
        assert!(String::from_utf8(output).unwrap().contains("Continue anyway? (y/n): "));
    }
}
