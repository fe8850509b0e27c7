use blockvfs::VfsError;
use thiserror::Error;

/// One line of input, ready to run against a file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Create(String),
    Ls,
    Write { name: String, data: Vec<u8> },
    Read(String),
    Delete(String),
    Rmdir(String),
    Cd(String),
    Pwd,
    Df,
    Exit,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Usage(#[from] VfsError),
}

fn required<'a>(
    tokens: &mut impl Iterator<Item = &'a [u8]>,
    usage: &'static str,
) -> Result<String, VfsError> {
    tokens
        .next()
        .map(|token| String::from_utf8_lossy(token).into_owned())
        .ok_or(VfsError::InvalidUsage { usage })
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Splits off the first whitespace-delimited token.
fn split_token(bytes: &[u8]) -> (&[u8], &[u8]) {
    let end = bytes
        .iter()
        .position(u8::is_ascii_whitespace)
        .unwrap_or(bytes.len());
    bytes.split_at(end)
}

/// Parses a single input line. Blank lines parse to `None`.
///
/// Lines are raw bytes: verbs and names are decoded for display, `write`
/// payloads are kept byte for byte.
pub fn parse(line: &[u8]) -> Result<Option<Command>, ParseError> {
    let (verb, rest) = split_token(trim_start(line));
    if verb.is_empty() {
        return Ok(None);
    }
    let mut tokens = rest
        .split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty());

    let command = match verb {
        b"mkdir" => Command::Mkdir(required(&mut tokens, "mkdir <name>")?),
        b"create" => Command::Create(required(&mut tokens, "create <name>")?),
        b"ls" => Command::Ls,
        b"write" => parse_write(rest)?,
        b"read" => Command::Read(required(&mut tokens, "read <name>")?),
        b"delete" => Command::Delete(required(&mut tokens, "delete <name>")?),
        b"rmdir" => Command::Rmdir(required(&mut tokens, "rmdir <name>")?),
        b"cd" => Command::Cd(required(&mut tokens, "cd <dir>")?),
        b"pwd" => Command::Pwd,
        b"df" => Command::Df,
        b"exit" => Command::Exit,
        unknown => {
            return Err(ParseError::UnknownCommand(
                String::from_utf8_lossy(unknown).into_owned(),
            ))
        }
    };
    Ok(Some(command))
}

/// `rest` is everything after the `write` verb: a file name, then the payload
/// running to the end of the line.
fn parse_write(rest: &[u8]) -> Result<Command, VfsError> {
    let (name, payload) = split_token(trim_start(rest));
    if name.is_empty() {
        return Err(VfsError::InvalidUsage {
            usage: "write <name> <data>",
        });
    }

    let payload = trim_start(payload);
    let payload = payload.strip_suffix(b"\n").unwrap_or(payload);
    let data = expand_newlines(strip_quotes(payload));

    Ok(Command::Write {
        name: String::from_utf8_lossy(name).into_owned(),
        data,
    })
}

/// Drops one pair of matching single or double quotes around `s`.
fn strip_quotes(s: &[u8]) -> &[u8] {
    match s {
        [first, inner @ .., last] if first == last && (*first == b'"' || *first == b'\'') => {
            inner
        }
        _ => s,
    }
}

/// `\n` is the only escape understood.
fn expand_newlines(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s[i] == b'\\' && s.get(i + 1) == Some(&b'n') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(s[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_of(line: &[u8]) -> (String, Vec<u8>) {
        match parse(line).unwrap() {
            Some(Command::Write { name, data }) => (name, data),
            other => panic!("expected write, got {:?}", other),
        }
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert_eq!(parse(b"").unwrap(), None);
        assert_eq!(parse(b"   \t\n").unwrap(), None);
    }

    #[test]
    fn parses_single_name_commands() {
        assert_eq!(
            parse(b"  mkdir docs\n").unwrap(),
            Some(Command::Mkdir("docs".into()))
        );
        assert_eq!(
            parse(b"cd ..").unwrap(),
            Some(Command::Cd("..".into()))
        );
        assert_eq!(
            parse(b"read a extra tokens").unwrap(),
            Some(Command::Read("a".into()))
        );
        assert_eq!(parse(b"df").unwrap(), Some(Command::Df));
        assert_eq!(parse(b"exit\n").unwrap(), Some(Command::Exit));
    }

    #[test]
    fn missing_name_is_a_usage_error() {
        match parse(b"mkdir").unwrap_err() {
            ParseError::Usage(VfsError::InvalidUsage { usage }) => {
                assert_eq!(usage, "mkdir <name>")
            }
            err => panic!("unexpected error: {:?}", err),
        }
        assert!(parse(b"write").is_err());
        assert!(parse(b"cd   ").is_err());
    }

    #[test]
    fn unknown_verb_is_reported() {
        match parse(b"format c:").unwrap_err() {
            ParseError::UnknownCommand(verb) => assert_eq!(verb, "format"),
            err => panic!("unexpected error: {:?}", err),
        }
        assert_eq!(
            parse(b"LS").unwrap_err().to_string(),
            "Unknown command: LS"
        );
    }

    #[test]
    fn write_takes_rest_of_line_as_payload() {
        let (name, data) = write_of(b"write notes hello   big world\n");
        assert_eq!(name, "notes");
        assert_eq!(data, b"hello   big world");
    }

    #[test]
    fn write_strips_matching_quotes() {
        assert_eq!(write_of(b"write f \"quoted text\"").1, b"quoted text");
        assert_eq!(write_of(b"write f 'single'").1, b"single");
        assert_eq!(write_of(b"write f \"mismatched'").1, b"\"mismatched'");
        assert_eq!(write_of(b"write f \"").1, b"\"");
    }

    #[test]
    fn write_expands_only_newline_escapes() {
        assert_eq!(write_of(br"write f line1\nline2\t").1, b"line1\nline2\\t");
        assert_eq!(write_of(br#"write f "a\nb""#).1, b"a\nb");
    }

    #[test]
    fn write_without_payload_is_empty() {
        assert_eq!(write_of(b"write f\n").1, b"");
        assert_eq!(write_of(b"write f \"\"").1, b"");
    }

    #[test]
    fn write_keeps_carriage_return_before_newline() {
        assert_eq!(write_of(b"write f data\r\n").1, b"data\r");
    }

    #[test]
    fn write_payload_is_not_decoded() {
        let (name, data) = write_of(b"write f \xff\xfe\\na\n");
        assert_eq!(name, "f");
        assert_eq!(data, [0xff, 0xfe, b'\n', b'a']);
    }

    #[test]
    fn invalid_utf8_verb_is_reported_lossily() {
        assert_eq!(
            parse(b"\xffls").unwrap_err().to_string(),
            "Unknown command: \u{fffd}ls"
        );
    }
}
