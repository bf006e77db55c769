use crate::error::Error;

/// Reply categories keyed by the leading digit of the code (RFC 959 §4.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// 1xx, the command was accepted and a data transfer is about to start
    PositivePreliminary,
    /// 2xx, the command finished successfully
    PositiveCompletion,
    /// 3xx, the command was accepted but needs a follow-up command
    PositiveIntermediate,
    /// 4xx, the command failed but may succeed if repeated
    TransientNegative,
    /// 5xx, the command failed
    PermanentNegative,
}

/// One complete reply from the control channel.
///
/// Multi-line replies are reassembled into a single message with the
/// code prefixes stripped and the lines joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        match self.code / 100 {
            1 => ReplyKind::PositivePreliminary,
            2 => ReplyKind::PositiveCompletion,
            3 => ReplyKind::PositiveIntermediate,
            4 => ReplyKind::TransientNegative,
            _ => ReplyKind::PermanentNegative,
        }
    }
}

fn leading_code(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }

    Some(
        bytes[..3]
            .iter()
            .fold(0, |code, digit| code * 10 + u16::from(digit - b'0')),
    )
}

fn malformed(line: &str) -> Error {
    Error::Protocol(format!("malformed reply line: {line:?}"))
}

/// Splits the opening line of a reply into its code, a flag telling
/// whether the reply is complete and the message text. A space after
/// the code terminates the reply, a dash announces continuation lines.
pub(crate) fn parse_lead_line(line: &str) -> Result<(u16, bool, &str), Error> {
    let bytes = line.as_bytes();
    let code = leading_code(bytes)
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| malformed(line))?;

    match bytes.get(3) {
        None => Ok((code, true, "")),
        Some(b' ') => Ok((code, true, &line[4..])),
        Some(b'-') => Ok((code, false, &line[4..])),
        Some(_) => Err(malformed(line)),
    }
}

/// Classifies a follow-up line of a multi-line reply. Only a line
/// repeating the opening code followed by a space terminates the
/// reply; everything else is message text.
pub(crate) fn parse_continuation_line(code: u16, line: &str) -> (bool, &str) {
    if leading_code(line.as_bytes()) == Some(code) {
        match line.as_bytes().get(3) {
            Some(b' ') => return (true, &line[4..]),
            Some(b'-') => return (false, &line[4..]),
            _ => {}
        }
    }

    (false, line)
}
