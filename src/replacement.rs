use crate::exec::Match;
use crate::flags::is_flag_char;
use crate::{Error, Result};

/// Expands `$` references in a replacement template against one match.
///
/// `$$`, `$&`, `` $` ``, `$'`, `$n`/`$nn` and `${name}`/`${n}` are
/// recognised; any other `$` is literal. Groups that did not participate
/// expand to the empty string.
pub(crate) fn expand(template: &str, found: &Match<'_>) -> Result<String> {
    if !template.contains('$') {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        let consumed = expand_reference(tail, found, &mut out)?;
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Writes the expansion of the reference following a `$` and returns how
/// many bytes of `tail` it used.
fn expand_reference(tail: &str, found: &Match<'_>, out: &mut String) -> Result<usize> {
    let bytes = tail.as_bytes();
    let Some(&first) = bytes.first() else {
        out.push('$');
        return Ok(0);
    };

    match first {
        b'$' => {
            out.push('$');
            Ok(1)
        }
        b'&' => {
            out.push_str(found.as_str());
            Ok(1)
        }
        b'`' => {
            out.push_str(&found.input()[..found.index()]);
            Ok(1)
        }
        b'\'' => {
            out.push_str(&found.input()[found.end()..]);
            Ok(1)
        }
        b'{' => expand_braced(tail, found, out),
        b'0'..=b'9' => expand_numbered(bytes, found, out),
        _ => {
            out.push('$');
            Ok(0)
        }
    }
}

fn expand_braced(tail: &str, found: &Match<'_>, out: &mut String) -> Result<usize> {
    let Some(close) = tail.find('}') else {
        out.push('$');
        return Ok(0);
    };
    let name = &tail[1..close];
    if name.is_empty() || !name.chars().all(is_flag_char) {
        out.push('$');
        return Ok(0);
    }

    if name.bytes().all(|b| b.is_ascii_digit()) {
        let index = name
            .parse::<usize>()
            .ok()
            .filter(|&index| index <= found.group_count());
        let Some(index) = index else {
            return Err(Error::Syntax(format!(
                "backreference to undefined group ${{{name}}}"
            )));
        };
        out.push_str(found.get(index).unwrap_or(""));
    } else {
        if !found.has_group_name(name) {
            return Err(Error::Syntax(format!(
                "backreference to undefined group ${{{name}}}"
            )));
        }
        out.push_str(found.name(name).unwrap_or(""));
    }
    Ok(close + 1)
}

fn expand_numbered(bytes: &[u8], found: &Match<'_>, out: &mut String) -> Result<usize> {
    let groups = found.group_count();
    let first = usize::from(bytes[0] - b'0');
    let two_digit = bytes
        .get(1)
        .filter(|b| b.is_ascii_digit())
        .map(|b| first * 10 + usize::from(b - b'0'));

    if let Some(index) = two_digit.filter(|index| (1..=groups).contains(index)) {
        out.push_str(found.get(index).unwrap_or(""));
        return Ok(2);
    }
    if (1..=groups).contains(&first) {
        out.push_str(found.get(first).unwrap_or(""));
        return Ok(1);
    }
    // `$0` and `$00` never name a group and stay as written.
    if first == 0 && two_digit.unwrap_or(0) == 0 {
        let consumed = if two_digit.is_some() { 2 } else { 1 };
        out.push('$');
        out.push_str(std::str::from_utf8(&bytes[..consumed]).unwrap_or("0"));
        return Ok(consumed);
    }
    let written = match two_digit {
        Some(index) if first == 0 => format!("0{index}"),
        Some(index) => index.to_string(),
        None => first.to_string(),
    };
    Err(Error::Syntax(format!(
        "backreference to undefined group ${written}"
    )))
}
