//! Parsers for the protobuf text blocks printed by `gz topic -e`.

use shared::bus::ImageCallback;
use shared::ImageFrame;
use std::io::BufRead;

/// Extract a named joint's first `position:` scalar from a joint-state
/// block.
///
/// Scans the way the operator one-liner did: find the line naming the
/// joint, then take the value of the next `position:` line. Returns `None`
/// for missing joints and unparseable values.
pub fn joint_position(output: &str, joint: &str) -> Option<f64> {
    let needle = format!("name: \"{joint}\"");
    let mut in_joint = false;
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.contains(needle.as_str()) {
            in_joint = true;
            continue;
        }
        if in_joint {
            if let Some(rest) = trimmed.strip_prefix("position:") {
                return rest.trim().parse().ok();
            }
        }
    }
    None
}

/// Decode one image message block into a frame.
///
/// Only `RGB_INT8` (or unstated) pixel formats are accepted. String
/// continuation lines after `data:` are concatenated, since the text
/// printer splits long byte strings across lines.
pub fn parse_image_block(block: &str) -> Option<ImageFrame> {
    let mut width = None;
    let mut height = None;
    let mut data = None;

    let mut lines = block.lines().peekable();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("width:") {
            width = rest.trim().parse::<usize>().ok();
        } else if let Some(rest) = trimmed.strip_prefix("height:") {
            height = rest.trim().parse::<usize>().ok();
        } else if let Some(rest) = trimmed.strip_prefix("pixel_format_type:") {
            if rest.trim() != "RGB_INT8" {
                return None;
            }
        } else if let Some(rest) = trimmed.strip_prefix("data:") {
            let mut bytes = unescape_bytes(rest.trim())?;
            while let Some(next) = lines.peek() {
                let continuation = next.trim();
                if !continuation.starts_with('"') {
                    break;
                }
                bytes.extend(unescape_bytes(continuation)?);
                lines.next();
            }
            data = Some(bytes);
        }
    }

    Some(ImageFrame::new(width?, height?, data?))
}

/// Feed an echo stream through `callback`, one decoded frame per message
/// block. Blocks are terminated by a blank line at brace depth zero.
/// Undecodable blocks are dropped.
pub fn pump_image_stream<R: BufRead>(reader: R, topic: &str, callback: &ImageCallback) {
    let mut block = String::new();
    let mut depth = 0i32;

    let mut deliver = |block: &str| match parse_image_block(block) {
        Some(frame) => callback(&frame),
        None => log::debug!("undecodable message on {topic}"),
    };

    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if depth == 0 && line.trim().is_empty() {
            if !block.is_empty() {
                deliver(&block);
                block.clear();
            }
            continue;
        }
        depth += brace_delta(&line);
        block.push_str(&line);
        block.push('\n');
    }
    if !block.is_empty() {
        deliver(&block);
    }
}

/// Net brace depth change of one line, ignoring braces inside quoted
/// strings.
fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => delta += 1,
            '}' if !in_string => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Decode the quoted, C-escaped byte string of a `data:` field.
///
/// Handles the escapes the protobuf text printer emits: the named ones,
/// octal up to three digits and hex up to two.
fn unescape_bytes(field: &str) -> Option<Vec<u8>> {
    let start = field.find('"')?;
    let end = field.rfind('"')?;
    if end <= start {
        return None;
    }

    let inner = field.as_bytes().get(start + 1..end)?;
    let mut bytes = Vec::with_capacity(inner.len());
    let mut input = inner.iter().copied().peekable();

    while let Some(b) = input.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match input.next()? {
            b'n' => bytes.push(b'\n'),
            b'r' => bytes.push(b'\r'),
            b't' => bytes.push(b'\t'),
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b'f' => bytes.push(0x0c),
            b'v' => bytes.push(0x0b),
            b'\\' => bytes.push(b'\\'),
            b'\'' => bytes.push(b'\''),
            b'"' => bytes.push(b'"'),
            b'x' | b'X' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    let Some(&c) = input.peek() else { break };
                    let Some(d) = (c as char).to_digit(16) else {
                        break;
                    };
                    input.next();
                    value = value * 16 + d;
                    digits += 1;
                }
                if digits == 0 {
                    return None;
                }
                bytes.push(value as u8);
            }
            d @ b'0'..=b'7' => {
                let mut value = (d - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    let Some(&c) = input.peek() else { break };
                    if !c.is_ascii_digit() || c > b'7' {
                        break;
                    }
                    input.next();
                    value = value * 8 + (c - b'0') as u32;
                    digits += 1;
                }
                if value > 0xff {
                    return None;
                }
                bytes.push(value as u8);
            }
            _ => return None,
        }
    }
    Some(bytes)
}
