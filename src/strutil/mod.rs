//! Pure string utilities: name sanitization, color handling, escape
//! decoding and word wrapping. All functions return new values with
//! explicit truncation contracts; nothing here touches match state.

/// Hard cap for any single wire-visible string.
pub const MAX_STRING_CHARS: usize = 1024;
/// Maximum length of a sanitized player name.
pub const MAX_NAME_LENGTH: usize = 32;
/// Maximum chat message length accepted from a client.
pub const MAX_SAY_TEXT: usize = 150;

/// Color escape character, `^` followed by a color digit.
pub const COLOR_ESCAPE: char = '^';

/// Color code characters used when composing display names.
pub mod color {
    pub const RED: char = '1';
    pub const GREEN: char = '2';
    pub const YELLOW: char = '3';
    pub const BLUE: char = '4';
    pub const CYAN: char = '5';
    pub const MAGENTA: char = '6';
    pub const WHITE: char = '7';
}

/// True when the characters at `i` open a color sequence (`^` followed by
/// any character other than another `^`).
fn is_color_seq(chars: &[char], i: usize) -> bool {
    chars[i] == COLOR_ESCAPE && i + 1 < chars.len() && chars[i + 1] != COLOR_ESCAPE
}

/// Normalize a name or search token for matching: strips color codes and
/// control characters, drops leading and trailing whitespace, lowercases.
/// Output is truncated to `max_len` characters.
pub fn sanitize(input: &str, max_len: usize) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut leading = true;
    let mut i = 0;

    while i < chars.len() && out.chars().count() < max_len {
        let c = chars[i];
        if c == ' ' && leading {
            i += 1;
            continue;
        }
        if is_color_seq(&chars, i) {
            i += 2;
            continue;
        }
        if (c as u32) < 32 {
            i += 1;
            continue;
        }
        leading = false;
        out.extend(c.to_lowercase());
        i += 1;
    }

    out.trim_end_matches(' ').to_string()
}

/// Strip color sequences without any other normalization. Both the `^`
/// escape and the raw 0x1b escape byte swallow the following character.
pub fn decolor(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == COLOR_ESCAPE || chars[i] as u32 == 27 {
            i += 2;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Decode backslash escapes in console-originated text: `\\` becomes a
/// single backslash and `\n` a newline; any other `\x` pair is kept as-is.
pub fn decode_escapes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            match chars[i + 1] {
                '\\' => {
                    out.push('\\');
                    i += 2;
                    continue;
                }
                'n' => {
                    out.push('\n');
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Wrap text to `max_width` visible columns. Color sequences do not count
/// towards the width and the active color is re-opened at the start of
/// every wrapped line. A space within ten columns of the limit becomes a
/// break when no closer break is coming. Output is truncated to
/// [`MAX_STRING_CHARS`] characters.
pub fn word_wrap(input: &str, max_width: usize) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut line_len = 0usize;
    let mut current_color = color::WHITE;
    let mut j = 0;

    while j < chars.len() {
        if out.chars().count() >= MAX_STRING_CHARS - 1 {
            break;
        }

        // re-open the active color on a fresh wrapped line
        if line_len == 0 && out.ends_with('\n') && !is_color_seq(&chars, j) {
            out.push(COLOR_ESCAPE);
            out.push(current_color);
        }

        let c = chars[j];
        if line_len >= max_width {
            out.push('\n');
            line_len = 0;
            continue;
        }

        if c == '\n' {
            out.push(c);
            line_len = 0;
            j += 1;
            continue;
        }

        if is_color_seq(&chars, j) {
            current_color = chars[j + 1];
            out.push(c);
            out.push(chars[j + 1]);
            j += 2;
            continue;
        }

        if c == ' ' && line_len + 10 >= max_width {
            let lookahead = max_width - line_len;
            let coming = chars[j + 1..]
                .iter()
                .take(lookahead)
                .any(|&k| k == ' ' || k == '\n');
            if !coming {
                out.push('\n');
                line_len = 0;
                j += 1;
                continue;
            }
        }

        out.push(c);
        line_len += 1;
        j += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_colors_and_case() {
        assert_eq!(sanitize("^1Foo^7Bar", MAX_NAME_LENGTH), "foobar");
    }

    #[test]
    fn sanitize_trims_whitespace_but_keeps_inner() {
        assert_eq!(sanitize("  Big Cat  ", MAX_NAME_LENGTH), "big cat");
    }

    #[test]
    fn sanitize_drops_control_bytes() {
        assert_eq!(sanitize("a\x01b\x1fc", MAX_NAME_LENGTH), "abc");
    }

    #[test]
    fn sanitize_double_caret_is_literal() {
        // ^^ is not a color sequence; the first ^ survives, the second
        // opens a sequence with the following char
        assert_eq!(sanitize("^^2x", MAX_NAME_LENGTH), "^x");
    }

    #[test]
    fn sanitize_respects_max_len() {
        assert_eq!(sanitize("abcdef", 3), "abc");
    }

    #[test]
    fn decolor_removes_escape_pairs() {
        assert_eq!(decolor("^3warn^7ing"), "warning");
        assert_eq!(decolor("\x1b7plain"), "plain");
    }

    #[test]
    fn decode_escape_sequences() {
        assert_eq!(decode_escapes("a\\nb"), "a\nb");
        assert_eq!(decode_escapes("c:\\\\path"), "c:\\path");
        assert_eq!(decode_escapes("odd\\q"), "odd\\q");
    }

    #[test]
    fn wrap_breaks_long_lines() {
        let wrapped = word_wrap("aaaa bbbb cccc dddd", 10);
        for line in wrapped.lines() {
            assert!(decolor(line).chars().count() <= 10, "line too wide: {line:?}");
        }
    }

    #[test]
    fn wrap_reopens_color_after_break() {
        let wrapped = word_wrap("^2aaaaaaaaaa bbbb", 10);
        let second = wrapped.lines().nth(1).expect("expected a wrapped line");
        assert!(second.starts_with("^2"), "color not carried: {second:?}");
    }

    #[test]
    fn wrap_output_is_bounded() {
        let long = "x".repeat(4 * MAX_STRING_CHARS);
        assert!(word_wrap(&long, 50).chars().count() < MAX_STRING_CHARS);
    }
}
