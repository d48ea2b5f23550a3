//! Global keyboard hook code to symbolic key translation.
//!
//! The hook delivers X server key codes, which sit 8 above the kernel's
//! input event codes: top-row digits are 10–18, the command letters follow
//! the QWERTY rows (`r` = 27, `y` = 29, `g` = 42) and the numeric keypad is
//! 79–90.  The bill acceptor and the custom buttons report through the
//! keypad and top-row digits.

/// Translates a hook key code to its symbolic token.
///
/// Returns `None` if the code has no binding; callers may then fall back to
/// the OS-supplied key character.
pub fn code_to_symbol(code: u16) -> Option<&'static str> {
    match code {
        // Top-row digits
        10 => Some("1"),
        11 => Some("2"),
        12 => Some("3"),
        13 => Some("4"),
        14 => Some("5"),
        15 => Some("6"),
        16 => Some("7"),
        17 => Some("8"),
        18 => Some("9"),

        // Numeric keypad
        79 => Some("kp_7"),
        80 => Some("kp_8"),
        81 => Some("kp_9"),
        83 => Some("kp_4"),
        84 => Some("kp_5"),
        85 => Some("kp_6"),
        87 => Some("kp_1"),
        88 => Some("kp_2"),
        89 => Some("kp_3"),
        90 => Some("kp_0"),

        // Letters
        27 => Some("r"),
        29 => Some("y"),
        32 => Some("o"),
        41 => Some("f"),
        42 => Some("g"),
        44 => Some("j"),
        56 => Some("b"),

        20 => Some("-"),
        21 => Some("="),
        65 => Some(" "),
        111 => Some("up"),
        116 => Some("down"),
        133 => Some("super"),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_row_digits_map_to_digits() {
        for code in 10u16..=18 {
            let expected = (code - 9).to_string();
            assert_eq!(code_to_symbol(code), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_keypad_codes_map_to_kp_tokens() {
        let pairs = [
            (79, "kp_7"), (80, "kp_8"), (81, "kp_9"),
            (83, "kp_4"), (84, "kp_5"), (85, "kp_6"),
            (87, "kp_1"), (88, "kp_2"), (89, "kp_3"), (90, "kp_0"),
        ];
        for (code, expected) in pairs {
            assert_eq!(code_to_symbol(code), Some(expected), "code {code}");
        }
    }

    #[test]
    fn test_command_keys_use_x_keycodes() {
        let pairs = [
            (29, "y"), (42, "g"), (44, "j"), (27, "r"), (56, "b"), (41, "f"),
            (21, "="), (20, "-"), (65, " "), (111, "up"), (116, "down"),
            (32, "o"), (133, "super"),
        ];
        for (code, expected) in pairs {
            assert_eq!(code_to_symbol(code), Some(expected), "code {code}");
        }
    }

    #[test]
    fn test_kernel_event_codes_do_not_alias_command_keys() {
        // Kernel codes for y, g, j, b, f land on other X keys.
        assert_eq!(code_to_symbol(33), None); // X "p"
        assert_eq!(code_to_symbol(34), None); // X "bracketleft"
        assert_eq!(code_to_symbol(36), None); // X Return
        assert_eq!(code_to_symbol(48), None); // X "apostrophe"
        assert_eq!(code_to_symbol(103), None);
        assert_eq!(code_to_symbol(125), None);
    }

    #[test]
    fn test_low_codes_are_unbound() {
        for code in 0u16..=9 {
            assert_eq!(code_to_symbol(code), None, "code {code}");
        }
    }

    #[test]
    fn test_keypad_gaps_are_unbound() {
        assert_eq!(code_to_symbol(82), None);
        assert_eq!(code_to_symbol(86), None);
    }
}
