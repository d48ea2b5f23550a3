//! Linux input event code to symbolic key translation.
//!
//! Codes come from `linux/input-event-codes.h` (`KEY_1 = 2`, `KEY_Y = 21`,
//! `KEY_LEFTMETA = 125`, …).  The table only covers keys the terminal
//! hardware actually produces.
//!
//! The bill acceptor reports its keypad pulses in the hardware slots 79–85,
//! one slot per denomination key, so those codes are bound to `kp_1`…`kp_7`
//! rather than to the standard keypad layout.

/// Translates a Linux input event code to its symbolic token.
///
/// Returns `None` if the code has no binding on this terminal.
pub fn code_to_symbol(code: u16) -> Option<&'static str> {
    match code {
        // Top-row digits (KEY_1..KEY_7)
        2 => Some("1"),
        3 => Some("2"),
        4 => Some("3"),
        5 => Some("4"),
        6 => Some("5"),
        7 => Some("6"),
        8 => Some("7"),

        // Bill acceptor keypad slots
        79 => Some("kp_1"),
        80 => Some("kp_2"),
        81 => Some("kp_3"),
        82 => Some("kp_4"),
        83 => Some("kp_5"),
        84 => Some("kp_6"),
        85 => Some("kp_7"),

        // Command letters
        21 => Some("y"), // KEY_Y
        34 => Some("g"), // KEY_G
        36 => Some("j"), // KEY_J
        19 => Some("r"), // KEY_R
        48 => Some("b"), // KEY_B
        33 => Some("f"), // KEY_F

        // Bet and game keys
        13 => Some("="),  // KEY_EQUAL
        12 => Some("-"),  // KEY_MINUS
        57 => Some(" "),  // KEY_SPACE
        103 => Some("up"), // KEY_UP
        24 => Some("o"),  // KEY_O

        125 => Some("super"), // KEY_LEFTMETA

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUND: &[(u16, &str)] = &[
        (2, "1"), (3, "2"), (4, "3"), (5, "4"), (6, "5"), (7, "6"), (8, "7"),
        (79, "kp_1"), (80, "kp_2"), (81, "kp_3"), (82, "kp_4"),
        (83, "kp_5"), (84, "kp_6"), (85, "kp_7"),
        (21, "y"), (34, "g"), (36, "j"), (19, "r"), (48, "b"), (33, "f"),
        (13, "="), (12, "-"), (57, " "), (103, "up"), (24, "o"),
        (125, "super"),
    ];

    #[test]
    fn test_all_bound_codes_map_to_expected_symbol() {
        for &(code, expected) in BOUND {
            assert_eq!(
                code_to_symbol(code),
                Some(expected),
                "code_to_symbol({code}) should return {expected:?}"
            );
        }
    }

    #[test]
    fn test_top_row_and_keypad_seven_are_distinct() {
        assert_eq!(code_to_symbol(8), Some("7"));
        assert_eq!(code_to_symbol(85), Some("kp_7"));
    }

    #[test]
    fn test_unbound_codes_return_none() {
        for code in [0u16, 1, 9, 10, 11, 30, 86, 104, 124, 126, 999] {
            assert_eq!(code_to_symbol(code), None, "code {code} should be unbound");
        }
    }
}
