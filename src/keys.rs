// Key decoding: raw console bytes -> key class -> velocity intent
//
// Arrow keys arrive as escape sequences (ESC [ A, or ESC O A in application
// cursor mode, with optional modifier parameters such as ESC [ 1 ; 5 A).
// The whole sequence is parsed so that a bare 'A' typed by the operator is
// not mistaken for an arrow.

use crate::messages::VelocityIntent;

const ESC: u8 = 0x1b;

/// Key classes the teleop distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Other,
}

/// Map a key to its unscaled intent. Unrecognized keys mean "no motion".
pub fn decode(key: Key) -> VelocityIntent {
    match key {
        Key::Up => VelocityIntent::FORWARD,
        Key::Down => VelocityIntent::BACKWARD,
        Key::Left => VelocityIntent::TURN_LEFT,
        Key::Right => VelocityIntent::TURN_RIGHT,
        Key::Other => VelocityIntent::STOP,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParseState {
    #[default]
    Ground,
    // Saw ESC
    Escape,
    // Saw ESC [ or ESC O, waiting for the final byte
    Sequence,
}

/// Byte-at-a-time escape sequence parser
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: ParseState,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns `None` while inside an escape sequence.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            ParseState::Ground => {
                if byte == ESC {
                    self.state = ParseState::Escape;
                    None
                } else {
                    Some(Key::Other)
                }
            }
            ParseState::Escape => match byte {
                b'[' | b'O' => {
                    self.state = ParseState::Sequence;
                    None
                }
                // ESC ESC: the first one was a lone Escape key press
                ESC => Some(Key::Other),
                _ => {
                    self.state = ParseState::Ground;
                    Some(Key::Other)
                }
            },
            ParseState::Sequence => match byte {
                // parameter and intermediate bytes
                0x20..=0x3f => None,
                0x40..=0x7e => {
                    self.state = ParseState::Ground;
                    Some(match byte {
                        b'A' => Key::Up,
                        b'B' => Key::Down,
                        b'C' => Key::Right,
                        b'D' => Key::Left,
                        _ => Key::Other,
                    })
                }
                ESC => {
                    self.state = ParseState::Escape;
                    Some(Key::Other)
                }
                _ => {
                    self.state = ParseState::Ground;
                    Some(Key::Other)
                }
            },
        }
    }

    /// Feed one byte and map the result to an intent; never fails
    pub fn decode_byte(&mut self, byte: u8) -> VelocityIntent {
        self.feed(byte).map(decode).unwrap_or(VelocityIntent::STOP)
    }

    /// True while a partial escape sequence is buffered
    pub fn in_sequence(&self) -> bool {
        self.state != ParseState::Ground
    }
}
