// config.rs

/// Longest line the editor will accept, including the terminator slot.
pub const MAX_LINE_LENGTH: usize = 1024;
/// Argument slots per command, including the terminator slot.
pub const MAX_ARGS: usize = 64;
/// Number of commands kept for recall.
pub const HISTORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_line_length: usize,
    pub max_args: usize,
    pub history_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
            max_args: MAX_ARGS,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}
