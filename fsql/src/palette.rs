//! Terminal styles, named after what they mark. Colours are catppuccin mocha.

/// SQL keywords.
pub const KEYWORD: &str = "\x1b[38;2;250;179;135m";
/// String literals.
pub const LITERAL: &str = "\x1b[38;2;249;226;175m";
/// Backslash commands.
pub const COMMAND: &str = "\x1b[38;2;203;166;247m";
pub const ERROR: &str = "\x1b[38;2;243;139;168m";
pub const WARNING: &str = "\x1b[38;2;249;226;175m";
pub const OK: &str = "\x1b[38;2;166;227;161m";
pub const TIMING: &str = "\x1b[38;2;137;180;250m";
/// Page status lines.
pub const STATUS: &str = "\x1b[38;2;166;173;200m";

pub const HEADING: &str = "\x1b[1m";
pub const RESET: &str = "\x1b[0m";
