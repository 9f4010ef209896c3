use std::fmt;

/// A 32-bit result word as returned to guest software.
///
/// ```text
///  31   27 26     21 20  18 17       10 9           0
/// ┌───────┬─────────┬──────┬───────────┬─────────────┐
/// │ level │ summary │  --  │  module   │ description │
/// └───────┴─────────┴──────┴───────────┴─────────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub u32);

impl ResultCode {
    /// The operation completed.
    pub const SUCCESS: ResultCode = ResultCode(0);

    /// Raw result word.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether the word is the all-zero success value.
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Whether the level field marks the word as a failure.
    pub const fn is_error(self) -> bool {
        (self.0 as i32) < 0
    }

    pub const fn description(self) -> u32 {
        self.0 & 0x3FF
    }

    pub const fn module(self) -> u32 {
        (self.0 >> 10) & 0xFF
    }

    pub const fn summary(self) -> u32 {
        (self.0 >> 21) & 0x3F
    }

    pub const fn level(self) -> u32 {
        self.0 >> 27
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode(0x{:08X})", self.0)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X} (level {}, summary {}, module {}, description {})",
            self.0,
            self.level(),
            self.summary(),
            self.module(),
            self.description()
        )
    }
}
