//! Per-target display settings.

use crate::Profile;

/// How a submitted command is echoed into the scrollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStyle {
    /// The engine has already printed `>`, so only a space is added.
    LeadingSpace,
    /// The display shows no engine prompt; echo with `"> "`.
    Prompt,
}

impl EchoStyle {
    pub fn echo(self, command: &str) -> String {
        match self {
            EchoStyle::LeadingSpace => format!(" {}\n", command),
            EchoStyle::Prompt => format!("> {}\n", command),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayProfile {
    pub name: Profile,
    /// Hard cap on scrollback size, in bytes.
    pub scrollback_cap: usize,
    /// Lines of history kept behind the current story output.
    pub min_scrollback_lines: usize,
    pub echo: EchoStyle,
}

impl DisplayProfile {
    pub fn for_target(target: Profile) -> Self {
        let (scrollback_cap, min_scrollback_lines, echo) = match target {
            Profile::Desktop => (16384, 20, EchoStyle::LeadingSpace),
            Profile::Rt1050 => (4096, 10, EchoStyle::Prompt),
            Profile::Rt1170 | Profile::Rt1170Scaled => (16384, 20, EchoStyle::Prompt),
        };
        Self {
            name: target,
            scrollback_cap,
            min_scrollback_lines,
            echo,
        }
    }
}
