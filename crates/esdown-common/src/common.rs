//! Common enums shared between the emitter options and the printer.

use serde::{Deserialize, Serialize};

/// Line terminator used by the printer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewLineKind {
    #[default]
    #[serde(alias = "lf")]
    LineFeed,
    #[serde(alias = "crlf")]
    CarriageReturnLineFeed,
}

impl NewLineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NewLineKind::LineFeed => "\n",
            NewLineKind::CarriageReturnLineFeed => "\r\n",
        }
    }
}
