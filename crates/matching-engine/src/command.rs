//! Commands consumed by the engine

use serde::Serialize;

use crate::domain::{MarketId, OrderId, Price, Qty, Seq, Side};

/// Discriminator of [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    PlaceLimit,
    Cancel,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::PlaceLimit => "PLACE_LIMIT",
            CommandKind::Cancel => "CANCEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLACE_LIMIT" => Some(CommandKind::PlaceLimit),
            "CANCEL" => Some(CommandKind::Cancel),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command payload, one variant per kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    PlaceLimit {
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
    },
    #[serde(rename_all = "camelCase")]
    Cancel { order_id: OrderId },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::PlaceLimit { .. } => CommandKind::PlaceLimit,
            Command::Cancel { .. } => CommandKind::Cancel,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            Command::PlaceLimit { order_id, .. } | Command::Cancel { order_id } => order_id,
        }
    }
}

/// Command as produced by the intake side and read from the command log
///
/// `command_id` is a correlation token only; the book never dedups on it.
/// `seq` is the upstream-assigned book sequence. When absent the engine
/// assigns the next sequence itself, which makes redelivery after a crash
/// re-apply the command instead of rejecting it as stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    pub command_id: String,
    pub market: MarketId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<Seq>,
    #[serde(flatten)]
    pub command: Command,
}

impl CommandEnvelope {
    pub fn new(command_id: impl Into<String>, market: impl Into<MarketId>, command: Command) -> Self {
        Self {
            command_id: command_id.into(),
            market: market.into(),
            seq: None,
            command,
        }
    }

    pub fn with_seq(mut self, seq: Seq) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.command.kind()
    }
}
