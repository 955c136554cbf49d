//! Chat command surface.
//!
//! Thin glue: every command reduces to a registry query or a trigger
//! call. Replies go back as private messages to the sender. Unknown
//! commands are ignored (public chat is noisy).

use std::sync::Arc;

use tracing::warn;

use crate::state::BotState;
use crate::trigger::TriggerSequencer;
use crate::world::WorldClient;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Count settled pearls for a player.
    Count {
        /// Whose pearls to count.
        player: String,
    },
    /// Trigger the sender's nearest settled pearl.
    Trigger {
        /// The requesting player.
        player: String,
    },
    /// Connectivity/status query.
    Health,
}

/// Parse a chat message into a command.
///
/// `!pearls [name]` counts pearls (defaults to the sender), `!tp`
/// triggers the sender's pearl, `!status` reports health.
#[must_use]
pub fn parse(prefix: &str, sender: &str, message: &str) -> Option<Command> {
    let body = message.strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    match parts.next()? {
        "pearls" => Some(Command::Count {
            player: parts.next().unwrap_or(sender).to_string(),
        }),
        "tp" | "trigger" => Some(Command::Trigger {
            player: sender.to_string(),
        }),
        "status" | "health" => Some(Command::Health),
        _ => None,
    }
}

/// Dispatches chat commands against the core.
pub struct CommandHandler<W> {
    world: Arc<W>,
    state: Arc<BotState>,
    sequencer: Arc<TriggerSequencer<W>>,
}

impl<W: WorldClient> CommandHandler<W> {
    /// Create a handler.
    pub fn new(world: Arc<W>, state: Arc<BotState>, sequencer: Arc<TriggerSequencer<W>>) -> Self {
        Self {
            world,
            state,
            sequencer,
        }
    }

    /// Handle one incoming chat line from `sender`.
    pub async fn handle_chat(&self, sender: &str, message: &str) {
        let prefix = self.state.config.control.command_prefix.clone();
        let Some(command) = parse(&prefix, sender, message) else {
            return;
        };
        match command {
            Command::Count { player } => {
                let count = self.state.registry().count_for_owner(&player);
                self.reply(sender, &format!("{player} has {count} pearl(s) in stasis."))
                    .await;
            }
            Command::Trigger { player } => match self.sequencer.trigger(&player).await {
                Ok(outcome) => {
                    self.reply(
                        sender,
                        &format!("Flicked {} at {}.", outcome.block.name, outcome.block.pos),
                    )
                    .await;
                }
                Err(err) => {
                    self.reply(sender, &format!("Trigger failed: {err}")).await;
                }
            },
            Command::Health => {
                let connected = self.world.is_connected();
                let tracked = self.state.registry().len();
                self.reply(
                    sender,
                    &format!("connected={connected} tracked={tracked}"),
                )
                .await;
            }
        }
    }

    async fn reply(&self, player: &str, message: &str) {
        if let Err(err) = self.world.whisper(player, message).await {
            warn!(%err, player, "chat reply failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_with_and_without_target() {
        assert_eq!(
            parse("!", "alice", "!pearls"),
            Some(Command::Count {
                player: "alice".to_string()
            })
        );
        assert_eq!(
            parse("!", "alice", "!pearls bob"),
            Some(Command::Count {
                player: "bob".to_string()
            })
        );
    }

    #[test]
    fn trigger_always_binds_to_sender() {
        assert_eq!(
            parse("!", "alice", "!tp someone_else"),
            Some(Command::Trigger {
                player: "alice".to_string()
            })
        );
        assert_eq!(
            parse("!", "alice", "!trigger"),
            Some(Command::Trigger {
                player: "alice".to_string()
            })
        );
    }

    #[test]
    fn ignores_chatter_and_foreign_prefixes() {
        assert_eq!(parse("!", "alice", "hello there"), None);
        assert_eq!(parse("!", "alice", "~pearls"), None);
        assert_eq!(parse("!", "alice", "!dance"), None);
    }

    #[test]
    fn health_aliases() {
        assert_eq!(parse("!", "a", "!status"), Some(Command::Health));
        assert_eq!(parse("!", "a", "!health"), Some(Command::Health));
    }
}
