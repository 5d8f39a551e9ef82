// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the runtime core (spec §7). Nothing in this core
//! terminates the process; every fallible operation returns a `BotError` that
//! handlers turn into a [`crate::envelope::CommandResponse`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("Invalid payload format")]
    InvalidPayload,

    #[error("Unknown command type")]
    UnknownCommand,

    #[error("Invalid coordinates")]
    InvalidCoordinates,

    #[error("Bot is not connected to the Minecraft server yet")]
    NotConnected,

    #[error("Pathfinding failed")]
    PathfindingFailed,

    #[error("Another VPT playback is already in progress")]
    PlaybackInProgress,

    #[error("control mode {0:?} does not accept playback commands")]
    PlaybackDisabled(crate::config::ControlMode),

    #[error("{0}")]
    InvalidPlaybackSequence(String),

    #[error("unknown skill id {0:?}")]
    UnknownSkill(String),

    #[error("{0}")]
    InvalidSkill(String),

    #[error("{0}")]
    Domain(String),
}

impl BotError {
    /// The message placed in `CommandResponse.error`.
    pub fn response_message(&self) -> String {
        self.to_string()
    }
}
