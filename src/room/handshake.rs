use tracing::debug;

use super::models::Role;

/// Pre-round stages of the room handshake
///
/// Host path: `Lobby -> SelectContent -> (room active)`.
/// Guest path: `JoinInput -> WaitingForHost -> (room active)`.
/// The active room itself is owned by the session once content exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum HandshakeStage {
    Lobby,
    SelectContent,
    JoinInput,
    WaitingForHost,
}

/// What the host should do after a presence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Publish a PRESENCE_ACK
    pub acknowledge: bool,
    /// The stage moved `Lobby -> SelectContent`
    pub advanced: bool,
}

#[derive(Debug, Clone)]
pub struct Handshake {
    role: Role,
    stage: HandshakeStage,
}

impl Handshake {
    pub fn host() -> Self {
        Self {
            role: Role::Host,
            stage: HandshakeStage::Lobby,
        }
    }

    pub fn guest() -> Self {
        Self {
            role: Role::Guest,
            stage: HandshakeStage::JoinInput,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    /// Guest keeps emitting probes while it has not seen any content
    pub fn is_probing(&self) -> bool {
        matches!(
            self.stage,
            HandshakeStage::JoinInput | HandshakeStage::WaitingForHost
        )
    }

    /// Host side: any number of identical probes acts at most once
    pub fn on_probe(&mut self) -> ProbeOutcome {
        match (self.role, self.stage) {
            (Role::Host, HandshakeStage::Lobby) => {
                self.stage = HandshakeStage::SelectContent;
                ProbeOutcome {
                    acknowledge: true,
                    advanced: true,
                }
            }
            (Role::Host, HandshakeStage::SelectContent) => ProbeOutcome {
                acknowledge: true,
                advanced: false,
            },
            _ => {
                debug!(stage = %self.stage, "Ignoring presence probe");
                ProbeOutcome {
                    acknowledge: false,
                    advanced: false,
                }
            }
        }
    }

    /// Guest side: only the first acknowledgment moves the stage
    pub fn on_ack(&mut self) -> bool {
        if self.role == Role::Guest && self.stage == HandshakeStage::JoinInput {
            self.stage = HandshakeStage::WaitingForHost;
            return true;
        }
        false
    }

    /// Host may open topic selection before the guest shows up
    pub fn begin_selection(&mut self) -> bool {
        if self.role == Role::Host && self.stage == HandshakeStage::Lobby {
            self.stage = HandshakeStage::SelectContent;
            return true;
        }
        false
    }

    pub fn is_selecting_content(&self) -> bool {
        self.stage == HandshakeStage::SelectContent
    }
}
