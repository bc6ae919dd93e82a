//! Action execution.
//!
//! [`SessionEngine`] validates one [`Action`] against the current state and
//! returns the events it produces, or an [`ActionError`] and no events. The
//! engine never mutates the session: it works on a [`Staging`] copy so that
//! multi-step actions (initialization, phase transitions) see their own
//! intermediate results, and the caller commits the returned events.
//!
//! Events come back without `seq` or `id`; numbering is the session's job.
mod staging;

#[cfg(test)]
mod determinism;

pub use staging::Staging;

use chrono::{DateTime, Utc};

use crate::action::{self, Action, ActionKind};
use crate::error::ActionError;
use crate::event::{Event, EventKind, payloads};
use crate::rules::modifiers::ModifierProvider;
use crate::rules::phases::{self, Transition};
use crate::rules::{abilities, setup, victory, voting};
use crate::state::{Catalog, NightActionKind, PhaseKind, Player, PlayerId, SessionState};

/// Executes actions for one session.
pub struct SessionEngine<'a> {
    state: &'a SessionState,
    modifiers: &'a dyn ModifierProvider,
    catalog: &'a Catalog,
}

impl<'a> SessionEngine<'a> {
    pub fn new(
        state: &'a SessionState,
        modifiers: &'a dyn ModifierProvider,
        catalog: &'a Catalog,
    ) -> Self {
        Self {
            state,
            modifiers,
            catalog,
        }
    }

    /// Validates `action` and returns the events it produces, in order.
    pub fn execute(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        if self.state.is_over() && action.kind != ActionKind::PhaseTransition {
            return Err(ActionError::SessionOver);
        }
        match action.kind {
            ActionKind::InitializeSession => {
                let payload: action::InitializeSession = action.payload_as();
                setup::initialize(self.state, self.catalog, payload.seed, now)
            }
            ActionKind::JoinGame => self.join(action, now),
            ActionKind::LeaveGame => self.leave(action, now),
            ActionKind::PhaseTransition => Ok(self.transition(action, now)),
            ActionKind::SubmitVote => {
                let actor = actor_of(action)?;
                let payload: action::SubmitVote = action.payload_as();
                voting::cast_vote(self.state, actor, &payload.target_id, now).map(|e| vec![e])
            }
            ActionKind::SubmitNightAction => self.night_action(action, now),
            ActionKind::SendMessage => self.send_message(action, now),
            ActionKind::SubmitPulseCheck => self.pulse_check(action, now),
            ActionKind::SetSlackStatus => {
                let actor = self.living(action)?;
                let payload: action::SetSlackStatus = action.payload_as();
                Ok(vec![
                    Event::new(EventKind::SlackStatusChanged, self.state.id.clone(), now)
                        .about(&actor.id)
                        .with(&payloads::SlackStatusChanged {
                            status: payload.status,
                        }),
                ])
            }
            ActionKind::TriggerCrisis => {
                let payload: action::TriggerCrisis = action.payload_as();
                let crisis = self
                    .catalog
                    .crisis(&payload.crisis_type)
                    .ok_or(ActionError::UnknownCrisis(payload.crisis_type))?;
                Ok(vec![
                    Event::new(EventKind::CrisisTriggered, self.state.id.clone(), now).with(
                        &payloads::CrisisTriggered {
                            crisis: crisis.clone(),
                        },
                    ),
                ])
            }
        }
    }

    fn living(&self, action: &Action) -> Result<&'a Player, ActionError> {
        let id = actor_of(action)?;
        let player = self
            .state
            .player(id.as_str())
            .ok_or_else(|| ActionError::PlayerNotFound(id.clone()))?;
        if !player.alive {
            return Err(ActionError::ActorDead);
        }
        Ok(player)
    }

    /// Late or repeated joins are dropped without an error.
    fn join(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let id = actor_of(action)?;
        if self.state.phase.kind != PhaseKind::Lobby || self.state.player(id.as_str()).is_some() {
            return Ok(Vec::new());
        }
        if self.state.alive_count() >= self.state.settings.max_players {
            return Err(ActionError::SessionFull);
        }
        let payload: action::JoinGame = action.payload_as();
        let name = if payload.name.trim().is_empty() {
            id.to_string()
        } else {
            payload.name
        };
        Ok(vec![
            Event::new(EventKind::PlayerJoined, self.state.id.clone(), now)
                .about(id)
                .with(&payloads::PlayerJoined {
                    name,
                    job_title: payload.job_title,
                    tokens: self.state.settings.starting_tokens,
                }),
        ])
    }

    fn leave(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let player = self.living(action)?;
        let mut staging = Staging::new(self.state);
        staging.emit(Event::new(EventKind::PlayerLeft, self.state.id.clone(), now).about(&player.id));
        if self.state.phase.kind != PhaseKind::Lobby {
            victory::conclude(&mut staging, now);
        }
        Ok(staging.into_events())
    }

    fn transition(&self, action: &Action, now: DateTime<Utc>) -> Vec<Event> {
        let payload: action::PhaseTransition = action.payload_as();
        let mut staging = Staging::new(self.state);
        phases::advance(
            &mut staging,
            self.modifiers,
            self.catalog,
            Transition {
                from: payload.from_phase,
                next: payload.next_phase,
                duration: payload.duration,
            },
            now,
        );
        staging.into_events()
    }

    fn night_action(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let actor = actor_of(action)?;
        let payload: action::SubmitNightAction = action.payload_as();
        let kind = payload.action_type.ok_or(ActionError::UnknownNightAction)?;
        let target = payload.target_id.filter(|target| !target.is_empty());
        abilities::check_submission(self.state, self.modifiers, actor, kind, target.as_ref())?;

        if kind == NightActionKind::Pivot {
            let extras: payloads::AbilityUsed = crate::event::project(&payload.details);
            if let Some(chosen) = extras.chosen_crisis.filter(|c| !c.is_empty()) {
                if self.catalog.crisis(&chosen).is_none() {
                    return Err(ActionError::UnknownCrisis(chosen));
                }
            }
        }

        Ok(vec![
            Event::new(EventKind::NightActionSubmitted, self.state.id.clone(), now)
                .private_to(actor)
                .with(&payloads::NightActionSubmitted {
                    action_type: Some(kind),
                    target_id: target,
                    details: payload.details,
                }),
        ])
    }

    /// Public messages go to everyone; a direct message goes to its recipient
    /// with a copy for the sender.
    fn send_message(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let sender = self.living(action)?;
        let payload: action::SendMessage = action.payload_as();
        let message = payload.message.trim();
        if message.is_empty() {
            return Err(ActionError::EmptyMessage);
        }
        let chat = |target_id: Option<PlayerId>| payloads::ChatMessage {
            message_id: String::new(),
            player_name: sender.name.clone(),
            message: message.to_owned(),
            target_id,
        };

        let Some(target) = payload.target_id.filter(|target| !target.is_empty()) else {
            return Ok(vec![
                Event::new(EventKind::ChatMessage, self.state.id.clone(), now)
                    .about(&sender.id)
                    .with(&chat(None)),
            ]);
        };
        // Public-only communication rules out direct messages.
        if self.modifiers.public_voting_only(self.state) {
            return Err(ActionError::PrivateMessagesSuspended);
        }
        let recipient = self
            .state
            .player(target.as_str())
            .ok_or_else(|| ActionError::PlayerNotFound(target.clone()))?;
        if !recipient.alive {
            return Err(ActionError::TargetDead(target));
        }
        let mut events = vec![
            Event::new(EventKind::ChatMessage, self.state.id.clone(), now)
                .private_to(&recipient.id)
                .with(&chat(Some(recipient.id.clone()))),
        ];
        if recipient.id != sender.id {
            events.push(
                Event::new(EventKind::ChatMessage, self.state.id.clone(), now)
                    .private_to(&sender.id)
                    .with(&chat(Some(recipient.id.clone()))),
            );
        }
        Ok(events)
    }

    fn pulse_check(&self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let player = self.living(action)?;
        if self.state.phase.kind != PhaseKind::PulseCheck {
            return Err(ActionError::WrongPhase {
                action: "pulse check responses",
                phase: self.state.phase.kind,
            });
        }
        let payload: action::SubmitPulseCheck = action.payload_as();
        Ok(vec![
            Event::new(EventKind::PulseCheckSubmitted, self.state.id.clone(), now)
                .about(&player.id)
                .with(&payloads::PulseCheckSubmitted {
                    response: payload.response,
                }),
        ])
    }
}

fn actor_of(action: &Action) -> Result<&PlayerId, ActionError> {
    action
        .player_id
        .as_ref()
        .filter(|id| !id.is_empty())
        .ok_or(ActionError::MissingActor)
}
