//! Show/hide control for on-air graphics.
//!
//! Several actions may be bound to the same remote input. Each remote input
//! is a slot that is either `Idle` or `Active` for exactly one action;
//! every show/hide goes through [`OverlayController`], which refuses to
//! activate an action while another one holds the slot.
//!
//! Transitions are two-phase: `plan_*` validates and produces the remote
//! command, `commit` records the new state once that command went out.

use crate::api::RemoteCommand;
use crate::config::MirrorConfig;
use crate::error::OverlayError;
use crate::match_state::{MatchState, RefereeSlot, TeamSide};
use crate::resolve::{self, InputMatch};
use std::collections::HashMap;

/// Data that must be present before an action may go on air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    None,
    CoachName(TeamSide),
    RefereeName(RefereeSlot),
}

impl Precondition {
    pub fn check(&self, state: &MatchState) -> Result<(), OverlayError> {
        match *self {
            Precondition::None => Ok(()),
            Precondition::CoachName(side) => {
                if state.team(side).coach.trim().is_empty() {
                    Err(OverlayError::MissingData(format!(
                        "Enter the {} coach name first",
                        side.display_name()
                    )))
                } else {
                    Ok(())
                }
            }
            Precondition::RefereeName(slot) => {
                if state.referee(slot).trim().is_empty() {
                    Err(OverlayError::MissingData(format!(
                        "Enter the {} referee name first",
                        slot.display_name()
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A user-facing "show this graphic" action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayAction {
    pub id: String,
    pub label: String,
    pub precondition: Precondition,
}

impl OverlayAction {
    pub fn new(id: &str, label: &str, precondition: Precondition) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            precondition,
        }
    }
}

/// The actions the scoring UI offers out of the box.
pub fn default_actions() -> Vec<OverlayAction> {
    vec![
        OverlayAction::new("scoreboard", "Scoreboard", Precondition::None),
        OverlayAction::new("set_summary", "Set summary", Precondition::None),
        OverlayAction::new("home_coach", "Home coach", Precondition::CoachName(TeamSide::Home)),
        OverlayAction::new("away_coach", "Away coach", Precondition::CoachName(TeamSide::Away)),
        OverlayAction::new(
            "first_referee",
            "First referee",
            Precondition::RefereeName(RefereeSlot::First),
        ),
        OverlayAction::new(
            "second_referee",
            "Second referee",
            Precondition::RefereeName(RefereeSlot::Second),
        ),
    ]
}

/// What went on air in a slot. Recorded at show time so the graphic can be
/// taken down after its binding changed or its input was renamed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnAir {
    pub action_id: String,
    /// Internal id of the input the action was shown on
    pub input_id: String,
    /// Remote reference the show command was addressed to
    pub reference: String,
    pub channel: u8,
}

/// State of one remote input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Idle,
    Active(OnAir),
}

/// A validated, not yet applied transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayTransition {
    pub action_id: String,
    pub input_id: String,
    /// Slot key of the remote input
    pub resource: String,
    pub channel: u8,
    pub show: bool,
    pub command: RemoteCommand,
}

pub struct OverlayController {
    actions: Vec<OverlayAction>,
    slots: HashMap<String, SlotState>,
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new(default_actions())
    }
}

/// Slot key for an input: its stable remote key when known, so two input
/// configurations pointing at the same remote input share one slot.
fn resource_key(found: &InputMatch<'_>) -> String {
    match found.input.remote_key() {
        Some(key) => format!("key:{}", key),
        None => format!("id:{}", found.id),
    }
}

impl OverlayController {
    pub fn new(actions: Vec<OverlayAction>) -> Self {
        Self {
            actions,
            slots: HashMap::new(),
        }
    }

    pub fn actions(&self) -> &[OverlayAction] {
        &self.actions
    }

    pub fn action(&self, action_id: &str) -> Option<&OverlayAction> {
        self.actions.iter().find(|a| a.id == action_id)
    }

    /// Slot key and record of `action_id`, if it is on air.
    fn held(&self, action_id: &str) -> Option<(&str, &OnAir)> {
        self.slots.iter().find_map(|(resource, state)| match state {
            SlotState::Active(on_air) if on_air.action_id == action_id => {
                Some((resource.as_str(), on_air))
            }
            _ => None,
        })
    }

    pub fn is_active(&self, action_id: &str) -> bool {
        self.held(action_id).is_some()
    }

    pub fn on_air(&self, action_id: &str) -> Option<&OnAir> {
        self.held(action_id).map(|(_, on_air)| on_air)
    }

    pub fn active_actions(&self) -> Vec<&str> {
        let mut active: Vec<&str> = self
            .slots
            .values()
            .filter_map(|state| match state {
                SlotState::Active(on_air) => Some(on_air.action_id.as_str()),
                SlotState::Idle => None,
            })
            .collect();
        active.sort_unstable();
        active
    }

    fn target<'a>(
        &self,
        action_id: &str,
        config: &'a MirrorConfig,
    ) -> Result<InputMatch<'a>, OverlayError> {
        if self.action(action_id).is_none() {
            return Err(OverlayError::UnknownAction(action_id.to_string()));
        }
        let key = config
            .overlay_bindings
            .get(action_id)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OverlayError::Unbound(action_id.to_string()))?;
        resolve::find(config, key).ok_or_else(|| OverlayError::InputNotFound(key.clone()))
    }

    fn holder_of(&self, resource: &str) -> Option<&str> {
        match self.slots.get(resource) {
            Some(SlotState::Active(on_air)) => Some(on_air.action_id.as_str()),
            _ => None,
        }
    }

    /// True when another action holds the slot this action targets and
    /// this action is not itself on air.
    pub fn is_blocked(&self, action_id: &str, config: &MirrorConfig) -> bool {
        if self.is_active(action_id) {
            return false;
        }
        let Ok(found) = self.target(action_id, config) else {
            return false;
        };
        self.holder_of(&resource_key(&found))
            .is_some_and(|holder| holder != action_id)
    }

    pub fn plan_show(
        &self,
        action_id: &str,
        config: &MirrorConfig,
        state: &MatchState,
    ) -> Result<OverlayTransition, OverlayError> {
        let found = self.target(action_id, config)?;
        if !found.input.enabled {
            return Err(OverlayError::InputDisabled(found.input.display_name.clone()));
        }
        let resource = resource_key(&found);
        if let Some(holder) = self.holder_of(&resource).filter(|h| *h != action_id) {
            return Err(OverlayError::Blocked {
                action: self.label_of(action_id),
                holder: self.label_of(holder),
            });
        }
        if let Some(action) = self.action(action_id) {
            action.precondition.check(state)?;
        }
        let reference = found
            .input
            .remote_reference()
            .ok_or_else(|| OverlayError::InputNotFound(found.id.to_string()))?;
        let channel = found.input.overlay_channel;
        Ok(OverlayTransition {
            action_id: action_id.to_string(),
            input_id: found.id.to_string(),
            resource,
            channel,
            show: true,
            command: RemoteCommand::overlay(reference, channel, true),
        })
    }

    /// Hiding has no data precondition; it only needs the action on air.
    ///
    /// The command goes to the input the action was shown on, under that
    /// input's current remote reference, on the channel it was shown on.
    /// The binding is not consulted.
    pub fn plan_hide(
        &self,
        action_id: &str,
        config: &MirrorConfig,
    ) -> Result<OverlayTransition, OverlayError> {
        let (resource, on_air) = self
            .held(action_id)
            .ok_or_else(|| OverlayError::NotActive(self.label_of(action_id)))?;
        let reference = match config
            .input(&on_air.input_id)
            .and_then(|input| input.remote_reference())
        {
            Some(reference) => reference,
            None => {
                log::warn!(
                    "Input {} of overlay {} is gone, hiding via {:?}",
                    on_air.input_id,
                    action_id,
                    on_air.reference
                );
                on_air.reference.as_str()
            }
        };
        Ok(OverlayTransition {
            action_id: action_id.to_string(),
            input_id: on_air.input_id.clone(),
            resource: resource.to_string(),
            channel: on_air.channel,
            show: false,
            command: RemoteCommand::overlay(reference, on_air.channel, false),
        })
    }

    pub fn plan_toggle(
        &self,
        action_id: &str,
        config: &MirrorConfig,
        state: &MatchState,
    ) -> Result<OverlayTransition, OverlayError> {
        if self.is_active(action_id) {
            self.plan_hide(action_id, config)
        } else {
            self.plan_show(action_id, config, state)
        }
    }

    /// Apply a transition after its command was delivered.
    ///
    /// Re-checks the slot so two plans for the same input cannot both land.
    pub fn commit(&mut self, transition: &OverlayTransition) -> Result<(), OverlayError> {
        let current = self
            .slots
            .get(&transition.resource)
            .cloned()
            .unwrap_or_default();
        match (transition.show, current) {
            (true, SlotState::Active(on_air)) if on_air.action_id != transition.action_id => {
                Err(OverlayError::Blocked {
                    action: self.label_of(&transition.action_id),
                    holder: self.label_of(&on_air.action_id),
                })
            }
            (true, _) => {
                self.slots.insert(
                    transition.resource.clone(),
                    SlotState::Active(OnAir {
                        action_id: transition.action_id.clone(),
                        input_id: transition.input_id.clone(),
                        reference: transition.command.input.clone(),
                        channel: transition.channel,
                    }),
                );
                log::info!("Overlay {} on air", transition.action_id);
                Ok(())
            }
            (false, SlotState::Active(on_air)) if on_air.action_id == transition.action_id => {
                self.slots.insert(transition.resource.clone(), SlotState::Idle);
                log::info!("Overlay {} off air", transition.action_id);
                Ok(())
            }
            (false, _) => Err(OverlayError::NotActive(self.label_of(&transition.action_id))),
        }
    }

    /// Forget that an action is on air without sending anything.
    pub fn release(&mut self, action_id: &str) -> bool {
        let Some(resource) = self.held(action_id).map(|(r, _)| r.to_string()) else {
            return false;
        };
        self.slots.insert(resource, SlotState::Idle);
        true
    }

    /// Actions currently on air on the input with internal id `input_id`.
    pub fn actions_on_input(&self, input_id: &str) -> Vec<String> {
        let mut held: Vec<String> = self
            .slots
            .values()
            .filter_map(|state| match state {
                SlotState::Active(on_air) if on_air.input_id == input_id => {
                    Some(on_air.action_id.clone())
                }
                _ => None,
            })
            .collect();
        held.sort_unstable();
        held
    }

    /// Release every action held on `input_id`. Returns the released ids.
    pub fn release_input(&mut self, input_id: &str) -> Vec<String> {
        let released = self.actions_on_input(input_id);
        for action_id in &released {
            self.release(action_id);
        }
        released
    }

    /// Drop all slot state (e.g. after reconnecting to a restarted remote).
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    fn label_of(&self, action_id: &str) -> String {
        self.action(action_id)
            .map(|a| a.label.clone())
            .unwrap_or_else(|| action_id.to_string())
    }
}
