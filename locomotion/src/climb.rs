use cgmath::{Vector3, Zero};
use serde::{Deserialize, Serialize};

use crate::{
    body::{Body, MovementMode},
    config::ClimbConfig,
    logging::SCOPE_CLIMB,
    services::{ActorId, HapticEffect, HapticPulse},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

/// Something a hand is currently overlapping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlapObject {
    pub actor: ActorId,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl OverlapObject {
    pub fn new(actor: ActorId, tags: &[&str]) -> Self {
        OverlapObject {
            actor,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandState {
    pub can_climb: bool,
    pub is_climbing: bool,
    /// World position of the hand when it gripped
    pub grab_anchor_position: Vector3<f32>,
}

impl Default for HandState {
    fn default() -> Self {
        HandState {
            can_climb: false,
            is_climbing: false,
            grab_anchor_position: Vector3::zero(),
        }
    }
}

/// Climbing state for one hand.
pub struct ClimbController {
    hand: Hand,
    sibling: Option<Hand>,
    state: HandState,
    overlaps: Vec<OverlapObject>,
    climbable_tag: String,
}

impl ClimbController {
    pub fn new(hand: Hand, climbable_tag: &str) -> Self {
        ClimbController {
            hand,
            sibling: None,
            state: HandState::default(),
            overlaps: Vec::new(),
            climbable_tag: climbable_tag.to_string(),
        }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn sibling(&self) -> Option<Hand> {
        self.sibling
    }

    /// Assign the other hand's controller. Only the first call takes effect.
    pub fn set_sibling(&mut self, sibling: Hand) {
        if self.sibling.is_none() && sibling != self.hand {
            self.sibling = Some(sibling);
        }
    }

    pub fn state(&self) -> &HandState {
        &self.state
    }

    pub fn can_climb(&self) -> bool {
        self.state.can_climb
    }

    pub fn is_climbing(&self) -> bool {
        self.state.is_climbing
    }

    pub fn overlaps(&self) -> &[OverlapObject] {
        &self.overlaps
    }

    fn recompute_can_climb(&mut self) -> bool {
        self.state.can_climb = self
            .overlaps
            .iter()
            .any(|o| o.has_tag(&self.climbable_tag));
        self.state.can_climb
    }

    /// Track a new overlap. Returns true when the hand just became able to climb.
    fn overlap_begin(&mut self, object: OverlapObject) -> bool {
        let could_climb = self.state.can_climb;
        if !self.overlaps.iter().any(|o| o.actor == object.actor) {
            self.overlaps.push(object);
        }
        let can_climb = self.recompute_can_climb();
        !could_climb && can_climb
    }

    /// Forget an overlap and stop climbing. Returns whether the hand was climbing.
    fn overlap_end(&mut self, actor: ActorId) -> bool {
        self.overlaps.retain(|o| o.actor != actor);
        self.recompute_can_climb();
        std::mem::replace(&mut self.state.is_climbing, false)
    }
}

/// Both hands' climbing controllers, wired as siblings.
///
/// At most one hand climbs at a time; gripping with one hand takes control away
/// from the other.
pub struct ClimbSystem {
    hands: [ClimbController; 2],
    haptic_effect: HapticEffect,
}

impl ClimbSystem {
    pub fn new(config: &ClimbConfig) -> Self {
        let mut left = ClimbController::new(Hand::Left, &config.climbable_tag);
        let mut right = ClimbController::new(Hand::Right, &config.climbable_tag);
        left.set_sibling(Hand::Right);
        right.set_sibling(Hand::Left);

        ClimbSystem {
            hands: [left, right],
            haptic_effect: config.haptic_effect(),
        }
    }

    pub fn hand(&self, hand: Hand) -> &ClimbController {
        &self.hands[hand.index()]
    }

    pub fn climbing_hand(&self) -> Option<Hand> {
        Hand::BOTH.into_iter().find(|h| self.hand(*h).is_climbing())
    }

    fn sibling_is_climbing(&self, hand: Hand) -> bool {
        self.hand(hand)
            .sibling()
            .map(|sibling| self.hand(sibling).is_climbing())
            .unwrap_or(false)
    }

    pub fn overlap_begin(
        &mut self,
        hand: Hand,
        object: OverlapObject,
        haptics: Option<&mut (dyn HapticPulse + '_)>,
    ) {
        let actor = object.actor;
        if self.hands[hand.index()].overlap_begin(object) {
            crate::scoped_log!(DEBUG, SCOPE_CLIMB, ?hand, actor, "hand can climb");
            if let Some(haptics) = haptics {
                haptics.play(self.haptic_effect, hand);
            }
        }
    }

    pub fn overlap_end(&mut self, hand: Hand, actor: ActorId, body: &mut Body) {
        let was_climbing = self.hands[hand.index()].overlap_end(actor);
        if was_climbing {
            crate::scoped_log!(DEBUG, SCOPE_CLIMB, ?hand, actor, "lost hold");
            if !self.sibling_is_climbing(hand) {
                body.set_movement_mode(MovementMode::Grounded);
            }
        }
    }

    /// Start climbing with `hand`, anchored at its current world position.
    /// Returns false, changing nothing, when the hand has nothing to hold.
    pub fn grip(&mut self, hand: Hand, hand_position: Vector3<f32>, body: &mut Body) -> bool {
        if !self.hand(hand).can_climb() {
            return false;
        }

        if let Some(sibling) = self.hand(hand).sibling() {
            self.hands[sibling.index()].state.is_climbing = false;
        }

        let controller = &mut self.hands[hand.index()];
        controller.state.is_climbing = true;
        controller.state.grab_anchor_position = hand_position;
        body.set_movement_mode(MovementMode::Flying);

        crate::scoped_log!(DEBUG, SCOPE_CLIMB, ?hand, ?hand_position, "grip");
        true
    }

    pub fn release(&mut self, hand: Hand, body: &mut Body) {
        self.hands[hand.index()].state.is_climbing = false;
        if !self.sibling_is_climbing(hand) {
            body.set_movement_mode(MovementMode::Grounded);
        }
        crate::scoped_log!(DEBUG, SCOPE_CLIMB, ?hand, "release");
    }

    /// Drop every hold, e.g. after the body was relocated
    pub fn release_all(&mut self, body: &mut Body) {
        let was_climbing = self.climbing_hand().is_some();
        for controller in &mut self.hands {
            controller.state.is_climbing = false;
        }
        if was_climbing {
            body.set_movement_mode(MovementMode::Grounded);
        }
    }

    /// Offset to apply to the body this frame so the climbing hand stays on
    /// its grab point. `hand_positions` are current world positions by hand index.
    pub fn body_offset(&self, hand_positions: &[Vector3<f32>; 2]) -> Option<Vector3<f32>> {
        let hand = self.climbing_hand()?;
        let anchor = self.hand(hand).state.grab_anchor_position;
        Some(-(hand_positions[hand.index()] - anchor))
    }
}
