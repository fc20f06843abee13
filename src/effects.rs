//! Card effects.
//!
//! The game decides *when* a card executes; what it does to the robot is
//! behind [`CardEffect`]. Anything beyond board movement (energy, damage
//! that needs a deck, reboots) is reported back as a [`Followup`] for the
//! game to carry out, since only the game owns players and piles.

use crate::board::{Board, Rotation, RobotId};
use crate::cards::{Card, DamageCard, ProgramCard};

/// What an effect may touch.
pub struct EffectContext<'a> {
    pub board: &'a mut Board,
    pub robot: RobotId,
    pub register: usize,
}

/// Work left for the game after an effect ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Followup {
    pub energy: u32,
    /// Replace this card by the top card of the owner's deck and play it.
    pub play_top_card: bool,
    pub reboot: bool,
    pub damage: Vec<(DamageCard, u32)>,
}

impl Followup {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Executes a card for a robot.
///
/// Again is never passed in; the game resolves it to the last card played.
pub trait CardEffect: Send {
    fn apply(&mut self, card: Card, ctx: &mut EffectContext<'_>) -> Followup;
}

/// Base-game card behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEffects;

impl StandardEffects {
    fn step(ctx: &mut EffectContext<'_>, steps: usize, backwards: bool) {
        for _ in 0..steps {
            let Some(state) = ctx.board.robot(ctx.robot) else {
                return;
            };
            if state.rebooting {
                return;
            }
            let dir = if backwards {
                state.facing.invert()
            } else {
                state.facing
            };
            if !ctx.board.move_robot(ctx.robot, dir) {
                return;
            }
        }
    }
}

impl CardEffect for StandardEffects {
    fn apply(&mut self, card: Card, ctx: &mut EffectContext<'_>) -> Followup {
        match card {
            Card::Program(program) => {
                match program {
                    ProgramCard::MoveI => Self::step(ctx, 1, false),
                    ProgramCard::MoveII => Self::step(ctx, 2, false),
                    ProgramCard::MoveIII => Self::step(ctx, 3, false),
                    ProgramCard::BackUp => Self::step(ctx, 1, true),
                    ProgramCard::TurnRight => ctx.board.turn_robot(ctx.robot, Rotation::Clockwise),
                    ProgramCard::TurnLeft => {
                        ctx.board.turn_robot(ctx.robot, Rotation::CounterClockwise)
                    }
                    ProgramCard::UTurn => {
                        ctx.board.turn_robot(ctx.robot, Rotation::Clockwise);
                        ctx.board.turn_robot(ctx.robot, Rotation::Clockwise);
                    }
                    ProgramCard::PowerUp => {
                        return Followup {
                            energy: 1,
                            ..Followup::none()
                        }
                    }
                    ProgramCard::Again => {}
                }
                Followup::none()
            }
            Card::Damage(DamageCard::Spam) | Card::Damage(DamageCard::Virus) => Followup {
                play_top_card: true,
                ..Followup::none()
            },
            Card::Damage(DamageCard::Worm) => Followup {
                reboot: true,
                ..Followup::none()
            },
            Card::Damage(DamageCard::Trojan) => Followup {
                play_top_card: true,
                damage: vec![(DamageCard::Spam, 2)],
                ..Followup::none()
            },
        }
    }
}
