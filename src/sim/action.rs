//! Controller action bitmask and numpad input notation
//!
//! Directions in move strings are relative to facing: `6` is always
//! forward and `4` always back, whatever side of the screen the HAR is on.

use super::entity::Facing;

/// Bitmask of buttons held for one tick
pub type Action = u8;

pub const ACT_NONE: Action = 0x00;
pub const ACT_STOP: Action = 0x01;
pub const ACT_KICK: Action = 0x02;
pub const ACT_PUNCH: Action = 0x04;
pub const ACT_UP: Action = 0x08;
pub const ACT_DOWN: Action = 0x10;
pub const ACT_LEFT: Action = 0x20;
pub const ACT_ESC: Action = 0x40;
pub const ACT_RIGHT: Action = 0x80;

/// Forward and back direction bits for a facing
#[inline]
pub fn forward_back(facing: Facing) -> (Action, Action) {
    match facing {
        Facing::Right => (ACT_RIGHT, ACT_LEFT),
        Facing::Left => (ACT_LEFT, ACT_RIGHT),
    }
}

/// Numpad token for an action, mirrored by facing
pub fn action_to_input(action: Action, facing: Facing) -> Option<u8> {
    let (fwd, back) = forward_back(facing);
    let token = match action {
        ACT_STOP => b'5',
        ACT_KICK => b'K',
        ACT_PUNCH => b'P',
        ACT_UP => b'8',
        ACT_DOWN => b'2',
        a if a == fwd => b'6',
        a if a == back => b'4',
        a if a == ACT_UP | fwd => b'9',
        a if a == ACT_UP | back => b'7',
        a if a == ACT_DOWN | fwd => b'3',
        a if a == ACT_DOWN | back => b'1',
        _ => return None,
    };
    Some(token)
}

/// Action producing a numpad token, mirrored by facing
pub fn input_to_action(token: u8, facing: Facing) -> Option<Action> {
    let (fwd, back) = forward_back(facing);
    let action = match token {
        b'1' => ACT_DOWN | back,
        b'2' => ACT_DOWN,
        b'3' => ACT_DOWN | fwd,
        b'4' => back,
        b'5' => ACT_STOP,
        b'6' => fwd,
        b'7' => ACT_UP | back,
        b'8' => ACT_UP,
        b'9' => ACT_UP | fwd,
        b'K' => ACT_KICK,
        b'P' => ACT_PUNCH,
        _ => return None,
    };
    Some(action)
}
