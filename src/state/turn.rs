//! Turn scheduling.
//!
//! Pure functions over a roster. Scan order is always roster order, wrapping
//! around, so the result is deterministic for a given roster.

use super::player::Player;

/// Next slot allowed to guess after `current`.
///
/// Scans circularly from `current + 1`, skipping `excluded` (the word-setter)
/// and disconnected players. When a full circuit finds nobody, `current` is
/// returned unchanged and guessing stalls until someone reconnects.
pub fn next_turn(roster: &[Player], current: usize, excluded: usize) -> usize {
    let len = roster.len();
    if len < 2 {
        return current;
    }

    (1..=len)
        .map(|step| (current + step) % len)
        .find(|&slot| slot != excluded && roster[slot].connected)
        .unwrap_or(current)
}

/// First guesser of a round whose word-setter sits at `word_setter`.
///
/// `None` when the setter is alone. If every other player is disconnected
/// the slot right after the setter gets the turn, so the round resumes as
/// soon as that player returns.
pub fn first_guesser(roster: &[Player], word_setter: usize) -> Option<usize> {
    if roster.len() < 2 {
        return None;
    }

    let next = next_turn(roster, word_setter, word_setter);
    if next == word_setter {
        Some((word_setter + 1) % roster.len())
    } else {
        Some(next)
    }
}

/// Where a roster pointer lands after slot `removed` is deleted.
///
/// Pointers past the removed slot shift left by one. A pointer on the
/// removed slot moves to whoever now occupies that slot, wrapping to the
/// front when the last slot was removed. `new_len` must be non-zero.
pub fn index_after_removal(pointer: usize, removed: usize, new_len: usize) -> usize {
    debug_assert!(new_len > 0);
    if pointer > removed {
        pointer - 1
    } else if pointer == removed {
        removed % new_len
    } else {
        pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::player::ConnectionId;

    fn roster(connected: &[bool]) -> Vec<Player> {
        connected
            .iter()
            .enumerate()
            .map(|(i, &live)| {
                let mut p = Player::new(format!("P{}", i), ConnectionId(i as u64));
                if !live {
                    p.disconnect();
                }
                p
            })
            .collect()
    }

    #[test]
    fn test_next_turn_skips_word_setter() {
        let players = roster(&[true, true, true]);
        assert_eq!(next_turn(&players, 1, 0), 2);
        assert_eq!(next_turn(&players, 2, 0), 1);
    }

    #[test]
    fn test_next_turn_skips_disconnected() {
        let players = roster(&[true, true, false, true]);
        assert_eq!(next_turn(&players, 1, 0), 3);
        assert_eq!(next_turn(&players, 3, 0), 1);
    }

    #[test]
    fn test_next_turn_stalls_when_nobody_eligible() {
        let players = roster(&[true, false, false]);
        assert_eq!(next_turn(&players, 1, 0), 1);
    }

    #[test]
    fn test_next_turn_single_guesser_keeps_turn() {
        let players = roster(&[true, true]);
        assert_eq!(next_turn(&players, 1, 0), 1);
    }

    #[test]
    fn test_next_turn_single_player_is_noop() {
        let players = roster(&[true]);
        assert_eq!(next_turn(&players, 0, 0), 0);
    }

    #[test]
    fn test_first_guesser() {
        assert_eq!(first_guesser(&roster(&[true]), 0), None);
        assert_eq!(first_guesser(&roster(&[true, true, true]), 0), Some(1));
        assert_eq!(first_guesser(&roster(&[true, true, true]), 2), Some(0));
        assert_eq!(first_guesser(&roster(&[true, false, true]), 0), Some(2));
    }

    #[test]
    fn test_first_guesser_everyone_else_offline() {
        assert_eq!(first_guesser(&roster(&[true, false, false]), 0), Some(1));
        assert_eq!(first_guesser(&roster(&[false, false, true]), 2), Some(0));
    }

    #[test]
    fn test_index_after_removal() {
        // Pointer after the removed slot shifts left
        assert_eq!(index_after_removal(2, 1, 2), 1);
        // Pointer before the removed slot stays
        assert_eq!(index_after_removal(0, 1, 2), 0);
        // Pointer on the removed slot goes to the next occupant
        assert_eq!(index_after_removal(1, 1, 2), 1);
        // ...wrapping when the last slot was removed
        assert_eq!(index_after_removal(2, 2, 2), 0);
    }
}
