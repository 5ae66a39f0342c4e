//! Deriving the client-local view from the authoritative record.

use oxo_types::{Board, GameRecord, Phase, PlayerId};

use crate::liveness;

/// Client-local projection of one game record for one seat.
///
/// Replaced wholesale on every update; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Phase reported by the record.
    pub phase: Phase,
    /// Whether the game is being played and the peer still looks alive.
    pub in_progress: bool,
    /// Whether it is the local player's turn.
    pub my_turn: bool,
    /// Whether the game ended in a draw.
    pub is_draw: bool,
    /// Whether the local player won.
    pub i_won: bool,
    /// Board contents.
    pub board: Board,
    /// Identity of player X.
    pub player_x: PlayerId,
    /// Identity of player O, once one has joined.
    pub player_o: Option<PlayerId>,
    /// Keep-alive markers in milliseconds, index 0 = player X, 1 = player O.
    pub keep_alive: [u64; 2],
}

/// Result of deriving a view at one instant.
///
/// `peer_vanished` is the liveness verdict the session folds into its
/// monotonic `abandoned` flag; this crate never stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// The derived view.
    pub view: SessionView,
    /// True when an in-progress game's peer marker has gone stale.
    pub peer_vanished: bool,
}

/// Derive the view for one seat at one instant.
///
/// Pure: the same record, seat and clock always produce the same output.
/// The phase enum is closed, so derivation cannot fail - unknown phase tags
/// are rejected earlier, by the record decoder.
pub fn derive(record: &GameRecord, is_player_x: bool, now_ms: u64) -> Derivation {
    let mut my_turn = false;
    let mut is_draw = false;
    let mut i_won = false;
    match record.phase {
        Phase::Waiting => {}
        Phase::XTurn => my_turn = is_player_x,
        Phase::OTurn => my_turn = !is_player_x,
        Phase::Draw => is_draw = true,
        Phase::XWon => i_won = is_player_x,
        Phase::OWon => i_won = !is_player_x,
    }

    let active = record.phase.is_active();
    let marker = liveness::peer_marker(&record.keep_alive, is_player_x);
    let peer_alive = liveness::peer_alive(marker, now_ms);

    Derivation {
        view: SessionView {
            phase: record.phase,
            in_progress: active && peer_alive,
            my_turn,
            is_draw,
            i_won,
            board: record.board,
            player_x: record.player_x,
            player_o: record.player_o,
            keep_alive: record.keep_alive,
        },
        peer_vanished: active && !peer_alive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::PEER_TIMEOUT_MS;

    const NOW: u64 = 1_705_000_000_000;

    fn record(phase: Phase) -> GameRecord {
        let mut record = GameRecord::new(PlayerId::random());
        record.phase = phase;
        if phase != Phase::Waiting {
            record.player_o = Some(PlayerId::random());
        }
        // Both players look alive unless a test says otherwise.
        record.keep_alive = [NOW, NOW];
        record
    }

    #[test]
    fn waiting_has_no_derived_flags() {
        let derivation = derive(&record(Phase::Waiting), true, NOW);
        let view = derivation.view;
        assert!(!view.in_progress);
        assert!(!view.my_turn);
        assert!(!view.is_draw);
        assert!(!view.i_won);
        assert!(!derivation.peer_vanished);
    }

    #[test]
    fn x_turn_from_both_seats() {
        let record = record(Phase::XTurn);

        let for_x = derive(&record, true, NOW).view;
        assert!(for_x.in_progress);
        assert!(for_x.my_turn);
        assert!(!for_x.is_draw);
        assert!(!for_x.i_won);

        let for_o = derive(&record, false, NOW).view;
        assert!(for_o.in_progress);
        assert!(!for_o.my_turn);
    }

    #[test]
    fn o_turn_from_both_seats() {
        let record = record(Phase::OTurn);
        assert!(!derive(&record, true, NOW).view.my_turn);
        assert!(derive(&record, false, NOW).view.my_turn);
    }

    #[test]
    fn draw_sets_only_is_draw() {
        let view = derive(&record(Phase::Draw), true, NOW).view;
        assert!(view.is_draw);
        assert!(!view.in_progress);
        assert!(!view.my_turn);
        assert!(!view.i_won);
    }

    #[test]
    fn winner_flags_follow_the_seat() {
        let record_x = record(Phase::XWon);
        assert!(derive(&record_x, true, NOW).view.i_won);
        assert!(!derive(&record_x, false, NOW).view.i_won);

        let record_o = record(Phase::OWon);
        assert!(!derive(&record_o, true, NOW).view.i_won);
        assert!(derive(&record_o, false, NOW).view.i_won);
    }

    #[test]
    fn stale_peer_cancels_in_progress() {
        let mut rec = record(Phase::XTurn);
        // Player O (our peer) last marked long ago; our own marker is fresh.
        rec.keep_alive = [NOW, NOW - PEER_TIMEOUT_MS];
        let derivation = derive(&rec, true, NOW);
        assert!(!derivation.view.in_progress);
        assert!(derivation.peer_vanished);
        // The turn flag itself is untouched; only progress is cancelled.
        assert!(derivation.view.my_turn);
    }

    #[test]
    fn own_stale_marker_does_not_matter() {
        let mut rec = record(Phase::XTurn);
        rec.keep_alive = [NOW - PEER_TIMEOUT_MS * 2, NOW];
        let derivation = derive(&rec, true, NOW);
        assert!(derivation.view.in_progress);
        assert!(!derivation.peer_vanished);
    }

    #[test]
    fn stale_peer_is_irrelevant_outside_active_phases() {
        for phase in [Phase::Waiting, Phase::Draw, Phase::XWon, Phase::OWon] {
            let mut rec = record(phase);
            rec.keep_alive = [0, 0];
            let derivation = derive(&rec, true, NOW);
            assert!(!derivation.peer_vanished, "phase {phase:?}");
            assert!(!derivation.view.in_progress, "phase {phase:?}");
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let rec = record(Phase::OTurn);
        assert_eq!(derive(&rec, false, NOW), derive(&rec, false, NOW));
    }
}
