//! The remote game record and its tagged binary codec.
//!
//! The record payload is a length-prefixed MessagePack value: a single-entry
//! map whose key is the record tag (`"Game"`) and whose value is the field
//! array `[phase, board, player-x, player-o, keep-alive]`. The tag is
//! inspected before any field is decoded, so a record of another kind fails
//! with [`ProtocolError::UnexpectedTag`] rather than a shape error.

use rmpv::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::frame;
use crate::{PlayerId, ProtocolError};

/// Wire tag of the game record.
const GAME_TAG: &str = "Game";

/// Wire sentinel for an unclaimed board cell.
const FREE_CODE: &str = "F";

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// Game phase as stored in the remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Record exists, waiting for a second player.
    Waiting,
    /// Player X to move.
    XTurn,
    /// Player O to move.
    OTurn,
    /// Game over, no winner.
    Draw,
    /// Player X won.
    XWon,
    /// Player O won.
    OWon,
}

impl Phase {
    /// Wire tag for this phase.
    pub fn tag(&self) -> &'static str {
        match self {
            Phase::Waiting => "Waiting",
            Phase::XTurn => "XTurn",
            Phase::OTurn => "OTurn",
            Phase::Draw => "Draw",
            Phase::XWon => "XWon",
            Phase::OWon => "OWon",
        }
    }

    /// Parse a wire tag into a phase.
    pub fn from_tag(tag: &str) -> Result<Self, ProtocolError> {
        match tag {
            "Waiting" => Ok(Phase::Waiting),
            "XTurn" => Ok(Phase::XTurn),
            "OTurn" => Ok(Phase::OTurn),
            "Draw" => Ok(Phase::Draw),
            "XWon" => Ok(Phase::XWon),
            "OWon" => Ok(Phase::OWon),
            other => Err(ProtocolError::UnknownPhase(other.to_string())),
        }
    }

    /// True for the two phases in which the game is being played.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::XTurn | Phase::OTurn)
    }

    /// True once the game can no longer progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Draw | Phase::XWon | Phase::OWon)
    }
}

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Unclaimed. Stored on the wire as the `"F"` (free) sentinel.
    Empty,
    /// Claimed by player X.
    X,
    /// Claimed by player O.
    O,
}

impl Cell {
    fn code(&self) -> &'static str {
        match self {
            Cell::Empty => FREE_CODE,
            Cell::X => "X",
            Cell::O => "O",
        }
    }

    fn from_code(code: &str) -> Result<Self, ProtocolError> {
        match code {
            FREE_CODE => Ok(Cell::Empty),
            "X" => Ok(Cell::X),
            "O" => Ok(Cell::O),
            other => Err(invalid(format!("unknown cell code: {other:?}"))),
        }
    }
}

/// The 3x3 board, stored in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board([Cell; BOARD_CELLS]);

impl Board {
    /// An empty board.
    pub fn empty() -> Self {
        Self([Cell::Empty; BOARD_CELLS])
    }

    /// Build a board from cells in row-major order.
    pub fn from_cells(cells: [Cell; BOARD_CELLS]) -> Self {
        Self(cells)
    }

    /// Cell at 0-indexed column `x`, row `y`.
    ///
    /// Panics if `x` or `y` is outside `0..3`; callers validate coordinates.
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.0[Self::index(x, y)]
    }

    /// Place `cell` at 0-indexed column `x`, row `y`.
    ///
    /// Panics if `x` or `y` is outside `0..3`; callers validate coordinates.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.0[Self::index(x, y)] = cell;
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.0
    }

    fn index(x: usize, y: usize) -> usize {
        assert!(x < 3 && y < 3, "board coordinates out of range");
        y * 3 + x
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..3 {
            for x in 0..3 {
                let glyph = match self.cell(x, y) {
                    Cell::Empty => '.',
                    Cell::X => 'X',
                    Cell::O => 'O',
                };
                write!(f, "{glyph}")?;
            }
            if y < 2 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// The authoritative game state decoded from one remote record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Current game phase.
    pub phase: Phase,
    /// Board contents.
    pub board: Board,
    /// Identity of player X (the game's creator).
    pub player_x: PlayerId,
    /// Identity of player O; absent only while `phase` is `Waiting`.
    pub player_o: Option<PlayerId>,
    /// Keep-alive markers in milliseconds, index 0 = player X, 1 = player O.
    pub keep_alive: [u64; 2],
}

impl GameRecord {
    /// Fresh record as written by the `InitGame` command.
    pub fn new(player_x: PlayerId) -> Self {
        Self {
            phase: Phase::Waiting,
            board: Board::empty(),
            player_x,
            player_o: None,
            keep_alive: [0, 0],
        }
    }

    /// Decode a record from a raw account payload.
    ///
    /// Validates the length prefix against the buffer before reading any
    /// MessagePack ([`ProtocolError::MalformedState`]), then checks the
    /// record tag ([`ProtocolError::UnexpectedTag`]) before extracting
    /// fields. Pure function of the byte buffer.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let body = frame::open(buf)?;
        let value: Value = rmp_serde::from_slice(body).map_err(ProtocolError::Decode)?;
        let fields = untag(&value)?
            .as_array()
            .ok_or_else(|| invalid("record fields are not an array"))?;
        let [phase, board, player_x, player_o, keep_alive] = fields.as_slice() else {
            return Err(invalid(format!(
                "expected 5 record fields, found {}",
                fields.len()
            )));
        };

        let phase_tag = phase
            .as_str()
            .ok_or_else(|| invalid("phase tag is not a string"))?;
        let phase = Phase::from_tag(phase_tag)?;

        let codes = board
            .as_array()
            .ok_or_else(|| invalid("board is not an array"))?;
        if codes.len() != BOARD_CELLS {
            return Err(invalid(format!(
                "board has {} cells, expected {BOARD_CELLS}",
                codes.len()
            )));
        }
        let mut cells = [Cell::Empty; BOARD_CELLS];
        for (slot, code) in cells.iter_mut().zip(codes) {
            let code = code
                .as_str()
                .ok_or_else(|| invalid("board cell is not a string"))?;
            *slot = Cell::from_code(code)?;
        }

        let player_x = decode_identity(player_x)?;
        let player_o = if player_o.is_nil() {
            None
        } else {
            Some(decode_identity(player_o)?)
        };

        let markers = keep_alive
            .as_array()
            .ok_or_else(|| invalid("keep-alive markers are not an array"))?;
        let [x_marker, o_marker] = markers.as_slice() else {
            return Err(invalid(format!(
                "expected 2 keep-alive markers, found {}",
                markers.len()
            )));
        };
        let keep_alive = [decode_marker(x_marker)?, decode_marker(o_marker)?];

        Ok(Self {
            phase,
            board: Board(cells),
            player_x,
            player_o,
            keep_alive,
        })
    }

    /// Encode into a framed account payload.
    ///
    /// Exact inverse of [`GameRecord::decode`]: unclaimed cells are written
    /// as the free sentinel, never as a public `Empty` value.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let cells = self
            .board
            .cells()
            .iter()
            .map(|cell| Value::from(cell.code()))
            .collect();
        let player_o = match &self.player_o {
            Some(id) => Value::Binary(id.as_bytes().to_vec()),
            None => Value::Nil,
        };
        let fields = Value::Array(vec![
            Value::from(self.phase.tag()),
            Value::Array(cells),
            Value::Binary(self.player_x.as_bytes().to_vec()),
            player_o,
            Value::Array(vec![
                Value::from(self.keep_alive[0]),
                Value::from(self.keep_alive[1]),
            ]),
        ]);
        let tagged = Value::Map(vec![(Value::from(GAME_TAG), fields)]);
        let body = rmp_serde::to_vec(&tagged).map_err(ProtocolError::Encode)?;
        Ok(frame::seal(body))
    }
}

/// Check the top-level tag and return the tagged fields.
fn untag(value: &Value) -> Result<&Value, ProtocolError> {
    let entries = value
        .as_map()
        .ok_or_else(|| invalid("top-level value is not a tagged record"))?;
    let [(tag, fields)] = entries.as_slice() else {
        return Err(invalid("expected a single-entry tag map"));
    };
    let tag = tag
        .as_str()
        .ok_or_else(|| invalid("record tag is not a string"))?;
    if tag != GAME_TAG {
        return Err(ProtocolError::UnexpectedTag(tag.to_string()));
    }
    Ok(fields)
}

fn decode_identity(value: &Value) -> Result<PlayerId, ProtocolError> {
    let bytes = value
        .as_slice()
        .ok_or_else(|| invalid("player identity is not binary"))?;
    PlayerId::from_bytes(bytes)
        .ok_or_else(|| invalid(format!("player identity has {} bytes", bytes.len())))
}

fn decode_marker(value: &Value) -> Result<u64, ProtocolError> {
    value
        .as_u64()
        .ok_or_else(|| invalid("keep-alive marker is not an unsigned integer"))
}

fn invalid(msg: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidData(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GameRecord {
        let mut record = GameRecord::new(PlayerId::random());
        record.phase = Phase::OTurn;
        record.player_o = Some(PlayerId::random());
        record.board.set(0, 0, Cell::X);
        record.board.set(1, 2, Cell::O);
        record.keep_alive = [1_705_000_000_000, 1_705_000_000_500];
        record
    }

    #[test]
    fn record_roundtrip() {
        let record = sample_record();
        let restored = GameRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn fresh_record_is_waiting_without_player_o() {
        let record = GameRecord::new(PlayerId::random());
        let restored = GameRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(restored.phase, Phase::Waiting);
        assert!(restored.player_o.is_none());
        assert_eq!(restored.keep_alive, [0, 0]);
        assert_eq!(restored.board, Board::empty());
    }

    #[test]
    fn decode_ignores_account_padding() {
        let record = sample_record();
        let mut payload = record.encode().unwrap();
        payload.resize(256, 0);
        assert_eq!(GameRecord::decode(&payload).unwrap(), record);
    }

    #[test]
    fn empty_never_appears_on_the_wire() {
        // The free sentinel is the only encoding of an unclaimed cell.
        let payload = GameRecord::new(PlayerId::random()).encode().unwrap();
        let body = &payload[4..];
        let value: Value = rmp_serde::from_slice(body).unwrap();
        let fields = value.as_map().unwrap()[0].1.as_array().unwrap();
        let codes = fields[1].as_array().unwrap();
        assert_eq!(codes.len(), BOARD_CELLS);
        for code in codes {
            assert_eq!(code.as_str(), Some(FREE_CODE));
        }
    }

    #[test]
    fn oversized_prefix_fails_before_msgpack() {
        // The prefix claims more than the buffer holds; the body is garbage
        // that would also fail msgpack decoding, proving we never get there.
        let mut payload = 1000u32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[0xC1, 0xC1]); // 0xC1 is never valid msgpack
        assert!(matches!(
            GameRecord::decode(&payload),
            Err(ProtocolError::MalformedState { .. })
        ));
    }

    #[test]
    fn wrong_tag_fails_with_unexpected_tag() {
        let tagged = Value::Map(vec![(Value::from("Chess"), Value::Array(vec![]))]);
        let payload = crate::frame::seal(rmp_serde::to_vec(&tagged).unwrap());
        match GameRecord::decode(&payload) {
            Err(ProtocolError::UnexpectedTag(tag)) => assert_eq!(tag, "Chess"),
            other => panic!("expected UnexpectedTag, got {other:?}"),
        }
    }

    #[test]
    fn unknown_phase_fails() {
        let record = sample_record();
        let mut payload = record.encode().unwrap();
        // Corrupt the phase tag by re-encoding with a bogus one.
        let value: Value = rmp_serde::from_slice(&payload[4..]).unwrap();
        let mut entries = value.as_map().unwrap().clone();
        let mut fields = entries[0].1.as_array().unwrap().clone();
        fields[0] = Value::from("ZTurn");
        entries[0].1 = Value::Array(fields);
        payload = crate::frame::seal(rmp_serde::to_vec(&Value::Map(entries)).unwrap());
        match GameRecord::decode(&payload) {
            Err(ProtocolError::UnknownPhase(tag)) => assert_eq!(tag, "ZTurn"),
            other => panic!("expected UnknownPhase, got {other:?}"),
        }
    }

    #[test]
    fn truncated_board_fails_with_invalid_data() {
        let record = sample_record();
        let value: Value = rmp_serde::from_slice(&record.encode().unwrap()[4..]).unwrap();
        let mut entries = value.as_map().unwrap().clone();
        let mut fields = entries[0].1.as_array().unwrap().clone();
        let mut codes = fields[1].as_array().unwrap().clone();
        codes.truncate(5);
        fields[1] = Value::Array(codes);
        entries[0].1 = Value::Array(fields);
        let payload = crate::frame::seal(rmp_serde::to_vec(&Value::Map(entries)).unwrap());
        assert!(matches!(
            GameRecord::decode(&payload),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn phase_tag_roundtrip() {
        for phase in [
            Phase::Waiting,
            Phase::XTurn,
            Phase::OTurn,
            Phase::Draw,
            Phase::XWon,
            Phase::OWon,
        ] {
            assert_eq!(Phase::from_tag(phase.tag()).unwrap(), phase);
        }
    }

    #[test]
    fn unknown_phase_tag_is_rejected() {
        assert!(matches!(
            Phase::from_tag("Paused"),
            Err(ProtocolError::UnknownPhase(_))
        ));
    }

    #[test]
    fn phase_classification() {
        assert!(Phase::XTurn.is_active());
        assert!(Phase::OTurn.is_active());
        assert!(!Phase::Waiting.is_active());
        assert!(!Phase::Draw.is_active());

        assert!(Phase::Draw.is_terminal());
        assert!(Phase::XWon.is_terminal());
        assert!(Phase::OWon.is_terminal());
        assert!(!Phase::Waiting.is_terminal());
        assert!(!Phase::XTurn.is_terminal());
    }

    #[test]
    fn board_coordinates_are_row_major() {
        let mut board = Board::empty();
        board.set(2, 0, Cell::X);
        assert_eq!(board.cells()[2], Cell::X);
        board.set(0, 1, Cell::O);
        assert_eq!(board.cells()[3], Cell::O);
    }

    #[test]
    fn board_display() {
        let mut board = Board::empty();
        board.set(0, 0, Cell::X);
        board.set(1, 1, Cell::O);
        assert_eq!(board.to_string(), "X..\n.O.\n...");
    }
}
