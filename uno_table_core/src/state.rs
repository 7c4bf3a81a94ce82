use crate::card::{Card, Color};
use crate::deck::Deck;
use crate::message::{GameSnapshot, LobbyPlayer, PlayerSummary};
use crate::registry::RoomCode;
use crate::rng::GameRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;

/// 每人开局手牌数
pub const HAND_SIZE: usize = 7;
/// 每个房间最多人数
pub const MAX_PLAYERS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<Card>,
    // 只有手牌为 1 张时才有意义
    pub uno_declared: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Player { id, name, hand: Vec::new(), uno_declared: false }
    }
}

/// 出牌方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// 从 `index` 出发沿 `direction` 走 `steps` 个座位，绕圈取模
pub fn advance_index(index: usize, direction: Direction, steps: usize, player_count: usize) -> usize {
    let n = player_count as isize;
    let delta = direction.sign() as isize * steps as isize;
    (index as isize + delta).rem_euclid(n) as usize
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    /// 等待玩家加入
    Lobby,
    /// 游戏进行中，附带当前回合所处的子状态
    Playing(TurnPhase),
    /// 游戏结束；人数不足中止时没有赢家
    Ended { winner: Option<PlayerId> },
}

/// 进行中的回合子状态
///
/// 两种等待状态互斥，由类型保证同一时刻至多存在一个。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    /// 当前玩家可以出牌或摸牌
    Open,
    /// 有人打出了 wild_draw4，等待被攻击者回应
    AwaitingChallenge(PendingChallenge),
    /// 当前玩家摸到一张可出的牌，等待其决定
    AwaitingDrawDecision(PendingDraw),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChallenge {
    pub attacker: usize,
    pub victim: usize,
    /// 出 wild_draw4 之前生效的颜色，质疑时检查攻击者是否持有该颜色
    pub color_before_play: Color,
    pub ticket: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDraw {
    /// 摸到的牌在手牌中的位置
    pub card_index: usize,
    pub ticket: u64,
}

/// 一个房间的完整游戏状态
///
/// 所有修改都经由 `logic.rs` 中的操作完成，调用方需保证同一时刻只有一个写者。
#[derive(Debug, Clone)]
pub struct GameSession {
    pub(crate) room_code: RoomCode,
    pub(crate) host_id: PlayerId,
    // 座位顺序
    pub(crate) players: Vec<Player>,
    pub(crate) deck: Deck,
    pub(crate) turn_index: usize,
    pub(crate) direction: Direction,
    pub(crate) active_color: Option<Color>,
    pub(crate) previous_active_color: Option<Color>,
    pub(crate) phase: GamePhase,
    // 下一个挂起状态的编号，超时处理据此判断挂起状态是否已经变化
    pub(crate) next_ticket: u64,
}

// --- GameSession 的实现方法 ---

impl GameSession {
    /// 创建处于 Lobby 阶段的空会话
    pub fn new(room_code: RoomCode, host_id: PlayerId, rng: GameRng) -> Self {
        GameSession {
            room_code,
            host_id,
            players: Vec::new(),
            deck: Deck::new(rng),
            turn_index: 0,
            direction: Direction::Forward,
            active_color: None,
            previous_active_color: None,
            phase: GamePhase::Lobby,
            next_ticket: 0,
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.phase, GamePhase::Playing(_))
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn active_color(&self) -> Option<Color> {
        self.active_color
    }

    pub fn previous_active_color(&self) -> Option<Color> {
        self.previous_active_color
    }

    pub fn top_card(&self) -> Option<&Card> {
        self.deck.top()
    }

    pub fn draw_pile_len(&self) -> usize {
        self.deck.draw_pile_len()
    }

    pub fn discard_pile_len(&self) -> usize {
        self.deck.discard_pile_len()
    }

    /// 摸牌堆 + 弃牌堆 + 所有手牌的总张数，开局后恒为 108
    pub fn card_total(&self) -> usize {
        self.deck.draw_pile_len()
            + self.deck.discard_pile_len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    /// 获取当前行动的玩家 (仅游戏进行中)
    pub fn current_player(&self) -> Option<&Player> {
        if self.is_playing() { self.players.get(self.turn_index) } else { None }
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn hand(&self, player_id: PlayerId) -> Option<&[Card]> {
        self.player(player_id).map(|p| p.hand.as_slice())
    }

    pub fn pending_challenge(&self) -> Option<&PendingChallenge> {
        match &self.phase {
            GamePhase::Playing(TurnPhase::AwaitingChallenge(c)) => Some(c),
            _ => None,
        }
    }

    pub fn pending_draw(&self) -> Option<&PendingDraw> {
        match &self.phase {
            GamePhase::Playing(TurnPhase::AwaitingDrawDecision(d)) => Some(d),
            _ => None,
        }
    }

    /// 当前挂起状态的编号 (没有挂起时为 None)
    pub fn pending_ticket(&self) -> Option<u64> {
        match &self.phase {
            GamePhase::Playing(TurnPhase::AwaitingChallenge(c)) => Some(c.ticket),
            GamePhase::Playing(TurnPhase::AwaitingDrawDecision(d)) => Some(d.ticket),
            _ => None,
        }
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::Ended { winner } => winner,
            _ => None,
        }
    }

    /// 从当前座位沿当前方向走 `steps` 步得到的座位
    pub(crate) fn seat_after(&self, seat: usize, steps: usize) -> usize {
        advance_index(seat, self.direction, steps, self.players.len())
    }

    pub(crate) fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// 生成公共快照，不包含任何人的手牌内容
    pub fn snapshot(&self) -> GameSnapshot {
        let current = self.current_player().map(|p| p.id);
        GameSnapshot {
            room_code: self.room_code.clone(),
            top_card: self.deck.top().copied(),
            active_color: self.active_color,
            current_player: current,
            direction: self.direction.sign(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    card_count: p.hand.len(),
                    is_current_turn: Some(p.id) == current,
                    uno_declared: p.uno_declared,
                })
                .collect(),
        }
    }

    pub fn lobby_players(&self) -> Vec<LobbyPlayer> {
        self.players
            .iter()
            .map(|p| LobbyPlayer { id: p.id, name: p.name.clone(), is_host: p.id == self.host_id })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_index_wraps_both_ways() {
        assert_eq!(advance_index(0, Direction::Forward, 1, 3), 1);
        assert_eq!(advance_index(2, Direction::Forward, 1, 3), 0);
        assert_eq!(advance_index(0, Direction::Forward, 2, 3), 2);
        assert_eq!(advance_index(0, Direction::Backward, 1, 3), 2);
        assert_eq!(advance_index(1, Direction::Backward, 2, 3), 2);
        assert_eq!(advance_index(0, Direction::Forward, 2, 2), 0);
        assert_eq!(advance_index(1, Direction::Backward, 5, 4), 0);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Forward.reversed(), Direction::Backward);
        assert_eq!(Direction::Backward.reversed().sign(), 1);
    }

    #[test]
    fn test_new_session_is_empty_lobby() {
        let code: RoomCode = "ROOM01".parse().unwrap();
        let session = GameSession::new(code, Uuid::new_v4(), GameRng::new(0));
        assert_eq!(session.phase(), &GamePhase::Lobby);
        assert_eq!(session.card_total(), 0);
        assert!(session.current_player().is_none());
        assert!(session.pending_ticket().is_none());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.top_card, None);
        assert_eq!(snapshot.current_player, None);
        assert_eq!(snapshot.direction, 1);
    }
}
