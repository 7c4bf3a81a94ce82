use crate::card::{Card, Color};
use crate::registry::RoomCode;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 这些是客户端可以发送给服务器的指令或动作。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    // --- 房间管理消息 ---
    /// 客户端请求创建一个新房间
    CreateRoom { name: String },
    /// 客户端请求加入一个已存在的房间
    JoinRoom { room_code: RoomCode, name: String },

    // --- 游戏内消息 ---
    /// 房主开始游戏
    StartGame,
    /// 打出手牌中第 `card_index` 张；万能牌需要附带所选颜色
    PlayCard { card_index: usize, chosen_color: Option<Color> },
    /// 被 wild_draw4 攻击的玩家选择是否质疑
    RespondChallenge { challenge: bool },
    /// 摸一张牌
    DrawCard,
    /// 摸到可出的牌后，决定是否立即打出
    FinishDrawDecision { play: bool, chosen_color: Option<Color> },
    /// 喊 UNO
    DeclareUno,
    /// 抓没喊 UNO 的玩家
    CatchUno,
}

// --- 服务器 -> 客户端 的消息 ---
// 这些是服务器在游戏状态改变后，广播给所有客户端的事件通知。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    // --- 房间管理消息 ---
    /// 成功加入或创建房间后，服务器私密地发给该玩家
    RoomJoined {
        room_code: RoomCode,
        your_id: PlayerId,
        is_host: bool,
    },
    /// 房间成员列表 (加入、离开时广播)
    PlayerList { players: Vec<LobbyPlayer> },

    // --- 游戏状态更新消息 ---
    /// 游戏开始，附带开局快照
    GameStarted(GameSnapshot),
    /// 公共状态快照，不包含任何人的手牌内容
    GameState(GameSnapshot),
    /// 玩家自己的手牌 (私密)
    HandUpdate { hand: Vec<Card> },

    /// 提示被攻击者选择是否质疑 (只发给被攻击者)
    ChallengePrompt {
        victim_id: PlayerId,
        attacker_id: PlayerId,
        attacker_name: String,
    },
    /// 摸到的牌可以立即打出 (只发给摸牌者)
    DrawChoice { player_id: PlayerId, card: Card },

    /// 一条给所有人看的行动记录
    ActionLog { message: String },
    /// 有人出完了手牌
    GameOver { winner_id: PlayerId, winner_name: String },
    /// 游戏因人数不足中止
    GameAborted { reason: String },

    /// 服务器向特定客户端发送提示或错误信息
    Info { message: String },
    Error { message: String },
}

/// 房间成员的公开信息
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
}

/// 广播给所有人的公共状态
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub room_code: RoomCode,
    pub top_card: Option<Card>,
    pub active_color: Option<Color>,
    pub current_player: Option<PlayerId>,
    /// +1 为正向，-1 为反向
    pub direction: i8,
    pub players: Vec<PlayerSummary>,
}

/// 快照里每个玩家的公开信息：只有手牌数量，没有手牌内容
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub card_count: usize,
    pub is_current_turn: bool,
    pub uno_declared: bool,
}

impl ServerMessage {
    /// 需要单独发送给某个玩家的消息返回该玩家，其余消息广播给整个房间
    pub fn private_recipient(&self) -> Option<PlayerId> {
        match self {
            ServerMessage::ChallengePrompt { victim_id, .. } => Some(*victim_id),
            ServerMessage::DrawChoice { player_id, .. } => Some(*player_id),
            _ => None,
        }
    }
}
