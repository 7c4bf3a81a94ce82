use crate::card::*;
use crate::error::GameError;
use crate::message::ServerMessage;
use crate::state::*;
use tracing::{debug, info};

/// wild_draw4 的两种处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WildDrawFour {
    /// 正常出牌：挂起，等待被攻击者决定是否质疑
    Challengeable,
    /// 摸到后立即打出：直接让下家摸 4 张，不再进入质疑
    Immediate,
}

/// 万能牌的颜色：没选或选了黑色时默认红色
fn wild_color(chosen: Option<Color>) -> Color {
    match chosen {
        Some(color) if color != Color::Black => color,
        _ => Color::Red,
    }
}

// --- 核心游戏流程函数 ---

impl GameSession {
    /// 玩家加入房间，只能在 Lobby 阶段
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> Result<Vec<ServerMessage>, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        if self.seat_of(id).is_none() {
            self.players.push(Player::new(id, name.into()));
        }
        Ok(vec![ServerMessage::PlayerList { players: self.lobby_players() }])
    }

    /// 玩家离开房间
    ///
    /// - 房主离开时由座位最前的玩家接任。
    /// - 游戏中离开时，牵涉到该玩家的挂起状态会被撤销，回合交给合适的下一位。
    /// - 游戏中人数不足 2 人时游戏中止，没有赢家。
    ///
    /// 房间清空后由调用者把会话从房间表中删除。
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        let departing = self.players[seat].name.clone();
        let shift = |i: usize| if i > seat { i - 1 } else { i };

        // 在移除之前，先确定之后轮到谁以及回合子状态
        let resume = match &self.phase {
            GamePhase::Playing(turn) => {
                let current = self.players[self.turn_index].id;
                Some(match turn {
                    TurnPhase::AwaitingChallenge(c) if seat == c.attacker => {
                        (self.players[c.victim].id, TurnPhase::Open)
                    }
                    TurnPhase::AwaitingChallenge(c) if seat == c.victim => {
                        (self.players[self.seat_after(c.victim, 1)].id, TurnPhase::Open)
                    }
                    TurnPhase::AwaitingChallenge(c) => {
                        let moved = PendingChallenge { attacker: shift(c.attacker), victim: shift(c.victim), ..*c };
                        (current, TurnPhase::AwaitingChallenge(moved))
                    }
                    _ if seat == self.turn_index => (self.players[self.seat_after(seat, 1)].id, TurnPhase::Open),
                    other => (current, other.clone()),
                })
            }
            _ => None,
        };

        let departed = self.players.remove(seat);
        // 离开玩家的手牌洗回摸牌堆
        self.deck.return_cards(departed.hand);
        info!(room = %self.room_code, player = %departing, "玩家离开");

        let mut events = Vec::new();
        if self.host_id == player_id {
            if let Some(new_host) = self.players.first() {
                self.host_id = new_host.id;
                events.push(ServerMessage::Info { message: format!("房主已离开，新房主是 {}", new_host.name) });
            }
        }
        events.push(ServerMessage::PlayerList { players: self.lobby_players() });

        if let Some((next_id, turn)) = resume {
            if self.players.len() < 2 {
                self.phase = GamePhase::Ended { winner: None };
                info!(room = %self.room_code, "人数不足，游戏中止");
                events.push(ServerMessage::GameAborted { reason: format!("{} 离开了，人数不足，游戏结束", departing) });
            } else {
                self.turn_index = self.seat_of(next_id).unwrap_or(0);
                self.phase = GamePhase::Playing(turn);
                events.push(ServerMessage::GameState(self.snapshot()));
            }
        }
        Ok(events)
    }

    /// 开始新的一局游戏
    ///
    /// - 清空手牌，重建并洗牌，每人发 7 张。
    /// - 翻开第一张牌 (不能是 wild_draw4)，并按规则处理它的效果。
    pub fn start(&mut self) -> Result<Vec<ServerMessage>, GameError> {
        if self.is_playing() {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        for player in &mut self.players {
            player.hand.clear();
            player.uno_declared = false;
        }
        self.deck.reset();
        for player in &mut self.players {
            player.hand = self.deck.draw(HAND_SIZE);
        }

        self.turn_index = 0;
        self.direction = Direction::Forward;
        self.active_color = None;
        self.previous_active_color = None;
        self.phase = GamePhase::Playing(TurnPhase::Open);

        let opening = loop {
            match self.deck.draw_one() {
                Some(card) if card.face == Face::WildDrawFour => self.deck.return_and_shuffle(card),
                other => break other,
            }
        };
        if let Some(card) = opening {
            self.deck.discard(card);
            self.apply_opening(card);
            info!(room = %self.room_code, players = self.players.len(), opening = %card, "游戏开始");
        }

        Ok(vec![ServerMessage::GameStarted(self.snapshot())])
    }

    /// 处理开局翻出的第一张牌，座位 0 是第一个行动的玩家
    fn apply_opening(&mut self, card: Card) {
        // 开局是 wild 时不让玩家选色，直接定为红色
        self.active_color = Some(if card.is_wild() { Color::Red } else { card.color });
        match card.face {
            Face::Reverse if self.players.len() == 2 => self.turn_index = 1,
            Face::Reverse => {
                self.direction = self.direction.reversed();
                self.turn_index = self.seat_after(0, 1);
            }
            Face::Skip => self.turn_index = 1,
            Face::DrawTwo => {
                self.give_cards(0, 2);
                self.turn_index = 1;
            }
            _ => {}
        }
    }

    /// 当前玩家打出一张手牌
    pub fn play_card(
        &mut self,
        player_id: PlayerId,
        card_index: usize,
        chosen_color: Option<Color>,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.require_open_turn(player_id)?;
        let card = *self.players[seat].hand.get(card_index).ok_or(GameError::IllegalCard)?;
        let top = *self.deck.top().ok_or(GameError::GameNotInProgress)?;
        if !is_legal(&card, &top, self.active_color) {
            return Err(GameError::IllegalCard);
        }

        let mut events = Vec::new();
        self.commit_play(seat, card_index, chosen_color);
        if let Some(steps) = self.resolve_effect(card, WildDrawFour::Challengeable, &mut events) {
            self.finish_turn(seat, steps, &mut events);
        }
        Ok(events)
    }

    /// 被攻击者回应 wild_draw4：`challenge` 为 true 表示质疑
    pub fn respond_challenge(&mut self, player_id: PlayerId, challenge: bool) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        let pending = match &self.phase {
            GamePhase::Playing(TurnPhase::AwaitingChallenge(c)) => *c,
            GamePhase::Playing(_) => return Err(GameError::NoPendingAction),
            _ => return Err(GameError::GameNotInProgress),
        };
        if seat != pending.victim {
            return Err(GameError::WrongResponder);
        }

        // 先清除挂起状态，再结算
        self.phase = GamePhase::Playing(TurnPhase::Open);
        Ok(self.resolve_challenge(pending, challenge))
    }

    /// 当前玩家摸一张牌
    ///
    /// 摸到的牌可以出时进入等待决定的状态，否则直接结束回合。
    pub fn draw_card(&mut self, player_id: PlayerId) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.require_open_turn(player_id)?;
        let mut events = Vec::new();

        let drawn = self.deck.draw(1);
        let Some(&card) = drawn.first() else {
            debug!(room = %self.room_code, "牌已摸完，直接结束回合");
            self.finish_turn(seat, 1, &mut events);
            return Ok(events);
        };
        self.take_into_hand(seat, drawn);

        let playable = self.deck.top().is_some_and(|top| is_legal(&card, top, self.active_color));
        if playable {
            let card_index = self.players[seat].hand.len() - 1;
            let ticket = self.issue_ticket();
            self.phase = GamePhase::Playing(TurnPhase::AwaitingDrawDecision(PendingDraw { card_index, ticket }));
            events.push(ServerMessage::DrawChoice { player_id, card });
            events.push(ServerMessage::GameState(self.snapshot()));
        } else {
            self.finish_turn(seat, 1, &mut events);
        }
        Ok(events)
    }

    /// 摸到可出的牌后做出决定：`play` 为 true 时立即打出
    pub fn finish_draw_decision(
        &mut self,
        player_id: PlayerId,
        play: bool,
        chosen_color: Option<Color>,
    ) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        let pending = match &self.phase {
            GamePhase::Playing(TurnPhase::AwaitingDrawDecision(d)) => *d,
            GamePhase::Playing(_) => return Err(GameError::NoPendingAction),
            _ => return Err(GameError::GameNotInProgress),
        };
        if seat != self.turn_index {
            return Err(GameError::NotYourTurn);
        }

        self.phase = GamePhase::Playing(TurnPhase::Open);
        let mut events = Vec::new();
        if play && pending.card_index < self.players[seat].hand.len() {
            let card = self.commit_play(seat, pending.card_index, chosen_color);
            if let Some(steps) = self.resolve_effect(card, WildDrawFour::Immediate, &mut events) {
                self.finish_turn(seat, steps, &mut events);
            }
        } else {
            self.finish_turn(seat, 1, &mut events);
        }
        Ok(events)
    }

    /// 玩家喊 UNO，任何时候都可以喊
    pub fn declare_uno(&mut self, player_id: PlayerId) -> Result<Vec<ServerMessage>, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        self.players[seat].uno_declared = true;

        let mut events = vec![ServerMessage::ActionLog { message: format!("{} 喊了 UNO！", self.players[seat].name) }];
        if self.is_playing() {
            events.push(ServerMessage::GameState(self.snapshot()));
        }
        Ok(events)
    }

    /// 抓 UNO：所有只剩 1 张牌却没喊 UNO 的玩家各罚摸 2 张
    pub fn catch_uno(&mut self, caller: PlayerId) -> Result<Vec<ServerMessage>, GameError> {
        self.seat_of(caller).ok_or(GameError::PlayerNotFound)?;
        if !self.is_playing() {
            return Err(GameError::GameNotInProgress);
        }

        let mut events = Vec::new();
        for seat in 0..self.players.len() {
            if self.players[seat].hand.len() == 1 && !self.players[seat].uno_declared {
                self.give_cards(seat, 2);
                // 罚牌后关闭这次被抓的窗口
                self.players[seat].uno_declared = true;
                events.push(ServerMessage::ActionLog { message: format!("{} 没喊 UNO 被抓了！(+2 张)", self.players[seat].name) });
            }
        }
        events.push(ServerMessage::GameState(self.snapshot()));
        Ok(events)
    }

    /// 挂起状态超时：质疑视为不质疑，摸牌决定视为不出
    ///
    /// `ticket` 与当前挂起状态不符 (已被回应或已是新的挂起) 时返回 `NoPendingAction`。
    pub fn expire_pending(&mut self, ticket: u64) -> Result<Vec<ServerMessage>, GameError> {
        if self.pending_ticket() != Some(ticket) {
            return Err(GameError::NoPendingAction);
        }
        let turn = match &self.phase {
            GamePhase::Playing(turn) => turn.clone(),
            _ => return Err(GameError::NoPendingAction),
        };
        self.phase = GamePhase::Playing(TurnPhase::Open);

        let mut events = Vec::new();
        match turn {
            TurnPhase::AwaitingChallenge(c) => {
                let victim = self.players[c.victim].name.clone();
                events.push(ServerMessage::ActionLog { message: format!("{} 超时未回应，视为不质疑", victim) });
                events.extend(self.resolve_challenge(c, false));
            }
            TurnPhase::AwaitingDrawDecision(_) => {
                let seat = self.turn_index;
                let name = self.players[seat].name.clone();
                events.push(ServerMessage::ActionLog { message: format!("{} 超时，保留摸到的牌", name) });
                self.finish_turn(seat, 1, &mut events);
            }
            TurnPhase::Open => return Err(GameError::NoPendingAction),
        }
        Ok(events)
    }

    // --- 辅助逻辑函数 ---

    /// 校验：玩家在房间里、游戏进行中、轮到他、且没有挂起的决定
    fn require_open_turn(&self, player_id: PlayerId) -> Result<usize, GameError> {
        let seat = self.seat_of(player_id).ok_or(GameError::PlayerNotFound)?;
        let GamePhase::Playing(turn) = &self.phase else {
            return Err(GameError::GameNotInProgress);
        };
        if seat != self.turn_index {
            return Err(GameError::NotYourTurn);
        }
        if *turn != TurnPhase::Open {
            return Err(GameError::PendingActionBlocksMove);
        }
        Ok(seat)
    }

    /// 把牌放进玩家手里；手牌超过 1 张时 UNO 标记失效
    fn take_into_hand(&mut self, seat: usize, cards: Vec<Card>) {
        let player = &mut self.players[seat];
        player.hand.extend(cards);
        if player.hand.len() > 1 {
            player.uno_declared = false;
        }
    }

    /// 让某个座位的玩家摸 `count` 张牌，返回实际摸到的张数
    pub(crate) fn give_cards(&mut self, seat: usize, count: usize) -> usize {
        let drawn = self.deck.draw(count);
        let n = drawn.len();
        self.take_into_hand(seat, drawn);
        n
    }

    /// 把牌从手里移到弃牌堆并更新当前颜色
    fn commit_play(&mut self, seat: usize, card_index: usize, chosen_color: Option<Color>) -> Card {
        let card = self.players[seat].hand.remove(card_index);
        let color_before = self.active_color.or_else(|| self.deck.top().map(|c| c.color));
        self.deck.discard(card);
        self.previous_active_color = color_before;
        self.active_color = Some(if card.is_wild() { wild_color(chosen_color) } else { card.color });
        debug!(room = %self.room_code, player = %self.players[seat].name, card = %card, "出牌");
        card
    }

    /// 结算牌的效果，返回回合要前进的步数；进入质疑等待时返回 None
    fn resolve_effect(&mut self, card: Card, mode: WildDrawFour, events: &mut Vec<ServerMessage>) -> Option<usize> {
        let seat = self.turn_index;
        match card.face {
            Face::Number(_) | Face::Wild => Some(1),
            Face::Skip => Some(2),
            // 两人局的 reverse 等同于 skip
            Face::Reverse if self.players.len() == 2 => Some(2),
            Face::Reverse => {
                self.direction = self.direction.reversed();
                Some(1)
            }
            Face::DrawTwo => {
                let victim = self.seat_after(seat, 1);
                self.give_cards(victim, 2);
                Some(2)
            }
            Face::WildDrawFour if mode == WildDrawFour::Immediate => {
                let victim = self.seat_after(seat, 1);
                self.give_cards(victim, 4);
                Some(2)
            }
            Face::WildDrawFour => {
                let victim = self.seat_after(seat, 1);
                let ticket = self.issue_ticket();
                let pending = PendingChallenge {
                    attacker: seat,
                    victim,
                    color_before_play: self.previous_active_color.unwrap_or(Color::Red),
                    ticket,
                };
                self.phase = GamePhase::Playing(TurnPhase::AwaitingChallenge(pending));
                events.push(ServerMessage::ChallengePrompt {
                    victim_id: self.players[victim].id,
                    attacker_id: self.players[seat].id,
                    attacker_name: self.players[seat].name.clone(),
                });
                events.push(ServerMessage::GameState(self.snapshot()));
                None
            }
        }
    }

    /// 结算质疑 (挂起状态已由调用者清除)
    fn resolve_challenge(&mut self, pending: PendingChallenge, challenge: bool) -> Vec<ServerMessage> {
        let PendingChallenge { attacker, victim, color_before_play, .. } = pending;
        let attacker_name = self.players[attacker].name.clone();
        let victim_name = self.players[victim].name.clone();
        let mut events = Vec::new();

        if challenge {
            let bluffed = self.players[attacker].hand.iter().any(|c| c.color == color_before_play);
            if bluffed {
                // 质疑成功：攻击者摸 4 张，轮到被攻击者
                self.give_cards(attacker, 4);
                debug!(room = %self.room_code, attacker = %attacker_name, "质疑成功");
                events.push(ServerMessage::ActionLog { message: format!("质疑成功！{} 摸 4 张", attacker_name) });
                self.turn_index = victim;
                events.push(ServerMessage::GameState(self.snapshot()));
                return events;
            }
            self.give_cards(victim, 6);
            debug!(room = %self.room_code, victim = %victim_name, "质疑失败");
            events.push(ServerMessage::ActionLog { message: format!("质疑失败！{} 摸 6 张", victim_name) });
        } else {
            self.give_cards(victim, 4);
            events.push(ServerMessage::ActionLog { message: format!("{} 摸 4 张", victim_name) });
        }

        self.finish_turn(attacker, 2, &mut events);
        events
    }

    /// 结束 `seat` 的回合：出完牌则获胜，否则从该座位前进 `steps` 步
    fn finish_turn(&mut self, seat: usize, steps: usize, events: &mut Vec<ServerMessage>) {
        if self.players[seat].hand.is_empty() {
            self.declare_winner(seat, events);
            return;
        }
        if self.players[seat].hand.len() > 1 {
            self.players[seat].uno_declared = false;
        }
        self.turn_index = self.seat_after(seat, steps);
        events.push(ServerMessage::GameState(self.snapshot()));
    }

    fn declare_winner(&mut self, seat: usize, events: &mut Vec<ServerMessage>) {
        let winner = &self.players[seat];
        self.phase = GamePhase::Ended { winner: Some(winner.id) };
        info!(room = %self.room_code, winner = %winner.name, "游戏结束");
        events.push(ServerMessage::GameOver { winner_id: winner.id, winner_name: winner.name.clone() });
    }
}

// --- 单元测试 ---
