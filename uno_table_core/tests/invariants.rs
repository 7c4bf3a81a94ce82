//! 随机操作序列下的牌局不变量

use proptest::prelude::*;
use uno_table_core::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    /// 当前玩家打出第一张能出的牌
    PlayFirstLegal { color: usize },
    /// 任意玩家尝试打出任意位置的牌 (大多会被拒绝)
    PlayAny { actor: usize, index: usize, color: usize },
    Draw { actor: usize },
    /// 被攻击者回应质疑
    Respond { challenge: bool },
    /// 任意玩家尝试回应质疑
    RespondAny { actor: usize, challenge: bool },
    Decide { play: bool, color: usize },
    Declare { actor: usize },
    Catch { actor: usize },
    Expire,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..4usize).prop_map(|color| Op::PlayFirstLegal { color }),
        2 => (0..6usize, 0..12usize, 0..5usize).prop_map(|(actor, index, color)| Op::PlayAny { actor, index, color }),
        3 => (0..6usize).prop_map(|actor| Op::Draw { actor }),
        2 => any::<bool>().prop_map(|challenge| Op::Respond { challenge }),
        1 => (0..6usize, any::<bool>()).prop_map(|(actor, challenge)| Op::RespondAny { actor, challenge }),
        2 => (any::<bool>(), 0..4usize).prop_map(|(play, color)| Op::Decide { play, color }),
        1 => (0..6usize).prop_map(|actor| Op::Declare { actor }),
        1 => (0..6usize).prop_map(|actor| Op::Catch { actor }),
        1 => Just(Op::Expire),
    ]
}

fn color_of(i: usize) -> Option<Color> {
    [Color::Red, Color::Blue, Color::Green, Color::Yellow, Color::Black].get(i).copied()
}

fn apply(session: &mut GameSession, ids: &[PlayerId], op: &Op) -> Result<Vec<ServerMessage>, GameError> {
    let n = ids.len();
    let current = session.current_player().map(|p| p.id).unwrap_or(ids[0]);
    match *op {
        Op::PlayFirstLegal { color } => {
            let top = session.top_card().copied();
            let active = session.active_color();
            let index = session
                .hand(current)
                .and_then(|hand| hand.iter().position(|c| top.is_some_and(|t| is_legal(c, &t, active))));
            match index {
                Some(index) => session.play_card(current, index, color_of(color)),
                None => session.draw_card(current),
            }
        }
        Op::PlayAny { actor, index, color } => session.play_card(ids[actor % n], index, color_of(color)),
        Op::Draw { actor } => session.draw_card(ids[actor % n]),
        Op::Respond { challenge } => {
            let victim = session.pending_challenge().map(|c| session.players()[c.victim].id);
            session.respond_challenge(victim.unwrap_or(current), challenge)
        }
        Op::RespondAny { actor, challenge } => session.respond_challenge(ids[actor % n], challenge),
        Op::Decide { play, color } => session.finish_draw_decision(current, play, color_of(color)),
        Op::Declare { actor } => session.declare_uno(ids[actor % n]),
        Op::Catch { actor } => session.catch_uno(ids[actor % n]),
        Op::Expire => match session.pending_ticket() {
            Some(ticket) => session.expire_pending(ticket),
            None => Err(GameError::NoPendingAction),
        },
    }
}

fn hands(session: &GameSession) -> Vec<Vec<Card>> {
    session.players().iter().map(|p| p.hand.clone()).collect()
}

fn check_invariants(session: &GameSession, before: &[Vec<Card>], op: &Op) -> Result<(), TestCaseError> {
    prop_assert_eq!(session.card_total(), DECK_SIZE);
    prop_assert!(session.discard_pile_len() >= 1);

    let snapshot = session.snapshot();
    prop_assert!(snapshot.direction == 1 || snapshot.direction == -1);

    match session.phase() {
        GamePhase::Playing(_) => {
            prop_assert!(session.turn_index() < session.players().len());
            prop_assert_eq!(snapshot.players.iter().filter(|p| p.is_current_turn).count(), 1);
            prop_assert!(session.pending_challenge().is_none() || session.pending_draw().is_none());
            if let Some(c) = session.pending_challenge() {
                prop_assert!(c.attacker < session.players().len() && c.victim < session.players().len());
                prop_assert_ne!(c.attacker, c.victim);
                prop_assert_eq!(c.attacker, session.turn_index());
            }
            if let Some(d) = session.pending_draw() {
                let hand = session.players()[session.turn_index()].hand.len();
                prop_assert!(d.card_index < hand);
            }
        }
        GamePhase::Ended { winner } => {
            let winner = winner.and_then(|id| session.player(id));
            prop_assert!(winner.is_some_and(|p| p.hand.is_empty()));
        }
        GamePhase::Lobby => return Err(TestCaseError::fail("牌局不会回到 Lobby")),
    }

    // 手牌增加到 1 张以上的玩家不能保留 UNO 标记 (抓 UNO 会强制置位)
    if !matches!(op, Op::Catch { .. }) {
        for (player, old) in session.players().iter().zip(before) {
            if player.hand.len() > old.len() && player.hand.len() > 1 {
                prop_assert!(!player.uno_declared, "{} 摸牌后仍保留 UNO 标记", player.name);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_games_keep_invariants(
        seed in any::<u64>(),
        player_count in 2usize..=5,
        ops in prop::collection::vec(op_strategy(), 1..250),
    ) {
        let ids: Vec<PlayerId> = (1..=player_count as u128).map(Uuid::from_u128).collect();
        let mut session = GameSession::new("PROP01".parse().unwrap(), ids[0], GameRng::new(seed));
        for (i, id) in ids.iter().enumerate() {
            session.add_player(*id, format!("P{}", i)).unwrap();
        }
        session.start().unwrap();
        check_invariants(&session, &hands(&session), &Op::Expire)?;

        for op in &ops {
            let before_hands = hands(&session);
            let before_snapshot = session.snapshot();
            let before_phase = session.phase().clone();

            match apply(&mut session, &ids, op) {
                Ok(_) => {}
                Err(_) => {
                    // 被拒绝的操作不改变任何状态
                    prop_assert_eq!(&hands(&session), &before_hands);
                    prop_assert_eq!(&session.snapshot(), &before_snapshot);
                    prop_assert_eq!(session.phase(), &before_phase);
                }
            }
            check_invariants(&session, &before_hands, op)?;

            if !session.is_playing() {
                session.start().unwrap();
            }
        }
    }

    #[test]
    fn opening_never_wild_draw_four(seed in any::<u64>(), player_count in 2usize..=10) {
        let ids: Vec<PlayerId> = (1..=player_count as u128).map(Uuid::from_u128).collect();
        let mut session = GameSession::new("PROP02".parse().unwrap(), ids[0], GameRng::new(seed));
        for id in &ids {
            session.add_player(*id, "p").unwrap();
        }
        session.start().unwrap();

        let top = session.top_card().copied().unwrap();
        prop_assert_ne!(top.face, Face::WildDrawFour);
        prop_assert!(session.active_color().is_some_and(|c| c != Color::Black));
        prop_assert_eq!(session.card_total(), DECK_SIZE);
        prop_assert_eq!(session.draw_pile_len(), DECK_SIZE - 1 - player_count * HAND_SIZE - if top.face == Face::DrawTwo { 2 } else { 0 });
    }
}
