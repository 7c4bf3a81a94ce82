mod config;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{stream::StreamExt, SinkExt};
use parking_lot::Mutex as P_Mutex;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use uno_table_core::{
    Card, ClientMessage, GameError, GameRng, GamePhase, GameSession, PlayerId, RoomCode, RoomRegistry, ServerMessage,
};

use crate::config::Config;

// 服务器全局状态
struct AppState {
    registry: RoomRegistry<Room>,
    config: Config,
}

// 单个房间的状态
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// players -> session
// session 是同步锁，绝不能跨 await 持有
struct Room {
    session: P_Mutex<GameSession>,
    // 将 PlayerId 映射到具体的网络连接
    players: RwLock<HashMap<PlayerId, PlayerConnection>>,
}

impl Room {
    fn new(room_code: &RoomCode, host_id: PlayerId, rng: GameRng) -> Self {
        Room {
            session: P_Mutex::new(GameSession::new(room_code.clone(), host_id, rng)),
            players: RwLock::new(HashMap::new()),
        }
    }
}

// 玩家的网络连接信息
struct PlayerConnection {
    // 用于向该玩家的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

type SharedState = Arc<AppState>;

// 每个玩家自己的手牌，随每次状态变化私密发送
type Hands = Vec<(PlayerId, Vec<Card>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let rng = match config.seed {
        Some(seed) => {
            info!("使用固定种子 {}", seed);
            GameRng::new(seed)
        }
        None => GameRng::from_entropy(),
    };
    let addr = config.bind_addr;

    let state = SharedState::new(AppState { registry: RoomRegistry::new(rng), config });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法监听 {}", addr))?;
    info!("服务器正在监听 {}", addr);
    axum::serve(listener, app).await.context("服务器异常退出")?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    info!("新的客户端连接");
    // 当前连接所在的房间和玩家身份，创建或加入房间后填充
    let mut player_context: Option<(RoomCode, PlayerId)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, &state, &tx, &mut player_context).await;
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作
    if let Some((room_code, player_id)) = player_context {
        handle_disconnect(&state, room_code, player_id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: &SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(RoomCode, PlayerId)>,
) {
    match msg {
        ClientMessage::CreateRoom { name } => {
            if context.is_some() {
                send_error(tx, "你已经在一个房间里了").await;
                return;
            }

            let player_id = Uuid::new_v4();
            let (room_code, room) = state.registry.create(|code, rng| Room::new(code, player_id, rng));
            if let Err(e) = enter_room(&room, &room_code, player_id, name, tx).await {
                state.registry.remove(&room_code);
                send_error(tx, &e.to_string()).await;
                return;
            }
            info!("玩家 {} 创建了新房间 {}", player_id, room_code);
            *context = Some((room_code, player_id));
        }
        ClientMessage::JoinRoom { room_code, name } => {
            if context.is_some() {
                send_error(tx, "你已经在一个房间里了").await;
                return;
            }

            let Some(room) = state.registry.get(&room_code) else {
                send_error(tx, &GameError::RoomNotFound.to_string()).await;
                return;
            };

            let player_id = Uuid::new_v4();
            if let Err(e) = enter_room(&room, &room_code, player_id, name, tx).await {
                send_error(tx, &e.to_string()).await;
                return;
            }
            info!("玩家 {} 加入了房间 {}", player_id, room_code);
            *context = Some((room_code, player_id));
        }
        // 其余消息都需要先进入房间
        action => {
            let Some((room_code, player_id)) = context.clone() else {
                send_error(tx, "请先加入或创建房间").await;
                return;
            };
            let Some(room) = state.registry.get(&room_code) else {
                send_error(tx, &GameError::RoomNotFound.to_string()).await;
                return;
            };

            let result = apply_and_deliver(state, &room, |session| dispatch(session, player_id, action)).await;
            match result {
                Ok(()) => {}
                Err(e) if e.is_silent() => debug!("忽略玩家 {} 的操作: {}", player_id, e),
                Err(e) => send_error(tx, &e.to_string()).await,
            }
        }
    }
}

/// 把游戏内消息转给会话上对应的操作
fn dispatch(session: &mut GameSession, player_id: PlayerId, msg: ClientMessage) -> Result<Vec<ServerMessage>, GameError> {
    match msg {
        ClientMessage::StartGame => {
            if session.host_id() != player_id {
                return Err(GameError::NotHost);
            }
            session.start()
        }
        ClientMessage::PlayCard { card_index, chosen_color } => session.play_card(player_id, card_index, chosen_color),
        ClientMessage::RespondChallenge { challenge } => session.respond_challenge(player_id, challenge),
        ClientMessage::DrawCard => session.draw_card(player_id),
        ClientMessage::FinishDrawDecision { play, chosen_color } => {
            session.finish_draw_decision(player_id, play, chosen_color)
        }
        ClientMessage::DeclareUno => session.declare_uno(player_id),
        ClientMessage::CatchUno => session.catch_uno(player_id),
        // 房间管理消息在上层处理
        ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } => Ok(Vec::new()),
    }
}

/// 把新玩家加入房间会话，并登记他的连接
async fn enter_room(
    room: &Room,
    room_code: &RoomCode,
    player_id: PlayerId,
    name: String,
    tx: &mpsc::Sender<ServerMessage>,
) -> Result<(), GameError> {
    let mut r_players = room.players.write().await;
    let (events, is_host) = {
        let mut session = room.session.lock();
        let events = session.add_player(player_id, name)?;
        (events, session.host_id() == player_id)
    };
    r_players.insert(player_id, PlayerConnection { sender: tx.clone() });

    let _ = tx
        .send(ServerMessage::RoomJoined { room_code: room_code.clone(), your_id: player_id, is_host })
        .await;
    deliver(&r_players, events, Vec::new()).await;
    Ok(())
}

/// 在会话上执行一次操作并把产生的事件送达
///
/// 持有连接表写锁直到消息发完，同一房间的事件按操作顺序送达。
/// 操作开启了新的挂起状态时，安排超时结算。
async fn apply_and_deliver(
    state: &SharedState,
    room: &Arc<Room>,
    action: impl FnOnce(&mut GameSession) -> Result<Vec<ServerMessage>, GameError>,
) -> Result<(), GameError> {
    let r_players = room.players.write().await;
    let (events, hands, new_ticket) = {
        let mut session = room.session.lock();
        let before = session.pending_ticket();
        let events = action(&mut *session)?;
        let after = session.pending_ticket().filter(|ticket| Some(*ticket) != before);
        (events, hands_of(&session), after)
    };
    deliver(&r_players, events, hands).await;

    if let Some(ticket) = new_ticket {
        schedule_expiry(state, room.clone(), ticket);
    }
    Ok(())
}

/// 挂起状态超时后自动结算；期间已被回应的挂起状态会因编号不符而被忽略
fn schedule_expiry(state: &SharedState, room: Arc<Room>, ticket: u64) {
    let Some(timeout) = state.config.pending_timeout else {
        return;
    };
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let r_players = room.players.write().await;
        let outcome = {
            let mut session = room.session.lock();
            session.expire_pending(ticket).map(|events| (events, hands_of(&session)))
        };
        match outcome {
            Ok((events, hands)) => {
                info!("挂起状态 {} 超时，已自动结算", ticket);
                deliver(&r_players, events, hands).await;
            }
            Err(_) => debug!("挂起状态 {} 已结算，无需处理", ticket),
        }
    });
}

/// 游戏开始后每个玩家的手牌
fn hands_of(session: &GameSession) -> Hands {
    if *session.phase() == GamePhase::Lobby {
        return Vec::new();
    }
    session.players().iter().map(|p| (p.id, p.hand.clone())).collect()
}

/// 玩家断开连接后的处理
async fn handle_disconnect(state: &SharedState, room_code: RoomCode, player_id: PlayerId) {
    info!("玩家 {} 从房间 {} 断开连接", player_id, room_code);
    let Some(room) = state.registry.get(&room_code) else {
        return;
    };

    let is_empty = {
        // r_players write lock
        let mut r_players = room.players.write().await;
        // 从连接映射中移除
        r_players.remove(&player_id);

        let outcome = {
            let mut session = room.session.lock();
            session
                .remove_player(player_id)
                .map(|events| (events, hands_of(&session), session.players().is_empty()))
        };
        match outcome {
            Ok((events, hands, is_empty)) => {
                deliver(&r_players, events, hands).await;
                is_empty
            }
            Err(e) => {
                warn!("移除玩家 {} 失败: {}", player_id, e);
                r_players.is_empty()
            }
        }
    };

    // 判断是否清空房间
    if is_empty {
        state.registry.remove(&room_code);
        info!("房间 {} 已空，已被移除", room_code);
    }
}

/// 按消息的接收者分发事件，之后把每个人的手牌私密发给本人
async fn deliver(players: &HashMap<PlayerId, PlayerConnection>, events: Vec<ServerMessage>, hands: Hands) {
    for msg in events {
        match msg.private_recipient() {
            Some(player_id) => send_to(players, player_id, msg).await,
            None => broadcast(players.iter(), &msg).await,
        }
    }
    for (player_id, hand) in hands {
        send_to(players, player_id, ServerMessage::HandUpdate { hand }).await;
    }
}

async fn send_to(players: &HashMap<PlayerId, PlayerConnection>, player_id: PlayerId, message: ServerMessage) {
    if let Some(conn) = players.get(&player_id) {
        if conn.sender.send(message).await.is_err() {
            warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}

async fn send_error(tx: &mpsc::Sender<ServerMessage>, message: &str) {
    let _ = tx.send(ServerMessage::Error { message: message.to_string() }).await;
}

/// 向房间内所有玩家广播消息
async fn broadcast(players: impl Iterator<Item = (&PlayerId, &PlayerConnection)>, message: &ServerMessage) {
    for (player_id, conn) in players {
        if conn.sender.send(message.clone()).await.is_err() {
            // 发送失败，说明该玩家也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}
