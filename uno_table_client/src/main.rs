use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use uno_table_core::{Card, ClientMessage, Color, GameSnapshot, RoomCode, ServerMessage};

const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:25917/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 命令行参数优先，其次是环境变量
    let raw_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("UNO_SERVER_URL").ok())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let url = Url::parse(&raw_url)?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        println!("\n{}", render(&server_msg));
                        print!("> "); // 重新显示输入提示符
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- UNO 客户端 ---");
    println!("可用命令:");
    println!("  create <昵称>             - 创建一个新房间");
    println!("  join <房间号> <昵称>      - 加入一个房间");
    println!("  start                     - 开始游戏 (仅房主)");
    println!("  play <序号> [颜色]        - 打出手牌，万能牌需要指定颜色 (red/blue/green/yellow)");
    println!("  draw                      - 摸一张牌");
    println!("  keep [颜色]               - 打出刚摸到的牌");
    println!("  pass                      - 保留刚摸到的牌，结束回合");
    println!("  challenge                 - 质疑 wild_draw4");
    println!("  accept                    - 不质疑，直接摸 4 张");
    println!("  uno                       - 喊 UNO");
    println!("  catch                     - 抓没喊 UNO 的玩家");
    println!("  exit                      - 退出");

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let client_msg = match parse_command(&line) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                println!("正在断开连接...");
                break;
            }
            Err(usage) => {
                if !usage.is_empty() {
                    println!("{}", usage);
                }
                continue;
            }
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    Ok(())
}

/// 解析一行输入。`Ok(None)` 表示退出，`Err` 中是要提示给用户的用法
fn parse_command(line: &str) -> Result<Option<ClientMessage>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let color = |i: usize| -> Result<Option<Color>, String> {
        parts.get(i).map(|s| s.parse::<Color>()).transpose()
    };

    let msg = match parts.first().copied() {
        None => return Err(String::new()),
        Some("create") => {
            let name = parts.get(1).unwrap_or(&"新玩家").to_string();
            ClientMessage::CreateRoom { name }
        }
        Some("join") => {
            if parts.len() < 3 {
                return Err("用法: join <房间号> <昵称>".to_string());
            }
            let room_code: RoomCode = parts[1].parse()?;
            ClientMessage::JoinRoom { room_code, name: parts[2].to_string() }
        }
        Some("start") => ClientMessage::StartGame,
        Some("play") => {
            let card_index = parts
                .get(1)
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| "用法: play <序号> [颜色]".to_string())?;
            ClientMessage::PlayCard { card_index, chosen_color: color(2)? }
        }
        Some("draw") => ClientMessage::DrawCard,
        Some("keep") => ClientMessage::FinishDrawDecision { play: true, chosen_color: color(1)? },
        Some("pass") => ClientMessage::FinishDrawDecision { play: false, chosen_color: None },
        Some("challenge") => ClientMessage::RespondChallenge { challenge: true },
        Some("accept") => ClientMessage::RespondChallenge { challenge: false },
        Some("uno") => ClientMessage::DeclareUno,
        Some("catch") => ClientMessage::CatchUno,
        Some("exit") => return Ok(None),
        Some(_) => return Err(format!("未知命令: {}", line.trim())),
    };
    Ok(Some(msg))
}

fn render(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::RoomJoined { room_code, your_id, is_host } => {
            let role = if *is_host { " (房主)" } else { "" };
            format!("已进入房间 {}{}，你的 ID: {}", room_code, role, your_id)
        }
        ServerMessage::PlayerList { players } => {
            let names: Vec<String> = players
                .iter()
                .map(|p| if p.is_host { format!("{}*", p.name) } else { p.name.clone() })
                .collect();
            format!("房间成员: {}", names.join(", "))
        }
        ServerMessage::GameStarted(snapshot) => format!("=== 游戏开始 ===\n{}", render_snapshot(snapshot)),
        ServerMessage::GameState(snapshot) => render_snapshot(snapshot),
        ServerMessage::HandUpdate { hand } => render_hand(hand),
        ServerMessage::ChallengePrompt { attacker_name, .. } => {
            format!("{} 对你打出了 wild_draw4！输入 challenge 质疑，或 accept 摸 4 张", attacker_name)
        }
        ServerMessage::DrawChoice { card, .. } => {
            format!("你摸到了 {}，可以打出。输入 keep [颜色] 打出，或 pass 结束回合", card)
        }
        ServerMessage::ActionLog { message } => format!("* {}", message),
        ServerMessage::GameOver { winner_name, .. } => format!("=== {} 获胜！房主可以输入 start 再来一局 ===", winner_name),
        ServerMessage::GameAborted { reason } => format!("=== 游戏中止: {} ===", reason),
        ServerMessage::Info { message } => format!("[提示] {}", message),
        ServerMessage::Error { message } => format!("[错误] {}", message),
    }
}

fn render_snapshot(snapshot: &GameSnapshot) -> String {
    let top = snapshot.top_card.map_or("-".to_string(), |c| c.to_string());
    let color = snapshot.active_color.map_or("-".to_string(), |c| c.to_string());
    let direction = if snapshot.direction >= 0 { "→" } else { "←" };
    let mut lines = vec![format!("顶牌: {}  当前颜色: {}  方向: {}", top, color, direction)];
    for p in &snapshot.players {
        let marker = if p.is_current_turn { ">" } else { " " };
        let uno = if p.uno_declared { " UNO!" } else { "" };
        lines.push(format!(" {} {} ({} 张){}", marker, p.name, p.card_count, uno));
    }
    lines.join("\n")
}

fn render_hand(hand: &[Card]) -> String {
    let cards: Vec<String> = hand.iter().enumerate().map(|(i, c)| format!("[{}] {}", i, c)).collect();
    format!("你的手牌: {}", cards.join("  "))
}
