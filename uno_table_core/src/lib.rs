//! # UNO 核心逻辑库
//!
//! 这个 `core` crate 包含了 UNO 牌局的所有核心状态管理、
//! 出牌规则、质疑与摸牌决定的挂起流程、房间表以及客户端-服务器通信消息的定义。
//! 它与具体实现（如网络服务器、客户端UI）解耦，
//! 使其可以被任何上层应用复用。

mod card;
mod deck;
mod error;
mod logic;
mod message;
mod registry;
mod rng;
mod state;

pub use card::*;

pub use deck::*;

pub use error::*;

pub use message::*;

pub use registry::*;

pub use rng::*;

pub use state::*;
