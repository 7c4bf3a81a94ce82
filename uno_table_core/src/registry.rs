//! 进程级房间表
//!
//! 房间号 → 房间 的并发映射。房间本身的内容由调用者决定 (服务器里是
//! 会话 + 连接表)，这里只负责生成房间号、查找和删除。

use crate::rng::GameRng;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 房间号长度
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 6 位字母数字房间号，大小写不敏感 (内部统一为大写)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate(rng: &mut GameRng) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.below(ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ROOM_CODE_LEN || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("无效的房间号: {}", s));
        }
        Ok(RoomCode(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> String {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 房间表
pub struct RoomRegistry<R> {
    rooms: DashMap<RoomCode, Arc<R>>,
    rng: Mutex<GameRng>,
}

impl<R> RoomRegistry<R> {
    pub fn new(rng: GameRng) -> Self {
        Self { rooms: DashMap::new(), rng: Mutex::new(rng) }
    }

    /// 生成一个未被占用的房间号并创建房间
    ///
    /// `make` 收到房间号和一个为该房间派生的随机数生成器。
    pub fn create(&self, make: impl FnOnce(&RoomCode, GameRng) -> R) -> (RoomCode, Arc<R>) {
        loop {
            let (code, room_rng) = {
                let mut rng = self.rng.lock();
                (RoomCode::generate(&mut rng), rng.fork())
            };
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                let room = Arc::new(make(&code, room_rng));
                slot.insert(room.clone());
                return (code, room);
            }
        }
    }

    pub fn get(&self, code: &RoomCode) -> Option<Arc<R>> {
        self.rooms.get(code).map(|r| r.clone())
    }

    pub fn remove(&self, code: &RoomCode) -> Option<Arc<R>> {
        self.rooms.remove(code).map(|(_, room)| room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameSession;
    use uuid::Uuid;

    #[test]
    fn test_room_code_shape() {
        let mut rng = GameRng::new(9);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_room_code_case_insensitive() {
        let lower: RoomCode = "ab12cd".parse().unwrap();
        let upper: RoomCode = "AB12CD".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "AB12CD");
        assert!("AB12C".parse::<RoomCode>().is_err());
        assert!("AB-2CD".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_create_lookup_remove() {
        let registry: RoomRegistry<parking_lot::Mutex<GameSession>> = RoomRegistry::new(GameRng::new(1));
        let host = Uuid::new_v4();
        let (code, room) = registry.create(|code, rng| {
            parking_lot::Mutex::new(GameSession::new(code.clone(), host, rng))
        });
        assert_eq!(room.lock().room_code(), &code);
        assert_eq!(registry.len(), 1);

        let lowered: RoomCode = code.as_str().to_ascii_lowercase().parse().unwrap();
        assert!(registry.get(&lowered).is_some());

        assert!(registry.remove(&code).is_some());
        assert!(registry.get(&code).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_seeded_registries_agree() {
        let a: RoomRegistry<()> = RoomRegistry::new(GameRng::new(77));
        let b: RoomRegistry<()> = RoomRegistry::new(GameRng::new(77));
        let (code_a, _) = a.create(|_, _| ());
        let (code_b, _) = b.create(|_, _| ());
        assert_eq!(code_a, code_b);
    }

    #[test]
    fn test_codes_are_unique() {
        let registry: RoomRegistry<()> = RoomRegistry::new(GameRng::new(3));
        for _ in 0..200 {
            registry.create(|_, _| ());
        }
        assert_eq!(registry.len(), 200);
    }
}
