use thiserror::Error;

/// 游戏操作被拒绝的原因
///
/// 回合、合法性、挂起状态相关的错误是“静默”的：服务器不回任何消息，
/// 与客户端本就不该提供这些操作的假设一致。其余错误会回给调用者。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("房间已满")]
    RoomFull,
    #[error("游戏已经开始")]
    GameAlreadyStarted,
    #[error("房间不存在")]
    RoomNotFound,
    #[error("玩家不足，至少需要 2 人")]
    NotEnoughPlayers,
    #[error("只有房主可以开始游戏")]
    NotHost,
    #[error("玩家不在房间中")]
    PlayerNotFound,
    #[error("游戏未在进行中")]
    GameNotInProgress,
    #[error("还没轮到你")]
    NotYourTurn,
    #[error("这张牌不能打出")]
    IllegalCard,
    #[error("正在等待其他玩家的决定")]
    PendingActionBlocksMove,
    #[error("不是你需要回应")]
    WrongResponder,
    #[error("没有等待中的决定")]
    NoPendingAction,
}

impl GameError {
    /// 是否应当静默丢弃 (不通知客户端)
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            GameError::GameNotInProgress
                | GameError::NotYourTurn
                | GameError::IllegalCard
                | GameError::PendingActionBlocksMove
                | GameError::WrongResponder
                | GameError::NoPendingAction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_split() {
        assert!(GameError::NotYourTurn.is_silent());
        assert!(GameError::WrongResponder.is_silent());
        assert!(!GameError::RoomFull.is_silent());
        assert!(!GameError::NotEnoughPlayers.is_silent());
        assert_eq!(GameError::RoomNotFound.to_string(), "房间不存在");
    }
}
