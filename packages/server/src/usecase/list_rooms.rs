//! UseCase: list rooms known to the registry.

use std::sync::Arc;

use crate::{domain::RoomName, infrastructure::hub::Registry};

/// Read-only view of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: RoomName,
    pub viewers: usize,
    /// Unix milliseconds.
    pub created_at: i64,
}

pub struct ListRoomsUseCase {
    registry: Arc<Registry>,
}

impl ListRoomsUseCase {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Rooms ordered by name, with the member count last published by each
    /// room's loop.
    pub async fn execute(&self) -> Vec<RoomSummary> {
        self.registry
            .rooms()
            .await
            .into_iter()
            .map(|room| RoomSummary {
                name: room.name().clone(),
                viewers: room.viewers(),
                created_at: room.created_at(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;

    #[tokio::test]
    async fn test_list_rooms_empty_registry() {
        // テスト項目: ルームが無い場合は空のリストが返される
        // given (前提条件):
        let registry = Arc::new(Registry::new(Arc::new(HubConfig::default())));
        let usecase = ListRoomsUseCase::new(registry);

        // when (操作):
        let rooms = usecase.execute().await;

        // then (期待する結果):
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn test_list_rooms_reports_created_rooms() {
        // テスト項目: 作成済みのルームが名前順・viewers 0 で返される
        // given (前提条件):
        let registry = Arc::new(Registry::new(Arc::new(HubConfig::default())));
        registry.get_or_create(&RoomName::new("r2")).await;
        registry.get_or_create(&RoomName::new("r1")).await;
        let usecase = ListRoomsUseCase::new(registry);

        // when (操作):
        let rooms = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].name.as_str(), "r1");
        assert_eq!(rooms[1].name.as_str(), "r2");
        assert!(rooms.iter().all(|r| r.viewers == 0 && r.created_at > 0));
    }
}
