//! Process-wide room registry (hub).
//!
//! Maps room names to running rooms. The map lock is held only for the
//! lookup-or-insert step; rooms are never removed, so a name resolves to the
//! same room for the life of the process.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{config::HubConfig, domain::RoomName};

use super::room::RoomHandle;

pub struct Registry {
    rooms: Mutex<HashMap<RoomName, RoomHandle>>,
    config: Arc<HubConfig>,
}

impl Registry {
    pub fn new(config: Arc<HubConfig>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Resolve `name` to its room, creating and starting it on first use.
    ///
    /// Concurrent callers racing on a new name all observe the same room.
    pub async fn get_or_create(&self, name: &RoomName) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get(name) {
            return room.clone();
        }

        let room = RoomHandle::spawn(name.clone(), &self.config);
        rooms.insert(name.clone(), room.clone());
        tracing::info!(room = %name, total_rooms = rooms.len(), "room created");
        room
    }

    /// All rooms, ordered by name.
    pub async fn rooms(&self) -> Vec<RoomHandle> {
        let rooms = self.rooms.lock().await;
        let mut snapshot: Vec<RoomHandle> = rooms.values().cloned().collect();
        drop(rooms);
        snapshot.sort_by(|a, b| a.name().cmp(b.name()));
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }

    pub fn config(&self) -> &Arc<HubConfig> {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::{config::DEFAULT_ROOM_NAME, infrastructure::hub::Member};

    fn create_test_registry() -> Arc<Registry> {
        Arc::new(Registry::new(Arc::new(HubConfig::default())))
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_room_for_same_name() {
        // テスト項目: 同じ名前では同じルームが返される
        // given (前提条件):
        let registry = create_test_registry();
        let name = RoomName::new("r1");

        // when (操作):
        let first = registry.get_or_create(&name).await;
        let second = registry.get_or_create(&name).await;
        let (member, _rx) = {
            let (tx, rx) = mpsc::channel(4);
            (
                Member {
                    id: Uuid::new_v4(),
                    outbound: tx,
                },
                rx,
            )
        };
        first.register(member, Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // then (期待する結果):
        // membership registered through one handle is visible through the other
        assert_eq!(second.viewers(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_blank_name_resolves_to_default_room() {
        // テスト項目: 空のルーム名はデフォルトルームに解決される
        // given (前提条件):
        let registry = create_test_registry();

        // when (操作):
        let room = registry.get_or_create(&RoomName::new("")).await;

        // then (期待する結果):
        assert_eq!(room.name().as_str(), DEFAULT_ROOM_NAME);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_creates_one_room() {
        // テスト項目: 同じ新しい名前への同時アクセスでもルームは 1 つだけ作られる
        // given (前提条件):
        let registry = create_test_registry();
        let name = RoomName::new("race");

        // when (操作):
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                let name = name.clone();
                tokio::spawn(async move { registry.get_or_create(&name).await.created_at() })
            })
            .collect();
        let mut created_at = Vec::new();
        for task in tasks {
            created_at.push(task.await.unwrap());
        }

        // then (期待する結果):
        assert_eq!(registry.len().await, 1);
        assert!(created_at.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_rooms_are_listed_by_name() {
        // テスト項目: ルーム一覧は名前順に並ぶ
        // given (前提条件):
        let registry = create_test_registry();
        for name in ["charlie", "alpha", "bravo"] {
            registry.get_or_create(&RoomName::new(name)).await;
        }

        // when (操作):
        let rooms = registry.rooms().await;

        // then (期待する結果):
        let names: Vec<&str> = rooms.iter().map(|r| r.name().as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
        assert!(!registry.is_empty().await);
    }
}
