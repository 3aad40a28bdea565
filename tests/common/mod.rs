//! Common test utilities

use classwatch::config::SeedUser;
use classwatch::{ServerConfig, Service};
use std::sync::Arc;

/// Roster used by most scenarios
pub fn test_roster() -> Vec<SeedUser> {
    vec![
        SeedUser::new("AA:BB:CC:DD", "Alice"),
        SeedUser::new("01:2D:3D:2E", "Bob"),
    ]
}

/// Service over an in-memory database with the test roster
pub async fn memory_service() -> Arc<Service> {
    memory_service_with(test_roster()).await
}

/// Service over an in-memory database with a custom roster
pub async fn memory_service_with(roster: Vec<SeedUser>) -> Arc<Service> {
    let config = ServerConfig {
        database_path: ":memory:".to_string(),
        seed_users: roster,
        ..Default::default()
    };
    Service::new(config).await.expect("service should start")
}
