use cardflow_core::AppResult;
use cardflow_infrastructure::InMemoryBoardGateway;
use tracing::info;

/// Seeds a demo board so a memory-gateway deployment has resolvable targets.
pub async fn seed_demo_board(gateway: &InMemoryBoardGateway) -> AppResult<()> {
    let board_id = gateway.add_board("Welcome Board").await;

    for list_name in ["To Do", "Doing", "Done"] {
        gateway.add_list(board_id, list_name).await?;
    }
    gateway.add_member(board_id, "demo", "demo-user").await?;

    info!(board_id = %board_id, "seeded demo board 'Welcome Board'");
    Ok(())
}
