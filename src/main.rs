use std::sync::Arc;

use duet::{
    client::StageKind, AppError, CatalogContentGenerator, ClientDriver, ClientHandle,
    InMemoryRoomBus, SessionConfig, TemplateSummaryGenerator, Topic,
};
use futures::future::try_join;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn spawn_client(config: &SessionConfig, bus: &Arc<InMemoryRoomBus>) -> ClientHandle {
    ClientDriver::spawn(
        config.clone(),
        bus.clone(),
        Arc::new(CatalogContentGenerator::new()),
        Arc::new(TemplateSummaryGenerator::new()),
    )
}

/// Picks an option for `round`; the two scripts agree on every other round
fn scripted_choice(round: usize, offset: usize) -> u8 {
    ((round + offset * (round % 2)) % 4) as u8 + 1
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duet=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env();
    let bus = Arc::new(InMemoryRoomBus::with_capacity(config.channel_capacity));

    let host = spawn_client(&config, &bus);
    let guest = spawn_client(&config, &bus);

    let code = host.create_room()?;
    info!(room_id = %code, "Room created, guest joining");

    // Guests type the code however they like
    guest.join(&code.as_str().to_lowercase())?;

    host.wait_for(|s| s.stage == StageKind::SelectContent).await?;
    let topic = Topic::catalogue()
        .into_iter()
        .next()
        .ok_or_else(|| AppError::InvalidOperation("Topic catalogue is empty".to_string()))?;
    info!(topic = %topic.name, "Host selecting topic");
    host.select_topic(topic)?;

    let active = guest
        .wait_for(|s| s.stage == StageKind::RoomActive && s.is_connected())
        .await?;
    host.wait_for(|s| s.is_connected()).await?;

    for round in 0..active.total_rounds {
        for (participant, offset) in [(&host, 0), (&guest, 1)] {
            let snapshot = participant
                .wait_for(|s| s.round == Some(round) || s.stage == StageKind::Results)
                .await?;
            if snapshot.stage == StageKind::Results {
                break;
            }
            participant.submit_choice(scripted_choice(round, offset))?;
        }
    }

    let (final_host, final_guest) = try_join(
        host.wait_for(|s| s.summary().is_some()),
        guest.wait_for(|s| s.summary().is_some()),
    )
    .await?;

    if let Some(result) = &final_host.result {
        println!(
            "Room {}: {} of {} rounds matched ({}%, {} points, {})",
            code, result.matches, result.total_rounds, result.percentage, result.points, result.reason
        );
    }
    println!("Host sees:  {}", final_host.summary().unwrap_or_default());
    println!("Guest sees: {}", final_guest.summary().unwrap_or_default());

    host.leave()?;
    guest.leave()?;
    host.wait_for(|s| s.stage == StageKind::Closed).await?;
    guest.wait_for(|s| s.stage == StageKind::Closed).await?;
    info!(open_channels = bus.channel_count().await, "Demo finished");

    Ok(())
}
