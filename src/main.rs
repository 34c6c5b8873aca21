use std::rc::Rc;
use std::time::Duration;

use cast_player::loopback::LoopbackClient;
use cast_player::persistence::MemoryPlayIntentStore;
use cast_player::remote::{MediaMetadata, QueueItem, RemotePlayerState};
use cast_player::{
    load_config, AppEvent, CastPlayer, CommandStatus, FilePlayIntentStore, PlayIntentStore,
    PlayerEvent, RepeatMode,
};
use log::{info, warn};
use tokio::sync::broadcast;

const DEMO_TICK_MS: u64 = 250;
const DEMO_DURATION_MS: u64 = 5_000;

fn demo_queue() -> Vec<QueueItem> {
    ["Opening", "Interview", "Closing"]
        .iter()
        .enumerate()
        .map(|(index, title)| QueueItem {
            item_id: index as u32 + 1,
            content_id: format!("demo-{}", index + 1),
            media_uri: format!("https://media.example/demo-{}.m3u8", index + 1),
            metadata: MediaMetadata {
                title: title.to_string(),
                ..MediaMetadata::default()
            },
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_file = dirs::config_dir()
        .ok_or("no platform config directory available")?
        .join("cast_player.toml");
    let config = load_config(&config_file);

    let intent_store: Box<dyn PlayIntentStore> = match FilePlayIntentStore::for_app(&config.app_key)
    {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!("Falling back to in-memory play intent: {}", err);
            Box::new(MemoryPlayIntentStore::new())
        }
    };

    let (bus_sender, mut bus_receiver) = broadcast::channel(1024);
    let mut player = CastPlayer::new(&config, Box::new(bus_sender), intent_store);
    player.add_listener(Rc::new(|event: &PlayerEvent| match event {
        PlayerEvent::TimelineChanged(timeline) => {
            info!("Listener: timeline has {} period(s)", timeline.period_count())
        }
        PlayerEvent::SeekProcessed => info!("Listener: seek processed"),
        _ => {}
    }));

    info!(
        "Starting loopback session for receiver application {}",
        config.receiver_app_id
    );
    let session_id = format!("{}-loopback", config.receiver_app_id);
    let (client, receiver) = LoopbackClient::new(&session_id);
    player.bind_session(Box::new(client));
    player.sync_play_intent();

    player.load_items(demo_queue(), 0, None, RepeatMode::Off);
    receiver.set_duration(DEMO_DURATION_MS);
    receiver.update_media_status(|status| status.player_state = RemotePlayerState::Playing);
    player.set_play_when_ready(true);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_millis(DEMO_TICK_MS));
        let mut sought = false;
        loop {
            ticker.tick().await;
            receiver.advance(DEMO_TICK_MS * 4);
            player.pump_remote_events();

            if !sought && player.current_position() >= DEMO_DURATION_MS / 2 {
                player.seek_to(DEMO_DURATION_MS - 1_000);
                receiver.acknowledge_all_seeks(CommandStatus::SUCCESS);
                sought = true;
            }
            if player.current_position() >= DEMO_DURATION_MS {
                receiver.receive_message(config.namespace.as_str(), r#"{"type":"finish"}"#);
                player.pump_remote_events();
            }

            let mut finished = false;
            while let Ok(event) = bus_receiver.try_recv() {
                info!("App event: {:?}", event);
                finished |= event == AppEvent::CastFinish;
            }
            if finished {
                break;
            }
        }
    });

    player.release();
    Ok(())
}
