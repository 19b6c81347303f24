//! Countdowns played end to end through the voice service

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use test_case::test_case;
use tokio::time::Instant;
use tokio_test::assert_ok;

use muffin::commands::voice::utils::{
    asset_resolver::{CompositeAddressing, CountdownRequest},
    playback_scheduler::PlaybackStatus,
    voice_service::VoiceError,
};
use muffin::config::CountdownConfig;

use crate::common::fixtures::{GUILD, VOICE_CHANNEL, composite_clips, number_clips};
use crate::common::mocks::{FakeAssetStore, FakeTransport, Playback};
use crate::common::{test_config, voice_service};
use crate::test_utils;

const CLIP: Duration = Duration::from_millis(500);

fn seek_config() -> CountdownConfig {
    CountdownConfig {
        composite: CompositeAddressing::Seek,
        master_length: Duration::from_secs(60),
        ..test_config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_countdown_plays_every_number_in_time() {
    test_utils::init();
    let transport = FakeTransport::new(Playback::AutoFinish(CLIP));
    let service = voice_service(&test_config(), &transport, number_clips(5));
    let started_at = Instant::now();

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_eq!(started.clips, 5);
    assert_eq!(started.target, Duration::from_secs(5));

    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Finished)
            .await
    );

    let connection = transport.last_connection();
    assert_eq!(connection.submitted_ids(), vec!["5", "4", "3", "2", "1"]);
    // start delay + five clips + four gaps of 625ms
    assert_eq!(started_at.elapsed(), Duration::from_millis(5300));

    // The bot stays connected for the next countdown
    assert!(!connection.is_destroyed());
    assert!(service.connections().get(GUILD).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_missing_numbers_are_skipped() {
    let transport = FakeTransport::new(Playback::AutoFinish(CLIP));
    let store = FakeAssetStore::with(["5", "3", "1"].into_iter().map(str::to_string));
    let service = voice_service(&test_config(), &transport, store);

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Finished)
            .await
    );

    assert_eq!(
        transport.last_connection().submitted_ids(),
        vec!["5", "3", "1"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_countdown_is_refused_while_one_runs() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );
    let before = service.countdown_state(GUILD);

    assert_matches!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await,
        Err(VoiceError::AlreadyInProgress)
    );

    assert_eq!(service.countdown_state(GUILD), before);
    assert_eq!(transport.last_connection().submitted_ids(), vec!["5"]);
    assert_eq!(transport.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_leave_during_gap_plays_nothing_more() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );

    let connection = transport.last_connection();
    connection.finish_clip();
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::AwaitingGap)
            .await
    );

    assert_ok!(service.leave(GUILD).await);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(started.state.borrow().status, PlaybackStatus::Cancelled);
    assert_eq!(connection.submitted_ids(), vec!["5"]);
    assert_eq!(connection.stops(), 1);
    assert!(connection.is_destroyed());
    assert!(service.connections().get(GUILD).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_playing_keeps_connection() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );

    assert_ok!(service.stop(GUILD).await);

    let connection = transport.last_connection();
    // A late end of the stopped clip must not restart anything
    connection.finish_clip();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(started.state.borrow().status, PlaybackStatus::Cancelled);
    assert_eq!(connection.submitted_ids(), vec!["5"]);
    assert!(!connection.is_destroyed());
    assert_matches!(service.stop(GUILD).await, Err(VoiceError::NothingPlaying));
}

#[tokio::test]
async fn test_stop_with_nothing_running() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_matches!(service.stop(GUILD).await, Err(VoiceError::NothingPlaying));
}

#[tokio::test(start_paused = true)]
async fn test_player_error_fails_countdown_but_keeps_connection() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );

    let connection = transport.last_connection();
    connection.fail_clip("decoder gave up");
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Failed)
            .await
    );

    let state = started.state.borrow().clone();
    assert_eq!(state.step, 0);
    assert_eq!(state.failure.as_deref(), Some("decoder gave up"));
    assert!(!connection.is_destroyed());

    // The guild is free again and the connection is reused
    let mut retry = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        retry
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );
    assert_eq!(transport.opens(), 1);
    assert_eq!(connection.submitted_ids(), vec!["5", "5"]);
}

#[test_case(CountdownRequest::Numbers { from: 5 }, number_clips(0) ; "no number clips")]
#[test_case(CountdownRequest::Composite { seconds: 30 }, number_clips(5) ; "no composite clip")]
#[tokio::test]
async fn test_missing_audio_fails_before_connecting(
    request: CountdownRequest,
    store: FakeAssetStore,
) {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, store);

    assert_matches!(
        service.countdown(GUILD, VOICE_CHANNEL, request).await,
        Err(VoiceError::AssetNotFound(_))
    );
    assert_eq!(transport.opens(), 0);
    assert!(service.connections().get(GUILD).await.is_none());
}

#[test_case(CountdownRequest::Numbers { from: 4 }, 4 ; "number below range")]
#[test_case(CountdownRequest::Numbers { from: 61 }, 61 ; "number above range")]
#[test_case(CountdownRequest::Composite { seconds: 25 }, 25 ; "uncut composite length")]
#[tokio::test]
async fn test_unsupported_length_fails_before_connecting(request: CountdownRequest, seconds: u32) {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, composite_clips());

    assert_eq!(
        service.countdown(GUILD, VOICE_CHANNEL, request).await.map(|_| ()),
        Err(VoiceError::DurationNotSupported(seconds))
    );
    assert_eq!(transport.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_composite_lookup_plays_the_precut_clip() {
    let transport = FakeTransport::new(Playback::AutoFinish(Duration::from_secs(30)));
    let service = voice_service(&test_config(), &transport, composite_clips());

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Composite { seconds: 30 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Finished)
            .await
    );

    let submitted = transport.last_connection().submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].source.id, "countdown30");
    assert_eq!(submitted[0].start_offset, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_composite_seek_starts_master_at_offset() {
    let transport = FakeTransport::new(Playback::AutoFinish(Duration::from_secs(30)));
    let service = voice_service(&seek_config(), &transport, composite_clips());

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Composite { seconds: 30 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Finished)
            .await
    );

    let submitted = transport.last_connection().submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].source.id, "countdown");
    assert_eq!(submitted[0].start_offset, Duration::from_secs(30));
    assert_eq!(submitted[0].estimated_duration, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_after_connection_lost_rejoins() {
    let transport = FakeTransport::new(Playback::AutoFinish(CLIP));
    let service = voice_service(&test_config(), &transport, number_clips(5));
    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    let dropped = transport.last_connection();
    dropped.drop_connection();

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Finished)
            .await
    );

    assert_eq!(transport.opens(), 2);
    assert!(dropped.submitted_ids().is_empty());
    assert_eq!(transport.last_connection().submitted_ids().len(), 5);
}

#[tokio::test]
async fn test_clip_lookups_run_off_the_calling_thread() {
    let store = number_clips(5);
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, store.clone());

    let plan = assert_ok!(service.plan(CountdownRequest::Numbers { from: 5 }).await);

    assert_eq!(plan.len(), 5);
    let threads = store.lookup_threads();
    assert!(!threads.is_empty());
    assert!(!threads.contains(&std::thread::current().id()));
}

#[tokio::test(start_paused = true)]
async fn test_prepare_refuses_busy_guild_without_planning() {
    let store = number_clips(5);
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, store.clone());

    let mut started = assert_ok!(
        service
            .countdown(GUILD, VOICE_CHANNEL, CountdownRequest::Numbers { from: 5 })
            .await
    );
    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Playing)
            .await
    );
    let lookups_before = store.lookup_threads().len();

    assert_matches!(
        service
            .prepare_countdown(GUILD, CountdownRequest::Numbers { from: 5 })
            .await,
        Err(VoiceError::AlreadyInProgress)
    );
    assert_eq!(store.lookup_threads().len(), lookups_before);
    assert_eq!(transport.opens(), 1);
}
