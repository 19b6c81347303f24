//! Joining, leaving and shutting down voice sessions

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};

use muffin::commands::voice::utils::{
    asset_resolver::CountdownRequest, playback_scheduler::PlaybackStatus,
    voice_service::VoiceError,
};

use crate::common::fixtures::{GUILD, OTHER_GUILD, OTHER_VOICE_CHANNEL, VOICE_CHANNEL, number_clips};
use crate::common::mocks::{FakeTransport, Playback};
use crate::common::{test_config, voice_service};
use crate::test_utils;

#[tokio::test]
async fn test_join_twice_opens_one_connection() {
    test_utils::init();
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let first = assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    let second = assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);

    assert!(!first.already_connected);
    assert!(second.already_connected);
    assert_eq!(second.channel_id, VOICE_CHANNEL);
    assert_eq!(transport.opens(), 1);
}

#[tokio::test]
async fn test_join_elsewhere_keeps_current_channel() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    let outcome = assert_ok!(service.join(GUILD, OTHER_VOICE_CHANNEL).await);

    assert!(outcome.already_connected);
    assert_eq!(outcome.channel_id, VOICE_CHANNEL);
    assert_eq!(transport.opens(), 1);
}

#[tokio::test]
async fn test_concurrent_joins_open_one_connection() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    let (first, second) = tokio::join!(
        service.join(GUILD, VOICE_CHANNEL),
        service.join(GUILD, VOICE_CHANNEL)
    );

    assert_ok!(first);
    assert_ok!(second);
    assert_eq!(transport.opens(), 1);
}

#[tokio::test]
async fn test_guilds_do_not_share_connections() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    assert_ok!(service.join(OTHER_GUILD, OTHER_VOICE_CHANNEL).await);
    assert_ok!(service.leave(GUILD).await);

    assert_eq!(transport.opens(), 2);
    assert!(service.connections().get(GUILD).await.is_none());
    assert!(service.connections().get(OTHER_GUILD).await.is_some());
}

#[tokio::test]
async fn test_failed_join_is_reported_and_not_kept() {
    let transport = FakeTransport::refusing();
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_matches!(
        service.join(GUILD, VOICE_CHANNEL).await,
        Err(VoiceError::JoinError(_))
    );
    assert!(service.connections().get(GUILD).await.is_none());
}

#[tokio::test]
async fn test_leave_when_not_connected() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_eq!(
        assert_err!(service.leave(GUILD).await),
        VoiceError::NotConnected
    );
}

#[tokio::test]
async fn test_leave_destroys_connection() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));
    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);

    assert_ok!(service.leave(GUILD).await);

    assert!(transport.last_connection().is_destroyed());
    assert!(service.connections().get(GUILD).await.is_none());

    // A later join opens a fresh connection
    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    assert_eq!(transport.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_countdowns_and_leaves_everywhere() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));

    assert_ok!(service.join(OTHER_GUILD, OTHER_VOICE_CHANNEL).await);
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

    service.shutdown().await;

    assert_ok!(
        started
            .state
            .wait_for(|state| state.status == PlaybackStatus::Cancelled)
            .await
    );
    assert!(transport.connections().iter().all(|c| c.is_destroyed()));
    assert!(service.connections().get(GUILD).await.is_none());
    assert!(service.connections().get(OTHER_GUILD).await.is_none());
}

#[tokio::test]
async fn test_join_after_connection_lost_opens_new_connection() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));
    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);
    let dropped = transport.last_connection();

    dropped.drop_connection();
    let outcome = assert_ok!(service.join(GUILD, OTHER_VOICE_CHANNEL).await);

    assert!(!outcome.already_connected);
    assert_eq!(outcome.channel_id, OTHER_VOICE_CHANNEL);
    assert_eq!(transport.opens(), 2);
    assert!(dropped.is_destroyed());
}

#[tokio::test]
async fn test_leave_after_connection_lost() {
    let transport = FakeTransport::new(Playback::Manual);
    let service = voice_service(&test_config(), &transport, number_clips(5));
    assert_ok!(service.join(GUILD, VOICE_CHANNEL).await);

    transport.last_connection().drop_connection();

    assert!(service.connections().get(GUILD).await.is_none());
    assert_eq!(
        assert_err!(service.leave(GUILD).await),
        VoiceError::NotConnected
    );
}
