//! End-to-end session against the loopback simulator over TCP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ecgwatch::report::{Identity, ReportDraft};
use ecgwatch::{ConnectionState, NetworkTransport, SessionController, SessionSettings, SessionState};
use ecgwatch_sim::Simulator;

async fn poll_until(
    session: &mut SessionController,
    timeout: Duration,
    mut done: impl FnMut(&SessionController) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        session.poll(Instant::now());
        if done(session) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_live_session_against_simulator() {
    let sim = Simulator::builder().bpm(72.0).start().await.unwrap();

    let settings = SessionSettings {
        waveform: format!("tcp://{}", sim.waveform_addr()).parse().unwrap(),
        classification: format!("tcp://{}", sim.classification_addr())
            .parse()
            .unwrap(),
        ..Default::default()
    };
    let mut session = SessionController::new(settings, Arc::new(NetworkTransport));
    assert!(session.connect());

    assert!(
        poll_until(&mut session, Duration::from_secs(3), |s| {
            s.state() == SessionState::Live
                && s.secondary_state() == ConnectionState::Connected
        })
        .await,
        "session never went live: {:?}",
        session.state()
    );
    assert_eq!(session.primary_state(), ConnectionState::Connected);

    // A few beats for the heart rate and at least one classified segment
    let live = poll_until(&mut session, Duration::from_secs(8), |s| {
        s.frame().metrics.heart_rate.is_some() && s.classification().is_some()
    })
    .await;
    assert!(live, "no heart rate or classification arrived");

    let frame = session.frame();
    assert!(frame.window.iter().any(|&v| v != 0.0));
    assert!(frame.beats >= 2);
    let bpm = frame.metrics.heart_rate.unwrap();
    assert!((40..=110).contains(&bpm), "heart rate {}", bpm);
    assert_eq!(frame.metrics.pr_text().len(), 3);

    let snapshot = session.classification().unwrap();
    assert_eq!(snapshot.segment_length, 200);
    assert_eq!(snapshot.class_label, "N");

    // The values on screen freeze into a report
    let mut draft = ReportDraft::new(&Identity::new("Dr. Grey"));
    draft
        .set_patient_id("P-100")
        .set_patient_name("Alex Doe")
        .set_classification(Some(snapshot.as_ref()));
    let report = draft.freeze(&frame.metrics).unwrap();
    assert_eq!(report.payload().heart_class.label(), "N");

    session.disconnect();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.primary_state(), ConnectionState::Disconnected);
    assert_eq!(session.secondary_state(), ConnectionState::Disconnected);
    assert!(session.frame().metrics.is_unknown());

    sim.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waveform_loss_ends_session() {
    let sim = Simulator::builder().start().await.unwrap();

    let settings = SessionSettings {
        waveform: format!("tcp://{}", sim.waveform_addr()).parse().unwrap(),
        classification: format!("tcp://{}", sim.classification_addr())
            .parse()
            .unwrap(),
        ..Default::default()
    };
    let mut session = SessionController::new(settings, Arc::new(NetworkTransport));
    session.connect();
    assert!(
        poll_until(&mut session, Duration::from_secs(3), |s| {
            s.state() == SessionState::Live
        })
        .await
    );

    sim.stop();

    assert!(
        poll_until(&mut session, Duration::from_secs(3), |s| {
            s.state() == SessionState::Disconnected
        })
        .await,
        "session still {:?} after the device went away",
        session.state()
    );
    assert_eq!(session.secondary_state(), ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refused_waveform_fails() {
    // Bind and release a port so nothing is listening on it
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let settings = SessionSettings {
        waveform: format!("tcp://{}", addr).parse().unwrap(),
        classification: format!("tcp://{}", addr).parse().unwrap(),
        ..Default::default()
    };
    let mut session = SessionController::new(settings, Arc::new(NetworkTransport));
    session.connect();

    assert!(
        poll_until(&mut session, Duration::from_secs(3), |s| {
            s.state() == SessionState::Failed
        })
        .await
    );
    assert!(session.last_error().is_some());
    assert_eq!(session.secondary_state(), ConnectionState::Disconnected);
}
