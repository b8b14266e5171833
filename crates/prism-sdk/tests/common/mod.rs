#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use prism_mock_api::{MockConfig, MockState, API_PREFIX};
use prism_sdk::{
    ClientConfig, Credential, CredentialStore, Gateway, MemoryCredentialStore, NotificationLevel,
    Notifier,
};
use tokio::net::TcpListener;

/// Latency of the mock refresh endpoint, long enough for concurrent 401s
/// to pile up behind the leader.
pub const REFRESH_DELAY: Duration = Duration::from_millis(300);

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(NotificationLevel, String)>>,
    pub login_required: AtomicUsize,
}

impl RecordingNotifier {
    pub fn login_required_count(&self) -> usize {
        self.login_required.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    fn login_required(&self) {
        self.login_required.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub mock: Arc<MockState>,
    pub store: Arc<MemoryCredentialStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<Gateway>,
}

/// Start the mock API on an ephemeral port and build a gateway against it.
pub async fn start() -> Harness {
    let mock = Arc::new(MockState::new(
        MockConfig::default().with_refresh_delay(REFRESH_DELAY),
    ));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(prism_mock_api::serve(listener, Arc::clone(&mock)));

    let store = Arc::new(MemoryCredentialStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = Gateway::new(
        ClientConfig::new(format!("http://{addr}{API_PREFIX}")),
        store.clone() as Arc<dyn CredentialStore>,
    )
    .unwrap()
    .with_notifier(notifier.clone() as Arc<dyn Notifier>);

    Harness {
        mock,
        store,
        notifier,
        gateway: Arc::new(gateway),
    }
}

impl Harness {
    /// Store a pair whose access token the mock already considers expired.
    pub fn seed_expired_session(&self) -> Credential {
        let pair = self.mock.issue_tokens(Duration::ZERO);
        self.store.set_current(pair.clone());
        pair
    }
}
