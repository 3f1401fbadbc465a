use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use anchor_auth::{
    AuthDecision, AuthError, AuthGate, InMemorySecretStore, KeyMaterialProvider, KeyPurpose,
    MasterSecret, ProviderConfig, SecretStore, derive_key, signature_hex,
};

const BODY: &[u8] = br#"{"device_id":"curl-test-001","firmware_version":"curl-v1"}"#;

fn auth_signature(secret: &[u8], body: &[u8]) -> String {
    let key = derive_key(secret, KeyPurpose::RequestAuth.context());
    signature_hex(&key, body)
}

async fn provider_for(store: Arc<dyn SecretStore>) -> Arc<KeyMaterialProvider> {
    // Zero TTL: every check sees the store's current rotation state.
    let config = ProviderConfig {
        refresh_interval: Duration::ZERO,
        ..ProviderConfig::default()
    };
    Arc::new(KeyMaterialProvider::bootstrap(store, config).await.unwrap())
}

#[tokio::test]
async fn zero_downtime_rotation() {
    let store = Arc::new(InMemorySecretStore::new());
    let v1 = store.rotate_to("ANCHOR_KEY", b"old-master".to_vec());
    let old_signature = auth_signature(b"old-master", BODY);

    let provider = provider_for(Arc::clone(&store) as Arc<dyn SecretStore>).await;
    let gate = AuthGate::new(Arc::clone(&provider));

    // Before rotation: the only key verifies.
    let decision = gate.authenticate(BODY, Some(&old_signature)).await.unwrap();
    assert_eq!(accepted_version(decision), v1);

    // Rotate: a new version becomes latest, the old one stays enabled while
    // clients migrate.
    let v2 = store.rotate_to("ANCHOR_KEY", b"new-master".to_vec());
    let new_signature = auth_signature(b"new-master", BODY);

    let decision = gate.authenticate(BODY, Some(&old_signature)).await.unwrap();
    assert_eq!(accepted_version(decision), v1, "old key must verify mid-rotation");

    let decision = gate.authenticate(BODY, Some(&new_signature)).await.unwrap();
    assert_eq!(accepted_version(decision), v2);
    assert_eq!(gate.current_key_version(), v2);

    // All clients migrated: the operator disables the old version.
    store.set_enabled("ANCHOR_KEY", &v1, false);

    let decision = gate.authenticate(BODY, Some(&old_signature)).await.unwrap();
    assert!(
        matches!(decision, AuthDecision::Rejected { .. }),
        "retired key must never verify again"
    );

    // The new key keeps verifying off the same derivation cache.
    let decision = gate.authenticate(BODY, Some(&new_signature)).await.unwrap();
    assert_eq!(accepted_version(decision), v2);
}

#[tokio::test]
async fn resubmitted_signature_stays_rejected_after_retirement() {
    let store = Arc::new(InMemorySecretStore::new());
    let v1 = store.rotate_to("ANCHOR_KEY", b"old-master".to_vec());
    store.rotate_to("ANCHOR_KEY", b"new-master".to_vec());
    let old_signature = auth_signature(b"old-master", BODY);

    let provider = provider_for(Arc::clone(&store) as Arc<dyn SecretStore>).await;
    let gate = AuthGate::new(provider);

    assert!(gate
        .authenticate(BODY, Some(&old_signature))
        .await
        .unwrap()
        .is_accepted());

    store.set_enabled("ANCHOR_KEY", &v1, false);

    for _ in 0..3 {
        let decision = gate.authenticate(BODY, Some(&old_signature)).await.unwrap();
        assert!(!decision.is_accepted());
    }
}

/// Store whose fetches can be slowed down after bootstrap, to drive the
/// refresh-timeout path.
struct SlowStore {
    inner: InMemorySecretStore,
    delay: Mutex<Duration>,
}

impl SlowStore {
    fn new(secret: &[u8]) -> Self {
        Self {
            inner: InMemorySecretStore::with_secret("ANCHOR_KEY", secret.to_vec()),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn stall(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SecretStore for SlowStore {
    async fn latest(&self, name: &str) -> anyhow::Result<MasterSecret> {
        self.stall().await;
        self.inner.latest(name).await
    }

    async fn enabled_previous(&self, name: &str) -> anyhow::Result<Vec<MasterSecret>> {
        self.stall().await;
        self.inner.enabled_previous(name).await
    }
}

#[tokio::test(start_paused = true)]
async fn hung_store_times_out_and_serves_stale_keyring() {
    let store = Arc::new(SlowStore::new(b"master"));
    let config = ProviderConfig {
        refresh_interval: Duration::ZERO,
        fetch_timeout: Duration::from_millis(100),
        ..ProviderConfig::default()
    };
    let provider = Arc::new(
        KeyMaterialProvider::bootstrap(Arc::clone(&store) as Arc<dyn SecretStore>, config)
            .await
            .unwrap(),
    );
    let gate = AuthGate::new(Arc::clone(&provider));

    store.set_delay(Duration::from_secs(60));

    // The forced refresh reports the timeout.
    assert!(matches!(
        provider.refresh().await,
        Err(AuthError::FetchTimeout(_))
    ));

    // The request path falls back to the stale keyring and still verifies.
    let signature = auth_signature(b"master", BODY);
    let decision = gate.authenticate(BODY, Some(&signature)).await.unwrap();
    assert!(decision.is_accepted());
}

#[tokio::test]
async fn bootstrap_fails_against_unreachable_store() {
    let store = Arc::new(InMemorySecretStore::with_secret("ANCHOR_KEY", b"secret".to_vec()));
    store.set_offline(true);

    let result = KeyMaterialProvider::bootstrap(
        store as Arc<dyn SecretStore>,
        ProviderConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(AuthError::SecretStore(_))));
}

fn accepted_version(decision: AuthDecision) -> String {
    match decision {
        AuthDecision::Accepted { key_version } => key_version,
        other => panic!("expected Accepted, got {:?}", other),
    }
}
