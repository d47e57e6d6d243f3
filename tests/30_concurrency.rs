mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use catalog_profile_api::config::AppConfig;
use catalog_profile_api::database::{EntityRepository, ProfileRange};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_http_updates_lose_nothing() -> Result<()> {
    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    // enough headroom that no request can exhaust its CAS attempts
    config.profile.max_cas_attempts = 64;
    let server = common::spawn_server(config).await?;
    let id = server.seed(5, None).await?;

    let requests = (1..=24).map(|ts| {
        let client = server.client.clone();
        let url = server.url(&format!("/entities/{}/profile", id));
        async move {
            let res = client
                .post(url)
                .json(&json!({"timestamp": ts, "payload": {"writer": ts}}))
                .send()
                .await?;
            anyhow::ensure!(res.status() == StatusCode::OK, "unexpected status {}", res.status());
            Ok::<_, anyhow::Error>(res.headers()["x-profile-outcome"] == "updated")
        }
    });

    let mut commits = 0;
    for committed in futures::future::join_all(requests).await {
        if committed? {
            commits += 1;
        }
    }

    let view = server.repository.get(id).await?;
    assert!(commits >= 1);
    assert_eq!(view.version, 5 + commits);
    assert_eq!(view.latest_profile_timestamp(), Some(24));

    let history = server.repository.list_profiles(id, ProfileRange::default()).await?;
    assert_eq!(history.len() as i64, commits);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_entities_do_not_interact() -> Result<()> {
    let server = common::spawn_default().await?;
    let a = server.seed(1, None).await?;
    let b = server.seed(10, None).await?;

    let post = |id, ts: i64| {
        let client = server.client.clone();
        let url = server.url(&format!("/entities/{}/profile", id));
        async move {
            client
                .post(url)
                .json(&json!({"timestamp": ts, "payload": {}}))
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, anyhow::Error>(())
        }
    };

    let (ra, rb) = tokio::join!(post(a, 100), post(b, 100));
    ra?;
    rb?;

    assert_eq!(server.repository.get(a).await?.version, 2);
    assert_eq!(server.repository.get(b).await?.version, 11);
    Ok(())
}
