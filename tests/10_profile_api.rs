mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use catalog_profile_api::database::{EntityRepository, ProfileRange, ProfileRecord};

#[tokio::test]
async fn newer_profile_commits_and_older_is_ignored() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server
        .seed(3, Some(ProfileRecord::new(100, json!({"rowCount": 1}))))
        .await?;

    let res = server
        .client
        .post(server.url(&format!("/entities/{}/profile", id)))
        .json(&json!({"timestamp": 90, "payload": {"rowCount": 2}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-profile-outcome"], "unchanged");
    let body = res.json::<Value>().await?;
    assert_eq!(common::data(&body)["version"], 3);
    assert_eq!(common::data(&body)["latest_profile"]["timestamp"], 100);

    let res = server
        .client
        .post(server.url(&format!("/entities/{}/profile", id)))
        .json(&json!({"timestamp": 150, "payload": {"rowCount": 3}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-profile-outcome"], "updated");
    let body = res.json::<Value>().await?;
    assert_eq!(common::data(&body)["version"], 4);

    // round trip through GET reflects the committed profile exactly
    let body = server
        .client
        .get(server.url(&format!("/entities/{}", id)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let view = common::data(&body);
    assert_eq!(view["version"], 4);
    assert_eq!(view["latest_profile"], json!({"timestamp": 150, "payload": {"rowCount": 3}}));

    Ok(())
}

#[tokio::test]
async fn replayed_update_is_a_no_op() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server.seed(1, None).await?;
    let request = json!({"timestamp": 500, "payload": {"rowCount": 42}});

    let first = server
        .client
        .post(server.url(&format!("/entities/{}/profile", id)))
        .json(&request)
        .send()
        .await?;
    assert_eq!(first.headers()["x-profile-outcome"], "updated");
    let first = first.json::<Value>().await?;

    let second = server
        .client
        .post(server.url(&format!("/entities/{}/profile", id)))
        .json(&request)
        .send()
        .await?;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-profile-outcome"], "unchanged");
    let second = second.json::<Value>().await?;

    assert_eq!(common::data(&first), common::data(&second));
    assert_eq!(server.repository.get(id).await?.version, 2);
    Ok(())
}

#[tokio::test]
async fn unknown_entities_are_not_found() -> Result<()> {
    let server = common::spawn_default().await?;
    let body = json!({"timestamp": 1, "payload": {}});

    for path in [
        format!("/entities/{}/profile", uuid_like()),
        "/entities/nonexistent-id/profile".to_string(),
    ] {
        let res = server.client.post(server.url(&path)).json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", path);
        let err = res.json::<Value>().await?;
        assert_eq!(err["code"], "NOT_FOUND");
    }

    let res = server
        .client
        .get(server.url(&format!("/entities/{}", uuid_like())))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_payloads_are_rejected_before_storage() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server.seed(7, None).await?;
    let url = server.url(&format!("/entities/{}/profile", id));

    let cases = [
        json!({"payload": {"rowCount": 1}}),
        json!({"timestamp": "soon", "payload": {}}),
        json!({"timestamp": 10}),
        json!({"timestamp": 10, "payload": "rows"}),
    ];
    for body in cases {
        let res = server.client.post(&url).json(&body).send().await?;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        let err = res.json::<Value>().await?;
        assert_eq!(err["code"], "UNPROCESSABLE_ENTITY");
        assert!(err["field_errors"].is_object());
    }

    let res = server
        .client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let view = server.repository.get(id).await?;
    assert_eq!(view.version, 7);
    assert!(view.latest_profile.is_none());
    Ok(())
}

#[tokio::test]
async fn reject_mode_surfaces_stale_updates() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server
        .seed(3, Some(ProfileRecord::new(100, json!({"rowCount": 1}))))
        .await?;

    let res = server
        .client
        .post(server.url(&format!("/entities/{}/profile?stale=reject", id)))
        .json(&json!({"timestamp": 90, "payload": {}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>().await?["code"], "STALE_UPDATE");

    let res = server
        .client
        .post(server.url(&format!("/entities/{}/profile?stale=sometimes", id)))
        .json(&json!({"timestamp": 200, "payload": {}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.repository.get(id).await?.version, 3);
    Ok(())
}

#[tokio::test]
async fn history_latest_and_summary() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server.seed(1, None).await?;

    for ts in [10, 20, 30] {
        let payload = json!({
            "tableProfile": {"rowCount": ts * 10, "columnCount": 1},
            "columnProfile": [{"name": "email", "valuesCount": 10, "accuracyEmailCount": 8}]
        });
        server
            .client
            .post(server.url(&format!("/entities/{}/profile", id)))
            .json(&json!({"timestamp": ts, "payload": payload}))
            .send()
            .await?
            .error_for_status()?;
    }

    let body = server
        .client
        .get(server.url(&format!("/entities/{}/profiles?start_ts=15", id)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let stamps: Vec<i64> = common::data(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["timestamp"].as_i64().unwrap())
        .collect();
    assert_eq!(stamps, vec![20, 30]);

    let res = server
        .client
        .get(server.url(&format!("/entities/{}/profiles?start_ts=30&end_ts=10", id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .get(server.url(&format!("/entities/{}/profiles?start_ts=yesterday", id)))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = res.json::<Value>().await?;
    assert_eq!(err["error"], true);
    assert_eq!(err["code"], "BAD_REQUEST");

    let body = server
        .client
        .get(server.url(&format!("/entities/{}/profile", id)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    assert_eq!(common::data(&body)["timestamp"], 30);

    let body = server
        .client
        .get(server.url(&format!("/entities/{}/profile/summary", id)))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let summary = common::data(&body);
    assert_eq!(summary["row_count"], 300);
    assert_eq!(summary["columns"][0]["dominant_kind"], "email");
    assert_eq!(summary["accuracy_proportion_display"], "80.00%");

    let history = server.repository.list_profiles(id, ProfileRange::default()).await?;
    assert_eq!(history.len(), 3);
    Ok(())
}

#[tokio::test]
async fn unprofiled_entity_has_no_latest_profile() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server.seed(1, None).await?;

    for path in ["profile", "profile/summary"] {
        let res = server
            .client
            .get(server.url(&format!("/entities/{}/{}", id, path)))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn legacy_table_profile_route() -> Result<()> {
    let server = common::spawn_default().await?;
    let id = server.seed(2, None).await?;

    let create = json!({
        "tableProfile": {"timestamp": 1_700_000_000_000i64, "rowCount": 12},
        "columnProfile": []
    });
    let res = server
        .client
        .post(server.url("/custom/updateLatestTableProfile"))
        .json(&json!({"tableId": id, "createTableProfile": create}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let view = common::data(&body);
    assert_eq!(view["version"], 3);
    assert_eq!(view["latest_profile"]["timestamp"], 1_700_000_000_000i64);
    assert_eq!(view["latest_profile"]["payload"], create);

    let res = server
        .client
        .post(server.url("/custom/updateLatestTableProfile"))
        .json(&json!({"tableId": "not-a-uuid", "createTableProfile": create}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn root_lists_route_table() -> Result<()> {
    let server = common::spawn_default().await?;

    let body = server.client.get(server.url("/")).send().await?.json::<Value>().await?;
    let routes = common::data(&body)["routes"].as_array().unwrap().clone();
    assert!(routes.iter().any(|r| r["operation_id"] == "updateLatestProfile"
        && r["method"] == "POST"
        && r["path"] == "/entities/:entity_id/profile"));

    let body = server.client.get(server.url("/health")).send().await?.json::<Value>().await?;
    assert_eq!(common::data(&body)["storage"], "memory");
    Ok(())
}

fn uuid_like() -> String {
    catalog_profile_api::database::EntityId::new().to_string()
}
