use anyhow::Result;
use lab_quota::{TestHarness, DEMO_ADMIN, DEMO_PI, DEMO_SECOND_PI};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test(flavor = "multi_thread")]
async fn seeded_pi_sees_own_lab() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let token = harness.api_token(DEMO_PI.0, DEMO_PI.1).await?;
    let members: Value = harness
        .http_client()
        .get(harness.api_url("/api/v2/members/"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(members["PI Name"], "amy");
    let users = members["Users"].as_object().expect("users map");
    assert_eq!(users.len(), 3);
    assert_eq!(members["Users"]["mary"]["files"], 1401);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn summaries_accumulate_history_per_pi() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let amy = harness.api_token(DEMO_PI.0, DEMO_PI.1).await?;
    let bob = harness.api_token(DEMO_SECOND_PI.0, DEMO_SECOND_PI.1).await?;
    let admin = harness.api_token(DEMO_ADMIN.0, DEMO_ADMIN.1).await?;
    let client = harness.http_client();

    for token in [&amy, &amy, &bob] {
        let response = client
            .get(harness.api_url("/api/v2/summary/"))
            .bearer_auth(token)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let own: Vec<Value> = client
        .get(harness.api_url("/api/v2/summary/history/"))
        .bearer_auth(&amy)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(own.len(), 2);
    assert!(own.iter().all(|entry| entry["PI"] == "amy"));

    let all: Vec<Value> = client
        .get(harness.api_url("/api/v2/summary/history/"))
        .bearer_auth(&admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["PI"], "bob");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn pi_token_cannot_read_admin_quotas() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let token = harness.api_token(DEMO_PI.0, DEMO_PI.1).await?;
    let response = harness
        .http_client()
        .get(harness.api_url("/api/v2/admin/quotas/"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}
