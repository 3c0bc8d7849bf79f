use anyhow::{anyhow, Result};
use lab_quota::{TestHarness, DEMO_ADMIN, DEMO_PI};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Response;

fn session_cookie(response: &Response) -> Result<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("dashboard did not set a session cookie"))
}

async fn dashboard_login(
    harness: &TestHarness,
    (username, password): (&str, &str),
) -> Result<Response> {
    Ok(harness
        .http_client()
        .post(harness.dashboard_url("/login"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await?)
}

#[tokio::test(flavor = "multi_thread")]
async fn pi_logs_in_and_sees_member_chart() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let response = dashboard_login(&harness, DEMO_PI).await?;
    let cookie = session_cookie(&response)?;
    let html = response.text().await?;

    assert!(html.contains("Logged in as amy"));
    assert!(html.contains("<li>PI: amy</li>"));
    assert!(html.contains("<li>Total Usage: 16 GB</li>"));
    assert!(html.contains("<li>Average Usage: 5.33 GB</li>"));
    assert!(html.contains("<li>Max Individual Usage: 12 GB</li>"));
    assert!(!html.contains("Warnings"));
    assert_eq!(html.matches(r#"class="usage""#).count(), 3);
    let label = |name: &str| {
        html.find(&format!(r#"class="bar-label">{name}<"#))
            .unwrap_or(usize::MAX)
    };
    assert!(label("tom") < label("amy") && label("amy") < label("mary"));

    let response = harness
        .http_client()
        .post(harness.dashboard_url("/logout"))
        .header(COOKIE, &cookie)
        .send()
        .await?;
    let html = response.text().await?;
    assert!(html.contains("You have been logged out."));

    let html = harness
        .http_client()
        .get(harness.dashboard_url("/"))
        .header(COOKIE, &cookie)
        .send()
        .await?
        .text()
        .await?;
    assert!(html.contains("Please log in to view data."));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_compares_all_pis() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let response = dashboard_login(&harness, DEMO_ADMIN).await?;
    let cookie = session_cookie(&response)?;
    let html = response.text().await?;
    assert!(html.contains("Logged in as admin"));
    assert!(html.contains("Please select at least one PI."));

    let html = harness
        .http_client()
        .get(harness.dashboard_url("/?all=1"))
        .header(COOKIE, &cookie)
        .send()
        .await?
        .text()
        .await?;
    assert!(html.contains("<p>Number of PIs: 2</p>"));
    assert!(html.contains("<p>Total Usage: 21 GB</p>"));
    assert!(html.contains("<p>Remaining Quota: 54 GB</p>"));
    assert!(html.contains("PI Usage vs Soft Limit"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_is_reported_by_dashboard() -> Result<()> {
    let mut harness = TestHarness::new()?;
    harness.start_all_services().await?;

    let response = dashboard_login(&harness, (DEMO_PI.0, "nope")).await?;
    assert!(response.headers().get(SET_COOKIE).is_none());
    let html = response.text().await?;
    assert!(html.contains("Login failed: Incorrect password"));
    Ok(())
}
