mod common;

use chrono::{Duration, Utc};
use futures_util::future::join_all;
use serde_json::json;

use common::{connect_and_join, start_server, wait_for_event};

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (addr, _state) = start_server().await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("request")
        .json()
        .await
        .expect("parse");
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Posts and votes
// ---------------------------------------------------------------------------

async fn create_post(addr: std::net::SocketAddr, content: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/api/community/posts"))
        .json(&json!({ "authorName": "Asha", "content": content }))
        .send()
        .await
        .expect("create post");
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.expect("parse");
    body["id"].as_str().expect("post id").to_string()
}

async fn vote(
    addr: std::net::SocketAddr,
    post_id: &str,
    voter_id: Option<&str>,
    choice: i32,
) -> reqwest::Response {
    let mut payload = json!({ "vote": choice });
    if let Some(voter_id) = voter_id {
        payload["voterId"] = json!(voter_id);
    }
    reqwest::Client::new()
        .post(format!("http://{addr}/api/community/posts/{post_id}/vote"))
        .json(&payload)
        .send()
        .await
        .expect("vote request")
}

#[tokio::test]
async fn create_post_requires_content_or_image() {
    let (addr, _state) = start_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/community/posts"))
        .json(&json!({ "authorName": "Asha", "content": "   " }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn revoting_replaces_instead_of_double_counting() {
    let (addr, _state) = start_server().await;
    let post_id = create_post(addr, "mandi prices are up").await;

    let body: serde_json::Value = vote(addr, &post_id, Some("v1"), 1)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 1);
    assert_eq!(body["userVote"], 1);

    // Same voter upvoting again changes nothing.
    let body: serde_json::Value = vote(addr, &post_id, Some("v1"), 1)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 1);

    // A second voter stacks.
    let body: serde_json::Value = vote(addr, &post_id, Some("v2"), 1)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 2);

    // First voter flips to a downvote: 2 - 2 = 0.
    let body: serde_json::Value = vote(addr, &post_id, Some("v1"), -1)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 0);

    // And clears their vote entirely.
    let body: serde_json::Value = vote(addr, &post_id, Some("v1"), 0)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 1);

    // The durable copy reflects the final tally.
    let posts: serde_json::Value = reqwest::get(format!("http://{addr}/api/community/posts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts[0]["votes"], 1);
}

#[tokio::test]
async fn missing_voter_id_falls_back_to_peer_identity() {
    let (addr, _state) = start_server().await;
    let post_id = create_post(addr, "who has a tractor to rent?").await;

    // Two anonymous votes from the same address are the same voter.
    let body: serde_json::Value = vote(addr, &post_id, None, 1).await.json().await.unwrap();
    assert_eq!(body["votes"], 1);
    let body: serde_json::Value = vote(addr, &post_id, None, 1).await.json().await.unwrap();
    assert_eq!(body["votes"], 1);
}

#[tokio::test]
async fn vote_rejects_unknown_post_and_bad_choice() {
    let (addr, _state) = start_server().await;

    let resp = vote(addr, "post_missing", Some("v1"), 1).await;
    assert_eq!(resp.status(), 404);

    let post_id = create_post(addr, "hello").await;
    let resp = vote(addr, &post_id, Some("v1"), 5).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn concurrent_distinct_voters_all_count() {
    let (addr, _state) = start_server().await;
    let post_id = create_post(addr, "vote storm").await;

    let votes = (0..20).map(|i| {
        let post_id = post_id.clone();
        async move {
            let voter = format!("voter-{i}");
            vote(addr, &post_id, Some(&voter), 1).await
        }
    });
    join_all(votes).await;

    let body: serde_json::Value = vote(addr, &post_id, Some("final"), 1)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["votes"], 21);
}

// ---------------------------------------------------------------------------
// Labour marketplace
// ---------------------------------------------------------------------------

async fn create_labour_post(addr: std::net::SocketAddr, labour_count: u32) -> String {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/labour/posts"))
        .json(&json!({
            "farmerName": "Asha",
            "farmerId": "usr_asha",
            "workType": "harvesting",
            "location": "Nashik",
            "duration": "3 days",
            "offeredWage": 600,
            "labourCount": labour_count
        }))
        .send()
        .await
        .expect("create labour post");
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.expect("parse");
    body["id"].as_str().expect("post id").to_string()
}

async fn apply(
    addr: std::net::SocketAddr,
    post_id: &str,
    applicant_id: &str,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/labour/posts/{post_id}/apply"))
        .json(&json!({ "applicantId": applicant_id, "applicantName": applicant_id }))
        .send()
        .await
        .expect("apply request")
}

#[tokio::test]
async fn labour_post_validation_rejects_missing_fields() {
    let (addr, _state) = start_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/labour/posts"))
        .json(&json!({ "farmerName": "Asha" }))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn apply_flow_exhausts_slots_then_rejects() {
    let (addr, _state) = start_server().await;
    let post_id = create_labour_post(addr, 2).await;

    let resp = apply(addr, &post_id, "worker-1").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["remainingCount"], 1);
    assert_eq!(body["status"], "active");

    // Re-applying is a distinct conflict, not a second slot.
    let resp = apply(addr, &post_id, "worker-1").await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_APPLIED");

    let resp = apply(addr, &post_id, "worker-2").await;
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["remainingCount"], 0);
    assert_eq!(body["status"], "filled");

    // The job is full now.
    let resp = apply(addr, &post_id, "worker-3").await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "JOB_FILLED");

    // The durable copy shows the filled status.
    let posts: serde_json::Value = reqwest::get(format!("http://{addr}/api/labour/posts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts[0]["labourCount"], 0);
    assert_eq!(posts[0]["status"], "filled");
}

#[tokio::test]
async fn concurrent_applicants_claim_exactly_the_open_slots() {
    let (addr, _state) = start_server().await;
    let post_id = create_labour_post(addr, 3).await;

    let applications = (0..8).map(|i| {
        let post_id = post_id.clone();
        async move {
            let worker = format!("worker-{i}");
            apply(addr, &post_id, &worker).await.status().as_u16()
        }
    });
    let statuses = join_all(applications).await;

    let successes = statuses.iter().filter(|s| **s == 200).count();
    let rejections = statuses.iter().filter(|s| **s == 400).count();
    assert_eq!(successes, 3);
    assert_eq!(rejections, 5);
}

#[tokio::test]
async fn successful_apply_is_announced_on_the_hub() {
    let (addr, _state) = start_server().await;
    let post_id = create_labour_post(addr, 1).await;

    let mut farmer = connect_and_join(addr, "usr_asha", "Asha").await;

    let resp = apply(addr, &post_id, "worker-7").await;
    assert_eq!(resp.status(), 200);

    let event = wait_for_event(&mut farmer, "labour-applied").await;
    assert_eq!(event["data"]["postId"], post_id.as_str());
    assert_eq!(event["data"]["farmerName"], "Asha");
    assert_eq!(event["data"]["applicantName"], "worker-7");
    assert_eq!(event["data"]["remainingCount"], 0);
}

// ---------------------------------------------------------------------------
// Call logs and scheduled calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn call_log_round_trip_by_user() {
    let (addr, _state) = start_server().await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/community/calls"))
        .json(&json!({
            "callerName": "Asha",
            "callerId": "usr_asha",
            "receiverName": "Binod",
            "receiverId": "usr_binod",
            "callType": "video",
            "duration": 95,
            "status": "completed"
        }))
        .send()
        .await
        .expect("create call log");
    assert_eq!(resp.status(), 201);

    for user in ["usr_asha", "usr_binod"] {
        let logs: serde_json::Value =
            reqwest::get(format!("http://{addr}/api/community/calls/{user}"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(logs.as_array().unwrap().len(), 1);
        assert_eq!(logs[0]["duration"], 95);
        assert_eq!(logs[0]["status"], "completed");
    }

    let logs: serde_json::Value =
        reqwest::get(format!("http://{addr}/api/community/calls/usr_carol"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert!(logs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scheduled_calls_can_be_booked_and_cancelled() {
    let (addr, _state) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/community/scheduled-calls"))
        .json(&json!({
            "schedulerName": "Asha",
            "schedulerId": "usr_asha",
            "targetName": "Binod",
            "targetId": "usr_binod",
            "callType": "audio",
            "scheduledTime": (Utc::now() + Duration::hours(2)).to_rfc3339(),
            "note": "talk about the seed order"
        }))
        .send()
        .await
        .expect("create scheduled call");
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = resp.json().await.unwrap();
    let call_id = created["id"].as_str().unwrap().to_string();

    // Booking in the past is refused.
    let resp = client
        .post(format!("http://{addr}/api/community/scheduled-calls"))
        .json(&json!({
            "schedulerName": "Asha",
            "targetName": "Binod",
            "callType": "audio",
            "scheduledTime": (Utc::now() - Duration::hours(1)).to_rfc3339()
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Both parties see the booking.
    for user in ["usr_asha", "usr_binod"] {
        let calls: serde_json::Value = reqwest::get(format!(
            "http://{addr}/api/community/scheduled-calls/{user}"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(calls.as_array().unwrap().len(), 1);
    }

    // Cancel, then the listing is empty and a second cancel is a 404.
    let resp = client
        .delete(format!(
            "http://{addr}/api/community/scheduled-calls/{call_id}"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let calls: serde_json::Value = reqwest::get(format!(
        "http://{addr}/api/community/scheduled-calls/usr_asha"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert!(calls.as_array().unwrap().is_empty());

    // Cancelling twice: the record still exists, so the original contract
    // reports success again rather than a missing call.
    let resp = client
        .delete(format!(
            "http://{addr}/api/community/scheduled-calls/{call_id}"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .delete(format!("http://{addr}/api/community/scheduled-calls/sch_gone"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
