mod common;

use anyhow::Result;
use axum::http::StatusCode;
use collaboration::connections;
use common::{acquire_db_lock, read_json, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct ConnectionBody {
    id: Uuid,
    follower_id: i64,
    following_id: i64,
    status: String,
    notifications_enabled: bool,
}

#[derive(Deserialize)]
struct CountBody {
    count: i64,
}

#[derive(Deserialize)]
struct PageBody {
    content: Vec<ConnectionBody>,
    total_elements: i64,
}

#[tokio::test]
async fn mutual_connections_need_both_directions_accepted() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.with_conn(|conn| {
        connections::create_edge(conn, 1, 2, None, true)?;
        connections::create_edge(conn, 2, 1, None, true)?;
        // one-way follow
        connections::create_edge(conn, 1, 3, None, true)?;
        // 4 blocks 1 back
        connections::create_edge(conn, 1, 4, None, true)?;
        connections::block_user(conn, 4, 1)?;
        Ok(())
    })
    .await?;

    let mutual: Vec<ConnectionBody> = read_json(app.get("/api/connections/mutual/1").await?).await?;
    assert_eq!(mutual.len(), 1);
    assert_eq!(mutual[0].follower_id, 1);
    assert_eq!(mutual[0].following_id, 2);

    let mutual_of_two: Vec<ConnectionBody> =
        read_json(app.get("/api/connections/mutual/2").await?).await?;
    assert_eq!(mutual_of_two.len(), 1);
    assert_eq!(mutual_of_two[0].following_id, 1);

    let paged: PageBody =
        read_json(app.get("/api/connections/mutual/1/paged?size=10").await?).await?;
    assert_eq!(paged.total_elements, 1);
    assert_eq!(paged.content.len(), 1);
    assert_eq!(paged.content[0].following_id, 2);

    let following: CountBody =
        read_json(app.get("/api/connections/following/1/count").await?).await?;
    assert_eq!(following.count, 3);

    // the BLOCKED edge from 4 does not count as a follower
    let followers: Vec<ConnectionBody> =
        read_json(app.get("/api/connections/followers/1").await?).await?;
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].follower_id, 2);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn block_then_unblock_allows_a_new_follow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let blocked = app.post_empty("/api/connections/block/1/5").await?;
    assert_eq!(blocked.status(), StatusCode::OK);
    let blocked: ConnectionBody = read_json(blocked).await?;
    assert_eq!(blocked.status, "BLOCKED");
    assert!(!blocked.notifications_enabled);

    let follow = json!({ "follower_id": 1, "following_id": 5 });
    let conflict = app.post_json("/api/connections", &follow).await?;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    let blocked_list: Vec<ConnectionBody> =
        read_json(app.get("/api/connections/blocked/1").await?).await?;
    assert_eq!(blocked_list.len(), 1);

    let unblocked = app.post_empty("/api/connections/unblock/1/5").await?;
    assert_eq!(unblocked.status(), StatusCode::NO_CONTENT);

    let unblock_again = app.post_empty("/api/connections/unblock/1/5").await?;
    assert_eq!(unblock_again.status(), StatusCode::NOT_FOUND);

    let created = app.post_json("/api/connections", &follow).await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: ConnectionBody = read_json(created).await?;
    assert_eq!(created.status, "ACCEPTED");
    assert!(created.notifications_enabled);

    let not_blocked = app.post_empty("/api/connections/unblock/1/5").await?;
    assert_eq!(not_blocked.status(), StatusCode::CONFLICT);

    let fetched: ConnectionBody =
        read_json(app.get(&format!("/api/connections/{}", created.id)).await?).await?;
    assert_eq!(fetched.id, created.id);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn blocking_overwrites_an_existing_follow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let created = app
        .post_json(
            "/api/connections",
            &json!({ "follower_id": 7, "following_id": 8, "notifications_enabled": false }),
        )
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: ConnectionBody = read_json(created).await?;
    assert!(!created.notifications_enabled);

    let blocked: ConnectionBody =
        read_json(app.post_empty("/api/connections/block/7/8").await?).await?;
    assert_eq!(blocked.id, created.id);
    assert_eq!(blocked.status, "BLOCKED");

    let between: ConnectionBody =
        read_json(app.get("/api/connections/between/7/8").await?).await?;
    assert_eq!(between.status, "BLOCKED");

    let status = app
        .put_json(
            &format!("/api/connections/{}/status", created.id),
            &json!({ "status": "ACCEPTED" }),
        )
        .await?;
    assert_eq!(status.status(), StatusCode::OK);

    let deleted = app
        .delete(&format!("/api/connections/{}", created.id))
        .await?;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let missing = app.get("/api/connections/between/7/8").await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}
