mod common;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use collaboration::collaborations::{self, PermissionLevel};
use collaboration::invitations::{coordinator, store, InvitationStatus, NewInvitation, ResponseStatus};
use collaboration::sweeper;
use collaboration::ExpirySweeper;
use common::{acquire_db_lock, read_json, TestApp};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ProcessExpiredBody {
    expired_count: usize,
}

#[tokio::test]
async fn sweep_expires_stale_pending_invitations_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (stale, answered, fresh) = app
        .with_conn(|conn| {
            let stale = coordinator::create_invitation(
                conn,
                NewInvitation::board_collaboration(1, 2, 30, PermissionLevel::Edit, None),
            )?;
            let answered = coordinator::create_invitation(conn, NewInvitation::connection(3, 2, None))?;
            coordinator::respond_to_invitation(conn, answered.id, ResponseStatus::Declined, None)?;
            let fresh = coordinator::create_invitation(conn, NewInvitation::connection(4, 2, None))?;
            Ok((stale.id, answered.id, fresh.id))
        })
        .await?;
    app.backdate_invitation(stale, 10).await?;
    app.backdate_invitation(answered, 10).await?;

    let first = ExpirySweeper::new(
        Arc::new(app.state.clone()),
        Duration::from_secs(1),
        chrono::Duration::days(7),
    )
    .tick()
    .await?;
    assert_eq!(first.expired, vec![stale]);
    assert!(first.failed.is_empty());

    let second = app
        .with_conn(|conn| Ok(sweeper::run_expiry_sweep(conn, chrono::Duration::days(7))?))
        .await?;
    assert_eq!(second.expired_count(), 0);

    app.with_conn(move |conn| {
        let expired = store::find(conn, stale)?;
        assert_eq!(expired.status, InvitationStatus::Expired);
        assert!(expired.responded_at.is_some());
        assert_eq!(store::find(conn, answered)?.status, InvitationStatus::Declined);
        assert!(store::find(conn, fresh)?.is_pending());
        // expiry never materializes a grant
        assert!(!collaborations::is_collaborator(conn, 30, 2)?);
        Ok(())
    })
    .await?;

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn process_expired_endpoint_honours_custom_window() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let id = app
        .with_conn(|conn| {
            let invitation = coordinator::create_invitation(conn, NewInvitation::connection(5, 6, None))?;
            Ok(invitation.id)
        })
        .await?;
    app.backdate_invitation(id, 3).await?;

    let default_window: ProcessExpiredBody =
        read_json(app.post_empty("/api/invitations/process-expired").await?).await?;
    assert_eq!(default_window.expired_count, 0);

    let invalid = app
        .post_json("/api/invitations/process-expired", &json!({ "expiry_days": 0 }))
        .await?;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let short_window: ProcessExpiredBody = read_json(
        app.post_json("/api/invitations/process-expired", &json!({ "expiry_days": 2 }))
            .await?,
    )
    .await?;
    assert_eq!(short_window.expired_count, 1);

    let late_accept = app
        .post_json(
            &format!("/api/invitations/{id}/respond"),
            &json!({ "status": "ACCEPTED" }),
        )
        .await?;
    assert_eq!(late_accept.status(), StatusCode::CONFLICT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn process_expired_rejects_bad_windows_and_bodies() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let id = app
        .with_conn(|conn| {
            let invitation = coordinator::create_invitation(conn, NewInvitation::connection(7, 8, None))?;
            Ok(invitation.id)
        })
        .await?;
    app.backdate_invitation(id, 10).await?;

    for days in [i64::MAX, 100_000_000] {
        let response = app
            .post_json("/api/invitations/process-expired", &json!({ "expiry_days": days }))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "expiry_days = {days}");
    }

    for body in ["{not json", r#"{"expiry_days": "soon"}"#] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/invitations/process-expired")
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        let response = app.send(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body = {body}");
    }

    // rejected requests must not fall back to the default window
    app.with_conn(move |conn| {
        assert!(store::find(conn, id)?.is_pending());
        Ok(())
    })
    .await?;

    let swept: ProcessExpiredBody =
        read_json(app.post_empty("/api/invitations/process-expired").await?).await?;
    assert_eq!(swept.expired_count, 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn overlapping_sweeps_expire_each_invitation_once() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let stale: Vec<_> = app
        .with_conn(|conn| {
            let mut ids = Vec::new();
            for sender in 10..16 {
                let invitation =
                    coordinator::create_invitation(conn, NewInvitation::connection(sender, 20, None))?;
                ids.push(invitation.id);
            }
            Ok(ids)
        })
        .await?;
    for id in &stale {
        app.backdate_invitation(*id, 10).await?;
    }

    const SWEEPERS: usize = 2;
    let pool = app.pool();
    let reports = tokio::task::spawn_blocking(move || -> Result<Vec<sweeper::SweepReport>> {
        let barrier = Arc::new(Barrier::new(SWEEPERS));
        let handles: Vec<_> = (0..SWEEPERS)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || -> Result<sweeper::SweepReport> {
                    let mut conn = pool.get().map_err(|err| anyhow!("{err}"))?;
                    barrier.wait();
                    Ok(sweeper::run_expiry_sweep(&mut conn, chrono::Duration::days(7))?)
                })
            })
            .collect();
        let mut reports = Vec::with_capacity(SWEEPERS);
        for handle in handles {
            reports.push(handle.join().map_err(|_| anyhow!("sweeper panicked"))??);
        }
        Ok(reports)
    })
    .await??;

    let mut expired = HashSet::new();
    for report in &reports {
        assert!(report.failed.is_empty(), "{:?}", report.failed);
        for id in &report.expired {
            assert!(expired.insert(*id), "{id} expired by both sweeps");
        }
    }
    assert_eq!(expired, stale.iter().copied().collect::<HashSet<_>>());

    app.cleanup().await?;
    Ok(())
}
