mod common;

use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use cobra::worker;

async fn backdate_invitation(app: &common::TestApp, id: &str, hours: i32) {
    let id: Uuid = id.parse().unwrap();
    sqlx::query(
        "UPDATE project_invitations
         SET created_at = now() - make_interval(hours => $2)
         WHERE id = $1",
    )
    .bind(id)
    .bind(hours)
    .execute(&app.pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn maintainer_invite_then_accept_creates_developer_membership() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let mike = app.user("mike").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let mike_membership = app.add_member(&alice, project_id, &mike).await;
    app.patch_auth(
        &format!("/api/v1/memberships/{}", mike_membership["id"].as_str().unwrap()),
        &alice.token,
        &json!({ "role": "maintainer" }),
    )
    .await;

    let (inv, status) = app.invite(&mike, project_id, &vera).await;
    assert_eq!(status, StatusCode::CREATED, "{inv}");
    assert_eq!(inv["status"], "pending");
    assert_eq!(inv["is_active"], true);
    assert_eq!(inv["inviter_id"], mike.id.to_string());
    assert_eq!(inv["user_id"], vera.id.to_string());
    let inv_id = inv["id"].as_str().unwrap();

    let (_, status) = app
        .post_auth(&format!("/api/v1/invitations/{inv_id}/accept"), &vera.token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (inv, _) = app.get_auth(&format!("/api/v1/invitations/{inv_id}"), &vera.token).await;
    assert_eq!(inv["status"], "accepted");

    let (memberships, _) = app
        .get_auth(&format!("/api/v1/projects/{project_id}/memberships"), &vera.token)
        .await;
    let vera_row = memberships
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["user_id"] == vera.id.to_string())
        .unwrap();
    assert_eq!(vera_row["role"], "developer");

    common::cleanup(app).await;
}

#[tokio::test]
async fn developer_cannot_invite() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let dan = app.user("dan").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    app.add_member(&alice, project_id, &dan).await;

    let (body, status) = app.invite(&dan, project_id, &vera).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "inviter_is_not_a_maintainer_or_a_creator");

    common::cleanup(app).await;
}

#[tokio::test]
async fn outsider_cannot_see_project_to_invite_into() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let eve = app.user("eve").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let (_, status) = app.invite(&eve, project["id"].as_str().unwrap(), &vera).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn creator_cannot_invite_existing_member_or_themselves() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    app.add_member(&alice, project_id, &vera).await;

    let (body, status) = app.invite(&alice, project_id, &vera).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "user_is_already_a_member");

    let (body, status) = app.invite(&alice, project_id, &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "user_is_already_a_member");

    common::cleanup(app).await;
}

#[tokio::test]
async fn duplicate_pending_invitation_is_rejected() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();

    let (_, status) = app.invite(&alice, project_id, &vera).await;
    assert_eq!(status, StatusCode::CREATED);

    let (body, status) = app.invite(&alice, project_id, &vera).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "pending_invitation_already_exists");

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_or_inactive_invitee_is_a_field_error() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/projects/{project_id}/invitations"),
            &alice.token,
            &json!({ "email": "ghost@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(vera.id)
        .execute(&app.pool)
        .await
        .unwrap();
    let (body, status) = app.invite(&alice, project_id, &vera).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "email");

    common::cleanup(app).await;
}

#[tokio::test]
async fn only_invited_user_may_respond() {
    let app = common::spawn_app().await;
    let admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;
    let eve = app.user("eve").await;

    let project = app.create_project(&alice, "Tracker").await;
    let (inv, _) = app.invite(&alice, project["id"].as_str().unwrap(), &vera).await;
    let inv_id = inv["id"].as_str().unwrap();
    let accept = format!("/api/v1/invitations/{inv_id}/accept");

    // The inviter and staff can see it but not act on it
    let (_, status) = app.post_auth(&accept, &alice.token, &json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app.post_auth(&accept, &admin.token, &json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Strangers do not learn it exists
    let (_, status) = app.post_auth(&accept, &eve.token, &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app.get_auth(&format!("/api/v1/invitations/{inv_id}"), &eve.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (list, _) = app.get_auth("/api/v1/invitations", &eve.token).await;
    assert!(list.as_array().unwrap().is_empty());
    let (list, _) = app.get_auth("/api/v1/invitations", &vera.token).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (list, _) = app.get_auth("/api/v1/invitations", &alice.token).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn expired_invitation_cannot_be_accepted() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let (inv, _) = app.invite(&alice, project_id, &vera).await;
    let inv_id = inv["id"].as_str().unwrap();

    backdate_invitation(&app, inv_id, 25).await;

    let (inv, _) = app.get_auth(&format!("/api/v1/invitations/{inv_id}"), &vera.token).await;
    assert_eq!(inv["is_active"], false);

    let (body, status) = app
        .post_auth(&format!("/api/v1/invitations/{inv_id}/accept"), &vera.token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invitation_has_expired");
    assert_eq!(app.membership_count(project_id, vera.id).await, 0);

    let (body, status) = app
        .post_auth(&format!("/api/v1/invitations/{inv_id}/reject"), &vera.token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invitation_has_expired");

    common::cleanup(app).await;
}

#[tokio::test]
async fn invitation_within_lifetime_can_be_accepted() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let (inv, _) = app.invite(&alice, project_id, &vera).await;
    let inv_id = inv["id"].as_str().unwrap();

    backdate_invitation(&app, inv_id, 23).await;

    let (_, status) = app
        .post_auth(&format!("/api/v1/invitations/{inv_id}/accept"), &vera.token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.membership_count(project_id, vera.id).await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn reject_creates_no_membership_and_is_terminal() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let (inv, _) = app.invite(&alice, project_id, &vera).await;
    let inv_id = inv["id"].as_str().unwrap();

    let (_, status) = app
        .post_auth(&format!("/api/v1/invitations/{inv_id}/reject"), &vera.token, &json!({}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (inv, _) = app.get_auth(&format!("/api/v1/invitations/{inv_id}"), &vera.token).await;
    assert_eq!(inv["status"], "rejected");
    assert_eq!(app.membership_count(project_id, vera.id).await, 0);

    for action in ["accept", "reject"] {
        let (body, status) = app
            .post_auth(&format!("/api/v1/invitations/{inv_id}/{action}"), &vera.token, &json!({}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invitation_is_not_pending");
    }

    let (inv, _) = app.get_auth(&format!("/api/v1/invitations/{inv_id}"), &vera.token).await;
    assert_eq!(inv["status"], "rejected");

    // Once resolved, a fresh invitation may be sent
    let (_, status) = app.invite(&alice, project_id, &vera).await;
    assert_eq!(status, StatusCode::CREATED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn concurrent_accepts_create_one_membership() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let (inv, _) = app.invite(&alice, project_id, &vera).await;
    let path = format!("/api/v1/invitations/{}/accept", inv["id"].as_str().unwrap());

    let empty = json!({});
    let ((first, s1), (second, s2)) = tokio::join!(
        app.post_auth(&path, &vera.token, &empty),
        app.post_auth(&path, &vera.token, &empty),
    );

    let statuses = [s1, s2];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::NO_CONTENT).count(),
        1,
        "{first} {second}"
    );
    let loser = if s1 == StatusCode::NO_CONTENT { second } else { first };
    let code = loser["code"].as_str().unwrap();
    assert!(
        code == "invitation_is_not_pending" || code == "user_is_already_a_member",
        "unexpected code {code}"
    );
    assert_eq!(app.membership_count(project_id, vera.id).await, 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn accept_fails_when_already_member_through_another_invitation() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let mike = app.user("mike").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let project_id = project["id"].as_str().unwrap();
    let mike_membership = app.add_member(&alice, project_id, &mike).await;
    app.patch_auth(
        &format!("/api/v1/memberships/{}", mike_membership["id"].as_str().unwrap()),
        &alice.token,
        &json!({ "role": "maintainer" }),
    )
    .await;

    // Two inviters, two pending invitations for the same user
    let (from_alice, _) = app.invite(&alice, project_id, &vera).await;
    let (from_mike, status) = app.invite(&mike, project_id, &vera).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, status) = app
        .post_auth(
            &format!("/api/v1/invitations/{}/accept", from_alice["id"].as_str().unwrap()),
            &vera.token,
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (body, status) = app
        .post_auth(
            &format!("/api/v1/invitations/{}/accept", from_mike["id"].as_str().unwrap()),
            &vera.token,
            &json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "user_is_already_a_member");

    common::cleanup(app).await;
}

#[tokio::test]
async fn invitation_queues_a_notification_the_worker_completes() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    let (inv, _) = app.invite(&alice, project["id"].as_str().unwrap(), &vera).await;

    let (kind, payload): (String, serde_json::Value) =
        sqlx::query_as("SELECT kind, payload FROM notification_queue")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(kind, "project_invitation");
    assert_eq!(payload["invitation_id"], inv["id"]);

    // No SMTP configured: the item is logged and completed
    assert!(worker::process_next(&app.state).await.unwrap());
    assert!(!worker::process_next(&app.state).await.unwrap());

    let status: String = sqlx::query_scalar("SELECT status FROM notification_queue")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(status, "completed");

    common::cleanup(app).await;
}

#[tokio::test]
async fn unknown_notification_kind_backs_off() {
    let app = common::spawn_app().await;

    sqlx::query("INSERT INTO notification_queue (kind, payload) VALUES ('carrier_pigeon', '{}')")
        .execute(&app.pool)
        .await
        .unwrap();

    assert!(worker::process_next(&app.state).await.unwrap());

    let (status, attempts, last_error): (String, i32, Option<String>) = sqlx::query_as(
        "SELECT status, attempts, last_error FROM notification_queue",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(status, "failed");
    assert_eq!(attempts, 1);
    assert!(last_error.unwrap().contains("carrier_pigeon"));

    // Not ready again until the backoff elapses
    assert!(!worker::process_next(&app.state).await.unwrap());

    common::cleanup(app).await;
}

#[tokio::test]
async fn abandoned_claim_is_picked_up_again() {
    let app = common::spawn_app().await;
    let _admin = app.user("admin").await;
    let alice = app.user("alice").await;
    let vera = app.user("vera").await;

    let project = app.create_project(&alice, "Tracker").await;
    app.invite(&alice, project["id"].as_str().unwrap(), &vera).await;

    // A worker claims the item and dies before finishing it
    let claimed = cobra::db::notifications::claim_next(&app.pool)
        .await
        .unwrap()
        .expect("item claimed");
    assert_eq!(claimed.status, "processing");

    // A fresh claim is left alone
    assert!(!worker::process_next(&app.state).await.unwrap());

    sqlx::query("UPDATE notification_queue SET claimed_at = now() - interval '1 hour'")
        .execute(&app.pool)
        .await
        .unwrap();

    assert!(worker::process_next(&app.state).await.unwrap());

    let (status, attempts): (String, i32) =
        sqlx::query_as("SELECT status, attempts FROM notification_queue")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(status, "completed");
    assert_eq!(attempts, 2);

    common::cleanup(app).await;
}
