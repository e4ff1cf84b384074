/// Integration tests for the TeamTrack API
///
/// These tests run the full router against a real PostgreSQL database and
/// are ignored by default; run them with a live database via:
///
/// ```bash
/// DATABASE_URL=... JWT_SECRET=... cargo test -p teamtrack-api -- --ignored
/// ```

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_authentication_required() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.request("GET", "/v1/teams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();

    let email = format!("reg-{}@example.com", uuid::Uuid::new_v4());
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "SecureP@ss123",
                "name": "New User"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    assert_eq!(body["role"], "user");
    assert!(body["access_token"].is_string());

    // Duplicate email conflicts
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "SecureP@ss123",
                "name": "New User"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "SecureP@ss123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    // Wrong password is indistinguishable from wrong email
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "WrongP@ss123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "SecureP@ss123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_regular_user_cannot_create_team_or_list_users() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .request(
            "POST",
            "/v1/teams",
            Some(&ctx.member),
            Some(json!({ "name": "Rogue Team" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.request("GET", "/v1/users", Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.request("GET", "/v1/users", Some(&ctx.lead), None).await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

/// The core permission scenario: lead manages, member edits tasks, admin
/// bypasses, outsider sees nothing.
#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_permission_scenario() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Release").await;
    let task_id = ctx
        .create_task(
            project_id,
            json!({
                "title": "Write changelog",
                "assignee_ids": [ctx.member.id]
            }),
        )
        .await;

    let task_uri = format!(
        "/v1/teams/{}/projects/{}/tasks/{}",
        ctx.team.id, project_id, task_id
    );

    // Member can view and update status
    let (status, body) = ctx.request("GET", &task_uri, Some(&ctx.member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "todo");

    let (status, body) = ctx
        .request(
            "PATCH",
            &task_uri,
            Some(&ctx.member),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");

    // Member cannot manage the roster
    let (status, _) = ctx
        .request(
            "POST",
            &format!("/v1/teams/{}/members", ctx.team.id),
            Some(&ctx.member),
            Some(json!({ "user_id": ctx.outsider.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Outsider sees nothing
    let (status, _) = ctx.request("GET", &task_uri, Some(&ctx.outsider), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Member is not the author, so cannot delete; admin can
    let (status, _) = ctx
        .request("DELETE", &task_uri, Some(&ctx.member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.request("DELETE", &task_uri, Some(&ctx.admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_task_numbers_are_sequential() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Numbering").await;

    for expected in 1..=3 {
        let uri = format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_id);
        let (status, body) = ctx
            .request(
                "POST",
                &uri,
                Some(&ctx.lead),
                Some(json!({ "title": format!("Task {}", expected) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["task_number"], expected);
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_assignees_must_be_on_roster() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Roster").await;
    let uri = format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_id);

    // Outsider as assignee is rejected
    let (status, _) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.lead),
            Some(json!({
                "title": "Bad assignment",
                "assignee_ids": [ctx.outsider.id]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Lead and member are both fine; lead counts without a member row
    let (status, _) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.lead),
            Some(json!({
                "title": "Good assignment",
                "assignee_ids": [ctx.lead.id, ctx.member.id]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_parent_cycle_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Cycles").await;
    let a = ctx.create_task(project_id, json!({ "title": "A" })).await;
    let b = ctx
        .create_task(project_id, json!({ "title": "B", "parent_id": a }))
        .await;
    let c = ctx
        .create_task(project_id, json!({ "title": "C", "parent_id": b }))
        .await;

    let base = format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_id);

    // A under C closes the loop A -> B -> C -> A
    let (status, _) = ctx
        .request(
            "PATCH",
            &format!("{}/{}", base, a),
            Some(&ctx.lead),
            Some(json!({ "parent_id": c })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Self-parenting is the degenerate cycle
    let (status, _) = ctx
        .request(
            "PATCH",
            &format!("{}/{}", base, a),
            Some(&ctx.lead),
            Some(json!({ "parent_id": a })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Re-parenting to a sibling-free target still works
    let (status, body) = ctx
        .request(
            "PATCH",
            &format!("{}/{}", base, c),
            Some(&ctx.lead),
            Some(json!({ "parent_id": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["parent_id"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_self_reference_filtered_from_related() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Links").await;
    let a = ctx.create_task(project_id, json!({ "title": "A" })).await;
    let b = ctx.create_task(project_id, json!({ "title": "B" })).await;

    let uri = format!(
        "/v1/teams/{}/projects/{}/tasks/{}",
        ctx.team.id, project_id, a
    );

    // The task's own id is silently dropped
    let (status, body) = ctx
        .request(
            "PATCH",
            &uri,
            Some(&ctx.lead),
            Some(json!({ "related_ids": [a, b] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let related = body["related"].as_array().unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["id"], b.to_string());

    // The edge is symmetric: B sees A too
    let b_uri = format!(
        "/v1/teams/{}/projects/{}/tasks/{}",
        ctx.team.id, project_id, b
    );
    let (status, body) = ctx.request("GET", &b_uri, Some(&ctx.lead), None).await;
    assert_eq!(status, StatusCode::OK);
    let related = body["related"].as_array().unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0]["id"], a.to_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_team_list_is_role_filtered() {
    let ctx = TestContext::new().await.unwrap();

    // A second team led by the admin, with the lead of the first team as a
    // plain member of it
    let (status, body) = ctx
        .request(
            "POST",
            "/v1/teams",
            Some(&ctx.admin),
            Some(json!({ "name": "Second Team", "lead_id": ctx.admin.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_team_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .request(
            "POST",
            &format!("/v1/teams/{}/members", second_team_id),
            Some(&ctx.admin),
            Some(json!({ "user_id": ctx.lead.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let team_ids = |body: &serde_json::Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    };

    // A team lead sees only the teams they lead, not teams they merely
    // belong to
    let (status, body) = ctx.request("GET", "/v1/teams", Some(&ctx.lead), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids = team_ids(&body);
    assert!(ids.contains(&ctx.team.id.to_string()));
    assert!(!ids.contains(&second_team_id));

    // A regular user sees the teams they belong to
    let (status, body) = ctx
        .request("GET", "/v1/teams", Some(&ctx.member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(team_ids(&body), vec![ctx.team.id.to_string()]);

    // An outsider sees nothing; an admin sees both
    let (status, body) = ctx
        .request("GET", "/v1/teams", Some(&ctx.outsider), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = ctx.request("GET", "/v1/teams", Some(&ctx.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids = team_ids(&body);
    assert!(ids.contains(&ctx.team.id.to_string()));
    assert!(ids.contains(&second_team_id));

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("/v1/teams/{}", second_team_id),
            Some(&ctx.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_team_creation_requires_qualified_lead() {
    let ctx = TestContext::new().await.unwrap();

    // A regular user cannot be designated as lead
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/teams",
            Some(&ctx.admin),
            Some(json!({ "name": "Bad Lead", "lead_id": ctx.member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Neither can a nonexistent user
    let (status, _) = ctx
        .request(
            "POST",
            "/v1/teams",
            Some(&ctx.admin),
            Some(json!({ "name": "Bad Lead", "lead_id": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_parent_must_resolve_in_project() {
    let ctx = TestContext::new().await.unwrap();

    let project_a = ctx.create_project("Alpha").await;
    let project_b = ctx.create_project("Beta").await;
    let foreign_task = ctx.create_task(project_b, json!({ "title": "Elsewhere" })).await;

    // Creating under a parent from another project fails
    let (status, _) = ctx
        .request(
            "POST",
            &format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_a),
            Some(&ctx.lead),
            Some(json!({ "title": "Orphan", "parent_id": foreign_task })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Re-parenting across projects fails the same way
    let local_task = ctx.create_task(project_a, json!({ "title": "Local" })).await;
    let (status, _) = ctx
        .request(
            "PATCH",
            &format!(
                "/v1/teams/{}/projects/{}/tasks/{}",
                ctx.team.id, project_a, local_task
            ),
            Some(&ctx.lead),
            Some(json!({ "parent_id": foreign_task })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_related_must_resolve_in_project() {
    let ctx = TestContext::new().await.unwrap();

    let project_a = ctx.create_project("Alpha").await;
    let project_b = ctx.create_project("Beta").await;
    let foreign_task = ctx.create_task(project_b, json!({ "title": "Elsewhere" })).await;

    let uri = format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_a);

    // A related id from another project is rejected, as is one that does
    // not exist at all
    let (status, _) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.lead),
            Some(json!({ "title": "Linked", "related_ids": [foreign_task] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.lead),
            Some(json!({ "title": "Linked", "related_ids": [uuid::Uuid::new_v4()] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The same gate holds on update
    let local_task = ctx.create_task(project_a, json!({ "title": "Local" })).await;
    let (status, _) = ctx
        .request(
            "PATCH",
            &format!("{}/{}", uri, local_task),
            Some(&ctx.lead),
            Some(json!({ "related_ids": [foreign_task] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_member_add_remove_asymmetry() {
    let ctx = TestContext::new().await.unwrap();

    let members_uri = format!("/v1/teams/{}/members", ctx.team.id);

    // Adding an existing member is a conflict
    let (status, _) = ctx
        .request(
            "POST",
            &members_uri,
            Some(&ctx.lead),
            Some(json!({ "user_id": ctx.member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Removing a non-member is a silent no-op
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("{}?user_id={}", members_uri, ctx.outsider.id),
            Some(&ctx.lead),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Actual removal also succeeds
    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("{}?user_id={}", members_uri, ctx.member.id),
            Some(&ctx.lead),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_project_patch_semantics() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Original").await;
    let uri = format!("/v1/teams/{}/projects/{}", ctx.team.id, project_id);

    // Empty name is skipped, description applies even when empty
    let (status, body) = ctx
        .request(
            "PATCH",
            &uri,
            Some(&ctx.lead),
            Some(json!({ "name": "   ", "description": "", "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Original");
    assert_eq!(body["description"], "");
    assert_eq!(body["status"], "completed");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_cross_team_project_is_not_found() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Scoped").await;

    // Same project id under a different (nonexistent) team does not resolve
    let (status, _) = ctx
        .request(
            "GET",
            &format!("/v1/teams/{}/projects/{}", uuid::Uuid::new_v4(), project_id),
            Some(&ctx.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_task_delete_by_author() {
    let ctx = TestContext::new().await.unwrap();

    let project_id = ctx.create_project("Authorship").await;

    // Member authors a task, then may delete it despite not managing
    let uri = format!("/v1/teams/{}/projects/{}/tasks", ctx.team.id, project_id);
    let (status, body) = ctx
        .request(
            "POST",
            &uri,
            Some(&ctx.member),
            Some(json!({ "title": "Mine" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = body["id"].as_str().unwrap();

    let (status, _) = ctx
        .request(
            "DELETE",
            &format!("{}/{}", uri, task_id),
            Some(&ctx.member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}
