mod common;

use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use common::{init_app, json_body, TestContext};
use todo_api::models::{Role, TaskCategory, TaskChanges};
use todo_api::store::TaskStore;

#[actix_rt::test]
async fn test_create_task() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let app = init_app(ctx.state.clone()).await;

    let due = (Utc::now() + Duration::days(3)).format("%Y-%m-%d").to_string();
    let req = test::TestRequest::post()
        .uri("/api/v1/task/tasks")
        .cookie(ctx.cookie_for(&alice))
        .set_form([
            ("title", "Write report"),
            ("description", "Quarterly numbers"),
            ("due_date", due.as_str()),
            ("category", "HIGH"),
            ("status", "true"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["title"], "Write report");
    assert_eq!(body["category"], "high");
    assert_eq!(body["owner_id"], alice.id);
    assert_eq!(body["status"], true);
    assert_eq!(body["delete_request"], false);
    assert!(body["completed_at"].is_string());

    // Defaults: not done, low priority, no due date.
    let req = test::TestRequest::post()
        .uri("/api/v1/task/tasks/")
        .cookie(ctx.cookie_for(&alice))
        .set_form([("title", "Plain"), ("due_date", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["status"], false);
    assert_eq!(body["category"], "low");
    assert!(body["due_date"].is_null());
    assert!(body["completed_at"].is_null());
}

#[actix_rt::test]
async fn test_create_task_validation() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let app = init_app(ctx.state.clone()).await;

    let past = (Utc::now() - Duration::days(1)).to_rfc3339();
    let long_title = "x".repeat(201);
    let cases = [
        vec![("title", "")],
        vec![("title", long_title.as_str())],
        vec![("title", "<script>alert(1)</script>")],
        vec![("title", "ok"), ("description", "<b>bold</b>")],
        vec![("title", "ok"), ("due_date", past.as_str())],
        vec![("title", "ok"), ("due_date", "next tuesday")],
        vec![("title", "ok"), ("category", "urgent")],
    ];

    for form in cases {
        let req = test::TestRequest::post()
            .uri("/api/v1/task/tasks")
            .cookie(ctx.cookie_for(&alice))
            .set_form(form.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{:?}", form);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/task/tasks")
        .set_form([("title", "no session")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_list_is_scoped_and_newest_first() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let bob = ctx.seed_user("bob", Role::User, true).await;
    let admin = ctx.seed_user("admin", Role::Admin, true).await;
    let first = ctx.seed_task(alice.id, "Buy milk").await;
    ctx.seed_task(bob.id, "Bob's chores").await;
    let third = ctx.seed_task(alice.id, "Walk the dog").await;
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/task/tasks")
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["skip"], 0);
    assert_eq!(body["limit"], 25);
    assert_eq!(body["tasks"][0]["id"], third.id);
    assert_eq!(body["tasks"][1]["id"], first.id);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/tasks?query=MILK")
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["title"], "Buy milk");

    let req = test::TestRequest::get()
        .uri("/api/v1/task/tasks?skip=1&limit=1")
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    for bad in ["limit=0", "limit=101", "skip=-1"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/task/tasks?{}", bad))
            .cookie(ctx.cookie_for(&admin))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{}",
            bad
        );
    }
}

#[actix_rt::test]
async fn test_read_and_update_authorization() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let bob = ctx.seed_user("bob", Role::User, true).await;
    let admin = ctx.seed_user("admin", Role::Admin, true).await;
    let task = ctx.seed_task(alice.id, "Private").await;
    let app = init_app(ctx.state.clone()).await;
    let uri = format!("/api/v1/task/tasks/{}", task.id);

    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(ctx.cookie_for(&bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/tasks/999")
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&bob))
        .set_form([("title", "Hijacked")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.store.task(task.id).unwrap().title, "Private");

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&alice))
        .set_form([("title", "Renamed"), ("category", "medium")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["category"], "medium");
    assert_eq!(body["description"], "Private description");

    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["title"], "Renamed");
}

#[actix_rt::test]
async fn test_change_status_tracks_completion() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let task = ctx.seed_task(alice.id, "Laundry").await;
    let app = init_app(ctx.state.clone()).await;
    let uri = format!("/api/v1/task/change-status/{}", task.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&alice))
        .set_form([("status", "true")])
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["status"], true);
    assert!(body["completed_at"].is_string());

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&alice))
        .set_form([("status", "false")])
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["status"], false);
    assert!(body["completed_at"].is_null());
}

#[actix_rt::test]
async fn test_change_category() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let bob = ctx.seed_user("bob", Role::User, true).await;
    let task = ctx.seed_task(alice.id, "Taxes").await;
    let app = init_app(ctx.state.clone()).await;
    let uri = format!("/api/v1/task/change-category/{}", task.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&alice))
        .set_form([("category", "unknown")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&bob))
        .set_form([("category", "high")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(ctx.cookie_for(&alice))
        .set_form([("category", "High")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.store.task(task.id).unwrap().category, TaskCategory::High);
}

#[actix_rt::test]
async fn test_delete_is_admin_only_and_requests_are_listed() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let admin = ctx.seed_user("admin", Role::Admin, true).await;
    let task = ctx.seed_task(alice.id, "Obsolete").await;
    ctx.seed_task(alice.id, "Keep me").await;
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/task/tasks/{}", task.id))
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/task/task-delete-request/{}", task.id))
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["delete_request"], true);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/delete-requested-tasks")
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/delete-requested-tasks")
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], task.id);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/search-delete-requested-tasks?query=keep")
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 0);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/task/tasks/{}", task.id))
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Task deleted successfully");
    assert!(ctx.store.task(task.id).is_none());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/task/tasks/{}", task.id))
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_search_covers_description_and_scope() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let bob = ctx.seed_user("bob", Role::User, true).await;
    let admin = ctx.seed_user("admin", Role::Admin, true).await;
    let groceries = ctx.seed_task(alice.id, "Groceries").await;
    ctx.seed_task(bob.id, "Groceries for Bob").await;
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/task/search?query=GROCERIES%20DESC")
        .cookie(ctx.cookie_for(&alice))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], groceries.id);

    let req = test::TestRequest::get()
        .uri("/api/v1/task/search?query=groceries")
        .cookie(ctx.cookie_for(&admin))
        .to_request();
    let body = json_body(test::call_service(&app, req).await).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["tasks"][0]["id"], groceries.id);
}

#[actix_rt::test]
async fn test_filter_tasks() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let bob = ctx.seed_user("bob", Role::User, true).await;
    let soon = ctx.seed_task(alice.id, "Soon").await;
    let later = ctx.seed_task(alice.id, "Later").await;
    ctx.seed_task(bob.id, "Not mine").await;

    let now = Utc::now();
    ctx.store
        .update_task(
            soon.id,
            TaskChanges {
                due_date: Some(now + Duration::days(1)),
                category: Some(TaskCategory::High),
                ..TaskChanges::status(true)
            },
        )
        .await
        .unwrap();
    ctx.store
        .update_task(
            later.id,
            TaskChanges {
                due_date: Some(now + Duration::days(10)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let app = init_app(ctx.state.clone()).await;

    let filter = |params: &str| {
        test::TestRequest::get()
            .uri(&format!("/api/v1/task/filter?{}", params))
            .cookie(ctx.cookie_for(&alice))
            .to_request()
    };

    let body = json_body(test::call_service(&app, filter("")).await).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["limit"], 8);

    let body = json_body(test::call_service(&app, filter("task_status=TRUE")).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], soon.id);

    let body = json_body(test::call_service(&app, filter("task_status=false&category=")).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], later.id);

    let body = json_body(test::call_service(&app, filter("category=high")).await).await;
    assert_eq!(body["total"], 1);

    let cutoff = (now + Duration::days(5)).format("%Y-%m-%d").to_string();
    let body = json_body(
        test::call_service(&app, filter(&format!("due_date={}", cutoff))).await,
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["tasks"][0]["id"], soon.id);

    let resp = test::call_service(&app, filter("category=urgent")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_rt::test]
async fn test_unparsable_parameters_are_json_validation_errors() {
    let ctx = TestContext::new();
    let alice = ctx.seed_user("alice", Role::User, true).await;
    let app = init_app(ctx.state.clone()).await;

    for uri in ["/api/v1/task/filter?skip=abc", "/api/v1/task/tasks/abc"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .cookie(ctx.cookie_for(&alice))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(json_body(resp).await["error"].is_string(), "{}", uri);
    }

    let req = test::TestRequest::put()
        .uri("/api/v1/task/change-status/1")
        .cookie(ctx.cookie_for(&alice))
        .set_form([("status", "maybe")])
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}
