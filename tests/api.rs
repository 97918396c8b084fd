//! End-to-end behaviour against a real Postgres (requires Docker)

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use codearena::{constants::verdicts, services::AuthService};
use common::{problem_body, send, sign_up, test_app, unique};

#[tokio::test]
#[ignore = "requires docker"]
async fn test_registration_hashes_password() {
    let (app, pool) = test_app().await;
    let username = unique("alice");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/user/",
        None,
        Some(json!({"username": username, "password": "s3cret-pass", "first_name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"username": username, "first_name": "Alice", "last_name": "", "email": ""}));

    let stored: String = sqlx::query_scalar("SELECT password FROM users WHERE username = $1")
        .bind(&username)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, "s3cret-pass");
    assert!(AuthService::verify_password("s3cret-pass", &stored).unwrap());

    let (status, body) = send(&app, Method::POST, "/api/user/", None, Some(json!({"username": username, "password": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["username"][0], "user with this username already exists.");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_problem_lifecycle() {
    let (app, _pool) = test_app().await;
    let (owner_id, owner) = sign_up(&app, &unique("setter")).await;
    let (_, other) = sign_up(&app, &unique("solver")).await;
    let title = unique("Sum ");

    let mut body = problem_body(&title);
    body["difficulty"] = json!(300);
    let (status, errors) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["error"]["details"]["difficulty"][0], "Difficulty must be greater than 500");

    let (status, created) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&title))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["user"], owner_id);
    assert_eq!(created["difficulty"], 1500);
    assert_eq!(created["test_cases"], json!([]));
    assert!(created.get("correct_code").is_some());
    let id = created["id"].as_i64().unwrap();
    let detail = format!("/api/problem/{id}/");

    // Others get the public view and may not change it
    let (status, public) = send(&app, Method::GET, &detail, Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(public.get("correct_code").is_none());
    let (status, _) = send(&app, Method::PATCH, &detail, Some(&other), Some(json!({"difficulty": 900}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, patched) = send(&app, Method::PATCH, &detail, Some(&owner), Some(json!({"difficulty": 900}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["difficulty"], 900);
    assert_eq!(patched["title"], title);

    let (status, listed) = send(&app, Method::GET, &format!("/api/problem/?user={owner_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/problem/?user=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &detail, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &detail, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_contest_writers_may_edit() {
    let (app, _pool) = test_app().await;
    let (_, owner) = sign_up(&app, &unique("host")).await;
    let (writer_id, writer) = sign_up(&app, &unique("writer")).await;
    let (_, stranger) = sign_up(&app, &unique("stranger")).await;

    let (status, contest) = send(
        &app,
        Method::POST,
        "/api/contest/",
        Some(&owner),
        Some(json!({"title": unique("Round "), "writers": [writer_id]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{contest}");
    assert_eq!(contest["writers"], json!([writer_id]));
    assert!(contest["writers_detail"][0]["username"].is_string());
    let detail = format!("/api/contest/{}/", contest["id"]);

    let (status, _) = send(&app, Method::PATCH, &detail, Some(&writer), Some(json!({"description": "Div. 2"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::PATCH, &detail, Some(&stranger), Some(json!({"description": "mine"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/contest/",
        Some(&owner),
        Some(json!({"title": unique("Round "), "writers": [999999]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["writers"][0], "Invalid pk \"999999\" - object does not exist.");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_test_cases_follow_problem_owner() {
    let (app, _pool) = test_app().await;
    let (_, owner) = sign_up(&app, &unique("setter")).await;
    let (_, other) = sign_up(&app, &unique("intruder")).await;
    let title = unique("Echo ");

    let (_, problem) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&title))).await;
    let problem_id = problem["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/test-case/",
        Some(&other),
        Some(json!({"inputs": "1 2", "output": "3", "problem": problem_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, case) = send(
        &app,
        Method::POST,
        "/api/test-case/",
        Some(&owner),
        Some(json!({"inputs": "1 2", "output": "3", "problem": problem_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{case}");
    assert_eq!(case["problem_title"], title);

    let detail = format!("/api/test-case/{}/", case["id"]);
    let (status, _) = send(&app, Method::PUT, &detail, Some(&owner), Some(json!({"inputs": "x"}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (_, problem) = send(&app, Method::GET, &format!("/api/problem/{problem_id}/"), None, None).await;
    assert_eq!(problem["test_cases"], json!([{"inputs": "1 2", "output": "3"}]));

    let (status, _) = send(&app, Method::DELETE, &detail, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &detail, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_unsolved_problems_scope() {
    let (app, pool) = test_app().await;
    let (_, setter) = sign_up(&app, &unique("setter")).await;
    let (_, solver) = sign_up(&app, &unique("solver")).await;
    let title = unique("Solved ");

    let mut body = problem_body(&title);
    body["hidden_till"] = json!("2000-01-01T00:00:00Z");
    let (_, problem) = send(&app, Method::POST, "/api/problem/", Some(&setter), Some(body)).await;
    let problem_id = problem["id"].as_i64().unwrap();

    let search = format!("/api/problem/?unsolved_problems=1&search={}", title.replace(' ', "%20"));
    let (_, before) = send(&app, Method::GET, &search, Some(&solver), None).await;
    assert_eq!(before.as_array().unwrap().len(), 1);

    let (status, submission) = send(
        &app,
        Method::POST,
        "/api/submission/",
        Some(&solver),
        Some(json!({"code": "print(3)", "language": "python", "problem": problem_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{submission}");
    assert_eq!(submission["verdict"], verdicts::PENDING);

    sqlx::query("UPDATE submissions SET verdict = $2 WHERE problem_id = $1")
        .bind(problem_id)
        .bind(verdicts::ACCEPTED)
        .execute(&pool)
        .await
        .unwrap();

    let (_, after) = send(&app, Method::GET, &search, Some(&solver), None).await;
    assert_eq!(after.as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_profile_resolves_to_caller() {
    let (app, _pool) = test_app().await;
    let (user_id, token) = sign_up(&app, &unique("member")).await;

    let (status, created) = send(&app, Method::POST, "/api/user-profile/", Some(&token), Some(json!({"bio": "hi"}))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["user"], user_id);

    let (status, mine) = send(&app, Method::GET, "/api/user-profile/0/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["bio"], "hi");

    let (status, body) = send(&app, Method::POST, "/api/user-profile/", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["user"][0], "user profile with this user already exists.");

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], user_id);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_anonymous_reads_and_contest_delete() {
    let (app, _pool) = test_app().await;
    let (owner_id, owner) = sign_up(&app, &unique("host")).await;

    let (_, problem) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&unique("Read ")))).await;
    let (status, case) = send(
        &app,
        Method::POST,
        "/api/test-case/",
        Some(&owner),
        Some(json!({"inputs": "1", "output": "1", "problem": problem["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{case}");
    let (status, contest) = send(
        &app,
        Method::POST,
        "/api/contest/",
        Some(&owner),
        Some(json!({"title": unique("Open "), "writers": [owner_id]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{contest}");

    for (collection, id) in [("problem", &problem["id"]), ("contest", &contest["id"]), ("test-case", &case["id"])] {
        let (status, listed) = send(&app, Method::GET, &format!("/api/{collection}/"), None, None).await;
        assert_eq!(status, StatusCode::OK, "{collection} list");
        assert!(listed.as_array().unwrap().iter().any(|row| &row["id"] == id), "{collection} list");

        let (status, detail) = send(&app, Method::GET, &format!("/api/{collection}/{id}/"), None, None).await;
        assert_eq!(status, StatusCode::OK, "{collection} detail");
        assert_eq!(&detail["id"], id);
    }

    let detail = format!("/api/contest/{}/", contest["id"]);
    let (status, _) = send(&app, Method::DELETE, &detail, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &detail, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &detail, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_test_problems_scope() {
    let (app, _pool) = test_app().await;
    let (_, owner) = sign_up(&app, &unique("host")).await;
    let (tester_id, tester) = sign_up(&app, &unique("tester")).await;
    let (_, stranger) = sign_up(&app, &unique("stranger")).await;
    let title = unique("Upcoming ");

    let (_, problem) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&title))).await;
    let (status, contest) = send(
        &app,
        Method::POST,
        "/api/contest/",
        Some(&owner),
        Some(json!({
            "title": unique("Future "),
            "testers": [tester_id],
            "start_time": "2999-01-01T00:00:00Z",
            "end_time": "2999-01-02T00:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{contest}");

    // Only the contest owner or its writers may attach problems
    let link = json!({"contest": contest["id"], "problem": problem["id"], "problem_char": "A"});
    let (status, _) = send(&app, Method::POST, "/api/contest-problem/", Some(&stranger), Some(link.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, linked) = send(&app, Method::POST, "/api/contest-problem/", Some(&owner), Some(link)).await;
    assert_eq!(status, StatusCode::CREATED, "{linked}");
    assert_eq!(linked["problem_title"], title);

    let uri = format!("/api/problem/?test_problems=true&search={}", title.replace(' ', "%20"));
    let (_, seen) = send(&app, Method::GET, &uri, Some(&tester), None).await;
    assert_eq!(seen.as_array().unwrap().len(), 1);
    let (_, seen) = send(&app, Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(seen.as_array().unwrap().len(), 0);
    let (_, seen) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(seen.as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_titles_are_trimmed_before_uniqueness() {
    let (app, _pool) = test_app().await;
    let (_, owner) = sign_up(&app, &unique("setter")).await;
    let title = unique("Dup");

    let (status, created) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&format!("  {title} ")))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["title"], title);

    let (status, body) = send(&app, Method::POST, "/api/problem/", Some(&owner), Some(problem_body(&format!(" {title}")))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["title"][0], "problem with this title already exists.");
}
