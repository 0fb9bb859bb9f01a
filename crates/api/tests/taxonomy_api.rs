//! HTTP-level integration tests for genera, species and categories.

mod common;

use axum::http::StatusCode;
use common::{body_json, create, delete, get, post_json, put_json};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Genera
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_genus_crud(pool: PgPool) {
    let genus = create(&pool, "/api/v1/genera", json!({"name": "Birds"})).await;
    let id = genus["id"].as_i64().unwrap();
    assert_eq!(genus["description"], "");

    let response = put_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/genera/{id}"),
        json!({"description": "Feathered"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Birds");
    assert_eq!(json["data"]["description"], "Feathered");

    let response = get(common::build_test_app(pool.clone()), "/api/v1/genera").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let response = delete(common::build_test_app(pool.clone()), &format!("/api/v1/genera/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(common::build_test_app(pool), &format!("/api/v1/genera/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_genus_with_empty_name_is_rejected(pool: PgPool) {
    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/genera",
        json!({"name": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["fields"]["name"].is_array());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_genus_species_listing(pool: PgPool) {
    let genus = create(&pool, "/api/v1/genera", json!({"name": "Fish"})).await;
    let genus_id = genus["id"].as_i64().unwrap();
    let species = create(
        &pool,
        "/api/v1/species",
        json!({"title": "Trout", "genus_id": genus_id, "estimated_hunting_secs": 3600}),
    )
    .await;
    assert_eq!(species["genus_name"], "Fish");

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/genera/{genus_id}/species"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["title"], "Trout");
}

// ---------------------------------------------------------------------------
// Species
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_parent_species_aggregates_children(pool: PgPool) {
    let root = create(&pool, "/api/v1/species", json!({"title": "Morning"})).await;
    let root_id = root["id"].as_i64().unwrap();

    for (title, secs) in [("Coffee", 300), ("Run", 1800)] {
        create(
            &pool,
            "/api/v1/species",
            json!({"title": title, "parent_species_id": root_id, "estimated_hunting_secs": secs}),
        )
        .await;
    }

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/species/{root_id}"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_leaf"], false);
    assert_eq!(json["data"]["estimated_hunting_secs"], 2100);

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/species/{root_id}/subspecies"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get(common::build_test_app(pool), "/api/v1/species?roots_only=true").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_estimate_on_parent_species_is_rejected(pool: PgPool) {
    let root = create(&pool, "/api/v1/species", json!({"title": "Evening"})).await;
    let root_id = root["id"].as_i64().unwrap();
    create(
        &pool,
        "/api/v1/species",
        json!({"title": "Read", "parent_species_id": root_id, "estimated_hunting_secs": 600}),
    )
    .await;

    let response = put_json(
        common::build_test_app(pool),
        &format!("/api/v1/species/{root_id}"),
        json!({"estimated_hunting_secs": 60}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["field"], "estimated_hunting_secs");
    assert_eq!(
        json["error"],
        "Cannot set hunting time directly for parent species."
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_species_cannot_move_under_descendant(pool: PgPool) {
    let root = create(&pool, "/api/v1/species", json!({"title": "Root"})).await;
    let root_id = root["id"].as_i64().unwrap();
    let child = create(
        &pool,
        "/api/v1/species",
        json!({"title": "Child", "parent_species_id": root_id}),
    )
    .await;
    let child_id = child["id"].as_i64().unwrap();

    let response = put_json(
        common::build_test_app(pool),
        &format!("/api/v1/species/{root_id}"),
        json!({"parent_species_id": child_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["field"], "parent_species_id");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_species_with_missing_parent_returns_404(pool: PgPool) {
    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/species",
        json!({"title": "Orphan", "parent_species_id": 999999}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_last_child_keeps_parent_estimate(pool: PgPool) {
    let root = create(&pool, "/api/v1/species", json!({"title": "Root"})).await;
    let root_id = root["id"].as_i64().unwrap();
    let child = create(
        &pool,
        "/api/v1/species",
        json!({"title": "Only", "parent_species_id": root_id, "estimated_hunting_secs": 420}),
    )
    .await;
    let child_id = child["id"].as_i64().unwrap();

    let response = delete(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/species/{child_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/species/{root_id}"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_leaf"], true);
    assert_eq!(json["data"]["estimated_hunting_secs"], 420);
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_category_crud(pool: PgPool) {
    let category = create(&pool, "/api/v1/categories", json!({"name": "Chores"})).await;
    let id = category["id"].as_i64().unwrap();

    let response = put_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/categories/{id}"),
        json!({"name": "House"}),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "House");

    let response = delete(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/categories/{id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(
        common::build_test_app(pool),
        &format!("/api/v1/categories/{id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
