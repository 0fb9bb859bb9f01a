//! Integration tests for game trees.
//!
//! - Creating a game from a parent species materializes the whole subtree
//! - Leaf actions propagate status and times to every ancestor
//! - Deleting games or species refreshes the surviving parents

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use hunt_core::hunting::{GameStatus, HuntAction};
use hunt_core::types::Timestamp;
use hunt_db::models::category::CreateGameCategory;
use hunt_db::models::game::{CreateGame, Game, GameFilter, UpdateGame};
use hunt_db::models::species::{CreateSpecies, Species};
use hunt_db::repositories::{ActionOutcome, GameCategoryRepo, GameRepo, SpeciesRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn species(pool: &PgPool, title: &str, parent: Option<i64>, secs: i64) -> Species {
    let input = CreateSpecies {
        title: title.to_string(),
        description: None,
        genus_id: None,
        parent_species_id: parent,
        priority: None,
        estimated_hunting_secs: Some(secs),
    };
    SpeciesRepo::create(pool, &input).await.unwrap()
}

/// Root -> { A (600), B -> { B1 (300), B2 (200) } }
async fn template(pool: &PgPool) -> Species {
    let root = species(pool, "Root", None, 0).await;
    species(pool, "A", Some(root.id), 600).await;
    let b = species(pool, "B", Some(root.id), 0).await;
    species(pool, "B1", Some(b.id), 300).await;
    species(pool, "B2", Some(b.id), 200).await;
    SpeciesRepo::find_by_id(pool, root.id).await.unwrap().unwrap()
}

async fn game_from(pool: &PgPool, template: &Species) -> Game {
    let input = CreateGame {
        species_id: Some(template.id),
        ..CreateGame::default()
    };
    GameRepo::create(pool, &input, Some(template)).await.unwrap()
}

async fn act(pool: &PgPool, id: i64, action: HuntAction, at: Timestamp) -> Game {
    match GameRepo::apply_action(pool, id, action, at).await.unwrap() {
        ActionOutcome::Applied(game) => game,
        other => panic!("{action:?} on game {id} was not applied: {other:?}"),
    }
}

async fn reload(pool: &PgPool, id: i64) -> Game {
    GameRepo::find_by_id(pool, id).await.unwrap().unwrap()
}

async fn child_titled(pool: &PgPool, parent: i64, title: &str) -> Game {
    GameRepo::list_children(pool, parent)
        .await
        .unwrap()
        .into_iter()
        .find(|g| g.title == title)
        .unwrap_or_else(|| panic!("no child game titled {title}"))
}

// ---------------------------------------------------------------------------
// Instantiation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_game_from_parent_species_builds_tree(pool: PgPool) {
    let root_species = template(&pool).await;
    assert_eq!(root_species.estimated_hunting_secs, 1_100);

    let root = game_from(&pool, &root_species).await;

    assert_eq!(root.title, "Root");
    assert!(!root.is_leaf);
    assert!(!root.is_active);
    assert_eq!(root.status, GameStatus::NotStarted);
    assert_eq!(root.estimated_hunting_secs, 1_100);
    assert_eq!(root.actual_hunting_secs, None);

    let children = GameRepo::list_children(&pool, root.id).await.unwrap();
    assert_eq!(children.len(), 2);

    let b = child_titled(&pool, root.id, "B").await;
    assert!(!b.is_leaf);
    assert_eq!(b.estimated_hunting_secs, 500);

    let b1 = child_titled(&pool, b.id, "B1").await;
    assert!(b1.is_leaf);
    assert_eq!(b1.hunt_start_time, root.hunt_start_time);
    assert_eq!(
        b1.deadline,
        Some(root.hunt_start_time + Duration::seconds(300))
    );

    let all = GameRepo::subtree_ids(&pool, root.id).await.unwrap();
    assert_eq!(all.len(), 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_game_from_leaf_species_copies_defaults(pool: PgPool) {
    let leaf = species(&pool, "Hare", None, 900).await;
    let game = game_from(&pool, &leaf).await;

    assert!(game.is_leaf);
    assert_eq!(game.title, "Hare");
    assert_eq!(game.species_title.as_deref(), Some("Hare"));
    assert_eq!(game.estimated_hunting_secs, 900);
    assert_eq!(
        game.deadline,
        Some(game.hunt_start_time + Duration::seconds(900))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_standalone_game_with_category(pool: PgPool) {
    let category = GameCategoryRepo::create(
        &pool,
        &CreateGameCategory {
            name: "Errands".to_string(),
            description: None,
        },
    )
    .await
    .unwrap();

    let input = CreateGame {
        title: Some("Groceries".to_string()),
        category_id: Some(category.id),
        estimated_hunting_secs: Some(1_200),
        ..CreateGame::default()
    };
    let game = GameRepo::create(&pool, &input, None).await.unwrap();
    assert_eq!(game.category_id, Some(category.id));
    assert_eq!(game.species_id, None);

    assert!(GameCategoryRepo::delete(&pool, category.id).await.unwrap());
    assert_eq!(reload(&pool, game.id).await.category_id, None);
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_leaf_actions_propagate_to_root(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;
    let b = child_titled(&pool, root.id, "B").await;
    let b1 = child_titled(&pool, b.id, "B1").await;

    let started_at = Utc::now();
    let started = act(&pool, b1.id, HuntAction::Start, started_at).await;
    assert_eq!(started.status, GameStatus::Hunting);
    assert!(started.is_active);

    assert_eq!(reload(&pool, b.id).await.status, GameStatus::Hunting);
    let hunting_root = reload(&pool, root.id).await;
    assert_eq!(hunting_root.status, GameStatus::Hunting);
    assert!(!hunting_root.is_active);

    let active = GameRepo::find_active(&pool).await.unwrap().unwrap();
    assert_eq!(active.id, b1.id);

    let finished_at = started_at + Duration::seconds(120);
    let captured = act(&pool, b1.id, HuntAction::Complete, finished_at).await;
    assert_eq!(captured.status, GameStatus::Captured);
    assert_eq!(captured.actual_hunting_secs, Some(120));
    assert!(!captured.is_active);

    // B2 untouched, A untouched: nothing hunting, nothing escaped.
    let b_after = reload(&pool, b.id).await;
    assert_eq!(b_after.status, GameStatus::NotStarted);
    assert_eq!(b_after.actual_hunting_secs, Some(120));
    assert_eq!(reload(&pool, root.id).await.actual_hunting_secs, Some(120));
    assert!(GameRepo::find_active(&pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_children_captured_captures_parent(pool: PgPool) {
    let parent_species = species(&pool, "Pair", None, 0).await;
    species(&pool, "One", Some(parent_species.id), 60).await;
    species(&pool, "Two", Some(parent_species.id), 60).await;
    let parent_species = SpeciesRepo::find_by_id(&pool, parent_species.id)
        .await
        .unwrap()
        .unwrap();
    let parent = game_from(&pool, &parent_species).await;

    let now = Utc::now();
    for child in GameRepo::list_children(&pool, parent.id).await.unwrap() {
        act(&pool, child.id, HuntAction::Start, now).await;
        act(&pool, child.id, HuntAction::Complete, now + Duration::seconds(30)).await;
    }

    let parent = reload(&pool, parent.id).await;
    assert_eq!(parent.status, GameStatus::Captured);
    assert_eq!(parent.actual_hunting_secs, Some(60));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_escaped_child_marks_parent_escaped(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;
    let a = child_titled(&pool, root.id, "A").await;

    let now = Utc::now();
    act(&pool, a.id, HuntAction::Start, now).await;
    act(&pool, a.id, HuntAction::Escape, now + Duration::seconds(45)).await;

    let root = reload(&pool, root.id).await;
    assert_eq!(root.status, GameStatus::Escaped);
    assert_eq!(root.actual_hunting_secs, Some(45));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_action_with_wrong_status_is_stale(pool: PgPool) {
    let leaf = species(&pool, "Fox", None, 60).await;
    let game = game_from(&pool, &leaf).await;

    let result = GameRepo::apply_action(&pool, game.id, HuntAction::Complete, Utc::now())
        .await
        .unwrap();
    assert_matches!(result, ActionOutcome::Stale);
    assert_eq!(reload(&pool, game.id).await.status, GameStatus::NotStarted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_action_on_parent_game_is_stale(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;

    let result = GameRepo::apply_action(&pool, root.id, HuntAction::Start, Utc::now())
        .await
        .unwrap();
    assert_matches!(result, ActionOutcome::Stale);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_action_on_deleted_game_is_not_found(pool: PgPool) {
    let leaf = species(&pool, "Hare", None, 60).await;
    let game = game_from(&pool, &leaf).await;
    assert!(GameRepo::delete(&pool, game.id).await.unwrap());

    let result = GameRepo::apply_action(&pool, game.id, HuntAction::Start, Utc::now())
        .await
        .unwrap();
    assert_matches!(result, ActionOutcome::NotFound);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reparent_game_refreshes_both_parents(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;
    let b = child_titled(&pool, root.id, "B").await;
    let b2 = child_titled(&pool, b.id, "B2").await;

    let update = UpdateGame {
        parent_game_id: Some(root.id),
        ..UpdateGame::default()
    };
    GameRepo::update(&pool, b2.id, &update).await.unwrap().unwrap();

    let b = reload(&pool, b.id).await;
    assert_eq!(b.estimated_hunting_secs, 300);
    assert_eq!(reload(&pool, root.id).await.estimated_hunting_secs, 1_100);
    assert_eq!(GameRepo::list_children(&pool, root.id).await.unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_child_game_refreshes_parent(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;
    let b = child_titled(&pool, root.id, "B").await;

    assert!(GameRepo::delete(&pool, b.id).await.unwrap());

    let root = reload(&pool, root.id).await;
    assert_eq!(root.estimated_hunting_secs, 600);
    assert_eq!(GameRepo::subtree_ids(&pool, root.id).await.unwrap().len(), 2);
    assert!(!GameRepo::delete(&pool, b.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_species_removes_its_games(pool: PgPool) {
    let root_species = template(&pool).await;
    let root = game_from(&pool, &root_species).await;
    let b_species = SpeciesRepo::list_subspecies(&pool, root_species.id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.title == "B")
        .unwrap();

    assert!(SpeciesRepo::delete(&pool, b_species.id).await.unwrap());

    let by_species = GameRepo::list_by_species(&pool, b_species.id).await.unwrap();
    assert!(by_species.is_empty());

    let root = reload(&pool, root.id).await;
    assert_eq!(root.estimated_hunting_secs, 600);
    assert_eq!(GameRepo::list_children(&pool, root.id).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters(pool: PgPool) {
    let root = game_from(&pool, &template(&pool).await).await;

    let roots = GameRepo::list(
        &pool,
        &GameFilter {
            roots_only: true,
            ..GameFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(roots.iter().map(|g| g.id).collect::<Vec<_>>(), vec![root.id]);

    let not_started = GameRepo::list(
        &pool,
        &GameFilter {
            status: Some(GameStatus::NotStarted),
            ..GameFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(not_started.len(), 5);

    let window = GameRepo::list(
        &pool,
        &GameFilter {
            from: Some(root.hunt_start_time + Duration::days(1)),
            ..GameFilter::default()
        },
    )
    .await
    .unwrap();
    assert!(window.is_empty());
}
