// tests/recipe_tests.rs

use foodgram::config::Config;
use foodgram::routes;
use foodgram::state::{AppState, build_pool};
use sqlx::SqlitePool;

async fn spawn_app() -> (String, SqlitePool) {
    let db_path = std::env::temp_dir().join(format!("foodgram_test_{}.db", uuid::Uuid::new_v4()));
    let database_url = format!("sqlite://{}", db_path.display());

    let pool = build_pool(&database_url)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "recipe_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        page_size: 6,
        admin_username: None,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn register_and_login(client: &reqwest::Client, address: &str, username: &str) -> String {
    client
        .post(format!("{}/api/users", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "first_name": "Test",
            "last_name": "User",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    let body = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": format!("{}@example.com", username),
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    body["token"].as_str().unwrap().to_string()
}

/// Seeds a tag and an ingredient set directly through the pool; the admin API
/// is covered separately in api_tests.
async fn seed_catalog(pool: &SqlitePool) -> (Vec<i64>, Vec<i64>) {
    let mut tag_ids = Vec::new();
    for (name, color, slug) in [
        ("Breakfast", "#FF0000", "breakfast"),
        ("Dinner", "#00FF00", "dinner"),
    ] {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tags (name, color, slug) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(color)
        .bind(slug)
        .fetch_one(pool)
        .await
        .unwrap();
        tag_ids.push(id);
    }

    let mut ingredient_ids = Vec::new();
    for (name, unit) in [("Flour", "g"), ("Eggs", "pcs"), ("Milk", "ml")] {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?) RETURNING id",
        )
        .bind(name)
        .bind(unit)
        .fetch_one(pool)
        .await
        .unwrap();
        ingredient_ids.push(id);
    }

    (tag_ids, ingredient_ids)
}

fn recipe_payload(
    name: &str,
    tags: &[i64],
    ingredients: &[(i64, i64)],
) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "text": "Mix everything and bake.",
        "image": "data:image/png;base64,iVBORw0KGgo=",
        "cooking_time": 30,
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| serde_json::json!({"id": id, "amount": amount}))
            .collect::<Vec<_>>()
    })
}

async fn create_recipe(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    payload: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{}/api/recipes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(payload)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_recipe_roundtrip() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;

    let token = register_and_login(&client, &address, "author").await;

    let payload = recipe_payload(
        "Pancakes",
        &tags,
        &[(ingredients[0], 100), (ingredients[1], 2)],
    );
    let response = create_recipe(&client, &address, &token, &payload).await;
    assert_eq!(response.status(), 201);

    let recipe = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(recipe["name"], "Pancakes");
    assert_eq!(recipe["cooking_time"], 30);
    assert_eq!(recipe["author"]["username"], "author");
    assert_eq!(recipe["is_favorited"], false);
    assert_eq!(recipe["is_in_shopping_cart"], false);

    // Tag set equals the input set exactly
    let got_tags: Vec<i64> = recipe["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(got_tags.len(), 2);
    assert!(tags.iter().all(|t| got_tags.contains(t)));

    // Ingredient set equals the input set exactly: same ids, same amounts
    let got: Vec<(i64, i64)> = recipe["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| (i["id"].as_i64().unwrap(), i["amount"].as_i64().unwrap()))
        .collect();
    assert_eq!(got.len(), 2);
    assert!(got.contains(&(ingredients[0], 100)));
    assert!(got.contains(&(ingredients[1], 2)));

    // Anonymous detail read: flags false, no error
    let recipe_id = recipe["id"].as_i64().unwrap();
    let detail = client
        .get(format!("{}/api/recipes/{}", address, recipe_id))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 200);
    let detail = detail.json::<serde_json::Value>().await.unwrap();
    assert_eq!(detail["is_favorited"], false);
    assert_eq!(detail["is_in_shopping_cart"], false);
    assert_eq!(detail["author"]["is_subscribed"], false);
}

#[tokio::test]
async fn test_create_recipe_validation() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;
    let token = register_and_login(&client, &address, "strict").await;

    // Anonymous create is unauthorized
    let response = client
        .post(format!("{}/api/recipes", address))
        .json(&recipe_payload("Nope", &tags, &[(ingredients[0], 1)]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Empty tag list
    let response = create_recipe(
        &client,
        &address,
        &token,
        &recipe_payload("NoTags", &[], &[(ingredients[0], 1)]),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body.get("tags").is_some());

    // Empty ingredient list
    let response = create_recipe(
        &client,
        &address,
        &token,
        &recipe_payload("NoIngredients", &tags, &[]),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body.get("ingredients").is_some());

    // Duplicate tag ids
    let response = create_recipe(
        &client,
        &address,
        &token,
        &recipe_payload("DupTags", &[tags[0], tags[0]], &[(ingredients[0], 1)]),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body.get("tags").is_some());

    // Duplicate ingredient ids
    let response = create_recipe(
        &client,
        &address,
        &token,
        &recipe_payload(
            "DupIngredients",
            &tags,
            &[(ingredients[0], 1), (ingredients[0], 2)],
        ),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body.get("ingredients").is_some());

    // Unknown ingredient id, named in the message
    let response = create_recipe(
        &client,
        &address,
        &token,
        &recipe_payload("Unknown", &tags, &[(99999, 1)]),
    )
    .await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body["ingredients"][0].as_str().unwrap().contains("99999"));

    // Missing image
    let mut payload = recipe_payload("NoImage", &tags, &[(ingredients[0], 1)]);
    payload["image"] = serde_json::json!("");
    let response = create_recipe(&client, &address, &token, &payload).await;
    assert_eq!(response.status(), 400);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body.get("image").is_some());

    // Out-of-range cooking time
    let mut payload = recipe_payload("TooLong", &tags, &[(ingredients[0], 1)]);
    payload["cooking_time"] = serde_json::json!(2000);
    let response = create_recipe(&client, &address, &token, &payload).await;
    assert_eq!(response.status(), 400);

    // No partial recipe or composition row was persisted by any failure
    let list = client
        .get(format!("{}/api/recipes", address))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_update_replaces_ingredients_wholesale() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;
    let token = register_and_login(&client, &address, "editor").await;

    let payload = recipe_payload(
        "Omelette",
        &[tags[0]],
        &[(ingredients[0], 1), (ingredients[1], 2)],
    );
    let recipe = create_recipe(&client, &address, &token, &payload)
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let recipe_id = recipe["id"].as_i64().unwrap();

    // Replace the ingredient set with a single new entry
    let response = client
        .patch(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "ingredients": [{"id": ingredients[2], "amount": 3}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let updated = response.json::<serde_json::Value>().await.unwrap();
    let got: Vec<(i64, i64)> = updated["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| (i["id"].as_i64().unwrap(), i["amount"].as_i64().unwrap()))
        .collect();
    assert_eq!(got, vec![(ingredients[2], 3)]);

    // Untouched fields survive a partial update
    assert_eq!(updated["name"], "Omelette");
    assert_eq!(
        updated["tags"].as_array().unwrap().len(),
        1,
    );

    // An empty replacement list violates the >= 1 ingredient invariant
    let response = client
        .patch(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"ingredients": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_recipe_permissions() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;

    let author = register_and_login(&client, &address, "owner").await;
    let intruder = register_and_login(&client, &address, "intruder").await;

    let recipe = create_recipe(
        &client,
        &address,
        &author,
        &recipe_payload("Private", &tags, &[(ingredients[0], 1)]),
    )
    .await
    .json::<serde_json::Value>()
    .await
    .unwrap();
    let recipe_id = recipe["id"].as_i64().unwrap();

    // A different authenticated user may not edit or delete
    let response = client
        .patch(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", intruder))
        .json(&serde_json::json!({"name": "Hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", intruder))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Anonymous deletion is unauthorized
    let response = client
        .delete(format!("{}/api/recipes/{}", address, recipe_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // An admin may delete someone else's recipe
    sqlx::query("UPDATE users SET role = 'admin' WHERE username = 'intruder'")
        .execute(&pool)
        .await
        .unwrap();
    let admin = register_and_login(&client, &address, "intruder").await;
    let response = client
        .delete(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/api/recipes/{}", address, recipe_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_favorite_and_cart_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;

    let author = register_and_login(&client, &address, "chef").await;
    let fan = register_and_login(&client, &address, "fan").await;

    let recipe = create_recipe(
        &client,
        &address,
        &author,
        &recipe_payload("Soup", &tags, &[(ingredients[0], 1)]),
    )
    .await
    .json::<serde_json::Value>()
    .await
    .unwrap();
    let recipe_id = recipe["id"].as_i64().unwrap();

    // Favoriting a missing recipe is 404
    let response = client
        .post(format!("{}/api/recipes/99999/favorite", address))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Add returns the short projection
    let response = client
        .post(format!("{}/api/recipes/{}/favorite", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let short = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(short["id"].as_i64().unwrap(), recipe_id);
    assert_eq!(short["name"], "Soup");
    assert!(short.get("text").is_none());

    // Duplicate favorite is a conflict, surfaced as 400
    let response = client
        .post(format!("{}/api/recipes/{}/favorite", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Flag flips for the favoriting viewer
    let detail = client
        .get(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(detail["is_favorited"], true);
    assert_eq!(detail["is_in_shopping_cart"], false);

    // Remove, then removing again fails
    let response = client
        .delete(format!("{}/api/recipes/{}/favorite", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .delete(format!("{}/api/recipes/{}/favorite", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let detail = client
        .get(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(detail["is_favorited"], false);

    // Shopping cart follows the same contract
    let response = client
        .post(format!("{}/api/recipes/{}/shopping_cart", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/api/recipes/{}/shopping_cart", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let detail = client
        .get(format!("{}/api/recipes/{}", address, recipe_id))
        .header("Authorization", format!("Bearer {}", fan))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(detail["is_in_shopping_cart"], true);
}

#[tokio::test]
async fn test_recipe_list_filters() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (tags, ingredients) = seed_catalog(&pool).await;

    let alice = register_and_login(&client, &address, "alice").await;
    let bob = register_and_login(&client, &address, "bob").await;

    let mut payload = recipe_payload("Granola", &[tags[0]], &[(ingredients[0], 10)]);
    let granola = create_recipe(&client, &address, &alice, &payload)
        .await
        .json::<serde_json::Value>()
        .await
        .unwrap();
    payload = recipe_payload("Stew", &[tags[1]], &[(ingredients[1], 4)]);
    create_recipe(&client, &address, &bob, &payload).await;

    // Tag filter (OR within the dimension)
    let list = client
        .get(format!("{}/api/recipes?tags=breakfast", address))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["name"], "Granola");

    let list = client
        .get(format!("{}/api/recipes?tags=breakfast,dinner", address))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 2);

    // Author filter
    let bob_id = client
        .get(format!("{}/api/users/me", address))
        .header("Authorization", format!("Bearer {}", bob))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let list = client
        .get(format!("{}/api/recipes?author={}", address, bob_id))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["name"], "Stew");

    // Favorited filter for an authenticated viewer
    let granola_id = granola["id"].as_i64().unwrap();
    client
        .post(format!("{}/api/recipes/{}/favorite", address, granola_id))
        .header("Authorization", format!("Bearer {}", bob))
        .send()
        .await
        .unwrap();
    let list = client
        .get(format!("{}/api/recipes?is_favorited=1", address))
        .header("Authorization", format!("Bearer {}", bob))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["name"], "Granola");

    // The same filter is a no-op for an anonymous viewer
    let list = client
        .get(format!("{}/api/recipes?is_favorited=1", address))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 2);

    // Zero value deactivates the filter even when authenticated
    let list = client
        .get(format!("{}/api/recipes?is_favorited=0", address))
        .header("Authorization", format!("Bearer {}", bob))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(list["count"], 2);
}
