mod support;

use std::sync::Arc;

use chrono::{Days, Utc};
use mongodb::bson::oid::ObjectId;
use plant_care_tracker::{GatewaySettings, MemoryStore};
use serde_json::{json, Value};
use support::{delete, get, post, put, spawn_gateway, spawn_gateway_with};

fn names(plants: &Value) -> Vec<&str> {
    plants
        .as_array()
        .expect("array of plants")
        .iter()
        .map(|p| p["name"].as_str().expect("plant name"))
        .collect()
}

async fn insert_plant(addr: std::net::SocketAddr, plant: Value) -> String {
    let res = post(addr, "/plants", &plant).await;
    assert_eq!(res.status, 200, "{}", res.body);
    let body = res.json();
    assert_eq!(body["acknowledged"], json!(true));
    body["insertedId"]
        .as_str()
        .expect("inserted id is a hex string")
        .to_string()
}

#[tokio::test]
async fn plant_lookup_returns_the_latest_write() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    let id = insert_plant(
        addr,
        json!({ "name": "monstera", "email": "a@x.com", "careLevel": "easy" }),
    )
    .await;

    let res = get(addr, &format!("/plant/{id}")).await;
    assert_eq!(res.status, 200);
    let plant = res.json();
    assert_eq!(plant["_id"], json!(id));
    assert_eq!(plant["name"], json!("monstera"));

    let res = put(
        addr,
        &format!("/updateplant/{id}"),
        &json!({ "careLevel": "moderate", "nextWatering": "2025-02-01" }),
    )
    .await;
    assert_eq!(res.status, 200);
    let outcome = res.json();
    assert_eq!(outcome["matchedCount"], json!(1));
    assert_eq!(outcome["modifiedCount"], json!(1));
    assert_eq!(outcome["upsertedId"], Value::Null);

    let plant = get(addr, &format!("/plant/{id}")).await.json();
    assert_eq!(plant["careLevel"], json!("moderate"));
    assert_eq!(plant["nextWatering"], json!("2025-02-01"));
    assert_eq!(plant["name"], json!("monstera"));
}

#[tokio::test]
async fn updating_an_unknown_plant_creates_it() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    let id = ObjectId::new().to_hex();

    let res = put(
        addr,
        &format!("/updateplant/{id}"),
        &json!({ "name": "aloe", "careLevel": "easy" }),
    )
    .await;
    assert_eq!(res.status, 200);
    let outcome = res.json();
    assert_eq!(outcome["upsertedCount"], json!(1));
    assert_eq!(outcome["upsertedId"], json!(id));

    let plant = get(addr, &format!("/plant/{id}")).await.json();
    assert_eq!(plant["name"], json!("aloe"));
    assert_eq!(plant["careLevel"], json!("easy"));
}

#[tokio::test]
async fn deleted_plants_are_gone() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    let id = insert_plant(addr, json!({ "name": "basil" })).await;

    let res = delete(addr, &format!("/plantdelate/{id}")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json(), json!({ "acknowledged": true, "deletedCount": 1 }));

    let res = get(addr, &format!("/plant/{id}")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json(), Value::Null);

    let res = delete(addr, &format!("/plantdelate/{id}")).await;
    assert_eq!(res.json()["deletedCount"], json!(0));
}

#[tokio::test]
async fn malformed_plant_ids_are_rejected() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;

    for res in [
        get(addr, "/plant/not-an-id").await,
        put(addr, "/updateplant/123", &json!({ "name": "x" })).await,
        delete(addr, "/plantdelate/zzzzzzzzzzzzzzzzzzzzzzzz").await,
    ] {
        assert_eq!(res.status, 400);
        assert_eq!(res.json(), json!({ "error": "Invalid plant id" }));
    }
}

#[tokio::test]
async fn care_level_sort_puts_easy_plants_first() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    insert_plant(
        addr,
        json!({ "name": "cactus", "email": "a@x.com", "careLevel": "difficult", "nextWatering": "2025-01-01" }),
    )
    .await;
    insert_plant(
        addr,
        json!({ "name": "pothos", "email": "a@x.com", "careLevel": "easy", "nextWatering": "2025-01-05" }),
    )
    .await;
    insert_plant(
        addr,
        json!({ "name": "orchid", "email": "b@x.com", "careLevel": "exotic" }),
    )
    .await;
    insert_plant(
        addr,
        json!({ "name": "fern", "email": "b@x.com", "careLevel": "moderate" }),
    )
    .await;

    let plants = get(addr, "/plants?sortBy=careLevel").await.json();
    assert_eq!(names(&plants), vec!["pothos", "fern", "cactus", "orchid"]);

    let unsorted = get(addr, "/plants").await.json();
    assert_eq!(
        names(&unsorted),
        vec!["cactus", "pothos", "orchid", "fern"]
    );
}

#[tokio::test]
async fn next_watering_sort_is_non_decreasing_within_a_category() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    for (name, category, date) in [
        ("mint", "herb", "2025-04-03"),
        ("rose", "flower", "2025-04-01"),
        ("basil", "herb", "2025-04-01"),
        ("thyme", "herb", "2025-04-02"),
    ] {
        insert_plant(
            addr,
            json!({ "name": name, "category": category, "nextWatering": date }),
        )
        .await;
    }

    let plants = get(addr, "/plants?sortBy=nextWatering&category=herb").await.json();
    assert_eq!(names(&plants), vec!["basil", "thyme", "mint"]);

    let all = get(addr, "/plants?sortBy=nextWatering").await.json();
    let dates: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["nextWatering"].as_str().unwrap())
        .collect();
    assert!(dates.windows(2).all(|w| w[0] <= w[1]), "{dates:?}");
    assert_eq!(dates.len(), 4);

    let empty_category = get(addr, "/plants?category=").await.json();
    assert_eq!(empty_category.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn upcoming_plants_cover_today_through_three_days_out() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    let today = Utc::now().date_naive();
    let day = |offset: i64| {
        let date = if offset >= 0 {
            today.checked_add_days(Days::new(offset as u64))
        } else {
            today.checked_sub_days(Days::new(offset.unsigned_abs()))
        };
        date.unwrap().format("%Y-%m-%d").to_string()
    };

    for (name, email, offset) in [
        ("in-three", "a@x.com", 3),
        ("today", "a@x.com", 0),
        ("in-four", "a@x.com", 4),
        ("yesterday", "a@x.com", -1),
        ("other-owner", "b@x.com", 1),
        ("in-one", "a@x.com", 1),
    ] {
        insert_plant(
            addr,
            json!({ "name": name, "email": email, "nextWatering": day(offset) }),
        )
        .await;
    }

    let plants = get(addr, "/upcoming-plants/a@x.com").await.json();
    assert_eq!(names(&plants), vec!["today", "in-one", "in-three"]);
}

#[tokio::test]
async fn new_plants_are_newest_first_and_capped() {
    let settings = GatewaySettings {
        page_size_new_plants: 6,
        ..GatewaySettings::default()
    };
    let addr = spawn_gateway_with(Arc::new(MemoryStore::new()), settings).await;
    for day in 1..=9 {
        insert_plant(
            addr,
            json!({ "name": format!("p{day}"), "createdAt": format!("2025-05-0{day}T08:00:00.000Z") }),
        )
        .await;
    }

    let plants = get(addr, "/newplants").await.json();
    assert_eq!(
        names(&plants),
        vec!["p9", "p8", "p7", "p6", "p5", "p4"]
    );
}

#[tokio::test]
async fn my_plants_only_lists_the_owners_plants() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    insert_plant(addr, json!({ "name": "ivy", "email": "a@x.com" })).await;
    insert_plant(addr, json!({ "name": "sage", "email": "b@x.com" })).await;
    insert_plant(addr, json!({ "name": "lily", "email": "a@x.com" })).await;

    let plants = get(addr, "/myplants/a@x.com").await.json();
    assert_eq!(names(&plants), vec!["ivy", "lily"]);

    let none = get(addr, "/myplants/nobody@x.com").await.json();
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn date_shaped_objects_are_stored_as_sent() {
    let addr = spawn_gateway(Arc::new(MemoryStore::new())).await;
    let created_at = json!({ "$date": "2025-01-01T00:00:00.120Z" });
    let id = insert_plant(addr, json!({ "name": "yucca", "createdAt": created_at })).await;

    let plant = get(addr, &format!("/plant/{id}")).await.json();
    assert_eq!(plant["createdAt"], created_at);
    assert_eq!(plant["name"], json!("yucca"));
}
