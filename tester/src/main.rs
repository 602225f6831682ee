//! Drives a running server through the whole loyalty flow: register a
//! client, log a worker in, grant stamps and points, redeem, and print what
//! came back at each step.

use std::env;

use anyhow::{bail, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<()> {
    let base = env::var("TESTER_URL").unwrap_or_else(|_| "http://localhost:1111".to_string());
    let pin = env::var("TESTER_PIN").unwrap_or_else(|_| "0000".to_string());

    let http = Client::new();

    let registered: Value = http
        .post(format!("{base}/register"))
        .send()
        .await?
        .json()
        .await?;
    let client_id = registered["client_id"].as_str().unwrap_or_default().to_string();
    println!("Registered client {client_id}");
    println!("Pass URL: {}", registered["pass_url"]);

    let login = http
        .post(format!("{base}/worker/login"))
        .json(&json!({ "pin": pin }))
        .send()
        .await?;
    if login.status() != StatusCode::OK {
        bail!("Worker login failed: {}", login.status());
    }
    let token = login.json::<Value>().await?["token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    println!("Worker logged in");

    for _ in 0..3 {
        http.post(format!("{base}/worker/clients/{client_id}/stamp"))
            .header("x-worker-token", &token)
            .send()
            .await?
            .error_for_status()?;
    }
    println!("Granted 3 stamps");

    http.post(format!("{base}/worker/clients/{client_id}/points"))
        .header("x-worker-token", &token)
        .json(&json!({ "amount": 15 }))
        .send()
        .await?
        .error_for_status()?;
    println!("Granted 15 points");

    let record: Value = http
        .get(format!("{base}/worker/clients/{client_id}"))
        .header("x-worker-token", &token)
        .send()
        .await?
        .json()
        .await?;
    println!("Worker lookup: {record}");

    let redeemed: Value = http
        .post(format!("{base}/card/{client_id}/redeem"))
        .send()
        .await?
        .json()
        .await?;
    println!("Redeemed: {redeemed}");

    let again = http
        .post(format!("{base}/card/{client_id}/redeem"))
        .send()
        .await?;
    println!("Second redeem: {} ({})", again.status(), again.text().await?);

    let spent: Value = http
        .post(format!("{base}/card/{client_id}/redeem-points"))
        .json(&json!({ "index": 0 }))
        .send()
        .await?
        .json()
        .await?;
    println!("Point reward: {spent}");

    let card: Value = http
        .get(format!("{base}/card/{client_id}"))
        .send()
        .await?
        .json()
        .await?;
    println!("Final card: {card}");

    http.post(format!("{base}/worker/logout"))
        .header("x-worker-token", &token)
        .send()
        .await?;
    println!("Worker logged out");

    Ok(())
}
