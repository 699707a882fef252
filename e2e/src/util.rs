use rand::distr::Alphanumeric;
use rand::{rng, Rng};
use tap::TapFallible;

use types::domain::{LoginRequest, SignupRequest};

use crate::client::Client;

pub const PASSWORD: &str = "password";

pub fn random_email() -> String {
    let random_string: String = rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    format!("{}@gmail.com", random_string)
}

/// Signs up a fresh user and logs them in.
pub async fn register_user() -> eyre::Result<(String, Client)> {
    let mut client = Client::new();
    let email = random_email();
    client
        .signup(SignupRequest {
            email: email.clone(),
            password: PASSWORD.to_string(),
        })
        .await?;
    client
        .login(LoginRequest {
            email: email.clone(),
            password: PASSWORD.to_string(),
        })
        .await
        .tap_err(|e| println!("Error: {:?}", e))?;
    Ok((email, client))
}

/// A CSV with the creditcard.csv layout: `Time`, `V1..V28`, `Amount`, `Class`.
pub fn creditcard_csv(rows: usize) -> String {
    let mut header: Vec<String> = vec!["Time".to_string()];
    header.extend((1..=28).map(|i| format!("V{}", i)));
    header.push("Amount".to_string());
    header.push("Class".to_string());

    let mut csv = header.join(",");
    csv.push('\n');
    for r in 0..rows {
        let mut cells = vec![r.to_string()];
        cells.extend((1..=28).map(|i| format!("{:.3}", ((r * i) % 17) as f64 / 7.0 - 1.0)));
        cells.push(format!("{:.2}", 10.0 + r as f64));
        cells.push(u8::from(r % 10 == 0).to_string());
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}
