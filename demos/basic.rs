//! Minimal bulwark example: JSON endpoints, a panicking one, a disabled one.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/accounts/acc42
//!   curl -X POST http://localhost:3000/accounts -d '{"alias":"alice"}'
//!   curl -X POST http://localhost:3000/accounts -d 'nope'          # 400 CH003
//!   curl -X POST http://localhost:3000/transact                    # 400 CH001
//!   curl http://localhost:3000/boom                                # 500 CH000, stack logged
//!   curl -X POST http://localhost:3000/reset                       # 501 CH008

use bulwark::{Fault, NotImplemented, Request, Router, Server};
use http::Method;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct CreateAccount {
    alias: String,
}

#[derive(Serialize)]
struct Account {
    id: String,
    alias: String,
}

#[tokio::main]
async fn main() -> Result<(), bulwark::Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/accounts/{id}", get_account)
        .post("/accounts", create_account)
        .post("/transact", transact)
        .get("/boom", boom)
        .disable(Method::POST, "/reset", Fault::new(NotImplemented));

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /accounts/{id}
async fn get_account(req: Request) -> Result<Account, Fault> {
    let id = req.param("id").unwrap_or("unknown").to_owned();
    Ok(Account { id, alias: "alice".to_owned() })
}

// POST /accounts
//
// A body that is not the expected JSON never reaches the code below:
// `req.json()` fails with InvalidBody, answered with 400 / CH003.
async fn create_account(req: Request) -> Result<Account, Fault> {
    let input: CreateAccount = req.json()?;
    Ok(Account { id: "acc99".to_owned(), alias: input.alias })
}

// POST /transact: requires an `x-chain-version` header.
async fn transact(req: Request) -> Result<Vec<String>, Fault> {
    req.require_header("x-chain-version")?;
    Ok(Vec::new())
}

// GET /boom: the client still gets a JSON envelope.
async fn boom(_req: Request) -> Result<Account, Fault> {
    let accounts: Vec<Account> = Vec::new();
    let first = accounts.into_iter().next();
    Ok(first.unwrap())
}
