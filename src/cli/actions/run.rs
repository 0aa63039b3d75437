use anyhow::{bail, Result};
use tracing::info;

use super::{session::connect, Action};
use crate::cli::globals::GlobalArgs;
use crate::credits::Credits;
use crate::session::RegisterData;

fn print_credits(credits: Credits) {
    println!("grader: {}", credits.grader);
    println!("generator: {}", credits.generator);
}

pub(super) async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let session = connect(globals)?;

    match action {
        Action::Credits { email, password } => {
            session.login(&email, &password).await?;
            print_credits(session.credits());
        }
        Action::Consume {
            email,
            password,
            feature,
        } => {
            session.login(&email, &password).await?;
            if !session.consume_credit(feature).await {
                bail!("no {feature} credits left today");
            }
            info!("consumed one {} credit", feature);
            print_credits(session.credits());
        }
        Action::Register {
            email,
            password,
            name,
        } => {
            let identity = session
                .register(RegisterData {
                    email,
                    secret: password,
                    full_name: name,
                })
                .await?;
            println!("uid: {}", identity.uid);
            print_credits(session.credits());
        }
    }

    session.logout().await;

    Ok(())
}
